// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor declaration: allocate, view, reshape, release, map, unmap.
//!
//! Allocation reserves a caller-chosen sub-range of a zone and fills
//! dense row-major strides. Views and reshapes alias existing bytes and
//! move no data. None of these operations ever return storage to a zone;
//! arenas are monotone and overlapping reservations are legal.

use crate::device::{CpuDevice, DEFAULT_DEVICE_ID};
use crate::tensor::{Storage, TensorDesc, TensorEntry, TensorId};
use crate::{BackendError, Result};
use tensor_core::{reshape_strides, Shape, ShapeError};

/// Purpose flags for mapping and unmapping, mirrored from the ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapFlag {
    /// The host will overwrite the contents; the previous values need
    /// not be preserved.
    Discard,
    /// The host wants the current contents.
    Sync,
}

impl CpuDevice {
    /// Declares a tensor over `[offset, offset + size)` of a zone.
    ///
    /// Strides are filled dense row-major. The reserved range may
    /// overlap other tensors' ranges: overlapping allocations are the
    /// mechanism for implicit concatenation.
    ///
    /// # Errors
    /// `InconsistentDevice` for a foreign device id,
    /// `OutOfDeviceMemory` when the zone id is unknown or the range
    /// exceeds the zone.
    pub fn allocate(
        &mut self,
        desc: TensorDesc,
        zone_id: u32,
        offset: usize,
    ) -> Result<TensorId> {
        let r = self.allocate_inner(desc, zone_id, offset);
        self.finish(r)
    }

    fn allocate_inner(
        &mut self,
        mut desc: TensorDesc,
        zone_id: u32,
        offset: usize,
    ) -> Result<TensorId> {
        if desc.device_id() != DEFAULT_DEVICE_ID {
            return Err(BackendError::InconsistentDevice);
        }
        let zone_size = self
            .zones()
            .get(zone_id as usize)
            .ok_or(BackendError::OutOfDeviceMemory)?
            .size();

        desc.set_strides(desc.shape().byte_strides(desc.kind()));
        let span = desc.byte_span();
        match offset.checked_add(span) {
            Some(end) if end <= zone_size => {}
            _ => return Err(BackendError::OutOfDeviceMemory),
        }

        let id = self.issue_id();
        self.insert_entry(
            id,
            TensorEntry {
                desc,
                storage: Storage::Owned { zone_id },
                zone_id,
                base_offset: offset,
                mapped: false,
            },
        );
        self.zones_mut()
            .get_mut(zone_id as usize)
            .expect("zone id validated above")
            .tensor_created();
        Ok(id)
    }

    /// Declares a view of `parent` starting at the given per-axis
    /// element offsets, with the given dimensions.
    ///
    /// The view inherits the parent's kind, fractional shift, and
    /// strides. Rank must match the parent's; use [`CpuDevice::reshape`]
    /// to change rank.
    ///
    /// # Errors
    /// `IncorrectParameter` when an axis of the view does not fit inside
    /// the parent (`offset[i] + dims[i] > parent_dims[i]`).
    pub fn view(
        &mut self,
        parent: TensorId,
        dims: &[usize],
        offsets: &[usize],
    ) -> Result<TensorId> {
        let r = self.view_inner(parent, dims, offsets);
        self.finish(r)
    }

    fn view_inner(
        &mut self,
        parent: TensorId,
        dims: &[usize],
        offsets: &[usize],
    ) -> Result<TensorId> {
        let parent_entry = self.entry(parent)?;
        let parent_desc = &parent_entry.desc;

        if dims.len() != parent_desc.rank() {
            return Err(BackendError::InconsistentNumberOfDimensions);
        }
        if offsets.len() != dims.len() {
            return Err(BackendError::IncorrectParameter);
        }
        let shape = Shape::new(dims).map_err(shape_error)?;
        for axis in 0..dims.len() {
            if offsets[axis] + dims[axis] > parent_desc.dims()[axis] {
                return Err(BackendError::IncorrectParameter);
            }
        }

        let strides = parent_desc.strides().to_vec();
        let base_offset = parent_entry.base_offset
            + offsets
                .iter()
                .zip(strides.iter())
                .map(|(&o, &s)| o * s)
                .sum::<usize>();

        let mut desc = TensorDesc::new(
            parent_desc.device_id(),
            parent_desc.kind(),
            shape.dims(),
            parent_desc.fp_shift(),
        )?;
        desc.set_strides(strides);

        let zone_id = parent_entry.zone_id;
        let id = self.issue_id();
        self.insert_entry(
            id,
            TensorEntry {
                desc,
                storage: Storage::View { parent },
                zone_id,
                base_offset,
                mapped: false,
            },
        );
        self.zones_mut()
            .get_mut(zone_id as usize)
            .expect("parent zone exists")
            .tensor_created();
        Ok(id)
    }

    /// Declares a tensor aliasing `parent`'s bytes under a new
    /// dimension vector. Virtually free: no storage is reserved and no
    /// data moves.
    ///
    /// A contiguous parent can always be reshaped. A non-contiguous
    /// parent (a view) can be reshaped only when the new geometry does
    /// not bridge its stride holes.
    ///
    /// # Errors
    /// `InconsistentTensorSizes` when the element counts differ or the
    /// geometry bridges a stride hole.
    pub fn reshape(&mut self, parent: TensorId, dims: &[usize]) -> Result<TensorId> {
        let r = self.reshape_inner(parent, dims);
        self.finish(r)
    }

    fn reshape_inner(&mut self, parent: TensorId, dims: &[usize]) -> Result<TensorId> {
        let parent_entry = self.entry(parent)?;
        let parent_desc = &parent_entry.desc;

        let shape = Shape::new(dims).map_err(shape_error)?;
        if shape.num_elements() != parent_desc.num_elements() {
            return Err(BackendError::InconsistentTensorSizes);
        }
        let strides = reshape_strides(
            parent_desc.dims(),
            parent_desc.strides(),
            shape.dims(),
        )
        .ok_or(BackendError::InconsistentTensorSizes)?;

        let mut desc = TensorDesc::new(
            parent_desc.device_id(),
            parent_desc.kind(),
            shape.dims(),
            parent_desc.fp_shift(),
        )?;
        desc.set_strides(strides);

        let zone_id = parent_entry.zone_id;
        let base_offset = parent_entry.base_offset;
        let id = self.issue_id();
        self.insert_entry(
            id,
            TensorEntry {
                desc,
                storage: Storage::Reshape { parent },
                zone_id,
                base_offset,
                mapped: false,
            },
        );
        self.zones_mut()
            .get_mut(zone_id as usize)
            .expect("parent zone exists")
            .tensor_created();
        Ok(id)
    }

    /// Forgets a tensor handle.
    ///
    /// The zone's live-tensor counter is decremented whether the handle
    /// owned its range or aliased a parent; the bytes themselves stay in
    /// place, so views of a released parent keep reading valid storage.
    pub fn release(&mut self, tensor: TensorId) -> Result<()> {
        let r = self.release_inner(tensor);
        self.finish(r)
    }

    fn release_inner(&mut self, tensor: TensorId) -> Result<()> {
        let entry = self
            .remove_entry(tensor)
            .ok_or(BackendError::UnknownTensor)?;
        if let Some(zone) = self.zones_mut().get_mut(entry.zone_id as usize) {
            zone.tensor_released();
        }
        Ok(())
    }

    /// Exposes a tensor's bytes to the host.
    ///
    /// Mapping acts as a synchronisation point; with synchronous
    /// execution that is trivially satisfied. The tensor stays flagged
    /// as mapped until [`CpuDevice::unmap_tensor`]; kernels invoked on a
    /// mapped tensor fail with `ProcessMappedTensor`.
    pub fn map_tensor(
        &mut self,
        tensor: TensorId,
        _flags: MapFlag,
    ) -> Result<&mut [u8]> {
        let lookup = self
            .entry(tensor)
            .map(|e| (e.zone_id as usize, e.base_offset, e.desc.byte_span()));
        let (zone_id, base, span) = match lookup {
            Ok(t) => t,
            Err(err) => return self.finish(Err(err)),
        };
        self.entry_mut(tensor)?.mapped = true;
        let zone = self
            .zones_mut()
            .get_mut(zone_id)
            .expect("entry zone exists");
        Ok(&mut zone.bytes_mut()[base..base + span])
    }

    /// Ends a host mapping started with [`CpuDevice::map_tensor`].
    pub fn unmap_tensor(&mut self, tensor: TensorId, _flags: MapFlag) -> Result<()> {
        let r = self
            .entry_mut(tensor)
            .map(|e| e.mapped = false);
        self.finish(r)
    }
}

fn shape_error(e: ShapeError) -> BackendError {
    match e {
        ShapeError::InvalidRank(_) => BackendError::InconsistentNumberOfDimensions,
        ShapeError::ZeroLengthAxis => BackendError::IncorrectParameter,
    }
}
