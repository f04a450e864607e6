// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor descriptors and storage handles.

use crate::{BackendError, Result};
use tensor_core::{ElemKind, Shape};

/// Opaque handle to a tensor declared to the backend.
///
/// Handles are issued from a monotonically growing counter and stay
/// unique for the lifetime of the device; a released handle is never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub(crate) u64);

/// How a tensor's bytes relate to the zone collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// The tensor owns a sub-range of a zone.
    Owned {
        /// Zone the range was reserved in.
        zone_id: u32,
    },
    /// The tensor reads a sub-range of a parent tensor, with inherited
    /// strides. The parent may be released first; the underlying zone
    /// bytes stay valid because arenas are monotone.
    View {
        /// Tensor the view was created from.
        parent: TensorId,
    },
    /// The tensor aliases a parent's bytes under a different geometry.
    Reshape {
        /// Tensor the reshape was created from.
        parent: TensorId,
    },
}

/// Shape, strides, element kind, and fractional shift of a tensor.
///
/// Callers construct a descriptor with [`TensorDesc::new`]; the backend
/// fills the strides when the tensor is declared (allocation computes
/// dense row-major strides, views inherit, reshapes recompute).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDesc {
    device_id: u32,
    kind: ElemKind,
    fp_shift: u8,
    shape: Shape,
    strides: Vec<usize>,
}

impl TensorDesc {
    /// Creates a descriptor for a tensor that is yet to be declared.
    ///
    /// `fp_shift` is the number of fractional bits for fixed-point
    /// kinds; it must be below the kind's bit-width. For float kinds the
    /// value is preserved but has no effect on arithmetic.
    ///
    /// # Errors
    /// `InconsistentNumberOfDimensions` for ranks outside 1..=4,
    /// `IncorrectParameter` for zero-length axes or an out-of-range
    /// `fp_shift`.
    pub fn new(
        device_id: u32,
        kind: ElemKind,
        dims: &[usize],
        fp_shift: u8,
    ) -> Result<Self> {
        let shape = Shape::new(dims).map_err(|e| match e {
            tensor_core::ShapeError::InvalidRank(_) => {
                BackendError::InconsistentNumberOfDimensions
            }
            tensor_core::ShapeError::ZeroLengthAxis => BackendError::IncorrectParameter,
        })?;
        if !kind.is_float() && usize::from(fp_shift) >= kind.bits() {
            return Err(BackendError::IncorrectParameter);
        }
        Ok(Self {
            device_id,
            kind,
            fp_shift,
            shape,
            strides: Vec::new(),
        })
    }

    /// Device the tensor belongs to.
    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Element kind.
    pub fn kind(&self) -> ElemKind {
        self.kind
    }

    /// Fractional shift for fixed-point kinds.
    pub fn fp_shift(&self) -> u8 {
        self.fp_shift
    }

    /// Dimension vector.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Total number of elements.
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Strides in bytes, filled once the tensor is declared.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Returns `true` when the strides are exactly dense row-major.
    pub fn is_dense(&self) -> bool {
        self.strides == self.shape.byte_strides(self.kind)
    }

    /// Number of bytes between the first and one past the last element.
    ///
    /// For dense tensors this equals `strides[0] * dims[0]`; for views it
    /// can be smaller than the parent's span.
    pub fn byte_span(&self) -> usize {
        self.dims()
            .iter()
            .zip(self.strides.iter())
            .map(|(&d, &s)| (d - 1) * s)
            .sum::<usize>()
            + self.kind.size_bytes()
    }

    pub(crate) fn set_strides(&mut self, strides: Vec<usize>) {
        debug_assert_eq!(strides.len(), self.rank());
        self.strides = strides;
    }
}

/// Backend-side record of a declared tensor.
#[derive(Debug, Clone)]
pub(crate) struct TensorEntry {
    pub desc: TensorDesc,
    pub storage: Storage,
    /// Zone the bytes live in (resolved through parents for views).
    pub zone_id: u32,
    /// Absolute byte offset of the first element within the zone.
    pub base_offset: usize,
    /// Set while the tensor is exposed to the host through `map_tensor`.
    pub mapped: bool,
}
