// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The reference CPU device.
//!
//! A [`CpuDevice`] owns the memory-zone collection and the table of
//! declared tensors. Every API entry point runs to completion before
//! returning: the synchronisation surface (`flush`,
//! `wait_for_completion`, `callback`) is trivial by construction, and
//! callers are expected to serialise access through the exclusive
//! receiver.

use crate::tensor::{Storage, TensorDesc, TensorEntry, TensorId};
use crate::{BackendConfig, BackendError, Result};
use memory_manager::ZoneCollection;
use std::collections::HashMap;

/// Identifier of the only device this backend exposes.
pub const DEFAULT_DEVICE_ID: u32 = 0;

/// Returns the id of the default device.
pub fn default_device_id() -> u32 {
    DEFAULT_DEVICE_ID
}

/// Lists the available device ids.
pub fn list_devices() -> Vec<u32> {
    vec![DEFAULT_DEVICE_ID]
}

/// Callback invoked whenever an API call fails.
pub type ErrorCallback = Box<dyn FnMut(BackendError) + Send>;

/// The reference CPU backend.
///
/// # Example
/// ```
/// use accel_cpu::{BackendConfig, CpuDevice, TensorDesc};
/// use tensor_core::ElemKind;
///
/// let mut dev = CpuDevice::new(BackendConfig::default());
/// let desc = TensorDesc::new(0, ElemKind::F32, &[2, 3], 0).unwrap();
/// let t = dev.allocate(desc, 0, 0).unwrap();
/// assert_eq!(dev.describe(t).unwrap().strides(), &[12, 4]);
/// ```
pub struct CpuDevice {
    zones: ZoneCollection,
    tensors: HashMap<TensorId, TensorEntry>,
    next_id: u64,
    panic_on_error: bool,
    error_callback: Option<ErrorCallback>,
}

impl CpuDevice {
    /// Creates a device with the given configuration.
    pub fn new(config: BackendConfig) -> Self {
        Self {
            zones: ZoneCollection::new(&config.zones),
            tensors: HashMap::new(),
            next_id: 1,
            panic_on_error: config.panic_on_error,
            error_callback: None,
        }
    }

    /// Creates a device configured from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(BackendConfig::from_env()?))
    }

    /// Prepares the given device for use.
    ///
    /// The reference backend needs no preparation; the call only
    /// validates the device id.
    pub fn initialize(&mut self, device_id: u32) -> Result<()> {
        let r = if device_id == DEFAULT_DEVICE_ID {
            Ok(())
        } else {
            Err(BackendError::InconsistentDevice)
        };
        self.finish(r)
    }

    /// Invokes `f` once all queued work has completed.
    ///
    /// Processing is synchronous, so `f` runs inline.
    pub fn callback<F: FnOnce()>(&mut self, device_id: u32, f: F) -> Result<()> {
        if device_id != DEFAULT_DEVICE_ID {
            let r = Err(BackendError::InconsistentDevice);
            return self.finish(r);
        }
        f();
        Ok(())
    }

    /// Starts any queued work. A no-op: work is never queued.
    pub fn flush(&mut self, device_id: u32) -> Result<()> {
        let r = if device_id == DEFAULT_DEVICE_ID {
            Ok(())
        } else {
            Err(BackendError::InconsistentDevice)
        };
        self.finish(r)
    }

    /// Blocks until queued work has completed. Returns immediately.
    pub fn wait_for_completion(&mut self) -> Result<()> {
        Ok(())
    }

    /// Registers a callback invoked with the error kind whenever an API
    /// call on this device fails.
    pub fn register_error_callback(
        &mut self,
        callback: impl FnMut(BackendError) + Send + 'static,
    ) {
        self.error_callback = Some(Box::new(callback));
    }

    /// Returns the descriptor of a declared tensor, strides included.
    pub fn describe(&self, tensor: TensorId) -> Result<&TensorDesc> {
        Ok(&self.entry(tensor)?.desc)
    }

    /// Returns how a tensor's storage relates to the zone collection:
    /// an owned zone range, a view of a parent, or a reshape alias.
    pub fn tensor_storage(&self, tensor: TensorId) -> Result<Storage> {
        Ok(self.entry(tensor)?.storage)
    }

    /// Returns the sizes of the configured zones in bytes.
    pub fn zone_sizes(&self) -> Vec<usize> {
        (0..self.zones.len())
            .map(|i| self.zones.get(i).map(|z| z.size()).unwrap_or(0))
            .collect()
    }

    /// Number of tensors currently referencing a zone.
    pub fn zone_live_tensors(&self, zone_id: u32) -> Result<u64> {
        self.zones
            .get(zone_id as usize)
            .map(|z| z.live_tensors())
            .ok_or(BackendError::IncorrectParameter)
    }

    // ── Internal plumbing ──────────────────────────────────────────

    pub(crate) fn zones(&self) -> &ZoneCollection {
        &self.zones
    }

    pub(crate) fn zones_mut(&mut self) -> &mut ZoneCollection {
        &mut self.zones
    }

    pub(crate) fn issue_id(&mut self) -> TensorId {
        let id = TensorId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert_entry(&mut self, id: TensorId, entry: TensorEntry) {
        self.tensors.insert(id, entry);
    }

    pub(crate) fn remove_entry(&mut self, id: TensorId) -> Option<TensorEntry> {
        self.tensors.remove(&id)
    }

    pub(crate) fn entry(&self, id: TensorId) -> Result<&TensorEntry> {
        self.tensors.get(&id).ok_or(BackendError::UnknownTensor)
    }

    pub(crate) fn entry_mut(&mut self, id: TensorId) -> Result<&mut TensorEntry> {
        self.tensors.get_mut(&id).ok_or(BackendError::UnknownTensor)
    }

    /// Looks up a kernel operand: the tensor must exist and must not be
    /// mapped to the host.
    pub(crate) fn kernel_operand(&self, id: TensorId) -> Result<Operand> {
        let entry = self.entry(id)?;
        if entry.mapped {
            return Err(BackendError::ProcessMappedTensor);
        }
        Ok(Operand {
            desc: entry.desc.clone(),
            zone_id: entry.zone_id,
            base_offset: entry.base_offset,
        })
    }

    /// Base pointers of every zone, gathered under a single mutable
    /// borrow so pointers into distinct zones stay valid together.
    ///
    /// Kernel operands may overlap (overlapping allocations implement
    /// implicit concatenation), so kernels address elements through raw
    /// pointers rather than slices.
    pub(crate) fn zone_base_ptrs(&mut self) -> Vec<*mut u8> {
        self.zones
            .zones_mut()
            .iter_mut()
            .map(|z| z.bytes_mut().as_mut_ptr())
            .collect()
    }

    /// Routes every fallible API result through the error hooks: the
    /// registered error callback sees the kind, and panic-on-error mode
    /// turns the failure into a panic.
    pub(crate) fn finish<T>(&mut self, r: Result<T>) -> Result<T> {
        if let Err(err) = &r {
            tracing::debug!(error = err.name(), code = err.code(), "api call failed");
            if let Some(cb) = self.error_callback.as_mut() {
                cb(*err);
            }
            if self.panic_on_error {
                panic!("accel-cpu: {err} ({})", err.name());
            }
        }
        r
    }
}

impl std::fmt::Debug for CpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuDevice")
            .field("zones", &self.zones.len())
            .field("tensors", &self.tensors.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// A resolved kernel operand: descriptor plus location.
#[derive(Debug, Clone)]
pub(crate) struct Operand {
    pub desc: TensorDesc,
    pub zone_id: u32,
    pub base_offset: usize,
}
