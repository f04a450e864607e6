// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The layer kernels.
//!
//! Every kernel follows the same structural form: resolve the operands,
//! validate geometry once in kind-independent code, convert byte strides
//! to element units, then run a monomorphized inner loop that reads
//! storage scalars, accumulates in the output's compute type, and casts
//! on store. Operands may overlap in their zone, so elements are
//! addressed through raw pointers with unaligned loads and stores.

mod add_op;
mod conv2d_op;
mod dense_op;
mod softmax_op;
mod upsample_op;

pub use conv2d_op::Conv2dParams;
pub use dense_op::DenseParams;
pub use upsample_op::UpsampleParams;

use crate::tensor::TensorDesc;

/// Typed element cursor over a tensor's storage.
///
/// Offsets are in element units; the pointer was derived from the zone
/// base while the device was exclusively borrowed, and stays valid for
/// the duration of one kernel invocation.
#[derive(Clone, Copy)]
pub(crate) struct ElemPtr<T> {
    ptr: *mut T,
}

impl<T: Copy> ElemPtr<T> {
    /// Builds a cursor at `byte_offset` into a zone.
    pub(crate) fn new(zone_base: *mut u8, byte_offset: usize) -> Self {
        // SAFETY: the offset was bounds-checked when the tensor was
        // declared against its zone.
        Self {
            ptr: unsafe { zone_base.add(byte_offset) } as *mut T,
        }
    }

    /// Reads the element at `off`.
    ///
    /// # Safety
    /// `off` must lie within the tensor's element span.
    #[inline]
    pub(crate) unsafe fn load(&self, off: usize) -> T {
        (self.ptr as *const T).add(off).read_unaligned()
    }

    /// Writes the element at `off`.
    ///
    /// # Safety
    /// `off` must lie within the tensor's element span.
    #[inline]
    pub(crate) unsafe fn store(&self, off: usize, value: T) {
        self.ptr.add(off).write_unaligned(value)
    }
}

/// Byte strides divided down to element units, padded to four axes.
pub(crate) fn elem_strides<T>(desc: &TensorDesc) -> [usize; 4] {
    let elem = std::mem::size_of::<T>();
    let mut s = [0usize; 4];
    for (i, &b) in desc.strides().iter().enumerate() {
        s[i] = b / elem;
    }
    s
}

/// Dimensions padded to four axes with trailing ones.
pub(crate) fn padded_dims(desc: &TensorDesc) -> [usize; 4] {
    let mut d = [1usize; 4];
    d[..desc.rank()].copy_from_slice(desc.dims());
    d
}

/// The fractional shift that participates in kernel scaling laws: zero
/// for float kinds, whose scale is implicit.
pub(crate) fn effective_fp(desc: &TensorDesc) -> i32 {
    if desc.kind().is_float() {
        0
    } else {
        i32::from(desc.fp_shift())
    }
}
