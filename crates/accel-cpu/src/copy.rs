// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Synchronous host↔tensor transfers with on-the-fly casts.
//!
//! The host buffer is flat row-major with no padding: its implicit
//! strides are those of the tensor's logical shape. The tensor side may
//! carry arbitrary strides (views), so the slow path walks the tensor by
//! its byte strides while the buffer advances linearly. When the kinds
//! and fractional shifts agree exactly and the tensor is dense, the
//! transfer degenerates to a single byte copy.

use crate::device::CpuDevice;
use crate::dispatch::with_kernel_scalar;
use crate::tensor::TensorId;
use crate::{BackendError, Result};
use tensor_core::{cast_element, fp_delta, scale_factor, ElemKind, Scalar};

/// Host-side element types accepted by the copy operations.
///
/// Each type names the element kind it stages; the 4-bit kinds have no
/// host representation.
pub trait HostScalar: Scalar {
    /// Kind of the staged data.
    const KIND: ElemKind;
}

impl HostScalar for f32 {
    const KIND: ElemKind = ElemKind::F32;
}
impl HostScalar for tensor_core::f16 {
    const KIND: ElemKind = ElemKind::F16;
}
impl HostScalar for i8 {
    const KIND: ElemKind = ElemKind::SFx8;
}
impl HostScalar for i16 {
    const KIND: ElemKind = ElemKind::SFx16;
}
impl HostScalar for u8 {
    const KIND: ElemKind = ElemKind::UFx8;
}
impl HostScalar for u16 {
    const KIND: ElemKind = ElemKind::UFx16;
}

impl CpuDevice {
    /// Copies a flat row-major host buffer into a tensor, casting
    /// between `S::KIND` at `fp_shift` and the tensor's own format.
    ///
    /// The buffer may be discarded as soon as the call returns.
    ///
    /// # Errors
    /// `InconsistentTensorSizes` when the buffer length differs from the
    /// tensor's element count; `UnimplementedType` when the tensor's
    /// kind has no copy path (the 4-bit kinds).
    pub fn copy_to_tensor<S: HostScalar>(
        &mut self,
        src: &[S],
        fp_shift: u8,
        tensor: TensorId,
    ) -> Result<()> {
        let r = self.copy_to_inner(src, fp_shift, tensor);
        self.finish(r)
    }

    fn copy_to_inner<S: HostScalar>(
        &mut self,
        src: &[S],
        fp_shift: u8,
        tensor: TensorId,
    ) -> Result<()> {
        let entry = self.entry(tensor)?;
        let desc = entry.desc.clone();
        let (zone_id, base) = (entry.zone_id as usize, entry.base_offset);

        if src.len() != desc.num_elements() {
            return Err(BackendError::InconsistentTensorSizes);
        }
        if !copyable(desc.kind()) {
            return Err(BackendError::UnimplementedType);
        }

        let span = desc.byte_span();
        let zone = self
            .zones_mut()
            .get_mut(zone_id)
            .expect("entry zone exists");
        let dst_bytes = &mut zone.bytes_mut()[base..base + span];

        if S::KIND == desc.kind() && fp_shift == desc.fp_shift() && desc.is_dense() {
            // SAFETY: reinterpreting &[S] as bytes is sound for these
            // Copy element types; lengths were checked above.
            let src_bytes = unsafe {
                std::slice::from_raw_parts(
                    src.as_ptr() as *const u8,
                    std::mem::size_of_val(src),
                )
            };
            dst_bytes.copy_from_slice(src_bytes);
            return Ok(());
        }

        let delta = fp_delta(S::KIND, fp_shift, desc.kind(), desc.fp_shift());
        let factor = scale_factor(delta);
        let (dims, strides) = padded4(desc.dims(), desc.strides());
        let dst = dst_bytes.as_mut_ptr();
        with_kernel_scalar!(desc.kind(), D => {
            scatter::<S, D>(src, dst, dims, strides, delta, factor);
            Ok(())
        })
    }

    /// Copies a tensor into a flat row-major host buffer, casting
    /// between the tensor's format and `D::KIND` at `fp_shift`.
    ///
    /// # Errors
    /// Mirrors [`CpuDevice::copy_to_tensor`].
    pub fn copy_from_tensor<D: HostScalar>(
        &mut self,
        dst: &mut [D],
        fp_shift: u8,
        tensor: TensorId,
    ) -> Result<()> {
        let r = self.copy_from_inner(dst, fp_shift, tensor);
        self.finish(r)
    }

    fn copy_from_inner<D: HostScalar>(
        &mut self,
        dst: &mut [D],
        fp_shift: u8,
        tensor: TensorId,
    ) -> Result<()> {
        let entry = self.entry(tensor)?;
        let desc = entry.desc.clone();
        let (zone_id, base) = (entry.zone_id as usize, entry.base_offset);

        if dst.len() != desc.num_elements() {
            return Err(BackendError::InconsistentTensorSizes);
        }
        if !copyable(desc.kind()) {
            return Err(BackendError::UnimplementedType);
        }

        let span = desc.byte_span();
        let zone = self.zones().get(zone_id).expect("entry zone exists");
        let src_bytes = &zone.bytes()[base..base + span];

        if D::KIND == desc.kind() && fp_shift == desc.fp_shift() && desc.is_dense() {
            // SAFETY: reinterpreting &mut [D] as bytes is sound for
            // these Copy element types; lengths were checked above.
            let dst_bytes = unsafe {
                std::slice::from_raw_parts_mut(
                    dst.as_mut_ptr() as *mut u8,
                    std::mem::size_of_val(dst),
                )
            };
            dst_bytes.copy_from_slice(src_bytes);
            return Ok(());
        }

        let delta = fp_delta(desc.kind(), desc.fp_shift(), D::KIND, fp_shift);
        let factor = scale_factor(delta);
        let (dims, strides) = padded4(desc.dims(), desc.strides());
        let src = src_bytes.as_ptr();
        with_kernel_scalar!(desc.kind(), S => {
            gather::<S, D>(src, dst, dims, strides, delta, factor);
            Ok(())
        })
    }
}

fn copyable(kind: ElemKind) -> bool {
    !matches!(kind, ElemKind::SFx4 | ElemKind::UFx4)
}

/// Pads dims with trailing 1s and strides with trailing 0s so every
/// traversal is a fixed four-deep loop nest.
pub(crate) fn padded4(dims: &[usize], strides: &[usize]) -> ([usize; 4], [usize; 4]) {
    let mut d = [1usize; 4];
    let mut s = [0usize; 4];
    d[..dims.len()].copy_from_slice(dims);
    s[..strides.len()].copy_from_slice(strides);
    (d, s)
}

fn scatter<S: Scalar, D: Scalar>(
    src: &[S],
    dst: *mut u8,
    dims: [usize; 4],
    strides: [usize; 4],
    delta: i32,
    factor: f32,
) {
    let mut flat = 0usize;
    for i0 in 0..dims[0] {
        for i1 in 0..dims[1] {
            for i2 in 0..dims[2] {
                let row =
                    i0 * strides[0] + i1 * strides[1] + i2 * strides[2];
                for i3 in 0..dims[3] {
                    let off = row + i3 * strides[3];
                    let value: D = cast_element(src[flat], delta, factor);
                    // SAFETY: `off` stays within the tensor's byte span
                    // by construction of dims and strides; unaligned
                    // stores are used because zone offsets carry no
                    // alignment guarantee.
                    unsafe { (dst.add(off) as *mut D).write_unaligned(value) };
                    flat += 1;
                }
            }
        }
    }
}

fn gather<S: Scalar, D: Scalar>(
    src: *const u8,
    dst: &mut [D],
    dims: [usize; 4],
    strides: [usize; 4],
    delta: i32,
    factor: f32,
) {
    let mut flat = 0usize;
    for i0 in 0..dims[0] {
        for i1 in 0..dims[1] {
            for i2 in 0..dims[2] {
                let row =
                    i0 * strides[0] + i1 * strides[1] + i2 * strides[2];
                for i3 in 0..dims[3] {
                    let off = row + i3 * strides[3];
                    // SAFETY: as in `scatter`.
                    let value =
                        unsafe { (src.add(off) as *const S).read_unaligned() };
                    dst[flat] = cast_element(value, delta, factor);
                    flat += 1;
                }
            }
        }
    }
}
