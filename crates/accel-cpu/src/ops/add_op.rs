// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise addition of two equally-shaped tensors.

use crate::device::{CpuDevice, Operand};
use crate::dispatch::with_kernel_scalar;
use crate::ops::{effective_fp, elem_strides, padded_dims, ElemPtr};
use crate::tensor::TensorId;
use crate::{BackendError, Result};
use tensor_core::{Accum, Scalar};

impl CpuDevice {
    /// Computes `out = a + b` element-wise.
    ///
    /// All three tensors must share one kind (one of F16, F32, SFx8,
    /// SFx16, UFx8, UFx16) and have identical rank and dimensions; there
    /// is no broadcasting. For fixed-point kinds each operand may carry
    /// its own fractional shift: operands are rescaled to the output
    /// frame before the sum:
    ///
    /// `out = shift(a, fp_out − fp_a) + shift(b, fp_out − fp_b)`
    pub fn add(&mut self, a: TensorId, b: TensorId, output: TensorId) -> Result<()> {
        let r = add_op(self, a, b, output);
        self.finish(r)
    }
}

fn add_op(dev: &mut CpuDevice, a: TensorId, b: TensorId, output: TensorId) -> Result<()> {
    let a_op = dev.kernel_operand(a)?;
    let b_op = dev.kernel_operand(b)?;
    let out_op = dev.kernel_operand(output)?;

    let kind = a_op.desc.kind();
    if b_op.desc.kind() != kind || out_op.desc.kind() != kind {
        return Err(BackendError::UnimplementedType);
    }
    with_kernel_scalar!(kind, T => {
        add_typed::<T>(dev, &a_op, &b_op, &out_op)
    })
}

fn add_typed<T: Scalar>(
    dev: &mut CpuDevice,
    a: &Operand,
    b: &Operand,
    output: &Operand,
) -> Result<()> {
    if a.desc.rank() != b.desc.rank() || a.desc.rank() != output.desc.rank() {
        return Err(BackendError::InconsistentTensorSizes);
    }
    if a.desc.dims() != b.desc.dims() || a.desc.dims() != output.desc.dims() {
        return Err(BackendError::InconsistentTensorSizes);
    }

    // Both operands are brought into the output's fractional frame
    // before the sum.
    let fp_out = effective_fp(&output.desc);
    let a_shift = fp_out - effective_fp(&a.desc);
    let b_shift = fp_out - effective_fp(&b.desc);

    let dims = padded_dims(&a.desc);
    let a_s = elem_strides::<T>(&a.desc);
    let b_s = elem_strides::<T>(&b.desc);
    let o_s = elem_strides::<T>(&output.desc);

    let zones = dev.zone_base_ptrs();
    let a_ptr = ElemPtr::<T>::new(zones[a.zone_id as usize], a.base_offset);
    let b_ptr = ElemPtr::<T>::new(zones[b.zone_id as usize], b.base_offset);
    let out_ptr = ElemPtr::<T>::new(zones[output.zone_id as usize], output.base_offset);

    for i0 in 0..dims[0] {
        for i1 in 0..dims[1] {
            for i2 in 0..dims[2] {
                for i3 in 0..dims[3] {
                    let a_off =
                        i0 * a_s[0] + i1 * a_s[1] + i2 * a_s[2] + i3 * a_s[3];
                    let b_off =
                        i0 * b_s[0] + i1 * b_s[1] + i2 * b_s[2] + i3 * b_s[3];
                    let o_off =
                        i0 * o_s[0] + i1 * o_s[1] + i2 * o_s[2] + i3 * o_s[3];
                    // SAFETY: offsets were derived from validated dims
                    // and strides.
                    let x = <T::Acc as Accum>::read(unsafe { a_ptr.load(a_off) });
                    let y = <T::Acc as Accum>::read(unsafe { b_ptr.load(b_off) });
                    let sum = x.rescale(a_shift) + y.rescale(b_shift);
                    unsafe { out_ptr.store(o_off, sum.store()) };
                }
            }
        }
    }

    Ok(())
}
