// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Nearest-neighbour ×2 upsampling in the spatial axes.

use crate::device::{CpuDevice, Operand};
use crate::dispatch::with_any_scalar;
use crate::ops::ElemPtr;
use crate::tensor::{TensorDesc, TensorId};
use crate::{BackendError, Result};
use tensor_core::Scalar;

/// Parameters for [`CpuDevice::upsample`].
#[derive(Debug, Clone)]
pub struct UpsampleParams {
    /// Upsampling factor; only 2 is supported.
    pub factor: u32,
}

impl Default for UpsampleParams {
    fn default() -> Self {
        Self { factor: 2 }
    }
}

impl CpuDevice {
    /// Doubles the H and W axes, replicating each input element into a
    /// 2×2 output block:
    ///
    /// `out[n, c, 2y+dy, 2x+dx] = in[n, c, y, x]` for `dy, dx ∈ {0, 1}`.
    ///
    /// No arithmetic is performed, so every element kind is accepted.
    /// Batch and channel axes are unchanged.
    pub fn upsample(
        &mut self,
        params: &UpsampleParams,
        input: TensorId,
        output: TensorId,
    ) -> Result<()> {
        let r = upsample_op(self, params, input, output);
        self.finish(r)
    }
}

fn upsample_op(
    dev: &mut CpuDevice,
    params: &UpsampleParams,
    input: TensorId,
    output: TensorId,
) -> Result<()> {
    let in_op = dev.kernel_operand(input)?;
    let out_op = dev.kernel_operand(output)?;

    let kind = in_op.desc.kind();
    if out_op.desc.kind() != kind {
        return Err(BackendError::UnimplementedType);
    }
    with_any_scalar!(kind, T => {
        upsample_typed::<T>(dev, params, &in_op, &out_op)
    })
}

struct Geometry {
    batch: usize,
    channels: usize,
    h_out: usize,
    w_out: usize,
}

fn validate(
    params: &UpsampleParams,
    input: &TensorDesc,
    output: &TensorDesc,
) -> Result<Geometry> {
    if params.factor != 2 {
        return Err(BackendError::IncorrectParameter);
    }
    if input.rank() != output.rank() {
        return Err(BackendError::InconsistentNumberOfDimensions);
    }
    if input.rank() < 2 {
        return Err(BackendError::InconsistentNumberOfDimensions);
    }

    let rank = input.rank();
    let mut batch = 1;
    if rank == 4 {
        if input.dims()[0] != output.dims()[0] || input.dims()[1] != output.dims()[1] {
            return Err(BackendError::InconsistentTensorSizes);
        }
        batch = input.dims()[0];
    }
    if rank == 3 && input.dims()[0] != output.dims()[0] {
        return Err(BackendError::InconsistentTensorSizes);
    }
    let channels = if rank == 2 { 1 } else { output.dims()[rank - 3] };

    if output.dims()[rank - 2] != input.dims()[rank - 2] * 2
        || output.dims()[rank - 1] != input.dims()[rank - 1] * 2
    {
        return Err(BackendError::InconsistentTensorSizes);
    }

    Ok(Geometry {
        batch,
        channels,
        h_out: output.dims()[rank - 2],
        w_out: output.dims()[rank - 1],
    })
}

/// Axis strides in element units for an NCHW operand of rank 2..=4.
fn nchw_strides<T>(desc: &TensorDesc) -> (usize, usize, usize, usize) {
    let elem = std::mem::size_of::<T>();
    let rank = desc.rank();
    let s = desc.strides();
    let sb = if rank == 4 { s[0] / elem } else { 0 };
    let sc = if rank >= 3 { s[rank - 3] / elem } else { 0 };
    let sh = s[rank - 2] / elem;
    let sw = s[rank - 1] / elem;
    (sb, sc, sh, sw)
}

fn upsample_typed<T: Scalar>(
    dev: &mut CpuDevice,
    params: &UpsampleParams,
    input: &Operand,
    output: &Operand,
) -> Result<()> {
    let g = validate(params, &input.desc, &output.desc)?;

    let (in_sb, in_sc, in_sh, in_sw) = nchw_strides::<T>(&input.desc);
    let (out_sb, out_sc, out_sh, out_sw) = nchw_strides::<T>(&output.desc);

    let zones = dev.zone_base_ptrs();
    let in_ptr = ElemPtr::<T>::new(zones[input.zone_id as usize], input.base_offset);
    let out_ptr = ElemPtr::<T>::new(zones[output.zone_id as usize], output.base_offset);

    for n in 0..g.batch {
        for c in 0..g.channels {
            for oy in 0..g.h_out {
                for ox in 0..g.w_out {
                    let in_off = n * in_sb
                        + c * in_sc
                        + (oy / 2) * in_sh
                        + (ox / 2) * in_sw;
                    let out_off =
                        n * out_sb + c * out_sc + oy * out_sh + ox * out_sw;
                    // SAFETY: offsets were derived from validated dims
                    // and strides.
                    let v = unsafe { in_ptr.load(in_off) };
                    unsafe { out_ptr.store(out_off, v) };
                }
            }
        }
    }

    Ok(())
}
