// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! 3×3 2-D convolution with per-edge padding and per-axis stride.

use crate::device::{CpuDevice, Operand};
use crate::dispatch::with_kernel_scalar;
use crate::ops::{effective_fp, ElemPtr};
use crate::tensor::{TensorDesc, TensorId};
use crate::{BackendError, Result};
use tensor_core::{Accum, Scalar};

const KERNEL_SIZE: usize = 3;
const MAX_PADDING: u32 = 2;
const MAX_STRIDE: u32 = 2;

/// Parameters for [`CpuDevice::conv2d`].
#[derive(Debug, Clone)]
pub struct Conv2dParams {
    /// Convolution weights, always rank 4 as `(C_out, C_in, 3, 3)`.
    pub kernel: TensorId,
    /// Optional bias of shape `(C_out)` or `(1, C_out)`, same kind as
    /// the kernel.
    pub bias: Option<TensorId>,
    /// Padding `[[top, bottom], [left, right]]`, each in `0..=2`.
    pub padding: [[u32; 2]; 2],
    /// Stride `[h, w]`, each 1 or 2.
    pub stride: [u32; 2],
    /// Dilation `[h, w]`; only 1 is supported.
    pub dilation: [u32; 2],
    /// Apply `max(0, x)` to the accumulator before the output rescale.
    pub relu: bool,
}

impl Conv2dParams {
    /// Unpadded, unit-stride convolution with no bias and no ReLU.
    pub fn new(kernel: TensorId) -> Self {
        Self {
            kernel,
            bias: None,
            padding: [[0, 0], [0, 0]],
            stride: [1, 1],
            dilation: [1, 1],
            relu: false,
        }
    }
}

impl CpuDevice {
    /// Runs a 3×3 2-D convolution of `input` into `output`.
    ///
    /// Tensors are NCHW with the batch and channel axes optional:
    /// rank 2 = `(H, W)`, rank 3 = `(C, H, W)`, rank 4 = `(N, C, H, W)`.
    /// The output spatial dimensions must satisfy
    /// `H_out = (H + pad_top + pad_bottom − 3) / stride_h + 1` (integer
    /// division, kernel size 3), and likewise for `W_out`.
    pub fn conv2d(
        &mut self,
        params: &Conv2dParams,
        input: TensorId,
        output: TensorId,
    ) -> Result<()> {
        let r = conv2d_op(self, params, input, output);
        self.finish(r)
    }
}

fn conv2d_op(
    dev: &mut CpuDevice,
    params: &Conv2dParams,
    input: TensorId,
    output: TensorId,
) -> Result<()> {
    let in_op = dev.kernel_operand(input)?;
    let out_op = dev.kernel_operand(output)?;
    let k_op = dev.kernel_operand(params.kernel)?;
    let bias_op = match params.bias {
        Some(b) => Some(dev.kernel_operand(b).map_err(|e| {
            if e == BackendError::UnknownTensor {
                BackendError::IncorrectParameter
            } else {
                e
            }
        })?),
        None => None,
    };

    let (in_kind, out_kind, k_kind) =
        (in_op.desc.kind(), out_op.desc.kind(), k_op.desc.kind());
    with_kernel_scalar!(in_kind, I => {
        with_kernel_scalar!(out_kind, O => {
            with_kernel_scalar!(k_kind, K => {
                conv2d_typed::<I, O, K>(
                    dev, params, &in_op, &out_op, &k_op, bias_op.as_ref(),
                )
            })
        })
    })
}

#[derive(Debug)]
struct Geometry {
    batch: usize,
    c_in: usize,
    c_out: usize,
    h: i64,
    w: i64,
    h_out: usize,
    w_out: usize,
    pad_top: i64,
    pad_left: i64,
    stride_h: usize,
    stride_w: usize,
}

fn validate(
    params: &Conv2dParams,
    input: &TensorDesc,
    output: &TensorDesc,
    kernel: &TensorDesc,
    bias: Option<&TensorDesc>,
) -> Result<Geometry> {
    if input.rank() != output.rank() {
        return Err(BackendError::InconsistentTensorSizes);
    }
    if input.rank() < 2 {
        return Err(BackendError::InconsistentNumberOfDimensions);
    }

    let rank = input.rank();
    let mut batch = 1;
    if rank == 4 {
        if input.dims()[0] != output.dims()[0] {
            return Err(BackendError::InconsistentTensorSizes);
        }
        batch = input.dims()[0];
    }
    let c_in = if rank == 2 { 1 } else { input.dims()[rank - 3] };
    let c_out = if rank == 2 { 1 } else { output.dims()[rank - 3] };

    if kernel.rank() != 4 {
        return Err(BackendError::IncorrectParameter);
    }
    // Kernel axes are always (C_out, C_in, H, W).
    if kernel.dims()[0] != c_out
        || kernel.dims()[1] != c_in
        || kernel.dims()[2] != KERNEL_SIZE
        || kernel.dims()[3] != KERNEL_SIZE
    {
        return Err(BackendError::InconsistentTensorSizes);
    }

    if params.stride.iter().any(|&s| s < 1 || s > MAX_STRIDE) {
        return Err(BackendError::IncorrectParameter);
    }
    if params.dilation != [1, 1] {
        return Err(BackendError::IncorrectParameter);
    }
    if params.padding.iter().flatten().any(|&p| p > MAX_PADDING) {
        return Err(BackendError::IncorrectParameter);
    }

    if let Some(bias) = bias {
        if bias.kind() != kernel.kind() {
            return Err(BackendError::IncorrectParameter);
        }
        if !(bias.rank() == 1 || (bias.rank() == 2 && bias.dims()[0] == 1)) {
            return Err(BackendError::IncorrectParameter);
        }
        if bias.dims()[bias.rank() - 1] != c_out {
            return Err(BackendError::InconsistentTensorSizes);
        }
    }

    let h = input.dims()[rank - 2] as i64;
    let w = input.dims()[rank - 1] as i64;
    let expected_h = (h + i64::from(params.padding[0][0]) + i64::from(params.padding[0][1])
        - (KERNEL_SIZE as i64 - 1)
        - 1)
        / i64::from(params.stride[0])
        + 1;
    let expected_w = (w + i64::from(params.padding[1][0]) + i64::from(params.padding[1][1])
        - (KERNEL_SIZE as i64 - 1)
        - 1)
        / i64::from(params.stride[1])
        + 1;
    if output.dims()[rank - 2] as i64 != expected_h
        || output.dims()[rank - 1] as i64 != expected_w
    {
        return Err(BackendError::InconsistentTensorSizes);
    }

    Ok(Geometry {
        batch,
        c_in,
        c_out,
        h,
        w,
        h_out: output.dims()[rank - 2],
        w_out: output.dims()[rank - 1],
        pad_top: i64::from(params.padding[0][0]),
        pad_left: i64::from(params.padding[1][0]),
        stride_h: params.stride[0] as usize,
        stride_w: params.stride[1] as usize,
    })
}

/// Axis strides in element units for an NCHW operand of rank 2..=4.
/// Missing axes get stride zero, which folds them out of the offset
/// arithmetic.
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

fn conv2d_typed<I: Scalar, O: Scalar, K: Scalar>(
    dev: &mut CpuDevice,
    params: &Conv2dParams,
    input: &Operand,
    output: &Operand,
    kernel: &Operand,
    bias: Option<&Operand>,
) -> Result<()> {
    let g = validate(
        params,
        &input.desc,
        &output.desc,
        &kernel.desc,
        bias.map(|b| &b.desc),
    )?;

    // The accumulator carries the implicit shift fp_in + fp_k; the bias
    // is rescaled into that frame before the sum, and the accumulator
    // into the output frame at store.
    let fp_in = effective_fp(&input.desc);
    let fp_k = effective_fp(&kernel.desc);
    let fp_out = effective_fp(&output.desc);
    let out_shift = fp_out - (fp_in + fp_k);
    let bias_reshift = bias
        .map(|b| (fp_in + fp_k) - effective_fp(&b.desc))
        .unwrap_or(0);

    let (in_sb, in_sc, in_sh, in_sw) = nchw_strides::<I>(&input.desc);
    let (out_sb, out_sc, out_sh, out_sw) = nchw_strides::<O>(&output.desc);
    let ks = kernel.desc.strides();
    let ke = std::mem::size_of::<K>();
    let (k_s0, k_s1, k_s2, k_s3) = (ks[0] / ke, ks[1] / ke, ks[2] / ke, ks[3] / ke);
    let bias_stride = bias
        .map(|b| b.desc.strides()[b.desc.rank() - 1] / ke)
        .unwrap_or(0);

    let zones = dev.zone_base_ptrs();
    let in_ptr = ElemPtr::<I>::new(zones[input.zone_id as usize], input.base_offset);
    let out_ptr = ElemPtr::<O>::new(zones[output.zone_id as usize], output.base_offset);
    let k_ptr = ElemPtr::<K>::new(zones[kernel.zone_id as usize], kernel.base_offset);
    let bias_ptr =
        bias.map(|b| ElemPtr::<K>::new(zones[b.zone_id as usize], b.base_offset));

    for n in 0..g.batch {
        for oc in 0..g.c_out {
            // Hoist the bias out of the spatial loops, already in the
            // accumulator frame.
            let bias_val: O::Acc = match bias_ptr {
                // SAFETY: oc < c_out == bias length, validated above.
                Some(p) => {
                    <O::Acc as Accum>::read(unsafe { p.load(oc * bias_stride) })
                        .rescale(bias_reshift)
                }
                None => <O::Acc as Accum>::ZERO,
            };

            for oy in 0..g.h_out {
                for ox in 0..g.w_out {
                    let mut acc = <O::Acc as Accum>::ZERO;
                    for ic in 0..g.c_in {
                        for ky in 0..KERNEL_SIZE {
                            let iy = (oy * g.stride_h + ky) as i64 - g.pad_top;
                            if iy < 0 || iy >= g.h {
                                continue;
                            }
                            for kx in 0..KERNEL_SIZE {
                                let ix = (ox * g.stride_w + kx) as i64 - g.pad_left;
                                if ix < 0 || ix >= g.w {
                                    continue;
                                }
                                let in_off = n * in_sb
                                    + ic * in_sc
                                    + iy as usize * in_sh
                                    + ix as usize * in_sw;
                                let k_off =
                                    oc * k_s0 + ic * k_s1 + ky * k_s2 + kx * k_s3;
                                // SAFETY: offsets were derived from
                                // validated dims and strides.
                                let x = <O::Acc as Accum>::read(unsafe { in_ptr.load(in_off) });
                                let kv = <O::Acc as Accum>::read(unsafe { k_ptr.load(k_off) });
                                acc = acc + kv * x;
                            }
                        }
                    }

                    acc = acc + bias_val;
                    let stored: O = if params.relu && !acc.is_positive() {
                        O::default()
                    } else {
                        acc.rescale(out_shift).store()
                    };
                    let out_off =
                        n * out_sb + oc * out_sc + oy * out_sh + ox * out_sw;
                    // SAFETY: offsets were derived from validated dims
                    // and strides.
                    unsafe { out_ptr.store(out_off, stored) };
                }
            }
        }
    }

    Ok(())
}
