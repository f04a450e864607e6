// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dense layer: batched matrix-vector product with optional bias.

use crate::device::{CpuDevice, Operand};
use crate::dispatch::with_kernel_scalar;
use crate::ops::{effective_fp, ElemPtr};
use crate::tensor::{TensorDesc, TensorId};
use crate::{BackendError, Result};
use tensor_core::{Accum, Scalar};

/// Parameters for [`CpuDevice::dense`].
#[derive(Debug, Clone)]
pub struct DenseParams {
    /// Weight matrix, rank 2 as `(C_out, C_in)`.
    pub kernel: TensorId,
    /// Optional bias of shape `(C_out)`, same kind as the kernel.
    pub bias: Option<TensorId>,
    /// Apply `max(0, x)` to the accumulator before the output rescale.
    pub relu: bool,
}

impl DenseParams {
    /// Dense layer with no bias and no ReLU.
    pub fn new(kernel: TensorId) -> Self {
        Self {
            kernel,
            bias: None,
            relu: false,
        }
    }
}

impl CpuDevice {
    /// Computes `out[n, j] = Σ_i kernel[j, i] · in[n, i] + bias[j]`.
    ///
    /// The input is rank 1 `(C_in)` or rank 2 `(N, C_in)`; the output
    /// has the same rank with `C_in` replaced by `C_out`. Fixed-point
    /// rescaling follows the convolution law with trivial spatial
    /// dimensions.
    pub fn dense(
        &mut self,
        params: &DenseParams,
        input: TensorId,
        output: TensorId,
    ) -> Result<()> {
        let r = dense_op(self, params, input, output);
        self.finish(r)
    }
}

fn dense_op(
    dev: &mut CpuDevice,
    params: &DenseParams,
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
                dense_typed::<I, O, K>(
                    dev, params, &in_op, &out_op, &k_op, bias_op.as_ref(),
                )
            })
        })
    })
}

struct Geometry {
    batch: usize,
    c_in: usize,
    c_out: usize,
}

fn validate(
    input: &TensorDesc,
    output: &TensorDesc,
    kernel: &TensorDesc,
    bias: Option<&TensorDesc>,
) -> Result<Geometry> {
    if input.rank() > 2 {
        return Err(BackendError::InconsistentNumberOfDimensions);
    }
    if input.rank() != output.rank() {
        return Err(BackendError::InconsistentNumberOfDimensions);
    }

    let mut batch = 1;
    if input.rank() == 2 {
        if input.dims()[0] != output.dims()[0] {
            return Err(BackendError::InconsistentTensorSizes);
        }
        batch = input.dims()[0];
    }
    let c_in = input.dims()[input.rank() - 1];
    let c_out = output.dims()[output.rank() - 1];

    if kernel.rank() != 2 {
        return Err(BackendError::IncorrectParameter);
    }
    // Kernel axes are always (C_out, C_in).
    if kernel.dims()[0] != c_out || kernel.dims()[1] != c_in {
        return Err(BackendError::InconsistentTensorSizes);
    }

    if let Some(bias) = bias {
        if bias.kind() != kernel.kind() {
            return Err(BackendError::IncorrectParameter);
        }
        if bias.rank() != 1 {
            return Err(BackendError::IncorrectParameter);
        }
        if bias.dims()[0] != c_out {
            return Err(BackendError::InconsistentTensorSizes);
        }
    }

    Ok(Geometry { batch, c_in, c_out })
}

/// (batch stride, channel stride) in element units for rank 1 or 2.
fn nc_strides<T>(desc: &TensorDesc) -> (usize, usize) {
    let elem = std::mem::size_of::<T>();
    let s = desc.strides();
    if desc.rank() == 2 {
        (s[0] / elem, s[1] / elem)
    } else {
        (0, s[0] / elem)
    }
}

fn dense_typed<I: Scalar, O: Scalar, K: Scalar>(
    dev: &mut CpuDevice,
    params: &DenseParams,
    input: &Operand,
    output: &Operand,
    kernel: &Operand,
    bias: Option<&Operand>,
) -> Result<()> {
    let g = validate(
        &input.desc,
        &output.desc,
        &kernel.desc,
        bias.map(|b| &b.desc),
    )?;

    let fp_in = effective_fp(&input.desc);
    let fp_k = effective_fp(&kernel.desc);
    let fp_out = effective_fp(&output.desc);
    let out_shift = fp_out - (fp_in + fp_k);
    let bias_reshift = bias
        .map(|b| (fp_in + fp_k) - effective_fp(&b.desc))
        .unwrap_or(0);

    let (in_sb, in_sc) = nc_strides::<I>(&input.desc);
    let (out_sb, out_sc) = nc_strides::<O>(&output.desc);
    let ke = std::mem::size_of::<K>();
    let k_s0 = kernel.desc.strides()[0] / ke;
    let k_s1 = kernel.desc.strides()[1] / ke;
    let bias_stride = bias.map(|b| b.desc.strides()[0] / ke).unwrap_or(0);

    let zones = dev.zone_base_ptrs();
    let in_ptr = ElemPtr::<I>::new(zones[input.zone_id as usize], input.base_offset);
    let out_ptr = ElemPtr::<O>::new(zones[output.zone_id as usize], output.base_offset);
    let k_ptr = ElemPtr::<K>::new(zones[kernel.zone_id as usize], kernel.base_offset);
    let bias_ptr =
        bias.map(|b| ElemPtr::<K>::new(zones[b.zone_id as usize], b.base_offset));

    for n in 0..g.batch {
        for j in 0..g.c_out {
            // Start from the bias, rescaled into the accumulator frame.
            let mut acc: O::Acc = match bias_ptr {
                // SAFETY: j < c_out == bias length, validated above.
                Some(p) => {
                    <O::Acc as Accum>::read(unsafe { p.load(j * bias_stride) })
                        .rescale(bias_reshift)
                }
                None => <O::Acc as Accum>::ZERO,
            };

            for i in 0..g.c_in {
                // SAFETY: offsets were derived from validated dims and
                // strides.
                let x = <O::Acc as Accum>::read(unsafe {
                    in_ptr.load(n * in_sb + i * in_sc)
                });
                let kv = <O::Acc as Accum>::read(unsafe {
                    k_ptr.load(j * k_s0 + i * k_s1)
                });
                acc = acc + kv * x;
            }

            let stored: O = if params.relu && !acc.is_positive() {
                O::default()
            } else {
                acc.rescale(out_shift).store()
            };
            // SAFETY: as above.
            unsafe { out_ptr.store(n * out_sb + j * out_sc, stored) };
        }
    }

    Ok(())
}
