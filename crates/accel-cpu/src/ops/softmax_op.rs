// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Numerically-stable softmax along the rank-determined axis.

use crate::device::{CpuDevice, Operand};
use crate::dispatch::with_kernel_scalar;
use crate::ops::ElemPtr;
use crate::tensor::{TensorDesc, TensorId};
use crate::{BackendError, Result};
use tensor_core::{cast_element, fp_delta, scale_factor, ElemKind, Scalar};

impl CpuDevice {
    /// Applies softmax along the axis determined by the tensor's rank:
    ///
    /// - rank 1 `(C)` — axis 0;
    /// - rank 2 `(N, C)` — axis 1, one distribution per batch row;
    /// - rank 3 `(C, H, W)` — axis 0, every `(h, w)` position is an
    ///   independent slice;
    /// - rank 4 `(N, C, H, W)` — axis 1, independent per batch and
    ///   `(h, w)` position.
    ///
    /// Each slice is max-subtracted, exponentiated, and normalised in
    /// `f32`. Fixed-point operands pass through the element cast matrix
    /// on load and store, so the output carries the output tensor's
    /// fractional shift.
    pub fn softmax(&mut self, input: TensorId, output: TensorId) -> Result<()> {
        let r = softmax_op(self, input, output);
        self.finish(r)
    }
}

fn softmax_op(dev: &mut CpuDevice, input: TensorId, output: TensorId) -> Result<()> {
    let in_op = dev.kernel_operand(input)?;
    let out_op = dev.kernel_operand(output)?;

    let kind = in_op.desc.kind();
    if out_op.desc.kind() != kind {
        return Err(BackendError::UnimplementedType);
    }
    with_kernel_scalar!(kind, T => {
        softmax_typed::<T>(dev, &in_op, &out_op)
    })
}

#[derive(Debug)]
struct Geometry {
    batch: usize,
    channels: usize,
    slice: [usize; 2],
}

fn validate(input: &TensorDesc, output: &TensorDesc) -> Result<Geometry> {
    if input.rank() != output.rank() {
        return Err(BackendError::InconsistentNumberOfDimensions);
    }
    if input.dims() != output.dims() {
        return Err(BackendError::InconsistentTensorSizes);
    }

    let d = input.dims();
    let g = match input.rank() {
        1 => Geometry {
            batch: 1,
            channels: d[0],
            slice: [1, 1],
        },
        2 => Geometry {
            batch: d[0],
            channels: d[1],
            slice: [1, 1],
        },
        3 => Geometry {
            batch: 1,
            channels: d[0],
            slice: [d[1], d[2]],
        },
        _ => Geometry {
            batch: d[0],
            channels: d[1],
            slice: [d[2], d[3]],
        },
    };
    Ok(g)
}

/// (batch, channel, slice-h, slice-w) strides in element units, laid
/// out to match the [`Geometry`] axes for each rank.
fn softmax_strides<T>(desc: &TensorDesc) -> [usize; 4] {
    let elem = std::mem::size_of::<T>();
    let s = desc.strides();
    match desc.rank() {
        1 => [0, s[0] / elem, 0, 0],
        2 => [s[0] / elem, s[1] / elem, 0, 0],
        3 => [0, s[0] / elem, s[1] / elem, s[2] / elem],
        _ => [s[0] / elem, s[1] / elem, s[2] / elem, s[3] / elem],
    }
}

fn softmax_typed<T: Scalar>(
    dev: &mut CpuDevice,
    input: &Operand,
    output: &Operand,
) -> Result<()> {
    let g = validate(&input.desc, &output.desc)?;

    // Fixed-point operands go through the cast matrix: loads divide by
    // 2^fp_in, stores multiply by 2^fp_out and truncate.
    let in_delta = fp_delta(input.desc.kind(), input.desc.fp_shift(), ElemKind::F32, 0);
    let in_factor = scale_factor(in_delta);
    let out_delta =
        fp_delta(ElemKind::F32, 0, output.desc.kind(), output.desc.fp_shift());
    let out_factor = scale_factor(out_delta);

    let in_s = softmax_strides::<T>(&input.desc);
    let out_s = softmax_strides::<T>(&output.desc);

    let zones = dev.zone_base_ptrs();
    let in_ptr = ElemPtr::<T>::new(zones[input.zone_id as usize], input.base_offset);
    let out_ptr = ElemPtr::<T>::new(zones[output.zone_id as usize], output.base_offset);

    let mut exps = vec![0.0f32; g.channels];
    for n in 0..g.batch {
        for sy in 0..g.slice[0] {
            for sx in 0..g.slice[1] {
                let in_base = n * in_s[0] + sy * in_s[2] + sx * in_s[3];
                let out_base = n * out_s[0] + sy * out_s[2] + sx * out_s[3];

                // SAFETY (all accesses below): offsets were derived
                // from validated dims and strides.
                let mut max = f32::NEG_INFINITY;
                for c in 0..g.channels {
                    let x: f32 = cast_element(
                        unsafe { in_ptr.load(in_base + c * in_s[1]) },
                        in_delta,
                        in_factor,
                    );
                    max = max.max(x);
                }

                let mut sum = 0.0f32;
                for (c, e) in exps.iter_mut().enumerate() {
                    let x: f32 = cast_element(
                        unsafe { in_ptr.load(in_base + c * in_s[1]) },
                        in_delta,
                        in_factor,
                    );
                    *e = (x - max).exp();
                    sum += *e;
                }

                let inv = 1.0 / sum;
                for (c, e) in exps.iter().enumerate() {
                    let y: T = cast_element(*e * inv, out_delta, out_factor);
                    unsafe { out_ptr.store(out_base + c * out_s[1], y) };
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::ElemKind;

    fn desc(dims: &[usize]) -> TensorDesc {
        let mut d = TensorDesc::new(0, ElemKind::F32, dims, 0).unwrap();
        d.set_strides(d.shape().byte_strides(ElemKind::F32));
        d
    }

    #[test]
    fn test_axis_selection_by_rank() {
        let g1 = validate(&desc(&[7]), &desc(&[7])).unwrap();
        assert_eq!((g1.batch, g1.channels, g1.slice), (1, 7, [1, 1]));

        let g2 = validate(&desc(&[3, 7]), &desc(&[3, 7])).unwrap();
        assert_eq!((g2.batch, g2.channels, g2.slice), (3, 7, [1, 1]));

        // Rank 3 is (C, H, W): the leading axis is the channel.
        let g3 = validate(&desc(&[3, 4, 5]), &desc(&[3, 4, 5])).unwrap();
        assert_eq!((g3.batch, g3.channels, g3.slice), (1, 3, [4, 5]));

        let g4 = validate(&desc(&[2, 3, 4, 5]), &desc(&[2, 3, 4, 5])).unwrap();
        assert_eq!((g4.batch, g4.channels, g4.slice), (2, 3, [4, 5]));
    }

    #[test]
    fn test_shape_checks() {
        assert_eq!(
            validate(&desc(&[3, 4]), &desc(&[4, 3])).unwrap_err(),
            BackendError::InconsistentTensorSizes
        );
        assert_eq!(
            validate(&desc(&[3, 4]), &desc(&[12])).unwrap_err(),
            BackendError::InconsistentNumberOfDimensions
        );
    }
}
