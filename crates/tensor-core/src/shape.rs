// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor shapes and byte-stride layout rules.
//!
//! Elements are stored row-major with `dims[0]` as the slowest axis.
//! Axis conventions by rank: 1D = (C), 2D = (N, C), 3D = (C, H, W),
//! 4D = (N, C, H, W). Strides are kept in bytes so that descriptors stay
//! portable across element kinds; kernels divide by the element size once
//! per axis and iterate in element units.

use crate::dtype::ElemKind;
use crate::error::ShapeError;
use std::fmt;

/// Highest supported tensor rank.
pub const MAX_RANK: usize = 4;

/// Dimension vector of a tensor, rank 1 through 4.
///
/// Zero-length axes are rejected: a tensor always holds at least one
/// element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a shape, validating rank and axis lengths.
    pub fn new(dims: &[usize]) -> Result<Self, ShapeError> {
        if dims.is_empty() || dims.len() > MAX_RANK {
            return Err(ShapeError::InvalidRank(dims.len()));
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(ShapeError::ZeroLengthAxis);
        }
        Ok(Self {
            dims: dims.to_vec(),
        })
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the dimensions as a slice.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Returns the size of one dimension.
    ///
    /// # Panics
    /// Panics if `axis >= rank`.
    pub fn dim(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    /// Returns the total number of elements.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Computes dense row-major strides in bytes for the given kind.
    ///
    /// The innermost stride is the element size; every outer stride is
    /// the next-inner stride times the next-inner dimension, with no
    /// padding.
    pub fn byte_strides(&self, kind: ElemKind) -> Vec<usize> {
        let rank = self.dims.len();
        let mut strides = vec![0usize; rank];
        strides[rank - 1] = kind.size_bytes();
        for i in (0..rank.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

/// Computes byte strides for reinterpreting a (possibly non-contiguous)
/// layout under a new dimension vector, without moving data.
///
/// The old layout is decomposed into maximal contiguous chunks; the new
/// dimensions are packed greedily into those chunks from the innermost
/// axis outward. Returns `None` when the new geometry would bridge a
/// stride hole — e.g. a 3×4×5 tensor with byte strides (30, 6, 1) cannot
/// become 5×3×4, while 2×3×1 with strides (6, 2, 1) can become 3×2×1.
///
/// Both shapes must hold the same number of elements.
pub fn reshape_strides(
    old_dims: &[usize],
    old_strides: &[usize],
    new_dims: &[usize],
) -> Option<Vec<usize>> {
    debug_assert_eq!(
        old_dims.iter().product::<usize>(),
        new_dims.iter().product::<usize>()
    );

    let mut new_strides = vec![0usize; new_dims.len()];
    let mut view_d: isize = new_dims.len() as isize - 1;
    // Stride of one element within the chunk currently being matched.
    let mut chunk_stride = *old_strides.last()?;
    let mut tensor_numel = 1usize;
    let mut view_numel = 1usize;

    for tensor_d in (0..old_dims.len()).rev() {
        tensor_numel *= old_dims[tensor_d];
        // A chunk ends at the outermost axis, or where the next axis out
        // stops being contiguous with what has been accumulated so far.
        // Size-1 axes never break a chunk.
        let boundary = tensor_d == 0
            || (old_dims[tensor_d - 1] != 1
                && old_strides[tensor_d - 1] != tensor_numel * chunk_stride);
        if !boundary {
            continue;
        }

        while view_d >= 0
            && (view_numel < tensor_numel || new_dims[view_d as usize] == 1)
        {
            new_strides[view_d as usize] = view_numel * chunk_stride;
            view_numel *= new_dims[view_d as usize];
            view_d -= 1;
        }
        if view_numel != tensor_numel {
            return None;
        }
        if tensor_d > 0 {
            chunk_stride = old_strides[tensor_d - 1];
            tensor_numel = 1;
            view_numel = 1;
        }
    }

    if view_d != -1 {
        return None;
    }
    Some(new_strides)
}
