// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for shape construction.

/// Errors raised while building a [`crate::Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// The rank is outside the supported 1..=4 range.
    #[error("unsupported rank {0}: tensors have 1 to 4 dimensions")]
    InvalidRank(usize),

    /// One of the axes has length zero.
    #[error("zero-length axes are not supported")]
    ZeroLengthAxis,
}
