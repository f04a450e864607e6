// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Element-level building blocks for the accelerator backend.
//!
//! This crate provides:
//! - [`ElemKind`] — the eight supported element kinds with their
//!   bit-widths, signedness, and float predicates.
//! - [`Scalar`] / [`Accum`] — the storage-scalar and accumulator traits
//!   kernels are monomorphized over.
//! - [`shift`] — the fixed-point rescaling primitive.
//! - [`cast_element`] — the element conversion matrix between any two
//!   storage scalars, parameterised by a fractional-bit delta.
//! - [`Shape`] — dimension vectors with row-major byte-stride layout and
//!   the no-copy reshape compatibility rule.
//!
//! IEEE 754 binary16 conversion is delegated to the [`half`] crate; the
//! [`f16`] type is re-exported for callers staging half-precision data.

mod cast;
mod dtype;
mod error;
mod fixed;
mod scalar;
mod shape;

pub use cast::{cast_element, fp_delta, scale_factor};
pub use dtype::ElemKind;
pub use error::ShapeError;
pub use fixed::shift;
pub use half::f16;
pub use scalar::{Accum, Scalar};
pub use shape::{reshape_strides, Shape, MAX_RANK};
