// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-kind dispatch.
//!
//! The kernels are generic over storage scalars; these macros perform
//! the one runtime switch from an [`tensor_core::ElemKind`] value into a
//! monomorphized instantiation. Kinds a macro does not enumerate fall
//! through to `UnimplementedType` — a dispatch miss is a reportable
//! error, never a crash.
//!
//! Nesting the macro once per operand expands the full type matrix; the
//! compute kernels (conv2d, dense, add, softmax) exclude the 4-bit
//! kinds, while upsample accepts all eight.

/// Switches over the six kernel-capable kinds, binding `$T` to the
/// matching storage scalar inside `$body`.
macro_rules! with_kernel_scalar {
    ($kind:expr, $T:ident => $body:expr) => {
        match $kind {
            tensor_core::ElemKind::F16 => {
                type $T = tensor_core::f16;
                $body
            }
            tensor_core::ElemKind::F32 => {
                type $T = f32;
                $body
            }
            tensor_core::ElemKind::SFx8 => {
                type $T = i8;
                $body
            }
            tensor_core::ElemKind::SFx16 => {
                type $T = i16;
                $body
            }
            tensor_core::ElemKind::UFx8 => {
                type $T = u8;
                $body
            }
            tensor_core::ElemKind::UFx16 => {
                type $T = u16;
                $body
            }
            _ => Err($crate::BackendError::UnimplementedType),
        }
    };
}

/// Switches over all eight kinds, binding `$T` to the storage scalar.
/// The 4-bit kinds share the 8-bit storage scalars.
macro_rules! with_any_scalar {
    ($kind:expr, $T:ident => $body:expr) => {
        match $kind {
            tensor_core::ElemKind::F16 => {
                type $T = tensor_core::f16;
                $body
            }
            tensor_core::ElemKind::F32 => {
                type $T = f32;
                $body
            }
            tensor_core::ElemKind::SFx4 | tensor_core::ElemKind::SFx8 => {
                type $T = i8;
                $body
            }
            tensor_core::ElemKind::SFx16 => {
                type $T = i16;
                $body
            }
            tensor_core::ElemKind::UFx4 | tensor_core::ElemKind::UFx8 => {
                type $T = u8;
                $body
            }
            tensor_core::ElemKind::UFx16 => {
                type $T = u16;
                $body
            }
        }
    };
}

pub(crate) use with_any_scalar;
pub(crate) use with_kernel_scalar;
