// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # accel-cpu
//!
//! Reference CPU backend for the accelerator abstraction layer.
//!
//! The API is a small, stable, synchronous operation surface over opaque
//! tensor handles:
//!
//! - **Declaration** — [`CpuDevice::allocate`] reserves a caller-chosen
//!   range of a memory zone; [`CpuDevice::view`] and
//!   [`CpuDevice::reshape`] alias existing storage. Handles are released
//!   with [`CpuDevice::release`], and [`CpuDevice::map_tensor`] exposes
//!   raw bytes to the host.
//! - **Staging** — [`CpuDevice::copy_to_tensor`] and
//!   [`CpuDevice::copy_from_tensor`] move flat row-major host buffers in
//!   and out, casting between element kinds on the fly.
//! - **Compute** — [`CpuDevice::conv2d`], [`CpuDevice::dense`],
//!   [`CpuDevice::add`], [`CpuDevice::softmax`], and
//!   [`CpuDevice::upsample`], each dispatching to a kernel monomorphized
//!   for the operand element kinds.
//!
//! Every operation returns a [`BackendError`] kind with an ABI-stable
//! numeric code on failure. Execution is synchronous end-to-end: the
//! flush/wait/callback surface exists for interface compatibility and
//! completes trivially.

mod alloc;
mod config;
mod copy;
mod device;
mod dispatch;
mod error;
mod ops;
mod tensor;

pub use alloc::MapFlag;
pub use config::{BackendConfig, USE_EXCEPTION_ENV_KEY};
pub use copy::HostScalar;
pub use device::{default_device_id, list_devices, CpuDevice, DEFAULT_DEVICE_ID};
pub use error::{BackendError, Result, SUCCESS_CODE};
pub use ops::{Conv2dParams, DenseParams, UpsampleParams};
pub use tensor::{Storage, TensorDesc, TensorId};
