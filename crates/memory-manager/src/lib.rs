// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Preallocated, monotone memory zones for tensor storage.
//!
//! # Key Components
//!
//! - [`ZoneConfig`] — parses the `size(K|M|G)?(;size(K|M|G)?)*`
//!   configuration grammar, read from the `ACCEL_CPU_MEMORY` environment
//!   variable with a `"128M"` default.
//! - [`MemoryZone`] — a fixed byte arena with a live-tensor counter.
//! - [`ZoneCollection`] — the ordered set of zones, built once.
//!
//! # Allocation Model
//!
//! Zones are *monotone arenas*: there is no free list and released
//! storage is never handed back. Clients compute their own byte offsets
//! into a zone, and tensors are allowed to overlap — overlapping
//! allocations implement implicit concatenation. Introducing a
//! general-purpose allocator here would break that contract.

mod config;
mod error;
mod zone;

pub use config::{ZoneConfig, DEFAULT_ZONE_SPEC, MEMORY_ENV_KEY};
pub use error::MemoryError;
pub use zone::{MemoryZone, ZoneCollection};
