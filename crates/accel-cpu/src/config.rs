// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backend configuration from the process environment.
//!
//! Two variables are read:
//!
//! - `ACCEL_CPU_MEMORY` — the zone configuration string, grammar
//!   `size(K|M|G)?(;size(K|M|G)?)*`, default `"128M"`.
//! - `ACCEL_CPU_USE_EXCEPTION` — when set to `"1"`, a failing API call
//!   panics after the error code has been recorded. Intended as a
//!   fail-fast debugging aid; disabled by default.

use crate::{BackendError, Result};
use memory_manager::ZoneConfig;

/// Environment variable enabling panic-on-error.
pub const USE_EXCEPTION_ENV_KEY: &str = "ACCEL_CPU_USE_EXCEPTION";

/// Configuration for a [`crate::CpuDevice`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BackendConfig {
    /// Zone sizes for the device's memory.
    pub zones: ZoneConfig,
    /// Panic on any failing API call, in addition to returning the
    /// error.
    pub panic_on_error: bool,
}

impl BackendConfig {
    /// Reads the configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let zones = ZoneConfig::from_env().map_err(|e| {
            tracing::error!(error = %e, "invalid zone configuration");
            BackendError::IncorrectParameter
        })?;
        let panic_on_error = std::env::var(USE_EXCEPTION_ENV_KEY)
            .map(|v| v == "1")
            .unwrap_or(false);
        Ok(Self {
            zones,
            panic_on_error,
        })
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            zones: ZoneConfig::default(),
            panic_on_error: false,
        }
    }
}
