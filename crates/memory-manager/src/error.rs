// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for zone configuration.

/// Errors raised while building the zone collection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// The configuration string does not follow the
    /// `size(K|M|G)?(;size(K|M|G)?)*` grammar.
    #[error("invalid zone specification '{0}': expected ';'-separated sizes with optional K/M/G suffix")]
    InvalidZoneSpec(String),

    /// A declared zone size does not fit in `usize`.
    #[error("zone size overflow in specification '{0}'")]
    ZoneSizeOverflow(String),
}
