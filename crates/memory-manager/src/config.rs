// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory-zone configuration and parsing.
//!
//! Zone sizes come from a single configuration string: a `;`-separated
//! list of sizes, each a decimal number with an optional `K`, `M`, or `G`
//! suffix (powers of 1024). `"128M"` declares one 128 MiB zone;
//! `"64M;64M;1G"` declares three zones in order.

use crate::MemoryError;
use std::fmt;

/// Environment variable holding the zone configuration string.
pub const MEMORY_ENV_KEY: &str = "ACCEL_CPU_MEMORY";

/// Configuration used when [`MEMORY_ENV_KEY`] is unset.
pub const DEFAULT_ZONE_SPEC: &str = "128M";

/// Ordered list of zone sizes in bytes.
///
/// # Examples
/// ```
/// use memory_manager::ZoneConfig;
///
/// let cfg = ZoneConfig::parse("64M;2048K").unwrap();
/// assert_eq!(cfg.sizes(), &[64 * 1024 * 1024, 2 * 1024 * 1024]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ZoneConfig {
    sizes: Vec<usize>,
}

impl ZoneConfig {
    /// Builds a configuration from explicit byte sizes.
    pub fn from_sizes(sizes: Vec<usize>) -> Self {
        Self { sizes }
    }

    /// Parses a `;`-separated list of sizes with optional `K`/`M`/`G`
    /// suffixes (case-insensitive).
    pub fn parse(spec: &str) -> Result<Self, MemoryError> {
        let mut sizes = Vec::new();
        for segment in spec.split(';') {
            sizes.push(parse_size(segment, spec)?);
        }
        Ok(Self { sizes })
    }

    /// Reads the configuration from [`MEMORY_ENV_KEY`], falling back to
    /// [`DEFAULT_ZONE_SPEC`] when the variable is unset.
    pub fn from_env() -> Result<Self, MemoryError> {
        match std::env::var(MEMORY_ENV_KEY) {
            Ok(spec) => Self::parse(&spec),
            Err(_) => Self::parse(DEFAULT_ZONE_SPEC),
        }
    }

    /// Returns the zone sizes in bytes, in declaration order.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Returns the number of declared zones.
    pub fn num_zones(&self) -> usize {
        self.sizes.len()
    }

    /// Returns the sum of all zone sizes in bytes.
    pub fn total_bytes(&self) -> usize {
        self.sizes.iter().sum()
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self::parse(DEFAULT_ZONE_SPEC).expect("default zone spec is valid")
    }
}

impl fmt::Display for ZoneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, size) in self.sizes.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            write!(f, "{size}")?;
        }
        Ok(())
    }
}

fn parse_size(segment: &str, full_spec: &str) -> Result<usize, MemoryError> {
    let segment = segment.trim();
    if segment.is_empty() {
        return Err(MemoryError::InvalidZoneSpec(full_spec.to_string()));
    }

    let (digits, multiplier) = match segment.chars().last() {
        Some('K') | Some('k') => (&segment[..segment.len() - 1], 1024usize),
        Some('M') | Some('m') => (&segment[..segment.len() - 1], 1024 * 1024),
        Some('G') | Some('g') => (&segment[..segment.len() - 1], 1024 * 1024 * 1024),
        _ => (segment, 1),
    };

    let value: usize = digits
        .trim()
        .parse()
        .map_err(|_| MemoryError::InvalidZoneSpec(full_spec.to_string()))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| MemoryError::ZoneSizeOverflow(full_spec.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_bytes() {
        let cfg = ZoneConfig::parse("4096").unwrap();
        assert_eq!(cfg.sizes(), &[4096]);
    }

    #[test]
    fn test_parse_suffixes() {
        let cfg = ZoneConfig::parse("2K;3M;1G").unwrap();
        assert_eq!(
            cfg.sizes(),
            &[2 * 1024, 3 * 1024 * 1024, 1024 * 1024 * 1024]
        );
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            ZoneConfig::parse("128m").unwrap(),
            ZoneConfig::parse("128M").unwrap()
        );
    }

    #[test]
    fn test_parse_preserves_order() {
        let cfg = ZoneConfig::parse("1K;2K;3K").unwrap();
        assert_eq!(cfg.sizes(), &[1024, 2048, 3072]);
    }

    #[test]
    fn test_default_is_single_128m_zone() {
        let cfg = ZoneConfig::default();
        assert_eq!(cfg.sizes(), &[128 * 1024 * 1024]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ZoneConfig::parse("").is_err());
        assert!(ZoneConfig::parse("64M;").is_err());
        assert!(ZoneConfig::parse("12Q").is_err());
        assert!(ZoneConfig::parse("M").is_err());
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(matches!(
            ZoneConfig::parse("99999999999999999999G"),
            Err(MemoryError::InvalidZoneSpec(_))
        ));
        assert!(matches!(
            ZoneConfig::parse("18446744073709551615G"),
            Err(MemoryError::ZoneSizeOverflow(_))
        ));
    }

    #[test]
    fn test_total_bytes() {
        let cfg = ZoneConfig::parse("1K;1K").unwrap();
        assert_eq!(cfg.total_bytes(), 2048);
        assert_eq!(cfg.num_zones(), 2);
    }

    #[test]
    fn test_serde_roundtrip() {
        let cfg = ZoneConfig::parse("64M;32M").unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ZoneConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
