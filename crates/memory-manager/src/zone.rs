// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Monotone byte arenas backing tensor storage.
//!
//! A [`MemoryZone`] is a fixed-size byte buffer created once and never
//! resized. The zone does not track free regions: clients choose their
//! own offsets, and two tensors may deliberately overlap (overlapping
//! allocations are the mechanism for implicit concatenation). The zone
//! only counts how many tensors currently reference it, for diagnostics.

use crate::ZoneConfig;

/// A single preallocated byte arena.
pub struct MemoryZone {
    data: Vec<u8>,
    live_tensors: u64,
}

impl MemoryZone {
    /// Creates a zero-filled zone of the given size.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
            live_tensors: 0,
        }
    }

    /// Returns the zone size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns the zone contents.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the zone contents mutably.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Number of tensors currently referencing this zone.
    pub fn live_tensors(&self) -> u64 {
        self.live_tensors
    }

    /// Records that a tensor now references this zone.
    pub fn tensor_created(&mut self) {
        self.live_tensors += 1;
    }

    /// Records that a tensor referencing this zone was released.
    ///
    /// The zone's bytes are untouched: arenas are monotone, so released
    /// storage is never reused by the zone itself.
    pub fn tensor_released(&mut self) {
        self.live_tensors = self.live_tensors.saturating_sub(1);
    }
}

impl std::fmt::Debug for MemoryZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryZone")
            .field("size", &self.size())
            .field("live_tensors", &self.live_tensors)
            .finish()
    }
}

/// The ordered, process-lifetime collection of memory zones.
///
/// Built once from a [`ZoneConfig`] and never resized afterwards. Zone
/// ids are indices into this collection.
#[derive(Debug)]
pub struct ZoneCollection {
    zones: Vec<MemoryZone>,
}

impl ZoneCollection {
    /// Creates all zones declared by the configuration.
    pub fn new(config: &ZoneConfig) -> Self {
        let zones: Vec<MemoryZone> =
            config.sizes().iter().map(|&s| MemoryZone::new(s)).collect();
        tracing::info!(
            num_zones = zones.len(),
            total_bytes = config.total_bytes(),
            "memory zones created"
        );
        for (id, zone) in zones.iter().enumerate() {
            tracing::debug!(zone_id = id, size_bytes = zone.size(), "zone");
        }
        Self { zones }
    }

    /// Returns the number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Returns `true` if no zones were configured.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Returns a zone by id.
    pub fn get(&self, zone_id: usize) -> Option<&MemoryZone> {
        self.zones.get(zone_id)
    }

    /// Returns a zone by id, mutably.
    pub fn get_mut(&mut self, zone_id: usize) -> Option<&mut MemoryZone> {
        self.zones.get_mut(zone_id)
    }

    /// Returns all zones, mutably.
    pub fn zones_mut(&mut self) -> &mut [MemoryZone] {
        &mut self.zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_is_zero_filled() {
        let zone = MemoryZone::new(64);
        assert_eq!(zone.size(), 64);
        assert!(zone.bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_zone_bytes_are_writable() {
        let mut zone = MemoryZone::new(16);
        zone.bytes_mut()[3] = 0xAB;
        assert_eq!(zone.bytes()[3], 0xAB);
    }

    #[test]
    fn test_tensor_counting() {
        let mut zone = MemoryZone::new(16);
        assert_eq!(zone.live_tensors(), 0);
        zone.tensor_created();
        zone.tensor_created();
        assert_eq!(zone.live_tensors(), 2);
        zone.tensor_released();
        assert_eq!(zone.live_tensors(), 1);
    }

    #[test]
    fn test_release_never_underflows() {
        let mut zone = MemoryZone::new(16);
        zone.tensor_released();
        assert_eq!(zone.live_tensors(), 0);
    }

    #[test]
    fn test_collection_from_config() {
        let cfg = ZoneConfig::parse("1K;2K").unwrap();
        let zones = ZoneCollection::new(&cfg);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones.get(0).unwrap().size(), 1024);
        assert_eq!(zones.get(1).unwrap().size(), 2048);
        assert!(zones.get(2).is_none());
    }
}
