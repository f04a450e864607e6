// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shared helpers for the backend integration tests.

#![allow(dead_code)]

use accel_cpu::{BackendConfig, CpuDevice, TensorDesc, TensorId};
use memory_manager::ZoneConfig;
use tensor_core::ElemKind;

/// Builds a device with a single zone of the given spec.
pub fn device(spec: &str) -> CpuDevice {
    CpuDevice::new(BackendConfig {
        zones: ZoneConfig::parse(spec).unwrap(),
        panic_on_error: false,
    })
}

/// Float comparison tolerance, overridable through the environment.
pub fn epsilon(default: f32) -> f32 {
    std::env::var("ACCEL_TEST_EPSILON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Asserts element-wise closeness of two float slices.
pub fn assert_close(actual: &[f32], expected: &[f32], tol: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).abs() <= tol,
            "element {i}: {a} differs from {e} by more than {tol}"
        );
    }
}

/// Allocates a tensor in zone 0 at the next free-for-the-test offset.
pub fn alloc(
    dev: &mut CpuDevice,
    kind: ElemKind,
    dims: &[usize],
    fp_shift: u8,
    offset: usize,
) -> TensorId {
    let desc = TensorDesc::new(0, kind, dims, fp_shift).unwrap();
    dev.allocate(desc, 0, offset).unwrap()
}

/// Allocates an f32 tensor and stages `data` into it.
pub fn alloc_f32(
    dev: &mut CpuDevice,
    dims: &[usize],
    offset: usize,
    data: &[f32],
) -> TensorId {
    let t = alloc(dev, ElemKind::F32, dims, 0, offset);
    dev.copy_to_tensor(data, 0, t).unwrap();
    t
}

/// Reads an f32 tensor back into a vector.
pub fn read_f32(dev: &mut CpuDevice, tensor: TensorId) -> Vec<f32> {
    let n = dev.describe(tensor).unwrap().num_elements();
    let mut out = vec![0.0f32; n];
    dev.copy_from_tensor(&mut out, 0, tensor).unwrap();
    out
}
