// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: tensor declaration and the zone model.

mod common;

use accel_cpu::{BackendError, MapFlag, TensorDesc};
use common::{alloc, alloc_f32, device, read_f32};
use tensor_core::ElemKind;

#[test]
fn strides_are_row_major_for_every_kind() {
    let mut dev = device("1M");
    let mut offset = 0;
    for kind in [
        ElemKind::F16,
        ElemKind::F32,
        ElemKind::SFx8,
        ElemKind::SFx16,
        ElemKind::UFx8,
        ElemKind::UFx16,
    ] {
        let t = alloc(&mut dev, kind, &[2, 3, 4], 0, offset);
        let desc = dev.describe(t).unwrap();
        let e = kind.size_bytes();
        assert_eq!(desc.strides(), &[12 * e, 4 * e, e]);
        // Strides never increase towards the inner axes.
        assert!(desc.strides().windows(2).all(|w| w[0] >= w[1]));
        offset += 64;
    }
}

#[test]
fn allocation_rejects_exhausted_zone() {
    let mut dev = device("1K");
    // 16x16 f32 = 1024 bytes: fits exactly at offset 0.
    let a = TensorDesc::new(0, ElemKind::F32, &[16, 16], 0).unwrap();
    dev.allocate(a, 0, 0).unwrap();
    // The same shape one byte further does not fit.
    let b = TensorDesc::new(0, ElemKind::F32, &[16, 16], 0).unwrap();
    assert_eq!(
        dev.allocate(b, 0, 1).unwrap_err(),
        BackendError::OutOfDeviceMemory
    );
}

#[test]
fn zones_are_independent() {
    let mut dev = device("64;1K");
    // Too big for zone 0, fine in zone 1.
    let desc = TensorDesc::new(0, ElemKind::F32, &[10, 10], 0).unwrap();
    assert_eq!(
        dev.allocate(desc.clone(), 0, 0).unwrap_err(),
        BackendError::OutOfDeviceMemory
    );
    assert!(dev.allocate(desc, 1, 0).is_ok());
}

#[test]
fn overlapping_tensors_concatenate() {
    // Two 1-D tensors laid out back to back, and a third spanning both:
    // the overlap gives the concatenated reading.
    let mut dev = device("1K");
    let lo = alloc_f32(&mut dev, &[4], 0, &[1.0, 2.0, 3.0, 4.0]);
    let hi = alloc_f32(&mut dev, &[4], 16, &[5.0, 6.0, 7.0, 8.0]);
    let all = alloc(&mut dev, ElemKind::F32, &[8], 0, 0);

    assert_eq!(
        read_f32(&mut dev, all),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]
    );
    let _ = (lo, hi);
}

#[test]
fn released_handles_become_unknown() {
    let mut dev = device("1K");
    let t = alloc(&mut dev, ElemKind::F32, &[4], 0, 0);
    dev.release(t).unwrap();

    assert_eq!(dev.describe(t).unwrap_err(), BackendError::UnknownTensor);
    assert_eq!(
        dev.copy_to_tensor(&[0.0f32; 4], 0, t).unwrap_err(),
        BackendError::UnknownTensor
    );
    assert_eq!(
        dev.map_tensor(t, MapFlag::Sync).unwrap_err(),
        BackendError::UnknownTensor
    );
}

#[test]
fn live_tensor_count_tracks_declarations() {
    use accel_cpu::Storage;

    let mut dev = device("1K");
    let a = alloc(&mut dev, ElemKind::F32, &[4, 4], 0, 0);
    let v = dev.view(a, &[2, 2], &[0, 0]).unwrap();
    let r = dev.reshape(a, &[16]).unwrap();
    assert_eq!(dev.zone_live_tensors(0).unwrap(), 3);

    assert_eq!(
        dev.tensor_storage(a).unwrap(),
        Storage::Owned { zone_id: 0 }
    );
    assert_eq!(dev.tensor_storage(v).unwrap(), Storage::View { parent: a });
    assert_eq!(
        dev.tensor_storage(r).unwrap(),
        Storage::Reshape { parent: a }
    );

    dev.release(v).unwrap();
    dev.release(r).unwrap();
    dev.release(a).unwrap();
    assert_eq!(dev.zone_live_tensors(0).unwrap(), 0);
}

#[test]
fn four_bit_kinds_declare_but_do_not_copy() {
    let mut dev = device("1K");
    let t = alloc(&mut dev, ElemKind::UFx4, &[8], 3, 0);
    assert_eq!(
        dev.copy_to_tensor(&[0u8; 8], 3, t).unwrap_err(),
        BackendError::UnimplementedType
    );
}

#[test]
fn map_exposes_bytes_and_blocks_kernels() {
    let mut dev = device("1K");
    let t = alloc(&mut dev, ElemKind::F32, &[2, 2], 0, 0);
    let other = alloc_f32(&mut dev, &[2, 2], 64, &[1.0; 4]);
    let out = alloc(&mut dev, ElemKind::F32, &[2, 2], 0, 128);

    {
        let bytes = dev.map_tensor(t, MapFlag::Discard).unwrap();
        for (i, v) in [2.0f32, 4.0, 6.0, 8.0].iter().enumerate() {
            bytes[i * 4..(i + 1) * 4].copy_from_slice(&v.to_le_bytes());
        }
    }

    // A mapped operand is rejected wherever it appears.
    assert_eq!(
        dev.add(t, other, out).unwrap_err(),
        BackendError::ProcessMappedTensor
    );
    assert_eq!(
        dev.add(other, other, t).unwrap_err(),
        BackendError::ProcessMappedTensor
    );

    dev.unmap_tensor(t, MapFlag::Sync).unwrap();
    assert_eq!(read_f32(&mut dev, t), vec![2.0, 4.0, 6.0, 8.0]);
    dev.add(t, other, out).unwrap();
    assert_eq!(read_f32(&mut dev, out), vec![3.0, 5.0, 7.0, 9.0]);
}
