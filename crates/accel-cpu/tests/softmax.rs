// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: softmax.

mod common;

use accel_cpu::BackendError;
use common::{alloc, alloc_f32, assert_close, device, epsilon, read_f32};
use tensor_core::ElemKind;

/// Reference three-way softmax.
fn softmax3(x: [f32; 3]) -> [f32; 3] {
    let m = x[0].max(x[1]).max(x[2]);
    let e = [(x[0] - m).exp(), (x[1] - m).exp(), (x[2] - m).exp()];
    let s = e[0] + e[1] + e[2];
    [e[0] / s, e[1] / s, e[2] / s]
}

#[test]
fn softmax_rank1() {
    let mut dev = device("1M");
    let input = alloc_f32(&mut dev, &[3], 0, &[1.0, 2.0, 3.0]);
    let out = alloc(&mut dev, ElemKind::F32, &[3], 0, 64);

    dev.softmax(input, out).unwrap();
    let expected = softmax3([1.0, 2.0, 3.0]);
    assert_close(&read_f32(&mut dev, out), &expected, epsilon(1e-6));
}

#[test]
fn softmax_rank2_is_per_batch_row() {
    let mut dev = device("1M");
    let input = alloc_f32(
        &mut dev,
        &[2, 3],
        0,
        &[1.0, 2.0, 3.0, -1.0, 0.0, 1.0],
    );
    let out = alloc(&mut dev, ElemKind::F32, &[2, 3], 0, 64);

    dev.softmax(input, out).unwrap();
    let r = read_f32(&mut dev, out);
    assert_close(&r[0..3], &softmax3([1.0, 2.0, 3.0]), epsilon(1e-6));
    assert_close(&r[3..6], &softmax3([-1.0, 0.0, 1.0]), epsilon(1e-6));
}

#[test]
fn softmax_rank4_channel_axis() {
    let mut dev = device("1M");

    // (1, 3, 5, 5): channel 0 mixes rising, flat, and falling rows;
    // channel 1 is constant negative; channel 2 alternates sign.
    let mut data = vec![0.0f32; 3 * 25];
    for row in 0..5 {
        for col in 0..5 {
            let i = row * 5 + col;
            data[i] = match row {
                0 | 3 | 4 => (col + 1) as f32,
                1 => 0.0,
                _ => -((col + 1) as f32),
            };
            data[25 + i] = -((col + 1) as f32);
            data[50 + i] = if (row + col) % 2 == 0 { 1.0 } else { -2.0 };
        }
    }

    let input = alloc_f32(&mut dev, &[1, 3, 5, 5], 0, &data);
    let out = alloc(&mut dev, ElemKind::F32, &[1, 3, 5, 5], 0, 512);
    dev.softmax(input, out).unwrap();
    let r = read_f32(&mut dev, out);

    for i in 0..25 {
        let expected = softmax3([data[i], data[25 + i], data[50 + i]]);
        let actual = [r[i], r[25 + i], r[50 + i]];
        assert_close(&actual, &expected, epsilon(1e-4));
        let sum: f32 = actual.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5, "position {i} sums to {sum}");
    }
}

#[test]
fn softmax_rank3_channel_axis_is_leading() {
    let mut dev = device("1M");
    // (2, 2, 2): two channels over a 2x2 slice grid.
    let data = [1.0f32, 2.0, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0];
    let input = alloc_f32(&mut dev, &[2, 2, 2], 0, &data);
    let out = alloc(&mut dev, ElemKind::F32, &[2, 2, 2], 0, 64);

    dev.softmax(input, out).unwrap();
    let r = read_f32(&mut dev, out);

    for pos in 0..4 {
        let x0 = data[pos];
        let x1 = data[4 + pos];
        let m = x0.max(x1);
        let e0 = (x0 - m).exp();
        let e1 = (x1 - m).exp();
        let expected = [e0 / (e0 + e1), e1 / (e0 + e1)];
        assert_close(&[r[pos], r[4 + pos]], &expected, epsilon(1e-6));
    }
}

#[test]
fn softmax_is_numerically_stable() {
    let mut dev = device("1M");
    let input = alloc_f32(&mut dev, &[3], 0, &[1000.0, 1001.0, 1002.0]);
    let out = alloc(&mut dev, ElemKind::F32, &[3], 0, 64);

    dev.softmax(input, out).unwrap();
    let r = read_f32(&mut dev, out);
    assert!(r.iter().all(|v| v.is_finite()));
    let sum: f32 = r.iter().sum();
    assert!((sum - 1.0).abs() < 1e-5);
    assert_close(&r, &softmax3([0.0, 1.0, 2.0]), epsilon(1e-5));
}

#[test]
fn softmax_fixed_point_uses_output_shift() {
    let mut dev = device("1M");
    // UFx8 at 4 fractional bits in, 7 out: probabilities land in
    // [0, 1] and need the full fractional range.
    let input = alloc(&mut dev, ElemKind::UFx8, &[3], 4, 0);
    dev.copy_to_tensor(&[0.5f32, 1.0, 2.0], 0, input).unwrap();
    let out = alloc(&mut dev, ElemKind::UFx8, &[3], 7, 64);

    dev.softmax(input, out).unwrap();

    let mut back = [0.0f32; 3];
    dev.copy_from_tensor(&mut back, 0, out).unwrap();
    // Stores truncate toward zero, so each element may lose up to one
    // quantisation step of 1/128.
    let sum: f32 = back.iter().sum();
    assert!((sum - 1.0).abs() <= 3.0 / 128.0, "quantised sum {sum}");
    assert_close(&back, &softmax3([0.5, 1.0, 2.0]), 1e-2);
    // Monotonicity survives quantisation.
    assert!(back[0] < back[1] && back[1] < back[2]);
}

#[test]
fn softmax_shape_and_kind_checks() {
    let mut dev = device("1M");
    let input = alloc_f32(&mut dev, &[2, 3], 0, &[0.0; 6]);

    let wrong_shape = alloc(&mut dev, ElemKind::F32, &[3, 2], 0, 64);
    assert_eq!(
        dev.softmax(input, wrong_shape).unwrap_err(),
        BackendError::InconsistentTensorSizes
    );

    let wrong_rank = alloc(&mut dev, ElemKind::F32, &[6], 0, 128);
    assert_eq!(
        dev.softmax(input, wrong_rank).unwrap_err(),
        BackendError::InconsistentNumberOfDimensions
    );

    let wrong_kind = alloc(&mut dev, ElemKind::UFx8, &[2, 3], 0, 192);
    assert_eq!(
        dev.softmax(input, wrong_kind).unwrap_err(),
        BackendError::UnimplementedType
    );
}
