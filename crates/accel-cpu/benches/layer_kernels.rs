// Copyright (c) 2025 the accel-rt authors
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for the layer kernels.

use accel_cpu::{
    BackendConfig, Conv2dParams, CpuDevice, DenseParams, TensorDesc, TensorId,
    UpsampleParams,
};
use criterion::{criterion_group, criterion_main, Criterion};
use memory_manager::ZoneConfig;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tensor_core::ElemKind;

fn device() -> CpuDevice {
    CpuDevice::new(BackendConfig {
        zones: ZoneConfig::parse("64M").unwrap(),
        panic_on_error: false,
    })
}

fn staged(
    dev: &mut CpuDevice,
    rng: &mut StdRng,
    dims: &[usize],
    offset: usize,
) -> TensorId {
    let desc = TensorDesc::new(0, ElemKind::F32, dims, 0).unwrap();
    let t = dev.allocate(desc, 0, offset).unwrap();
    let data: Vec<f32> = (0..dev.describe(t).unwrap().num_elements())
        .map(|_| rng.gen_range(-1.0..1.0))
        .collect();
    dev.copy_to_tensor(&data, 0, t).unwrap();
    t
}

fn bench_add(c: &mut Criterion) {
    let mut dev = device();
    let mut rng = StdRng::seed_from_u64(7);
    let a = staged(&mut dev, &mut rng, &[1, 16, 64, 64], 0);
    let b = staged(&mut dev, &mut rng, &[1, 16, 64, 64], 1 << 20);
    let out = staged(&mut dev, &mut rng, &[1, 16, 64, 64], 2 << 20);

    c.bench_function("add_f32_16x64x64", |bencher| {
        bencher.iter(|| dev.add(a, b, out).unwrap())
    });
}

fn bench_conv2d(c: &mut Criterion) {
    let mut dev = device();
    let mut rng = StdRng::seed_from_u64(7);
    let input = staged(&mut dev, &mut rng, &[1, 8, 64, 64], 0);
    let kernel = staged(&mut dev, &mut rng, &[8, 8, 3, 3], 1 << 20);
    let bias = staged(&mut dev, &mut rng, &[8], 2 << 20);
    let out = staged(&mut dev, &mut rng, &[1, 8, 64, 64], 3 << 20);

    let params = Conv2dParams {
        bias: Some(bias),
        padding: [[1, 1], [1, 1]],
        ..Conv2dParams::new(kernel)
    };
    c.bench_function("conv2d_f32_8x64x64", |bencher| {
        bencher.iter(|| dev.conv2d(&params, input, out).unwrap())
    });
}

fn bench_dense(c: &mut Criterion) {
    let mut dev = device();
    let mut rng = StdRng::seed_from_u64(7);
    let input = staged(&mut dev, &mut rng, &[8, 1024], 0);
    let kernel = staged(&mut dev, &mut rng, &[256, 1024], 1 << 20);
    let out = staged(&mut dev, &mut rng, &[8, 256], 3 << 20);

    let params = DenseParams::new(kernel);
    c.bench_function("dense_f32_1024_to_256", |bencher| {
        bencher.iter(|| dev.dense(&params, input, out).unwrap())
    });
}

fn bench_softmax(c: &mut Criterion) {
    let mut dev = device();
    let mut rng = StdRng::seed_from_u64(7);
    let input = staged(&mut dev, &mut rng, &[1, 32, 32, 32], 0);
    let out = staged(&mut dev, &mut rng, &[1, 32, 32, 32], 1 << 20);

    c.bench_function("softmax_f32_32ch_32x32", |bencher| {
        bencher.iter(|| dev.softmax(input, out).unwrap())
    });
}

fn bench_upsample(c: &mut Criterion) {
    let mut dev = device();
    let mut rng = StdRng::seed_from_u64(7);
    let input = staged(&mut dev, &mut rng, &[1, 8, 64, 64], 0);
    let out = staged(&mut dev, &mut rng, &[1, 8, 128, 128], 1 << 20);

    let params = UpsampleParams::default();
    c.bench_function("upsample_f32_8x64x64", |bencher| {
        bencher.iter(|| dev.upsample(&params, input, out).unwrap())
    });
}

criterion_group!(
    benches,
    bench_add,
    bench_conv2d,
    bench_dense,
    bench_softmax,
    bench_upsample
);
criterion_main!(benches);
