//! Sample-rate conversion benchmarks
//!
//! Measures the windowed-sinc resampler across the upsample/downsample
//! ratios the collector actually drives it at.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use capture_dsp::resample_channel;

fn benchmark_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample_channel");

    let cases: &[(f64, f64, &str)] = &[
        (44100.0, 48000.0, "44100_to_48000"),
        (48000.0, 44100.0, "48000_to_44100"),
        (48000.0, 96000.0, "48000_to_96000"),
    ];

    for (input_rate, output_rate, label) in cases {
        let input: Vec<f32> = (0..*input_rate as usize)
            .map(|i| (i as f32 * 0.01).sin())
            .collect();

        group.throughput(Throughput::Elements(input.len() as u64));
        group.bench_function(*label, |b| {
            b.iter(|| resample_channel(black_box(&input), *input_rate, *output_rate));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_resample);
criterion_main!(benches);
