//! Benchmarking block parsing & matrix reconstruction
//! using tiny files
extern crate criterion;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use chainparser::{
    matrix::reconstruct,
    prelude::{Diagnostics, MatrixEntry, Triangle},
    rinex::{meteo_parser, observation_parser},
    sinex,
};

fn benchmark(c: &mut Criterion) {
    let mut parsing_grp = c.benchmark_group("parsing");

    // RINEX OBS header (V3)
    let obs = observation_parser();
    parsing_grp.bench_function("OBS/V3", |b| {
        b.iter(|| {
            obs.parse_file("test_resources/OBS/V3/ACOR00ESP_R_20210070000_01D_30S_MO.rnx")
                .unwrap();
        })
    });

    // RINEX MET (V2)
    let meteo = meteo_parser();
    parsing_grp.bench_function("MET/V2", |b| {
        b.iter(|| {
            meteo.parse_file("test_resources/MET/V2/abvi0010.15m").unwrap();
        })
    });

    // SINEX
    let snx = sinex::parser();
    parsing_grp.bench_function("SINEX", |b| {
        b.iter(|| {
            snx.parse_file("test_resources/SINEX/igs21826.snx").unwrap();
        })
    });

    parsing_grp.finish();

    let mut matrix_grp = c.benchmark_group("matrix");

    // packed lower triangle, 300x300
    let size = 300;
    let mut entries = Vec::new();
    for row in 1..=size {
        for col in (1..=row).step_by(3) {
            let values: Vec<f64> = (col..=row.min(col + 2)).map(|j| (row * j) as f64).collect();
            entries.push(MatrixEntry::new(row, col, &values));
        }
    }
    matrix_grp.bench_function("reconstruct/300", |b| {
        b.iter(|| {
            let mut diags = Diagnostics::default();
            reconstruct(
                black_box(&entries),
                &Triangle::Lower,
                Some(size),
                1000,
                &mut diags,
            )
            .unwrap();
        })
    });

    matrix_grp.finish();
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
