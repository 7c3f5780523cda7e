//! Scoring performance benchmarks.
//!
//! Measures each metric group and the full report over synthetic meter data.

use assay::{Assay, GroupKind, Settings, Table};
use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A seeded table of `rows` readings with a few injected defects.
fn generate_table(rows: usize) -> Table {
    let mut rng = StdRng::seed_from_u64(42);

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows);
    for row in 0..rows {
        let voltage: f64 = 230.0 + rng.gen_range(-3.0..3.0);
        let current: f64 = 1.5 + rng.gen_range(-0.4..0.4);
        let spike = rng.gen_bool(0.01);
        cells.push(vec![
            format!("2024-01-{:02} {:02}:{:02}:00", (row / 1440) % 28 + 1, (row / 60) % 24, row % 60),
            if row % 3 == 0 { "north" } else { "south" }.to_string(),
            if spike { "999.0".to_string() } else { format!("{:.1}", voltage) },
            if rng.gen_bool(0.02) { String::new() } else { format!("{:.2}", current) },
            format!("{:.2}", 50.0 + rng.gen_range(-0.05..0.05)),
            format!("{:.2}", rng.gen_range(0.85..1.0)),
        ]);
    }

    let headers = ["timestamp", "site", "voltage", "current", "frequency", "powerfactor"];
    let rows: Vec<Vec<&str>> = cells
        .iter()
        .map(|r| r.iter().map(String::as_str).collect())
        .collect();
    Table::from_rows(&headers, &rows).unwrap()
}

fn settings() -> Settings {
    Settings::from_yaml_str(
        r#"
expected_schema: [timestamp, site, voltage, current, frequency, powerfactor]
datetime_columns: [timestamp]
identifier_columns: [site]
frequency_columns: [frequency]
powerfactor_columns: [powerfactor]
value_ranges:
  voltage: [220, 240]
domain_rules:
  site: [north, south]
cross_field_rules:
  - [current, voltage]
"#,
    )
    .unwrap()
}

/// Benchmark each metric group on a fixed-size table.
fn bench_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_group");
    let table = generate_table(5_000);
    let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let assay = Assay::new(settings()).with_now(now);

    for kind in GroupKind::ALL {
        group.bench_with_input(BenchmarkId::new("group", kind), &kind, |b, kind| {
            b.iter(|| black_box(assay.score(&table, *kind)))
        });
    }

    group.finish();
}

/// Benchmark the full report across table sizes.
fn bench_report_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_scaling");
    let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let assay = Assay::new(settings()).with_now(now);

    for rows in [100, 1_000, 10_000].iter() {
        let table = generate_table(*rows);

        group.throughput(Throughput::Elements(*rows as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &table, |b, table| {
            b.iter(|| black_box(assay.report(table)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_groups, bench_report_scaling);
criterion_main!(benches);
