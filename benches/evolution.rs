//! Benchmarks for tile ingestion and evolution on synthetic activities.
//!
//! Run with: `cargo bench --bench evolution --features synthetic`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use explorer_tiles::evolution::{ClusterEvolution, SquareEvolution};
use explorer_tiles::synthetic::{SyntheticScenario, TrackPattern};
use explorer_tiles::{ExplorerConfig, ExplorerEngine, NoopProgress, TileVisitStore, MAX_ZOOM};

fn scenario(activity_count: u32) -> SyntheticScenario {
    SyntheticScenario {
        origin: (47.37, 8.55),
        activity_count,
        pattern: TrackPattern::Sweep {
            rows: 6,
            row_spacing_m: 60.0,
        },
        track_length_m: 6_000.0,
        segment_break_probability: 0.001,
        seed: 7,
    }
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.sample_size(10);

    for count in [10u32, 50] {
        let repo = scenario(count).generate();
        group.bench_with_input(BenchmarkId::new("update", count), &repo, |b, repo| {
            b.iter(|| {
                let dir = tempfile::tempdir().unwrap();
                let mut engine =
                    ExplorerEngine::open(ExplorerConfig::with_cache_dir(dir.path())).unwrap();
                engine.update(repo, &NoopProgress).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_trackers(c: &mut Criterion) {
    let repo = scenario(50).generate();
    let dir = tempfile::tempdir().unwrap();
    let mut engine = ExplorerEngine::open(ExplorerConfig::with_cache_dir(dir.path())).unwrap();
    engine.ingest(&repo, &NoopProgress).unwrap();
    let visits: &TileVisitStore = engine.visits();

    let mut group = c.benchmark_group("evolution");
    for zoom in [14u8, 17, MAX_ZOOM] {
        let history = visits.discovery_history(zoom);
        group.bench_with_input(BenchmarkId::new("clusters", zoom), history, |b, h| {
            b.iter(|| ClusterEvolution::new().advance(h));
        });
        group.bench_with_input(BenchmarkId::new("squares", zoom), history, |b, h| {
            b.iter(|| SquareEvolution::new().advance(h));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ingest, bench_trackers);
criterion_main!(benches);
