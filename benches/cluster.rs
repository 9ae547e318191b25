use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stationmap::{Bbox, ClusterConfig, ClusterIndex, ClusterNode, Station};
use std::sync::Arc;

/// Deterministic synthetic roster spread over the whole globe.
fn synthetic_stations(count: usize) -> Arc<Vec<Station>> {
    let mut seed: u64 = 42;
    let mut next = move || {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (seed >> 11) as f64 / (1u64 << 53) as f64
    };
    let stations = (0..count)
        .map(|i| Station {
            id: format!("BENCH{i}"),
            name: None,
            city: None,
            state: None,
            latitude: next() * 170.0 - 85.0,
            longitude: next() * 360.0 - 180.0,
            elevation: None,
        })
        .collect();
    Arc::new(stations)
}

fn bench_cluster(c: &mut Criterion) {
    let roster = synthetic_stations(10_000);
    c.bench_function("index_build_10k", |b| {
        b.iter(|| ClusterIndex::new(black_box(Arc::clone(&roster)), ClusterConfig::default()))
    });

    let index = ClusterIndex::new(synthetic_stations(50_000), ClusterConfig::default());
    let viewport = Bbox::new(-125.0, 24.0, -66.0, 49.0);
    c.bench_function("viewport_query_z4_50k", |b| {
        b.iter(|| index.clusters(black_box(viewport), 4))
    });

    let cluster_id = index
        .clusters(Bbox::new(-180.0, -90.0, 180.0, 90.0), 2)
        .into_iter()
        .find_map(|node| match node {
            ClusterNode::Cluster(info) => Some(info.id),
            ClusterNode::Single(_) => None,
        })
        .unwrap();
    c.bench_function("expansion_zoom_50k", |b| {
        b.iter(|| index.expansion_zoom(black_box(cluster_id)))
    });
}

criterion_group!(benches, bench_cluster);
criterion_main!(benches);
