//! Benchmark: Cache hit performance

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polyload::{AssetCache, Geometry, LoadedAsset, Material, Mesh, SceneNode};

fn model(parts: usize) -> LoadedAsset {
    let geometry = std::sync::Arc::new(Geometry::plane(1.0, 1.0));
    let mut root = SceneNode::new(Some("model".into()));
    for i in 0..parts {
        let mesh = Mesh::with_shared_geometry(
            Some(format!("part{i}")),
            geometry.clone(),
            Material::default(),
        );
        root = root.with_child(SceneNode::new(None).with_mesh(mesh));
    }
    root.into()
}

fn cache_hit_perf_benchmark(c: &mut Criterion) {
    let cache = AssetCache::new();
    cache.put("models/small.obj", model(1));
    cache.put("models/large.gltf", model(256));

    c.bench_function("cache_hit_small", |b| {
        b.iter(|| black_box(cache.get(black_box("models/small.obj"))))
    });

    c.bench_function("cache_hit_256_nodes", |b| {
        b.iter(|| black_box(cache.get(black_box("models/large.gltf"))))
    });

    c.bench_function("cache_miss", |b| {
        b.iter(|| black_box(cache.get(black_box("models/absent.fbx"))))
    });
}

criterion_group!(benches, cache_hit_perf_benchmark);
criterion_main!(benches);
