//! Integration tests for ordered batch loading

use polyload::{AssetLoader, EngineError, LoadError, LoaderConfig, MockEngine, SceneNode};

async fn wait_until(condition: impl Fn() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}

fn engine_with(urls: &[&str]) -> MockEngine {
    let engine = MockEngine::new();
    for url in urls {
        engine.insert_node(*url, SceneNode::new(None));
    }
    engine
}

#[tokio::test]
async fn test_results_follow_request_order() {
    let engine = engine_with(&["m/u1.fbx", "m/u2.fbx", "m/u3.fbx"]);
    let gate1 = engine.hold("m/u1.fbx");
    let gate3 = engine.hold("m/u3.fbx");
    let loader = AssetLoader::new(engine.clone(), LoaderConfig::default());

    let batch = tokio::spawn(loader.load_many(["m/u1.fbx", "m/u2.fbx", "m/u3.fbx"]));

    // u2 finishes first, then u3, then u1
    wait_until(|| engine.finished().len() == 1).await;
    gate3.release();
    wait_until(|| engine.finished().len() == 2).await;
    gate1.release();

    let batch = batch.await.unwrap();
    assert_eq!(engine.finished(), vec!["m/u2.fbx", "m/u3.fbx", "m/u1.fbx"]);

    let names: Vec<_> = batch
        .into_assets()
        .unwrap()
        .iter()
        .map(|asset| asset.name().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["u1", "u2", "u3"]);
}

#[tokio::test]
async fn test_unknown_extension_fills_its_slot() {
    let engine = engine_with(&["m/a.gltf", "m/c.obj"]);
    let loader = AssetLoader::new(engine.clone(), LoaderConfig::default());

    let batch = loader.load_many(["m/a.gltf", "m/model.xyz", "m/c.obj"]).await;

    assert_eq!(batch.len(), 3);
    assert!(batch.results()[0].is_ok());
    assert!(batch.results()[2].is_ok());
    assert_eq!(
        batch.results()[1],
        Err(LoadError::UnsupportedFormat {
            name: "model.xyz".into(),
            extension: "xyz".into(),
        })
    );
    assert_eq!(engine.call_count("m/model.xyz"), 0);
}

#[tokio::test]
async fn test_abort_view_reports_first_error() {
    let engine = engine_with(&["m/ok.fbx"]);
    engine.insert_failure("m/broken.fbx", EngineError::Parse("truncated".into()));
    engine.insert_failure("m/gone.fbx", EngineError::Fetch("404".into()));
    let loader = AssetLoader::new(engine, LoaderConfig::default());

    let batch = loader
        .load_many(["m/ok.fbx", "m/broken.fbx", "m/gone.fbx"])
        .await;
    assert_eq!(batch.failures().count(), 2);

    match batch.into_assets() {
        Err(LoadError::Engine { url, source }) => {
            assert_eq!(url, "m/broken.fbx");
            assert_eq!(source, EngineError::Parse("truncated".into()));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_shared_mtl_applies_to_every_obj() {
    let engine = engine_with(&["m/a.obj", "m/b.obj", "m/c.png"]);
    engine.insert_materials("m/common.mtl", Default::default());
    let loader = AssetLoader::new(engine.clone(), LoaderConfig::default());

    let batch = loader
        .load_many_sharing_mtl(["m/a.obj", "m/b.obj"], "m/common.mtl")
        .await;

    assert!(batch.is_success());
    assert_eq!(engine.call_count("m/common.mtl"), 2);
    assert_eq!(engine.call_count("m/a.mtl"), 0);
}
