//! polyload - format-agnostic 3D asset loading
//!
//! Request a model or image by url and get back a scene-graph value,
//! whatever the file format. Parsing is left to an [`Engine`]; this crate
//! does the orchestration around it.
//!
//! # Features
//! - Extension-based dispatch to OBJ/MTL, JSON scene, Collada, glTF/GLB,
//!   FBX, Draco, BOM and PNG/JPEG adapters
//! - Optional FIFO queue with at most one load in flight
//! - Optional clone cache: one real load per url, independent instances
//!   for every later request
//! - Ordered fan-in for batch loads
//! - Named scene manifests with per-asset MTL and transform overrides
//!
//! # Quick Start
//!
//! ```ignore
//! use polyload::{AssetLoader, FsEngine, LoaderConfig};
//!
//! let loader = AssetLoader::new(FsEngine::new("assets"), LoaderConfig::default().with_cache(true));
//! let batch = loader.load_many(["models/chair.obj", "models/table.glb"]).await;
//! let assets = batch.into_assets()?;
//! ```
//!
//! # Feature Flags
//!
//! - `runtime-tokio`: Enable the Tokio spawner
//! - `native-formats`: Enable [`FsEngine`], backed by tobj, gltf and image

// Core modules
pub mod cache;
pub mod engine;
pub mod format;
pub mod join;
pub mod loader;
pub mod locator;
pub mod queue;
pub mod runtime;
pub mod scene;

// Support modules
pub mod config;
pub mod model;
pub mod texture;

// Error types
mod error;
pub use error::{LoadError, Result};

// Re-export the loader facade
pub use config::LoaderConfig;
pub use loader::adapters::MtlSource;
pub use loader::AssetLoader;

// Re-export cache types
pub use cache::metrics::{AssetMetrics, AssetMetricsHandle};
pub use cache::{AssetCache, CacheFill, CacheLookup, PendingLoad};

// Re-export engine types
pub use engine::mock::{Gate, MockEngine};
#[cfg(feature = "native-formats")]
pub use engine::native::FsEngine;
pub use engine::{
    ColladaDocument, CrossOrigin, Engine, EngineError, EngineRequest, EngineResult, GltfDocument,
    MaterialLibrary,
};

// Re-export dispatch types
pub use format::AssetFormat;
pub use locator::{parse_url, Locator, ResolveError, ResolvedFile};

// Re-export orchestration types
pub use join::{BatchResult, FanIn};
pub use queue::{QueueSlot, QueueState, RequestQueue, Ticket};

// Re-export runtime types
pub use runtime::mock::{MockSpawnBehavior, MockSpawner};
#[cfg(feature = "runtime-tokio")]
pub use runtime::tokio_impl::TokioSpawner;
pub use runtime::{AsyncSpawner, BoxFuture, JoinHandle};

// Re-export model types
pub use model::{AlphaMode, Geometry, LoadedAsset, Material, Mesh, SceneNode, Transform};

// Re-export texture types
#[cfg(feature = "native-formats")]
pub use texture::TextureDecoder;
pub use texture::{Texture, TextureError, TextureFormat};

// Re-export scene types
pub use scene::{
    AssetEntry, Scene, SceneContainer, SceneLoadReport, SceneRequest, TransformOverride,
    TransformParseError, TransformValue,
};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_mock_engine_available() {
        let loader = AssetLoader::new(MockEngine::new(), LoaderConfig::default());
        assert_eq!(loader.engine().engine_name(), "Mock");
    }
}
