//! Engine abstraction for format-native loaders
//!
//! The loader never parses a file itself. Each format is handed to an
//! [`Engine`], which owns transport and parsing, through one method per
//! format. Engines implement the formats they support; every method
//! defaults to [`EngineError::Unsupported`].

pub mod mock;
#[cfg(feature = "native-formats")]
pub mod native;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Debug;
use thiserror::Error;

use crate::format::AssetFormat;
use crate::model::{Geometry, Material, SceneNode};
use crate::texture::Texture;

/// Error type for engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Parse failed: {0}")]
    Parse(String),

    #[error("{0} is not supported by this engine")]
    Unsupported(AssetFormat),

    #[error("Engine error: {0}")]
    Other(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Cross-origin policy forwarded to the engine's fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossOrigin {
    /// Fetch without credentials
    #[default]
    Anonymous,
    /// Fetch with cookies and auth headers
    UseCredentials,
}

/// One file for the engine to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// Directory the file and its companions are fetched from
    pub path: String,
    /// File name inside `path`
    pub file: String,
    /// Cross-origin policy
    pub cross_origin: CrossOrigin,
}

impl EngineRequest {
    /// Create a request for `file` inside `path`
    pub fn new(path: impl Into<String>, file: impl Into<String>, cross_origin: CrossOrigin) -> Self {
        Self {
            path: path.into(),
            file: file.into(),
            cross_origin,
        }
    }

    /// Full url of the file
    pub fn url(&self) -> String {
        format!("{}{}", self.path, self.file)
    }
}

/// Materials parsed from an MTL file, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    by_name: HashMap<String, usize>,
}

impl MaterialLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a material; a later material with the same name wins lookups
    pub fn insert(&mut self, material: Material) {
        if let Some(name) = &material.name {
            self.by_name.insert(name.clone(), self.materials.len());
        }
        self.materials.push(material);
    }

    /// Look up a material by name
    pub fn get(&self, name: &str) -> Option<&Material> {
        self.by_name.get(name).map(|&i| &self.materials[i])
    }

    /// Materials in file order
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Number of materials
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Whether the library holds no materials
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl FromIterator<Material> for MaterialLibrary {
    fn from_iter<I: IntoIterator<Item = Material>>(iter: I) -> Self {
        let mut library = Self::new();
        for material in iter {
            library.insert(material);
        }
        library
    }
}

/// A parsed Collada document
#[derive(Debug, Clone)]
pub struct ColladaDocument {
    /// Root of the visual scene
    pub scene: SceneNode,
}

/// A parsed glTF document
#[derive(Debug, Clone)]
pub struct GltfDocument {
    /// Default scene, or the first scene when none is marked default
    pub scene: SceneNode,
    /// Every scene in the file
    pub scenes: Vec<SceneNode>,
}

/// Format-native loaders of an external engine
///
/// Uses async-trait for dyn compatibility.
///
/// # Example
/// ```ignore
/// let engine = MockEngine::new();
/// engine.insert_node("models/chair.gltf", SceneNode::new(Some("chair".into())));
/// let loader = AssetLoader::new(engine, LoaderConfig::default());
/// ```
#[async_trait]
pub trait Engine: Send + Sync + Debug {
    /// Load an MTL material library
    async fn load_material_library(&self, request: &EngineRequest) -> EngineResult<MaterialLibrary> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::Obj))
    }

    /// Load an OBJ file, resolving `usemtl` names against `materials`
    async fn load_obj(
        &self,
        request: &EngineRequest,
        materials: &MaterialLibrary,
    ) -> EngineResult<SceneNode> {
        let _ = (request, materials);
        Err(EngineError::Unsupported(AssetFormat::Obj))
    }

    /// Load an engine-native JSON scene
    async fn load_scene_json(&self, request: &EngineRequest) -> EngineResult<SceneNode> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::SceneJson))
    }

    /// Load a Collada document
    async fn load_collada(&self, request: &EngineRequest) -> EngineResult<ColladaDocument> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::Collada))
    }

    /// Load a glTF or GLB document
    async fn load_gltf(&self, request: &EngineRequest) -> EngineResult<GltfDocument> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::Gltf))
    }

    /// Load an FBX model
    async fn load_fbx(&self, request: &EngineRequest) -> EngineResult<SceneNode> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::Fbx))
    }

    /// Decode Draco-compressed geometry
    async fn load_draco(&self, request: &EngineRequest) -> EngineResult<Geometry> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::Draco))
    }

    /// Load a bill-of-materials assembly
    async fn load_bom(&self, request: &EngineRequest) -> EngineResult<SceneNode> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::Bom))
    }

    /// Load a PNG or JPEG image
    async fn load_texture(&self, request: &EngineRequest) -> EngineResult<Texture> {
        let _ = request;
        Err(EngineError::Unsupported(AssetFormat::Image))
    }

    /// Get the name of this engine (for debugging)
    fn engine_name(&self) -> &'static str;
}

// Re-export implementations
pub use mock::MockEngine;
#[cfg(feature = "native-formats")]
pub use native::FsEngine;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NothingEngine;

    #[async_trait]
    impl Engine for NothingEngine {
        fn engine_name(&self) -> &'static str {
            "Nothing"
        }
    }

    #[test]
    fn test_request_url() {
        let request = EngineRequest::new("models/", "chair.mtl", CrossOrigin::Anonymous);
        assert_eq!(request.url(), "models/chair.mtl");
    }

    #[test]
    fn test_default_methods_are_unsupported() {
        let engine = NothingEngine;
        let request = EngineRequest::new("a/", "b.fbx", CrossOrigin::default());
        let result = futures::executor::block_on(engine.load_fbx(&request));
        assert_eq!(result.unwrap_err(), EngineError::Unsupported(AssetFormat::Fbx));
    }

    #[test]
    fn test_material_library_lookup() {
        let library: MaterialLibrary = [
            Material {
                name: Some("wood".into()),
                ..Default::default()
            },
            Material::default(),
            Material {
                name: Some("steel".into()),
                double_sided: true,
                ..Default::default()
            },
        ]
        .into_iter()
        .collect();

        assert_eq!(library.len(), 3);
        assert!(library.get("steel").unwrap().double_sided);
        assert!(library.get("glass").is_none());
    }
}
