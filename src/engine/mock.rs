//! Mock engine for testing
//!
//! Serves scripted responses keyed by url, records every call, and can hold
//! a response back until the test releases it.

use super::{
    ColladaDocument, Engine, EngineError, EngineRequest, EngineResult, GltfDocument,
    MaterialLibrary,
};
use async_trait::async_trait;
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{Geometry, SceneNode};
use crate::texture::Texture;

/// A scripted response
#[derive(Debug, Clone)]
enum MockAsset {
    Node(SceneNode),
    Texture(Texture),
    Materials(MaterialLibrary),
    Geometry(Geometry),
}

#[derive(Debug, Default)]
struct MockState {
    responses: Mutex<HashMap<String, EngineResult<MockAsset>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

/// Holds one response back until released or dropped
#[derive(Debug)]
pub struct Gate {
    release: oneshot::Sender<()>,
}

impl Gate {
    /// Let the held response through
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

/// Mock engine for testing
///
/// Clones share responses and logs, so a test can keep a handle after
/// giving the engine to a loader.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<MockState>,
}

impl MockEngine {
    /// Create a mock engine with no responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `node` for `url` (OBJ, JSON, Collada, glTF, FBX, BOM)
    pub fn insert_node(&self, url: impl Into<String>, node: SceneNode) -> &Self {
        self.insert(url, Ok(MockAsset::Node(node)))
    }

    /// Serve `texture` for `url`
    pub fn insert_texture(&self, url: impl Into<String>, texture: Texture) -> &Self {
        self.insert(url, Ok(MockAsset::Texture(texture)))
    }

    /// Serve `materials` for an MTL `url`
    pub fn insert_materials(&self, url: impl Into<String>, materials: MaterialLibrary) -> &Self {
        self.insert(url, Ok(MockAsset::Materials(materials)))
    }

    /// Serve decoded Draco `geometry` for `url`
    pub fn insert_geometry(&self, url: impl Into<String>, geometry: Geometry) -> &Self {
        self.insert(url, Ok(MockAsset::Geometry(geometry)))
    }

    /// Fail every load of `url` with `error`
    pub fn insert_failure(&self, url: impl Into<String>, error: EngineError) -> &Self {
        self.insert(url, Err(error))
    }

    fn insert(&self, url: impl Into<String>, response: EngineResult<MockAsset>) -> &Self {
        self.state.responses.lock().insert(url.into(), response);
        self
    }

    /// Hold the next load of `url` until the returned gate is released
    pub fn hold(&self, url: impl Into<String>) -> Gate {
        let (release, wait) = oneshot::channel();
        self.state.gates.lock().insert(url.into(), wait);
        Gate { release }
    }

    /// Urls in the order loads started
    pub fn calls(&self) -> Vec<String> {
        self.state.started.lock().clone()
    }

    /// Urls in the order loads finished
    pub fn finished(&self) -> Vec<String> {
        self.state.finished.lock().clone()
    }

    /// How many loads of `url` started
    pub fn call_count(&self, url: &str) -> usize {
        self.state.started.lock().iter().filter(|u| *u == url).count()
    }

    async fn respond(&self, request: &EngineRequest) -> EngineResult<MockAsset> {
        let url = request.url();
        self.state.started.lock().push(url.clone());

        let gate = self.state.gates.lock().remove(&url);
        if let Some(gate) = gate {
            // a dropped gate releases too
            let _ = gate.await;
        }

        let response = self.state.responses.lock().get(&url).cloned();
        self.state.finished.lock().push(url.clone());

        response.unwrap_or_else(|| Err(EngineError::Fetch(format!("404 Not Found: {url}"))))
    }

    async fn respond_node(&self, request: &EngineRequest) -> EngineResult<SceneNode> {
        match self.respond(request).await? {
            MockAsset::Node(node) => Ok(node),
            _ => Err(EngineError::Parse(format!("{} is not a model", request.url()))),
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn load_material_library(&self, request: &EngineRequest) -> EngineResult<MaterialLibrary> {
        match self.respond(request).await? {
            MockAsset::Materials(materials) => Ok(materials),
            _ => Err(EngineError::Parse(format!(
                "{} is not a material library",
                request.url()
            ))),
        }
    }

    async fn load_obj(
        &self,
        request: &EngineRequest,
        materials: &MaterialLibrary,
    ) -> EngineResult<SceneNode> {
        let mut node = self.respond_node(request).await?;
        // stand-in for usemtl: swap in library materials by name
        node.for_each_mesh_mut(&mut |mesh: &mut crate::model::Mesh| {
            let named = mesh.material.name.as_deref().and_then(|name| materials.get(name));
            if let Some(material) = named {
                mesh.material = material.clone();
            }
        });
        Ok(node)
    }

    async fn load_scene_json(&self, request: &EngineRequest) -> EngineResult<SceneNode> {
        self.respond_node(request).await
    }

    async fn load_collada(&self, request: &EngineRequest) -> EngineResult<ColladaDocument> {
        let scene = self.respond_node(request).await?;
        Ok(ColladaDocument { scene })
    }

    async fn load_gltf(&self, request: &EngineRequest) -> EngineResult<GltfDocument> {
        let scene = self.respond_node(request).await?;
        Ok(GltfDocument {
            scenes: vec![scene.clone()],
            scene,
        })
    }

    async fn load_fbx(&self, request: &EngineRequest) -> EngineResult<SceneNode> {
        self.respond_node(request).await
    }

    async fn load_draco(&self, request: &EngineRequest) -> EngineResult<Geometry> {
        match self.respond(request).await? {
            MockAsset::Geometry(geometry) => Ok(geometry),
            _ => Err(EngineError::Parse(format!("{} is not geometry", request.url()))),
        }
    }

    async fn load_bom(&self, request: &EngineRequest) -> EngineResult<SceneNode> {
        self.respond_node(request).await
    }

    async fn load_texture(&self, request: &EngineRequest) -> EngineResult<Texture> {
        match self.respond(request).await? {
            MockAsset::Texture(texture) => Ok(texture),
            _ => Err(EngineError::Parse(format!("{} is not an image", request.url()))),
        }
    }

    fn engine_name(&self) -> &'static str {
        "Mock"
    }
}
