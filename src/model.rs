//! Scene graph values produced by the loader
//!
//! A loaded model is a tree of [`SceneNode`]s. Meshes share their geometry
//! through an `Arc` but own their material, so an instance can restyle its
//! materials without touching other instances of the same asset.

use glam::{Quat, Vec3};
use std::sync::Arc;
use uuid::Uuid;

use crate::texture::Texture;

/// Spatial transform (translation, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Origin, no rotation, unit scale
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Whether this is the identity transform
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// How to handle transparency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// Surface description of a mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Optional name of the material
    pub name: Option<String>,
    /// Base color factor (RGBA)
    pub base_color_factor: [f32; 4],
    /// Color map
    pub base_color_texture: Option<Texture>,
    /// Alpha mode
    pub alpha_mode: AlphaMode,
    /// Whether both faces are rendered
    pub double_sided: bool,
    /// Whether lighting is ignored
    pub unlit: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            unlit: false,
        }
    }
}

impl Material {
    /// Unlit, double-sided material showing `texture`
    pub fn unlit_map(texture: Texture) -> Self {
        Self {
            name: texture.name.clone(),
            base_color_texture: Some(texture),
            double_sided: true,
            unlit: true,
            ..Default::default()
        }
    }
}

/// Vertex and index buffers of a mesh
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Geometry {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// A single-quad plane in the XY plane, centered on the origin, facing +Z
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            positions: vec![[-hw, hh, 0.0], [hw, hh, 0.0], [-hw, -hh, 0.0], [hw, -hh, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            uvs: vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]],
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of indices
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Size of the axis-aligned bounding box
    pub fn extent(&self) -> Vec3 {
        let mut points = self.positions.iter().map(|p| Vec3::from_array(*p));
        let Some(first) = points.next() else {
            return Vec3::ZERO;
        };
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        max - min
    }
}

/// A drawable mesh
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Optional name of the mesh
    pub name: Option<String>,
    geometry: Arc<Geometry>,
    /// Owned per instance
    pub material: Material,
}

impl Mesh {
    /// Create a mesh owning fresh geometry
    pub fn new(name: Option<String>, geometry: Geometry, material: Material) -> Self {
        Self::with_shared_geometry(name, Arc::new(geometry), material)
    }

    /// Create a mesh over geometry shared with other meshes
    pub fn with_shared_geometry(
        name: Option<String>,
        geometry: Arc<Geometry>,
        material: Material,
    ) -> Self {
        Self {
            name,
            geometry,
            material,
        }
    }

    /// Vertex and index data
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Shared handle to the geometry
    pub fn geometry_arc(&self) -> Arc<Geometry> {
        Arc::clone(&self.geometry)
    }

    /// Whether two meshes reference the same geometry buffers
    pub fn shares_geometry_with(&self, other: &Mesh) -> bool {
        Arc::ptr_eq(&self.geometry, &other.geometry)
    }
}

impl PartialEq for Mesh {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.material == other.material
            // Compare the actual geometry, not the Arc
            && *self.geometry == *other.geometry
    }
}

/// A node in the scene hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    id: Uuid,
    /// Optional name of the node
    pub name: Option<String>,
    /// Local transform of the node
    pub transform: Transform,
    /// Meshes attached to this node
    pub meshes: Vec<Mesh>,
    /// Child nodes
    pub children: Vec<SceneNode>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SceneNode {
    /// Create an empty node
    pub fn new(name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            transform: Transform::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Identity of this node instance
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Add a mesh
    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.meshes.push(mesh);
        self
    }

    /// Add a child node
    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Visit every mesh in this subtree
    pub fn for_each_mesh(&self, f: &mut impl FnMut(&Mesh)) {
        self.meshes.iter().for_each(&mut *f);
        for child in &self.children {
            child.for_each_mesh(f);
        }
    }

    /// Visit every mesh in this subtree mutably
    pub fn for_each_mesh_mut(&mut self, f: &mut impl FnMut(&mut Mesh)) {
        self.meshes.iter_mut().for_each(&mut *f);
        for child in &mut self.children {
            child.for_each_mesh_mut(f);
        }
    }

    /// Number of meshes in this subtree
    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.for_each_mesh(&mut |_: &Mesh| count += 1);
        count
    }

    /// A new instance of this subtree
    ///
    /// The root transform is reset to identity and every node gets a new id.
    /// Materials are copied; geometry and texture pixels stay shared.
    pub fn instantiate(&self) -> SceneNode {
        let mut copy = self.clone();
        copy.transform = Transform::IDENTITY;
        copy.renew_ids();
        copy
    }

    fn renew_ids(&mut self) {
        self.id = Uuid::new_v4();
        for child in &mut self.children {
            child.renew_ids();
        }
    }
}

/// The normalized result of loading one url
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedAsset {
    /// A model, or an image mounted on a plane
    Node(SceneNode),
    /// A bare image
    Texture(Texture),
}

impl LoadedAsset {
    /// Name of the node or texture
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Node(node) => node.name.as_deref(),
            Self::Texture(texture) => texture.name.as_deref(),
        }
    }

    /// The node, if this is a model
    pub fn as_node(&self) -> Option<&SceneNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Texture(_) => None,
        }
    }

    /// The node, mutably
    pub fn as_node_mut(&mut self) -> Option<&mut SceneNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Texture(_) => None,
        }
    }

    /// The texture, if this is a bare image
    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            Self::Texture(texture) => Some(texture),
            Self::Node(_) => None,
        }
    }

    /// Take the node out, if this is a model
    pub fn into_node(self) -> Option<SceneNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Texture(_) => None,
        }
    }

    /// Root transform; textures have none
    pub fn transform(&self) -> Option<&Transform> {
        self.as_node().map(|node| &node.transform)
    }

    /// Root transform, mutably
    pub fn transform_mut(&mut self) -> Option<&mut Transform> {
        self.as_node_mut().map(|node| &mut node.transform)
    }

    /// An independent copy for another requester, see [`SceneNode::instantiate`]
    pub fn instantiate(&self) -> LoadedAsset {
        match self {
            Self::Node(node) => Self::Node(node.instantiate()),
            Self::Texture(texture) => Self::Texture(texture.clone()),
        }
    }
}

impl From<SceneNode> for LoadedAsset {
    fn from(node: SceneNode) -> Self {
        Self::Node(node)
    }
}

impl From<Texture> for LoadedAsset {
    fn from(texture: Texture) -> Self {
        Self::Texture(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::TextureFormat;

    fn two_level_model() -> SceneNode {
        let red = Material {
            name: Some("red".into()),
            base_color_factor: [1.0, 0.0, 0.0, 1.0],
            ..Default::default()
        };
        let child = SceneNode::new(Some("wheel".into()))
            .with_mesh(Mesh::new(None, Geometry::plane(1.0, 1.0), red.clone()));
        SceneNode::new(Some("car".into()))
            .with_mesh(Mesh::new(Some("body".into()), Geometry::plane(4.0, 2.0), red))
            .with_child(child)
    }

    #[test]
    fn test_transform_default_is_identity() {
        assert!(Transform::default().is_identity());
        let moved = Transform {
            translation: Vec3::X,
            ..Default::default()
        };
        assert!(!moved.is_identity());
    }

    #[test]
    fn test_plane_extent() {
        let plane = Geometry::plane(32.0, 18.0);
        assert_eq!(plane.vertex_count(), 4);
        assert_eq!(plane.index_count(), 6);
        let extent = plane.extent();
        assert!((extent.x - 32.0).abs() < 1e-5);
        assert!((extent.y - 18.0).abs() < 1e-5);
        assert_eq!(extent.z, 0.0);
    }

    #[test]
    fn test_empty_geometry_extent() {
        assert_eq!(Geometry::default().extent(), Vec3::ZERO);
    }

    #[test]
    fn test_instantiate_resets_root_transform() {
        let mut model = two_level_model();
        model.transform.translation = Vec3::new(1.0, 2.0, 3.0);
        model.children[0].transform.translation = Vec3::new(0.5, 0.0, 0.0);

        let copy = model.instantiate();
        assert!(copy.transform.is_identity());
        // child placement is part of the model
        assert_eq!(copy.children[0].transform.translation, Vec3::new(0.5, 0.0, 0.0));
        assert_ne!(copy.id(), model.id());
        assert_ne!(copy.children[0].id(), model.children[0].id());
    }

    #[test]
    fn test_instantiate_shares_geometry_copies_material() {
        let model = two_level_model();
        let mut copy = model.instantiate();

        assert!(copy.meshes[0].shares_geometry_with(&model.meshes[0]));
        copy.for_each_mesh_mut(&mut |mesh: &mut Mesh| mesh.material.base_color_factor = [0.0, 0.0, 1.0, 1.0]);

        model.for_each_mesh(&mut |mesh: &Mesh| {
            assert_eq!(mesh.material.base_color_factor, [1.0, 0.0, 0.0, 1.0]);
        });
        assert_eq!(copy.mesh_count(), 2);
    }

    #[test]
    fn test_loaded_asset_accessors() {
        let texture = Texture::new(Some("logo".into()), 1, 1, TextureFormat::Rgba8, vec![0; 4]);
        let mut asset = LoadedAsset::from(texture);
        assert_eq!(asset.name(), Some("logo"));
        assert!(asset.transform_mut().is_none());
        assert!(asset.as_texture().is_some());

        let mut asset = LoadedAsset::from(two_level_model());
        asset.transform_mut().unwrap().scale = Vec3::splat(2.0);
        assert_eq!(asset.transform().unwrap().scale, Vec3::splat(2.0));
        assert_eq!(asset.into_node().unwrap().name.as_deref(), Some("car"));
    }
}
