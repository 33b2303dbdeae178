//! Local file engine
//!
//! Reads files through `tokio::fs` and hands them to third-party parsers:
//! `tobj` for OBJ and MTL, `gltf` for glTF/GLB and `image` for PNG/JPEG.
//! Other formats fall back to the trait's `Unsupported` defaults.

use async_trait::async_trait;
use glam::{Quat, Vec3};
use std::path::{Path, PathBuf};

use super::{Engine, EngineError, EngineRequest, EngineResult, GltfDocument, MaterialLibrary};
use crate::model::{AlphaMode, Geometry, Material, Mesh, SceneNode, Transform};
use crate::texture::{Texture, TextureDecoder, TextureFormat};

/// Engine backed by the local file system
#[derive(Debug, Clone)]
pub struct FsEngine {
    root: PathBuf,
    decoder: TextureDecoder,
}

impl FsEngine {
    /// Create an engine resolving relative urls under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            decoder: TextureDecoder::new(),
        }
    }

    /// Directory relative urls are read from
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, url: &str) -> EngineResult<PathBuf> {
        // cache-busting queries mean nothing on disk
        let url = url.split(['?', '#']).next().unwrap_or(url);
        if let Some(local) = url.strip_prefix("file://") {
            return Ok(PathBuf::from(local));
        }
        if url.contains("://") || url.starts_with("//") || url.starts_with("data:") {
            return Err(EngineError::Fetch(format!("{url} is not a local file")));
        }
        Ok(self.root.join(url))
    }

    async fn read(&self, url: &str) -> EngineResult<Vec<u8>> {
        let path = self.path_of(url)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| EngineError::Fetch(format!("{}: {e}", path.display())))
    }

    /// Load a map referenced by a material; a missing map only warns
    async fn read_map(&self, base: &str, file: &str) -> Option<Texture> {
        let url = format!("{base}{file}");
        let decoded = match self.read(&url).await {
            Ok(data) => self
                .decoder
                .decode(Some(file.to_string()), &data)
                .map_err(|e| EngineError::Parse(e.to_string())),
            Err(e) => Err(e),
        };
        match decoded {
            Ok(texture) => Some(texture),
            Err(e) => {
                log::warn!("Skipping texture {url}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Engine for FsEngine {
    async fn load_material_library(&self, request: &EngineRequest) -> EngineResult<MaterialLibrary> {
        let data = self.read(&request.url()).await?;
        let (parsed, _) = tobj::load_mtl_buf(&mut data.as_slice())
            .map_err(|e| EngineError::Parse(format!("{}: {e}", request.url())))?;

        let mut library = MaterialLibrary::new();
        for mtl in parsed {
            let diffuse = mtl.diffuse.unwrap_or([1.0, 1.0, 1.0]);
            let opacity = mtl.dissolve.unwrap_or(1.0);
            let map = match &mtl.diffuse_texture {
                Some(file) => self.read_map(&request.path, file).await,
                None => None,
            };

            library.insert(Material {
                name: Some(mtl.name),
                base_color_factor: [diffuse[0], diffuse[1], diffuse[2], opacity],
                base_color_texture: map,
                alpha_mode: if opacity < 1.0 {
                    AlphaMode::Blend
                } else {
                    AlphaMode::Opaque
                },
                ..Default::default()
            });
        }

        log::debug!("Parsed {} materials from {}", library.len(), request.url());
        Ok(library)
    }

    async fn load_obj(
        &self,
        request: &EngineRequest,
        materials: &MaterialLibrary,
    ) -> EngineResult<SceneNode> {
        let data = self.read(&request.url()).await?;

        // usemtl resolves against the preloaded library, by position
        let stubs: Vec<tobj::Material> = materials
            .materials()
            .iter()
            .map(|m| tobj::Material {
                name: m.name.clone().unwrap_or_default(),
                ..Default::default()
            })
            .collect();
        let index: Vec<(String, usize)> = stubs
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();

        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, _) = tobj::load_obj_buf(&mut data.as_slice(), &options, |_| {
            Ok((stubs.clone(), index.iter().cloned().collect()))
        })
        .map_err(|e| EngineError::Parse(format!("{}: {e}", request.url())))?;

        let mut root = SceneNode::new(None);
        for model in models {
            let mesh = model.mesh;
            let geometry = Geometry {
                positions: mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
                normals: mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect(),
                uvs: mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect(),
                indices: mesh.indices,
            };
            let material = mesh
                .material_id
                .and_then(|id| materials.materials().get(id))
                .cloned()
                .unwrap_or_default();
            root.meshes.push(Mesh::new(Some(model.name), geometry, material));
        }

        log::debug!("Parsed {} meshes from {}", root.meshes.len(), request.url());
        Ok(root)
    }

    async fn load_gltf(&self, request: &EngineRequest) -> EngineResult<GltfDocument> {
        let path = self.path_of(&request.url())?;

        tokio::task::spawn_blocking(move || import_gltf(&path))
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?
    }

    async fn load_texture(&self, request: &EngineRequest) -> EngineResult<Texture> {
        let data = self.read(&request.url()).await?;
        self.decoder
            .decode(None, &data)
            .map_err(|e| EngineError::Parse(format!("{}: {e}", request.url())))
    }

    fn engine_name(&self) -> &'static str {
        "FileSystem"
    }
}

fn import_gltf(path: &Path) -> EngineResult<GltfDocument> {
    let (document, buffers, images) = gltf::import(path)
        .map_err(|e| EngineError::Parse(format!("{}: {e}", path.display())))?;

    let textures: Vec<Option<Texture>> = images.into_iter().map(convert_image).collect();

    let scenes: Vec<SceneNode> = document
        .scenes()
        .map(|scene| {
            let mut root = SceneNode::new(scene.name().map(str::to_string));
            for node in scene.nodes() {
                root.children.push(convert_node(&node, &buffers, &textures));
            }
            root
        })
        .collect();

    let default_index = document.default_scene().map(|s| s.index()).unwrap_or(0);
    let scene = scenes
        .get(default_index)
        .cloned()
        .unwrap_or_default();

    log::debug!(
        "Successfully parsed glTF with {} meshes and {} materials",
        document.meshes().len(),
        document.materials().len()
    );

    Ok(GltfDocument { scene, scenes })
}

fn convert_image(image: gltf::image::Data) -> Option<Texture> {
    let format = match image.format {
        gltf::image::Format::R8G8B8A8 => TextureFormat::Rgba8,
        gltf::image::Format::R8G8B8 => TextureFormat::Rgb8,
        other => {
            log::debug!("Skipping glTF image in {other:?}");
            return None;
        }
    };
    Some(Texture::new(None, image.width, image.height, format, image.pixels))
}

fn convert_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    textures: &[Option<Texture>],
) -> SceneNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let mut out = SceneNode::new(node.name().map(str::to_string));
    out.transform = Transform {
        translation: Vec3::from_array(translation),
        rotation: Quat::from_array(rotation),
        scale: Vec3::from_array(scale),
    };

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader =
                primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| b.0.as_slice()));

            // Positions are required; skip primitive if missing
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let normals = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_default();
            let uvs = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_default();
            let indices = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let geometry = Geometry {
                positions,
                normals,
                uvs,
                indices,
            };
            out.meshes.push(Mesh::new(
                mesh.name().map(str::to_string),
                geometry,
                convert_material(&primitive.material(), textures),
            ));
        }
    }

    for child in node.children() {
        out.children.push(convert_node(&child, buffers, textures));
    }
    out
}

fn convert_material(material: &gltf::Material, textures: &[Option<Texture>]) -> Material {
    let pbr = material.pbr_metallic_roughness();
    let base_color_texture = pbr
        .base_color_texture()
        .and_then(|info| textures.get(info.texture().source().index()).cloned().flatten());

    Material {
        name: material.name().map(str::to_string),
        base_color_factor: pbr.base_color_factor(),
        base_color_texture,
        alpha_mode: match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        double_sided: material.double_sided(),
        unlit: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CrossOrigin;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("polyload-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_remote_urls_are_rejected() {
        let engine = FsEngine::new(".");
        assert!(engine.path_of("https://example.com/a.obj").is_err());
        assert!(engine.path_of("//example.com/a.obj").is_err());
        assert_eq!(
            engine.path_of("file:///tmp/a.obj").unwrap(),
            PathBuf::from("/tmp/a.obj")
        );
        assert_eq!(engine.path_of("m/a.obj").unwrap(), PathBuf::from("./m/a.obj"));
    }

    #[tokio::test]
    async fn test_obj_with_mtl() {
        let dir = scratch_dir("obj");
        std::fs::write(
            dir.join("tri.mtl"),
            "newmtl red\nKd 1.0 0.0 0.0\nd 0.5\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("tri.obj"),
            "mtllib tri.mtl\no tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\nf 1 2 3\n",
        )
        .unwrap();

        let engine = FsEngine::new(&dir);
        let mtl = EngineRequest::new("", "tri.mtl", CrossOrigin::Anonymous);
        let library = engine.load_material_library(&mtl).await.unwrap();
        assert_eq!(library.len(), 1);
        assert_eq!(library.get("red").unwrap().alpha_mode, AlphaMode::Blend);

        let obj = EngineRequest::new("", "tri.obj", CrossOrigin::Anonymous);
        let node = engine.load_obj(&obj, &library).await.unwrap();
        assert_eq!(node.meshes.len(), 1);
        assert_eq!(node.meshes[0].geometry().vertex_count(), 3);
        assert_eq!(node.meshes[0].geometry().indices, vec![0, 1, 2]);
        assert_eq!(node.meshes[0].material.base_color_factor, [1.0, 0.0, 0.0, 0.5]);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_loader_picks_up_companion_mtl() {
        let dir = scratch_dir("companion");
        std::fs::create_dir_all(dir.join("models")).unwrap();
        std::fs::write(dir.join("models/box.mtl"), "newmtl blue\nKd 0.0 0.0 1.0\n").unwrap();
        std::fs::write(
            dir.join("models/box.obj"),
            "mtllib box.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl blue\nf 1 2 3\n",
        )
        .unwrap();

        let loader = crate::AssetLoader::new(FsEngine::new(&dir), Default::default());
        let asset = loader.load_one("models/box.obj?v=3").await.unwrap();
        let node = asset.as_node().unwrap();

        assert_eq!(node.name.as_deref(), Some("box"));
        let material = &node.meshes[0].material;
        assert_eq!(material.base_color_factor, [0.0, 0.0, 1.0, 1.0]);
        assert!(material.double_sided);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_missing_file_is_fetch_error() {
        let engine = FsEngine::new(scratch_dir("missing"));
        let request = EngineRequest::new("", "nope.png", CrossOrigin::Anonymous);
        assert!(matches!(
            engine.load_texture(&request).await,
            Err(EngineError::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn test_unsupported_formats_use_defaults() {
        let engine = FsEngine::new(".");
        let request = EngineRequest::new("", "a.fbx", CrossOrigin::Anonymous);
        assert!(matches!(
            engine.load_fbx(&request).await,
            Err(EngineError::Unsupported(_))
        ));
    }
}
