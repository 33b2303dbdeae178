//! Per-format adapters
//!
//! Each adapter turns a resolved file into engine requests and normalizes
//! what the engine returns into a [`LoadedAsset`].

use crate::config::LoaderConfig;
use crate::engine::{Engine, EngineError, EngineRequest, MaterialLibrary};
use crate::error::{LoadError, Result};
use crate::format::AssetFormat;
use crate::locator::ResolvedFile;
use crate::model::{Geometry, LoadedAsset, Material, Mesh, SceneNode};
use crate::texture::Texture;

/// Where an OBJ's materials come from
#[derive(Debug, Clone, PartialEq)]
pub enum MtlSource {
    /// An MTL named by the caller; failing to load it fails the OBJ
    Explicit(ResolvedFile),
    /// `<stem>.mtl` next to the OBJ; the OBJ loads without it if missing
    Companion,
}

/// Load `file` as `format`
pub async fn load<E>(
    engine: &E,
    config: &LoaderConfig,
    format: AssetFormat,
    file: &ResolvedFile,
    mtl: &MtlSource,
) -> Result<LoadedAsset>
where
    E: Engine + ?Sized,
{
    let request = EngineRequest::new(&file.base, file.request_name(), config.cross_origin);

    let result = match format {
        AssetFormat::Obj => load_obj(engine, config, file, &request, mtl).await,
        AssetFormat::SceneJson => engine
            .load_scene_json(&request)
            .await
            .map_err(|e| engine_error(file, e))
            .map(LoadedAsset::Node),
        AssetFormat::Collada => engine
            .load_collada(&request)
            .await
            .map_err(|e| engine_error(file, e))
            .map(|document| LoadedAsset::Node(document.scene)),
        AssetFormat::Gltf => engine
            .load_gltf(&request)
            .await
            .map_err(|e| engine_error(file, e))
            .map(|document| LoadedAsset::Node(document.scene)),
        AssetFormat::Fbx => engine
            .load_fbx(&request)
            .await
            .map_err(|e| engine_error(file, e))
            .map(LoadedAsset::Node),
        AssetFormat::Draco => engine
            .load_draco(&request)
            .await
            .map_err(|e| engine_error(file, e))
            .map(|geometry| wrap_geometry(file, geometry)),
        AssetFormat::Bom => engine
            .load_bom(&request)
            .await
            .map_err(|e| engine_error(file, e))
            .map(LoadedAsset::Node),
        AssetFormat::Image => engine
            .load_texture(&request)
            .await
            .map_err(|e| engine_error(file, e))
            .map(|texture| image_asset(config, file, texture)),
    };

    match result {
        Ok(mut asset) => {
            if let Some(node) = asset.as_node_mut() {
                if node.name.is_none() {
                    node.name = Some(file.stem.clone());
                }
            }
            log::debug!(
                "Loaded {} as {} with {}",
                file.url,
                format,
                engine.engine_name()
            );
            Ok(asset)
        }
        Err(err) => {
            log::warn!("{err}");
            Err(err)
        }
    }
}

async fn load_obj<E>(
    engine: &E,
    config: &LoaderConfig,
    file: &ResolvedFile,
    request: &EngineRequest,
    mtl: &MtlSource,
) -> Result<LoadedAsset>
where
    E: Engine + ?Sized,
{
    let materials = match mtl {
        MtlSource::Explicit(mtl) => {
            let mtl_request =
                EngineRequest::new(&mtl.base, mtl.request_name(), config.cross_origin);
            engine
                .load_material_library(&mtl_request)
                .await
                .map_err(|e| engine_error(mtl, e))?
        }
        MtlSource::Companion => {
            let mtl_request =
                EngineRequest::new(&file.base, format!("{}.mtl", file.stem), config.cross_origin);
            match engine.load_material_library(&mtl_request).await {
                Ok(materials) => materials,
                Err(e) => {
                    log::debug!(
                        "No material library at {}, loading {} untextured: {e}",
                        mtl_request.url(),
                        file.file_name
                    );
                    MaterialLibrary::new()
                }
            }
        }
    };

    let mut node = engine
        .load_obj(request, &materials)
        .await
        .map_err(|e| engine_error(file, e))?;

    if config.obj_double_sided {
        node.for_each_mesh_mut(&mut |mesh: &mut Mesh| mesh.material.double_sided = true);
    }
    Ok(LoadedAsset::Node(node))
}

fn wrap_geometry(file: &ResolvedFile, geometry: Geometry) -> LoadedAsset {
    let mesh = Mesh::new(Some(file.stem.clone()), geometry, Material::default());
    LoadedAsset::Node(SceneNode::new(Some(file.stem.clone())).with_mesh(mesh))
}

fn image_asset(config: &LoaderConfig, file: &ResolvedFile, mut texture: Texture) -> LoadedAsset {
    if texture.name.is_none() {
        texture.name = Some(file.stem.clone());
    }
    if !config.load_images_on_plane {
        return LoadedAsset::Texture(texture);
    }

    let width = config.image_size;
    let height = config.image_size * texture.aspect_ratio();
    let plane = Mesh::new(
        Some(file.stem.clone()),
        Geometry::plane(width, height),
        Material::unlit_map(texture),
    );
    LoadedAsset::Node(SceneNode::new(Some(file.stem.clone())).with_mesh(plane))
}

fn engine_error(file: &ResolvedFile, source: EngineError) -> LoadError {
    LoadError::Engine {
        url: file.url.clone(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;
    use crate::locator::parse_url;
    use crate::texture::TextureFormat;
    use futures::executor::block_on;

    fn run(engine: &MockEngine, config: &LoaderConfig, url: &str) -> Result<LoadedAsset> {
        let file = parse_url(url).unwrap();
        let format = AssetFormat::from_extension(&file.extension).unwrap();
        block_on(load(engine, config, format, &file, &MtlSource::Companion))
    }

    fn image(width: u32, height: u32) -> Texture {
        let bytes = (width * height * 4) as usize;
        Texture::new(None, width, height, TextureFormat::Rgba8, vec![255; bytes])
    }

    #[test]
    fn test_image_plane_height_follows_aspect() {
        let engine = MockEngine::new();
        engine.insert_texture("img/banner.png", image(400, 100));
        let config = LoaderConfig::default().with_images_on_plane(true);

        let asset = run(&engine, &config, "img/banner.png").unwrap();
        let node = asset.as_node().unwrap();
        let mesh = &node.meshes[0];
        let extent = mesh.geometry().extent();

        assert!((extent.x - 32.0).abs() < 1e-5);
        assert!((extent.y - 8.0).abs() < 1e-5);
        assert!(mesh.material.double_sided);
        assert!(mesh.material.unlit);
        assert_eq!(node.name.as_deref(), Some("banner"));
    }

    #[test]
    fn test_bare_image_is_texture() {
        let engine = MockEngine::new();
        engine.insert_texture("img/logo.jpg", image(2, 2));

        let asset = run(&engine, &LoaderConfig::default(), "img/logo.jpg").unwrap();
        assert_eq!(asset.as_texture().unwrap().name.as_deref(), Some("logo"));
    }

    #[test]
    fn test_obj_without_companion_mtl_still_loads() {
        let engine = MockEngine::new();
        engine.insert_node(
            "m/crate.obj",
            SceneNode::new(None).with_mesh(Mesh::new(None, Geometry::default(), Material::default())),
        );

        let asset = run(&engine, &LoaderConfig::default(), "m/crate.obj").unwrap();
        assert_eq!(engine.calls(), vec!["m/crate.mtl".to_string(), "m/crate.obj".to_string()]);
        let node = asset.as_node().unwrap();
        assert_eq!(node.name.as_deref(), Some("crate"));
        assert!(node.meshes[0].material.double_sided);
    }

    #[test]
    fn test_explicit_mtl_failure_fails_obj() {
        let engine = MockEngine::new();
        engine.insert_node("m/crate.obj", SceneNode::new(None));
        let file = parse_url("m/crate.obj").unwrap();
        let mtl = MtlSource::Explicit(parse_url("shared/wood.mtl").unwrap());

        let result = block_on(load(
            &engine,
            &LoaderConfig::default(),
            AssetFormat::Obj,
            &file,
            &mtl,
        ));
        match result {
            Err(LoadError::Engine { url, .. }) => assert_eq!(url, "shared/wood.mtl"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(engine.call_count("m/crate.obj"), 0);
    }

    #[test]
    fn test_draco_is_wrapped_in_mesh() {
        let engine = MockEngine::new();
        engine.insert_geometry("d/bunny.drc", Geometry::plane(1.0, 1.0));

        let asset = run(&engine, &LoaderConfig::default(), "d/bunny.drc").unwrap();
        let node = asset.as_node().unwrap();
        assert_eq!(node.mesh_count(), 1);
        assert_eq!(node.meshes[0].geometry().vertex_count(), 4);
    }

    #[test]
    fn test_engine_failure_is_typed() {
        let engine = MockEngine::new();
        engine.insert_failure("s/room.dae", EngineError::Parse("bad xml".into()));

        let err = run(&engine, &LoaderConfig::default(), "s/room.dae").unwrap_err();
        assert_eq!(
            err,
            LoadError::Engine {
                url: "s/room.dae".into(),
                source: EngineError::Parse("bad xml".into()),
            }
        );
    }
}
