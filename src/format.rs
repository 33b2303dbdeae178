//! Extension to format dispatch table

use std::fmt;

/// Asset formats the loader knows how to dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// Wavefront OBJ, loaded together with its MTL material library
    Obj,
    /// Engine-native JSON scene description
    SceneJson,
    /// Collada `.dae`
    Collada,
    /// glTF 2.0, text (`.gltf`) or binary (`.glb`)
    Gltf,
    /// FBX (ASCII, version 7 and up)
    Fbx,
    /// Draco-compressed geometry
    Draco,
    /// Bill-of-materials assembly
    Bom,
    /// PNG or JPEG image
    Image,
}

impl AssetFormat {
    /// Every dispatchable format
    pub const ALL: [AssetFormat; 8] = [
        Self::Obj,
        Self::SceneJson,
        Self::Collada,
        Self::Gltf,
        Self::Fbx,
        Self::Draco,
        Self::Bom,
        Self::Image,
    ];

    /// Look up a lower-cased extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "obj" => Some(Self::Obj),
            "json" => Some(Self::SceneJson),
            "dae" => Some(Self::Collada),
            "gltf" | "glb" => Some(Self::Gltf),
            "fbx" => Some(Self::Fbx),
            "drc" => Some(Self::Draco),
            "bom" => Some(Self::Bom),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }

    /// Extensions that dispatch to this format
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Obj => &["obj"],
            Self::SceneJson => &["json"],
            Self::Collada => &["dae"],
            Self::Gltf => &["gltf", "glb"],
            Self::Fbx => &["fbx"],
            Self::Draco => &["drc"],
            Self::Bom => &["bom"],
            Self::Image => &["png", "jpg", "jpeg"],
        }
    }

    /// Whether the loaded asset is an image rather than a model
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image)
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Obj => "OBJ",
            Self::SceneJson => "scene JSON",
            Self::Collada => "Collada",
            Self::Gltf => "glTF",
            Self::Fbx => "FBX",
            Self::Draco => "Draco",
            Self::Bom => "BOM",
            Self::Image => "image",
        };
        f.write_str(name)
    }
}

/// Whether an extension names an MTL material library
pub fn is_material_library(extension: &str) -> bool {
    extension == "mtl"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_round_trips_extensions() {
        for format in AssetFormat::ALL {
            for ext in format.extensions() {
                assert_eq!(AssetFormat::from_extension(ext), Some(format));
            }
        }
    }

    #[test]
    fn test_unknown_extensions() {
        assert_eq!(AssetFormat::from_extension("xyz"), None);
        assert_eq!(AssetFormat::from_extension(""), None);
        assert_eq!(AssetFormat::from_extension("mtl"), None);
        assert!(is_material_library("mtl"));
    }

    #[test]
    fn test_lookup_is_exact() {
        // callers lower-case first
        assert_eq!(AssetFormat::from_extension("OBJ"), None);
        assert_eq!(AssetFormat::from_extension("jpeg"), Some(AssetFormat::Image));
    }
}
