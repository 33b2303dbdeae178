//! Named asset manifests and the containers they load into
//!
//! A [`SceneRequest`] names each asset it wants, optionally with its own
//! MTL file and placement:
//!
//! ```json
//! {
//!   "shared_mtl": "materials/common.mtl",
//!   "assets": {
//!     "table": { "url": "models/table.obj", "position": "0 0 -2" },
//!     "lamp":  { "url": "models/lamp.obj", "mtl": "models/brass.mtl",
//!                "rotation": { "x": 0, "y": 1.5708, "z": 0 } }
//!   }
//! }
//! ```

use glam::{EulerRot, Quat, Vec3};
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::LoadError;
use crate::model::{LoadedAsset, Transform};

/// Error type for transform override values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformParseError {
    #[error("Expected 3 components, found {0}")]
    Arity(usize),

    #[error("Not a number: {0}")]
    Number(String),
}

/// A vector written as `"x y z"` or as an object
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TransformValue {
    Text(String),
    Components {
        x: f32,
        y: f32,
        z: f32,
        #[serde(default)]
        w: Option<f32>,
    },
}

impl TransformValue {
    /// Parse as a position or scale
    ///
    /// A `w` component is ignored.
    pub fn to_vec3(&self) -> Result<Vec3, TransformParseError> {
        match self {
            Self::Text(text) => parse_triple(text),
            Self::Components { x, y, z, .. } => Ok(Vec3::new(*x, *y, *z)),
        }
    }

    /// Parse as a rotation
    ///
    /// Three components are Euler angles in radians applied in XYZ order;
    /// a `w` component makes it a quaternion, which is normalized.
    pub fn to_quat(&self) -> Result<Quat, TransformParseError> {
        match self {
            Self::Components {
                x,
                y,
                z,
                w: Some(w),
            } => Ok(Quat::from_xyzw(*x, *y, *z, *w).normalize()),
            _ => {
                let euler = self.to_vec3()?;
                Ok(Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z))
            }
        }
    }
}

impl From<&str> for TransformValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec3> for TransformValue {
    fn from(v: Vec3) -> Self {
        Self::Components {
            x: v.x,
            y: v.y,
            z: v.z,
            w: None,
        }
    }
}

fn parse_triple(text: &str) -> Result<Vec3, TransformParseError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(TransformParseError::Arity(parts.len()));
    }

    let mut values = [0.0f32; 3];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse()
            .map_err(|_| TransformParseError::Number(part.to_string()))?;
    }
    Ok(Vec3::from_array(values))
}

/// Parsed placement overrides for one asset
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformOverride {
    pub translation: Option<Vec3>,
    pub rotation: Option<Quat>,
    pub scale: Option<Vec3>,
}

impl TransformOverride {
    /// Whether nothing is overridden
    pub fn is_empty(&self) -> bool {
        self.translation.is_none() && self.rotation.is_none() && self.scale.is_none()
    }

    /// Overwrite the overridden parts of `transform`
    pub fn apply(&self, transform: &mut Transform) {
        if let Some(translation) = self.translation {
            transform.translation = translation;
        }
        if let Some(rotation) = self.rotation {
            transform.rotation = rotation;
        }
        if let Some(scale) = self.scale {
            transform.scale = scale;
        }
    }
}

/// One named asset of a [`SceneRequest`]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetEntry {
    pub url: String,
    /// MTL file for this asset only; wins over the shared one
    #[serde(default)]
    pub mtl: Option<String>,
    #[serde(default)]
    pub position: Option<TransformValue>,
    #[serde(default)]
    pub rotation: Option<TransformValue>,
    #[serde(default)]
    pub scale: Option<TransformValue>,
}

impl AssetEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mtl: None,
            position: None,
            rotation: None,
            scale: None,
        }
    }

    pub fn with_mtl(mut self, mtl: impl Into<String>) -> Self {
        self.mtl = Some(mtl.into());
        self
    }

    pub fn with_position(mut self, position: impl Into<TransformValue>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_rotation(mut self, rotation: impl Into<TransformValue>) -> Self {
        self.rotation = Some(rotation.into());
        self
    }

    pub fn with_scale(mut self, scale: impl Into<TransformValue>) -> Self {
        self.scale = Some(scale.into());
        self
    }

    /// Parse the placement overrides
    pub fn overrides(&self) -> Result<TransformOverride, TransformParseError> {
        Ok(TransformOverride {
            translation: self.position.as_ref().map(|v| v.to_vec3()).transpose()?,
            rotation: self.rotation.as_ref().map(|v| v.to_quat()).transpose()?,
            scale: self.scale.as_ref().map(|v| v.to_vec3()).transpose()?,
        })
    }
}

/// A named set of assets to load together
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SceneRequest {
    /// MTL file used by every OBJ without its own
    #[serde(default)]
    pub shared_mtl: Option<String>,
    /// Assets by name
    pub assets: BTreeMap<String, AssetEntry>,
}

impl SceneRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a request from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_shared_mtl(mut self, mtl: impl Into<String>) -> Self {
        self.shared_mtl = Some(mtl.into());
        self
    }

    pub fn with_asset(mut self, name: impl Into<String>, entry: AssetEntry) -> Self {
        self.assets.insert(name.into(), entry);
        self
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Something named assets can be added to
pub trait SceneContainer {
    /// Add a loaded asset under `name`
    fn add(&mut self, name: &str, asset: LoadedAsset);
}

/// A flat, insertion-ordered scene
#[derive(Debug, Clone, Default)]
pub struct Scene {
    entries: Vec<(String, LoadedAsset)>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// First asset added under `name`
    pub fn get(&self, name: &str) -> Option<&LoadedAsset> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, asset)| asset)
    }

    /// Names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoadedAsset)> {
        self.entries.iter().map(|(name, asset)| (name.as_str(), asset))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SceneContainer for Scene {
    fn add(&mut self, name: &str, asset: LoadedAsset) {
        self.entries.push((name.to_string(), asset));
    }
}

/// Outcome of loading a [`SceneRequest`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneLoadReport {
    /// Names added to the container, in the order they were added
    pub inserted: Vec<String>,
    /// Names that failed, with the reason
    pub failed: Vec<(String, LoadError)>,
}

impl SceneLoadReport {
    /// Whether every asset was added
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Failure for `name`, if it failed
    pub fn failure(&self, name: &str) -> Option<&LoadError> {
        self.failed
            .iter()
            .find(|(failed, _)| failed == name)
            .map(|(_, err)| err)
    }
}
