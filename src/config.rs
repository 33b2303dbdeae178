//! Loader configuration

use serde::Deserialize;
use url::Url;

use crate::engine::CrossOrigin;
use crate::locator::Locator;

/// Options for an [`AssetLoader`](crate::AssetLoader)
///
/// Every field has a default, so a partial JSON object is a valid config:
///
/// ```
/// use polyload::LoaderConfig;
///
/// let config = LoaderConfig::from_json(r#"{ "cache": true, "image_size": 64 }"#).unwrap();
/// assert!(config.cache);
/// assert!(!config.use_queue);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Serialize loads through a FIFO queue, one at a time
    ///
    /// Places are taken when a load method is called, so a load future
    /// left unpolled holds up every load behind it until it is dropped.
    pub use_queue: bool,
    /// Load each url once and hand out clones to later requests
    pub cache: bool,
    /// Width of the plane an image is mounted on
    pub image_size: f32,
    /// Wrap images in a textured plane instead of returning the texture
    pub load_images_on_plane: bool,
    /// Cross-origin policy passed to the engine
    pub cross_origin: CrossOrigin,
    /// Relative urls are resolved against this
    pub base_url: Option<Url>,
    /// Render both faces of OBJ materials
    pub obj_double_sided: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            use_queue: false,
            cache: false,
            image_size: 32.0,
            load_images_on_plane: false,
            cross_origin: CrossOrigin::Anonymous,
            base_url: None,
            obj_double_sided: true,
        }
    }
}

impl LoaderConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_queue(mut self, use_queue: bool) -> Self {
        self.use_queue = use_queue;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_image_size(mut self, image_size: f32) -> Self {
        self.image_size = image_size;
        self
    }

    pub fn with_images_on_plane(mut self, on_plane: bool) -> Self {
        self.load_images_on_plane = on_plane;
        self
    }

    pub fn with_cross_origin(mut self, cross_origin: CrossOrigin) -> Self {
        self.cross_origin = cross_origin;
        self
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_obj_double_sided(mut self, double_sided: bool) -> Self {
        self.obj_double_sided = double_sided;
        self
    }

    /// Locator resolving against [`base_url`](Self::base_url)
    pub fn locator(&self) -> Locator {
        Locator::new(self.base_url.clone())
    }
}
