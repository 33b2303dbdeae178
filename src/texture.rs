//! Texture data and decoding

use std::sync::Arc;
use thiserror::Error;

/// Error type for texture decoding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TextureError {
    #[error("Image decoding error: {0}")]
    DecodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Pixel layout of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Rgb8,
}

impl TextureFormat {
    /// Bytes per pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::Rgb8 => 3,
        }
    }
}

/// A decoded image
///
/// Cloning a texture shares the pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    data: Arc<[u8]>,
}

impl Texture {
    /// Create a texture from raw pixels
    pub fn new(
        name: Option<String>,
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name,
            width,
            height,
            format,
            data: data.into(),
        }
    }

    /// Raw pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether two textures point at the same pixel buffer
    pub fn shares_data_with(&self, other: &Texture) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Height divided by width, 1.0 for degenerate images
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 {
            1.0
        } else {
            self.height as f32 / self.width as f32
        }
    }
}

/// Decodes PNG and JPEG bytes into textures
#[cfg(feature = "native-formats")]
#[derive(Debug, Default, Clone)]
pub struct TextureDecoder;

#[cfg(feature = "native-formats")]
impl TextureDecoder {
    /// Create a new texture decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode an image from binary data
    pub fn decode(&self, name: Option<String>, data: &[u8]) -> Result<Texture, TextureError> {
        use image::ImageFormat;

        let format =
            image::guess_format(data).map_err(|e| TextureError::DecodeError(e.to_string()))?;

        match format {
            ImageFormat::Jpeg | ImageFormat::Png => {}
            _ => {
                return Err(TextureError::UnsupportedFormat(format!(
                    "Only JPG/JPEG and PNG formats are supported, got {:?}",
                    format.extensions_str()
                )))
            }
        }

        let img = image::load_from_memory_with_format(data, format)
            .map_err(|e| TextureError::DecodeError(e.to_string()))?;

        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Texture::new(
            name,
            width,
            height,
            TextureFormat::Rgba8,
            rgba.into_raw(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_pixels() {
        let texture = Texture::new(None, 2, 1, TextureFormat::Rgba8, vec![0; 8]);
        let copy = texture.clone();
        assert!(texture.shares_data_with(&copy));
        assert_eq!(copy.data().len(), 8);
    }

    #[test]
    fn test_aspect_ratio() {
        let texture = Texture::new(None, 200, 100, TextureFormat::Rgb8, vec![0; 200 * 100 * 3]);
        assert_eq!(texture.aspect_ratio(), 0.5);

        let empty = Texture::new(None, 0, 0, TextureFormat::Rgba8, Vec::new());
        assert_eq!(empty.aspect_ratio(), 1.0);
    }

    #[cfg(feature = "native-formats")]
    #[test]
    fn test_decode_png() {
        let decoder = TextureDecoder::new();

        let mut img = image::RgbaImage::new(4, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));

        let mut png_data = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut png_data),
            image::ImageFormat::Png,
        )
        .expect("Failed to encode test image");

        let texture = decoder.decode(Some("red".into()), &png_data).unwrap();
        assert_eq!(texture.width, 4);
        assert_eq!(texture.height, 2);
        assert_eq!(texture.format, TextureFormat::Rgba8);
        assert_eq!(&texture.data()[..4], &[255, 0, 0, 255]);
    }

    #[cfg(feature = "native-formats")]
    #[test]
    fn test_decode_garbage() {
        let decoder = TextureDecoder::new();
        assert!(decoder.decode(None, b"not an image").is_err());
    }
}
