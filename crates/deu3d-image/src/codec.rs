// codec.rs -- image codec registry

//! Decoders are registered explicitly with a [`CodecRegistry`] and looked
//! up by file extension. The built-in entry decodes PNG, TGA and JPEG
//! through the `image` crate.

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use log::debug;
use rayon::prelude::*;

use crate::buffer::PixelBuffer;
use crate::error::ImageError;
use crate::format::{DataType, Origin, PixelFormat};

/// A decoder for one family of encoded images.
pub trait ImageCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Whether files with this extension (no dot, any case) are handled.
    fn accepts(&self, extension: &str) -> bool;

    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, ImageError>;
}

// ============================================================
// image crate backend
// ============================================================

/// PNG, TGA and JPEG via `image::load_from_memory_with_format`.
pub struct StandardCodec;

fn image_format_for(extension: &str) -> Option<ImageFormat> {
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some(ImageFormat::Png),
        "tga" => Some(ImageFormat::Tga),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

impl StandardCodec {
    fn decode_as(&self, bytes: &[u8], format: ImageFormat) -> Result<PixelBuffer, ImageError> {
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ImageError::Decode(e.to_string()).warned())?;

        let (width, height) = (decoded.width(), decoded.height());
        let (pixel_format, data) = match decoded {
            DynamicImage::ImageRgb8(rgb) => (PixelFormat::Rgb, rgb.into_raw()),
            DynamicImage::ImageLuma8(luma) => (PixelFormat::Luminance, luma.into_raw()),
            DynamicImage::ImageLumaA8(luma_alpha) => (PixelFormat::LuminanceAlpha, luma_alpha.into_raw()),
            other => (PixelFormat::Rgba, other.to_rgba8().into_raw()),
        };

        let mut img = PixelBuffer::new();
        img.set_image(width, height, 1, pixel_format, pixel_format, DataType::UnsignedByte, data, 1)?;
        img.set_origin(Origin::TopLeft);
        Ok(img)
    }
}

impl ImageCodec for StandardCodec {
    fn name(&self) -> &str {
        "image"
    }

    fn accepts(&self, extension: &str) -> bool {
        image_format_for(extension).is_some()
    }

    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer, ImageError> {
        // TGA carries no signature; anything unrecognised is tried as TGA
        let format = image::guess_format(bytes).unwrap_or(ImageFormat::Tga);
        self.decode_as(bytes, format)
    }
}

// ============================================================
// Registry
// ============================================================

#[derive(Default)]
pub struct CodecRegistry {
    codecs: Vec<Box<dyn ImageCodec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding [`StandardCodec`].
    pub fn with_default_codecs() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(StandardCodec));
        registry
    }

    /// Add a codec. Later registrations win for shared extensions.
    pub fn register(&mut self, codec: Box<dyn ImageCodec>) {
        debug!("codec registered: {}", codec.name());
        self.codecs.push(codec);
    }

    pub fn find(&self, extension: &str) -> Option<&dyn ImageCodec> {
        self.codecs
            .iter()
            .rev()
            .find(|codec| codec.accepts(extension))
            .map(|codec| codec.as_ref())
    }

    /// Decode `bytes` using the codec for `name`'s extension. The file name
    /// is recorded on the result.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<PixelBuffer, ImageError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let Some(codec) = self.find(extension) else {
            return Err(ImageError::Decode(format!("{}: no codec for extension '{}'", name, extension)).warned());
        };
        let mut img = codec.decode(bytes)?;
        img.set_file_name(name);
        debug!(
            "{}: decoded {}x{} {:?} with {}",
            name,
            img.width(),
            img.height(),
            img.pixel_format(),
            codec.name()
        );
        Ok(img)
    }

    /// Read and decode a file.
    pub fn load_file(&self, path: &Path) -> Result<PixelBuffer, ImageError> {
        let bytes = std::fs::read(path).map_err(|e| ImageError::Decode(format!("{}: {}", path.display(), e)).warned())?;
        self.decode(&path.to_string_lossy(), &bytes)
    }

    /// Decode many images on all cores. Results keep the input order.
    pub fn decode_batch(&self, sources: &[(String, Vec<u8>)]) -> Vec<Result<PixelBuffer, ImageError>> {
        sources
            .par_iter()
            .map(|(name, bytes)| self.decode(name, bytes))
            .collect()
    }

    /// Read and decode many files on all cores. Results keep the input order.
    pub fn load_files<P: AsRef<Path> + Sync>(&self, paths: &[P]) -> Vec<Result<PixelBuffer, ImageError>> {
        paths
            .par_iter()
            .map(|path| self.load_file(path.as_ref()))
            .collect()
    }
}
