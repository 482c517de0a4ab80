// catalog.rs -- per-format properties

//! Pure lookups over (format, data type): component counts, bits per
//! pixel, base formats, row strides and mipmap chain lengths.
//!
//! Nothing here allocates or panics. Combinations the tables do not cover
//! yield 0 (or `None`) and a warning.

use log::warn;

use crate::error::ImageError;
use crate::format::{DataType, PixelFormat};

use DataType as T;
use PixelFormat as F;

// ============================================================
// Components
// ============================================================

/// Number of components per texel. 0 for the unsized generic
/// compressed formats, which have no fixed layout.
pub fn component_count(format: PixelFormat) -> u32 {
    match format {
        F::ColorIndex | F::StencilIndex | F::DepthComponent => 1,
        F::Red | F::Green | F::Blue | F::Alpha | F::Intensity => 1,
        F::Luminance | F::Luminance4 | F::Luminance8 | F::Luminance12 | F::Luminance16 => 1,
        F::Intensity4 | F::Intensity8 | F::Intensity12 | F::Intensity16 => 1,
        F::Alpha32F | F::Alpha16F | F::Intensity32F | F::Intensity16F => 1,
        F::Luminance32F | F::Luminance16F => 1,
        F::Alpha32UI | F::Alpha16UI | F::Alpha8UI | F::Alpha32I | F::Alpha16I | F::Alpha8I => 1,
        F::Intensity32UI | F::Intensity16UI | F::Intensity8UI => 1,
        F::Intensity32I | F::Intensity16I | F::Intensity8I => 1,
        F::Luminance32UI | F::Luminance16UI | F::Luminance8UI => 1,
        F::Luminance32I | F::Luminance16I | F::Luminance8I => 1,
        F::RedInteger | F::GreenInteger | F::BlueInteger | F::AlphaInteger => 1,
        F::LuminanceInteger => 1,
        F::CompressedRedRgtc1 | F::CompressedSignedRedRgtc1 => 1,

        F::LuminanceAlpha | F::Luminance4Alpha4 | F::Luminance6Alpha2 => 2,
        F::Luminance8Alpha8 | F::Luminance12Alpha4 | F::Luminance12Alpha12 => 2,
        F::Luminance16Alpha16 => 2,
        F::LuminanceAlpha32F | F::LuminanceAlpha16F => 2,
        F::LuminanceAlpha32UI | F::LuminanceAlpha16UI | F::LuminanceAlpha8UI => 2,
        F::LuminanceAlpha32I | F::LuminanceAlpha16I | F::LuminanceAlpha8I => 2,
        F::LuminanceAlphaInteger => 2,
        F::Hilo | F::Dsdt => 2,
        F::CompressedRedGreenRgtc2 | F::CompressedSignedRedGreenRgtc2 => 2,

        F::Rgb | F::Bgr | F::Rgb32F | F::Rgb16F => 3,
        F::Rgb32UI | F::Rgb16UI | F::Rgb8UI | F::Rgb32I | F::Rgb16I | F::Rgb8I => 3,
        F::RgbInteger | F::BgrInteger => 3,
        F::DsdtMag => 3,
        F::CompressedRgbDxt1 | F::CompressedRgbPvrtc4Bpp | F::CompressedRgbPvrtc2Bpp => 3,
        F::CompressedEtc1 => 3,

        F::Rgba | F::Bgra | F::Rgba8 | F::Rgba32F | F::Rgba16F => 4,
        F::Rgba32UI | F::Rgba16UI | F::Rgba8UI | F::Rgba32I | F::Rgba16I | F::Rgba8I => 4,
        F::RgbaInteger | F::BgraInteger => 4,
        F::DsdtMagVib => 4,
        F::CompressedRgbaDxt1 | F::CompressedRgbaDxt3 | F::CompressedRgbaDxt5 => 4,
        F::CompressedRgbaPvrtc4Bpp | F::CompressedRgbaPvrtc2Bpp => 4,

        F::CompressedAlpha
        | F::CompressedLuminance
        | F::CompressedLuminanceAlpha
        | F::CompressedIntensity
        | F::CompressedRgb
        | F::CompressedRgba => {
            warn!("component_count: no fixed component count for {:?}", format);
            0
        }
    }
}

/// [`component_count`] for a raw GL enumerant.
pub fn component_count_of_code(format: u32) -> Result<u32, ImageError> {
    PixelFormat::from_code(format)
        .map(component_count)
        .ok_or_else(|| ImageError::UnknownFormat { format, data_type: 0 }.warned())
}

// ============================================================
// Bit sizes
// ============================================================

/// Per-texel bit rate of a block compressed format.
fn compressed_bits_per_pixel(format: PixelFormat) -> Option<u32> {
    match format {
        F::CompressedRgbDxt1 | F::CompressedRgbaDxt1 => Some(4),
        F::CompressedRgbaDxt3 | F::CompressedRgbaDxt5 => Some(8),
        F::CompressedRedRgtc1 | F::CompressedSignedRedRgtc1 => Some(4),
        F::CompressedRedGreenRgtc2 | F::CompressedSignedRedGreenRgtc2 => Some(8),
        F::CompressedRgbPvrtc4Bpp | F::CompressedRgbaPvrtc4Bpp => Some(4),
        F::CompressedRgbPvrtc2Bpp | F::CompressedRgbaPvrtc2Bpp => Some(2),
        F::CompressedEtc1 => Some(4),
        _ => None,
    }
}

/// Legacy sized formats carry their own size, whatever the data type.
fn sized_legacy_bits_per_pixel(format: PixelFormat) -> Option<u32> {
    match format {
        F::Luminance4 | F::Intensity4 => Some(4),
        F::Luminance8 | F::Intensity8 | F::Luminance4Alpha4 | F::Luminance6Alpha2 => Some(8),
        F::Luminance12 | F::Intensity12 => Some(12),
        F::Luminance16 | F::Intensity16 | F::Luminance8Alpha8 => Some(16),
        F::Luminance12Alpha4 => Some(16),
        F::Luminance12Alpha12 => Some(24),
        F::Luminance16Alpha16 => Some(32),
        _ => None,
    }
}

/// Bits occupied by one texel.
pub fn bits_per_pixel(format: PixelFormat, data_type: DataType) -> u32 {
    if let Some(bits) = compressed_bits_per_pixel(format) {
        return bits;
    }
    if matches!(
        format,
        F::CompressedAlpha
            | F::CompressedLuminance
            | F::CompressedLuminanceAlpha
            | F::CompressedIntensity
            | F::CompressedRgb
            | F::CompressedRgba
    ) {
        warn!("bits_per_pixel: generic compressed format {:?} has no fixed size", format);
        return 0;
    }
    if let Some(bits) = sized_legacy_bits_per_pixel(format) {
        return bits;
    }

    match data_type {
        T::Bitmap => component_count(format),
        T::Byte | T::UnsignedByte => 8 * component_count(format),
        T::HalfFloat | T::Short | T::UnsignedShort => 16 * component_count(format),
        T::Int | T::UnsignedInt | T::Float => 32 * component_count(format),
        T::UnsignedByte332 | T::UnsignedByte233Rev => 8,
        T::UnsignedShort565
        | T::UnsignedShort565Rev
        | T::UnsignedShort4444
        | T::UnsignedShort4444Rev
        | T::UnsignedShort5551
        | T::UnsignedShort1555Rev => 16,
        T::UnsignedInt8888 | T::UnsignedInt8888Rev | T::UnsignedInt1010102 | T::UnsignedInt2101010Rev => 32,
    }
}

/// [`bits_per_pixel`] for raw GL enumerants.
pub fn bits_per_pixel_of_code(format: u32, data_type: u32) -> Result<u32, ImageError> {
    match (PixelFormat::from_code(format), DataType::from_code(data_type)) {
        (Some(f), Some(t)) => Ok(bits_per_pixel(f, t)),
        (Some(f), None) => match compressed_bits_per_pixel(f).or_else(|| sized_legacy_bits_per_pixel(f)) {
            Some(bits) => Ok(bits),
            None => Err(ImageError::UnknownFormat { format, data_type }.warned()),
        },
        _ => Err(ImageError::UnknownFormat { format, data_type }.warned()),
    }
}

// ============================================================
// Classification
// ============================================================

/// Formats stored as compressed blocks, including the generic ones.
pub fn is_block_compressed(format: PixelFormat) -> bool {
    matches!(
        format,
        F::CompressedAlpha
            | F::CompressedLuminance
            | F::CompressedLuminanceAlpha
            | F::CompressedIntensity
            | F::CompressedRgb
            | F::CompressedRgba
            | F::CompressedRgbDxt1
            | F::CompressedRgbaDxt1
            | F::CompressedRgbaDxt3
            | F::CompressedRgbaDxt5
            | F::CompressedRgbPvrtc4Bpp
            | F::CompressedRgbPvrtc2Bpp
            | F::CompressedRgbaPvrtc4Bpp
            | F::CompressedRgbaPvrtc2Bpp
            | F::CompressedEtc1
            | F::CompressedRedRgtc1
            | F::CompressedSignedRedRgtc1
            | F::CompressedRedGreenRgtc2
            | F::CompressedSignedRedGreenRgtc2
    )
}

/// Data types that pack every component of a texel into one word.
pub fn is_packed_type(data_type: DataType) -> bool {
    !matches!(
        data_type,
        T::Bitmap
            | T::Byte
            | T::UnsignedByte
            | T::Short
            | T::UnsignedShort
            | T::Int
            | T::UnsignedInt
            | T::Float
            | T::HalfFloat
    )
}

/// The unsized format a sized internal format samples as.
pub fn base_pixel_format(format: PixelFormat) -> PixelFormat {
    match format {
        F::Rgba32UI | F::Rgba16UI | F::Rgba8UI | F::Rgba32I | F::Rgba16I | F::Rgba8I => F::RgbaInteger,
        F::Rgb32UI | F::Rgb16UI | F::Rgb8UI | F::Rgb32I | F::Rgb16I | F::Rgb8I => F::RgbInteger,
        F::Luminance32UI | F::Luminance16UI | F::Luminance8UI => F::LuminanceInteger,
        F::Luminance32I | F::Luminance16I | F::Luminance8I => F::LuminanceInteger,
        F::Intensity32UI | F::Intensity16UI | F::Intensity8UI | F::Intensity32I | F::Intensity16I | F::Intensity8I => {
            warn!("base_pixel_format: {:?} has no integer intensity base, using LuminanceInteger", format);
            F::LuminanceInteger
        }
        F::LuminanceAlpha32UI | F::LuminanceAlpha16UI | F::LuminanceAlpha8UI => F::LuminanceAlphaInteger,
        F::LuminanceAlpha32I | F::LuminanceAlpha16I | F::LuminanceAlpha8I => F::LuminanceAlphaInteger,
        F::Alpha32UI | F::Alpha16UI | F::Alpha8UI | F::Alpha32I | F::Alpha16I | F::Alpha8I => F::AlphaInteger,

        F::Rgba32F | F::Rgba16F | F::Rgba8 => F::Rgba,
        F::Rgb32F | F::Rgb16F => F::Rgb,
        F::Alpha32F | F::Alpha16F => F::Alpha,
        F::Intensity32F | F::Intensity16F => F::Intensity,
        F::Luminance32F | F::Luminance16F => F::Luminance,
        F::LuminanceAlpha32F | F::LuminanceAlpha16F => F::LuminanceAlpha,

        F::Luminance4 | F::Luminance8 | F::Luminance12 | F::Luminance16 => F::Luminance,
        F::Intensity4 | F::Intensity8 | F::Intensity12 | F::Intensity16 => F::Intensity,
        F::Luminance4Alpha4
        | F::Luminance6Alpha2
        | F::Luminance8Alpha8
        | F::Luminance12Alpha4
        | F::Luminance12Alpha12
        | F::Luminance16Alpha16 => F::LuminanceAlpha,

        other => other,
    }
}

/// Data type implied by a sized internal format.
pub fn default_data_type(format: PixelFormat) -> Option<DataType> {
    match format {
        F::Luminance32F | F::LuminanceAlpha32F | F::Rgb32F | F::Rgba32F => Some(T::Float),
        F::Luminance16F | F::LuminanceAlpha16F | F::Rgb16F | F::Rgba16F => Some(T::Float),

        F::Rgba32UI | F::Rgb32UI | F::Luminance32UI | F::LuminanceAlpha32UI => Some(T::UnsignedInt),
        F::Rgba16UI | F::Rgb16UI | F::Luminance16UI | F::LuminanceAlpha16UI => Some(T::UnsignedShort),
        F::Rgba8UI | F::Rgb8UI | F::Luminance8UI | F::LuminanceAlpha8UI => Some(T::UnsignedByte),

        F::Rgba32I | F::Rgb32I | F::Luminance32I | F::LuminanceAlpha32I => Some(T::Int),
        F::Rgba16I | F::Rgb16I | F::Luminance16I | F::LuminanceAlpha16I => Some(T::Short),
        F::Rgba8I | F::Rgb8I | F::Luminance8I | F::LuminanceAlpha8I => Some(T::Byte),

        F::Rgba | F::Rgb | F::Luminance | F::LuminanceAlpha => Some(T::UnsignedByte),

        other => {
            warn!("default_data_type: no implied data type for {:?}", other);
            None
        }
    }
}

// ============================================================
// Geometry
// ============================================================

/// Bytes per row, rounded up to the packing alignment.
///
/// A packing of 0 is treated as 1.
pub fn row_stride(width: u32, format: PixelFormat, data_type: DataType, packing: u32) -> usize {
    let packing = packing.max(1) as usize;
    let width_in_bits = width as usize * bits_per_pixel(format, data_type) as usize;
    let packing_in_bits = packing * 8;
    width_in_bits.div_ceil(packing_in_bits) * packing
}

/// Smallest storage a compressed mip level can occupy.
pub fn min_block_size(format: PixelFormat) -> Option<usize> {
    match format {
        F::CompressedRgbDxt1 | F::CompressedRgbaDxt1 => Some(8),
        F::CompressedRedRgtc1 | F::CompressedSignedRedRgtc1 => Some(8),
        F::CompressedEtc1 => Some(8),
        F::CompressedRgbaDxt3 | F::CompressedRgbaDxt5 => Some(16),
        F::CompressedRgbPvrtc2Bpp | F::CompressedRgbaPvrtc2Bpp => Some(16),
        F::CompressedRgbPvrtc4Bpp | F::CompressedRgbaPvrtc4Bpp => Some(16),
        F::CompressedRedGreenRgtc2 | F::CompressedSignedRedGreenRgtc2 => Some(16),
        _ => None,
    }
}

/// Bytes of one compressed slice, in whole blocks. PVRTC images are
/// padded to at least 8x8 (4 bpp) or 16x8 (2 bpp) texels.
fn compressed_plane_size(format: PixelFormat, width: u32, height: u32) -> Option<usize> {
    let (w, h) = (width as usize, height as usize);
    let blocks = w.div_ceil(4) * h.div_ceil(4);
    match format {
        F::CompressedRgbDxt1 | F::CompressedRgbaDxt1 | F::CompressedEtc1 => Some(blocks * 8),
        F::CompressedRedRgtc1 | F::CompressedSignedRedRgtc1 => Some(blocks * 8),
        F::CompressedRgbaDxt3 | F::CompressedRgbaDxt5 => Some(blocks * 16),
        F::CompressedRedGreenRgtc2 | F::CompressedSignedRedGreenRgtc2 => Some(blocks * 16),
        F::CompressedRgbPvrtc4Bpp | F::CompressedRgbaPvrtc4Bpp => Some(w.max(8) * h.max(8) / 2),
        F::CompressedRgbPvrtc2Bpp | F::CompressedRgbaPvrtc2Bpp => Some(w.max(16) * h.max(8) / 4),
        _ => None,
    }
}

/// Bytes of a `width x height x depth` image (one mip level).
///
/// Block compressed formats are counted in whole blocks, never less than
/// [`min_block_size`], and packing does not apply to them. Everything else
/// is `row_stride * height * depth`.
pub fn image_size_in_bytes(
    width: u32,
    height: u32,
    depth: u32,
    format: PixelFormat,
    data_type: DataType,
    packing: u32,
) -> usize {
    if width == 0 || height == 0 || depth == 0 {
        return 0;
    }
    let slices = depth as usize;
    match compressed_plane_size(format, width, height) {
        Some(plane) => plane.max(min_block_size(format).unwrap_or(0)) * slices,
        None => row_stride(width, format, data_type, packing) * height as usize * slices,
    }
}

/// Length of a full mipmap chain, level 0 included.
///
/// `1 + floor(log2(max(w, h, d)))`; an all-zero size still counts one level.
pub fn mipmap_level_count(width: u32, height: u32, depth: u32) -> u32 {
    let largest = width.max(height).max(depth);
    if largest == 0 {
        return 1;
    }
    u32::BITS - largest.leading_zeros()
}
