// resample.rs -- scaling, power-of-two fitting, sub-image composition

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};
use log::debug;

use crate::buffer::PixelBuffer;
use crate::catalog::component_count;
use crate::error::ImageError;
use crate::format::{DataType, PixelFormat};

/// Reconstruction filter used when scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResampleFilter {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "nearest" => Some(Self::Nearest),
            "triangle" | "linear" => Some(Self::Triangle),
            "catmullrom" | "cubic" => Some(Self::CatmullRom),
            "gaussian" => Some(Self::Gaussian),
            "lanczos3" | "lanczos" => Some(Self::Lanczos3),
            _ => None,
        }
    }

    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

// ============================================================
// Power of two
// ============================================================

/// Round `n` to a power of two in log space: `2^floor(log2(n) + bias)`.
/// Powers of two (and 0) are returned unchanged; a bias of 0.5 rounds to
/// the nearest one.
pub fn nearest_power_of_two(n: u32, bias: f32) -> u32 {
    if n & n.wrapping_sub(1) == 0 {
        return n;
    }
    let exponent = ((n as f32).log2() + bias).floor().clamp(0.0, 31.0) as u32;
    1 << exponent
}

// ============================================================
// Scaling
// ============================================================

fn resize_plane<P>(
    raw: Vec<P::Subpixel>,
    width: u32,
    height: u32,
    new_width: u32,
    new_height: u32,
    filter: ResampleFilter,
) -> Option<Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let img = ImageBuffer::<P, Vec<P::Subpixel>>::from_raw(width, height, raw)?;
    Some(imageops::resize(&img, new_width, new_height, filter.filter_type()).into_raw())
}

#[allow(clippy::too_many_arguments)]
fn resize_bytes(
    channels: usize,
    data_type: DataType,
    tight: Vec<u8>,
    width: u32,
    height: u32,
    new_width: u32,
    new_height: u32,
    filter: ResampleFilter,
) -> Option<Vec<u8>> {
    macro_rules! by_channels {
        ($sub:ty, $raw:expr) => {
            match channels {
                1 => resize_plane::<Luma<$sub>>($raw, width, height, new_width, new_height, filter),
                2 => resize_plane::<LumaA<$sub>>($raw, width, height, new_width, new_height, filter),
                3 => resize_plane::<Rgb<$sub>>($raw, width, height, new_width, new_height, filter),
                _ => resize_plane::<Rgba<$sub>>($raw, width, height, new_width, new_height, filter),
            }
        };
    }

    match data_type {
        DataType::UnsignedByte => by_channels!(u8, tight),
        DataType::UnsignedShort => {
            let raw: Vec<u16> = tight.chunks_exact(2).map(bytemuck::pod_read_unaligned).collect();
            by_channels!(u16, raw).map(|out| bytemuck::cast_slice(out.as_slice()).to_vec())
        }
        DataType::Float => {
            let raw: Vec<f32> = tight.chunks_exact(4).map(bytemuck::pod_read_unaligned).collect();
            by_channels!(f32, raw).map(|out| bytemuck::cast_slice(out.as_slice()).to_vec())
        }
        _ => None,
    }
}

fn is_scalable_type(data_type: DataType) -> bool {
    matches!(data_type, DataType::UnsignedByte | DataType::UnsignedShort | DataType::Float)
}

/// Re-encode tightly packed components, normalizing through [0, 1].
fn convert_components(tight: &[u8], from: DataType, to: DataType) -> Vec<u8> {
    let values: Vec<f32> = match from {
        DataType::UnsignedByte => tight.iter().map(|&v| v as f32 / 255.0).collect(),
        DataType::UnsignedShort => tight
            .chunks_exact(2)
            .map(|c| bytemuck::pod_read_unaligned::<u16>(c) as f32 / 65535.0)
            .collect(),
        _ => tight.chunks_exact(4).map(bytemuck::pod_read_unaligned::<f32>).collect(),
    };
    match to {
        DataType::UnsignedByte => values.iter().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8).collect(),
        DataType::UnsignedShort => {
            let words: Vec<u16> = values.iter().map(|v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16).collect();
            bytemuck::cast_slice(words.as_slice()).to_vec()
        }
        _ => bytemuck::cast_slice(values.as_slice()).to_vec(),
    }
}

/// A resized copy of a 2D image.
///
/// Supports one to four components of unsigned byte, unsigned short or
/// float data. Volumes and other encodings are refused.
pub fn resample(src: &PixelBuffer, new_width: u32, new_height: u32, filter: ResampleFilter) -> Result<PixelBuffer, ImageError> {
    let data_type = src.data_type().ok_or_else(|| ImageError::NoData("scale_image").warned())?;
    resample_to_type(src, new_width, new_height, data_type, filter)
}

/// [`resample`], storing the result as `new_data_type`.
pub fn resample_to_type(
    src: &PixelBuffer,
    new_width: u32,
    new_height: u32,
    new_data_type: DataType,
    filter: ResampleFilter,
) -> Result<PixelBuffer, ImageError> {
    const OP: &str = "scale_image";
    let (Some(format), Some(data_type)) = (src.pixel_format(), src.data_type()) else {
        return Err(ImageError::NoData(OP).warned());
    };
    if !src.has_data() {
        return Err(ImageError::NoData(OP).warned());
    }
    if src.depth() > 1 {
        return Err(ImageError::unsupported(OP, "scaling of volumes").warned());
    }
    if new_width == 0 || new_height == 0 {
        return Err(ImageError::precondition(OP, format!("target size {}x{}", new_width, new_height)).warned());
    }
    let channels = component_count(format) as usize;
    let supported_format = !src.is_compressed() && (1..=4).contains(&channels) && !matches!(format, PixelFormat::ColorIndex | PixelFormat::StencilIndex);
    if !supported_format || !is_scalable_type(data_type) || !is_scalable_type(new_data_type) {
        return Err(ImageError::unsupported(OP, format!("scaling {:?}/{:?} to {:?}", format, data_type, new_data_type)).warned());
    }

    let texel_bytes = src.pixel_size_in_bits() as usize / 8;
    let tight_row = src.width() as usize * texel_bytes;
    let mut tight = Vec::with_capacity(tight_row * src.height() as usize);
    for y in 0..src.height() {
        tight.extend_from_slice(&src.row(y, 0)[..tight_row]);
    }

    let Some(mut scaled) = resize_bytes(channels, data_type, tight, src.width(), src.height(), new_width, new_height, filter) else {
        return Err(ImageError::unsupported(OP, format!("scaling {:?}/{:?}", format, data_type)).warned());
    };
    if new_data_type != data_type {
        scaled = convert_components(&scaled, data_type, new_data_type);
    }

    let mut dst = src.empty_like();
    if let Some(internal) = src.internal_format() {
        dst.set_internal_format(internal);
    }
    dst.allocate(new_width, new_height, 1, format, new_data_type, src.packing())?;
    let out_row = new_width as usize * dst.pixel_size_in_bits() as usize / 8;
    for (y, row) in scaled.chunks_exact(out_row).enumerate() {
        dst.row_mut(y as u32, 0)[..out_row].copy_from_slice(row);
    }

    debug!(
        "{}: {}x{} {:?} -> {}x{} {:?} ({:?})",
        OP,
        src.width(),
        src.height(),
        data_type,
        new_width,
        new_height,
        new_data_type,
        filter
    );
    Ok(dst)
}

impl PixelBuffer {
    /// Resize in place with the default filter. The buffer is untouched on failure.
    pub fn scale_image(&mut self, new_width: u32, new_height: u32) -> Result<(), ImageError> {
        self.scale_image_with_filter(new_width, new_height, ResampleFilter::default())
    }

    pub fn scale_image_with_filter(&mut self, new_width: u32, new_height: u32, filter: ResampleFilter) -> Result<(), ImageError> {
        if new_width == self.width() && new_height == self.height() {
            return Ok(());
        }
        let scaled = resample(self, new_width, new_height, filter)?;
        let (id, modified) = (self.id(), self.modified_count());
        *self = scaled;
        self.adopt_identity(id, modified);
        self.dirty();
        Ok(())
    }

    /// Resize in place and store the result as `new_data_type`.
    pub fn scale_image_to_type(&mut self, new_width: u32, new_height: u32, new_data_type: DataType) -> Result<(), ImageError> {
        if new_width == self.width() && new_height == self.height() && self.data_type() == Some(new_data_type) {
            return Ok(());
        }
        let scaled = resample_to_type(self, new_width, new_height, new_data_type, ResampleFilter::default())?;
        let (id, modified) = (self.id(), self.modified_count());
        *self = scaled;
        self.adopt_identity(id, modified);
        self.dirty();
        Ok(())
    }

    /// Round each dimension to the nearest power of two, capped at
    /// `max_size`, and rescale if that changes anything.
    pub fn ensure_valid_size_for_texturing(&mut self, max_size: u32) -> Result<(), ImageError> {
        let fit = |n: u32| nearest_power_of_two(n, 0.5).min(max_size.max(1));
        let (new_width, new_height) = (fit(self.width()), fit(self.height()));
        if (new_width, new_height) == (self.width(), self.height()) {
            return Ok(());
        }
        self.scale_image(new_width, new_height)
    }

    // ============================================================
    // Sub-image copy
    // ============================================================

    /// Copy all of `source` into this image with its origin at (x, y, z).
    ///
    /// An unallocated destination is first sized to hold the region; the
    /// texels outside the copied region are then unspecified.
    pub fn copy_sub_image(&mut self, x: i32, y: i32, z: i32, source: &PixelBuffer) -> Result<(), ImageError> {
        const OP: &str = "copy_sub_image";
        let Some(src_desc) = source.descriptor().filter(|_| source.has_data()) else {
            return Err(ImageError::NoData(OP).warned());
        };
        if x < 0 || y < 0 || z < 0 {
            return Err(ImageError::precondition(OP, format!("negative offset ({}, {}, {})", x, y, z)).warned());
        }
        let (x, y, z) = (x as u32, y as u32, z as u32);
        let bits = src_desc.bits_per_pixel() as usize;
        if source.is_compressed() || bits % 8 != 0 {
            return Err(ImageError::unsupported(OP, format!("copying {:?}/{:?}", src_desc.format, src_desc.data_type)).warned());
        }
        let (Some(end_x), Some(end_y), Some(end_z)) = (
            x.checked_add(source.width()),
            y.checked_add(source.height()),
            z.checked_add(source.depth()),
        ) else {
            return Err(ImageError::precondition(OP, format!("offset ({}, {}, {}) overflows", x, y, z)).warned());
        };

        if self.has_data() {
            let Some(dst_desc) = self.descriptor() else {
                return Err(ImageError::NoData(OP).warned());
            };
            if dst_desc.format != src_desc.format || dst_desc.data_type != src_desc.data_type {
                return Err(ImageError::precondition(
                    OP,
                    format!(
                        "source {:?}/{:?} does not match destination {:?}/{:?}",
                        src_desc.format, src_desc.data_type, dst_desc.format, dst_desc.data_type
                    ),
                )
                .warned());
            }
            if end_x > self.width() || end_y > self.height() || end_z > self.depth() {
                return Err(ImageError::precondition(
                    OP,
                    format!(
                        "{}x{}x{} at ({}, {}, {}) does not fit in {}x{}x{}",
                        source.width(),
                        source.height(),
                        source.depth(),
                        x,
                        y,
                        z,
                        self.width(),
                        self.height(),
                        self.depth()
                    ),
                )
                .warned());
            }
        } else {
            self.allocate(end_x, end_y, end_z, src_desc.format, src_desc.data_type, src_desc.packing)?;
        }

        let copy_bytes = source.width() as usize * bits / 8;
        let (stride, plane) = (self.row_stride(), self.plane_size());
        let start = z as usize * plane + y as usize * stride + x as usize * bits / 8;
        let data = self.data_mut();
        for r in 0..source.depth() as usize {
            for t in 0..source.height() as usize {
                let src_row = &source.row(t as u32, r as u32)[..copy_bytes];
                let dst = start + r * plane + t * stride;
                data[dst..dst + copy_bytes].copy_from_slice(src_row);
            }
        }
        Ok(())
    }
}
