// convert.rs -- pixel format conversions

//! Conversions between 8-bit-per-component images and packed 8/16-bit
//! encodings, plus channel reordering and alpha drop/add.
//!
//! Reductions dither with a forward error-diffusion kernel: 3/8 of the
//! quantization error goes right, 3/8 down and 1/4 down-right. The right
//! share is held in a single value that each texel overwrites.
//!
//! Packed fields follow the component order of the pixel format: the first
//! component sits in the most significant field, or in the least
//! significant one for the `*Rev` encodings. Every conversion returns a
//! fresh buffer and leaves the source untouched.

use rayon::prelude::*;

use crate::buffer::PixelBuffer;
use crate::catalog::{component_count, is_packed_type};
use crate::error::ImageError;
use crate::format::{DataType, PixelFormat};

// ============================================================
// Packed layouts
// ============================================================

#[derive(Debug, Clone, Copy)]
struct PackedLayout {
    /// Field widths in component order.
    widths: [u32; 4],
    count: usize,
    word_bits: u32,
    reversed: bool,
}

fn packed_layout(data_type: DataType) -> Option<PackedLayout> {
    let (widths, count, word_bits, reversed) = match data_type {
        DataType::UnsignedByte332 => ([3, 3, 2, 0], 3, 8, false),
        DataType::UnsignedByte233Rev => ([3, 3, 2, 0], 3, 8, true),
        DataType::UnsignedShort565 => ([5, 6, 5, 0], 3, 16, false),
        DataType::UnsignedShort565Rev => ([5, 6, 5, 0], 3, 16, true),
        DataType::UnsignedShort4444 => ([4, 4, 4, 4], 4, 16, false),
        DataType::UnsignedShort4444Rev => ([4, 4, 4, 4], 4, 16, true),
        DataType::UnsignedShort5551 => ([5, 5, 5, 1], 4, 16, false),
        DataType::UnsignedShort1555Rev => ([5, 5, 5, 1], 4, 16, true),
        DataType::UnsignedInt8888 => ([8, 8, 8, 8], 4, 32, false),
        DataType::UnsignedInt8888Rev => ([8, 8, 8, 8], 4, 32, true),
        DataType::UnsignedInt1010102 => ([10, 10, 10, 2], 4, 32, false),
        DataType::UnsignedInt2101010Rev => ([10, 10, 10, 2], 4, 32, true),
        _ => return None,
    };
    Some(PackedLayout {
        widths,
        count,
        word_bits,
        reversed,
    })
}

impl PackedLayout {
    fn shift(&self, c: usize) -> u32 {
        if self.reversed {
            self.widths[..c].iter().sum()
        } else {
            self.word_bits - self.widths[..=c].iter().sum::<u32>()
        }
    }

    fn max(&self, c: usize) -> u32 {
        (1u32 << self.widths[c]) - 1
    }

    fn word_bytes(&self) -> usize {
        (self.word_bits / 8) as usize
    }

    fn unpack(&self, word: u32) -> [u32; 4] {
        let mut fields = [0u32; 4];
        for (c, field) in fields.iter_mut().enumerate().take(self.count) {
            *field = (word >> self.shift(c)) & self.max(c);
        }
        fields
    }

    fn pack(&self, fields: &[u32; 4]) -> u32 {
        (0..self.count).fold(0u32, |word, c| word | ((fields[c] & self.max(c)) << self.shift(c)))
    }
}

fn read_word(row: &[u8], x: usize, bytes: usize) -> u32 {
    let at = x * bytes;
    match bytes {
        1 => row[at] as u32,
        2 => u16::from_ne_bytes([row[at], row[at + 1]]) as u32,
        _ => u32::from_ne_bytes([row[at], row[at + 1], row[at + 2], row[at + 3]]),
    }
}

fn write_word(row: &mut [u8], x: usize, bytes: usize, word: u32) {
    let at = x * bytes;
    match bytes {
        1 => row[at] = word as u8,
        2 => row[at..at + 2].copy_from_slice(&(word as u16).to_ne_bytes()),
        _ => row[at..at + 4].copy_from_slice(&word.to_ne_bytes()),
    }
}

/// Canonical RGBA slot of each stored component.
fn channel_order(format: PixelFormat) -> Option<&'static [usize]> {
    match format {
        PixelFormat::Rgb => Some(&[0, 1, 2]),
        PixelFormat::Bgr => Some(&[2, 1, 0]),
        PixelFormat::Rgba => Some(&[0, 1, 2, 3]),
        PixelFormat::Bgra => Some(&[2, 1, 0, 3]),
        _ => None,
    }
}

fn swapped_format(format: PixelFormat) -> Option<PixelFormat> {
    match format {
        PixelFormat::Rgb => Some(PixelFormat::Bgr),
        PixelFormat::Bgr => Some(PixelFormat::Rgb),
        PixelFormat::Rgba => Some(PixelFormat::Bgra),
        PixelFormat::Bgra => Some(PixelFormat::Rgba),
        _ => None,
    }
}

/// Apply `f` to every (source row, destination row) pair in parallel.
fn map_rows<F>(src: &PixelBuffer, dst: &mut PixelBuffer, f: F)
where
    F: Fn(&[u8], &mut [u8]) + Send + Sync,
{
    let rows = src.height() as usize * src.depth() as usize;
    let (src_stride, dst_stride) = (src.row_stride(), dst.row_stride());
    if rows == 0 || src_stride == 0 || dst_stride == 0 {
        return;
    }
    dst.data_mut()[..dst_stride * rows]
        .par_chunks_mut(dst_stride)
        .zip(src.data()[..src_stride * rows].par_chunks(src_stride))
        .for_each(|(d, s)| f(s, d));
}

fn check_source(
    src: &PixelBuffer,
    operation: &'static str,
    formats: &[PixelFormat],
    data_types: &[DataType],
) -> Result<(PixelFormat, DataType), ImageError> {
    let (Some(format), Some(data_type)) = (src.pixel_format(), src.data_type()) else {
        return Err(ImageError::NoData(operation).warned());
    };
    if !src.has_data() {
        return Err(ImageError::NoData(operation).warned());
    }
    if !formats.contains(&format) || !data_types.contains(&data_type) {
        return Err(ImageError::precondition(
            operation,
            format!("source is {:?}/{:?}, expected one of {:?} with {:?}", format, data_type, formats, data_types),
        )
        .warned());
    }
    Ok((format, data_type))
}

fn allocate_like(
    src: &PixelBuffer,
    format: PixelFormat,
    data_type: DataType,
) -> Result<PixelBuffer, ImageError> {
    let mut dst = src.empty_like();
    dst.allocate(src.width(), src.height(), src.depth(), format, data_type, src.packing())?;
    Ok(dst)
}

// ============================================================
// Dithered reductions
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlphaRule {
    Diffuse,
    /// One-bit alpha: set when the undiffused source alpha exceeds half.
    Threshold,
}

fn dither_reduce(
    src: &PixelBuffer,
    operation: &'static str,
    formats: &[PixelFormat],
    target: DataType,
    alpha: AlphaRule,
) -> Result<PixelBuffer, ImageError> {
    let (format, _) = check_source(src, operation, formats, &[DataType::UnsignedByte])?;
    let Some(layout) = packed_layout(target) else {
        return Err(ImageError::unsupported(operation, format!("reduction to {:?}", target)).warned());
    };
    let mut dst = allocate_like(src, format, target)?;

    let n = layout.count;
    let (width, height, depth) = (src.width() as usize, src.height(), src.depth());
    let word = layout.word_bytes();
    let mut bias_row = vec![[0f32; 4]; width];
    let mut bias_next = vec![[0f32; 4]; width];

    for z in 0..depth {
        for y in 0..height {
            let has_row_below = y + 1 < height;
            let mut bias_col = [0f32; 4];
            let src_row = src.row(y, z);
            let dst_row = dst.row_mut(y, z);

            for x in 0..width {
                let texel = &src_row[x * n..x * n + n];
                let mut fields = [0u32; 4];
                let mut error = [0f32; 4];

                for c in 0..n {
                    let raw = texel[c] as f32;
                    if c == 3 && alpha == AlphaRule::Threshold {
                        fields[c] = (raw > 127.5) as u32;
                        continue;
                    }
                    let max = layout.max(c);
                    let max_f = max as f32;
                    let v = raw - (bias_row[x][c] + bias_col[c]);
                    let q = ((v * max_f / 255.0 + 0.5) as u32).min(max);
                    fields[c] = q;
                    error[c] = q as f32 * 255.0 / max_f - v;
                }

                write_word(dst_row, x, word, layout.pack(&fields));

                let has_col_right = x + 1 < width;
                for c in 0..n {
                    if has_col_right {
                        bias_col[c] = error[c] * 0.375;
                    }
                    if has_row_below {
                        bias_next[x][c] += error[c] * 0.375;
                        if has_col_right {
                            bias_next[x + 1][c] += error[c] * 0.25;
                        }
                    }
                }
            }

            std::mem::swap(&mut bias_row, &mut bias_next);
            bias_next.fill([0.0; 4]);
        }
    }

    Ok(dst)
}

/// 24-bit RGB/BGR to 3-3-2, dithered.
pub fn convert_rgb888_to_rgb332(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    dither_reduce(
        src,
        "convert_rgb888_to_rgb332",
        &[PixelFormat::Rgb, PixelFormat::Bgr],
        DataType::UnsignedByte332,
        AlphaRule::Diffuse,
    )
}

/// 24-bit RGB/BGR to 5-6-5, dithered.
pub fn convert_rgb888_to_rgb565(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    dither_reduce(
        src,
        "convert_rgb888_to_rgb565",
        &[PixelFormat::Rgb, PixelFormat::Bgr],
        DataType::UnsignedShort565,
        AlphaRule::Diffuse,
    )
}

/// 32-bit RGBA/BGRA to 5-5-5-1. Color is dithered, alpha thresholded.
pub fn convert_rgba8888_to_rgba5551(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    dither_reduce(
        src,
        "convert_rgba8888_to_rgba5551",
        &[PixelFormat::Rgba, PixelFormat::Bgra],
        DataType::UnsignedShort5551,
        AlphaRule::Threshold,
    )
}

/// 32-bit RGBA/BGRA to 4-4-4-4, all four components dithered.
pub fn convert_rgba8888_to_rgba4444(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    dither_reduce(
        src,
        "convert_rgba8888_to_rgba4444",
        &[PixelFormat::Rgba, PixelFormat::Bgra],
        DataType::UnsignedShort4444,
        AlphaRule::Diffuse,
    )
}

// ============================================================
// Expansions
// ============================================================

fn expand(
    src: &PixelBuffer,
    operation: &'static str,
    formats: &[PixelFormat],
    data_types: &[DataType],
    out_format: PixelFormat,
) -> Result<PixelBuffer, ImageError> {
    let (format, data_type) = check_source(src, operation, formats, data_types)?;
    let (Some(layout), Some(order)) = (packed_layout(data_type), channel_order(format)) else {
        return Err(ImageError::unsupported(operation, format!("expansion of {:?}/{:?}", format, data_type)).warned());
    };
    let mut dst = allocate_like(src, out_format, DataType::UnsignedByte)?;

    let width = src.width() as usize;
    let n = layout.count;
    let word = layout.word_bytes();
    map_rows(src, &mut dst, |s, d| {
        for x in 0..width {
            let fields = layout.unpack(read_word(s, x, word));
            for c in 0..n {
                let expanded = (fields[c] as f32 * 255.0 / layout.max(c) as f32) as u32;
                d[x * n + order[c]] = expanded.min(255) as u8;
            }
        }
    });
    Ok(dst)
}

/// 3-3-2, 2-3-3 rev, 5-6-5 and 5-6-5 rev to 24-bit RGB.
pub fn expand_to_rgb888(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    expand(
        src,
        "expand_to_rgb888",
        &[PixelFormat::Rgb, PixelFormat::Bgr],
        &[
            DataType::UnsignedByte332,
            DataType::UnsignedByte233Rev,
            DataType::UnsignedShort565,
            DataType::UnsignedShort565Rev,
        ],
        PixelFormat::Rgb,
    )
}

/// 5-5-5-1, 1-5-5-5 rev, 4-4-4-4 and 4-4-4-4 rev to 32-bit RGBA.
pub fn expand_to_rgba8888(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    expand(
        src,
        "expand_to_rgba8888",
        &[PixelFormat::Rgba, PixelFormat::Bgra],
        &[
            DataType::UnsignedShort5551,
            DataType::UnsignedShort1555Rev,
            DataType::UnsignedShort4444,
            DataType::UnsignedShort4444Rev,
        ],
        PixelFormat::Rgba,
    )
}

// ============================================================
// Channel order and alpha
// ============================================================

/// Swap the first and third components: RGB <-> BGR, RGBA <-> BGRA.
pub fn swap_red_blue(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    const OP: &str = "swap_red_blue";
    let (Some(format), Some(data_type)) = (src.pixel_format(), src.data_type()) else {
        return Err(ImageError::NoData(OP).warned());
    };
    if !src.has_data() {
        return Err(ImageError::NoData(OP).warned());
    }
    let Some(target) = swapped_format(format) else {
        return Err(ImageError::precondition(OP, format!("{:?} has no red/blue order", format)).warned());
    };
    let width = src.width() as usize;

    if is_packed_type(data_type) {
        let layout = packed_layout(data_type).filter(|l| l.widths[0] == l.widths[2] && l.count == component_count(format) as usize);
        let Some(layout) = layout else {
            return Err(ImageError::precondition(
                OP,
                format!("{:?} with {:?} has unequal red and blue fields", format, data_type),
            )
            .warned());
        };
        let mut dst = allocate_like(src, target, data_type)?;
        let word = layout.word_bytes();
        map_rows(src, &mut dst, |s, d| {
            for x in 0..width {
                let mut fields = layout.unpack(read_word(s, x, word));
                fields.swap(0, 2);
                write_word(d, x, word, layout.pack(&fields));
            }
        });
        return Ok(dst);
    }

    let n = component_count(format) as usize;
    let bits = src.pixel_size_in_bits() as usize;
    if bits == 0 || bits % (8 * n) != 0 {
        return Err(ImageError::unsupported(OP, format!("reordering {:?}", data_type)).warned());
    }
    let size = bits / 8 / n;
    let mut dst = allocate_like(src, target, data_type)?;
    map_rows(src, &mut dst, |s, d| {
        let texel = n * size;
        d[..width * texel].copy_from_slice(&s[..width * texel]);
        for t in d[..width * texel].chunks_exact_mut(texel) {
            let (first, rest) = t.split_at_mut(size);
            first.swap_with_slice(&mut rest[size..2 * size]);
        }
    });
    Ok(dst)
}

/// 32-bit RGBA/BGRA to 24-bit RGB.
pub fn drop_alpha(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    let (format, _) = check_source(
        src,
        "drop_alpha",
        &[PixelFormat::Rgba, PixelFormat::Bgra],
        &[DataType::UnsignedByte],
    )?;
    let Some(order) = channel_order(format) else {
        return Err(ImageError::precondition("drop_alpha", format!("{:?} has no channel order", format)).warned());
    };
    let mut dst = allocate_like(src, PixelFormat::Rgb, DataType::UnsignedByte)?;
    let width = src.width() as usize;
    map_rows(src, &mut dst, |s, d| {
        for x in 0..width {
            for c in 0..3 {
                d[x * 3 + order[c]] = s[x * 4 + c];
            }
        }
    });
    Ok(dst)
}

/// 24-bit RGB/BGR to 32-bit RGBA with opaque alpha.
pub fn add_alpha(src: &PixelBuffer) -> Result<PixelBuffer, ImageError> {
    let (format, _) = check_source(
        src,
        "add_alpha",
        &[PixelFormat::Rgb, PixelFormat::Bgr],
        &[DataType::UnsignedByte],
    )?;
    let Some(order) = channel_order(format) else {
        return Err(ImageError::precondition("add_alpha", format!("{:?} has no channel order", format)).warned());
    };
    let mut dst = allocate_like(src, PixelFormat::Rgba, DataType::UnsignedByte)?;
    let width = src.width() as usize;
    map_rows(src, &mut dst, |s, d| {
        for x in 0..width {
            for c in 0..3 {
                d[x * 4 + order[c]] = s[x * 3 + c];
            }
            d[x * 4 + 3] = 255;
        }
    });
    Ok(dst)
}

// ============================================================
// Dispatch
// ============================================================

/// Convert to `format`/`data_type` with whichever routine applies.
pub fn convert(src: &PixelBuffer, format: PixelFormat, data_type: DataType) -> Result<PixelBuffer, ImageError> {
    use DataType as T;
    use PixelFormat as F;

    let Some(desc) = src.descriptor().filter(|_| src.has_data()) else {
        return Err(ImageError::NoData("convert").warned());
    };
    if desc.format == format && desc.data_type == data_type {
        return Ok(src.clone());
    }
    let packed_components = packed_layout(desc.data_type).map(|l| l.count);

    match (desc.format, desc.data_type, format, data_type) {
        (F::Rgb | F::Bgr, T::UnsignedByte, f, T::UnsignedByte332) if f == desc.format => convert_rgb888_to_rgb332(src),
        (F::Rgb | F::Bgr, T::UnsignedByte, f, T::UnsignedShort565) if f == desc.format => convert_rgb888_to_rgb565(src),
        (F::Rgba | F::Bgra, T::UnsignedByte, f, T::UnsignedShort5551) if f == desc.format => {
            convert_rgba8888_to_rgba5551(src)
        }
        (F::Rgba | F::Bgra, T::UnsignedByte, f, T::UnsignedShort4444) if f == desc.format => {
            convert_rgba8888_to_rgba4444(src)
        }
        (_, _, F::Rgb, T::UnsignedByte) if packed_components == Some(3) => expand_to_rgb888(src),
        (_, _, F::Rgba, T::UnsignedByte) if packed_components == Some(4) => expand_to_rgba8888(src),
        (F::Rgba | F::Bgra, T::UnsignedByte, F::Rgb, T::UnsignedByte) => drop_alpha(src),
        (F::Rgb | F::Bgr, T::UnsignedByte, F::Rgba, T::UnsignedByte) => add_alpha(src),
        (from, t, to, t2) if t == t2 && swapped_format(from) == Some(to) => swap_red_blue(src),
        _ => Err(ImageError::unsupported(
            "convert",
            format!("{:?}/{:?} to {:?}/{:?}", desc.format, desc.data_type, format, data_type),
        )
        .warned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, format: PixelFormat, data_type: DataType, texel: &[u8]) -> PixelBuffer {
        let mut img = PixelBuffer::new();
        img.allocate(width, height, 1, format, data_type, 1).unwrap();
        for t in img.data_mut().chunks_exact_mut(texel.len()) {
            t.copy_from_slice(texel);
        }
        img
    }

    fn words16(img: &PixelBuffer) -> Vec<u16> {
        img.data()
            .chunks_exact(2)
            .map(|c| u16::from_ne_bytes([c[0], c[1]]))
            .collect()
    }

    // ============================================================
    // Reductions
    // ============================================================

    #[test]
    fn test_white_rgb_to_565() {
        let src = filled(4, 4, PixelFormat::Rgb, DataType::UnsignedByte, &[255, 255, 255]);
        let dst = convert_rgb888_to_rgb565(&src).unwrap();
        assert_eq!(dst.data_type(), Some(DataType::UnsignedShort565));
        assert_eq!(dst.pixel_format(), Some(PixelFormat::Rgb));
        let words = words16(&dst);
        assert_eq!(words.len(), 16);
        for w in words {
            assert_eq!(w, 0xFFFF);
            assert_eq!((w >> 11, (w >> 5) & 0x3F, w & 0x1F), (31, 63, 31));
        }
    }

    #[test]
    fn test_332_dither_kernel() {
        // blue 128 on a 2x2: 2 then 1 on the first row, 1 then 2 below
        let src = filled(2, 2, PixelFormat::Rgb, DataType::UnsignedByte, &[0, 0, 128]);
        let dst = convert_rgb888_to_rgb332(&src).unwrap();
        assert_eq!(dst.row_stride(), 2);
        assert_eq!(dst.data(), &[2, 1, 1, 2]);
    }

    #[test]
    fn test_reduction_preconditions() {
        let rgba = filled(2, 2, PixelFormat::Rgba, DataType::UnsignedByte, &[1, 2, 3, 4]);
        assert!(matches!(
            convert_rgb888_to_rgb565(&rgba),
            Err(ImageError::PreconditionMismatch { .. })
        ));
        let rgb = filled(2, 2, PixelFormat::Rgb, DataType::UnsignedByte, &[1, 2, 3]);
        assert!(convert_rgba8888_to_rgba4444(&rgb).is_err());
        assert!(matches!(
            convert_rgb888_to_rgb332(&PixelBuffer::new()),
            Err(ImageError::NoData(_))
        ));
    }

    #[test]
    fn test_5551_alpha_threshold() {
        let mut src = PixelBuffer::new();
        src.allocate(2, 1, 1, PixelFormat::Rgba, DataType::UnsignedByte, 1).unwrap();
        src.data_mut().copy_from_slice(&[255, 255, 255, 128, 255, 255, 255, 127]);
        let dst = convert_rgba8888_to_rgba5551(&src).unwrap();
        let words = words16(&dst);
        assert_eq!(words[0], 0xFFFF);
        assert_eq!(words[1], 0xFFFE);
    }

    #[test]
    fn test_4444_round_trip_error() {
        let (w, h) = (16u32, 16u32);
        let mut src = PixelBuffer::new();
        src.allocate(w, h, 1, PixelFormat::Rgba, DataType::UnsignedByte, 4).unwrap();
        for y in 0..h {
            for x in 0..w {
                let texel = [(x * 17) as u8, (y * 17) as u8, ((x + y) * 8) as u8, (255 - x * 16) as u8];
                src.data_at_mut(x, y, 0)[..4].copy_from_slice(&texel);
            }
        }
        let reduced = convert_rgba8888_to_rgba4444(&src).unwrap();
        let back = expand_to_rgba8888(&reduced).unwrap();
        assert_eq!(back.pixel_format(), Some(PixelFormat::Rgba));
        for y in 0..h {
            for x in 0..w {
                let a = &src.data_at(x, y, 0)[..4];
                let b = &back.data_at(x, y, 0)[..4];
                for c in 0..4 {
                    assert!((a[c] as i32 - b[c] as i32).abs() <= 17, "texel {},{} c{}: {} vs {}", x, y, c, a[c], b[c]);
                }
            }
        }
    }

    #[test]
    fn test_bgr_reduction_keeps_component_order() {
        let src = filled(1, 1, PixelFormat::Bgr, DataType::UnsignedByte, &[255, 0, 0]);
        let dst = convert_rgb888_to_rgb565(&src).unwrap();
        assert_eq!(dst.pixel_format(), Some(PixelFormat::Bgr));
        assert_eq!(words16(&dst), vec![0xF800]);
        let back = expand_to_rgb888(&dst).unwrap();
        assert_eq!(back.data(), &[0, 0, 255]);
    }

    // ============================================================
    // Expansions
    // ============================================================

    #[test]
    fn test_expand_565_and_rev() {
        let src = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedShort565, &0xF800u16.to_ne_bytes());
        assert_eq!(expand_to_rgb888(&src).unwrap().data(), &[255, 0, 0]);
        let rev = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedShort565Rev, &0x001Fu16.to_ne_bytes());
        assert_eq!(expand_to_rgb888(&rev).unwrap().data(), &[255, 0, 0]);
        let mid = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedShort565, &(16u16 << 5).to_ne_bytes());
        assert_eq!(expand_to_rgb888(&mid).unwrap().data(), &[0, 64, 0]);
    }

    #[test]
    fn test_expand_332_and_233_rev() {
        let src = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedByte332, &[0b111_000_01]);
        assert_eq!(expand_to_rgb888(&src).unwrap().data(), &[255, 0, 85]);
        let rev = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedByte233Rev, &[0b10_000_111]);
        assert_eq!(expand_to_rgb888(&rev).unwrap().data(), &[255, 0, 170]);
    }

    #[test]
    fn test_expand_1555_rev() {
        let src = filled(1, 1, PixelFormat::Rgba, DataType::UnsignedShort1555Rev, &0x801Fu16.to_ne_bytes());
        assert_eq!(expand_to_rgba8888(&src).unwrap().data(), &[255, 0, 0, 255]);
    }

    #[test]
    fn test_expand_rejects_wrong_type() {
        let src = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedByte, &[1, 2, 3]);
        assert!(expand_to_rgb888(&src).is_err());
        let src = filled(1, 1, PixelFormat::Rgba, DataType::UnsignedShort565, &[0, 0]);
        assert!(expand_to_rgb888(&src).is_err());
    }

    // ============================================================
    // Channel order and alpha
    // ============================================================

    #[test]
    fn test_swap_red_blue_bytes() {
        let src = filled(2, 1, PixelFormat::Rgba, DataType::UnsignedByte, &[1, 2, 3, 4]);
        let dst = swap_red_blue(&src).unwrap();
        assert_eq!(dst.pixel_format(), Some(PixelFormat::Bgra));
        assert_eq!(dst.data(), &[3, 2, 1, 4, 3, 2, 1, 4]);
    }

    #[test]
    fn test_swap_red_blue_wide_components() {
        let mut src = PixelBuffer::new();
        src.allocate(1, 1, 1, PixelFormat::Rgb, DataType::UnsignedShort, 1).unwrap();
        src.data_mut().copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(swap_red_blue(&src).unwrap().data(), &[5, 6, 3, 4, 1, 2]);
    }

    #[test]
    fn test_swap_red_blue_packed() {
        let src = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedShort565, &0xF800u16.to_ne_bytes());
        let dst = swap_red_blue(&src).unwrap();
        assert_eq!(dst.pixel_format(), Some(PixelFormat::Bgr));
        assert_eq!(words16(&dst), vec![0x001F]);

        let src332 = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedByte332, &[0xE0]);
        assert!(matches!(
            swap_red_blue(&src332),
            Err(ImageError::PreconditionMismatch { .. })
        ));
    }

    #[test]
    fn test_drop_and_add_alpha() {
        let bgra = filled(1, 2, PixelFormat::Bgra, DataType::UnsignedByte, &[10, 20, 30, 40]);
        let rgb = drop_alpha(&bgra).unwrap();
        assert_eq!(rgb.pixel_format(), Some(PixelFormat::Rgb));
        assert_eq!(rgb.data(), &[30, 20, 10, 30, 20, 10]);

        let bgr = filled(1, 1, PixelFormat::Bgr, DataType::UnsignedByte, &[10, 20, 30]);
        let rgba = add_alpha(&bgr).unwrap();
        assert_eq!(rgba.pixel_format(), Some(PixelFormat::Rgba));
        assert_eq!(rgba.data(), &[30, 20, 10, 255]);
    }

    #[test]
    fn test_conversion_copies_attributes() {
        let mut src = filled(1, 1, PixelFormat::Rgb, DataType::UnsignedByte, &[1, 2, 3]);
        src.set_file_name("wall.tga");
        src.set_internal_format(PixelFormat::Rgb8I);
        let dst = add_alpha(&src).unwrap();
        assert_eq!(dst.file_name(), "wall.tga");
        assert_eq!(dst.packing(), 1);
        assert_eq!(dst.internal_format(), Some(PixelFormat::Rgba));
    }

    // ============================================================
    // Dispatch
    // ============================================================

    #[test]
    fn test_convert_dispatch() {
        let rgb = filled(2, 2, PixelFormat::Rgb, DataType::UnsignedByte, &[255, 255, 255]);
        let packed = convert(&rgb, PixelFormat::Rgb, DataType::UnsignedShort565).unwrap();
        assert_eq!(packed.data_type(), Some(DataType::UnsignedShort565));
        let back = convert(&packed, PixelFormat::Rgb, DataType::UnsignedByte).unwrap();
        assert_eq!(back.data(), rgb.data());
        let bgr = convert(&rgb, PixelFormat::Bgr, DataType::UnsignedByte).unwrap();
        assert_eq!(bgr.pixel_format(), Some(PixelFormat::Bgr));
        let same = convert(&rgb, PixelFormat::Rgb, DataType::UnsignedByte).unwrap();
        assert_eq!(same.data(), rgb.data());
        assert!(convert(&rgb, PixelFormat::Luminance, DataType::Float).is_err());
    }
}
