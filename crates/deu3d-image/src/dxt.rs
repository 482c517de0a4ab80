// dxt.rs -- S3TC (DXT1/3/5) block operations

//! Block level helpers for S3TC data: vertical flip without decoding and
//! a translucency scan. A block covers 4x4 texels; DXT1 blocks are 8
//! bytes, DXT3/5 blocks are an 8-byte alpha block followed by a DXT1-style
//! color block.

use crate::error::ImageError;
use crate::format::PixelFormat;

/// Bytes per 4x4 block, `None` for anything that is not DXT1/3/5.
pub fn block_bytes(format: PixelFormat) -> Option<usize> {
    match format {
        PixelFormat::CompressedRgbDxt1 | PixelFormat::CompressedRgbaDxt1 => Some(8),
        PixelFormat::CompressedRgbaDxt3 | PixelFormat::CompressedRgbaDxt5 => Some(16),
        _ => None,
    }
}

fn blocks_in(width: u32, height: u32) -> (usize, usize) {
    (
        (width as usize).div_ceil(4).max(1),
        (height as usize).div_ceil(4).max(1),
    )
}

// ============================================================
// Vertical flip
// ============================================================

/// Rows of a color block: bytes 4..8 hold one byte of 2-bit indices per row.
fn flip_color_block(block: &mut [u8], rows: usize) {
    if rows == 4 {
        block.swap(4, 7);
        block.swap(5, 6);
    } else {
        block.swap(4, 5);
    }
}

/// DXT3 explicit alpha: one little-endian u16 of nibbles per row.
fn flip_explicit_alpha_block(block: &mut [u8], rows: usize) {
    if rows == 4 {
        block.swap(0, 6);
        block.swap(1, 7);
        block.swap(2, 4);
        block.swap(3, 5);
    } else {
        block.swap(0, 2);
        block.swap(1, 3);
    }
}

/// DXT5 interpolated alpha: two endpoints then 48 bits of 3-bit indices,
/// 12 bits per row.
fn flip_interpolated_alpha_block(block: &mut [u8], rows: usize) {
    let mut bits = 0u64;
    for (i, &b) in block[2..8].iter().enumerate() {
        bits |= (b as u64) << (8 * i);
    }
    let row = |r: usize| (bits >> (12 * r)) & 0xFFF;
    let order: [usize; 4] = if rows == 4 { [3, 2, 1, 0] } else { [1, 0, 2, 3] };
    let mut flipped = 0u64;
    for (dst, &src) in order.iter().enumerate() {
        flipped |= row(src) << (12 * dst);
    }
    for (i, b) in block[2..8].iter_mut().enumerate() {
        *b = (flipped >> (8 * i)) as u8;
    }
}

fn flip_block(format: PixelFormat, block: &mut [u8], rows: usize) {
    match format {
        PixelFormat::CompressedRgbaDxt3 => {
            flip_explicit_alpha_block(&mut block[..8], rows);
            flip_color_block(&mut block[8..], rows);
        }
        PixelFormat::CompressedRgbaDxt5 => {
            flip_interpolated_alpha_block(&mut block[..8], rows);
            flip_color_block(&mut block[8..], rows);
        }
        _ => flip_color_block(block, rows),
    }
}

/// Flip one DXT image (a single mip level of a single slice) upside down.
pub fn vertical_flip(format: PixelFormat, width: u32, height: u32, data: &mut [u8]) -> Result<(), ImageError> {
    let Some(block_size) = block_bytes(format) else {
        return Err(ImageError::unsupported("flip_vertical", format!("block flip of {:?}", format)).warned());
    };
    let (blocks_x, blocks_y) = blocks_in(width, height);
    let row_bytes = blocks_x * block_size;
    let needed = row_bytes * blocks_y;
    if data.len() < needed {
        return Err(ImageError::precondition(
            "flip_vertical",
            format!("{} bytes of block data, {} required", data.len(), needed),
        )
        .warned());
    }
    let data = &mut data[..needed];

    match height {
        0 | 1 => Ok(()),
        2 => {
            for block in data.chunks_exact_mut(block_size) {
                flip_block(format, block, 2);
            }
            Ok(())
        }
        h if h % 4 == 0 => {
            for i in 0..blocks_y / 2 {
                let (top, bottom) = data.split_at_mut((blocks_y - 1 - i) * row_bytes);
                top[i * row_bytes..(i + 1) * row_bytes].swap_with_slice(&mut bottom[..row_bytes]);
            }
            for block in data.chunks_exact_mut(block_size) {
                flip_block(format, block, 4);
            }
            Ok(())
        }
        h => Err(ImageError::unsupported("flip_vertical", format!("block flip of height {}", h)).warned()),
    }
}

// ============================================================
// Translucency
// ============================================================

fn dxt1_block_has_transparency(block: &[u8]) -> bool {
    let color0 = u16::from_le_bytes([block[0], block[1]]);
    let color1 = u16::from_le_bytes([block[2], block[3]]);
    if color0 > color1 {
        return false;
    }
    block[4..8]
        .iter()
        .any(|&row| (0..4).any(|texel| (row >> (2 * texel)) & 0x3 == 0x3))
}

fn dxt3_block_has_transparency(block: &[u8]) -> bool {
    block[..8].iter().any(|&b| b & 0x0F != 0x0F || b & 0xF0 != 0xF0)
}

fn dxt5_alpha_palette(alpha0: u8, alpha1: u8) -> [u8; 8] {
    let (a0, a1) = (alpha0 as u32, alpha1 as u32);
    let mut palette = [alpha0, alpha1, 0, 0, 0, 0, 0, 0];
    if a0 > a1 {
        for i in 1..7u32 {
            palette[i as usize + 1] = (((7 - i) * a0 + i * a1) / 7) as u8;
        }
    } else {
        for i in 1..5u32 {
            palette[i as usize + 1] = (((5 - i) * a0 + i * a1) / 5) as u8;
        }
        palette[6] = 0;
        palette[7] = 255;
    }
    palette
}

fn dxt5_block_has_transparency(block: &[u8]) -> bool {
    let palette = dxt5_alpha_palette(block[0], block[1]);
    let mut bits = 0u64;
    for (i, &b) in block[2..8].iter().enumerate() {
        bits |= (b as u64) << (8 * i);
    }
    (0..16).any(|texel| palette[((bits >> (3 * texel)) & 0x7) as usize] < 255)
}

/// True if any block of the image can produce a texel with alpha below
/// full opacity. DXT1 without alpha is always opaque.
pub fn is_translucent(format: PixelFormat, width: u32, height: u32, depth: u32, data: &[u8]) -> bool {
    let Some(block_size) = block_bytes(format) else {
        return false;
    };
    let (blocks_x, blocks_y) = blocks_in(width, height);
    let blocks = blocks_x * blocks_y * depth.max(1) as usize;
    let end = (blocks * block_size).min(data.len());
    let mut iter = data[..end].chunks_exact(block_size);
    match format {
        PixelFormat::CompressedRgbaDxt1 => iter.any(dxt1_block_has_transparency),
        PixelFormat::CompressedRgbaDxt3 => iter.any(dxt3_block_has_transparency),
        PixelFormat::CompressedRgbaDxt5 => iter.any(dxt5_block_has_transparency),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dxt5_block(alpha0: u8, alpha1: u8, indices: [u8; 16], color: [u8; 8]) -> [u8; 16] {
        let mut bits = 0u64;
        for (i, &idx) in indices.iter().enumerate() {
            bits |= (idx as u64 & 0x7) << (3 * i);
        }
        let mut block = [0u8; 16];
        block[0] = alpha0;
        block[1] = alpha1;
        for i in 0..6 {
            block[2 + i] = (bits >> (8 * i)) as u8;
        }
        block[8..].copy_from_slice(&color);
        block
    }

    fn dxt5_indices(block: &[u8]) -> [u8; 16] {
        let mut bits = 0u64;
        for (i, &b) in block[2..8].iter().enumerate() {
            bits |= (b as u64) << (8 * i);
        }
        let mut out = [0u8; 16];
        for (i, v) in out.iter_mut().enumerate() {
            *v = ((bits >> (3 * i)) & 0x7) as u8;
        }
        out
    }

    // ============================================================
    // Flip
    // ============================================================

    #[test]
    fn test_dxt1_flip_reverses_index_rows() {
        let mut data = [0x10, 0x00, 0x20, 0x00, 1, 2, 3, 4];
        vertical_flip(PixelFormat::CompressedRgbDxt1, 4, 4, &mut data).unwrap();
        assert_eq!(data, [0x10, 0x00, 0x20, 0x00, 4, 3, 2, 1]);
    }

    #[test]
    fn test_dxt1_flip_swaps_block_rows() {
        // 4x8: two blocks stacked
        let mut data = [0u8; 16];
        data[..8].copy_from_slice(&[1, 0, 0, 0, 1, 2, 3, 4]);
        data[8..].copy_from_slice(&[2, 0, 0, 0, 5, 6, 7, 8]);
        vertical_flip(PixelFormat::CompressedRgbaDxt1, 4, 8, &mut data).unwrap();
        assert_eq!(&data[..8], &[2, 0, 0, 0, 8, 7, 6, 5]);
        assert_eq!(&data[8..], &[1, 0, 0, 0, 4, 3, 2, 1]);
    }

    #[test]
    fn test_dxt1_flip_height_two() {
        let mut data = [0, 0, 0, 0, 1, 2, 3, 4];
        vertical_flip(PixelFormat::CompressedRgbDxt1, 4, 2, &mut data).unwrap();
        assert_eq!(data, [0, 0, 0, 0, 2, 1, 3, 4]);
    }

    #[test]
    fn test_dxt3_flip_alpha_rows() {
        let mut data = [0u8; 16];
        data[..8].copy_from_slice(&[0x11, 0x12, 0x21, 0x22, 0x31, 0x32, 0x41, 0x42]);
        vertical_flip(PixelFormat::CompressedRgbaDxt3, 4, 4, &mut data).unwrap();
        assert_eq!(&data[..8], &[0x41, 0x42, 0x31, 0x32, 0x21, 0x22, 0x11, 0x12]);
    }

    #[test]
    fn test_dxt5_flip_alpha_indices() {
        let indices = [0, 1, 2, 3, 4, 5, 6, 7, 7, 6, 5, 4, 3, 2, 1, 0];
        let mut data = dxt5_block(200, 10, indices, [0; 8]);
        vertical_flip(PixelFormat::CompressedRgbaDxt5, 4, 4, &mut data).unwrap();
        let flipped = dxt5_indices(&data);
        assert_eq!(&flipped[0..4], &indices[12..16]);
        assert_eq!(&flipped[4..8], &indices[8..12]);
        assert_eq!(&flipped[8..12], &indices[4..8]);
        assert_eq!(&flipped[12..16], &indices[0..4]);
        assert_eq!((data[0], data[1]), (200, 10));
    }

    #[test]
    fn test_flip_twice_is_identity() {
        let indices = [3, 1, 4, 1, 5, 1, 2, 6, 5, 3, 5, 0, 7, 7, 2, 0];
        let block = dxt5_block(9, 250, indices, [1, 2, 3, 4, 5, 6, 7, 8]);
        let mut data = [block, block].concat();
        data[16] = 77;
        let original = data.clone();
        vertical_flip(PixelFormat::CompressedRgbaDxt5, 4, 8, &mut data).unwrap();
        assert_ne!(data, original);
        vertical_flip(PixelFormat::CompressedRgbaDxt5, 4, 8, &mut data).unwrap();
        assert_eq!(data, original);
    }

    #[test]
    fn test_flip_refuses_odd_heights_and_other_formats() {
        let mut data = [0u8; 32];
        assert!(vertical_flip(PixelFormat::CompressedRgbDxt1, 4, 6, &mut data).is_err());
        assert!(vertical_flip(PixelFormat::CompressedEtc1, 4, 4, &mut data).is_err());
        assert!(vertical_flip(PixelFormat::CompressedRgbaDxt5, 8, 8, &mut data[..16]).is_err());
    }

    // ============================================================
    // Translucency
    // ============================================================

    #[test]
    fn test_dxt1_punch_through() {
        // color0 <= color1 selects 3-color mode; index 3 is transparent
        let opaque = [0x00, 0x10, 0x00, 0x20, 0, 0, 0, 0];
        let punched = [0x00, 0x10, 0x00, 0x20, 0b0000_0011, 0, 0, 0];
        let four_color = [0x00, 0x30, 0x00, 0x20, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(!is_translucent(PixelFormat::CompressedRgbaDxt1, 4, 4, 1, &opaque));
        assert!(is_translucent(PixelFormat::CompressedRgbaDxt1, 4, 4, 1, &punched));
        assert!(!is_translucent(PixelFormat::CompressedRgbaDxt1, 4, 4, 1, &four_color));
        assert!(!is_translucent(PixelFormat::CompressedRgbDxt1, 4, 4, 1, &punched));
    }

    #[test]
    fn test_dxt3_alpha_nibbles() {
        let mut block = [0xFFu8; 16];
        assert!(!is_translucent(PixelFormat::CompressedRgbaDxt3, 4, 4, 1, &block));
        block[5] = 0xFE;
        assert!(is_translucent(PixelFormat::CompressedRgbaDxt3, 4, 4, 1, &block));
    }

    #[test]
    fn test_dxt5_palette() {
        let opaque = dxt5_block(255, 0, [0; 16], [0; 8]);
        assert!(!is_translucent(PixelFormat::CompressedRgbaDxt5, 4, 4, 1, &opaque));
        let mut indices = [0u8; 16];
        indices[9] = 1;
        let one_clear = dxt5_block(255, 0, indices, [0; 8]);
        assert!(is_translucent(PixelFormat::CompressedRgbaDxt5, 4, 4, 1, &one_clear));
        // six-value mode: index 7 is always 255
        let explicit_white = dxt5_block(0, 10, [7; 16], [0; 8]);
        assert!(!is_translucent(PixelFormat::CompressedRgbaDxt5, 4, 4, 1, &explicit_white));
    }

    #[test]
    fn test_dxt5_palette_values() {
        assert_eq!(dxt5_alpha_palette(255, 0), [255, 0, 218, 182, 145, 109, 72, 36]);
        assert_eq!(dxt5_alpha_palette(0, 255), [0, 255, 51, 102, 153, 204, 0, 255]);
    }
}
