// readback.rs -- copy a device texture back into a pixel buffer

use deu3d_image::catalog::{base_pixel_format, row_stride};
use deu3d_image::{DataType, ImageError, PixelBuffer, PixelFormat};
use log::debug;

use crate::device::{FramebufferRegion, LevelInfo, TextureDevice, TextureHandle};
use crate::texture::UploadError;

const MAX_LEVELS: u32 = 32;

fn present(info: LevelInfo) -> Option<LevelInfo> {
    (info.width > 0 && info.height > 0).then_some(info)
}

/// Read `handle`'s level 0, and with `copy_mipmaps` every further level
/// the device reports, into a new buffer.
///
/// Uncompressed levels are read as their base format in `data_type`, rows
/// aligned to the device's pack alignment. Compressed levels are copied as
/// stored, in whole blocks with no row padding.
pub fn read_image_from_texture<D: TextureDevice + ?Sized>(
    device: &mut D,
    handle: TextureHandle,
    copy_mipmaps: bool,
    data_type: DataType,
) -> Result<PixelBuffer, UploadError> {
    let context = device.context_id();
    let Some(base) = device.level_info(handle, 0).and_then(present) else {
        return Err(UploadError::NoImageData { context });
    };

    let compressed = base.compressed_size.is_some();
    let format = if compressed {
        base.internal_format
    } else {
        base_pixel_format(base.internal_format)
    };
    let packing = if compressed { 1 } else { device.pack_alignment() };

    let mut levels = vec![base];
    if copy_mipmaps {
        for level in 1..MAX_LEVELS {
            match device.level_info(handle, level).and_then(present) {
                Some(info) => levels.push(info),
                None => break,
            }
        }
    }

    let sizes: Vec<usize> = levels
        .iter()
        .map(|info| {
            info.compressed_size.unwrap_or_else(|| {
                row_stride(info.width, format, data_type, packing) * info.height as usize * info.depth.max(1) as usize
            })
        })
        .collect();
    let mut offsets = Vec::with_capacity(sizes.len().saturating_sub(1));
    let mut total = 0;
    for (level, size) in sizes.iter().enumerate() {
        if level > 0 {
            offsets.push(total);
        }
        total += size;
    }

    let mut data = Vec::new();
    data.try_reserve_exact(total)
        .map_err(|_| ImageError::AllocationFailure { bytes: total })?;
    data.resize(total, 0);

    let mut img = PixelBuffer::new();
    img.set_image(
        base.width,
        base.height,
        base.depth.max(1),
        base.internal_format,
        format,
        data_type,
        data,
        packing,
    )?;
    img.set_mipmap_offsets(offsets)?;

    for level in 0..levels.len() as u32 {
        let Some(out) = img.mipmap_level_data_mut(level) else {
            break;
        };
        device
            .read_level(handle, level, format, data_type, out)
            .map_err(|source| UploadError::DeviceUploadFailure { context, source })?;
    }

    debug!(
        "context {}: read back {:?}, {}x{} {:?}, {} levels",
        context,
        handle,
        base.width,
        base.height,
        format,
        levels.len()
    );
    Ok(img)
}

/// Read a region of the current framebuffer into a new buffer, rows
/// aligned to the device's pack alignment.
pub fn read_pixels<D: TextureDevice + ?Sized>(
    device: &mut D,
    region: FramebufferRegion,
    format: PixelFormat,
    data_type: DataType,
) -> Result<PixelBuffer, UploadError> {
    let context = device.context_id();
    let mut img = PixelBuffer::new();
    img.allocate(region.width, region.height, 1, format, data_type, device.pack_alignment())?;
    if !img.has_data() {
        return Err(UploadError::NoImageData { context });
    }
    device
        .read_framebuffer(region, format, data_type, img.data_mut())
        .map_err(|source| UploadError::DeviceUploadFailure { context, source })?;
    debug!(
        "context {}: read {}x{} pixels at ({}, {})",
        context, region.width, region.height, region.x, region.y
    );
    Ok(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextureConfig;
    use crate::device::testing::RecordingDevice;
    use crate::device::{LevelUpload, TextureTarget};
    use crate::texture::TextureUploadCoordinator;

    #[test]
    fn test_read_back_mipmapped_upload() {
        let data: Vec<u8> = (0..340).map(|i| (i * 7 % 256) as u8).collect();
        let mut img = PixelBuffer::new();
        img.set_image(8, 8, 1, PixelFormat::Rgba, PixelFormat::Rgba, DataType::UnsignedByte, data.clone(), 1)
            .unwrap();
        img.set_mipmap_offsets(vec![256, 320, 336]).unwrap();

        let coordinator = TextureUploadCoordinator::new(TextureConfig {
            use_hardware_mipmap: false,
            ..TextureConfig::default()
        });
        let mut device = RecordingDevice::new(1);
        coordinator.ensure_current(&mut device, &img).unwrap();
        let handle = coordinator.texture_handle(1).unwrap();

        let copy = read_image_from_texture(&mut device, handle, true, DataType::UnsignedByte).unwrap();
        assert_eq!((copy.width(), copy.height()), (8, 8));
        assert_eq!(copy.pixel_format(), Some(PixelFormat::Rgba));
        assert_eq!(copy.mipmap_offsets(), &[256, 320, 336]);
        assert_eq!(copy.data(), data.as_slice());

        let level_zero = read_image_from_texture(&mut device, handle, false, DataType::UnsignedByte).unwrap();
        assert!(!level_zero.is_mipmap());
        assert_eq!(level_zero.data(), &data[..256]);
    }

    #[test]
    fn test_read_back_compressed_level() {
        let mut device = RecordingDevice::new(1);
        let handle = device.create_texture_object(TextureTarget::Texture2D).unwrap();
        let block = [0x1f, 0x00, 0xe0, 0x07, 0x00, 0x00, 0x00, 0x00];
        device
            .upload_level(
                handle,
                &LevelUpload {
                    target: TextureTarget::Texture2D,
                    level: 0,
                    internal_format: PixelFormat::CompressedRgbDxt1,
                    format: PixelFormat::CompressedRgbDxt1,
                    data_type: DataType::UnsignedByte,
                    width: 4,
                    height: 4,
                    packing: 1,
                    compressed: true,
                    data: &block,
                },
            )
            .unwrap();

        let copy = read_image_from_texture(&mut device, handle, true, DataType::UnsignedByte).unwrap();
        assert!(copy.is_compressed());
        assert_eq!(copy.pixel_format(), Some(PixelFormat::CompressedRgbDxt1));
        assert_eq!(copy.data(), &block);
    }

    #[test]
    fn test_read_back_compressed_with_pack_alignment_four() {
        let block: Vec<u8> = (1..=8).collect();
        let mut img = PixelBuffer::new();
        img.set_image(4, 4, 1, PixelFormat::CompressedRgbDxt1, PixelFormat::CompressedRgbDxt1, DataType::UnsignedByte, block.clone(), 4)
            .unwrap();

        let coordinator = TextureUploadCoordinator::new(TextureConfig::default());
        let mut device = RecordingDevice::new(1);
        assert_eq!(device.pack_alignment(), 4);
        coordinator.ensure_current(&mut device, &img).unwrap();
        let handle = coordinator.texture_handle(1).unwrap();

        let copy = read_image_from_texture(&mut device, handle, false, DataType::UnsignedByte).unwrap();
        assert_eq!(copy.packing(), 1);
        assert_eq!(copy.data(), block.as_slice());
    }

    #[test]
    fn test_read_back_realigns_rows() {
        // 3x3 RGB: 9-byte rows uploaded tight, read back padded to 12.
        let data: Vec<u8> = (0..27).collect();
        let mut img = PixelBuffer::new();
        img.set_image(3, 3, 1, PixelFormat::Rgb, PixelFormat::Rgb, DataType::UnsignedByte, data.clone(), 1)
            .unwrap();

        let coordinator = TextureUploadCoordinator::new(TextureConfig {
            resize_non_power_of_two: false,
            use_hardware_mipmap: false,
            ..TextureConfig::default()
        });
        let mut device = RecordingDevice::new(1);
        coordinator.ensure_current(&mut device, &img).unwrap();
        let handle = coordinator.texture_handle(1).unwrap();

        let copy = read_image_from_texture(&mut device, handle, false, DataType::UnsignedByte).unwrap();
        assert_eq!(copy.packing(), 4);
        assert_eq!(copy.row_stride(), 12);
        assert_eq!(copy.data().len(), 36);
        for y in 0..3 {
            assert_eq!(&copy.row(y, 0)[..9], &data[y as usize * 9..(y as usize + 1) * 9]);
        }
    }

    #[test]
    fn test_read_pixels() {
        let mut device = RecordingDevice::new(2);
        let region = FramebufferRegion::new(5, 7, 3, 2);
        let img = read_pixels(&mut device, region, PixelFormat::Rgba, DataType::UnsignedByte).unwrap();
        assert_eq!((img.width(), img.height()), (3, 2));
        assert_eq!(img.packing(), 4);
        assert_eq!(&img.data_at(0, 0, 0)[..4], &[5, 7, 0, 255]);
        assert_eq!(&img.data_at(2, 1, 0)[..4], &[7, 8, 0, 255]);

        let err = read_pixels(&mut device, region, PixelFormat::Rgb, DataType::Float).unwrap_err();
        assert!(matches!(err, UploadError::DeviceUploadFailure { context: 2, .. }));
        let empty = read_pixels(&mut device, FramebufferRegion::new(0, 0, 0, 4), PixelFormat::Rgba, DataType::UnsignedByte);
        assert!(matches!(empty, Err(UploadError::NoImageData { context: 2 })));
    }

    #[test]
    fn test_missing_texture() {
        let mut device = RecordingDevice::new(4);
        let err = read_image_from_texture(&mut device, TextureHandle(99), true, DataType::UnsignedByte).unwrap_err();
        assert!(matches!(err, UploadError::NoImageData { context: 4 }));
    }
}
