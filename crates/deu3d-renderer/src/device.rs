// device.rs -- graphics device seam for texture objects

//! The operations the upload coordinator needs from a graphics API. One
//! implementation exists per context; the coordinator never holds on to it
//! between calls.

use deu3d_image::{DataType, PixelFormat};
use thiserror::Error;

/// Identifies a graphics context. Texture objects are only valid in the
/// context that created them.
pub type ContextId = u32;

/// Device-side texture object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureTarget {
    #[default]
    Texture2D,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("device out of memory")]
    OutOfMemory,
    #[error("invalid texture handle {0:?}")]
    InvalidHandle(TextureHandle),
    #[error("level {level} is {width}x{height}, device maximum is {max}")]
    TooLarge { level: u32, width: u32, height: u32, max: u32 },
    #[error("{0}")]
    Backend(String),
}

/// One mip level handed to the device.
#[derive(Debug, Clone, Copy)]
pub struct LevelUpload<'a> {
    pub target: TextureTarget,
    pub level: u32,
    pub internal_format: PixelFormat,
    pub format: PixelFormat,
    pub data_type: DataType,
    pub width: u32,
    pub height: u32,
    /// Row alignment of `data`.
    pub packing: u32,
    /// `data` holds compressed blocks of `format`.
    pub compressed: bool,
    pub data: &'a [u8],
}

/// What the device reports about a stored level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub internal_format: PixelFormat,
    /// Byte size for compressed levels, `None` when uncompressed.
    pub compressed_size: Option<usize>,
}

/// A rectangle of the current read framebuffer, origin at the lower left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FramebufferRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

pub trait TextureDevice {
    fn context_id(&self) -> ContextId;

    /// Largest width or height a texture level may have.
    fn max_texture_size(&self) -> u32;

    /// Row alignment used when reading levels back.
    fn pack_alignment(&self) -> u32 {
        4
    }

    fn create_texture_object(&mut self, target: TextureTarget) -> Result<TextureHandle, DeviceError>;

    /// Specify storage and contents of one level.
    fn upload_level(&mut self, handle: TextureHandle, level: &LevelUpload<'_>) -> Result<(), DeviceError>;

    /// Replace the contents of an already specified level of the same size.
    fn upload_sub_level(&mut self, handle: TextureHandle, level: &LevelUpload<'_>) -> Result<(), DeviceError>;

    /// Derive every level below 0 from level 0.
    fn generate_mipmaps(&mut self, handle: TextureHandle, target: TextureTarget) -> Result<(), DeviceError>;

    fn destroy_texture_object(&mut self, handle: TextureHandle);

    /// `None` if the level is not present.
    fn level_info(&mut self, handle: TextureHandle, level: u32) -> Option<LevelInfo>;

    /// Copy a level into `out` as `format`/`data_type` (compressed levels
    /// are copied as stored).
    fn read_level(
        &mut self,
        handle: TextureHandle,
        level: u32,
        format: PixelFormat,
        data_type: DataType,
        out: &mut [u8],
    ) -> Result<(), DeviceError>;

    /// Specify level 0 of `handle` from a framebuffer region, replacing any
    /// storage it had.
    fn copy_framebuffer_to_level(
        &mut self,
        handle: TextureHandle,
        target: TextureTarget,
        internal_format: PixelFormat,
        region: FramebufferRegion,
    ) -> Result<(), DeviceError>;

    /// Overwrite part of level 0 of `handle`, starting at texel
    /// (`x_offset`, `y_offset`), from a framebuffer region.
    fn copy_framebuffer_to_sub_level(
        &mut self,
        handle: TextureHandle,
        target: TextureTarget,
        x_offset: i32,
        y_offset: i32,
        region: FramebufferRegion,
    ) -> Result<(), DeviceError>;

    /// Read a framebuffer region into `out` as `format`/`data_type`, rows
    /// aligned to [`pack_alignment`](Self::pack_alignment).
    fn read_framebuffer(
        &mut self,
        region: FramebufferRegion,
        format: PixelFormat,
        data_type: DataType,
        out: &mut [u8],
    ) -> Result<(), DeviceError>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! A [`TextureDevice`] that records every call and stores levels in memory.
    //!
    //! Uncompressed levels are kept with tightly packed rows and re-aligned
    //! to `pack_alignment` on read. The framebuffer is RGBA8, texel (x, y)
    //! holding `[x, y, 0, 255]`.

    use std::collections::HashMap;

    use deu3d_image::catalog::{bits_per_pixel, row_stride};

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Create(TextureHandle),
        Upload { handle: TextureHandle, level: u32, width: u32, height: u32 },
        SubUpload { handle: TextureHandle, level: u32, width: u32, height: u32 },
        CopyToLevel { handle: TextureHandle, width: u32, height: u32 },
        CopyToSubLevel { handle: TextureHandle, x_offset: i32, y_offset: i32, width: u32, height: u32 },
        ReadFramebuffer(FramebufferRegion),
        GenerateMipmaps(TextureHandle),
        Destroy(TextureHandle),
    }

    #[derive(Debug, Clone)]
    pub struct StoredLevel {
        pub info: LevelInfo,
        pub format: PixelFormat,
        pub data_type: DataType,
        pub data: Vec<u8>,
    }

    pub struct RecordingDevice {
        pub context: ContextId,
        pub max_size: u32,
        pub pack_alignment: u32,
        pub framebuffer_size: (u32, u32),
        pub calls: Vec<Call>,
        pub fail_uploads: bool,
        pub levels: HashMap<(TextureHandle, u32), StoredLevel>,
        next_handle: u32,
    }

    fn tight_row_bytes(width: u32, format: PixelFormat, data_type: DataType) -> usize {
        (width as usize * bits_per_pixel(format, data_type) as usize).div_ceil(8)
    }

    impl RecordingDevice {
        pub fn new(context: ContextId) -> Self {
            let _ = env_logger::builder().is_test(true).try_init();
            Self {
                context,
                max_size: 2048,
                pack_alignment: 4,
                framebuffer_size: (64, 64),
                calls: Vec::new(),
                fail_uploads: false,
                levels: HashMap::new(),
                next_handle: 1,
            }
        }

        pub fn take_calls(&mut self) -> Vec<Call> {
            std::mem::take(&mut self.calls)
        }

        fn store(&mut self, handle: TextureHandle, level: &LevelUpload<'_>) {
            let data = if level.compressed {
                level.data.to_vec()
            } else {
                let tight = tight_row_bytes(level.width, level.format, level.data_type);
                let stride = row_stride(level.width, level.format, level.data_type, level.packing);
                let mut rows = Vec::with_capacity(tight * level.height as usize);
                for row in level.data.chunks(stride.max(1)).take(level.height as usize) {
                    rows.extend_from_slice(&row[..tight.min(row.len())]);
                }
                rows
            };
            let info = LevelInfo {
                width: level.width,
                height: level.height,
                depth: 1,
                internal_format: level.internal_format,
                compressed_size: level.compressed.then_some(level.data.len()),
            };
            self.levels.insert(
                (handle, level.level),
                StoredLevel {
                    info,
                    format: level.format,
                    data_type: level.data_type,
                    data,
                },
            );
        }

        fn framebuffer_texel(&self, x: i64, y: i64) -> [u8; 4] {
            let (w, h) = self.framebuffer_size;
            if x < 0 || y < 0 || x >= w as i64 || y >= h as i64 {
                return [0; 4];
            }
            [x as u8, y as u8, 0, 255]
        }

        fn framebuffer_rgba(&self, region: FramebufferRegion) -> Vec<u8> {
            let mut texels = Vec::with_capacity(region.width as usize * region.height as usize * 4);
            for row in 0..region.height as i64 {
                for col in 0..region.width as i64 {
                    texels.extend_from_slice(&self.framebuffer_texel(region.x as i64 + col, region.y as i64 + row));
                }
            }
            texels
        }
    }

    impl TextureDevice for RecordingDevice {
        fn context_id(&self) -> ContextId {
            self.context
        }

        fn max_texture_size(&self) -> u32 {
            self.max_size
        }

        fn pack_alignment(&self) -> u32 {
            self.pack_alignment
        }

        fn create_texture_object(&mut self, _target: TextureTarget) -> Result<TextureHandle, DeviceError> {
            let handle = TextureHandle(self.next_handle);
            self.next_handle += 1;
            self.calls.push(Call::Create(handle));
            Ok(handle)
        }

        fn upload_level(&mut self, handle: TextureHandle, level: &LevelUpload<'_>) -> Result<(), DeviceError> {
            self.calls.push(Call::Upload {
                handle,
                level: level.level,
                width: level.width,
                height: level.height,
            });
            if self.fail_uploads {
                return Err(DeviceError::OutOfMemory);
            }
            self.store(handle, level);
            Ok(())
        }

        fn upload_sub_level(&mut self, handle: TextureHandle, level: &LevelUpload<'_>) -> Result<(), DeviceError> {
            self.calls.push(Call::SubUpload {
                handle,
                level: level.level,
                width: level.width,
                height: level.height,
            });
            if self.fail_uploads {
                return Err(DeviceError::OutOfMemory);
            }
            self.store(handle, level);
            Ok(())
        }

        fn generate_mipmaps(&mut self, handle: TextureHandle, _target: TextureTarget) -> Result<(), DeviceError> {
            self.calls.push(Call::GenerateMipmaps(handle));
            Ok(())
        }

        fn destroy_texture_object(&mut self, handle: TextureHandle) {
            self.calls.push(Call::Destroy(handle));
            self.levels.retain(|(h, _), _| *h != handle);
        }

        fn level_info(&mut self, handle: TextureHandle, level: u32) -> Option<LevelInfo> {
            self.levels.get(&(handle, level)).map(|stored| stored.info)
        }

        fn read_level(
            &mut self,
            handle: TextureHandle,
            level: u32,
            _format: PixelFormat,
            _data_type: DataType,
            out: &mut [u8],
        ) -> Result<(), DeviceError> {
            let stored = self.levels.get(&(handle, level)).ok_or(DeviceError::InvalidHandle(handle))?;
            if stored.info.compressed_size.is_some() {
                let n = out.len().min(stored.data.len());
                out[..n].copy_from_slice(&stored.data[..n]);
                return Ok(());
            }
            let tight = tight_row_bytes(stored.info.width, stored.format, stored.data_type);
            let stride = row_stride(stored.info.width, stored.format, stored.data_type, self.pack_alignment);
            for (row, src) in stored.data.chunks(tight.max(1)).enumerate() {
                let start = row * stride;
                let end = (start + src.len()).min(out.len());
                if start >= end {
                    break;
                }
                out[start..end].copy_from_slice(&src[..end - start]);
            }
            Ok(())
        }

        fn copy_framebuffer_to_level(
            &mut self,
            handle: TextureHandle,
            _target: TextureTarget,
            internal_format: PixelFormat,
            region: FramebufferRegion,
        ) -> Result<(), DeviceError> {
            self.calls.push(Call::CopyToLevel {
                handle,
                width: region.width,
                height: region.height,
            });
            if self.fail_uploads {
                return Err(DeviceError::OutOfMemory);
            }
            let data = self.framebuffer_rgba(region);
            let info = LevelInfo {
                width: region.width,
                height: region.height,
                depth: 1,
                internal_format,
                compressed_size: None,
            };
            self.levels.retain(|(h, _), _| *h != handle);
            self.levels.insert(
                (handle, 0),
                StoredLevel {
                    info,
                    format: PixelFormat::Rgba,
                    data_type: DataType::UnsignedByte,
                    data,
                },
            );
            Ok(())
        }

        fn copy_framebuffer_to_sub_level(
            &mut self,
            handle: TextureHandle,
            _target: TextureTarget,
            x_offset: i32,
            y_offset: i32,
            region: FramebufferRegion,
        ) -> Result<(), DeviceError> {
            self.calls.push(Call::CopyToSubLevel {
                handle,
                x_offset,
                y_offset,
                width: region.width,
                height: region.height,
            });
            if self.fail_uploads {
                return Err(DeviceError::OutOfMemory);
            }
            let texels = self.framebuffer_rgba(region);
            let stored = self.levels.get_mut(&(handle, 0)).ok_or(DeviceError::InvalidHandle(handle))?;
            if stored.format != PixelFormat::Rgba || stored.data_type != DataType::UnsignedByte {
                return Err(DeviceError::Backend("sub-copy into a non-RGBA8 level".into()));
            }
            let width = stored.info.width as i64;
            let height = stored.info.height as i64;
            for row in 0..region.height as i64 {
                for col in 0..region.width as i64 {
                    let (tx, ty) = (x_offset as i64 + col, y_offset as i64 + row);
                    if tx < 0 || ty < 0 || tx >= width || ty >= height {
                        continue;
                    }
                    let src = ((row * region.width as i64 + col) * 4) as usize;
                    let dst = ((ty * width + tx) * 4) as usize;
                    stored.data[dst..dst + 4].copy_from_slice(&texels[src..src + 4]);
                }
            }
            Ok(())
        }

        fn read_framebuffer(
            &mut self,
            region: FramebufferRegion,
            format: PixelFormat,
            data_type: DataType,
            out: &mut [u8],
        ) -> Result<(), DeviceError> {
            self.calls.push(Call::ReadFramebuffer(region));
            if format != PixelFormat::Rgba || data_type != DataType::UnsignedByte {
                return Err(DeviceError::Backend(format!("cannot read {:?}/{:?}", format, data_type)));
            }
            let texels = self.framebuffer_rgba(region);
            let tight = region.width as usize * 4;
            let stride = row_stride(region.width, format, data_type, self.pack_alignment);
            for (row, src) in texels.chunks(tight.max(1)).enumerate() {
                let start = row * stride;
                if start + src.len() > out.len() {
                    return Err(DeviceError::Backend("read buffer too small".into()));
                }
                out[start..start + src.len()].copy_from_slice(src);
            }
            Ok(())
        }
    }
}
