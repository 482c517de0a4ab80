// buffer.rs -- owned pixel storage with descriptor and mip offset table

//! [`PixelBuffer`]: a width x height x depth array of texels plus the
//! description needed to interpret it.
//!
//! Rows are padded to the packing alignment. Mipmap levels, when present,
//! follow level 0 in the same byte vector; `mipmap_offsets` holds the byte
//! offset of each level after the first. Every mutation bumps an atomic
//! modification counter that upload code compares against.

use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytemuck::Pod;
use log::{debug, warn};
use parking_lot::RwLock;

use crate::catalog::{image_size_in_bytes, is_block_compressed};
use crate::dxt;
use crate::error::ImageError;
use crate::format::{DataType, DataVariance, Origin, PixelDescriptor, PixelFormat};

/// A buffer shared between owners. Cloning the handle aliases the pixels;
/// cloning the buffer itself never does.
pub type SharedPixelBuffer = Arc<RwLock<PixelBuffer>>;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

fn next_buffer_id() -> u64 {
    NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Zero-filled byte vector, reporting allocation failure instead of aborting.
pub(crate) fn try_alloc_zeroed(bytes: usize) -> Result<Vec<u8>, ImageError> {
    let mut data = Vec::new();
    data.try_reserve_exact(bytes)
        .map_err(|_| ImageError::AllocationFailure { bytes }.warned())?;
    data.resize(bytes, 0);
    Ok(data)
}

pub struct PixelBuffer {
    id: u64,
    file_name: String,
    origin: Origin,
    data_variance: DataVariance,

    width: u32,
    height: u32,
    depth: u32,

    /// Format requested for the device texture; kept across reallocation.
    internal_format: Option<PixelFormat>,
    pixel_format: Option<PixelFormat>,
    data_type: Option<DataType>,
    packing: u32,

    data: Vec<u8>,
    mipmap_offsets: Vec<usize>,

    modified: AtomicU64,
}

impl Default for PixelBuffer {
    fn default() -> Self {
        Self {
            id: next_buffer_id(),
            file_name: String::new(),
            origin: Origin::BottomLeft,
            data_variance: DataVariance::Static,
            width: 0,
            height: 0,
            depth: 0,
            internal_format: None,
            pixel_format: None,
            data_type: None,
            packing: 4,
            data: Vec::new(),
            mipmap_offsets: Vec::new(),
            modified: AtomicU64::new(0),
        }
    }
}

impl Clone for PixelBuffer {
    /// Deep copy: the clone owns a fresh byte vector, a new identity and a
    /// counter of its own.
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            mipmap_offsets: self.mipmap_offsets.clone(),
            width: self.width,
            height: self.height,
            depth: self.depth,
            internal_format: self.internal_format,
            pixel_format: self.pixel_format,
            data_type: self.data_type,
            packing: self.packing,
            ..self.empty_like()
        }
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("file_name", &self.file_name)
            .field("size", &(self.width, self.height, self.depth))
            .field("pixel_format", &self.pixel_format)
            .field("data_type", &self.data_type)
            .field("packing", &self.packing)
            .field("bytes", &self.data.len())
            .field("mipmap_levels", &self.num_mipmap_levels())
            .field("modified", &self.modified_count())
            .finish()
    }
}

impl PixelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedPixelBuffer {
        Arc::new(RwLock::new(self))
    }

    /// A buffer with this one's non-pixel attributes and no data.
    ///
    /// The internal format is left unset so the first allocation adopts
    /// its own pixel format.
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            file_name: self.file_name.clone(),
            origin: self.origin,
            data_variance: self.data_variance,
            packing: self.packing,
            ..Self::default()
        }
    }

    /// Take over another buffer's identity and counter, for in-place
    /// replacement by a derived buffer.
    pub(crate) fn adopt_identity(&mut self, id: u64, modified: u64) {
        self.id = id;
        self.modified = AtomicU64::new(modified);
    }

    // ============================================================
    // Attributes
    // ============================================================

    /// Identity, unique per buffer (clones get their own).
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn set_file_name(&mut self, name: impl Into<String>) {
        self.file_name = name.into();
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = origin;
        self.dirty();
    }

    pub fn data_variance(&self) -> DataVariance {
        self.data_variance
    }

    pub fn set_data_variance(&mut self, variance: DataVariance) {
        self.data_variance = variance;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn internal_format(&self) -> Option<PixelFormat> {
        self.internal_format
    }

    pub fn set_internal_format(&mut self, format: PixelFormat) {
        self.internal_format = Some(format);
        self.dirty();
    }

    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.pixel_format
    }

    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn packing(&self) -> u32 {
        self.packing
    }

    pub fn descriptor(&self) -> Option<PixelDescriptor> {
        Some(PixelDescriptor::new(self.pixel_format?, self.data_type?, self.packing))
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn is_compressed(&self) -> bool {
        self.pixel_format.is_some_and(is_block_compressed)
    }

    pub fn pixel_size_in_bits(&self) -> u32 {
        self.descriptor().map_or(0, |d| d.bits_per_pixel())
    }

    // ============================================================
    // Modification tracking
    // ============================================================

    pub fn modified_count(&self) -> u64 {
        self.modified.load(Ordering::Acquire)
    }

    /// Record a change made through [`data_mut`](Self::data_mut) or from outside.
    pub fn dirty(&self) {
        self.modified.fetch_add(1, Ordering::AcqRel);
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixels. Counts as a modification.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.dirty();
        &mut self.data
    }

    // ============================================================
    // Sizes
    // ============================================================

    pub fn row_stride(&self) -> usize {
        self.descriptor().map_or(0, |d| d.row_stride(self.width))
    }

    /// Bytes of one depth slice of level 0. Compressed slices count whole blocks.
    pub fn plane_size(&self) -> usize {
        self.descriptor().map_or(0, |d| d.image_size(self.width, self.height, 1))
    }

    /// Bytes of level 0.
    pub fn total_size_in_bytes(&self) -> usize {
        self.plane_size() * self.depth as usize
    }

    /// Bytes of level 0 and every mipmap level.
    pub fn total_size_including_mipmaps(&self) -> usize {
        let Some(&last_offset) = self.mipmap_offsets.iter().max() else {
            return self.total_size_in_bytes();
        };
        let Some(desc) = self.descriptor() else {
            return 0;
        };

        let (mut s, mut t, mut r) = (self.width, self.height, self.depth);
        for &offset in &self.mipmap_offsets {
            if offset != 0 {
                s = (s >> 1).max(1);
                t = (t >> 1).max(1);
                r = (r >> 1).max(1);
            }
        }

        desc.image_size(s, t, r) + last_offset
    }

    // ============================================================
    // Addressing
    // ============================================================

    /// Byte offset of texel (x, y, z) of level 0.
    pub fn address_of(&self, x: u32, y: u32, z: u32) -> usize {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        z as usize * self.plane_size()
            + y as usize * self.row_stride()
            + (x as usize * self.pixel_size_in_bits() as usize) / 8
    }

    /// Bytes from texel (x, y, z) to the end of the buffer.
    pub fn data_at(&self, x: u32, y: u32, z: u32) -> &[u8] {
        &self.data[self.address_of(x, y, z)..]
    }

    pub fn data_at_mut(&mut self, x: u32, y: u32, z: u32) -> &mut [u8] {
        let offset = self.address_of(x, y, z);
        self.dirty();
        &mut self.data[offset..]
    }

    /// One padded row of level 0.
    pub fn row(&self, y: u32, z: u32) -> &[u8] {
        let stride = self.row_stride();
        let start = z as usize * self.plane_size() + y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn row_mut(&mut self, y: u32, z: u32) -> &mut [u8] {
        let stride = self.row_stride();
        let start = z as usize * self.plane_size() + y as usize * stride;
        self.dirty();
        &mut self.data[start..start + stride]
    }

    // ============================================================
    // Allocation
    // ============================================================

    /// Size the buffer for `width x height x depth` texels.
    ///
    /// Storage is reused when the byte size is unchanged, so contents are
    /// unspecified afterwards. A zero-sized request, or a failed
    /// allocation, leaves the buffer empty with all dimensions zero.
    pub fn allocate(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
        format: PixelFormat,
        data_type: DataType,
        packing: u32,
    ) -> Result<(), ImageError> {
        self.mipmap_offsets.clear();

        let previous = if self.data.is_empty() { 0 } else { self.total_size_in_bytes() };
        let new_total = image_size_in_bytes(width, height, depth, format, data_type, packing);

        let mut result = Ok(());
        if new_total != previous || self.data.len() != new_total {
            if new_total == 0 {
                self.data = Vec::new();
            } else {
                match try_alloc_zeroed(new_total) {
                    Ok(data) => self.data = data,
                    Err(e) => {
                        self.data = Vec::new();
                        result = Err(e);
                    }
                }
            }
        }

        if self.data.is_empty() {
            self.width = 0;
            self.height = 0;
            self.depth = 0;
            self.pixel_format = None;
            self.data_type = None;
            self.packing = 0;
        } else {
            self.width = width;
            self.height = height;
            self.depth = depth;
            self.pixel_format = Some(format);
            self.data_type = Some(data_type);
            self.packing = packing;
            if self.internal_format.is_none() {
                self.internal_format = Some(format);
            }
            debug!(
                "allocate: {}x{}x{} {:?}/{:?}, {} bytes",
                width, height, depth, format, data_type, new_total
            );
        }

        self.dirty();
        result
    }

    /// Adopt caller-provided pixels. `data` may carry mipmap levels after
    /// level 0; describe them with [`set_mipmap_offsets`](Self::set_mipmap_offsets).
    #[allow(clippy::too_many_arguments)]
    pub fn set_image(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
        internal_format: PixelFormat,
        format: PixelFormat,
        data_type: DataType,
        data: Vec<u8>,
        packing: u32,
    ) -> Result<(), ImageError> {
        let needed = image_size_in_bytes(width, height, depth, format, data_type, packing);
        if data.len() < needed {
            return Err(ImageError::precondition(
                "set_image",
                format!("{} bytes supplied, {} required for {}x{}x{}", data.len(), needed, width, height, depth),
            )
            .warned());
        }

        self.mipmap_offsets.clear();
        self.width = width;
        self.height = height;
        self.depth = depth;
        self.internal_format = Some(internal_format);
        self.pixel_format = Some(format);
        self.data_type = Some(data_type);
        self.packing = packing;
        self.data = data;
        self.dirty();
        Ok(())
    }

    /// Release the pixels, keeping the description.
    pub fn release_data(&mut self) {
        self.data = Vec::new();
        self.mipmap_offsets.clear();
        self.dirty();
    }

    /// Change the data type of a buffer that has none yet.
    pub fn set_data_type(&mut self, data_type: DataType) -> Result<(), ImageError> {
        match self.data_type {
            Some(current) if current != data_type => Err(ImageError::precondition(
                "set_data_type",
                format!("data type already set to {:?}", current),
            )
            .warned()),
            _ => {
                self.data_type = Some(data_type);
                Ok(())
            }
        }
    }

    // ============================================================
    // Mipmaps
    // ============================================================

    pub fn is_mipmap(&self) -> bool {
        !self.mipmap_offsets.is_empty()
    }

    pub fn num_mipmap_levels(&self) -> u32 {
        self.mipmap_offsets.len() as u32 + 1
    }

    pub fn mipmap_offsets(&self) -> &[usize] {
        &self.mipmap_offsets
    }

    /// Describe the mipmap levels stored after level 0. Offsets must be
    /// ascending and lie inside the data.
    pub fn set_mipmap_offsets(&mut self, offsets: Vec<usize>) -> Result<(), ImageError> {
        let ascending = offsets.windows(2).all(|w| w[0] < w[1]);
        let first_ok = offsets.first().map_or(true, |&o| o >= self.total_size_in_bytes());
        let inside = offsets.last().map_or(true, |&o| o < self.data.len());
        if !ascending || !first_ok || !inside {
            return Err(ImageError::precondition(
                "set_mipmap_offsets",
                format!("offsets {:?} invalid for {} bytes", offsets, self.data.len()),
            )
            .warned());
        }
        self.mipmap_offsets = offsets;
        self.dirty();
        Ok(())
    }

    /// Size of a mipmap level: each dimension halved per level, min 1.
    pub fn mipmap_level_dimensions(&self, level: u32) -> (u32, u32, u32) {
        let halve = |n: u32| if n == 0 { 0 } else { n.checked_shr(level).unwrap_or(0).max(1) };
        (halve(self.width), halve(self.height), halve(self.depth))
    }

    fn mipmap_level_range(&self, level: u32) -> Option<(usize, usize)> {
        if level >= self.num_mipmap_levels() || self.data.is_empty() {
            return None;
        }
        let level = level as usize;
        let start = if level == 0 { 0 } else { self.mipmap_offsets[level - 1] };
        let end = match self.mipmap_offsets.get(level) {
            Some(&next) => next,
            None if level == 0 => self.total_size_in_bytes(),
            None => self.total_size_including_mipmaps(),
        };
        Some((start, end.min(self.data.len())))
    }

    /// Bytes of one mipmap level.
    pub fn mipmap_level_data(&self, level: u32) -> Option<&[u8]> {
        let (start, end) = self.mipmap_level_range(level)?;
        Some(&self.data[start..end])
    }

    pub fn mipmap_level_data_mut(&mut self, level: u32) -> Option<&mut [u8]> {
        let (start, end) = self.mipmap_level_range(level)?;
        self.dirty();
        Some(&mut self.data[start..end])
    }

    // ============================================================
    // Flips
    // ============================================================

    /// Mirror every row left to right.
    pub fn flip_horizontal(&mut self) -> Result<(), ImageError> {
        if self.data.is_empty() {
            return Err(ImageError::NoData("flip_horizontal").warned());
        }
        if self.is_mipmap() {
            return Err(ImageError::unsupported("flip_horizontal", "flipping mipmapped images").warned());
        }
        let bits = self.pixel_size_in_bits() as usize;
        if self.is_compressed() || bits == 0 || bits % 8 != 0 {
            return Err(ImageError::unsupported(
                "flip_horizontal",
                format!("flipping {:?}/{:?}", self.pixel_format, self.data_type),
            )
            .warned());
        }

        let element = bits / 8;
        let width = self.width as usize;
        let stride = self.row_stride();
        let rows = self.height as usize * self.depth as usize;
        for row in self.data[..stride * rows].chunks_exact_mut(stride) {
            for i in 0..width / 2 {
                let (left, right) = (i * element, (width - 1 - i) * element);
                for k in 0..element {
                    row.swap(left + k, right + k);
                }
            }
        }

        self.dirty();
        Ok(())
    }

    /// Turn the image upside down. Mipmapped images are flipped level by
    /// level; mipmapped volumes are refused.
    pub fn flip_vertical(&mut self) -> Result<(), ImageError> {
        if self.data.is_empty() {
            return Err(ImageError::NoData("flip_vertical").warned());
        }
        let Some(desc) = self.descriptor() else {
            return Err(ImageError::NoData("flip_vertical").warned());
        };
        if self.is_mipmap() && self.depth > 1 {
            return Err(ImageError::unsupported("flip_vertical", "flipping mipmapped volumes").warned());
        }
        if self.is_compressed() && dxt::block_bytes(desc.format).is_none() {
            return Err(ImageError::unsupported("flip_vertical", format!("flipping {:?}", desc.format)).warned());
        }

        if !self.is_mipmap() {
            let plane = self.plane_size();
            for r in 0..self.depth as usize {
                let slice = &mut self.data[r * plane..(r + 1) * plane];
                flip_level(desc, self.width, self.height, slice)?;
            }
        } else {
            for level in 0..self.num_mipmap_levels() {
                let (s, t, _) = self.mipmap_level_dimensions(level);
                let Some((start, end)) = self.mipmap_level_range(level) else {
                    continue;
                };
                flip_level(desc, s, t, &mut self.data[start..end])?;
            }
        }

        self.dirty();
        Ok(())
    }

    // ============================================================
    // Queries
    // ============================================================

    /// Order two buffers by identity, description and then name.
    ///
    /// Unnamed buffers are only equal to themselves. Otherwise dimensions,
    /// formats, packing, the mipmap table and the modification count are
    /// compared in turn; a buffer always equals itself, and two distinct
    /// buffers that agree on all of that are ordered by file name.
    pub fn compare(&self, other: &PixelBuffer) -> std::cmp::Ordering {
        let unnamed = self.file_name.is_empty() || other.file_name.is_empty();
        if unnamed && self.id != other.id {
            return self.id.cmp(&other.id);
        }
        let key = |b: &PixelBuffer| {
            (
                (b.width, b.height, b.depth),
                b.internal_format.map(PixelFormat::code),
                b.pixel_format.map(PixelFormat::code),
                b.data_type.map(DataType::code),
                b.packing,
            )
        };
        key(self)
            .cmp(&key(other))
            .then_with(|| self.mipmap_offsets.cmp(&other.mipmap_offsets))
            .then_with(|| self.modified_count().cmp(&other.modified_count()))
            .then_with(|| {
                if self.id == other.id {
                    std::cmp::Ordering::Equal
                } else {
                    self.file_name.cmp(&other.file_name)
                }
            })
    }

    /// True if any texel of level 0 has alpha below full opacity.
    pub fn is_translucent(&self) -> bool {
        let (Some(format), Some(data_type)) = (self.pixel_format, self.data_type) else {
            return false;
        };
        if self.data.is_empty() {
            return false;
        }
        if dxt::block_bytes(format).is_some() {
            return dxt::is_translucent(format, self.width, self.height, self.depth, &self.data);
        }

        let (offset, delta) = match format {
            PixelFormat::Alpha => (0, 1),
            PixelFormat::LuminanceAlpha => (1, 2),
            PixelFormat::Rgba | PixelFormat::Bgra => (3, 4),
            _ => return false,
        };

        let width = self.width as usize;
        let count = width * delta;
        for z in 0..self.depth {
            for y in 0..self.height {
                let row = self.row(y, z);
                let below = match data_type {
                    DataType::Byte => any_component_below::<i8>(row, count, offset, delta, i8::MAX),
                    DataType::UnsignedByte => any_component_below::<u8>(row, count, offset, delta, u8::MAX),
                    DataType::Short => any_component_below::<i16>(row, count, offset, delta, i16::MAX),
                    DataType::UnsignedShort => any_component_below::<u16>(row, count, offset, delta, u16::MAX),
                    DataType::Int => any_component_below::<i32>(row, count, offset, delta, i32::MAX),
                    DataType::UnsignedInt => any_component_below::<u32>(row, count, offset, delta, u32::MAX),
                    DataType::Float => any_component_below::<f32>(row, count, offset, delta, 1.0),
                    DataType::HalfFloat => any_component_below::<u16>(row, count, offset, delta, 0x3C00),
                    DataType::UnsignedShort5551 => any_masked_below::<u16>(row, width, 0x0001),
                    DataType::UnsignedShort1555Rev => any_masked_below::<u16>(row, width, 0x8000),
                    DataType::UnsignedShort4444 => any_masked_below::<u16>(row, width, 0x000F),
                    DataType::UnsignedShort4444Rev => any_masked_below::<u16>(row, width, 0xF000),
                    DataType::UnsignedInt1010102 => any_masked_below::<u32>(row, width, 0x0000_0003),
                    DataType::UnsignedInt2101010Rev => any_masked_below::<u32>(row, width, 0xC000_0000),
                    _ => false,
                };
                if below {
                    return true;
                }
            }
        }
        false
    }

    /// Color of texel (x, y, z) as normalized RGBA. Layouts that cannot be
    /// sampled read as opaque white.
    pub fn get_color(&self, x: u32, y: u32, z: u32) -> [f32; 4] {
        const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
        let (Some(format), Some(data_type)) = (self.pixel_format, self.data_type) else {
            return WHITE;
        };
        if self.data.is_empty() || x >= self.width || y >= self.height || z >= self.depth {
            return WHITE;
        }
        let texel = self.data_at(x, y, z);
        let sample = match data_type {
            DataType::Byte => read_color::<i8>(format, texel, 128.0),
            DataType::UnsignedByte => read_color::<u8>(format, texel, 255.0),
            DataType::Short => read_color::<i16>(format, texel, 32768.0),
            DataType::UnsignedShort => read_color::<u16>(format, texel, 65535.0),
            DataType::Int => read_color::<i32>(format, texel, 2147483648.0),
            DataType::UnsignedInt => read_color::<u32>(format, texel, 4294967295.0),
            DataType::Float => read_color::<f32>(format, texel, 1.0),
            _ => None,
        };
        sample.unwrap_or(WHITE)
    }

    /// [`get_color`](Self::get_color) at texture coordinates in [0, 1];
    /// coordinates outside wrap around.
    pub fn get_color_normalized(&self, s: f32, t: f32, r: f32) -> [f32; 4] {
        let wrap = |c: f32, size: u32| -> u32 {
            if size == 0 {
                return 0;
            }
            ((c * (size - 1) as f32) as i64).rem_euclid(size as i64) as u32
        };
        self.get_color(wrap(s, self.width), wrap(t, self.height), wrap(r, self.depth))
    }

    /// Best 16-bit packing for a 32-bit RGBA image: 5-5-5-1 when fewer
    /// than a tenth of the texels have intermediate alpha, else 4-4-4-4.
    pub fn find_best_bits_of_16(&self) -> Option<DataType> {
        if self.data.is_empty()
            || self.pixel_size_in_bits() != 32
            || !matches!(self.pixel_format, Some(PixelFormat::Rgba | PixelFormat::Bgra))
            || self.data_type != Some(DataType::UnsignedByte)
        {
            return None;
        }
        let total = self.width as usize * self.height as usize * self.depth as usize;
        let mut intermediate = 0usize;
        for z in 0..self.depth {
            for y in 0..self.height {
                intermediate += self
                    .row(y, z)
                    .chunks_exact(4)
                    .take(self.width as usize)
                    .filter(|texel| texel[3] > 64 && texel[3] < 192)
                    .count();
            }
        }
        if intermediate * 10 < total {
            Some(DataType::UnsignedShort5551)
        } else {
            Some(DataType::UnsignedShort4444)
        }
    }
}

// ============================================================
// Helpers
// ============================================================

fn flip_level(desc: PixelDescriptor, width: u32, height: u32, data: &mut [u8]) -> Result<(), ImageError> {
    if dxt::block_bytes(desc.format).is_some() {
        return dxt::vertical_flip(desc.format, width, height, data);
    }
    let stride = desc.row_stride(width);
    let rows = height as usize;
    if stride * rows > data.len() {
        warn!("flip_vertical: level of {}x{} exceeds its {} bytes", width, height, data.len());
        return Err(ImageError::precondition("flip_vertical", "level data shorter than its rows"));
    }
    for i in 0..rows / 2 {
        let (top, bottom) = data.split_at_mut((rows - 1 - i) * stride);
        top[i * stride..(i + 1) * stride].swap_with_slice(&mut bottom[..stride]);
    }
    Ok(())
}

fn read_component<T: Pod>(bytes: &[u8], index: usize) -> T {
    let size = size_of::<T>();
    bytemuck::pod_read_unaligned(&bytes[index * size..(index + 1) * size])
}

fn any_component_below<T: Pod + PartialOrd>(row: &[u8], count: usize, offset: usize, delta: usize, limit: T) -> bool {
    (offset..count)
        .step_by(delta)
        .any(|i| read_component::<T>(row, i) < limit)
}

/// Packed alpha test: the alpha field is below full when not every mask bit is set.
fn any_masked_below<T>(row: &[u8], texels: usize, mask: T) -> bool
where
    T: Pod + PartialEq + std::ops::BitAnd<Output = T>,
{
    (0..texels).any(|i| read_component::<T>(row, i) & mask != mask)
}

trait Component: Pod {
    fn to_f32(self) -> f32;
}

macro_rules! impl_component {
    ($($t:ty),*) => {
        $(impl Component for $t {
            fn to_f32(self) -> f32 {
                self as f32
            }
        })*
    };
}

impl_component!(i8, u8, i16, u16, i32, u32, f32);

fn read_color<T: Component>(format: PixelFormat, texel: &[u8], range: f32) -> Option<[f32; 4]> {
    let c = |i: usize| read_component::<T>(texel, i).to_f32() / range;
    let color = match format {
        PixelFormat::DepthComponent | PixelFormat::Luminance => {
            let l = c(0);
            [l, l, l, 1.0]
        }
        PixelFormat::Alpha => [1.0, 1.0, 1.0, c(0)],
        PixelFormat::LuminanceAlpha => {
            let l = c(0);
            [l, l, l, c(1)]
        }
        PixelFormat::Rgb => [c(0), c(1), c(2), 1.0],
        PixelFormat::Rgba => [c(0), c(1), c(2), c(3)],
        PixelFormat::Bgr => [c(2), c(1), c(0), 1.0],
        PixelFormat::Bgra => [c(2), c(1), c(0), c(3)],
        _ => return None,
    };
    Some(color)
}
