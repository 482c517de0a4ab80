// texture.rs -- per-context texture objects for a pixel buffer

//! [`TextureUploadCoordinator`] keeps one device texture object per
//! context in step with a [`PixelBuffer`].
//!
//! Each context moves through `NoObject -> Stale -> Current(n)`, where `n`
//! is the buffer's modification count at the last successful transfer. A
//! later count makes the context stale again; losing the context drops it
//! back to `NoObject`. Released objects are queued and destroyed later on
//! the owning context's thread.
//!
//! A texture can also be filled from the framebuffer. It then mirrors no
//! buffer, and the next `ensure_current` transfers again.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use deu3d_image::catalog::mipmap_level_count;
use deu3d_image::{nearest_power_of_two, resample, DataType, DataVariance, ImageError, PixelBuffer, PixelDescriptor, PixelFormat};
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::config::TextureConfig;
use crate::device::{ContextId, DeviceError, FramebufferRegion, LevelUpload, TextureDevice, TextureHandle, TextureTarget};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("context {context}: device transfer failed: {source}")]
    DeviceUploadFailure {
        context: ContextId,
        #[source]
        source: DeviceError,
    },
    #[error("context {context}: no image data to upload")]
    NoImageData { context: ContextId },
    #[error(transparent)]
    Image(#[from] ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureStatus {
    NoObject,
    Stale,
    /// Holds the modification count that was transferred.
    Current(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Nothing changed since the last transfer; no device calls were made.
    UpToDate,
    /// Storage was (re)specified.
    Uploaded { levels: u32 },
    /// Existing storage was refreshed in place.
    Updated { levels: u32 },
}

/// What one context holds for the buffer.
#[derive(Debug, Default)]
struct TextureObjectState {
    handle: Option<TextureHandle>,
    /// (buffer id, modification count) at the last successful transfer
    observed: Option<(u64, u64)>,
    width: u32,
    height: u32,
    levels: u32,
    layout: Option<(PixelFormat, PixelFormat, DataType)>,
}

impl TextureObjectState {
    fn status(&self, image: &PixelBuffer) -> TextureStatus {
        match (self.handle, self.observed) {
            (None, _) => TextureStatus::NoObject,
            (Some(_), Some((id, count))) if id == image.id() && count == image.modified_count() => {
                TextureStatus::Current(count)
            }
            (Some(_), _) => TextureStatus::Stale,
        }
    }

    fn forget_storage(&mut self) {
        self.width = 0;
        self.height = 0;
        self.levels = 0;
        self.layout = None;
    }
}

pub struct TextureUploadCoordinator {
    config: TextureConfig,
    target: TextureTarget,
    states: RwLock<HashMap<ContextId, Arc<Mutex<TextureObjectState>>>>,
    /// Released objects awaiting `flush_deleted_objects` on their context.
    orphaned: SegQueue<(ContextId, TextureHandle)>,
}

impl TextureUploadCoordinator {
    pub fn new(config: TextureConfig) -> Self {
        Self {
            config,
            target: TextureTarget::Texture2D,
            states: RwLock::new(HashMap::new()),
            orphaned: SegQueue::new(),
        }
    }

    pub fn config(&self) -> &TextureConfig {
        &self.config
    }

    fn slot(&self, context: ContextId) -> Arc<Mutex<TextureObjectState>> {
        if let Some(slot) = self.states.read().get(&context) {
            return Arc::clone(slot);
        }
        Arc::clone(self.states.write().entry(context).or_default())
    }

    // ============================================================
    // Queries
    // ============================================================

    pub fn status(&self, context: ContextId, image: &PixelBuffer) -> TextureStatus {
        match self.states.read().get(&context) {
            Some(slot) => slot.lock().status(image),
            None => TextureStatus::NoObject,
        }
    }

    pub fn texture_handle(&self, context: ContextId) -> Option<TextureHandle> {
        self.states.read().get(&context).and_then(|slot| slot.lock().handle)
    }

    /// Whether `image`'s pixels may be released: the unref policy is on,
    /// the data is static and every context that knows the image is current.
    pub fn is_safe_to_unref_image_data(&self, image: &PixelBuffer) -> bool {
        if !self.config.unref_image_after_apply || image.data_variance() != DataVariance::Static {
            return false;
        }
        let states = self.states.read();
        !states.is_empty()
            && states
                .values()
                .all(|slot| matches!(slot.lock().status(image), TextureStatus::Current(_)))
    }

    // ============================================================
    // Upload
    // ============================================================

    /// Bring the device's texture object for the current context up to date
    /// with `image`, creating it if needed.
    ///
    /// A failed transfer leaves the context stale, so the next call retries.
    pub fn ensure_current<D: TextureDevice + ?Sized>(
        &self,
        device: &mut D,
        image: &PixelBuffer,
    ) -> Result<UploadOutcome, UploadError> {
        let context = device.context_id();
        let slot = self.slot(context);
        let mut state = slot.lock();

        if let TextureStatus::Current(_) = state.status(image) {
            return Ok(UploadOutcome::UpToDate);
        }
        state.observed = None;

        let Some(desc) = image.descriptor().filter(|_| image.has_data()) else {
            warn!("{}: context {}: nothing to upload", image.file_name(), context);
            return Err(UploadError::NoImageData { context });
        };
        let observed = (image.id(), image.modified_count());

        let handle = match state.handle {
            Some(handle) => handle,
            None => {
                let handle = device
                    .create_texture_object(self.target)
                    .map_err(|source| device_failure(context, image.file_name(), source))?;
                debug!("{}: context {}: created {:?}", image.file_name(), context, handle);
                state.handle = Some(handle);
                handle
            }
        };

        let fitted = self.fit_to_device(device.max_texture_size(), image)?;
        let outcome = self
            .transfer(device, handle, &mut state, &fitted, desc)
            .map_err(|source| device_failure(context, image.file_name(), source))?;

        state.observed = Some(observed);
        debug!("{}: context {}: {:?} at count {}", image.file_name(), context, outcome, observed.1);
        Ok(outcome)
    }

    /// Apply power-of-two rounding and the size limit. The source is never
    /// modified; a resampled copy is returned when the size changes.
    fn fit_to_device<'a>(&self, device_max: u32, image: &'a PixelBuffer) -> Result<Cow<'a, PixelBuffer>, ImageError> {
        let max = self.config.effective_max_size(device_max);
        let fit = |n: u32| {
            let n = if self.config.resize_non_power_of_two {
                nearest_power_of_two(n, 0.5)
            } else {
                n
            };
            n.min(max)
        };
        let (width, height) = (fit(image.width()), fit(image.height()));
        if (width, height) == (image.width(), image.height()) {
            return Ok(Cow::Borrowed(image));
        }
        if image.is_compressed() || image.is_mipmap() || image.depth() > 1 {
            warn!(
                "{}: cannot rescale {}x{} to {}x{}, uploading as is",
                image.file_name(),
                image.width(),
                image.height(),
                width,
                height
            );
            return Ok(Cow::Borrowed(image));
        }
        debug!(
            "{}: rescaling {}x{} to {}x{} for upload",
            image.file_name(),
            image.width(),
            image.height(),
            width,
            height
        );
        Ok(Cow::Owned(resample(image, width, height, self.config.resample_filter)?))
    }

    fn transfer<D: TextureDevice + ?Sized>(
        &self,
        device: &mut D,
        handle: TextureHandle,
        state: &mut TextureObjectState,
        image: &PixelBuffer,
        desc: PixelDescriptor,
    ) -> Result<UploadOutcome, DeviceError> {
        let internal_format = image.internal_format().unwrap_or(desc.format);
        let compressed = image.is_compressed();
        let hardware = self.config.use_hardware_mipmap && !image.is_mipmap() && !compressed;
        let uploaded_levels = if hardware { 1 } else { image.num_mipmap_levels() };
        let total_levels = if hardware {
            mipmap_level_count(image.width(), image.height(), 1)
        } else {
            uploaded_levels
        };
        let layout = (internal_format, desc.format, desc.data_type);

        let reuse = state.layout == Some(layout)
            && state.width == image.width()
            && state.height == image.height()
            && state.levels == total_levels;
        if !reuse {
            state.forget_storage();
        }

        for level in 0..uploaded_levels {
            let (width, height, _) = image.mipmap_level_dimensions(level);
            let upload = LevelUpload {
                target: self.target,
                level,
                internal_format,
                format: desc.format,
                data_type: desc.data_type,
                width,
                height,
                packing: desc.packing,
                compressed,
                data: image.mipmap_level_data(level).unwrap_or(&[]),
            };
            if reuse {
                device.upload_sub_level(handle, &upload)?;
            } else {
                device.upload_level(handle, &upload)?;
            }
        }
        if hardware && total_levels > 1 {
            device.generate_mipmaps(handle, self.target)?;
        }

        state.width = image.width();
        state.height = image.height();
        state.levels = total_levels;
        state.layout = Some(layout);

        Ok(if reuse {
            UploadOutcome::Updated { levels: uploaded_levels }
        } else {
            UploadOutcome::Uploaded { levels: uploaded_levels }
        })
    }

    // ============================================================
    // Framebuffer copies
    // ============================================================

    /// Specify the context's texture from a framebuffer region.
    ///
    /// An object already holding `internal_format` at the region's size is
    /// refreshed in place instead. With hardware mipmapping the device then
    /// rebuilds the chain.
    pub fn copy_tex_image_2d<D: TextureDevice + ?Sized>(
        &self,
        device: &mut D,
        internal_format: PixelFormat,
        region: FramebufferRegion,
    ) -> Result<UploadOutcome, UploadError> {
        let context = device.context_id();
        if region.width == 0 || region.height == 0 {
            return Err(UploadError::NoImageData { context });
        }
        let slot = self.slot(context);
        let mut state = slot.lock();
        match state.handle {
            Some(handle)
                if state.width == region.width
                    && state.height == region.height
                    && state.layout.map(|layout| layout.0) == Some(internal_format) =>
            {
                self.copy_into_existing(device, handle, &mut state, 0, 0, region)
            }
            _ => self.copy_into_new_storage(device, &mut state, internal_format, region),
        }
    }

    /// Overwrite part of the context's texture, starting at texel
    /// (`x_offset`, `y_offset`), from a framebuffer region. Without an
    /// object this is [`copy_tex_image_2d`](Self::copy_tex_image_2d) to RGBA.
    pub fn copy_tex_sub_image_2d<D: TextureDevice + ?Sized>(
        &self,
        device: &mut D,
        x_offset: i32,
        y_offset: i32,
        region: FramebufferRegion,
    ) -> Result<UploadOutcome, UploadError> {
        let context = device.context_id();
        if region.width == 0 || region.height == 0 {
            return Err(UploadError::NoImageData { context });
        }
        let slot = self.slot(context);
        let mut state = slot.lock();
        match state.handle {
            Some(handle) => self.copy_into_existing(device, handle, &mut state, x_offset, y_offset, region),
            None => self.copy_into_new_storage(device, &mut state, PixelFormat::Rgba, region),
        }
    }

    fn copy_into_new_storage<D: TextureDevice + ?Sized>(
        &self,
        device: &mut D,
        state: &mut TextureObjectState,
        internal_format: PixelFormat,
        region: FramebufferRegion,
    ) -> Result<UploadOutcome, UploadError> {
        const WHAT: &str = "framebuffer copy";
        let context = device.context_id();
        state.observed = None;
        let handle = match state.handle {
            Some(handle) => handle,
            None => {
                let handle = device
                    .create_texture_object(self.target)
                    .map_err(|source| device_failure(context, WHAT, source))?;
                state.handle = Some(handle);
                handle
            }
        };

        state.forget_storage();
        device
            .copy_framebuffer_to_level(handle, self.target, internal_format, region)
            .map_err(|source| device_failure(context, WHAT, source))?;
        let levels = if self.config.use_hardware_mipmap {
            mipmap_level_count(region.width, region.height, 1)
        } else {
            1
        };
        if levels > 1 {
            device
                .generate_mipmaps(handle, self.target)
                .map_err(|source| device_failure(context, WHAT, source))?;
        }

        state.width = region.width;
        state.height = region.height;
        state.levels = levels;
        state.layout = Some((internal_format, PixelFormat::Rgba, DataType::UnsignedByte));
        debug!(
            "context {}: {:?} specified from {}x{} framebuffer region",
            context, handle, region.width, region.height
        );
        Ok(UploadOutcome::Uploaded { levels: 1 })
    }

    fn copy_into_existing<D: TextureDevice + ?Sized>(
        &self,
        device: &mut D,
        handle: TextureHandle,
        state: &mut TextureObjectState,
        x_offset: i32,
        y_offset: i32,
        region: FramebufferRegion,
    ) -> Result<UploadOutcome, UploadError> {
        const WHAT: &str = "framebuffer copy";
        let context = device.context_id();
        state.observed = None;
        device
            .copy_framebuffer_to_sub_level(handle, self.target, x_offset, y_offset, region)
            .map_err(|source| device_failure(context, WHAT, source))?;
        if self.config.use_hardware_mipmap && state.levels > 1 {
            device
                .generate_mipmaps(handle, self.target)
                .map_err(|source| device_failure(context, WHAT, source))?;
        }
        Ok(UploadOutcome::Updated { levels: 1 })
    }

    // ============================================================
    // Lifetime
    // ============================================================

    /// The context is gone and its objects with it. Nothing is destroyed.
    pub fn context_lost(&self, context: ContextId) {
        if self.states.write().remove(&context).is_some() {
            debug!("context {} lost", context);
        }
    }

    /// Give up the object held for `context`. It is destroyed by the next
    /// [`flush_deleted_objects`](Self::flush_deleted_objects) on that context.
    pub fn release(&self, context: ContextId) {
        let removed = self.states.write().remove(&context);
        if let Some(handle) = removed.and_then(|slot| slot.lock().handle) {
            self.orphaned.push((context, handle));
        }
    }

    /// [`release`](Self::release) for every context.
    pub fn release_all(&self) {
        let drained: Vec<_> = self.states.write().drain().collect();
        for (context, slot) in drained {
            if let Some(handle) = slot.lock().handle {
                self.orphaned.push((context, handle));
            }
        }
    }

    /// Destroy the released objects that belong to `device`'s context.
    /// Returns how many were destroyed.
    pub fn flush_deleted_objects<D: TextureDevice + ?Sized>(&self, device: &mut D) -> usize {
        let context = device.context_id();
        let mut others = Vec::new();
        let mut destroyed = 0;
        while let Some((owner, handle)) = self.orphaned.pop() {
            if owner == context {
                device.destroy_texture_object(handle);
                destroyed += 1;
            } else {
                others.push((owner, handle));
            }
        }
        for entry in others {
            self.orphaned.push(entry);
        }
        if destroyed > 0 {
            debug!("context {}: destroyed {} texture objects", context, destroyed);
        }
        destroyed
    }

    pub fn pending_deletions(&self) -> usize {
        self.orphaned.len()
    }
}

fn device_failure(context: ContextId, what: &str, source: DeviceError) -> UploadError {
    warn!("{}: context {}: {}", what, context, source);
    UploadError::DeviceUploadFailure { context, source }
}
