// config.rs -- texture upload configuration

//! Texture upload settings, read from cvars.

use deu3d_common::{init_console_logger, CvarContext, CvarFlags};
use deu3d_image::ResampleFilter;
use log::{debug, warn};

pub const TEX_HW_MIPMAP: &str = "tex_hw_mipmap";
pub const TEX_RESIZE_NPOT: &str = "tex_resize_npot";
pub const TEX_MAX_SIZE: &str = "tex_max_size";
pub const TEX_UNREF_IMAGE: &str = "tex_unref_image";
pub const TEX_RESAMPLE_FILTER: &str = "tex_resample_filter";

/// Largest texture dimension used when nothing else is configured.
pub const DEFAULT_MAX_TEXTURE_SIZE: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    /// Upload level 0 only and let the device build the chain
    pub use_hardware_mipmap: bool,
    /// Rescale non-power-of-two images before upload
    pub resize_non_power_of_two: bool,
    /// Upper bound on width and height, further capped by the device
    pub max_texture_size: u32,
    /// Allow static image data to be released once every context has it
    pub unref_image_after_apply: bool,
    /// Filter for the rescale
    pub resample_filter: ResampleFilter,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            use_hardware_mipmap: true,
            resize_non_power_of_two: true,
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
            unref_image_after_apply: false,
            resample_filter: ResampleFilter::Triangle,
        }
    }
}

impl TextureConfig {
    /// Create the texture cvars with their defaults. Existing values are kept.
    pub fn register_cvars(cvars: &mut CvarContext) {
        cvars.get(TEX_HW_MIPMAP, "1", CvarFlags::ARCHIVE);
        cvars.get(TEX_RESIZE_NPOT, "1", CvarFlags::ARCHIVE);
        cvars.get(TEX_MAX_SIZE, "2048", CvarFlags::ARCHIVE | CvarFlags::LATCH);
        cvars.get(TEX_UNREF_IMAGE, "0", CvarFlags::empty());
        cvars.get(TEX_RESAMPLE_FILTER, "triangle", CvarFlags::ARCHIVE);
    }

    /// Read the configuration. Missing or invalid values fall back to defaults.
    pub fn from_cvars(cvars: &CvarContext) -> Self {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| match cvars.find_var(name) {
            Some(var) => var.value != 0.0,
            None => default,
        };

        let max_texture_size = match cvars.find_var(TEX_MAX_SIZE) {
            Some(var) if var.value >= 1.0 => var.value as u32,
            Some(var) => {
                warn!("{} {} is invalid, using {}", TEX_MAX_SIZE, var.string, defaults.max_texture_size);
                defaults.max_texture_size
            }
            None => defaults.max_texture_size,
        };

        let resample_filter = match cvars.find_var(TEX_RESAMPLE_FILTER) {
            Some(var) => ResampleFilter::from_name(&var.string).unwrap_or_else(|| {
                warn!("{} '{}' is unknown, using {:?}", TEX_RESAMPLE_FILTER, var.string, defaults.resample_filter);
                defaults.resample_filter
            }),
            None => defaults.resample_filter,
        };

        Self {
            use_hardware_mipmap: flag(TEX_HW_MIPMAP, defaults.use_hardware_mipmap),
            resize_non_power_of_two: flag(TEX_RESIZE_NPOT, defaults.resize_non_power_of_two),
            max_texture_size,
            unref_image_after_apply: flag(TEX_UNREF_IMAGE, defaults.unref_image_after_apply),
            resample_filter,
        }
    }

    /// Size limit after applying the device's own maximum.
    pub fn effective_max_size(&self, device_max: u32) -> u32 {
        self.max_texture_size.min(device_max).max(1)
    }
}

/// Renderer start-up: route `log` output to the console, register the
/// texture cvars and read the configuration from them.
///
/// A logger installed earlier by the host is left in place.
pub fn init(cvars: &mut CvarContext) -> TextureConfig {
    if init_console_logger().is_err() {
        debug!("keeping the logger installed by the host");
    }
    TextureConfig::register_cvars(cvars);
    TextureConfig::from_cvars(cvars)
}
