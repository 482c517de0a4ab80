// Device texture management for pixel buffers: per-context upload,
// deferred deletion and read-back

pub mod config;
pub mod device;
pub mod readback;
pub mod texture;

pub use config::{init, TextureConfig};
pub use device::{
    ContextId, DeviceError, FramebufferRegion, LevelInfo, LevelUpload, TextureDevice, TextureHandle, TextureTarget,
};
pub use readback::{read_image_from_texture, read_pixels};
pub use texture::{TextureStatus, TextureUploadCoordinator, UploadError, UploadOutcome};
