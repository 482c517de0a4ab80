// CPU side of the texture pipeline: pixel formats, pixel buffers,
// conversions, resampling and decoding

pub mod buffer;
pub mod catalog;
pub mod codec;
pub mod convert;
pub mod dxt;
pub mod error;
pub mod format;
pub mod resample;

pub use buffer::{PixelBuffer, SharedPixelBuffer};
pub use codec::{CodecRegistry, ImageCodec, StandardCodec};
pub use error::ImageError;
pub use format::{DataType, DataVariance, Origin, PixelDescriptor, PixelFormat};
pub use resample::{nearest_power_of_two, resample, resample_to_type, ResampleFilter};
