// format.rs -- pixel formats and component data types

//! Pixel formats and data types, carrying their GL enumerant values so
//! buffers can be handed to a GL-style device without translation.

macro_rules! gl_enum {
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $($(#[$inner:meta])* $variant:ident = $code:literal,)*
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum $name {
            $($(#[$inner])* $variant = $code,)*
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// The GL enumerant.
            pub const fn code(self) -> u32 {
                self as u32
            }

            /// Look up a GL enumerant. `None` if it names nothing known.
            pub fn from_code(code: u32) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

gl_enum! {
    /// Layout of the components of one texel.
    pub enum PixelFormat {
        ColorIndex = 0x1900,
        StencilIndex = 0x1901,
        DepthComponent = 0x1902,
        Red = 0x1903,
        Green = 0x1904,
        Blue = 0x1905,
        Alpha = 0x1906,
        Rgb = 0x1907,
        Rgba = 0x1908,
        Luminance = 0x1909,
        LuminanceAlpha = 0x190A,
        Bgr = 0x80E0,
        Bgra = 0x80E1,
        Intensity = 0x8049,
        Rgba8 = 0x8058,

        // sized legacy luminance / intensity
        Luminance4 = 0x803F,
        Luminance8 = 0x8040,
        Luminance12 = 0x8041,
        Luminance16 = 0x8042,
        Luminance4Alpha4 = 0x8043,
        Luminance6Alpha2 = 0x8044,
        Luminance8Alpha8 = 0x8045,
        Luminance12Alpha4 = 0x8046,
        Luminance12Alpha12 = 0x8047,
        Luminance16Alpha16 = 0x8048,
        Intensity4 = 0x804A,
        Intensity8 = 0x804B,
        Intensity12 = 0x804C,
        Intensity16 = 0x804D,

        // floating point
        Rgba32F = 0x8814,
        Rgb32F = 0x8815,
        Alpha32F = 0x8816,
        Intensity32F = 0x8817,
        Luminance32F = 0x8818,
        LuminanceAlpha32F = 0x8819,
        Rgba16F = 0x881A,
        Rgb16F = 0x881B,
        Alpha16F = 0x881C,
        Intensity16F = 0x881D,
        Luminance16F = 0x881E,
        LuminanceAlpha16F = 0x881F,

        // sized integer
        Rgba32UI = 0x8D70,
        Rgb32UI = 0x8D71,
        Alpha32UI = 0x8D72,
        Intensity32UI = 0x8D73,
        Luminance32UI = 0x8D74,
        LuminanceAlpha32UI = 0x8D75,
        Rgba16UI = 0x8D76,
        Rgb16UI = 0x8D77,
        Alpha16UI = 0x8D78,
        Intensity16UI = 0x8D79,
        Luminance16UI = 0x8D7A,
        LuminanceAlpha16UI = 0x8D7B,
        Rgba8UI = 0x8D7C,
        Rgb8UI = 0x8D7D,
        Alpha8UI = 0x8D7E,
        Intensity8UI = 0x8D7F,
        Luminance8UI = 0x8D80,
        LuminanceAlpha8UI = 0x8D81,
        Rgba32I = 0x8D82,
        Rgb32I = 0x8D83,
        Alpha32I = 0x8D84,
        Intensity32I = 0x8D85,
        Luminance32I = 0x8D86,
        LuminanceAlpha32I = 0x8D87,
        Rgba16I = 0x8D88,
        Rgb16I = 0x8D89,
        Alpha16I = 0x8D8A,
        Intensity16I = 0x8D8B,
        Luminance16I = 0x8D8C,
        LuminanceAlpha16I = 0x8D8D,
        Rgba8I = 0x8D8E,
        Rgb8I = 0x8D8F,
        Alpha8I = 0x8D90,
        Intensity8I = 0x8D91,
        Luminance8I = 0x8D92,
        LuminanceAlpha8I = 0x8D93,

        // integer base formats
        RedInteger = 0x8D94,
        GreenInteger = 0x8D95,
        BlueInteger = 0x8D96,
        AlphaInteger = 0x8D97,
        RgbInteger = 0x8D98,
        RgbaInteger = 0x8D99,
        BgrInteger = 0x8D9A,
        BgraInteger = 0x8D9B,
        LuminanceInteger = 0x8D9C,
        LuminanceAlphaInteger = 0x8D9D,

        // texture shader formats
        Hilo = 0x86F4,
        Dsdt = 0x86F5,
        DsdtMag = 0x86F6,
        DsdtMagVib = 0x86F7,

        // generic compressed
        CompressedAlpha = 0x84E9,
        CompressedLuminance = 0x84EA,
        CompressedLuminanceAlpha = 0x84EB,
        CompressedIntensity = 0x84EC,
        CompressedRgb = 0x84ED,
        CompressedRgba = 0x84EE,

        // block compressed
        CompressedRgbDxt1 = 0x83F0,
        CompressedRgbaDxt1 = 0x83F1,
        CompressedRgbaDxt3 = 0x83F2,
        CompressedRgbaDxt5 = 0x83F3,
        CompressedRgbPvrtc4Bpp = 0x8C00,
        CompressedRgbPvrtc2Bpp = 0x8C01,
        CompressedRgbaPvrtc4Bpp = 0x8C02,
        CompressedRgbaPvrtc2Bpp = 0x8C03,
        CompressedEtc1 = 0x8D64,
        CompressedRedRgtc1 = 0x8DBB,
        CompressedSignedRedRgtc1 = 0x8DBC,
        CompressedRedGreenRgtc2 = 0x8DBD,
        CompressedSignedRedGreenRgtc2 = 0x8DBE,
    }
}

gl_enum! {
    /// Encoding of the components of one texel.
    pub enum DataType {
        Byte = 0x1400,
        UnsignedByte = 0x1401,
        Short = 0x1402,
        UnsignedShort = 0x1403,
        Int = 0x1404,
        UnsignedInt = 0x1405,
        Float = 0x1406,
        HalfFloat = 0x140B,
        Bitmap = 0x1A00,

        UnsignedByte332 = 0x8032,
        UnsignedShort4444 = 0x8033,
        UnsignedShort5551 = 0x8034,
        UnsignedInt8888 = 0x8035,
        UnsignedInt1010102 = 0x8036,
        UnsignedByte233Rev = 0x8362,
        UnsignedShort565 = 0x8363,
        UnsignedShort565Rev = 0x8364,
        UnsignedShort4444Rev = 0x8365,
        UnsignedShort1555Rev = 0x8366,
        UnsignedInt8888Rev = 0x8367,
        UnsignedInt2101010Rev = 0x8368,
    }
}

/// Origin of the first stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    BottomLeft,
    TopLeft,
}

/// Whether the pixels are expected to change after first upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataVariance {
    #[default]
    Static,
    Dynamic,
}

/// Format, data type and row alignment of a pixel array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelDescriptor {
    pub format: PixelFormat,
    pub data_type: DataType,
    /// Row alignment in bytes: 1, 2, 4 or 8.
    pub packing: u32,
}

impl PixelDescriptor {
    pub fn new(format: PixelFormat, data_type: DataType, packing: u32) -> Self {
        Self {
            format,
            data_type,
            packing,
        }
    }

    pub fn bits_per_pixel(&self) -> u32 {
        crate::catalog::bits_per_pixel(self.format, self.data_type)
    }

    pub fn component_count(&self) -> u32 {
        crate::catalog::component_count(self.format)
    }

    pub fn row_stride(&self, width: u32) -> usize {
        crate::catalog::row_stride(width, self.format, self.data_type, self.packing)
    }

    /// Bytes of one `width x height x depth` level in this layout.
    pub fn image_size(&self, width: u32, height: u32, depth: u32) -> usize {
        crate::catalog::image_size_in_bytes(width, height, depth, self.format, self.data_type, self.packing)
    }
}
