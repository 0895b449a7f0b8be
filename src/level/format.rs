//! PCM sample formats and raw byte decoding

use std::str::FromStr;

/// Storage width of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleWidth {
    Bits8,
    Bits16,
    /// 24 significant bits in a 4-byte container
    Bits24,
    Bits32,
}

/// Byte order of multi-byte samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Layout of a single interleaved sample in the capture buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub width: SampleWidth,
    pub signed: bool,
    pub endianness: Endianness,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown frame format: {0}")]
pub struct UnknownSampleFormat(pub String);

impl SampleFormat {
    pub const U8: Self = Self::new(SampleWidth::Bits8, false, Endianness::Little);
    pub const S8: Self = Self::new(SampleWidth::Bits8, true, Endianness::Little);
    pub const S16_LE: Self = Self::new(SampleWidth::Bits16, true, Endianness::Little);
    pub const S16_BE: Self = Self::new(SampleWidth::Bits16, true, Endianness::Big);
    pub const S24_LE: Self = Self::new(SampleWidth::Bits24, true, Endianness::Little);
    pub const S24_BE: Self = Self::new(SampleWidth::Bits24, true, Endianness::Big);
    pub const S32_LE: Self = Self::new(SampleWidth::Bits32, true, Endianness::Little);
    pub const S32_BE: Self = Self::new(SampleWidth::Bits32, true, Endianness::Big);

    pub const fn new(width: SampleWidth, signed: bool, endianness: Endianness) -> Self {
        Self {
            width,
            signed,
            endianness,
        }
    }

    /// Number of bytes one sample occupies in the buffer
    pub fn bytes_per_sample(&self) -> usize {
        match self.width {
            SampleWidth::Bits8 => 1,
            SampleWidth::Bits16 => 2,
            SampleWidth::Bits24 | SampleWidth::Bits32 => 4,
        }
    }

    /// Decode one sample into a signed value.
    ///
    /// `bytes` must hold exactly `bytes_per_sample()` bytes. Unsigned
    /// formats are re-centred so that their midpoint decodes to zero.
    pub fn decode(&self, bytes: &[u8]) -> i64 {
        match self.width {
            SampleWidth::Bits8 => {
                if self.signed {
                    bytes[0] as i8 as i64
                } else {
                    bytes[0] as i64 - 0x80
                }
            }
            SampleWidth::Bits16 => {
                let raw = [bytes[0], bytes[1]];
                if self.signed {
                    self.pick(i16::from_le_bytes(raw), i16::from_be_bytes(raw)) as i64
                } else {
                    self.pick(u16::from_le_bytes(raw), u16::from_be_bytes(raw)) as i64 - 0x8000
                }
            }
            SampleWidth::Bits24 => {
                let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
                let container = self.pick(u32::from_le_bytes(raw), u32::from_be_bytes(raw));
                let low = container & 0x00ff_ffff;
                if self.signed {
                    // sign-extend from bit 23
                    (((low << 8) as i32) >> 8) as i64
                } else {
                    low as i64 - 0x80_0000
                }
            }
            SampleWidth::Bits32 => {
                let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
                if self.signed {
                    self.pick(i32::from_le_bytes(raw), i32::from_be_bytes(raw)) as i64
                } else {
                    self.pick(u32::from_le_bytes(raw), u32::from_be_bytes(raw)) as i64
                        - 0x8000_0000
                }
            }
        }
    }

    fn pick<T>(&self, little: T, big: T) -> T {
        match self.endianness {
            Endianness::Little => little,
            Endianness::Big => big,
        }
    }
}

impl FromStr for SampleFormat {
    type Err = UnknownSampleFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "u8" => Ok(Self::U8),
            "s8" => Ok(Self::S8),
            "s16le" => Ok(Self::S16_LE),
            "s16be" => Ok(Self::S16_BE),
            "s24le" => Ok(Self::S24_LE),
            "s24be" => Ok(Self::S24_BE),
            "s32le" => Ok(Self::S32_LE),
            "s32be" => Ok(Self::S32_BE),
            other => Err(UnknownSampleFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bits = match self.width {
            SampleWidth::Bits8 => return write!(f, "{}8", if self.signed { 's' } else { 'u' }),
            SampleWidth::Bits16 => 16,
            SampleWidth::Bits24 => 24,
            SampleWidth::Bits32 => 32,
        };
        let sign = if self.signed { 's' } else { 'u' };
        let order = match self.endianness {
            Endianness::Little => "le",
            Endianness::Big => "be",
        };
        write!(f, "{sign}{bits}{order}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_formats() {
        for name in ["u8", "s8", "s16le", "s16be", "s24le", "s24be", "s32le", "s32be"] {
            let format: SampleFormat = name.parse().unwrap();
            assert_eq!(format.to_string(), name);
        }
    }

    #[test]
    fn test_parse_unknown_format() {
        let err = "f32le".parse::<SampleFormat>().unwrap_err();
        assert_eq!(err.to_string(), "unknown frame format: f32le");
    }

    #[test]
    fn test_bytes_per_sample() {
        assert_eq!(SampleFormat::U8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::S16_BE.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::S24_LE.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::S32_LE.bytes_per_sample(), 4);
    }

    #[test]
    fn test_decode_8bit() {
        assert_eq!(SampleFormat::S8.decode(&[0xff]), -1);
        assert_eq!(SampleFormat::U8.decode(&[0x80]), 0);
        assert_eq!(SampleFormat::U8.decode(&[0x00]), -128);
    }

    #[test]
    fn test_decode_16bit_endianness() {
        assert_eq!(SampleFormat::S16_LE.decode(&[0xe8, 0x03]), 1000);
        assert_eq!(SampleFormat::S16_BE.decode(&[0x03, 0xe8]), 1000);
        assert_eq!(SampleFormat::S16_LE.decode(&[0x00, 0x80]), -32768);
    }

    #[test]
    fn test_decode_24bit_sign_extension() {
        assert_eq!(SampleFormat::S24_LE.decode(&[0xff, 0xff, 0xff, 0x00]), -1);
        assert_eq!(SampleFormat::S24_BE.decode(&[0x00, 0x7f, 0xff, 0xff]), 0x7f_ffff);
        // padding byte is ignored
        assert_eq!(SampleFormat::S24_LE.decode(&[0x01, 0x00, 0x00, 0xff]), 1);
    }

    #[test]
    fn test_decode_32bit() {
        assert_eq!(SampleFormat::S32_BE.decode(&[0x80, 0, 0, 0]), i32::MIN as i64);
        assert_eq!(SampleFormat::S32_LE.decode(&[0x01, 0, 0, 0]), 1);
    }
}
