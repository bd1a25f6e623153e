//! Reversible byte compression for encoded frames

use crate::CodecError;
use bzip2::read::{BzDecoder, BzEncoder};
use flate2::read::{ZlibDecoder, ZlibEncoder};
use serde::{Deserialize, Serialize};
use std::io::Read;
use xz2::read::{XzDecoder, XzEncoder};

/// Compression applied to an encoded image before it is hidden
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// zlib-wrapped deflate at the best compression level
    #[default]
    Deflate,
    /// bzip2 at level 9
    Bzip2,
    /// xz (LZMA2) at preset 9
    Xz,
    /// Bytes stored as-is
    None,
}

impl Compression {
    pub fn compress(self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(data.len() / 2);
        match self {
            Self::Deflate => {
                ZlibEncoder::new(data, flate2::Compression::best())
                    .read_to_end(&mut out)
                    .map_err(|e| CodecError::Compression(format!("deflate: {e}")))?;
            }
            Self::Bzip2 => {
                BzEncoder::new(data, bzip2::Compression::best())
                    .read_to_end(&mut out)
                    .map_err(|e| CodecError::Compression(format!("bzip2: {e}")))?;
            }
            Self::Xz => {
                XzEncoder::new(data, 9)
                    .read_to_end(&mut out)
                    .map_err(|e| CodecError::Compression(format!("xz: {e}")))?;
            }
            Self::None => out.extend_from_slice(data),
        }
        Ok(out)
    }

    pub fn decompress(self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(data.len() * 2);
        match self {
            Self::Deflate => {
                ZlibDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| CodecError::Compression(format!("inflate: {e}")))?;
            }
            Self::Bzip2 => {
                BzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| CodecError::Compression(format!("bunzip2: {e}")))?;
            }
            Self::Xz => {
                XzDecoder::new(data)
                    .read_to_end(&mut out)
                    .map_err(|e| CodecError::Compression(format!("unxz: {e}")))?;
            }
            Self::None => out.extend_from_slice(data),
        }
        Ok(out)
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Deflate => "deflate",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::None => "none",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Compression {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deflate" | "zlib" => Ok(Self::Deflate),
            "bzip2" | "bz2" => Ok(Self::Bzip2),
            "xz" | "lzma" => Ok(Self::Xz),
            "none" | "store" => Ok(Self::None),
            _ => Err(CodecError::Unsupported(format!(
                "unknown compression '{s}'. Expected: deflate, bzip2, xz, none"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"\x89PNG\r\n\x1a\n some highly repetitive bytes bytes bytes bytes bytes";

    #[test]
    fn test_every_method_is_reversible() {
        for method in [
            Compression::Deflate,
            Compression::Bzip2,
            Compression::Xz,
            Compression::None,
        ] {
            let packed = method.compress(SAMPLE).unwrap();
            assert_eq!(method.decompress(&packed).unwrap(), SAMPLE, "{method}");
        }
    }

    #[test]
    fn test_none_is_identity() {
        assert_eq!(Compression::None.compress(SAMPLE).unwrap(), SAMPLE);
    }

    #[test]
    fn test_garbage_fails_to_decompress() {
        let err = Compression::Deflate.decompress(b"not zlib").unwrap_err();
        assert!(matches!(err, CodecError::Compression(_)));
        assert!(Compression::Bzip2.decompress(b"BZh9 nope").is_err());
        assert!(Compression::Xz.decompress(b"\xfd7zXZ\x00 nope").is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("bz2".parse::<Compression>().unwrap(), Compression::Bzip2);
        assert_eq!("Deflate".parse::<Compression>().unwrap(), Compression::Deflate);
        assert_eq!("lzma".parse::<Compression>().unwrap(), Compression::Xz);
        assert_eq!(Compression::Xz.to_string(), "xz");
        assert!("zstd".parse::<Compression>().is_err());
        assert_eq!(Compression::None.to_string(), "none");
    }
}
