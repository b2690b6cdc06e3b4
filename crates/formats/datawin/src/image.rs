//! Still-image header inspection.
//!
//! The archive stores texture pages as complete image files with no length
//! field of their own, so the encoded size has to be recovered by walking the
//! image's chunk structure. Pixel data is never decoded.

use std::io::{self, Read, Seek, SeekFrom};

use thiserror::Error;

use crate::asset::Dimensions;

const PNG_SIGNATURE: [u8; 8] = *b"\x89PNG\r\n\x1a\n";
/// IHDR chunk including its length, name and CRC fields.
const PNG_IHDR_SIZE: usize = 25;
/// Length + name + CRC around every chunk body.
const PNG_CHUNK_OVERHEAD: u64 = 12;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("{0}")]
    NotRecognized(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// What the archive needs to know about an embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Exact encoded length in bytes, from the signature through the end marker.
    pub encoded_size: u64,
    pub dimensions: Dimensions,
}

/// Capability for describing an image that starts at the stream's current
/// position.
///
/// Implementations may leave the stream anywhere; callers re-seek.
pub trait ImageDescriptor {
    fn describe<R: Read + Seek>(&self, reader: &mut R) -> Result<ImageInfo, ImageError>;
}

/// PNG implementation of [`ImageDescriptor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PngDescriptor;

impl ImageDescriptor for PngDescriptor {
    fn describe<R: Read + Seek>(&self, reader: &mut R) -> Result<ImageInfo, ImageError> {
        let mut signature = [0u8; 8];
        reader.read_exact(&mut signature)?;
        if signature != PNG_SIGNATURE {
            return Err(ImageError::NotRecognized(format!("bad PNG signature {signature:02x?}")));
        }

        let mut ihdr = [0u8; PNG_IHDR_SIZE];
        reader.read_exact(&mut ihdr)?;
        let length = be_u32(&ihdr[0..4]);
        if length != 13 {
            return Err(ImageError::NotRecognized(format!("IHDR length {length}, expected 13")));
        }
        if &ihdr[4..8] != b"IHDR" {
            return Err(ImageError::NotRecognized("first chunk is not IHDR".to_string()));
        }

        let width = be_u32(&ihdr[8..12]);
        let height = be_u32(&ihdr[12..16]);
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(ImageError::NotRecognized(format!("dimensions {width}x{height} too large")));
        }
        let (bit_depth, color_type, compression, filter, interlace) =
            (ihdr[16], ihdr[17], ihdr[18], ihdr[19], ihdr[20]);
        if !matches!(bit_depth, 1 | 2 | 4 | 8 | 16) {
            return Err(ImageError::NotRecognized(format!("bit depth {bit_depth}")));
        }
        if !matches!(color_type, 0 | 2 | 3 | 4 | 6) {
            return Err(ImageError::NotRecognized(format!("colour type {color_type}")));
        }
        if compression != 0 || filter != 0 {
            return Err(ImageError::NotRecognized(format!(
                "compression method {compression}, filter method {filter}"
            )));
        }
        if interlace > 1 {
            return Err(ImageError::NotRecognized(format!("interlace method {interlace}")));
        }

        let mut encoded_size = (PNG_SIGNATURE.len() + PNG_IHDR_SIZE) as u64;
        loop {
            let mut header = [0u8; 8];
            reader.read_exact(&mut header)?;
            let body = u64::from(be_u32(&header[0..4]));
            let name = &header[4..8];
            if !name.iter().all(u8::is_ascii_alphabetic) {
                return Err(ImageError::NotRecognized(format!("bad chunk name {name:02x?}")));
            }
            encoded_size += body + PNG_CHUNK_OVERHEAD;
            if name == b"IEND" {
                break;
            }
            // Skip body + CRC.
            reader.seek(SeekFrom::Current((body + 4) as i64))?;
        }

        Ok(ImageInfo {
            encoded_size,
            dimensions: Dimensions { width, height },
        })
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
