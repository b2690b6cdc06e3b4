#![allow(dead_code)]

//! Synthetic archives for integration tests.
//!
//! Texture and audio chunks are laid out the way the writer emits them:
//! pointer table, records, then entry bytes back to back with no padding.
//! Archives built here therefore round-trip byte for byte.

use datawin::ChunkKind;

const PNG_SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    body: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute offset the next chunk header will land at.
    fn next_offset(&self) -> u32 {
        8 + self.body.len() as u32
    }

    /// Append a chunk with an arbitrary name and payload.
    pub fn raw(mut self, name: &[u8; 4], payload: &[u8]) -> Self {
        self.body.extend_from_slice(name);
        put(&mut self.body, payload.len() as u32);
        self.body.extend_from_slice(payload);
        self
    }

    pub fn opaque(self, kind: ChunkKind, payload: &[u8]) -> Self {
        self.raw(kind.magic(), payload)
    }

    pub fn textures(self, pages: &[Vec<u8>]) -> Self {
        let data = self.next_offset() + 8;
        let count = pages.len() as u32;
        let mut payload = Vec::new();
        put(&mut payload, count);
        let records = data + 4 + 4 * count;
        for i in 0..count {
            put(&mut payload, records + 8 * i);
        }
        let mut at = records + 8 * count;
        for page in pages {
            put(&mut payload, 1);
            put(&mut payload, at);
            at += page.len() as u32;
        }
        for page in pages {
            payload.extend_from_slice(page);
        }
        self.raw(b"TXTR", &payload)
    }

    pub fn audio(self, clips: &[Vec<u8>]) -> Self {
        let data = self.next_offset() + 8;
        let count = clips.len() as u32;
        let mut payload = Vec::new();
        put(&mut payload, count);
        let mut at = data + 4 + 4 * count;
        for clip in clips {
            put(&mut payload, at);
            at += 4 + clip.len() as u32;
        }
        for clip in clips {
            put(&mut payload, clip.len() as u32);
            payload.extend_from_slice(clip);
        }
        self.raw(b"AUDO", &payload)
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = b"FORM".to_vec();
        put(&mut out, self.body.len() as u32);
        out.extend(self.body);
        out
    }
}

fn put(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn png_chunk(out: &mut Vec<u8>, name: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(body);
    // CRC is never checked.
    out.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
}

/// A structurally valid PNG: IHDR, one IDAT of `idat_len` bytes, IEND.
pub fn png(width: u32, height: u32, idat_len: usize) -> Vec<u8> {
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);

    let mut out = PNG_SIGNATURE.to_vec();
    png_chunk(&mut out, b"IHDR", &ihdr);
    png_chunk(&mut out, b"IDAT", &vec![(idat_len % 251) as u8; idat_len]);
    png_chunk(&mut out, b"IEND", &[]);
    out
}

/// `len` bytes starting with a RIFF/WAVE header.
pub fn wav(len: usize) -> Vec<u8> {
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(len.saturating_sub(8) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.resize(len.max(12), 0x11);
    out
}

/// `len` bytes starting with an Ogg page marker.
pub fn ogg(len: usize) -> Vec<u8> {
    let mut out = b"OggS".to_vec();
    out.resize(len.max(4), 0x22);
    out
}

/// GEN8 and STRG, two textures, then wave, Ogg and unrecognized audio.
pub fn sample_archive() -> Vec<u8> {
    ArchiveBuilder::new()
        .opaque(ChunkKind::GeneralInfo, &[0x47; 32])
        .opaque(ChunkKind::Strings, b"\x05\0\0\0hello\0\0\0")
        .textures(&[png(64, 32, 100), png(16, 16, 10)])
        .audio(&[wav(40), ogg(30), b"MThd not audio".to_vec()])
        .build()
}
