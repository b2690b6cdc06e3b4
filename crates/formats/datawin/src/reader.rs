use std::io::{Read, Seek};

use tracing::{debug, info};

use crate::asset::{AssetType, Dimensions};
use crate::chunk::{escape_magic, ChunkKind, CHUNK_HEADER_SIZE};
use crate::chunks::{audo, txtr};
use crate::cursor::Reader;
use crate::error::{Error, Result};
use crate::image::{ImageDescriptor, PngDescriptor};

/// Magic bytes for the FORM container.
pub const FORM_MAGIC: [u8; 4] = *b"FORM";

/// Largest offset or size the format allows (offsets must fit an `i32`).
pub const MAX_OFFSET: u32 = i32::MAX as u32;

/// One asset inside a texture or audio chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    /// Absolute offset of the asset bytes. For audio this is just past the
    /// 4-byte size prefix.
    pub offset: u32,
    /// Length of the asset bytes.
    pub size: u32,
    pub asset_type: AssetType,
    /// Pixel dimensions, for texture entries only.
    pub dimensions: Option<Dimensions>,
}

/// A single top-level chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub kind: ChunkKind,
    /// Absolute byte offset of the chunk header (name field).
    pub header_offset: u32,
    /// Size of the chunk's content, excluding the 8-byte header.
    pub payload_size: u32,
    /// Parsed sub-index; empty for chunks that are not relocatable.
    pub entries: Vec<EntryDescriptor>,
}

impl ChunkDescriptor {
    /// Absolute offset where chunk content begins.
    pub fn data_offset(&self) -> u64 {
        u64::from(self.header_offset) + u64::from(CHUNK_HEADER_SIZE)
    }

    /// Absolute offset one past the end of the chunk content.
    pub fn end_offset(&self) -> u64 {
        self.data_offset() + u64::from(self.payload_size)
    }
}

/// Index of a fully scanned FORM archive.
///
/// Built once per read pass and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveIndex {
    /// Ordered list of chunks as they appear in the file.
    chunks: Vec<ChunkDescriptor>,
}

impl ArchiveIndex {
    pub(crate) fn new(chunks: Vec<ChunkDescriptor>) -> Self {
        Self { chunks }
    }

    /// All chunks in file order.
    pub fn chunks(&self) -> &[ChunkDescriptor] {
        &self.chunks
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Find a chunk by kind. Returns the first match.
    pub fn find(&self, kind: ChunkKind) -> Option<&ChunkDescriptor> {
        self.chunks.iter().find(|c| c.kind == kind)
    }

    /// Logical length of the container payload (everything after the FORM header).
    pub fn form_size(&self) -> u64 {
        self.chunks
            .iter()
            .map(|c| u64::from(c.payload_size) + u64::from(CHUNK_HEADER_SIZE))
            .sum()
    }

    /// Read the bytes of one texture or audio entry from the indexed source.
    pub fn read_entry<R: Read + Seek>(&self, source: &mut R, kind: ChunkKind, index: usize) -> Result<Vec<u8>> {
        let chunk = self.find(kind).ok_or(Error::UnknownChunk { chunk: kind })?;
        let entry = chunk.entries.get(index).ok_or(Error::IndexOutOfRange {
            chunk: kind,
            index,
            count: chunk.entries.len(),
        })?;
        let mut r = Reader::new(source)?;
        r.seek(u64::from(entry.offset))?;
        r.read_vec(entry.size as usize)
    }
}

/// Scan a FORM archive, describing texture entries as PNG.
pub fn read_index<R: Read + Seek>(source: &mut R) -> Result<ArchiveIndex> {
    read_index_with(source, &PngDescriptor)
}

/// Scan a FORM archive with a caller-supplied image collaborator.
pub fn read_index_with<R, D>(source: &mut R, images: &D) -> Result<ArchiveIndex>
where
    R: Read + Seek,
    D: ImageDescriptor,
{
    let mut r = Reader::new(source)?;

    let magic = r.read_magic()?;
    if magic != FORM_MAGIC {
        return Err(Error::UnsupportedFormat {
            offset: 0,
            message: format!("unsupported file magic '{}'", escape_magic(&magic)),
        });
    }
    let form_size = r.read_u32()?;
    let form_end = u64::from(CHUNK_HEADER_SIZE) + u64::from(form_size);

    let mut chunks = Vec::new();
    let mut offset = u64::from(CHUNK_HEADER_SIZE);
    while offset < form_end {
        r.seek(offset)?;
        let name = r.read_magic()?;
        let kind = ChunkKind::from_magic(&name).ok_or_else(|| Error::UnsupportedFormat {
            offset,
            message: format!("unsupported chunk name '{}'", escape_magic(&name)),
        })?;
        let size = r.read_u32()?;

        // offset + header + size must stay addressable as an i32.
        let limit = u64::from(MAX_OFFSET);
        if u64::from(size) > limit - u64::from(CHUNK_HEADER_SIZE)
            || offset > limit - u64::from(CHUNK_HEADER_SIZE) - u64::from(size)
        {
            return Err(Error::Overflow {
                what: "chunk size",
                offset,
                value: i64::from(size),
                max: i64::from(MAX_OFFSET) - i64::from(CHUNK_HEADER_SIZE),
            });
        }
        let end = offset + u64::from(CHUNK_HEADER_SIZE) + u64::from(size);
        if end > form_end {
            return Err(Error::Corrupt {
                offset,
                message: format!(
                    "{kind} chunk overflows container: chunk size = {}, container end = {form_end:#x}",
                    u64::from(size) + u64::from(CHUNK_HEADER_SIZE)
                ),
            });
        }

        let mut chunk = ChunkDescriptor {
            kind,
            // Bounded by MAX_OFFSET above.
            header_offset: offset as u32,
            payload_size: size,
            entries: Vec::new(),
        };
        chunk.entries = match kind {
            ChunkKind::Textures => txtr::read_entries(&mut r, &chunk, images)?,
            ChunkKind::Audio => audo::read_entries(&mut r, &chunk)?,
            _ => Vec::new(),
        };
        debug!(
            chunk = %kind,
            offset = chunk.header_offset,
            size = chunk.payload_size,
            entries = chunk.entries.len(),
            "indexed chunk"
        );
        chunks.push(chunk);

        offset = end;
    }

    info!(chunks = chunks.len(), form_size, "indexed archive");
    Ok(ArchiveIndex::new(chunks))
}

/// Validate a raw u32 read from a pointer table.
pub(crate) fn check_offset(value: u32, what: &'static str, at: u64) -> Result<u32> {
    if value > MAX_OFFSET {
        return Err(Error::Overflow {
            what,
            offset: at,
            value: i64::from(value),
            max: i64::from(MAX_OFFSET),
        });
    }
    Ok(value)
}

/// Check that `[start, start + len)` lies within the chunk's payload.
pub(crate) fn check_within(chunk: &ChunkDescriptor, start: u64, len: u64, what: &str) -> Result<()> {
    if start < chunk.data_offset() || start + len > chunk.end_offset() {
        return Err(Error::Corrupt {
            offset: start,
            message: format!(
                "{} {what} ({len} bytes) lies outside chunk payload {:#x}..{:#x}",
                chunk.kind,
                chunk.data_offset(),
                chunk.end_offset()
            ),
        });
    }
    Ok(())
}
