//! Patch requests and the planner that turns them into a shifted index.
//!
//! Planning is a fold: each request consumes the current [`PatchedIndex`] and
//! yields the next one, with the size delta already propagated to every
//! sibling entry and every later chunk. A rejected request drops the
//! in-progress index, so nothing observable changes on failure.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::asset::{AssetType, Dimensions, SNIFF_LEN};
use crate::chunk::{ChunkKind, CHUNK_HEADER_SIZE};
use crate::error::{Error, IoContext, Result};
use crate::image::{ImageDescriptor, ImageError, ImageInfo, PngDescriptor};
use crate::reader::{ArchiveIndex, ChunkDescriptor, EntryDescriptor, MAX_OFFSET};

/// Where replacement bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchSource {
    /// Bytes held in memory.
    Memory(Vec<u8>),
    /// Bytes read from the start of a file at write time.
    File(PathBuf),
}

/// A request to replace one texture or audio entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRequest {
    pub chunk: ChunkKind,
    pub index: usize,
    /// Must equal the type recorded for the target entry.
    pub asset_type: AssetType,
    pub source: PatchSource,
    /// Number of payload bytes to write.
    pub size: u32,
    /// Must equal the target's dimensions for texture patches.
    pub dimensions: Option<Dimensions>,
}

impl PatchRequest {
    pub fn new(chunk: ChunkKind, index: usize, asset_type: AssetType, source: PatchSource, size: u32) -> Self {
        Self {
            chunk,
            index,
            asset_type,
            source,
            size,
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Texture replacement from in-memory PNG bytes. Size and dimensions come
    /// from the image header; trailing bytes past the image end are not written.
    pub fn texture_from_bytes(index: usize, data: Vec<u8>) -> Result<Self> {
        let info = describe_patch_image(&mut std::io::Cursor::new(&data), index)?;
        let size = patch_size(info.encoded_size)?;
        Ok(Self::new(ChunkKind::Textures, index, AssetType::Png, PatchSource::Memory(data), size)
            .with_dimensions(info.dimensions))
    }

    /// Texture replacement referencing a PNG file on disk.
    pub fn texture_from_file(index: usize, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path).io_context(|| format!("opening {}", path.display()))?;
        let info = describe_patch_image(&mut BufReader::new(file), index)?;
        let size = patch_size(info.encoded_size)?;
        Ok(Self::new(ChunkKind::Textures, index, AssetType::Png, PatchSource::File(path), size)
            .with_dimensions(info.dimensions))
    }

    /// Audio replacement from in-memory bytes; the type is sniffed.
    pub fn audio_from_bytes(index: usize, data: Vec<u8>) -> Result<Self> {
        let size = patch_size(data.len() as u64)?;
        let asset_type = AssetType::sniff(&data[..data.len().min(SNIFF_LEN)]);
        Ok(Self::new(ChunkKind::Audio, index, asset_type, PatchSource::Memory(data), size))
    }

    /// Audio replacement referencing a file on disk; the type is sniffed and
    /// the size is the file length.
    pub fn audio_from_file(index: usize, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut file = File::open(&path).io_context(|| format!("opening {}", path.display()))?;
        let len = file
            .metadata()
            .io_context(|| format!("reading metadata of {}", path.display()))?
            .len();
        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        file.by_ref()
            .take(SNIFF_LEN as u64)
            .read_to_end(&mut prefix)
            .io_context(|| format!("reading {}", path.display()))?;
        let size = patch_size(len)?;
        Ok(Self::new(ChunkKind::Audio, index, AssetType::sniff(&prefix), PatchSource::File(path), size))
    }

    /// Path of the payload file, if the payload is not in memory.
    pub fn file(&self) -> Option<&Path> {
        match &self.source {
            PatchSource::File(path) => Some(path),
            PatchSource::Memory(_) => None,
        }
    }
}

fn describe_patch_image<R: Read + Seek>(reader: &mut R, index: usize) -> Result<ImageInfo> {
    PngDescriptor.describe(reader).map_err(|e| match e {
        ImageError::Io(source) => Error::Io {
            context: format!("reading replacement image for TXTR entry {index}"),
            source,
        },
        source => Error::UnrecognizedImage {
            chunk: ChunkKind::Textures,
            index,
            offset: 0,
            source,
        },
    })
}

fn patch_size(len: u64) -> Result<u32> {
    if len > u64::from(MAX_OFFSET) {
        return Err(Error::Overflow {
            what: "patch size",
            offset: 0,
            value: i64::try_from(len).unwrap_or(i64::MAX),
            max: i64::from(MAX_OFFSET),
        });
    }
    Ok(len as u32)
}

/// An entry of the patched index: current placement plus what to write there.
#[derive(Debug, Clone)]
pub struct PatchedEntry<'a> {
    pub offset: u32,
    pub size: u32,
    pub patch: Option<&'a PatchRequest>,
    pub original: &'a EntryDescriptor,
}

/// A chunk of the patched index.
#[derive(Debug, Clone)]
pub struct PatchedChunk<'a> {
    pub kind: ChunkKind,
    pub header_offset: u32,
    pub payload_size: u32,
    pub entries: Vec<PatchedEntry<'a>>,
    pub original: &'a ChunkDescriptor,
}

impl<'a> PatchedChunk<'a> {
    fn new(original: &'a ChunkDescriptor) -> Self {
        Self {
            kind: original.kind,
            header_offset: original.header_offset,
            payload_size: original.payload_size,
            entries: original
                .entries
                .iter()
                .map(|entry| PatchedEntry {
                    offset: entry.offset,
                    size: entry.size,
                    patch: None,
                    original: entry,
                })
                .collect(),
            original,
        }
    }

    fn shift(&mut self, delta: i64) -> Result<()> {
        self.header_offset = shifted(self.header_offset, delta, "chunk offset", self.original.header_offset)?;
        for entry in &mut self.entries {
            entry.offset = shifted(entry.offset, delta, "entry offset", entry.original.offset)?;
        }
        Ok(())
    }

    /// The chunk must end within the addressable range, like any chunk the
    /// reader accepts.
    fn check_end(&self) -> Result<()> {
        let end = u64::from(self.header_offset) + u64::from(CHUNK_HEADER_SIZE) + u64::from(self.payload_size);
        if end > u64::from(MAX_OFFSET) {
            return Err(Error::Overflow {
                what: "chunk end",
                offset: u64::from(self.original.header_offset),
                value: end as i64,
                max: i64::from(MAX_OFFSET),
            });
        }
        Ok(())
    }
}

/// The archive layout after applying a batch of patch requests.
#[derive(Debug, Clone)]
pub struct PatchedIndex<'a> {
    chunks: Vec<PatchedChunk<'a>>,
}

impl<'a> PatchedIndex<'a> {
    /// Unpatched copy of `index`.
    pub fn new(index: &'a ArchiveIndex) -> Self {
        Self {
            chunks: index.chunks().iter().map(PatchedChunk::new).collect(),
        }
    }

    pub fn chunks(&self) -> &[PatchedChunk<'a>] {
        &self.chunks
    }

    pub fn find(&self, kind: ChunkKind) -> Option<&PatchedChunk<'a>> {
        self.chunks.iter().find(|c| c.kind == kind)
    }

    /// Container payload size: every chunk's payload plus its header.
    pub fn form_size(&self) -> u64 {
        self.chunks
            .iter()
            .map(|c| u64::from(c.payload_size) + u64::from(CHUNK_HEADER_SIZE))
            .sum()
    }

    /// Apply one request, returning the shifted index.
    pub fn apply(mut self, request: &'a PatchRequest) -> Result<Self> {
        let kind = request.chunk;
        let pos = self
            .chunks
            .iter()
            .position(|c| c.kind == kind)
            .ok_or(Error::UnknownChunk { chunk: kind })?;
        if !kind.is_relocatable() {
            return Err(Error::UnsupportedOperation {
                chunk: kind,
                operation: "patch",
            });
        }

        let (chunk, tail) = self.chunks[pos..].split_first_mut().ok_or(Error::UnknownChunk { chunk: kind })?;

        let index = request.index;
        let count = chunk.entries.len();
        let entry = chunk.entries.get(index).ok_or(Error::IndexOutOfRange { chunk: kind, index, count })?;
        if entry.patch.is_some() {
            return Err(Error::AlreadyPatched { chunk: kind, index });
        }
        if entry.original.asset_type != request.asset_type {
            return Err(Error::TypeMismatch {
                chunk: kind,
                index,
                expected: request.asset_type,
                found: entry.original.asset_type,
            });
        }
        // Sprite geometry elsewhere in the archive refers to texture pages by
        // value, so a page may never change size in pixels.
        if kind == ChunkKind::Textures {
            if let Some(found) = entry.original.dimensions {
                if request.dimensions != Some(found) {
                    return Err(Error::DimensionMismatch {
                        chunk: kind,
                        index,
                        expected: request.dimensions,
                        found,
                    });
                }
            }
        }

        let delta = i64::from(request.size) - i64::from(entry.size);
        let patched_offset = entry.offset;
        let entry_end = u64::from(patched_offset) + u64::from(request.size);
        if entry_end > u64::from(MAX_OFFSET) {
            return Err(Error::Overflow {
                what: "entry end",
                offset: u64::from(entry.original.offset),
                value: entry_end as i64,
                max: i64::from(MAX_OFFSET),
            });
        }
        chunk.payload_size = shifted(chunk.payload_size, delta, "chunk size", chunk.original.header_offset)?;
        chunk.check_end()?;

        let entry = &mut chunk.entries[index];
        entry.size = request.size;
        entry.patch = Some(request);

        // Entries are not stored in offset order; scan all siblings.
        for (i, other) in chunk.entries.iter_mut().enumerate() {
            if i != index && other.offset > patched_offset {
                other.offset = shifted(other.offset, delta, "entry offset", other.original.offset)?;
            }
        }

        for later in tail.iter_mut() {
            if !later.kind.is_relocatable() {
                return Err(Error::UnsupportedOperation {
                    chunk: later.kind,
                    operation: "move",
                });
            }
            later.shift(delta)?;
            later.check_end()?;
        }

        debug!(chunk = %kind, index, delta, new_size = request.size, "applied patch");
        Ok(self)
    }
}

/// Plan a batch of patches against `index`, in request order.
pub fn plan<'a>(index: &'a ArchiveIndex, requests: &'a [PatchRequest]) -> Result<PatchedIndex<'a>> {
    requests.iter().try_fold(PatchedIndex::new(index), PatchedIndex::apply)
}

fn shifted(value: u32, delta: i64, what: &'static str, at: u32) -> Result<u32> {
    let moved = i64::from(value) + delta;
    if !(0..=i64::from(MAX_OFFSET)).contains(&moved) {
        return Err(Error::Overflow {
            what,
            offset: u64::from(at),
            value: moved,
            max: i64::from(MAX_OFFSET),
        });
    }
    Ok(moved as u32)
}
