//! TXTR: embedded texture pages.
//!
//! Layout: `count:u32`, `count × pointer:u32` (each to an 8-byte record),
//! `count × {1:u32, data_offset:u32}`, then raw image bytes at each
//! `data_offset`. The first record field is not understood; every archive
//! seen so far stores `1` there, so anything else is rejected.

use std::io::{Read, Seek, Write};

use tracing::debug;

use crate::asset::AssetType;
use crate::chunk::CHUNK_HEADER_SIZE;
use crate::cursor::{Reader, Writer};
use crate::error::{Error, Result};
use crate::image::{ImageDescriptor, ImageError};
use crate::patch::PatchedChunk;
use crate::reader::{check_offset, check_within, ChunkDescriptor, EntryDescriptor};
use crate::writer::write_payload;

/// Value required in the first field of every texture record.
pub const RECORD_MARKER: u32 = 1;
/// Size of a texture record (marker + data offset).
pub const RECORD_SIZE: u32 = 8;

/// Parse the texture sub-index of `chunk`.
pub(crate) fn read_entries<R, D>(r: &mut Reader<'_, R>, chunk: &ChunkDescriptor, images: &D) -> Result<Vec<EntryDescriptor>>
where
    R: Read + Seek,
    D: ImageDescriptor,
{
    let pointers = read_pointer_table(r, chunk)?;

    let mut entries = Vec::with_capacity(pointers.len());
    for (index, record) in pointers.into_iter().enumerate() {
        let record = u64::from(record);
        check_within(chunk, record, u64::from(RECORD_SIZE), "texture record")?;
        r.seek(record)?;
        let marker = r.read_u32()?;
        if marker != RECORD_MARKER {
            return Err(Error::UnsupportedFormat {
                offset: record,
                message: format!(
                    "{} entry {index}: unexpected value of non-reverse engineered field: value = {marker}",
                    chunk.kind
                ),
            });
        }
        let data_offset = check_offset(r.read_u32()?, "texture data offset", record + 4)?;

        let start = u64::from(data_offset);
        r.seek(start)?;
        let info = images.describe(r.inner_mut()).map_err(|e| match e {
            ImageError::Io(source) => Error::Io {
                context: format!("{} entry {index}: reading image at offset {start:#x}", chunk.kind),
                source,
            },
            source => Error::UnrecognizedImage {
                chunk: chunk.kind,
                index,
                offset: start,
                source,
            },
        })?;
        check_within(chunk, start, info.encoded_size, "texture data")?;

        debug!(index, offset = data_offset, size = info.encoded_size, dims = %info.dimensions, "texture entry");
        entries.push(EntryDescriptor {
            offset: data_offset,
            // Fits: lies within a chunk bounded by MAX_OFFSET.
            size: info.encoded_size as u32,
            asset_type: AssetType::Png,
            dimensions: Some(info.dimensions),
        });
    }
    Ok(entries)
}

/// Rewrite a texture chunk's payload: count, recomputed pointer table,
/// records, then every entry's bytes at its (possibly shifted) offset.
pub(crate) fn write_chunk<R, W>(source: &mut R, chunk: &PatchedChunk<'_>, w: &mut Writer<'_, W>) -> Result<()>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let count = chunk.entries.len() as u32;
    let base = u64::from(chunk.header_offset) + u64::from(CHUNK_HEADER_SIZE);
    // Records follow the count field and the pointer table.
    let records = base + 4 + 4 * u64::from(count);

    w.seek(base)?;
    w.write_u32(count)?;
    for i in 0..u64::from(count) {
        w.write_u32((records + i * u64::from(RECORD_SIZE)) as u32)?;
    }
    for entry in &chunk.entries {
        w.write_u32(RECORD_MARKER)?;
        w.write_u32(entry.offset)?;
    }

    for (index, entry) in chunk.entries.iter().enumerate() {
        w.seek(u64::from(entry.offset))?;
        match entry.patch {
            Some(patch) => {
                debug!(index, offset = entry.offset, size = entry.size, "writing replacement texture");
                write_payload(w, patch)?;
            }
            None => w.copy_from(source, u64::from(entry.original.offset), u64::from(entry.size))?,
        }
    }
    Ok(())
}

/// Read `count` followed by `count` pointers, checking the table fits the chunk.
pub(crate) fn read_pointer_table<R: Read + Seek>(r: &mut Reader<'_, R>, chunk: &ChunkDescriptor) -> Result<Vec<u32>> {
    let base = chunk.data_offset();
    r.seek(base)?;
    let count = r.read_u32()?;
    check_within(chunk, base, 4 + 4 * u64::from(count), "pointer table")?;

    let mut pointers = Vec::with_capacity(count as usize);
    for i in 0..u64::from(count) {
        let at = base + 4 + 4 * i;
        pointers.push(check_offset(r.read_u32()?, "entry pointer", at)?);
    }
    Ok(pointers)
}
