//! AUDO: embedded audio.
//!
//! Layout: `count:u32`, `count × offset:u32`; each offset points to a u32
//! length followed by that many bytes of audio.

use std::io::{Read, Seek, Write};

use tracing::debug;

use crate::asset::{AssetType, SNIFF_LEN};
use crate::chunk::CHUNK_HEADER_SIZE;
use crate::chunks::txtr::read_pointer_table;
use crate::cursor::{Reader, Writer};
use crate::error::Result;
use crate::patch::PatchedChunk;
use crate::reader::{check_offset, check_within, ChunkDescriptor, EntryDescriptor};
use crate::writer::write_payload;

/// Size of the length prefix in front of every audio entry.
pub const SIZE_PREFIX: u32 = 4;

/// Parse the audio sub-index of `chunk`.
pub(crate) fn read_entries<R: Read + Seek>(r: &mut Reader<'_, R>, chunk: &ChunkDescriptor) -> Result<Vec<EntryDescriptor>> {
    let pointers = read_pointer_table(r, chunk)?;

    let mut entries = Vec::with_capacity(pointers.len());
    for (index, ptr) in pointers.into_iter().enumerate() {
        let at = u64::from(ptr);
        check_within(chunk, at, u64::from(SIZE_PREFIX), "audio size prefix")?;
        r.seek(at)?;
        let size = check_offset(r.read_u32()?, "audio entry size", at)?;
        let data = at + u64::from(SIZE_PREFIX);
        check_within(chunk, data, u64::from(size), "audio data")?;

        let mut prefix = [0u8; SNIFF_LEN];
        let want = (size as usize).min(SNIFF_LEN);
        r.read_exact(&mut prefix[..want])?;
        let asset_type = AssetType::sniff(&prefix[..want]);

        debug!(index, offset = data, size, %asset_type, "audio entry");
        entries.push(EntryDescriptor {
            // Within the chunk, so within MAX_OFFSET.
            offset: data as u32,
            size,
            asset_type,
            dimensions: None,
        });
    }
    Ok(entries)
}

/// Rewrite an audio chunk's payload: count, pointer table (each pointing at a
/// size prefix), then size prefix + bytes for every entry.
pub(crate) fn write_chunk<R, W>(source: &mut R, chunk: &PatchedChunk<'_>, w: &mut Writer<'_, W>) -> Result<()>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let base = u64::from(chunk.header_offset) + u64::from(CHUNK_HEADER_SIZE);
    w.seek(base)?;
    w.write_u32(chunk.entries.len() as u32)?;
    for entry in &chunk.entries {
        w.write_u32(entry.offset - SIZE_PREFIX)?;
    }

    for (index, entry) in chunk.entries.iter().enumerate() {
        let prefix_at = u64::from(entry.offset - SIZE_PREFIX);
        w.seek(prefix_at)?;
        match entry.patch {
            Some(patch) => {
                debug!(index, offset = entry.offset, size = entry.size, "writing replacement audio");
                w.write_u32(patch.size)?;
                write_payload(w, patch)?;
            }
            None => w.copy_from(
                source,
                u64::from(entry.original.offset - SIZE_PREFIX),
                u64::from(entry.size) + u64::from(SIZE_PREFIX),
            )?,
        }
    }
    Ok(())
}
