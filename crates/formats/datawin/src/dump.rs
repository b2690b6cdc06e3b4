//! Read-only consumers of an [`ArchiveIndex`]: entry extraction and the
//! tabular listing.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::cursor::Writer;
use crate::error::{IoContext, Result};
use crate::reader::ArchiveIndex;

/// Extract every texture and audio entry to `<outdir>/<kind>/<NNNN><ext>`.
///
/// Returns the written paths in index order.
pub fn dump_entries<R: Read + Seek>(index: &ArchiveIndex, source: &mut R, outdir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for chunk in index.chunks().iter().filter(|c| c.kind.is_relocatable()) {
        let dir = outdir.join(chunk.kind.dir_name());
        fs::create_dir_all(&dir).io_context(|| format!("creating {}", dir.display()))?;

        for (i, entry) in chunk.entries.iter().enumerate() {
            let path = dir.join(format!("{i:04}{}", entry.asset_type.extension()));
            let file = File::create(&path).io_context(|| format!("creating {}", path.display()))?;
            let mut out = BufWriter::new(file);
            let mut w = Writer::new(&mut out)?;
            w.copy_from(source, u64::from(entry.offset), u64::from(entry.size))?;
            w.finish(u64::from(entry.size))?;
            written.push(path);
        }
    }

    info!(files = written.len(), outdir = %outdir.display(), "dumped entries");
    Ok(written)
}

/// Print the index as a table: one row per chunk and, for texture and audio
/// chunks, one row per entry.
pub fn write_listing<W: Write>(index: &ArchiveIndex, out: &mut W) -> io::Result<()> {
    writeln!(out, "Offset       Size             Type      Index Info")?;
    for chunk in index.chunks() {
        write!(
            out,
            "0x{:010X} 0x{:010X} --- {:<9} -----",
            chunk.header_offset,
            chunk.payload_size,
            chunk.kind.name()
        )?;
        if !chunk.kind.is_relocatable() {
            writeln!(out)?;
            continue;
        }

        writeln!(out, " {} entries", chunk.entries.len())?;
        for (i, entry) in chunk.entries.iter().enumerate() {
            write!(
                out,
                "0x{:010X} 0x{:010X}     {:<9} {:>5}",
                entry.offset,
                entry.size,
                entry.asset_type.to_string(),
                i
            )?;
            if let Some(dims) = entry.dimensions {
                write!(out, " {:>4} x {:<4}", dims.width, dims.height)?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetType, Dimensions};
    use crate::chunk::ChunkKind;
    use crate::reader::{ChunkDescriptor, EntryDescriptor};

    #[test]
    fn listing_format() {
        let index = ArchiveIndex::new(vec![
            ChunkDescriptor {
                kind: ChunkKind::GeneralInfo,
                header_offset: 8,
                payload_size: 252,
                entries: vec![],
            },
            ChunkDescriptor {
                kind: ChunkKind::Textures,
                header_offset: 268,
                payload_size: 0x400,
                entries: vec![EntryDescriptor {
                    offset: 0x120,
                    size: 0x2e0,
                    asset_type: AssetType::Png,
                    dimensions: Some(Dimensions { width: 512, height: 64 }),
                }],
            },
        ]);

        let mut out = Vec::new();
        write_listing(&index, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Offset       Size             Type      Index Info");
        assert_eq!(lines[1], "0x0000000008 0x00000000FC --- GEN8      -----");
        assert_eq!(lines[2], "0x000000010C 0x0000000400 --- TXTR      ----- 1 entries");
        assert_eq!(lines[3], "0x0000000120 0x00000002E0     PNG           0  512 x 64  ");
    }
}
