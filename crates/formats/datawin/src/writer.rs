use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunk::{ChunkKind, CHUNK_HEADER_SIZE};
use crate::chunks::{audo, txtr};
use crate::cursor::Writer;
use crate::error::{Error, IoContext, Result};
use crate::patch::{plan, PatchRequest, PatchSource, PatchedIndex};
use crate::reader::{read_index, FORM_MAGIC};

/// Stream a complete archive for `patched` into `output`.
///
/// Unpatched bytes are copied from `source`, which must be the archive the
/// index was built from. Regions not covered by any chunk structure or entry
/// (alignment padding inside texture and audio chunks) are written as zeros.
pub fn write_archive<R, W>(source: &mut R, patched: &PatchedIndex<'_>, output: &mut W) -> Result<()>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let form_size = patched.form_size();
    let form_size_u32 = u32::try_from(form_size).map_err(|_| Error::Overflow {
        what: "container size",
        offset: 4,
        value: i64::try_from(form_size).unwrap_or(i64::MAX),
        max: i64::from(u32::MAX),
    })?;

    let mut w = Writer::new(output)?;
    w.write_magic(&FORM_MAGIC)?;
    w.write_u32(form_size_u32)?;

    for chunk in patched.chunks() {
        w.seek(u64::from(chunk.header_offset))?;
        w.write_magic(chunk.kind.magic())?;
        w.write_u32(chunk.payload_size)?;

        match chunk.kind {
            ChunkKind::Textures => txtr::write_chunk(source, chunk, &mut w)?,
            ChunkKind::Audio => audo::write_chunk(source, chunk, &mut w)?,
            _ => w.copy_from(source, chunk.original.data_offset(), u64::from(chunk.payload_size))?,
        }
        debug!(chunk = %chunk.kind, offset = chunk.header_offset, size = chunk.payload_size, "wrote chunk");
    }

    w.finish(u64::from(CHUNK_HEADER_SIZE) + form_size)
}

/// Write a patch payload at the writer's current position.
pub(crate) fn write_payload<W: Write + Seek>(w: &mut Writer<'_, W>, patch: &PatchRequest) -> Result<()> {
    let len = u64::from(patch.size);
    match &patch.source {
        PatchSource::Memory(bytes) => {
            let Some(payload) = bytes.get(..patch.size as usize) else {
                return Err(Error::Io {
                    context: format!("{} entry {} payload", patch.chunk, patch.index),
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("payload holds {} bytes, request declares {}", bytes.len(), patch.size),
                    ),
                });
            };
            w.write_bytes(payload)
        }
        PatchSource::File(path) => {
            let file = File::open(path).io_context(|| format!("opening {}", path.display()))?;
            w.copy_stream(&mut BufReader::new(file), len, || path.display().to_string())
        }
    }
}

/// A fully written replacement archive waiting to be moved into place.
///
/// Dropping it before [`StagedArchive::install`] has removed the target
/// deletes the file.
#[derive(Debug)]
pub struct StagedArchive {
    path: PathBuf,
    keep: bool,
}

impl StagedArchive {
    /// Temporary path: the target's file name with `.tmp` appended.
    pub fn temp_path_for(target: &Path) -> PathBuf {
        let mut name = OsString::from(target.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace `target` with the staged file.
    ///
    /// Removes the target first, since renaming over an existing file fails
    /// on some platforms. From then on the staged file is the only copy, so a
    /// failed rename leaves it in place and names it in the error.
    pub fn install(mut self, target: &Path) -> Result<()> {
        match fs::remove_file(target) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).io_context(|| format!("removing original archive {}", target.display())),
        }
        self.keep = true;
        fs::rename(&self.path, target).io_context(|| {
            format!(
                "installing {}; the patched archive was left at {}",
                target.display(),
                self.path.display()
            )
        })?;
        info!(path = %target.display(), "installed archive");
        Ok(())
    }
}

impl Drop for StagedArchive {
    fn drop(&mut self) {
        if !self.keep {
            if let Err(e) = fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "failed to remove temporary archive");
                }
            }
        }
    }
}

/// Write `patched` next to `target` without touching `target` itself.
pub fn stage_archive<R: Read + Seek>(source: &mut R, patched: &PatchedIndex<'_>, target: &Path) -> Result<StagedArchive> {
    let path = StagedArchive::temp_path_for(target);
    let file = File::create(&path).io_context(|| format!("creating temp file {}", path.display()))?;
    // From here on the guard owns the file and cleans up on error.
    let staged = StagedArchive { path, keep: false };

    let mut out = BufWriter::new(file);
    write_archive(source, patched, &mut out)?;
    let file = out
        .into_inner()
        .map_err(|e| e.into_error())
        .io_context(|| format!("flushing {}", staged.path.display()))?;
    file.sync_all()
        .io_context(|| format!("syncing {}", staged.path.display()))?;

    info!(path = %staged.path.display(), "staged archive");
    Ok(staged)
}

/// Read `input`, apply `requests`, and install the result at `output`.
///
/// On any failure before install, `input` is untouched and no temporary file
/// is left behind. See [`StagedArchive::install`] for a failed rename.
pub fn patch_archive_to(input: &Path, output: &Path, requests: &[PatchRequest]) -> Result<()> {
    let staged = {
        let file = File::open(input).io_context(|| format!("opening archive {}", input.display()))?;
        let mut source = BufReader::new(file);
        let index = read_index(&mut source)?;
        let patched = plan(&index, requests)?;
        stage_archive(&mut source, &patched, output)?
    };
    // The source is closed by now; the target may be the same file.
    staged.install(output)
}

/// Patch the archive at `path` in place.
pub fn patch_archive(path: &Path, requests: &[PatchRequest]) -> Result<()> {
    patch_archive_to(path, path, requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_appends_suffix() {
        assert_eq!(
            StagedArchive::temp_path_for(Path::new("/games/csd/game.unx")),
            PathBuf::from("/games/csd/game.unx.tmp")
        );
    }

    #[test]
    fn dropped_stage_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.win.tmp");
        fs::write(&path, b"partial").unwrap();
        drop(StagedArchive {
            path: path.clone(),
            keep: false,
        });
        assert!(!path.exists());
    }

    #[test]
    fn failed_rename_keeps_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.win.tmp");
        fs::write(&path, b"patched").unwrap();
        let staged = StagedArchive {
            path: path.clone(),
            keep: false,
        };

        // No parent directory: the target is absent and the rename fails.
        let target = dir.path().join("missing").join("data.win");
        let err = staged.install(&target).unwrap_err();

        assert!(matches!(err, Error::Io { .. }), "{err}");
        assert!(err.to_string().contains("left at"), "{err}");
        assert!(err.to_string().contains(&path.display().to_string()), "{err}");
        assert_eq!(fs::read(&path).unwrap(), b"patched");
    }
}
