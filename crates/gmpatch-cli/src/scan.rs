//! Bulk patch discovery: `<dir>/txtr/<index>.png` and `<dir>/audo/<index>.wav`
//! style replacement trees, as written by `gmpatch dump`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use datawin::{ChunkKind, PatchRequest};
use tracing::debug;

const TEXTURE_EXTENSIONS: &[&str] = &["png", "dat"];
const AUDIO_EXTENSIONS: &[&str] = &["wav", "ogg", "dat"];

/// Collect patch requests for every recognised file under `dir`.
///
/// Either subdirectory may be missing. Requests reference the files; nothing
/// is read into memory beyond what is needed to describe them.
pub fn scan_patch_dir(dir: &Path) -> Result<Vec<PatchRequest>> {
    let mut requests = Vec::new();

    for (index, path) in entry_files(&dir.join(ChunkKind::Textures.dir_name()), TEXTURE_EXTENSIONS)? {
        let request = PatchRequest::texture_from_file(index, &path)
            .with_context(|| format!("failed to read replacement texture {}", path.display()))?;
        requests.push(request);
    }
    for (index, path) in entry_files(&dir.join(ChunkKind::Audio.dir_name()), AUDIO_EXTENSIONS)? {
        let request = PatchRequest::audio_from_file(index, &path)
            .with_context(|| format!("failed to read replacement audio {}", path.display()))?;
        requests.push(request);
    }

    Ok(requests)
}

/// Files in `dir` named `<index>.<ext>`, sorted by index.
fn entry_files(dir: &Path, extensions: &[&str]) -> Result<Vec<(usize, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "no patch directory");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to list {}", dir.display())),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        let Some(index) = entry.file_name().to_str().and_then(|name| parse_entry_name(name, extensions)) else {
            debug!(path = %path.display(), "ignoring file");
            continue;
        };
        if path.is_file() {
            files.push((index, path));
        }
    }
    files.sort();
    Ok(files)
}

/// `"0012.PNG"` → `Some(12)` when `png` is an allowed extension.
fn parse_entry_name(name: &str, extensions: &[&str]) -> Option<usize> {
    let (stem, ext) = name.split_once('.')?;
    if !extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
        return None;
    }
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: u32 = stem.parse().ok()?;
    Some(index as usize)
}
