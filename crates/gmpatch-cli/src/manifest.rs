use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use datawin::PatchRequest;
use serde::{Deserialize, Serialize};

/// File name searched for when `--manifest` is not given.
pub const DEFAULT_MANIFEST: &str = "gmpatch.json";

/// A batch of replacements for one archive, as stored in `gmpatch.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchManifest {
    /// Archive to read.
    pub archive: PathBuf,
    /// Where to write the result. Defaults to patching `archive` in place.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub patches: Vec<ManifestPatch>,
}

/// Chunks a manifest entry may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatchChunk {
    #[serde(rename = "TXTR", alias = "txtr")]
    Textures,
    #[serde(rename = "AUDO", alias = "audo")]
    Audio,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPatch {
    pub chunk: PatchChunk,
    pub index: usize,
    pub file: PathBuf,
}

impl PatchManifest {
    /// Target path for the patched archive.
    pub fn output_path(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.archive)
    }

    /// Build file-backed patch requests, describing each file up front.
    pub fn requests(&self) -> Result<Vec<PatchRequest>> {
        self.patches
            .iter()
            .map(|p| {
                let request = match p.chunk {
                    PatchChunk::Textures => PatchRequest::texture_from_file(p.index, &p.file),
                    PatchChunk::Audio => PatchRequest::audio_from_file(p.index, &p.file),
                };
                request.with_context(|| format!("failed to prepare patch from {}", p.file.display()))
            })
            .collect()
    }
}

/// Nearest `gmpatch.json` in `start` or any directory above it.
pub fn find_manifest_upward(start: &Path) -> Option<PathBuf> {
    let first = if start.is_dir() { start } else { start.parent()? };
    first
        .ancestors()
        .map(|dir| dir.join(DEFAULT_MANIFEST))
        .find(|candidate| candidate.is_file())
}

/// An explicit `--manifest` must exist; the default name may also be found
/// above the working directory.
fn locate_manifest(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if path.as_os_str() != DEFAULT_MANIFEST {
        bail!("manifest not found: {}", path.display());
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let found = find_manifest_upward(&cwd)
        .with_context(|| format!("no {DEFAULT_MANIFEST} in {} or its parents", cwd.display()))?;
    tracing::info!(path = %found.display(), "using manifest");
    Ok(found)
}

pub fn load_manifest(path: &Path) -> Result<PatchManifest> {
    let path = locate_manifest(path)?;
    let file = File::open(&path).with_context(|| format!("failed to open manifest: {}", path.display()))?;
    let mut manifest: PatchManifest = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse manifest: {}", path.display()))?;

    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to resolve manifest path: {}", path.display()))?;
    if let Some(base) = canonical.parent() {
        manifest.rebase(base);
    }
    Ok(manifest)
}

impl PatchManifest {
    /// Make the archive, output and patch file paths absolute under `base`.
    fn rebase(&mut self, base: &Path) {
        let paths = std::iter::once(&mut self.archive)
            .chain(self.output.as_mut())
            .chain(self.patches.iter_mut().map(|p| &mut p.file));
        for path in paths.filter(|p| p.is_relative()) {
            *path = base.join(&*path);
        }
    }
}
