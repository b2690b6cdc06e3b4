mod manifest;
mod scan;

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use datawin::dump::{dump_entries, write_listing};
use datawin::{patch_archive_to, read_index, ArchiveIndex, PatchRequest};
use tracing_subscriber::EnvFilter;

use crate::manifest::{load_manifest, DEFAULT_MANIFEST};
use crate::scan::scan_patch_dir;

#[derive(Parser)]
#[command(name = "gmpatch", about = "Inspect, dump and patch GameMaker data.win archives")]
struct Cli {
    /// Log every chunk, entry and patch as it is processed.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List chunks and their texture/audio entries.
    Info {
        /// Path to the archive (data.win, game.unx, ...).
        archive: PathBuf,
    },
    /// Extract every texture and audio entry into `<outdir>/txtr` and `<outdir>/audo`.
    Dump {
        archive: PathBuf,
        #[arg(default_value = ".")]
        outdir: PathBuf,
    },
    /// Patch the archive in place from `<dir>/txtr/<index>.png` and `<dir>/audo/<index>.wav|.ogg`.
    Update {
        archive: PathBuf,
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
    /// Replace individual entries.
    Patch {
        archive: PathBuf,
        /// Replace a texture page with a PNG file.
        #[arg(long = "texture", value_name = "INDEX=FILE")]
        textures: Vec<EntryFile>,
        /// Replace an audio entry with a WAVE, Ogg or raw file.
        #[arg(long = "audio", value_name = "INDEX=FILE")]
        audio: Vec<EntryFile>,
        /// Write the patched archive here instead of replacing the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a JSON patch manifest.
    Apply {
        /// Path to the patch manifest.
        #[arg(long, default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,
    },
}

/// `INDEX=FILE` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EntryFile {
    index: usize,
    path: PathBuf,
}

impl FromStr for EntryFile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (index, path) = s.split_once('=').ok_or_else(|| format!("expected INDEX=FILE, got {s:?}"))?;
        let index = index
            .trim()
            .parse()
            .map_err(|_| format!("invalid entry index {index:?}"))?;
        if path.is_empty() {
            return Err(format!("missing file for entry {index}"));
        }
        Ok(Self {
            index,
            path: PathBuf::from(path),
        })
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_index(archive: &Path) -> Result<(ArchiveIndex, BufReader<File>)> {
    let file = File::open(archive).with_context(|| format!("failed to open archive: {}", archive.display()))?;
    let mut reader = BufReader::new(file);
    let index = read_index(&mut reader).with_context(|| format!("failed to read archive: {}", archive.display()))?;
    Ok((index, reader))
}

fn cmd_info(archive: &Path) -> Result<()> {
    let (index, _) = open_index(archive)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_listing(&index, &mut out).context("failed to write listing")?;
    out.flush()?;
    Ok(())
}

fn cmd_dump(archive: &Path, outdir: &Path) -> Result<()> {
    let (index, mut reader) = open_index(archive)?;
    fs::create_dir_all(outdir).with_context(|| format!("failed to create output dir: {}", outdir.display()))?;
    let written = dump_entries(&index, &mut reader, outdir)
        .with_context(|| format!("failed to dump {}", archive.display()))?;
    for path in &written {
        println!("{}", path.display());
    }
    println!("Dumped {} entries to {}", written.len(), outdir.display());
    Ok(())
}

fn apply_requests(archive: &Path, output: &Path, requests: &[PatchRequest]) -> Result<()> {
    patch_archive_to(archive, output, requests)
        .with_context(|| format!("failed to patch archive: {}", archive.display()))?;
    println!("Patched {} entries into {}", requests.len(), output.display());
    Ok(())
}

fn cmd_update(archive: &Path, dir: &Path) -> Result<()> {
    let requests = scan_patch_dir(dir)?;
    if requests.is_empty() {
        bail!("no patch files found under {}", dir.display());
    }
    apply_requests(archive, archive, &requests)
}

fn cmd_patch(archive: &Path, textures: &[EntryFile], audio: &[EntryFile], output: Option<&Path>) -> Result<()> {
    if textures.is_empty() && audio.is_empty() {
        bail!("nothing to patch: pass --texture INDEX=FILE or --audio INDEX=FILE");
    }

    let mut requests = Vec::with_capacity(textures.len() + audio.len());
    for t in textures {
        let request = PatchRequest::texture_from_file(t.index, &t.path)
            .with_context(|| format!("failed to read replacement texture {}", t.path.display()))?;
        requests.push(request);
    }
    for a in audio {
        let request = PatchRequest::audio_from_file(a.index, &a.path)
            .with_context(|| format!("failed to read replacement audio {}", a.path.display()))?;
        requests.push(request);
    }

    apply_requests(archive, output.unwrap_or(archive), &requests)
}

fn cmd_apply(manifest_path: &Path) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let requests = manifest.requests()?;
    apply_requests(&manifest.archive, manifest.output_path(), &requests)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Command::Info { archive } => cmd_info(archive),
        Command::Dump { archive, outdir } => cmd_dump(archive, outdir),
        Command::Update { archive, dir } => cmd_update(archive, dir),
        Command::Patch {
            archive,
            textures,
            audio,
            output,
        } => cmd_patch(archive, textures, audio, output.as_deref()),
        Command::Apply { manifest } => cmd_apply(manifest),
    }
}
