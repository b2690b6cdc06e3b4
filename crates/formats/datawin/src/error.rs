use thiserror::Error;

use crate::asset::{dims_label, AssetType, Dimensions};
use crate::chunk::ChunkKind;
use crate::image::ImageError;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad container magic, unknown chunk name, or an unexpected value in a
    /// field this engine does not interpret.
    #[error("unsupported format at offset {offset:#x}: {message}")]
    UnsupportedFormat { offset: u64, message: String },

    /// The image collaborator rejected a texture entry.
    #[error("{chunk} entry {index} at offset {offset:#x} is not a recognized image: {source}")]
    UnrecognizedImage {
        chunk: ChunkKind,
        index: usize,
        offset: u64,
        source: ImageError,
    },

    /// A chunk or entry overruns the bounds that contain it.
    #[error("corrupt archive at offset {offset:#x}: {message}")]
    Corrupt { offset: u64, message: String },

    /// An offset or size does not fit the signed 32-bit range the format allows.
    #[error("{what} out of range at offset {offset:#x}: {value} (allowed 0..={max})")]
    Overflow {
        what: &'static str,
        offset: u64,
        value: i64,
        max: i64,
    },

    #[error("archive contains no {chunk} chunk")]
    UnknownChunk { chunk: ChunkKind },

    /// The engine cannot relay offsets inside this chunk kind.
    #[error("can't {operation} {chunk} chunk (not implemented)")]
    UnsupportedOperation {
        chunk: ChunkKind,
        operation: &'static str,
    },

    #[error("{chunk} entry index {index} out of range (count={count})")]
    IndexOutOfRange {
        chunk: ChunkKind,
        index: usize,
        count: usize,
    },

    #[error("{chunk} entry {index} is already patched")]
    AlreadyPatched { chunk: ChunkKind, index: usize },

    #[error("{chunk} entry {index} type mismatch: entry type = {found}, patch type = {expected}")]
    TypeMismatch {
        chunk: ChunkKind,
        index: usize,
        expected: AssetType,
        found: AssetType,
    },

    #[error(
        "{chunk} entry {index} dimensions mismatch: entry dimensions = {found}, patch dimensions = {}",
        dims_label(.expected)
    )]
    DimensionMismatch {
        chunk: ChunkKind,
        index: usize,
        expected: Option<Dimensions>,
        found: Dimensions,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attach a description to a raw `io::Result`.
pub(crate) trait IoContext<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, context: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|source| Error::Io {
            context: context(),
            source,
        })
    }
}
