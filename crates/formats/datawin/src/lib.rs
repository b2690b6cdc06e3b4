//! Indexer and size-changing patcher for GameMaker's data.win container.
//!
//! Data flows one way:
//! - **`reader`**: FORM envelope → [`ArchiveIndex`] (chunk list, plus entry
//!   sub-indices for TXTR and AUDO)
//! - **`patch`**: [`ArchiveIndex`] + [`PatchRequest`]s → [`PatchedIndex`]
//!   with every offset after a resized entry shifted
//! - **`writer`**: original bytes + [`PatchedIndex`] → new archive, staged
//!   beside the target and installed only once complete
//!
//! `dump` holds the read-only consumers (extraction and listing).

pub mod asset;
pub mod chunk;
pub mod chunks;
pub mod cursor;
pub mod dump;
pub mod error;
pub mod image;
pub mod patch;
pub mod reader;
pub mod writer;

pub use asset::{AssetType, Dimensions};
pub use chunk::ChunkKind;
pub use error::{Error, Result};
pub use image::{ImageDescriptor, ImageInfo, PngDescriptor};
pub use patch::{plan, PatchRequest, PatchSource, PatchedIndex};
pub use reader::{read_index, read_index_with, ArchiveIndex, ChunkDescriptor, EntryDescriptor};
pub use writer::{patch_archive, patch_archive_to, stage_archive, write_archive, StagedArchive};
