use std::fmt;
use std::str::FromStr;

/// Size of a chunk header: 4-byte name + u32 payload length.
pub const CHUNK_HEADER_SIZE: u32 = 8;

/// Top-level chunk kinds found in a FORM container.
///
/// The set is closed: a chunk whose name is not listed here makes the whole
/// archive unreadable for this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChunkKind {
    /// General info (GEN8).
    GeneralInfo,
    /// Game options (OPTN).
    Options,
    /// Extensions (EXTN).
    Extensions,
    /// Sound definitions (SOND).
    Sounds,
    /// Sprite definitions (SPRT).
    Sprites,
    /// Backgrounds (BGND).
    Backgrounds,
    /// Paths (PATH).
    Paths,
    /// Scripts (SCPT).
    Scripts,
    /// Shaders (SHDR).
    Shaders,
    /// Fonts (FONT).
    Fonts,
    /// Timelines (TMLN).
    Timelines,
    /// Objects (OBJT).
    Objects,
    /// Rooms (ROOM).
    Rooms,
    /// Data file defaults (DAFL).
    Defaults,
    /// Texture page items (TPAG).
    TexturePageItems,
    /// Bytecode (CODE).
    Code,
    /// Variables (VARI).
    Variables,
    /// Functions (FUNC).
    Functions,
    /// String table (STRG).
    Strings,
    /// Embedded texture pages (TXTR).
    Textures,
    /// Embedded audio (AUDO).
    Audio,
}

impl ChunkKind {
    /// Every known kind, in the order GameMaker usually writes them.
    pub const ALL: [ChunkKind; 21] = [
        ChunkKind::GeneralInfo,
        ChunkKind::Options,
        ChunkKind::Extensions,
        ChunkKind::Sounds,
        ChunkKind::Sprites,
        ChunkKind::Backgrounds,
        ChunkKind::Paths,
        ChunkKind::Scripts,
        ChunkKind::Shaders,
        ChunkKind::Fonts,
        ChunkKind::Timelines,
        ChunkKind::Objects,
        ChunkKind::Rooms,
        ChunkKind::Defaults,
        ChunkKind::TexturePageItems,
        ChunkKind::Code,
        ChunkKind::Variables,
        ChunkKind::Functions,
        ChunkKind::Strings,
        ChunkKind::Textures,
        ChunkKind::Audio,
    ];

    /// 4-byte ASCII name as stored in the chunk header.
    pub fn magic(self) -> &'static [u8; 4] {
        match self {
            ChunkKind::GeneralInfo => b"GEN8",
            ChunkKind::Options => b"OPTN",
            ChunkKind::Extensions => b"EXTN",
            ChunkKind::Sounds => b"SOND",
            ChunkKind::Sprites => b"SPRT",
            ChunkKind::Backgrounds => b"BGND",
            ChunkKind::Paths => b"PATH",
            ChunkKind::Scripts => b"SCPT",
            ChunkKind::Shaders => b"SHDR",
            ChunkKind::Fonts => b"FONT",
            ChunkKind::Timelines => b"TMLN",
            ChunkKind::Objects => b"OBJT",
            ChunkKind::Rooms => b"ROOM",
            ChunkKind::Defaults => b"DAFL",
            ChunkKind::TexturePageItems => b"TPAG",
            ChunkKind::Code => b"CODE",
            ChunkKind::Variables => b"VARI",
            ChunkKind::Functions => b"FUNC",
            ChunkKind::Strings => b"STRG",
            ChunkKind::Textures => b"TXTR",
            ChunkKind::Audio => b"AUDO",
        }
    }

    /// Magic as a string (for display).
    pub fn name(self) -> &'static str {
        // All magics are ASCII literals.
        std::str::from_utf8(self.magic()).unwrap_or("????")
    }

    /// Look up a kind by its header name.
    pub fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.magic() == magic)
    }

    /// Whether this engine can rewrite the chunk's internal offset tables.
    ///
    /// Only relocatable chunks may be patched, and only relocatable chunks may
    /// follow a patched chunk in the container (they get shifted).
    pub fn is_relocatable(self) -> bool {
        matches!(self, ChunkKind::Textures | ChunkKind::Audio)
    }

    /// Directory name used when dumping entries of this chunk.
    pub fn dir_name(self) -> String {
        self.name().to_ascii_lowercase()
    }
}

impl fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when parsing an unknown chunk name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown chunk name: {0:?}")]
pub struct ParseChunkKindError(pub String);

impl FromStr for ChunkKind {
    type Err = ParseChunkKindError;

    /// Accepts the 4-letter header name in any case (`"TXTR"`, `"audo"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let bytes: [u8; 4] = upper
            .as_bytes()
            .try_into()
            .map_err(|_| ParseChunkKindError(s.to_string()))?;
        Self::from_magic(&bytes).ok_or_else(|| ParseChunkKindError(s.to_string()))
    }
}

/// Render a raw 4-byte name for diagnostics, escaping non-printable bytes.
pub fn escape_magic(magic: &[u8; 4]) -> String {
    magic
        .iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}
