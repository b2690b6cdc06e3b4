use std::fmt;

/// Number of payload bytes inspected by [`AssetType::sniff`].
pub const SNIFF_LEN: usize = 12;

/// Format of an embedded asset, as far as a prefix sniff can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    Png,
    Wave,
    Ogg,
    Unknown,
}

impl AssetType {
    /// Classify an audio payload from its first bytes.
    ///
    /// `RIFF????WAVE` is WAVE, `OggS` is Ogg, anything else (including a
    /// prefix too short to decide) is unknown.
    pub fn sniff(prefix: &[u8]) -> Self {
        if prefix.len() >= 12 && &prefix[0..4] == b"RIFF" && &prefix[8..12] == b"WAVE" {
            AssetType::Wave
        } else if prefix.len() >= 4 && &prefix[0..4] == b"OggS" {
            AssetType::Ogg
        } else {
            AssetType::Unknown
        }
    }

    /// File extension used when dumping, including the dot.
    pub fn extension(self) -> &'static str {
        match self {
            AssetType::Png => ".png",
            AssetType::Wave => ".wav",
            AssetType::Ogg => ".ogg",
            AssetType::Unknown => ".bin",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetType::Png => "PNG",
            AssetType::Wave => "WAVE",
            AssetType::Ogg => "Ogg",
            AssetType::Unknown => "(Unknown)",
        })
    }
}

/// Pixel dimensions of a texture page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Render optional dimensions for diagnostics.
pub(crate) fn dims_label(dims: &Option<Dimensions>) -> String {
    match dims {
        Some(d) => d.to_string(),
        None => "none".to_string(),
    }
}
