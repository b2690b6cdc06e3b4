//! Sub-index parsers and rewriters for the chunk kinds whose internal offset
//! tables this engine understands.

pub mod audo;
pub mod txtr;
