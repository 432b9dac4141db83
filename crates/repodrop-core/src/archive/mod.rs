//! Archive validation and contained extraction.

pub mod extract;
pub mod validate;

pub use extract::{extract_archive, open_archive, ExtractReport};
pub use validate::validate_members;
