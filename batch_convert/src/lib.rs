//! Batch convert
//!
//! Recursively transcodes a folder into one output format, mirroring the
//! folder layout under the output root.

pub mod converter;
pub mod formats;

pub use converter::{find_duplicate_stems, ConvertConfig, ConvertExecutor};
pub use formats::OutputFormat;
