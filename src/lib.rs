//! # charconv - Streaming Charset Conversion and Detection
//!
//! Converts byte streams between text character sets and guesses the charset
//! of unlabeled input. Every conversion pivots through UTF-8 and is streamed
//! chunk by chunk, so input size is not limited by memory.
//!
//! ## Features
//!
//! - **WHATWG encodings** (GBK, GB18030, Big5, Shift_JIS, EUC-JP, EUC-KR,
//!   ISO-2022-JP, ISO-8859-*, Windows code pages, KOI8) via `encoding_rs`
//! - **IBM code pages** including EBCDIC 037/1047/1140 and the DOS pages
//! - **UTF-16** with or without byte order mark, and **HZ-GB-2312**
//! - **Atomic file conversion** through a scoped temporary file
//! - **Detection** via byte order marks and `chardetng`
//!
//! ## Quick Start
//!
//! ```rust
//! // GBK bytes to UTF-8 text
//! let gbk = [196, 227, 186, 195];
//! assert_eq!(charconv::decode(&gbk, "GBK").unwrap(), "你好");
//!
//! // EBCDIC, converted without going through a String
//! let ebcdic = charconv::convert_bytes(b"HELLO", "UTF-8", "IBM037").unwrap();
//! assert_eq!(ebcdic, [0xC8, 0xC5, 0xD3, 0xD3, 0xD6]);
//!
//! // Streams
//! let mut out = Vec::new();
//! charconv::convert(&ebcdic[..], &mut out, "IBM037", "ISO-8859-1").unwrap();
//! assert_eq!(out, b"HELLO");
//! ```

#![warn(missing_docs)]

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

pub mod charset;
pub mod codec;
pub mod detection;
mod error;
pub mod file;
pub mod pipeline;
pub mod registry;
pub mod stream;

pub use charset::{Category, Charset, charset_eq};
pub use codec::{Codec, CodecProvider, Decoder, Encoder, UnmappableError};
pub use detection::{
    ChardetngDetector, Confidence, DetectionResult, Detector, guess_best, guess_best_of_file,
    guess_best_prefix,
};
pub use error::{Error, Result};
pub use file::{FileConverter, OpenMode};
pub use pipeline::{Conversion, Pipeline};
pub use registry::{CharsetRegistry, RegistryBuilder};
pub use stream::{DecodeReader, EncodeReader};

/// Resolve `name` with the built-in registry
pub fn resolve(name: &str) -> Result<Arc<dyn Codec>> {
    CharsetRegistry::builtin().resolve(name)
}

/// Check if the built-in registry knows `name`
pub fn is_supported(name: &str) -> bool {
    CharsetRegistry::builtin().is_supported(name)
}

/// Stream `src` in `src_charset` into `dest` in `dest_charset`.
///
/// See [`Pipeline::convert`].
pub fn convert<R: Read, W: Write>(src: R, dest: W, src_charset: &str, dest_charset: &str) -> Result<u64> {
    Pipeline::default().convert(src, dest, src_charset, dest_charset)
}

/// Encode UTF-8 from `src` into `dest_charset`
pub fn encode_to<R: Read, W: Write>(src: R, dest: W, dest_charset: &str) -> Result<u64> {
    Pipeline::default().encode_to(src, dest, dest_charset)
}

/// Decode `src` from `src_charset` into UTF-8
pub fn decode_to<R: Read, W: Write>(src: R, dest: W, src_charset: &str) -> Result<u64> {
    Pipeline::default().decode_to(src, dest, src_charset)
}

/// Encode `text` into `charset`
pub fn encode(text: &str, charset: &str) -> Result<Vec<u8>> {
    Pipeline::default().encode(text, charset)
}

/// Decode `bytes` from `charset`
pub fn decode(bytes: &[u8], charset: &str) -> Result<String> {
    Pipeline::default().decode(bytes, charset)
}

/// Convert `bytes` between two charsets in memory
pub fn convert_bytes(bytes: &[u8], src_charset: &str, dest_charset: &str) -> Result<Vec<u8>> {
    Pipeline::default().convert_bytes(bytes, src_charset, dest_charset)
}

/// Convert a file through a staging file in the system temp directory.
///
/// See [`FileConverter::convert_file`].
pub fn convert_file(
    src_path: impl AsRef<Path>,
    dest_path: impl AsRef<Path>,
    mode: OpenMode,
    src_charset: &str,
    dest_charset: &str,
) -> Result<u64> {
    FileConverter::default().convert_file(src_path, dest_path, mode, src_charset, dest_charset)
}

/// Encode a UTF-8 file into `dest_charset`
pub fn encode_file(
    src_path: impl AsRef<Path>,
    dest_path: impl AsRef<Path>,
    mode: OpenMode,
    dest_charset: &str,
) -> Result<u64> {
    FileConverter::default().encode_file(src_path, dest_path, mode, dest_charset)
}

/// Decode a file in `src_charset` into UTF-8
pub fn decode_file(
    src_path: impl AsRef<Path>,
    dest_path: impl AsRef<Path>,
    mode: OpenMode,
    src_charset: &str,
) -> Result<u64> {
    FileConverter::default().decode_file(src_path, dest_path, mode, src_charset)
}
