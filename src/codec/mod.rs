//! Codec capability layer.
//!
//! A [`Codec`] hands out fresh incremental [`Decoder`]s and [`Encoder`]s.
//! Decoders always produce UTF-8 and encoders always consume UTF-8, so every
//! conversion pivots through UTF-8. Providers map names to codecs and are
//! chained by the registry.

use std::fmt;
use std::sync::Arc;

mod hz;
mod tables;
mod whatwg;

pub use hz::HzProvider;
pub use tables::CodePageProvider;
pub use whatwg::WhatwgProvider;

/// Character that cannot be represented in the target charset.
///
/// Travels inside `io::Error` when raised from a streaming adapter and is
/// lifted back into [`crate::Error::Unmappable`] at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot encode character {character:?} in {charset}")]
pub struct UnmappableError {
    /// Target charset name
    pub charset: String,
    /// The offending character
    pub character: char,
}

/// Incremental decoder from some charset into UTF-8.
pub trait Decoder: Send {
    /// Decode `src`, appending UTF-8 to `dst`.
    ///
    /// Malformed input becomes U+FFFD. An incomplete trailing sequence is
    /// held until the next call, or replaced when `last` is set.
    fn decode(&mut self, src: &[u8], dst: &mut Vec<u8>, last: bool);
}

/// Incremental encoder from UTF-8 into some charset.
pub trait Encoder: Send {
    /// Encode `src`, appending bytes to `dst`.
    ///
    /// `last` flushes any trailing shift sequence the charset needs.
    fn encode(&mut self, src: &str, dst: &mut Vec<u8>, last: bool) -> Result<(), UnmappableError>;
}

/// A named charset able to create coders
pub trait Codec: Send + Sync + fmt::Debug {
    /// Canonical name reported for this codec
    fn name(&self) -> &str;

    /// Create a fresh decoder
    fn new_decoder(&self) -> Box<dyn Decoder>;

    /// Create a fresh encoder
    fn new_encoder(&self) -> Box<dyn Encoder>;
}

/// A source of codecs, queried by name
pub trait CodecProvider: Send + Sync {
    /// Look up `name`, returning `None` when this provider does not know it.
    fn lookup(&self, name: &str) -> Option<Arc<dyn Codec>>;
}

/// Decode a complete buffer with a fresh decoder
pub fn decode_all(codec: &dyn Codec, src: &[u8]) -> String {
    let mut out = Vec::with_capacity(src.len());
    codec.new_decoder().decode(src, &mut out, true);
    // Decoders emit UTF-8 only
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Encode a complete string with a fresh encoder
pub fn encode_all(codec: &dyn Codec, src: &str) -> Result<Vec<u8>, UnmappableError> {
    let mut out = Vec::with_capacity(src.len());
    codec.new_encoder().encode(src, &mut out, true)?;
    Ok(out)
}
