//! Composition of decode and encode steps between a reader and a writer.
//!
//! Every conversion pivots through UTF-8: a UTF-8 source only needs an
//! encoder, a UTF-8 destination only needs a decoder, anything else is
//! decoded and re-encoded on the fly without materialising the text.

use std::fmt;
use std::io::{self, Read, Write};

use tracing::debug;

use crate::charset::{charset_eq, is_utf8};
use crate::codec::{Decoder, Encoder};
use crate::registry::CharsetRegistry;
use crate::stream::{DEFAULT_CHUNK_SIZE, DecodeReader, EncodeReader, MAX_CHUNK_SIZE};
use crate::{Charset, Error, Result};

/// Streaming conversion front end bound to a registry
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'r> {
    registry: &'r CharsetRegistry,
    buffer_size: usize,
}

impl Default for Pipeline<'static> {
    fn default() -> Self {
        Pipeline::new(CharsetRegistry::builtin())
    }
}

impl<'r> Pipeline<'r> {
    /// Create a pipeline resolving names through `registry`
    pub fn new(registry: &'r CharsetRegistry) -> Self {
        Self {
            registry,
            buffer_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the chunk size read from sources, clamped to `1..=MAX_CHUNK_SIZE`
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// The registry names are resolved through
    pub fn registry(&self) -> &'r CharsetRegistry {
        self.registry
    }

    /// Validate and resolve a conversion without touching any stream.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedConversion`] if both names designate the same
    ///   charset (compared case-insensitively), UTF-8 included
    /// - [`Error::UnsupportedCharset`] naming whichever side does not resolve
    pub fn plan(&self, src_charset: &str, dest_charset: &str) -> Result<Conversion> {
        if charset_eq(src_charset, dest_charset) {
            return Err(Error::unsupported_conversion(src_charset, dest_charset));
        }

        let stage = if is_utf8(src_charset) {
            Stage::Encode(self.registry.encoder(dest_charset)?)
        } else if is_utf8(dest_charset) {
            Stage::Decode(self.registry.decoder(src_charset)?)
        } else {
            let decoder = self.registry.decoder(src_charset)?;
            let encoder = self.registry.encoder(dest_charset)?;
            Stage::Transcode(decoder, encoder)
        };

        debug!(src = src_charset, dest = dest_charset, stage = %stage, "planned conversion");
        Ok(Conversion {
            src: src_charset.to_owned(),
            dest: dest_charset.to_owned(),
            stage,
            buffer_size: self.buffer_size,
        })
    }

    /// Stream `src` in `src_charset` into `dest` in `dest_charset`.
    ///
    /// Returns the number of bytes written. Nothing is read when planning
    /// fails; bytes already written when a later error occurs stay written.
    pub fn convert<R: Read, W: Write>(
        &self,
        src: R,
        dest: W,
        src_charset: &str,
        dest_charset: &str,
    ) -> Result<u64> {
        self.plan(src_charset, dest_charset)?.run(src, dest)
    }

    /// Encode UTF-8 from `src` into `dest_charset`
    pub fn encode_to<R: Read, W: Write>(&self, src: R, dest: W, dest_charset: &str) -> Result<u64> {
        self.convert(src, dest, Charset::UTF8.name(), dest_charset)
    }

    /// Decode `src` from `src_charset` into UTF-8
    pub fn decode_to<R: Read, W: Write>(&self, src: R, dest: W, src_charset: &str) -> Result<u64> {
        self.convert(src, dest, src_charset, Charset::UTF8.name())
    }

    /// Encode `text` into `charset`
    pub fn encode(&self, text: &str, charset: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len());
        self.encode_to(text.as_bytes(), &mut out, charset)?;
        Ok(out)
    }

    /// Decode `bytes` from `charset`
    pub fn decode(&self, bytes: &[u8], charset: &str) -> Result<String> {
        let mut out = Vec::with_capacity(bytes.len());
        self.decode_to(bytes, &mut out, charset)?;
        String::from_utf8(out).map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Convert `bytes` from `src_charset` to `dest_charset` in memory
    pub fn convert_bytes(&self, bytes: &[u8], src_charset: &str, dest_charset: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(bytes.len());
        self.convert(bytes, &mut out, src_charset, dest_charset)?;
        Ok(out)
    }

    /// Encode UTF-8 from `src` with an encoder the caller already holds
    pub fn encode_with<R: Read, W: Write>(&self, src: R, dest: W, encoder: Box<dyn Encoder>) -> Result<u64> {
        Conversion::with_stage(Stage::Encode(encoder), self.buffer_size).run(src, dest)
    }

    /// Decode `src` to UTF-8 with a decoder the caller already holds
    pub fn decode_with<R: Read, W: Write>(&self, src: R, dest: W, decoder: Box<dyn Decoder>) -> Result<u64> {
        Conversion::with_stage(Stage::Decode(decoder), self.buffer_size).run(src, dest)
    }
}

enum Stage {
    Encode(Box<dyn Encoder>),
    Decode(Box<dyn Decoder>),
    Transcode(Box<dyn Decoder>, Box<dyn Encoder>),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Encode(_) => "encode",
            Stage::Decode(_) => "decode",
            Stage::Transcode(..) => "decode+encode",
        })
    }
}

/// A resolved, validated conversion ready to stream
pub struct Conversion {
    src: String,
    dest: String,
    stage: Stage,
    buffer_size: usize,
}

impl Conversion {
    fn with_stage(stage: Stage, buffer_size: usize) -> Self {
        Self {
            src: String::new(),
            dest: String::new(),
            stage,
            buffer_size,
        }
    }

    /// Source charset as requested
    pub fn source(&self) -> &str {
        &self.src
    }

    /// Destination charset as requested
    pub fn destination(&self) -> &str {
        &self.dest
    }

    /// Stream `src` through the planned stages into `dest`, returning the
    /// number of bytes written.
    pub fn run<R: Read, W: Write>(self, src: R, mut dest: W) -> Result<u64> {
        let chunk = self.buffer_size;
        let written = match self.stage {
            Stage::Encode(encoder) => {
                io::copy(&mut EncodeReader::with_chunk_size(src, encoder, chunk), &mut dest)?
            }
            Stage::Decode(decoder) => {
                io::copy(&mut DecodeReader::with_chunk_size(src, decoder, chunk), &mut dest)?
            }
            Stage::Transcode(decoder, encoder) => {
                let decoded = DecodeReader::with_chunk_size(src, decoder, chunk);
                io::copy(&mut EncodeReader::with_chunk_size(decoded, encoder, chunk), &mut dest)?
            }
        };
        dest.flush()?;
        debug!(src = %self.src, dest = %self.dest, written, "conversion finished");
        Ok(written)
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversion")
            .field("src", &self.src)
            .field("dest", &self.dest)
            .field("stage", &self.stage.to_string())
            .finish()
    }
}
