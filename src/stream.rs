//! Pull-based streaming adapters.
//!
//! Both adapters wrap an inner reader and only read a new chunk from it once
//! their own converted output has been drained, so memory stays bounded by
//! the chunk size whatever the input length.

use std::io::{self, Read};

use tracing::trace;

use crate::codec::{Decoder, Encoder};

/// Default chunk size read from the inner reader
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Larger requested chunk sizes are clamped to this
pub const MAX_CHUNK_SIZE: usize = 64 * 1024 * 1024;

/// Longest UTF-8 sequence that can straddle two chunks, minus one
const UTF8_CARRY: usize = 3;

fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Converted bytes waiting to be handed out
#[derive(Debug, Default)]
struct Pending {
    bytes: Vec<u8>,
    pos: usize,
}

impl Pending {
    fn is_drained(&self) -> bool {
        self.pos == self.bytes.len()
    }

    fn reset(&mut self) {
        self.bytes.clear();
        self.pos = 0;
    }

    fn copy_to(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.bytes.len() - self.pos);
        buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
        self.pos += n;
        n
    }
}

/// Reader yielding UTF-8 decoded from the charset of the inner reader.
///
/// Malformed input is replaced with U+FFFD; decoding itself never fails.
pub struct DecodeReader<R> {
    inner: R,
    decoder: Box<dyn Decoder>,
    chunk: Vec<u8>,
    pending: Pending,
    finished: bool,
}

impl<R: Read> DecodeReader<R> {
    /// Wrap `inner` using the default chunk size
    pub fn new(inner: R, decoder: Box<dyn Decoder>) -> Self {
        Self::with_chunk_size(inner, decoder, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap `inner`, reading at most `chunk_size` bytes at a time
    pub fn with_chunk_size(inner: R, decoder: Box<dyn Decoder>, chunk_size: usize) -> Self {
        Self {
            inner,
            decoder,
            chunk: vec![0; chunk_size.clamp(1, MAX_CHUNK_SIZE)],
            pending: Pending::default(),
            finished: false,
        }
    }

    /// Unwrap the inner reader
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        self.pending.reset();
        let n = read_retrying(&mut self.inner, &mut self.chunk)?;
        let last = n == 0;
        self.decoder.decode(&self.chunk[..n], &mut self.pending.bytes, last);
        self.finished = last;
        trace!(read = n, produced = self.pending.bytes.len(), "decoded chunk");
        Ok(())
    }
}

impl<R: Read> Read for DecodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_drained() {
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }
        Ok(self.pending.copy_to(buf))
    }
}

/// Reader yielding the inner reader's UTF-8 encoded into another charset.
///
/// Input that is not valid UTF-8 fails with [`io::ErrorKind::InvalidData`].
/// A character the target charset cannot represent fails with
/// `InvalidData` wrapping [`crate::codec::UnmappableError`], which
/// converts into [`crate::Error::Unmappable`].
pub struct EncodeReader<R> {
    inner: R,
    encoder: Box<dyn Encoder>,
    chunk: Vec<u8>,
    /// Bytes of an incomplete UTF-8 sequence kept at the front of `chunk`
    carry: usize,
    pending: Pending,
    finished: bool,
}

impl<R: Read> EncodeReader<R> {
    /// Wrap `inner` using the default chunk size
    pub fn new(inner: R, encoder: Box<dyn Encoder>) -> Self {
        Self::with_chunk_size(inner, encoder, DEFAULT_CHUNK_SIZE)
    }

    /// Wrap `inner`, reading at most `chunk_size` bytes at a time
    pub fn with_chunk_size(inner: R, encoder: Box<dyn Encoder>, chunk_size: usize) -> Self {
        Self {
            inner,
            encoder,
            chunk: vec![0; chunk_size.clamp(1, MAX_CHUNK_SIZE) + UTF8_CARRY],
            carry: 0,
            pending: Pending::default(),
            finished: false,
        }
    }

    /// Unwrap the inner reader
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        self.pending.reset();
        let n = read_retrying(&mut self.inner, &mut self.chunk[self.carry..])?;
        let last = n == 0;
        let available = self.carry + n;

        let valid = match std::str::from_utf8(&self.chunk[..available]) {
            Ok(_) => available,
            // Sequence cut by the chunk boundary, completed by the next read
            Err(e) if e.error_len().is_none() && !last => e.valid_up_to(),
            Err(e) => {
                self.finished = true;
                return Err(io::Error::new(io::ErrorKind::InvalidData, e));
            }
        };
        let text = std::str::from_utf8(&self.chunk[..valid])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if let Err(unmappable) = self.encoder.encode(text, &mut self.pending.bytes, last) {
            self.finished = true;
            return Err(io::Error::new(io::ErrorKind::InvalidData, unmappable));
        }

        self.chunk.copy_within(valid..available, 0);
        self.carry = available - valid;
        self.finished = last;
        trace!(read = n, produced = self.pending.bytes.len(), carry = self.carry, "encoded chunk");
        Ok(())
    }
}

impl<R: Read> Read for EncodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pending.is_drained() {
            if self.finished {
                return Ok(0);
            }
            self.fill()?;
        }
        Ok(self.pending.copy_to(buf))
    }
}
