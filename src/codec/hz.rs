//! HZ-GB-2312 (RFC 1843): GB2312 in 7-bit form.
//!
//! `~{` switches to GB mode, where each pair of bytes in `0x21..=0x7E` is a
//! GB2312 character with the high bits stripped. `~}` or a newline switches
//! back. `~~` is a literal tilde and `~` followed by a newline is a line
//! continuation. GB2312 pairs come from the GBK tables of `encoding_rs`.

use std::sync::Arc;

use encoding_rs::{EncoderResult, GBK};

use super::{Codec, CodecProvider, Decoder, Encoder, UnmappableError};
use crate::charset::{Charset, charset_eq};

/// Provider for HZ-GB-2312, which WHATWG maps to `replacement`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HzProvider;

impl CodecProvider for HzProvider {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Codec>> {
        let name = name.trim();
        if charset_eq(name, Charset::HZ_GB_2312.name()) || charset_eq(name, "hz") {
            Some(Arc::new(HzCodec))
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct HzCodec;

impl Codec for HzCodec {
    fn name(&self) -> &str {
        Charset::HZ_GB_2312.name()
    }

    fn new_decoder(&self) -> Box<dyn Decoder> {
        Box::new(HzDecoder {
            gb_mode: false,
            pending: Pending::Nothing,
        })
    }

    fn new_encoder(&self) -> Box<dyn Encoder> {
        Box::new(HzEncoder {
            gb_mode: false,
            gbk: GBK.new_encoder(),
        })
    }
}

const GB_BYTES: std::ops::RangeInclusive<u8> = 0x21..=0x7E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Nothing,
    Tilde,
    Lead(u8),
}

struct HzDecoder {
    gb_mode: bool,
    pending: Pending,
}

fn push_char(dst: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    dst.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

impl HzDecoder {
    fn feed(&mut self, byte: u8, dst: &mut Vec<u8>) {
        match self.pending {
            Pending::Tilde => {
                self.pending = Pending::Nothing;
                match byte {
                    b'~' => dst.push(b'~'),
                    b'{' if !self.gb_mode => self.gb_mode = true,
                    b'}' if self.gb_mode => self.gb_mode = false,
                    b'\n' => {}
                    _ => {
                        push_char(dst, char::REPLACEMENT_CHARACTER);
                        self.feed(byte, dst);
                    }
                }
            }
            Pending::Lead(lead) => {
                self.pending = Pending::Nothing;
                if GB_BYTES.contains(&byte) {
                    let pair = [lead | 0x80, byte | 0x80];
                    let (text, _) = GBK.decode_without_bom_handling(&pair);
                    dst.extend_from_slice(text.as_bytes());
                } else {
                    push_char(dst, char::REPLACEMENT_CHARACTER);
                    self.feed(byte, dst);
                }
            }
            Pending::Nothing => match byte {
                b'~' => self.pending = Pending::Tilde,
                b'\n' => {
                    self.gb_mode = false;
                    dst.push(b'\n');
                }
                _ if self.gb_mode && GB_BYTES.contains(&byte) => self.pending = Pending::Lead(byte),
                _ if byte.is_ascii() => dst.push(byte),
                _ => push_char(dst, char::REPLACEMENT_CHARACTER),
            },
        }
    }
}

impl Decoder for HzDecoder {
    fn decode(&mut self, src: &[u8], dst: &mut Vec<u8>, last: bool) {
        dst.reserve(src.len());
        for &byte in src {
            self.feed(byte, dst);
        }
        if last && self.pending != Pending::Nothing {
            self.pending = Pending::Nothing;
            push_char(dst, char::REPLACEMENT_CHARACTER);
        }
    }
}

struct HzEncoder {
    gb_mode: bool,
    gbk: encoding_rs::Encoder,
}

impl HzEncoder {
    /// GB2312 pair for `ch`, both bytes in `0xA1..=0xFE`
    fn gb2312(&mut self, ch: char) -> Option<[u8; 2]> {
        let mut utf8 = [0u8; 4];
        let mut out = [0u8; 4];
        let (result, _, written) =
            self.gbk
                .encode_from_utf8_without_replacement(ch.encode_utf8(&mut utf8), &mut out, false);
        match (result, &out[..written]) {
            (EncoderResult::InputEmpty, &[hi, lo])
                if (0xA1..=0xFE).contains(&hi) && (0xA1..=0xFE).contains(&lo) =>
            {
                Some([hi, lo])
            }
            _ => None,
        }
    }
}

impl Encoder for HzEncoder {
    fn encode(&mut self, src: &str, dst: &mut Vec<u8>, last: bool) -> Result<(), UnmappableError> {
        dst.reserve(src.len());
        for ch in src.chars() {
            if ch.is_ascii() {
                if self.gb_mode {
                    dst.extend_from_slice(b"~}");
                    self.gb_mode = false;
                }
                if ch == '~' {
                    dst.extend_from_slice(b"~~");
                } else {
                    dst.push(ch as u8);
                }
                continue;
            }

            let [hi, lo] = self.gb2312(ch).ok_or_else(|| UnmappableError {
                charset: Charset::HZ_GB_2312.name().to_owned(),
                character: ch,
            })?;
            if !self.gb_mode {
                dst.extend_from_slice(b"~{");
                self.gb_mode = true;
            }
            dst.extend_from_slice(&[hi & 0x7F, lo & 0x7F]);
        }

        if last && self.gb_mode {
            dst.extend_from_slice(b"~}");
            self.gb_mode = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_all, encode_all};

    #[test]
    fn test_encode() {
        assert_eq!(encode_all(&HzCodec, "你好").unwrap(), b"~{Dc:C~}");
        assert_eq!(encode_all(&HzCodec, "a~b").unwrap(), b"a~~b");
        assert_eq!(encode_all(&HzCodec, "你 好").unwrap(), b"~{Dc~} ~{:C~}");
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode_all(&HzCodec, b"Hi ~{Dc:C~} ~~"), "Hi 你好 ~");
        assert_eq!(decode_all(&HzCodec, b"a~\nb"), "ab");
        assert_eq!(decode_all(&HzCodec, b"~{Dc\nA"), "你\nA");
    }

    #[test]
    fn test_malformed_and_dangling_input() {
        assert_eq!(decode_all(&HzCodec, b"~x"), "\u{FFFD}x");
        assert_eq!(decode_all(&HzCodec, b"~{D"), "\u{FFFD}");
        assert_eq!(decode_all(&HzCodec, b"~"), "\u{FFFD}");
    }

    #[test]
    fn test_chunk_boundaries() {
        let bytes = b"Hi ~{Dc:C~} ~~";
        for split in 0..=bytes.len() {
            let mut decoder = HzCodec.new_decoder();
            let mut out = Vec::new();
            decoder.decode(&bytes[..split], &mut out, false);
            decoder.decode(&bytes[split..], &mut out, true);
            assert_eq!(String::from_utf8(out).unwrap(), "Hi 你好 ~", "split at {split}");
        }
    }

    #[test]
    fn test_outside_gb2312_is_unmappable() {
        let err = encode_all(&HzCodec, "€").unwrap_err();
        assert_eq!(err.character, '€');
        assert_eq!(err.charset, "HZ-GB-2312");
        assert!(encode_all(&HzCodec, "😀").is_err());
    }

    #[test]
    fn test_lookup() {
        assert!(HzProvider.lookup("hz-gb-2312").is_some());
        assert!(HzProvider.lookup("HZ").is_some());
        assert!(HzProvider.lookup("GBK").is_none());
    }
}
