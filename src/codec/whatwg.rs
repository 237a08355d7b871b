//! Codecs backed by the WHATWG encoding tables of `encoding_rs`.

use std::sync::Arc;

use encoding_rs::{CoderResult, EncoderResult, Encoding, UTF_16BE, UTF_16LE};

use super::{Codec, CodecProvider, Decoder, Encoder, UnmappableError};
use crate::charset::{Charset, charset_eq};

/// Scratch buffer size for one `encoding_rs` call
const SCRATCH_LEN: usize = 8 * 1024;

/// Provider resolving WHATWG labels through `encoding_rs`.
///
/// The `replacement` encoding is never returned. `UTF-16` is handled
/// separately because WHATWG treats it as a label of UTF-16LE, whereas here
/// it means "BOM on output, BOM-sniffed input, big endian by default".
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatwgProvider;

impl CodecProvider for WhatwgProvider {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Codec>> {
        if charset_eq(name, Charset::UTF16.name()) {
            return Some(Arc::new(Utf16Codec::WithBom));
        }

        let encoding = Encoding::for_label_no_replacement(name.as_bytes())?;
        let codec: Arc<dyn Codec> = if encoding == UTF_16BE {
            Arc::new(Utf16Codec::BigEndian)
        } else if encoding == UTF_16LE {
            Arc::new(Utf16Codec::LittleEndian)
        } else {
            Arc::new(WhatwgCodec { encoding })
        };
        Some(codec)
    }
}

/// Any WHATWG encoding that `encoding_rs` can both decode and encode
#[derive(Debug)]
struct WhatwgCodec {
    encoding: &'static Encoding,
}

impl Codec for WhatwgCodec {
    fn name(&self) -> &str {
        self.encoding.name()
    }

    fn new_decoder(&self) -> Box<dyn Decoder> {
        Box::new(WhatwgDecoder {
            inner: self.encoding.new_decoder_without_bom_handling(),
        })
    }

    fn new_encoder(&self) -> Box<dyn Encoder> {
        Box::new(WhatwgEncoder {
            charset: self.encoding.name(),
            inner: self.encoding.new_encoder(),
        })
    }
}

struct WhatwgDecoder {
    inner: encoding_rs::Decoder,
}

impl Decoder for WhatwgDecoder {
    fn decode(&mut self, mut src: &[u8], dst: &mut Vec<u8>, last: bool) {
        let mut scratch = [0u8; SCRATCH_LEN];
        loop {
            let (result, read, written, _) = self.inner.decode_to_utf8(src, &mut scratch, last);
            dst.extend_from_slice(&scratch[..written]);
            src = &src[read..];
            match result {
                CoderResult::InputEmpty => return,
                CoderResult::OutputFull => {}
            }
        }
    }
}

struct WhatwgEncoder {
    charset: &'static str,
    inner: encoding_rs::Encoder,
}

impl Encoder for WhatwgEncoder {
    fn encode(&mut self, mut src: &str, dst: &mut Vec<u8>, last: bool) -> Result<(), UnmappableError> {
        let mut scratch = [0u8; SCRATCH_LEN];
        loop {
            let (result, read, written) =
                self.inner
                    .encode_from_utf8_without_replacement(src, &mut scratch, last);
            dst.extend_from_slice(&scratch[..written]);
            src = &src[read..];
            match result {
                EncoderResult::InputEmpty => return Ok(()),
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(character) => {
                    return Err(UnmappableError {
                        charset: self.charset.to_owned(),
                        character,
                    });
                }
            }
        }
    }
}

/// The UTF-16 family. `encoding_rs` only decodes UTF-16, so encoding is done
/// here from UTF-16 code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Utf16Codec {
    WithBom,
    BigEndian,
    LittleEndian,
}

impl Codec for Utf16Codec {
    fn name(&self) -> &str {
        match self {
            Utf16Codec::WithBom => Charset::UTF16.name(),
            Utf16Codec::BigEndian => Charset::UTF16BE.name(),
            Utf16Codec::LittleEndian => Charset::UTF16LE.name(),
        }
    }

    fn new_decoder(&self) -> Box<dyn Decoder> {
        let inner = match self {
            Utf16Codec::WithBom => return Box::new(Utf16SniffingDecoder::default()),
            Utf16Codec::BigEndian => UTF_16BE.new_decoder_with_bom_removal(),
            Utf16Codec::LittleEndian => UTF_16LE.new_decoder_with_bom_removal(),
        };
        Box::new(WhatwgDecoder { inner })
    }

    fn new_encoder(&self) -> Box<dyn Encoder> {
        Box::new(Utf16Encoder {
            big_endian: *self != Utf16Codec::LittleEndian,
            bom_pending: *self == Utf16Codec::WithBom,
        })
    }
}

/// Picks the byte order from a leading `FE FF` / `FF FE`, big endian
/// otherwise. A UTF-8 BOM is ordinary UTF-16 data here.
#[derive(Default)]
struct Utf16SniffingDecoder {
    head: Vec<u8>,
    inner: Option<WhatwgDecoder>,
}

impl Decoder for Utf16SniffingDecoder {
    fn decode(&mut self, src: &[u8], dst: &mut Vec<u8>, last: bool) {
        if let Some(inner) = &mut self.inner {
            return inner.decode(src, dst, last);
        }

        let taken = (2 - self.head.len()).min(src.len());
        self.head.extend_from_slice(&src[..taken]);
        if self.head.len() < 2 && !last {
            return;
        }

        let (encoding, mark_len) = match self.head.as_slice() {
            [0xFE, 0xFF] => (UTF_16BE, 2),
            [0xFF, 0xFE] => (UTF_16LE, 2),
            _ => (UTF_16BE, 0),
        };
        let mut inner = WhatwgDecoder {
            inner: encoding.new_decoder_without_bom_handling(),
        };
        let head = std::mem::take(&mut self.head);
        inner.decode(&head[mark_len..], dst, false);
        inner.decode(&src[taken..], dst, last);
        self.inner = Some(inner);
    }
}

struct Utf16Encoder {
    big_endian: bool,
    bom_pending: bool,
}

impl Encoder for Utf16Encoder {
    fn encode(&mut self, src: &str, dst: &mut Vec<u8>, _last: bool) -> Result<(), UnmappableError> {
        if src.is_empty() {
            return Ok(());
        }
        dst.reserve(src.len() * 2 + 2);
        if self.bom_pending {
            self.bom_pending = false;
            dst.extend_from_slice(&[0xFE, 0xFF]);
        }
        for code_unit in src.encode_utf16() {
            if self.big_endian {
                dst.extend_from_slice(&code_unit.to_be_bytes());
            } else {
                dst.extend_from_slice(&code_unit.to_le_bytes());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_all, encode_all};

    fn codec(name: &str) -> Arc<dyn Codec> {
        WhatwgProvider.lookup(name).unwrap()
    }

    #[test]
    fn test_lookup_by_label() {
        assert_eq!(codec("gbk").name(), "GBK");
        assert_eq!(codec("GB2312").name(), "GBK");
        assert_eq!(codec("sjis").name(), "Shift_JIS");
        assert_eq!(codec("iso-8859-6-e").name(), "ISO-8859-6");
        assert_eq!(codec("ISO-8859-8-I").name(), "ISO-8859-8-I");
        assert!(WhatwgProvider.lookup("not-a-real-charset").is_none());
    }

    #[test]
    fn test_replacement_is_not_offered() {
        assert!(WhatwgProvider.lookup("replacement").is_none());
        assert!(WhatwgProvider.lookup("iso-2022-kr").is_none());
    }

    #[test]
    fn test_gbk() {
        let gbk = codec("GBK");
        let bytes = encode_all(gbk.as_ref(), "你好，世界").unwrap();
        assert_eq!(bytes, [196, 227, 186, 195, 163, 172, 202, 192, 189, 231]);
        assert_eq!(decode_all(gbk.as_ref(), &bytes), "你好，世界");
    }

    #[test]
    fn test_euc_jp() {
        let euc_jp = codec("EUC-JP");
        let bytes = encode_all(euc_jp.as_ref(), "好，世界").unwrap();
        assert_eq!(bytes, [0xB9, 0xA5, 0xA1, 0xA4, 0xC0, 0xA4, 0xB3, 0xA6]);
    }

    #[test]
    fn test_malformed_input_is_replaced() {
        // Lone lead byte at end of input
        let shift_jis = codec("Shift_JIS");
        assert_eq!(decode_all(shift_jis.as_ref(), &[0x41, 0x82]), "A\u{FFFD}");
    }

    #[test]
    fn test_iso_2022_jp_closes_escape() {
        let jis = codec("ISO-2022-JP");
        let bytes = encode_all(jis.as_ref(), "世界").unwrap();
        assert!(bytes.starts_with(b"\x1b$B"));
        assert!(bytes.ends_with(b"\x1b(B"));
        assert_eq!(decode_all(jis.as_ref(), &bytes), "世界");
    }

    #[test]
    fn test_utf16_variants() {
        let be = codec("UTF-16BE");
        let le = codec("UTF-16LE");
        let bom = codec("UTF-16");

        assert_eq!(bom.name(), "UTF-16");
        assert_eq!(encode_all(be.as_ref(), "Hi").unwrap(), [0x00, 0x48, 0x00, 0x69]);
        assert_eq!(encode_all(le.as_ref(), "Hi").unwrap(), [0x48, 0x00, 0x69, 0x00]);
        assert_eq!(
            encode_all(bom.as_ref(), "Hi").unwrap(),
            [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]
        );
        assert!(encode_all(bom.as_ref(), "").unwrap().is_empty());
    }

    #[test]
    fn test_utf16_bom_sniffing() {
        let bom = codec("UTF-16");
        assert_eq!(decode_all(bom.as_ref(), &[0xFF, 0xFE, 0x48, 0x00]), "H");
        assert_eq!(decode_all(bom.as_ref(), &[0xFE, 0xFF, 0x00, 0x48]), "H");
        assert_eq!(decode_all(bom.as_ref(), &[0x00, 0x48]), "H");

        let le = codec("UTF-16LE");
        assert_eq!(decode_all(le.as_ref(), &[0xFF, 0xFE, 0x48, 0x00]), "H");
    }

    #[test]
    fn test_utf16_ignores_utf8_bom() {
        let bom = codec("UTF-16");
        assert_eq!(
            decode_all(bom.as_ref(), &[0xEF, 0xBB, 0xBF, 0x00, 0x41]),
            "\u{EFBB}\u{BF00}\u{FFFD}"
        );
    }

    #[test]
    fn test_utf16_bom_split_across_calls() {
        let mut decoder = codec("UTF-16").new_decoder();
        let mut out = Vec::new();
        for &byte in &[0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00] {
            decoder.decode(&[byte], &mut out, false);
        }
        decoder.decode(&[], &mut out, true);
        assert_eq!(out, b"Hi");

        let mut decoder = codec("UTF-16").new_decoder();
        let mut out = Vec::new();
        decoder.decode(&[0x00], &mut out, true);
        assert_eq!(out, "\u{FFFD}".as_bytes());
    }

    #[test]
    fn test_utf16_surrogate_pair() {
        let be = codec("UTF-16BE");
        let bytes = encode_all(be.as_ref(), "😀").unwrap();
        assert_eq!(bytes, [0xD8, 0x3D, 0xDE, 0x00]);
        assert_eq!(decode_all(be.as_ref(), &bytes), "😀");
    }
}
