//! Single-byte code pages outside the WHATWG set.
//!
//! Each code page is a full 256-entry byte → char table. Decoding is a
//! direct index; encoding uses a reverse map built when the encoder is
//! created. IBM DOS pages keep ASCII in the lower half and take their upper
//! half from `oem_cp`; the EBCDIC pages are spelled out here.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Codec, CodecProvider, Decoder, Encoder, UnmappableError};
use crate::charset::charset_eq;

type Table = [char; 256];

struct CodePage {
    name: &'static str,
    labels: &'static [&'static str],
    build: fn() -> Table,
}

impl CodePage {
    fn matches(&self, name: &str) -> bool {
        charset_eq(self.name, name) || self.labels.iter().any(|label| charset_eq(label, name))
    }
}

const CODE_PAGES: &[CodePage] = &[
    CodePage {
        name: "IBM037",
        labels: &["ibm-037", "ibm-37", "cp037", "cp37", "037", "ebcdic-cp-us", "ebcdic-cp-ca", "csibm037"],
        build: ebcdic_037,
    },
    CodePage {
        name: "IBM1047",
        labels: &["ibm-1047", "cp1047", "1047"],
        build: ebcdic_1047,
    },
    CodePage {
        name: "IBM01140",
        labels: &["ibm1140", "ibm-1140", "cp1140", "ccsid01140", "01140", "ebcdic-us-037+euro"],
        build: ebcdic_1140,
    },
    CodePage {
        name: "IBM437",
        labels: &["ibm-437", "cp437", "437", "windows-437", "cspc8codepage437"],
        build: || oem_page(437),
    },
    CodePage {
        name: "IBM850",
        labels: &["ibm-850", "cp850", "850", "cspc850multilingual"],
        build: || oem_page(850),
    },
    CodePage {
        name: "IBM852",
        labels: &["ibm-852", "cp852", "852", "cspcp852"],
        build: || oem_page(852),
    },
    CodePage {
        name: "IBM855",
        labels: &["ibm-855", "cp855", "855", "csibm855"],
        build: || oem_page(855),
    },
    CodePage {
        name: "IBM00858",
        labels: &["ibm858", "ibm-858", "cp858", "cp00858", "ccsid00858", "858", "pc-multilingual-850+euro"],
        build: || oem_page(858),
    },
    CodePage {
        name: "IBM860",
        labels: &["ibm-860", "cp860", "860", "csibm860"],
        build: || oem_page(860),
    },
    CodePage {
        name: "IBM862",
        labels: &["ibm-862", "cp862", "862", "cspc862latinhebrew"],
        build: || oem_page(862),
    },
    CodePage {
        name: "IBM863",
        labels: &["ibm-863", "cp863", "863", "csibm863"],
        build: || oem_page(863),
    },
    CodePage {
        name: "IBM865",
        labels: &["ibm-865", "cp865", "865", "csibm865"],
        build: || oem_page(865),
    },
    // WHATWG folds these two into windows-1252 / windows-1254
    CodePage {
        name: "ISO-8859-1",
        labels: &[
            "iso8859-1",
            "iso8859_1",
            "iso_8859-1",
            "iso_8859_1",
            "iso_8859-1:1987",
            "8859_1",
            "latin1",
            "l1",
            "ibm819",
            "ibm-819",
            "cp819",
            "819",
            "iso-ir-100",
            "csisolatin1",
        ],
        build: latin1,
    },
    CodePage {
        name: "ISO-8859-9",
        labels: &[
            "iso8859-9",
            "iso8859_9",
            "iso_8859-9",
            "iso_8859_9",
            "iso_8859-9:1989",
            "8859_9",
            "latin5",
            "l5",
            "ibm920",
            "cp920",
            "920",
            "iso-ir-148",
            "csisolatin5",
        ],
        build: iso_8859_9,
    },
];

/// Provider for the table-driven single-byte code pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct CodePageProvider;

impl CodecProvider for CodePageProvider {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Codec>> {
        let name = name.trim();
        let page = CODE_PAGES.iter().find(|page| page.matches(name))?;
        Some(Arc::new(SingleByteCodec {
            name: page.name,
            table: Arc::new((page.build)()),
        }))
    }
}

#[derive(Debug)]
struct SingleByteCodec {
    name: &'static str,
    table: Arc<Table>,
}

impl Codec for SingleByteCodec {
    fn name(&self) -> &str {
        self.name
    }

    fn new_decoder(&self) -> Box<dyn Decoder> {
        Box::new(SingleByteDecoder {
            table: Arc::clone(&self.table),
        })
    }

    fn new_encoder(&self) -> Box<dyn Encoder> {
        let mut reverse = HashMap::with_capacity(256);
        for (byte, &ch) in self.table.iter().enumerate() {
            reverse.entry(ch).or_insert(byte as u8);
        }
        Box::new(SingleByteEncoder {
            name: self.name,
            reverse,
        })
    }
}

struct SingleByteDecoder {
    table: Arc<Table>,
}

impl Decoder for SingleByteDecoder {
    fn decode(&mut self, src: &[u8], dst: &mut Vec<u8>, _last: bool) {
        dst.reserve(src.len());
        let mut buf = [0u8; 4];
        for &byte in src {
            let ch = self.table[byte as usize];
            dst.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
    }
}

struct SingleByteEncoder {
    name: &'static str,
    reverse: HashMap<char, u8>,
}

impl Encoder for SingleByteEncoder {
    fn encode(&mut self, src: &str, dst: &mut Vec<u8>, _last: bool) -> Result<(), UnmappableError> {
        dst.reserve(src.len());
        for character in src.chars() {
            match self.reverse.get(&character) {
                Some(&byte) => dst.push(byte),
                None => {
                    return Err(UnmappableError {
                        charset: self.name.to_owned(),
                        character,
                    });
                }
            }
        }
        Ok(())
    }
}

// Table construction

fn latin1() -> Table {
    std::array::from_fn(|byte| char::from(byte as u8))
}

/// ASCII lower half, upper half from the `oem_cp` decoding tables
fn oem_page(code_page: u16) -> Table {
    let upper: Vec<u8> = (0x80..=0xFF).collect();
    let decoded = oem_cp::code_table::DECODING_TABLE_CP_MAP
        .get(&code_page)
        .and_then(|table| table.decode_string_checked(&upper[..]))
        .unwrap_or_default();

    let mut table = latin1();
    for (slot, ch) in table[0x80..].iter_mut().zip(decoded.chars()) {
        *slot = ch;
    }
    table
}

fn patched(mut table: Table, patches: &[(u8, char)]) -> Table {
    for &(byte, ch) in patches {
        table[byte as usize] = ch;
    }
    table
}

/// EBCDIC 037 as Latin-1 code points
#[rustfmt::skip]
const EBCDIC_037: [u8; 256] = [
    0x00, 0x01, 0x02, 0x03, 0x9C, 0x09, 0x86, 0x7F, 0x97, 0x8D, 0x8E, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
    0x10, 0x11, 0x12, 0x13, 0x9D, 0x85, 0x08, 0x87, 0x18, 0x19, 0x92, 0x8F, 0x1C, 0x1D, 0x1E, 0x1F,
    0x80, 0x81, 0x82, 0x83, 0x84, 0x0A, 0x17, 0x1B, 0x88, 0x89, 0x8A, 0x8B, 0x8C, 0x05, 0x06, 0x07,
    0x90, 0x91, 0x16, 0x93, 0x94, 0x95, 0x96, 0x04, 0x98, 0x99, 0x9A, 0x9B, 0x14, 0x15, 0x9E, 0x1A,
    0x20, 0xA0, 0xE2, 0xE4, 0xE0, 0xE1, 0xE3, 0xE5, 0xE7, 0xF1, 0xA2, 0x2E, 0x3C, 0x28, 0x2B, 0x7C,
    0x26, 0xE9, 0xEA, 0xEB, 0xE8, 0xED, 0xEE, 0xEF, 0xEC, 0xDF, 0x21, 0x24, 0x2A, 0x29, 0x3B, 0xAC,
    0x2D, 0x2F, 0xC2, 0xC4, 0xC0, 0xC1, 0xC3, 0xC5, 0xC7, 0xD1, 0xA6, 0x2C, 0x25, 0x5F, 0x3E, 0x3F,
    0xF8, 0xC9, 0xCA, 0xCB, 0xC8, 0xCD, 0xCE, 0xCF, 0xCC, 0x60, 0x3A, 0x23, 0x40, 0x27, 0x3D, 0x22,
    0xD8, 0x61, 0x62, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69, 0xAB, 0xBB, 0xF0, 0xFD, 0xFE, 0xB1,
    0xB0, 0x6A, 0x6B, 0x6C, 0x6D, 0x6E, 0x6F, 0x70, 0x71, 0x72, 0xAA, 0xBA, 0xE6, 0xB8, 0xC6, 0xA4,
    0xB5, 0x7E, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79, 0x7A, 0xA1, 0xBF, 0xD0, 0xDD, 0xDE, 0xAE,
    0x5E, 0xA3, 0xA5, 0xB7, 0xA9, 0xA7, 0xB6, 0xBC, 0xBD, 0xBE, 0x5B, 0x5D, 0xAF, 0xA8, 0xB4, 0xD7,
    0x7B, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0xAD, 0xF4, 0xF6, 0xF2, 0xF3, 0xF5,
    0x7D, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F, 0x50, 0x51, 0x52, 0xB9, 0xFB, 0xFC, 0xF9, 0xFA, 0xFF,
    0x5C, 0xF7, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A, 0xB2, 0xD4, 0xD6, 0xD2, 0xD3, 0xD5,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0xB3, 0xDB, 0xDC, 0xD9, 0xDA, 0x9F,
];

fn ebcdic_037() -> Table {
    EBCDIC_037.map(char::from)
}

fn ebcdic_1047() -> Table {
    patched(
        ebcdic_037(),
        &[(0x5F, '^'), (0xAD, '['), (0xB0, '¬'), (0xBA, 'Ý'), (0xBB, '¨'), (0xBD, ']')],
    )
}

fn ebcdic_1140() -> Table {
    patched(ebcdic_037(), &[(0x9F, '€')])
}

fn iso_8859_9() -> Table {
    patched(
        latin1(),
        &[(0xD0, 'Ğ'), (0xDD, 'İ'), (0xDE, 'Ş'), (0xF0, 'ğ'), (0xFD, 'ı'), (0xFE, 'ş')],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_all, encode_all};

    fn codec(name: &str) -> Arc<dyn Codec> {
        CodePageProvider.lookup(name).unwrap()
    }

    #[test]
    fn test_dos_pages_have_their_upper_half() {
        let dos = [
            "IBM437", "IBM850", "IBM852", "IBM855", "IBM00858", "IBM860", "IBM862", "IBM863", "IBM865",
        ];
        for name in dos {
            assert_eq!(decode_all(codec(name).as_ref(), &[0x41, 0xB0, 0xDB]), "A░█", "{name}");
        }
    }

    #[test]
    fn test_every_table_round_trips_all_bytes() {
        let all: Vec<u8> = (0..=255).collect();
        for page in CODE_PAGES {
            let codec = codec(page.name);
            let text = decode_all(codec.as_ref(), &all);
            assert_eq!(text.chars().count(), 256, "{}", page.name);
            let bytes = encode_all(codec.as_ref(), &text).unwrap();
            assert_eq!(bytes, all, "{}", page.name);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(codec("cp437").name(), "IBM437");
        assert_eq!(codec("LATIN1").name(), "ISO-8859-1");
        assert_eq!(codec("ibm858").name(), "IBM00858");
        assert_eq!(codec(" ibm037 ").name(), "IBM037");
        assert!(CodePageProvider.lookup("GBK").is_none());
        assert!(CodePageProvider.lookup("windows-1252").is_none());
    }

    #[test]
    fn test_ebcdic() {
        let ibm037 = codec("IBM037");
        assert_eq!(
            encode_all(ibm037.as_ref(), "HELLO").unwrap(),
            [0xC8, 0xC5, 0xD3, 0xD3, 0xD6]
        );
        assert_eq!(decode_all(ibm037.as_ref(), &[0xF1, 0xF2, 0x40, 0x81]), "12 a");
        assert_eq!(encode_all(ibm037.as_ref(), "[").unwrap(), [0xBA]);

        let ibm1047 = codec("IBM1047");
        assert_eq!(encode_all(ibm1047.as_ref(), "[]^").unwrap(), [0xAD, 0xBD, 0x5F]);

        let ibm1140 = codec("IBM01140");
        assert_eq!(encode_all(ibm1140.as_ref(), "€").unwrap(), [0x9F]);
        assert!(encode_all(ibm037.as_ref(), "€").is_err());
    }

    #[test]
    fn test_dos_pages() {
        assert_eq!(encode_all(codec("IBM437").as_ref(), "é░").unwrap(), [0x82, 0xB0]);
        assert_eq!(encode_all(codec("IBM00858").as_ref(), "€").unwrap(), [0xD5]);
        assert_eq!(decode_all(codec("IBM850").as_ref(), &[0xD5]), "ı");
        assert_eq!(decode_all(codec("IBM862").as_ref(), &[0x80, 0x9A]), "את");
        assert_eq!(decode_all(codec("IBM855").as_ref(), &[0xEF]), "№");
        assert_eq!(decode_all(codec("IBM865").as_ref(), &[0x9B]), "ø");
        assert_eq!(decode_all(codec("IBM852").as_ref(), &[0x85]), "ů");
        assert_eq!(decode_all(codec("IBM860").as_ref(), &[0x84]), "ã");
        assert_eq!(decode_all(codec("IBM863").as_ref(), &[0x86]), "¶");
    }

    #[test]
    fn test_latin1_is_not_windows_1252() {
        let latin1 = codec("ISO-8859-1");
        assert_eq!(decode_all(latin1.as_ref(), &[0x80]), "\u{80}");

        let err = encode_all(latin1.as_ref(), "a€").unwrap_err();
        assert_eq!(err.character, '€');
        assert_eq!(err.charset, "ISO-8859-1");
    }

    #[test]
    fn test_latin5() {
        let latin5 = codec("ISO-8859-9");
        assert_eq!(encode_all(latin5.as_ref(), "şİ").unwrap(), [0xFE, 0xDD]);
    }
}
