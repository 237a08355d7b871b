//! Canonical charset names and the alias table consulted before lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::Error;

/// Names the codec providers fail to recognise, rewritten before lookup.
///
/// Both spellings are listed because the match is exact.
pub const ALIASES: &[(&str, &str)] = &[("HZGB2312", "HZ-GB-2312"), ("hzgb2312", "HZ-GB-2312")];

/// Apply the alias table to `name`, returning the canonical spelling when
/// one is registered and `name` unchanged otherwise.
pub fn unalias(name: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, canonical)| canonical)
}

/// Case-insensitive charset name comparison
pub fn charset_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Whether `name` designates UTF-8, the pivot representation
pub(crate) fn is_utf8(name: &str) -> bool {
    charset_eq(name, Charset::UTF8.name())
}

/// Charsets with a well-known canonical name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum Charset {
    // Unicode
    /// UTF-8
    UTF8,
    /// UTF-16 with byte order mark (big endian when absent)
    UTF16,
    /// UTF-16 big endian, no byte order mark
    UTF16BE,
    /// UTF-16 little endian, no byte order mark
    UTF16LE,

    // Chinese
    /// GBK (Simplified Chinese)
    GBK,
    /// GB18030 (Simplified Chinese, full Unicode coverage)
    GB18030,
    /// Big5 (Traditional Chinese)
    BIG5,
    /// HZ-GB-2312 (7-bit GB2312 with `~{` / `~}` escapes)
    HZ_GB_2312,

    // Japanese
    /// EUC-JP
    EUC_JP,
    /// ISO-2022-JP
    ISO_2022_JP,
    /// Shift_JIS
    SHIFT_JIS,

    // Korean
    /// EUC-KR
    EUC_KR,

    // Mac
    /// Macintosh Roman
    MACINTOSH,

    // IBM code pages
    /// EBCDIC US/Canada
    IBM037,
    /// DOS US
    IBM437,
    /// DOS Western European
    IBM850,
    /// DOS Central European
    IBM852,
    /// DOS Cyrillic
    IBM855,
    /// DOS Western European with Euro
    IBM00858,
    /// DOS Portuguese
    IBM860,
    /// DOS Hebrew
    IBM862,
    /// DOS French Canadian
    IBM863,
    /// DOS Nordic
    IBM865,
    /// DOS Russian
    IBM866,
    /// EBCDIC Latin-1 (open systems)
    IBM1047,
    /// EBCDIC US/Canada with Euro
    IBM01140,

    // ISO-8859
    /// Latin-1, Western European
    ISO_8859_1,
    /// Latin-2, Central European
    ISO_8859_2,
    /// Latin-3, South European
    ISO_8859_3,
    /// Latin-4, North European
    ISO_8859_4,
    /// Cyrillic
    ISO_8859_5,
    /// Arabic
    ISO_8859_6,
    /// Arabic, explicit directionality
    ISO_8859_6_E,
    /// Arabic, implicit directionality
    ISO_8859_6_I,
    /// Greek
    ISO_8859_7,
    /// Hebrew (visual)
    ISO_8859_8,
    /// Hebrew, explicit directionality
    ISO_8859_8_E,
    /// Hebrew, logical order
    ISO_8859_8_I,
    /// Latin-5, Turkish
    ISO_8859_9,
    /// Latin-6, Nordic
    ISO_8859_10,
    /// Latin-7, Baltic Rim
    ISO_8859_13,
    /// Latin-8, Celtic
    ISO_8859_14,
    /// Latin-9, Western European with Euro
    ISO_8859_15,
    /// Latin-10, South-Eastern European
    ISO_8859_16,

    // Cyrillic
    /// KOI8-R (Russian)
    KOI8_R,
    /// KOI8-U (Ukrainian)
    KOI8_U,

    // Windows code pages
    /// Thai
    WINDOWS_874,
    /// Central/Eastern European
    WINDOWS_1250,
    /// Cyrillic
    WINDOWS_1251,
    /// Western European
    WINDOWS_1252,
    /// Greek
    WINDOWS_1253,
    /// Turkish
    WINDOWS_1254,
    /// Hebrew
    WINDOWS_1255,
    /// Arabic
    WINDOWS_1256,
    /// Baltic
    WINDOWS_1257,
    /// Vietnamese
    WINDOWS_1258,
}

/// Coarse grouping used for listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// UTF-8 and UTF-16 variants
    Unicode,
    /// GBK, GB18030, Big5, HZ
    Chinese,
    /// EUC-JP, ISO-2022-JP, Shift_JIS
    Japanese,
    /// EUC-KR
    Korean,
    /// Classic Mac OS
    Mac,
    /// IBM EBCDIC and DOS code pages
    Ibm,
    /// ISO-8859 series
    Iso,
    /// KOI8 family
    Cyrillic,
    /// Windows code pages
    Windows,
}

impl Category {
    /// Lowercase name as accepted by the CLI filter
    pub fn name(self) -> &'static str {
        match self {
            Category::Unicode => "unicode",
            Category::Chinese => "chinese",
            Category::Japanese => "japanese",
            Category::Korean => "korean",
            Category::Mac => "mac",
            Category::Ibm => "ibm",
            Category::Iso => "iso",
            Category::Cyrillic => "cyrillic",
            Category::Windows => "windows",
        }
    }
}

impl Charset {
    /// Every named charset, in listing order
    pub const ALL: &'static [Charset] = &[
        Charset::UTF8,
        Charset::UTF16,
        Charset::UTF16BE,
        Charset::UTF16LE,
        Charset::GBK,
        Charset::GB18030,
        Charset::BIG5,
        Charset::HZ_GB_2312,
        Charset::EUC_JP,
        Charset::ISO_2022_JP,
        Charset::SHIFT_JIS,
        Charset::EUC_KR,
        Charset::MACINTOSH,
        Charset::IBM037,
        Charset::IBM437,
        Charset::IBM850,
        Charset::IBM852,
        Charset::IBM855,
        Charset::IBM00858,
        Charset::IBM860,
        Charset::IBM862,
        Charset::IBM863,
        Charset::IBM865,
        Charset::IBM866,
        Charset::IBM1047,
        Charset::IBM01140,
        Charset::ISO_8859_1,
        Charset::ISO_8859_2,
        Charset::ISO_8859_3,
        Charset::ISO_8859_4,
        Charset::ISO_8859_5,
        Charset::ISO_8859_6,
        Charset::ISO_8859_6_E,
        Charset::ISO_8859_6_I,
        Charset::ISO_8859_7,
        Charset::ISO_8859_8,
        Charset::ISO_8859_8_E,
        Charset::ISO_8859_8_I,
        Charset::ISO_8859_9,
        Charset::ISO_8859_10,
        Charset::ISO_8859_13,
        Charset::ISO_8859_14,
        Charset::ISO_8859_15,
        Charset::ISO_8859_16,
        Charset::KOI8_R,
        Charset::KOI8_U,
        Charset::WINDOWS_874,
        Charset::WINDOWS_1250,
        Charset::WINDOWS_1251,
        Charset::WINDOWS_1252,
        Charset::WINDOWS_1253,
        Charset::WINDOWS_1254,
        Charset::WINDOWS_1255,
        Charset::WINDOWS_1256,
        Charset::WINDOWS_1257,
        Charset::WINDOWS_1258,
    ];

    /// Get the canonical (IANA-style) name of this charset
    pub fn name(self) -> &'static str {
        match self {
            Charset::UTF8 => "UTF-8",
            Charset::UTF16 => "UTF-16",
            Charset::UTF16BE => "UTF-16BE",
            Charset::UTF16LE => "UTF-16LE",

            Charset::GBK => "GBK",
            Charset::GB18030 => "GB18030",
            Charset::BIG5 => "Big5",
            Charset::HZ_GB_2312 => "HZ-GB-2312",

            Charset::EUC_JP => "EUC-JP",
            Charset::ISO_2022_JP => "ISO-2022-JP",
            Charset::SHIFT_JIS => "Shift_JIS",

            Charset::EUC_KR => "EUC-KR",

            Charset::MACINTOSH => "macintosh",

            Charset::IBM037 => "IBM037",
            Charset::IBM437 => "IBM437",
            Charset::IBM850 => "IBM850",
            Charset::IBM852 => "IBM852",
            Charset::IBM855 => "IBM855",
            Charset::IBM00858 => "IBM00858",
            Charset::IBM860 => "IBM860",
            Charset::IBM862 => "IBM862",
            Charset::IBM863 => "IBM863",
            Charset::IBM865 => "IBM865",
            Charset::IBM866 => "IBM866",
            Charset::IBM1047 => "IBM1047",
            Charset::IBM01140 => "IBM01140",

            Charset::ISO_8859_1 => "ISO-8859-1",
            Charset::ISO_8859_2 => "ISO-8859-2",
            Charset::ISO_8859_3 => "ISO-8859-3",
            Charset::ISO_8859_4 => "ISO-8859-4",
            Charset::ISO_8859_5 => "ISO-8859-5",
            Charset::ISO_8859_6 => "ISO-8859-6",
            Charset::ISO_8859_6_E => "ISO-8859-6-E",
            Charset::ISO_8859_6_I => "ISO-8859-6-I",
            Charset::ISO_8859_7 => "ISO-8859-7",
            Charset::ISO_8859_8 => "ISO-8859-8",
            Charset::ISO_8859_8_E => "ISO-8859-8-E",
            Charset::ISO_8859_8_I => "ISO-8859-8-I",
            Charset::ISO_8859_9 => "ISO-8859-9",
            Charset::ISO_8859_10 => "ISO-8859-10",
            Charset::ISO_8859_13 => "ISO-8859-13",
            Charset::ISO_8859_14 => "ISO-8859-14",
            Charset::ISO_8859_15 => "ISO-8859-15",
            Charset::ISO_8859_16 => "ISO-8859-16",

            Charset::KOI8_R => "KOI8-R",
            Charset::KOI8_U => "KOI8-U",

            Charset::WINDOWS_874 => "Windows-874",
            Charset::WINDOWS_1250 => "Windows-1250",
            Charset::WINDOWS_1251 => "Windows-1251",
            Charset::WINDOWS_1252 => "Windows-1252",
            Charset::WINDOWS_1253 => "Windows-1253",
            Charset::WINDOWS_1254 => "Windows-1254",
            Charset::WINDOWS_1255 => "Windows-1255",
            Charset::WINDOWS_1256 => "Windows-1256",
            Charset::WINDOWS_1257 => "Windows-1257",
            Charset::WINDOWS_1258 => "Windows-1258",
        }
    }

    /// Listing group of this charset
    pub fn category(self) -> Category {
        match self {
            Charset::UTF8 | Charset::UTF16 | Charset::UTF16BE | Charset::UTF16LE => {
                Category::Unicode
            }
            Charset::GBK | Charset::GB18030 | Charset::BIG5 | Charset::HZ_GB_2312 => {
                Category::Chinese
            }
            Charset::EUC_JP | Charset::ISO_2022_JP | Charset::SHIFT_JIS => Category::Japanese,
            Charset::EUC_KR => Category::Korean,
            Charset::MACINTOSH => Category::Mac,
            Charset::IBM037
            | Charset::IBM437
            | Charset::IBM850
            | Charset::IBM852
            | Charset::IBM855
            | Charset::IBM00858
            | Charset::IBM860
            | Charset::IBM862
            | Charset::IBM863
            | Charset::IBM865
            | Charset::IBM866
            | Charset::IBM1047
            | Charset::IBM01140 => Category::Ibm,
            Charset::KOI8_R | Charset::KOI8_U => Category::Cyrillic,
            Charset::WINDOWS_874
            | Charset::WINDOWS_1250
            | Charset::WINDOWS_1251
            | Charset::WINDOWS_1252
            | Charset::WINDOWS_1253
            | Charset::WINDOWS_1254
            | Charset::WINDOWS_1255
            | Charset::WINDOWS_1256
            | Charset::WINDOWS_1257
            | Charset::WINDOWS_1258 => Category::Windows,
            _ => Category::Iso,
        }
    }

    /// Check if ASCII bytes 0-127 keep their ASCII meaning in this charset
    pub fn is_ascii_compatible(self) -> bool {
        !matches!(
            self,
            Charset::UTF16
                | Charset::UTF16BE
                | Charset::UTF16LE
                | Charset::IBM037
                | Charset::IBM1047
                | Charset::IBM01140
                // ISO-2022-JP and HZ reuse ASCII bytes inside escape sequences
                | Charset::ISO_2022_JP
                | Charset::HZ_GB_2312
        )
    }

    /// Check if this charset uses more than one byte for some characters
    pub fn is_multibyte(self) -> bool {
        matches!(
            self,
            Charset::UTF8
                | Charset::UTF16
                | Charset::UTF16BE
                | Charset::UTF16LE
                | Charset::GBK
                | Charset::GB18030
                | Charset::BIG5
                | Charset::HZ_GB_2312
                | Charset::EUC_JP
                | Charset::ISO_2022_JP
                | Charset::SHIFT_JIS
                | Charset::EUC_KR
        )
    }

    /// Get the byte order mark written by this charset's encoder, if any
    pub fn bom(self) -> Option<&'static [u8]> {
        match self {
            Charset::UTF16 => Some(&[0xFE, 0xFF]),
            _ => None,
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AsRef<str> for Charset {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl Serialize for Charset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = Error;

    /// Parse a canonical name (case-insensitive) or a registered alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = unalias(s);
        Charset::ALL
            .iter()
            .copied()
            .find(|charset| charset_eq(charset.name(), name))
            .ok_or_else(|| Error::unsupported(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_names() {
        assert_eq!(Charset::UTF8.name(), "UTF-8");
        assert_eq!(Charset::SHIFT_JIS.name(), "Shift_JIS");
        assert_eq!(Charset::IBM00858.name(), "IBM00858");
        assert_eq!(Charset::MACINTOSH.to_string(), "macintosh");
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("gbk".parse::<Charset>().unwrap(), Charset::GBK);
        assert_eq!("SHIFT_JIS".parse::<Charset>().unwrap(), Charset::SHIFT_JIS);
        assert_eq!("windows-1252".parse::<Charset>().unwrap(), Charset::WINDOWS_1252);
        assert!("not-a-real-charset".parse::<Charset>().is_err());
    }

    #[test]
    fn test_parse_applies_aliases() {
        assert_eq!("HZGB2312".parse::<Charset>().unwrap(), Charset::HZ_GB_2312);
        assert_eq!("hzgb2312".parse::<Charset>().unwrap(), Charset::HZ_GB_2312);
    }

    #[test]
    fn test_unalias_is_exact() {
        assert_eq!(unalias("HZGB2312"), "HZ-GB-2312");
        assert_eq!(unalias("hzgb2312"), "HZ-GB-2312");
        assert_eq!(unalias("HzGb2312"), "HzGb2312");
        assert_eq!(unalias("GBK"), "GBK");
    }

    #[test]
    fn test_all_names_are_distinct() {
        for (i, a) in Charset::ALL.iter().enumerate() {
            for b in &Charset::ALL[i + 1..] {
                assert!(!charset_eq(a.name(), b.name()), "{a} and {b} collide");
            }
        }
    }

    #[test]
    fn test_charset_properties() {
        assert!(Charset::WINDOWS_1250.is_ascii_compatible());
        assert!(Charset::IBM437.is_ascii_compatible());
        assert!(!Charset::IBM037.is_ascii_compatible());

        assert!(Charset::UTF8.is_multibyte());
        assert!(Charset::GB18030.is_multibyte());
        assert!(!Charset::KOI8_R.is_multibyte());

        assert_eq!(Charset::UTF16.bom(), Some([0xFE, 0xFF].as_slice()));
        assert_eq!(Charset::UTF16LE.bom(), None);

        assert_eq!(Charset::IBM01140.category(), Category::Ibm);
        assert_eq!(Charset::ISO_8859_8_I.category(), Category::Iso);
        assert_eq!(Charset::KOI8_U.category().name(), "cyrillic");
    }
}
