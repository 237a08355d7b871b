//! Charset detection for unlabeled byte streams
//!
//! Byte order marks are trusted first. Anything else goes to `chardetng`,
//! whose guess is reported together with its own assessment of how sure it
//! is.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use serde::Serialize;
use tracing::debug;

use crate::{Charset, Error, Result};

/// How much trust to put in a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// A byte order mark named the charset
    Certain,
    /// The detector considers its guess reliable
    High,
    /// Best guess among poor candidates
    Low,
}

/// Result of charset detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    /// Most likely charset
    pub charset: String,
    /// Language hint, when the charset is tied to one language
    pub language: Option<&'static str>,
    /// How sure the detector is
    pub confidence: Confidence,
    /// Whether a BOM was detected
    pub bom_detected: bool,
}

/// Classifies bytes into a single best charset
pub trait Detector: Send + Sync {
    /// Classify `bytes`. When `at_end` is false the input may stop in the
    /// middle of a character and a truncated tail is not held against any
    /// candidate.
    ///
    /// # Errors
    ///
    /// [`Error::Undetected`] when `bytes` is empty.
    fn classify(&self, bytes: &[u8], at_end: bool) -> Result<DetectionResult>;

    /// Detect the charset of a complete input
    fn detect(&self, bytes: &[u8]) -> Result<DetectionResult> {
        self.classify(bytes, true)
    }

    /// Detect from at most `max_bytes` read from `reader`.
    ///
    /// A reader ending early is fine; read errors are returned. A full
    /// `max_bytes` prefix is treated as cut short.
    fn detect_prefix(&self, reader: &mut dyn Read, max_bytes: usize) -> Result<DetectionResult> {
        let mut prefix = Vec::with_capacity(max_bytes.min(64 * 1024));
        reader.take(max_bytes as u64).read_to_end(&mut prefix)?;
        self.classify(&prefix, prefix.len() < max_bytes)
    }
}

/// Detector backed by `chardetng`
#[derive(Debug, Clone)]
pub struct ChardetngDetector {
    tld: Option<Vec<u8>>,
    allow_utf8: bool,
}

impl Default for ChardetngDetector {
    fn default() -> Self {
        Self {
            tld: None,
            allow_utf8: true,
        }
    }
}

impl ChardetngDetector {
    /// Create a detector with no TLD hint that may answer UTF-8
    pub fn new() -> Self {
        Self::default()
    }

    /// Hint the top-level domain the content came from, e.g. `"jp"`
    pub fn with_tld(mut self, tld: &str) -> Self {
        self.tld = Some(tld.trim_start_matches('.').to_ascii_lowercase().into_bytes());
        self
    }

    /// Whether UTF-8 is an acceptable answer for non-ASCII input
    pub fn allow_utf8(mut self, allow: bool) -> Self {
        self.allow_utf8 = allow;
        self
    }
}

impl Detector for ChardetngDetector {
    fn classify(&self, bytes: &[u8], at_end: bool) -> Result<DetectionResult> {
        if bytes.is_empty() {
            return Err(Error::Undetected);
        }

        if let Some(charset) = detect_bom(bytes) {
            debug!(charset = charset.name(), "charset from byte order mark");
            return Ok(DetectionResult {
                charset: charset.name().to_owned(),
                language: None,
                confidence: Confidence::Certain,
                bom_detected: true,
            });
        }

        let mut detector = EncodingDetector::new();
        detector.feed(bytes, at_end);
        let (encoding, reliable) = detector.guess_assess(self.tld.as_deref(), self.allow_utf8);
        let confidence = if reliable {
            Confidence::High
        } else {
            Confidence::Low
        };
        debug!(charset = encoding.name(), ?confidence, at_end, "charset guessed by chardetng");

        Ok(DetectionResult {
            charset: canonical_name(encoding),
            language: language_of(encoding),
            confidence,
            bom_detected: false,
        })
    }
}

fn detect_bom(bytes: &[u8]) -> Option<Charset> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some(Charset::UTF8)
    } else if bytes.starts_with(&[0xFF, 0xFE]) {
        Some(Charset::UTF16LE)
    } else if bytes.starts_with(&[0xFE, 0xFF]) {
        Some(Charset::UTF16BE)
    } else {
        None
    }
}

/// Our spelling of the encoding's name when we have one
fn canonical_name(encoding: &'static Encoding) -> String {
    encoding
        .name()
        .parse::<Charset>()
        .map_or_else(|_| encoding.name().to_owned(), |charset| charset.name().to_owned())
}

fn language_of(encoding: &'static Encoding) -> Option<&'static str> {
    let language = match encoding.name() {
        "Shift_JIS" | "EUC-JP" | "ISO-2022-JP" => "ja",
        "GBK" | "gb18030" | "Big5" => "zh",
        "EUC-KR" => "ko",
        "KOI8-R" | "IBM866" => "ru",
        "KOI8-U" => "uk",
        "windows-1253" | "ISO-8859-7" => "el",
        "windows-1255" | "ISO-8859-8" | "ISO-8859-8-I" => "he",
        "windows-1256" | "ISO-8859-6" => "ar",
        "windows-1254" => "tr",
        "windows-1258" => "vi",
        "windows-874" => "th",
        _ => return None,
    };
    Some(language)
}

/// Best guess for `bytes` with the default detector
pub fn guess_best(bytes: &[u8]) -> Result<DetectionResult> {
    ChardetngDetector::default().detect(bytes)
}

/// Best guess from at most `max_bytes` of `reader`
pub fn guess_best_prefix<R: Read>(mut reader: R, max_bytes: usize) -> Result<DetectionResult> {
    ChardetngDetector::default().detect_prefix(&mut reader, max_bytes)
}

/// Best guess from at most `max_bytes` of the file at `path`
pub fn guess_best_of_file(path: impl AsRef<Path>, max_bytes: usize) -> Result<DetectionResult> {
    let file = File::open(path)?;
    guess_best_prefix(file, max_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pipeline;
    use std::io::{self, Cursor};

    const JAPANESE: &str = "吾輩は猫である。名前はまだ無い。どこで生れたかとんと見当がつかぬ。\
        何でも薄暗いじめじめした所でニャーニャー泣いていた事だけは記憶している。";
    const RUSSIAN: &str = "Все счастливые семьи похожи друг на друга, каждая несчастливая \
        семья несчастлива по-своему. Всё смешалось в доме Облонских.";

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("unreadable"))
        }
    }

    #[test]
    fn test_empty_input_is_undetected() {
        assert!(matches!(guess_best(b""), Err(Error::Undetected)));
        assert!(matches!(guess_best_prefix(&b""[..], 100), Err(Error::Undetected)));
    }

    #[test]
    fn test_bom_is_certain() {
        let cases: [(&[u8], &str); 3] = [
            (&[0xEF, 0xBB, 0xBF, b'a'], "UTF-8"),
            (&[0xFF, 0xFE, b'a', 0x00], "UTF-16LE"),
            (&[0xFE, 0xFF, 0x00, b'a'], "UTF-16BE"),
        ];
        for (bytes, charset) in cases {
            let result = guess_best(bytes).unwrap();
            assert_eq!(result.charset, charset);
            assert_eq!(result.confidence, Confidence::Certain);
            assert!(result.bom_detected);
        }
    }

    #[test]
    fn test_ascii_gets_the_fallback_guess() {
        let result = guess_best(b"plain old ascii").unwrap();
        assert_eq!(result.charset, "Windows-1252");
        assert!(!result.bom_detected);
        assert_eq!(result.language, None);
    }

    #[test]
    fn test_iso_2022_jp() {
        let bytes = Pipeline::default().encode(JAPANESE, "ISO-2022-JP").unwrap();
        assert!(bytes.is_ascii());
        let result = guess_best(&bytes).unwrap();
        assert_eq!(result.charset, "ISO-2022-JP");
        assert_eq!(result.language, Some("ja"));
        assert_eq!(Pipeline::default().decode(&bytes, &result.charset).unwrap(), JAPANESE);
    }

    #[test]
    fn test_utf8_text() {
        let result = guess_best(JAPANESE.as_bytes()).unwrap();
        assert_eq!(result.charset, "UTF-8");

        let result = ChardetngDetector::new()
            .allow_utf8(false)
            .detect(JAPANESE.as_bytes())
            .unwrap();
        assert_ne!(result.charset, "UTF-8");
    }

    #[test]
    fn test_shift_jis() {
        let bytes = Pipeline::default().encode(JAPANESE, "Shift_JIS").unwrap();
        let result = ChardetngDetector::new().with_tld("jp").detect(&bytes).unwrap();
        assert_eq!(result.charset, "Shift_JIS");
        assert_eq!(result.language, Some("ja"));
        assert!(!result.bom_detected);
    }

    #[test]
    fn test_windows_1251() {
        let bytes = Pipeline::default().encode(RUSSIAN, "windows-1251").unwrap();
        let result = guess_best(&bytes).unwrap();
        assert_eq!(result.charset, "Windows-1251");
        assert_eq!(result.language, None);
    }

    #[test]
    fn test_prefix_reads_at_most_max_bytes() {
        let mut cursor = Cursor::new(b"abcdefgh".to_vec());
        let result = ChardetngDetector::new().detect_prefix(&mut cursor, 3).unwrap();
        assert_eq!(result.charset, "Windows-1252");
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_prefix_cut_mid_character() {
        let utf8 = JAPANESE.as_bytes();
        // 33 three-byte characters and one lead byte
        let result = guess_best_prefix(utf8, 100).unwrap();
        assert_eq!(result.charset, "UTF-8");

        let sjis = Pipeline::default().encode(JAPANESE, "Shift_JIS").unwrap();
        let odd = sjis.len() - 1;
        let result = ChardetngDetector::new()
            .with_tld("jp")
            .detect_prefix(&mut &sjis[..], odd)
            .unwrap();
        assert_eq!(result.charset, "Shift_JIS");
    }

    #[test]
    fn test_short_reader_is_complete_input() {
        let mut cursor = Cursor::new(JAPANESE.as_bytes()[..100].to_vec());
        let result = ChardetngDetector::new().detect_prefix(&mut cursor, 1000).unwrap();
        assert_ne!(result.charset, "UTF-8");
    }

    #[test]
    fn test_prefix_read_error_is_returned() {
        assert!(matches!(guess_best_prefix(Broken, 10), Err(Error::Io(_))));
    }

    #[test]
    fn test_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.txt");
        std::fs::write(&path, [0xFF, 0xFE, b'h', 0x00]).unwrap();
        assert_eq!(guess_best_of_file(&path, 2).unwrap().charset, "UTF-16LE");
        assert!(matches!(
            guess_best_of_file(dir.path().join("missing"), 2),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_serializes() {
        let result = guess_best(&[0xFF, 0xFE, b'h', 0x00]).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "charset": "UTF-16LE",
                "language": null,
                "confidence": "certain",
                "bom_detected": true,
            })
        );
    }
}
