//! Name → codec resolution over an ordered chain of providers.

use std::fmt;
use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::charset::unalias;
use crate::codec::{Codec, CodePageProvider, CodecProvider, Decoder, Encoder, HzProvider, WhatwgProvider};
use crate::{Error, Result};

static BUILTIN: LazyLock<CharsetRegistry> = LazyLock::new(CharsetRegistry::default);

/// Resolves charset names to codecs.
///
/// Names are rewritten through the alias table, then each provider is asked
/// in order and the first match wins. Codecs are never cached; every call
/// resolves afresh.
pub struct CharsetRegistry {
    providers: Vec<Box<dyn CodecProvider>>,
}

impl CharsetRegistry {
    /// Start an empty provider chain
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            providers: Vec::new(),
        }
    }

    /// Process-wide registry with the built-in providers
    pub fn builtin() -> &'static CharsetRegistry {
        &BUILTIN
    }

    /// Resolve `name` to a codec.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedCharset`] naming `name` as given when no provider
    /// recognises it.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Codec>> {
        let lookup = unalias(name);
        for provider in &self.providers {
            if let Some(codec) = provider.lookup(lookup) {
                debug!(charset = name, codec = codec.name(), "resolved charset");
                return Ok(codec);
            }
        }
        debug!(charset = name, "no provider recognises charset");
        Err(Error::unsupported(name))
    }

    /// Check if `name` resolves
    pub fn is_supported(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    /// Resolve `name` and create a fresh decoder
    pub fn decoder(&self, name: &str) -> Result<Box<dyn Decoder>> {
        Ok(self.resolve(name)?.new_decoder())
    }

    /// Resolve `name` and create a fresh encoder
    pub fn encoder(&self, name: &str) -> Result<Box<dyn Encoder>> {
        Ok(self.resolve(name)?.new_encoder())
    }
}

impl Default for CharsetRegistry {
    /// Code pages, then HZ, then the WHATWG set
    fn default() -> Self {
        CharsetRegistry::builder()
            .provider(CodePageProvider)
            .provider(HzProvider)
            .provider(WhatwgProvider)
            .build()
    }
}

impl fmt::Debug for CharsetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharsetRegistry")
            .field("providers", &self.providers.len())
            .finish()
    }
}

/// Builder for a custom provider chain
pub struct RegistryBuilder {
    providers: Vec<Box<dyn CodecProvider>>,
}

impl RegistryBuilder {
    /// Append a provider; earlier providers take precedence
    pub fn provider(mut self, provider: impl CodecProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Finish the chain
    pub fn build(self) -> CharsetRegistry {
        CharsetRegistry {
            providers: self.providers,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::charset::{Charset, charset_eq};
    use crate::codec::UnmappableError;

    /// Codec that upper-cases ASCII on encode and lower-cases on decode
    #[derive(Debug)]
    pub(crate) struct FakeCodec(pub &'static str);

    struct Lower;
    struct Upper;

    impl Decoder for Lower {
        fn decode(&mut self, src: &[u8], dst: &mut Vec<u8>, _last: bool) {
            dst.extend(src.iter().map(u8::to_ascii_lowercase));
        }
    }

    impl Encoder for Upper {
        fn encode(&mut self, src: &str, dst: &mut Vec<u8>, _last: bool) -> std::result::Result<(), UnmappableError> {
            match src.chars().find(|c| !c.is_ascii()) {
                Some(character) => Err(UnmappableError {
                    charset: "FAKE".to_owned(),
                    character,
                }),
                None => {
                    dst.extend(src.bytes().map(|b| b.to_ascii_uppercase()));
                    Ok(())
                }
            }
        }
    }

    impl Codec for FakeCodec {
        fn name(&self) -> &str {
            self.0
        }

        fn new_decoder(&self) -> Box<dyn Decoder> {
            Box::new(Lower)
        }

        fn new_encoder(&self) -> Box<dyn Encoder> {
            Box::new(Upper)
        }
    }

    /// Provider answering a single name with a [`FakeCodec`]
    pub(crate) struct FakeProvider {
        pub(crate) answers: &'static str,
        pub(crate) codec_name: &'static str,
    }

    impl CodecProvider for FakeProvider {
        fn lookup(&self, name: &str) -> Option<Arc<dyn Codec>> {
            charset_eq(name, self.answers).then(|| Arc::new(FakeCodec(self.codec_name)) as Arc<dyn Codec>)
        }
    }

    #[test]
    fn test_first_provider_wins() {
        let registry = CharsetRegistry::builder()
            .provider(FakeProvider {
                answers: "GBK",
                codec_name: "first",
            })
            .provider(FakeProvider {
                answers: "GBK",
                codec_name: "second",
            })
            .build();
        assert_eq!(registry.resolve("gbk").unwrap().name(), "first");
    }

    #[test]
    fn test_unknown_charset() {
        let registry = CharsetRegistry::builtin();
        match registry.resolve("not-a-real-charset") {
            Err(Error::UnsupportedCharset { name }) => assert_eq!(name, "not-a-real-charset"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!registry.is_supported("not-a-real-charset"));
        assert!(!registry.is_supported(""));
        assert!(!CharsetRegistry::builder().build().is_supported("UTF-8"));
    }

    #[test]
    fn test_aliases_resolve_to_hz() {
        let registry = CharsetRegistry::builtin();
        for name in ["hzgb2312", "HZGB2312", "HZ-GB-2312"] {
            assert_eq!(registry.resolve(name).unwrap().name(), "HZ-GB-2312");
        }
    }

    #[test]
    fn test_alias_applies_before_custom_providers() {
        let registry = CharsetRegistry::builder()
            .provider(FakeProvider {
                answers: "HZ-GB-2312",
                codec_name: "fake-hz",
            })
            .build();
        assert_eq!(registry.resolve("hzgb2312").unwrap().name(), "fake-hz");
    }

    #[test]
    fn test_every_named_charset_is_supported() {
        let registry = CharsetRegistry::builtin();
        for charset in Charset::ALL {
            assert!(registry.is_supported(charset.name()), "{charset}");
        }
    }

    #[test]
    fn test_builtin_order() {
        let registry = CharsetRegistry::builtin();
        // The table provider shadows WHATWG's windows-1252 reading
        assert_eq!(registry.resolve("ISO-8859-1").unwrap().name(), "ISO-8859-1");
        assert_eq!(registry.resolve("ISO-8859-9").unwrap().name(), "ISO-8859-9");
        assert_eq!(registry.resolve("UTF-16").unwrap().name(), "UTF-16");
        assert_eq!(registry.resolve("windows-1252").unwrap().name(), "windows-1252");
    }

    #[test]
    fn test_fresh_coders() {
        let registry = CharsetRegistry::builtin();
        let mut out = Vec::new();
        registry.decoder("GBK").unwrap().decode(&[0xC4, 0xE3], &mut out, true);
        assert_eq!(out, "你".as_bytes());
        assert!(registry.encoder("nope").is_err());
    }
}
