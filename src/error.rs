//! Error types shared by every conversion entry point.

use std::io;

use crate::codec::UnmappableError;

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, converting or detecting charsets
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No provider recognises the requested charset name
    #[error("unsupported charset: {name}")]
    UnsupportedCharset {
        /// The name as the caller spelled it
        name: String,
    },

    /// The conversion is structurally disallowed, e.g. identical source and
    /// destination charsets
    #[error("unsupported conversion: {src} => {dest}")]
    UnsupportedConversion {
        /// Source charset name
        src: String,
        /// Destination charset name
        dest: String,
    },

    /// A character in the input has no representation in the target charset
    #[error("cannot encode character {character:?} in {charset}")]
    Unmappable {
        /// Target charset name
        charset: String,
        /// The character that could not be encoded
        character: char,
    },

    /// The detector had no input to classify
    #[error("no charset could be detected from empty input")]
    Undetected,

    /// Underlying read, write, open, seek or sync failure
    #[error(transparent)]
    Io(io::Error),
}

impl Error {
    pub(crate) fn unsupported(name: &str) -> Self {
        Error::UnsupportedCharset {
            name: name.to_owned(),
        }
    }

    pub(crate) fn unsupported_conversion(src: &str, dest: &str) -> Self {
        Error::UnsupportedConversion {
            src: src.to_owned(),
            dest: dest.to_owned(),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // Streaming adapters can only report through io::Error; recover the
        // unmappable payload when it is there.
        if let Some(unmappable) = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<UnmappableError>())
        {
            return Error::Unmappable {
                charset: unmappable.charset.clone(),
                character: unmappable.character,
            };
        }
        Error::Io(err)
    }
}

impl From<UnmappableError> for Error {
    fn from(err: UnmappableError) -> Self {
        Error::Unmappable {
            charset: err.charset,
            character: err.character,
        }
    }
}
