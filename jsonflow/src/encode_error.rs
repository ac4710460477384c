// SPDX-License-Identifier: Apache-2.0

use core::fmt;

/// Failure reported by an embedded source or deferred value.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while encoding a document
#[derive(Debug)]
pub enum EncodeError {
    /// A pull source had already ended when it was embedded.
    SourceEnded,
    /// A pull source was already being driven by another consumer.
    SourceFlowing,
    /// A value kind that cannot be represented in JSON.
    UnsupportedType(&'static str),
    /// A text-source chunk was not valid UTF-8.
    InvalidUtf8(core::str::Utf8Error),
    /// An embedded source or deferred value failed.
    Source(SourceError),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::SourceEnded => {
                write!(f, "pull source has already ended, unable to encode it")
            }
            EncodeError::SourceFlowing => {
                write!(f, "pull source is already flowing, data may be lost")
            }
            EncodeError::UnsupportedType(kind) => {
                write!(f, "{kind} value can't be encoded as JSON")
            }
            EncodeError::InvalidUtf8(e) => write!(f, "invalid UTF-8 in text source: {e}"),
            EncodeError::Source(e) => write!(f, "embedded source failed: {e}"),
        }
    }
}

impl std::error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EncodeError::Source(err) => Some(err.as_ref()),
            EncodeError::InvalidUtf8(err) => Some(err),
            _ => None,
        }
    }
}

impl From<core::str::Utf8Error> for EncodeError {
    fn from(err: core::str::Utf8Error) -> Self {
        EncodeError::InvalidUtf8(err)
    }
}

impl From<SourceError> for EncodeError {
    fn from(err: SourceError) -> Self {
        EncodeError::Source(err)
    }
}
