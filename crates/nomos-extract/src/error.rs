//! Decoding errors.

use nomos_core::{DocumentError, ParseError, ParseErrorKind};
use thiserror::Error;

/// Failure while decoding a parameter or body.
///
/// [`DecodeError::Parse`] is a problem with the request itself.
/// [`DecodeError::Document`] means the document asked for a serialization
/// the codecs cannot express, which document construction should have
/// rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The raw value is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The document is inconsistent.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl DecodeError {
    /// The parse error kind, if this is a parse error.
    pub fn parse_kind(&self) -> Option<ParseErrorKind> {
        match self {
            Self::Parse(err) => Some(err.kind()),
            Self::Document(_) => None,
        }
    }

    /// Whether this is a document inconsistency.
    pub fn is_document_error(&self) -> bool {
        matches!(self, Self::Document(_))
    }
}
