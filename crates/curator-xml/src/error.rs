//! Error types for XML parsing.

use thiserror::Error;

/// Result type alias for curator-xml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing an XML document.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax {
        message: String,
        /// Byte offset where the error occurred.
        position: u64,
    },

    /// The document ended before every open element was closed.
    #[error("unexpected end of input, expected closing tag </{expected}>")]
    UnexpectedEof { expected: String },

    /// A closing tag does not match the innermost open element.
    #[error("mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag { expected: String, found: String },

    /// The document contains no root element.
    #[error("empty XML document: no root element found")]
    EmptyDocument,

    /// The document contains more than one root element.
    #[error("multiple root elements")]
    MultipleRoots,

    /// An element interleaves text and child elements.
    #[error("mixed element and text content in <{element}>")]
    MixedContent { element: String },
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Syntax {
            message: err.to_string(),
            position: 0,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Syntax {
            message: format!("attribute error: {}", err),
            position: 0,
        }
    }
}
