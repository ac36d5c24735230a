use crate::path::PathError;
use crate::xml::XmlError;
use thiserror::Error;

/// Errors raised while building field tables and schemas at startup.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("duplicate field name in table: {0}")]
    DuplicateField(String),

    #[error("invalid template: {0}")]
    Template(#[from] TranscodeError),
}

/// Errors raised while translating a single document.
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("invalid XML: {0}")]
    MalformedXml(#[from] XmlError),

    #[error("invalid XML: body is not valid UTF-8")]
    XmlEncoding(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl TranscodeError {
    /// True when the wire bytes could not be parsed at all.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            TranscodeError::MalformedXml(_)
                | TranscodeError::XmlEncoding(_)
                | TranscodeError::MalformedJson(_)
        )
    }
}
