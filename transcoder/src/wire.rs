use crate::error::TranscodeError;
use crate::xml;
use serde_json::Value;
use std::fmt;

/// Wire syntaxes understood by the transcoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Xml,
}

impl WireFormat {
    /// Maps a `Content-Type` header value to a wire format, ignoring parameters
    /// such as `charset`.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "application/json" | "text/json" => Some(WireFormat::Json),
            "application/xml" | "text/xml" => Some(WireFormat::Xml),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Json => "application/json",
            WireFormat::Xml => "application/xml",
        }
    }

    pub fn parse(&self, raw: &[u8]) -> Result<Value, TranscodeError> {
        match self {
            WireFormat::Json => Ok(serde_json::from_slice(raw)?),
            WireFormat::Xml => Ok(xml::parse(std::str::from_utf8(raw)?)?),
        }
    }

    pub fn serialize(&self, document: &Value) -> Result<Vec<u8>, TranscodeError> {
        match self {
            WireFormat::Json => Ok(serde_json::to_vec_pretty(document)?),
            WireFormat::Xml => Ok(xml::to_string(document)?.into_bytes()),
        }
    }
}

impl fmt::Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireFormat::Json => write!(f, "json"),
            WireFormat::Xml => write!(f, "xml"),
        }
    }
}

/// A pre-shaped skeleton document that field setters fill in.
///
/// Templates are parsed once; every translation works on a deep copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    format: WireFormat,
    document: Value,
}

impl Template {
    pub fn parse(format: WireFormat, text: &str) -> Result<Self, TranscodeError> {
        Ok(Template {
            format,
            document: format.parse(text.as_bytes())?,
        })
    }

    pub fn from_document(format: WireFormat, document: Value) -> Self {
        Template { format, document }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn instantiate(&self) -> Value {
        self.document.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_types() {
        assert_eq!(WireFormat::from_content_type("application/json"), Some(WireFormat::Json));
        assert_eq!(WireFormat::from_content_type("text/json"), Some(WireFormat::Json));
        assert_eq!(
            WireFormat::from_content_type("text/xml; charset=utf-8"),
            Some(WireFormat::Xml)
        );
        assert_eq!(WireFormat::from_content_type("Application/XML"), Some(WireFormat::Xml));
        assert_eq!(WireFormat::from_content_type("text/plain"), None);
        assert_eq!(WireFormat::from_content_type(""), None);
    }

    #[test]
    fn test_parse_errors_are_malformed() {
        let err = WireFormat::Json.parse(b"{not json").unwrap_err();
        assert!(err.is_malformed());
        let err = WireFormat::Xml.parse(b"<a><b></a>").unwrap_err();
        assert!(err.is_malformed());
        let err = WireFormat::Xml.parse(&[0xff, 0xfe]).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_template_copies_are_independent() {
        let template = Template::parse(WireFormat::Json, r#"{"a": {"b": []}}"#).unwrap();
        let mut copy = template.instantiate();
        copy["a"]["b"] = json!([1]);
        assert_eq!(template.document(), &json!({"a": {"b": []}}));
        assert_eq!(template.format(), WireFormat::Json);
    }
}
