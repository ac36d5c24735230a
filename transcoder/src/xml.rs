//! Markup codec producing and consuming generic documents.
//!
//! The tree shape follows the common "explicit array" convention:
//!
//! - the document is `{RootName: content}`
//! - every child element name maps to an array holding one entry per occurrence
//! - an element with neither attributes nor children is its text (`""` when empty)
//! - attributes live under `"$"`, text next to children or attributes under `"_"`
//!
//! Serialization accepts the same shape and is lenient about single values
//! that are not wrapped in arrays.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

pub const ATTRIBUTES_KEY: &str = "$";
pub const TEXT_KEY: &str = "_";

const INDENT: &str = "    ";

#[derive(thiserror::Error, Debug)]
pub enum XmlError {
    #[error("{0}")]
    Syntax(#[from] quick_xml::Error),
    #[error("invalid attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("document has no root element")]
    NoRoot,
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("unclosed element <{0}>")]
    Unclosed(String),
    #[error("document must be an object with exactly one root key")]
    InvalidRoot,
}

struct OpenElement {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl OpenElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            attributes.insert(key, Value::String(value));
        }

        Ok(OpenElement {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn into_value(self) -> (String, Value) {
        let text = self.text.trim();
        if self.attributes.is_empty() && self.children.is_empty() {
            return (self.name, Value::String(text.to_string()));
        }

        let mut content = Map::new();
        if !self.attributes.is_empty() {
            content.insert(ATTRIBUTES_KEY.to_string(), Value::Object(self.attributes));
        }
        if !text.is_empty() {
            content.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
        content.extend(self.children);
        (self.name, Value::Object(content))
    }

    fn push_child(&mut self, name: String, value: Value) {
        match self
            .children
            .entry(name)
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            Value::Array(items) => items.push(value),
            other => *other = Value::Array(vec![value]),
        }
    }
}

/// Parses markup into a document.
pub fn parse(input: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::MultipleRoots);
                }
                stack.push(OpenElement::from_start(&start)?);
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::MultipleRoots);
                }
                let element = OpenElement::from_start(&start)?;
                close(element, &mut stack, &mut root);
            }
            Event::End(_) => {
                // Mismatched end tags are rejected by the reader itself
                if let Some(element) = stack.pop() {
                    close(element, &mut stack, &mut root);
                }
            }
            Event::Text(text) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no data
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::NoRoot)
}

fn close(element: OpenElement, stack: &mut [OpenElement], root: &mut Option<Value>) {
    let (name, value) = element.into_value();
    match stack.last_mut() {
        Some(parent) => parent.push_child(name, value),
        None => {
            let mut document = Map::new();
            document.insert(name, value);
            *root = Some(Value::Object(document));
        }
    }
}

/// Serializes a document to headless, indented markup.
pub fn to_string(document: &Value) -> Result<String, XmlError> {
    let Some((name, content)) = document
        .as_object()
        .filter(|root| root.len() == 1)
        .and_then(|root| root.iter().next())
    else {
        return Err(XmlError::InvalidRoot);
    };

    let mut out = String::new();
    // A root given as a one-element array is unwrapped
    let content = match content {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    };
    write_element(&mut out, name, content, 0);
    Ok(out)
}

fn write_element(out: &mut String, name: &str, content: &Value, depth: usize) {
    let indent = INDENT.repeat(depth);
    match content {
        // Absent values produce no element
        Value::Null => {}
        Value::Array(items) => {
            for item in items {
                write_element(out, name, item, depth);
            }
        }
        Value::Object(map) => {
            out.push_str(&indent);
            out.push('<');
            out.push_str(name);
            if let Some(Value::Object(attributes)) = map.get(ATTRIBUTES_KEY) {
                for (key, value) in attributes {
                    if let Some(text) = scalar_text(value) {
                        out.push(' ');
                        out.push_str(key);
                        out.push_str("=\"");
                        out.push_str(&escape(text.as_str()));
                        out.push('"');
                    }
                }
            }

            let text = map.get(TEXT_KEY).and_then(scalar_text);
            let has_children = map
                .iter()
                .any(|(key, value)| key != ATTRIBUTES_KEY && key != TEXT_KEY && !value.is_null());

            match (text, has_children) {
                (None, false) => out.push_str("/>\n"),
                (Some(text), false) => {
                    out.push('>');
                    out.push_str(&escape(text.as_str()));
                    close_tag(out, name);
                }
                (text, true) => {
                    out.push_str(">\n");
                    if let Some(text) = text {
                        out.push_str(&INDENT.repeat(depth + 1));
                        out.push_str(&escape(text.as_str()));
                        out.push('\n');
                    }
                    for (key, value) in map {
                        if key != ATTRIBUTES_KEY && key != TEXT_KEY {
                            write_element(out, key, value, depth + 1);
                        }
                    }
                    out.push_str(&indent);
                    close_tag(out, name);
                }
            }
        }
        scalar => {
            out.push_str(&indent);
            out.push('<');
            out.push_str(name);
            match scalar_text(scalar) {
                Some(text) if !text.is_empty() => {
                    out.push('>');
                    out.push_str(&escape(text.as_str()));
                    close_tag(out, name);
                }
                _ => out.push_str("/>\n"),
            }
        }
    }
}

fn close_tag(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push_str(">\n");
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_explicit_arrays() {
        let doc = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <Root version="2">
                <Item>a</Item>
                <Item>b &amp; c</Item>
                <Empty/>
                <Nested><Leaf>1</Leaf></Nested>
                <Mixed kind="x">text</Mixed>
            </Root>"#,
        )
        .unwrap();

        assert_eq!(
            doc,
            json!({
                "Root": {
                    "$": {"version": "2"},
                    "Item": ["a", "b & c"],
                    "Empty": [""],
                    "Nested": [{"Leaf": ["1"]}],
                    "Mixed": [{"$": {"kind": "x"}, "_": "text"}]
                }
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse(""), Err(XmlError::NoRoot)));
        assert!(matches!(parse("<a></a><b/>"), Err(XmlError::MultipleRoots)));
        assert!(matches!(parse("<a><b></a>"), Err(XmlError::Syntax(_))));
        assert!(matches!(
            parse("<a><b>"),
            Err(XmlError::Unclosed(_)) | Err(XmlError::Syntax(_))
        ));
    }

    #[test]
    fn test_serialize() {
        let doc = json!({
            "Root": {
                "$": {"version": "2"},
                "Item": ["a", "b & c"],
                "Count": [3],
                "Skipped": null,
                "Empty": [""],
                "Nested": [{"Leaf": ["1"]}]
            }
        });

        let expected = "<Root version=\"2\">\n    <Item>a</Item>\n    <Item>b &amp; c</Item>\n    <Count>3</Count>\n    <Empty/>\n    <Nested>\n        <Leaf>1</Leaf>\n    </Nested>\n</Root>\n";
        assert_eq!(to_string(&doc).unwrap(), expected);
    }

    #[test]
    fn test_serialize_then_parse_preserves_shape() {
        let doc = json!({
            "Envelope": {
                "Header": ["h"],
                "Body": [{"Line": ["1", "2"], "Note": [{"$": {"lang": "en"}, "_": "hi"}]}]
            }
        });
        let rendered = to_string(&doc).unwrap();
        assert_eq!(parse(&rendered).unwrap(), doc);
    }

    #[test]
    fn test_serialize_invalid_root() {
        assert!(matches!(to_string(&json!({})), Err(XmlError::InvalidRoot)));
        assert!(matches!(to_string(&json!({"a": 1, "b": 2})), Err(XmlError::InvalidRoot)));
        assert!(matches!(to_string(&json!("a")), Err(XmlError::InvalidRoot)));
    }
}
