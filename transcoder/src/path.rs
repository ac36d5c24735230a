//! Pre-parsed addressing into nested documents.
//!
//! A [`Path`] is parsed once from a lodash-style string such as
//! `MaXML_Envelope.PickRoundShow[0].DataArea[0]` and then reused for every
//! access. Reads never fail: a missing key, an out-of-range index or a scalar
//! in the middle of the path all resolve to `None`.

use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PathError {
    #[error("empty segment at byte {0} in path `{1}`")]
    EmptySegment(usize, String),
    #[error("unterminated index at byte {0} in path `{1}`")]
    UnterminatedIndex(usize, String),
    #[error("invalid index `{0}` in path `{1}`")]
    InvalidIndex(String, String),
    #[error("missing `.` before key at byte {0} in path `{1}`")]
    MissingSeparator(usize, String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parses `a.b[0].c`. The empty string is the empty path.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        if raw.is_empty() {
            return Ok(Path { segments });
        }

        let bytes = raw.as_bytes();
        let mut pos = 0;
        // Whether the previous token closed an index, so `a[0].b` and `a[0][1]` parse
        // but `a..b` does not.
        let mut after_index = false;

        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => {
                    let close = raw[pos..]
                        .find(']')
                        .map(|offset| pos + offset)
                        .ok_or_else(|| PathError::UnterminatedIndex(pos, raw.to_string()))?;
                    let digits = &raw[pos + 1..close];
                    let index = digits
                        .parse::<usize>()
                        .map_err(|_| PathError::InvalidIndex(digits.to_string(), raw.to_string()))?;
                    segments.push(Segment::Index(index));
                    pos = close + 1;
                    after_index = true;
                }
                b'.' if after_index => {
                    pos += 1;
                    after_index = false;
                    if pos == bytes.len() {
                        return Err(PathError::EmptySegment(pos, raw.to_string()));
                    }
                }
                _ if after_index => {
                    return Err(PathError::MissingSeparator(pos, raw.to_string()));
                }
                _ => {
                    let end = raw[pos..]
                        .find(['.', '['])
                        .map(|offset| pos + offset)
                        .unwrap_or(raw.len());
                    if end == pos {
                        return Err(PathError::EmptySegment(pos, raw.to_string()));
                    }
                    segments.push(Segment::Key(raw[pos..end].to_string()));
                    pos = end;
                    if pos < bytes.len() && bytes[pos] == b'.' {
                        pos += 1;
                        if pos == bytes.len() {
                            return Err(PathError::EmptySegment(pos, raw.to_string()));
                        }
                    }
                    after_index = false;
                }
            }
        }

        Ok(Path { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a new path with `other` appended.
    pub fn join(&self, other: &Path) -> Path {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Path { segments }
    }

    /// Resolves the path against `doc`. The empty path addresses nothing.
    pub fn read<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        if self.segments.is_empty() {
            return None;
        }

        self.segments
            .iter()
            .try_fold(doc, |current, segment| match (segment, current) {
                (Segment::Key(key), Value::Object(map)) => map.get(key),
                (Segment::Index(index), Value::Array(items)) => items.get(*index),
                _ => None,
            })
    }

    /// Writes `value` at the path, creating intermediate containers as needed.
    ///
    /// Intermediates of the wrong kind are replaced. Writing past the end of an
    /// array pads it with `null`. Writing the empty path is a no-op.
    pub fn write(&self, doc: &mut Value, value: Value) {
        let Some((last, parents)) = self.segments.split_last() else {
            return;
        };

        let mut current = doc;
        for (i, segment) in parents.iter().enumerate() {
            let next = &self.segments[i + 1];
            current = slot(current, segment, || empty_container(next));
        }

        *slot(current, last, || Value::Null) = value;
    }
}

fn empty_container(next: &Segment) -> Value {
    match next {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

/// Returns the child slot for `segment`, coercing `current` into the right
/// container kind and filling a missing child with `init()`.
fn slot<'a>(current: &'a mut Value, segment: &Segment, init: impl FnOnce() -> Value) -> &'a mut Value {
    let fresh = init();
    match segment {
        Segment::Key(key) => {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                unreachable!("coerced to object above");
            };
            let child = map.entry(key.clone()).or_insert(Value::Null);
            if !fits(child, &fresh) {
                *child = fresh;
            }
            child
        }
        Segment::Index(index) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let Value::Array(items) = current else {
                unreachable!("coerced to array above");
            };
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            let child = &mut items[*index];
            if !fits(child, &fresh) {
                *child = fresh;
            }
            child
        }
    }
}

// An existing child is kept when it already has the container kind the rest of
// the path needs, or when the path ends here (leaf slots are overwritten by the caller).
fn fits(existing: &Value, wanted: &Value) -> bool {
    match wanted {
        Value::Object(_) => existing.is_object(),
        Value::Array(_) => existing.is_array(),
        _ => true,
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> Path {
        Path::parse(raw).expect("valid path")
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            path("a.b[0].c[12][3]").segments(),
            &[
                Segment::Key("a".into()),
                Segment::Key("b".into()),
                Segment::Index(0),
                Segment::Key("c".into()),
                Segment::Index(12),
                Segment::Index(3),
            ]
        );
        assert!(path("").is_empty());
        assert_eq!(path("a.b[0].c").to_string(), "a.b[0].c");

        assert!(matches!(Path::parse("a..b"), Err(PathError::EmptySegment(..))));
        assert!(matches!(Path::parse("a."), Err(PathError::EmptySegment(..))));
        assert!(matches!(Path::parse("a[0"), Err(PathError::UnterminatedIndex(..))));
        assert!(matches!(Path::parse("a[x]"), Err(PathError::InvalidIndex(..))));
        assert_eq!(
            Path::parse("a[0]b"),
            Err(PathError::MissingSeparator(4, "a[0]b".to_string()))
        );
        assert!(matches!(Path::parse("a[0][1]c.d"), Err(PathError::MissingSeparator(..))));
    }

    #[test]
    fn test_read() {
        let doc = json!({"a": {"b": [{"c": "x"}, null]}});
        assert_eq!(path("a.b[0].c").read(&doc), Some(&json!("x")));
        assert_eq!(path("a.b[1]").read(&doc), Some(&Value::Null));
        assert_eq!(path("a.b[2]").read(&doc), None);
        assert_eq!(path("a.z").read(&doc), None);
        // Traversing through a scalar is absent, not an error
        assert_eq!(path("a.b[0].c.d").read(&doc), None);
        assert_eq!(path("a[0]").read(&doc), None);
    }

    #[test]
    fn test_read_empty_document_is_absent_at_every_depth() {
        let raw_paths = ["", "a", "a[0]", "a.b", "a[0].b[1]", "a.b.c.d[4].e"];
        for empty in [json!({}), json!([]), Value::Null, json!("")] {
            for raw in raw_paths {
                assert_eq!(path(raw).read(&empty), None, "path `{raw}` on {empty}");
            }
        }
    }

    #[test]
    fn test_write_creates_intermediates() {
        let mut doc = json!({});
        path("a.b[0].c").write(&mut doc, json!(1));
        assert_eq!(doc, json!({"a": {"b": [{"c": 1}]}}));

        path("a.b[0].d").write(&mut doc, json!("x"));
        assert_eq!(doc, json!({"a": {"b": [{"c": 1, "d": "x"}]}}));

        // Leaves are overwritten, including containers
        path("a.b").write(&mut doc, json!("leaf"));
        assert_eq!(doc, json!({"a": {"b": "leaf"}}));
    }

    #[test]
    fn test_write_replaces_wrong_kind_and_pads() {
        let mut doc = json!({"a": "scalar"});
        path("a[2].b").write(&mut doc, json!(true));
        assert_eq!(doc, json!({"a": [null, null, {"b": true}]}));

        let mut doc = Value::Null;
        path("x").write(&mut doc, json!(1));
        assert_eq!(doc, json!({"x": 1}));
    }

    #[test]
    fn test_write_empty_path_is_noop() {
        let mut doc = json!({"a": 1});
        path("").write(&mut doc, json!(2));
        assert_eq!(doc, json!({"a": 1}));
    }

    #[test]
    fn test_join() {
        let base = path("a.b[0]");
        assert_eq!(base.join(&path("c[1]")), path("a.b[0].c[1]"));
    }
}
