//! Field descriptors and the ordered tables built from them.
//!
//! A descriptor knows how to read one value from a source document, check it,
//! and write it into a destination document. The transcoder only ever sees the
//! [`FieldSpec`] trait, so composite descriptors such as [`ZipField`] and
//! [`FanOutField`] are applied exactly like [`ScalarField`].

use crate::error::TableError;
use crate::path::Path;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

pub trait FieldSpec: Send + Sync {
    fn name(&self) -> &str;

    /// Reads the value from the source document. `None` means absent.
    fn get(&self, source: &Value) -> Option<Value>;

    /// Writes the value into the destination document.
    fn set(&self, destination: &mut Value, value: Value);

    fn validate(&self, value: &Value) -> bool;
}

/// Checks applied to a decoded value before it is written.
#[derive(Clone, Debug)]
pub enum Validator {
    Any,
    /// The value must be a string matching the pattern.
    Pattern(Regex),
}

impl Validator {
    pub fn pattern(pattern: &str) -> Result<Self, TableError> {
        Ok(Validator::Pattern(Regex::new(pattern)?))
    }

    pub fn check(&self, value: &Value) -> bool {
        match self {
            Validator::Any => true,
            Validator::Pattern(re) => value.as_str().is_some_and(|s| re.is_match(s)),
        }
    }
}

/// Conversion applied to a value on its way into the destination.
#[derive(Clone, Debug, PartialEq)]
pub enum Transform {
    Identity,
    /// `"0"` becomes `false`, any other integer `true`.
    Flag,
    /// Truncates to an integer and appends a unit, `12.7` becomes `"12m"`.
    AppendUnit(&'static str),
    /// Strips a unit suffix and yields the integer, `"12m"` becomes `12`.
    StripUnit(&'static str),
}

impl Transform {
    pub fn apply(&self, value: Value) -> Value {
        match self {
            Transform::Identity => value,
            Transform::Flag => match leading_integer(&value) {
                Some(n) => Value::Bool(n != 0),
                None => value,
            },
            Transform::AppendUnit(unit) => match leading_integer(&value) {
                Some(n) => Value::String(format!("{n}{unit}")),
                None => value,
            },
            Transform::StripUnit(unit) => value
                .as_str()
                .and_then(|s| s.strip_suffix(unit))
                .and_then(|digits| digits.parse::<i64>().ok())
                .map(Value::from)
                .unwrap_or(value),
        }
    }
}

/// Integer prefix of a number or numeric string, the way lenient wire formats
/// read `"42"`, `"42.9"` or `42.9` as 42.
fn leading_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            let sign_len = usize::from(s.starts_with(['-', '+']));
            let digits_len = s[sign_len..]
                .bytes()
                .take_while(|b| b.is_ascii_digit())
                .count();
            if digits_len == 0 {
                return None;
            }
            s[..sign_len + digits_len].parse().ok()
        }
        _ => None,
    }
}

/// Copies one value from `source` to `target`.
#[derive(Debug)]
pub struct ScalarField {
    name: String,
    source: Path,
    target: Path,
    validator: Validator,
    transform: Transform,
}

impl ScalarField {
    pub fn new(name: &str, source: &str, target: &str) -> Result<Self, TableError> {
        Ok(ScalarField {
            name: name.to_string(),
            source: Path::parse(source)?,
            target: Path::parse(target)?,
            validator: Validator::Any,
            transform: Transform::Identity,
        })
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

impl FieldSpec for ScalarField {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, source: &Value) -> Option<Value> {
        self.source.read(source).cloned()
    }

    fn set(&self, destination: &mut Value, value: Value) {
        self.target.write(destination, self.transform.apply(value));
    }

    fn validate(&self, value: &Value) -> bool {
        self.validator.check(value)
    }
}

/// One column of a repeated group: the column name in the canonical document
/// and where the value lives inside each repeated wire element.
#[derive(Debug)]
pub struct Column {
    name: String,
    entry_path: Path,
    default: Option<Value>,
}

impl Column {
    pub fn new(name: &str, entry_path: &str) -> Result<Self, TableError> {
        Ok(Column {
            name: name.to_string(),
            entry_path: Path::parse(entry_path)?,
            default: None,
        })
    }

    /// Value written on the outbound leg when the column has no entry.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Gathers a list of repeated wire elements into one column-oriented object:
/// `[{A: [a1]}, {A: [a2]}]` becomes `{"a": [a1, a2]}`.
///
/// Validation is strict: every column must be present, all columns must have
/// the same length, and every entry must be a present scalar.
#[derive(Debug)]
pub struct ZipField {
    name: String,
    list: Path,
    columns: Vec<Column>,
    constants: Vec<(String, Value)>,
    target: Path,
}

impl ZipField {
    pub fn new(name: &str, list: &str, target: &str, columns: Vec<Column>) -> Result<Self, TableError> {
        Ok(ZipField {
            name: name.to_string(),
            list: Path::parse(list)?,
            columns,
            constants: Vec::new(),
            target: Path::parse(target)?,
        })
    }

    /// Adds a column that always carries the same placeholder value.
    pub fn constant(mut self, name: &str, value: Value) -> Self {
        self.constants.push((name.to_string(), value));
        self
    }
}

impl FieldSpec for ZipField {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, source: &Value) -> Option<Value> {
        let entries = self.list.read(source)?.as_array()?;

        let mut zipped = Map::new();
        for column in &self.columns {
            let values = entries
                .iter()
                .map(|entry| column.entry_path.read(entry).cloned().unwrap_or(Value::Null))
                .collect();
            zipped.insert(column.name.clone(), Value::Array(values));
        }
        for (name, value) in &self.constants {
            zipped.insert(name.clone(), value.clone());
        }

        Some(Value::Object(zipped))
    }

    fn set(&self, destination: &mut Value, value: Value) {
        self.target.write(destination, value);
    }

    fn validate(&self, value: &Value) -> bool {
        let mut expected_len = None;
        for column in &self.columns {
            let Some(values) = value.get(&column.name).and_then(Value::as_array) else {
                return false;
            };
            if *expected_len.get_or_insert(values.len()) != values.len() {
                return false;
            }
            if !values.iter().all(|v| v.is_string() || v.is_number()) {
                return false;
            }
        }
        true
    }
}

/// The inverse of [`ZipField`]: expands a column-oriented object into one
/// repeated wire element per row.
///
/// The first column drives the row count. Rows missing a value in another
/// column use that column's default, or leave the element out.
#[derive(Debug)]
pub struct FanOutField {
    name: String,
    source: Path,
    target: Path,
    element: String,
    columns: Vec<Column>,
}

impl FanOutField {
    pub fn new(
        name: &str,
        source: &str,
        target: &str,
        element: &str,
        columns: Vec<Column>,
    ) -> Result<Self, TableError> {
        Ok(FanOutField {
            name: name.to_string(),
            source: Path::parse(source)?,
            target: Path::parse(target)?,
            element: element.to_string(),
            columns,
        })
    }
}

impl FieldSpec for FanOutField {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, source: &Value) -> Option<Value> {
        self.source.read(source).cloned()
    }

    fn set(&self, destination: &mut Value, value: Value) {
        let rows = self
            .columns
            .first()
            .and_then(|driver| value.get(&driver.name))
            .and_then(Value::as_array)
            .map_or(0, Vec::len);

        let entries: Vec<Value> = (0..rows)
            .map(|row| {
                let mut entry = Value::Object(Map::new());
                for column in &self.columns {
                    let cell = value
                        .get(&column.name)
                        .and_then(|values| values.get(row))
                        .filter(|v| !v.is_null())
                        .cloned()
                        .or_else(|| column.default.clone());
                    if let Some(cell) = cell {
                        column.entry_path.write(&mut entry, cell);
                    }
                }
                entry
            })
            .collect();

        let mut group = Map::new();
        group.insert(self.element.clone(), Value::Array(entries));
        self.target.write(destination, Value::Object(group));
    }

    fn validate(&self, value: &Value) -> bool {
        value.is_object()
    }
}

/// An ordered, immutable collection of descriptors with unique names.
pub struct FieldTable {
    fields: Vec<Box<dyn FieldSpec>>,
}

impl FieldTable {
    pub fn new(fields: Vec<Box<dyn FieldSpec>>) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name().to_string()) {
                return Err(TableError::DuplicateField(field.name().to_string()));
            }
        }
        Ok(FieldTable { fields })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn FieldSpec> {
        self.fields.iter().map(|field| field.as_ref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn FieldSpec> {
        self.iter().find(|field| field.name() == name)
    }
}

impl std::fmt::Debug for FieldTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldTable").field("fields", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transforms() {
        assert_eq!(Transform::Flag.apply(json!("1")), json!(true));
        assert_eq!(Transform::Flag.apply(json!("0")), json!(false));
        assert_eq!(Transform::Flag.apply(json!("x")), json!("x"));
        assert_eq!(Transform::AppendUnit("m").apply(json!(12.7)), json!("12m"));
        assert_eq!(Transform::AppendUnit("m").apply(json!("340")), json!("340m"));
        assert_eq!(Transform::AppendUnit("m").apply(json!("-3.5")), json!("-3m"));
        assert_eq!(Transform::StripUnit("m").apply(json!("340m")), json!(340));
        assert_eq!(Transform::StripUnit("m").apply(json!("340")), json!("340"));
        assert_eq!(Transform::Identity.apply(json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn test_scalar_field() {
        let field = ScalarField::new("id", "a.b[0]", "out.id")
            .unwrap()
            .validator(Validator::pattern(r"^\d+$").unwrap());

        let source = json!({"a": {"b": ["42"]}});
        let value = field.get(&source).unwrap();
        assert!(field.validate(&value));
        assert!(!field.validate(&json!("4x")));
        assert!(!field.validate(&json!(42)));

        let mut dest = json!({});
        field.set(&mut dest, value);
        assert_eq!(dest, json!({"out": {"id": "42"}}));

        assert_eq!(field.get(&json!({})), None);
    }

    fn zip_field() -> ZipField {
        ZipField::new(
            "rows",
            "list[0].Row",
            "out.rows",
            vec![
                Column::new("ids", "Id[0]").unwrap(),
                Column::new("racks", "Loc[0].Rack[0]").unwrap(),
            ],
        )
        .unwrap()
        .constant("extra", Value::Null)
    }

    #[test]
    fn test_zip_field() {
        let field = zip_field();
        let source = json!({"list": [{"Row": [
            {"Id": ["1"], "Loc": [{"Rack": ["R1"]}]},
            {"Id": ["2"], "Loc": [{"Rack": ["R2"]}]}
        ]}]});

        let value = field.get(&source).unwrap();
        assert_eq!(
            value,
            json!({"ids": ["1", "2"], "racks": ["R1", "R2"], "extra": null})
        );
        assert!(field.validate(&value));

        // An entry without a rack fails strict validation
        let source = json!({"list": [{"Row": [{"Id": ["1"]}]}]});
        let value = field.get(&source).unwrap();
        assert_eq!(value["racks"], json!([null]));
        assert!(!field.validate(&value));

        // Columns of different lengths fail validation
        assert!(!field.validate(&json!({"ids": ["1"], "racks": []})));
        assert!(!field.validate(&json!({"ids": ["1"]})));

        // No list at all is absent
        assert_eq!(field.get(&json!({"list": [""]})), None);
    }

    #[test]
    fn test_fan_out_field() {
        let field = FanOutField::new(
            "rows",
            "out.rows",
            "wire[0].List[0]",
            "Row",
            vec![
                Column::new("ids", "Id[0]").unwrap(),
                Column::new("racks", "Loc[0].Rack[0]").unwrap(),
                Column::new("levels", "Loc[0].Level[0]")
                    .unwrap()
                    .with_default(json!("001")),
            ],
        )
        .unwrap();

        let canonical = json!({"out": {"rows": {
            "ids": ["1", "2"],
            "racks": ["R1"],
            "levels": [null, "005"]
        }}});

        let value = field.get(&canonical).unwrap();
        let mut dest = json!({"wire": [{"List": [""]}]});
        field.set(&mut dest, value);

        assert_eq!(
            dest,
            json!({"wire": [{"List": [{"Row": [
                {"Id": ["1"], "Loc": [{"Rack": ["R1"], "Level": ["001"]}]},
                {"Id": ["2"], "Loc": [{"Level": ["005"]}]}
            ]}]}]})
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let fields: Vec<Box<dyn FieldSpec>> = vec![
            Box::new(ScalarField::new("a", "x", "y").unwrap()),
            Box::new(ScalarField::new("a", "z", "w").unwrap()),
        ];
        assert!(matches!(
            FieldTable::new(fields),
            Err(TableError::DuplicateField(name)) if name == "a"
        ));
    }
}
