//! Built-in tenant wire schemas.

pub mod cag;

use crate::error::TableError;
use crate::field::FieldTable;
use crate::wire::Template;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Request descriptor every schema uses for the tenant credential.
pub const CREDENTIAL_FIELD: &str = "apiKey";

/// Everything needed to translate one tenant's traffic in both directions.
#[derive(Debug)]
pub struct WireSchema {
    pub name: String,
    /// Wire request to canonical request.
    pub request: FieldTable,
    /// Canonical request skeleton.
    pub request_template: Template,
    /// Canonical response to wire response.
    pub response: FieldTable,
    /// Wire response skeleton, its format is the response wire format.
    pub response_template: Template,
}

impl WireSchema {
    /// Reads the credential straight from a wire request without decoding the
    /// rest of it. Non-string values are ignored.
    pub fn credential(&self, wire: &Value) -> Option<String> {
        let field = self.request.get(CREDENTIAL_FIELD)?;
        match field.get(wire)? {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

/// Schemas built once at startup and shared by every request.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Arc<WireSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every schema shipped with the crate.
    pub fn builtin() -> Result<Self, TableError> {
        let mut registry = Self::new();
        registry.register(cag::schema()?);
        Ok(registry)
    }

    pub fn register(&mut self, schema: WireSchema) {
        self.schemas.insert(schema.name.clone(), Arc::new(schema));
    }

    pub fn get(&self, name: &str) -> Option<Arc<WireSchema>> {
        self.schemas.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}
