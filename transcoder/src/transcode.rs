use crate::error::TranscodeError;
use crate::field::FieldTable;
use crate::wire::{Template, WireFormat};
use serde_json::Value;

/// Translates a wire document into the canonical shape.
///
/// Descriptors are applied in table order and the first failing one is
/// reported. Descriptors already applied are not rolled back; the partial
/// document is simply dropped with the error.
pub fn decode(
    raw: &[u8],
    format: WireFormat,
    template: &Template,
    table: &FieldTable,
) -> Result<Value, TranscodeError> {
    let source = format.parse(raw)?;
    decode_document(&source, template, table)
}

/// Same as [`decode`] for a document that is already parsed.
pub fn decode_document(
    source: &Value,
    template: &Template,
    table: &FieldTable,
) -> Result<Value, TranscodeError> {
    let mut destination = template.instantiate();

    for field in table.iter() {
        let Some(value) = field.get(source) else {
            tracing::debug!(field = field.name(), "Required field is missing");
            return Err(TranscodeError::MissingField(field.name().to_string()));
        };
        if !field.validate(&value) {
            tracing::debug!(field = field.name(), value = %value, "Field failed validation");
            return Err(TranscodeError::InvalidValue(field.name().to_string()));
        }
        field.set(&mut destination, value);
    }

    Ok(destination)
}

/// Translates a canonical document into the template's wire format.
///
/// Outbound values are trusted and not validated. A descriptor with nothing to
/// read leaves its template slot untouched.
pub fn encode(
    canonical: &Value,
    template: &Template,
    table: &FieldTable,
) -> Result<Vec<u8>, TranscodeError> {
    let mut destination = template.instantiate();

    for field in table.iter() {
        if let Some(value) = field.get(canonical) {
            field.set(&mut destination, value);
        }
    }

    template.format().serialize(&destination)
}
