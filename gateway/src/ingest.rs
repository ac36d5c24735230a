//! Shared front half of the optimization endpoints: content negotiation,
//! authentication, tenant resolution and translation to the canonical shape.

use crate::errors::{GatewayError, Result};
use crate::metrics_defs::TRANSCODE_FAILURES;
use crate::state::GatewayState;
use hyper::HeaderMap;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use serde_json::{Value, json};
use shared::counter;
use std::sync::Arc;
use tenants::TenantBinding;
use transcoder::{Path, WireFormat, WireSchema, decode_document};

pub const API_KEY_HEADER: &str = "x-api-key";

const JSON_CREDENTIAL_PATH: &str = "requestData.apiKey";

/// A request that passed every check before the backend call.
#[derive(Debug)]
pub struct Ingested {
    pub binding: TenantBinding,
    pub format: WireFormat,
    pub canonical: Value,
    /// Schema the body was translated with. `None` for JSON bodies, which are
    /// already canonical.
    pub schema: Option<Arc<WireSchema>>,
}

impl Ingested {
    /// Canonical document tagged with the warehouse it belongs to.
    pub fn tagged_canonical(&self) -> Value {
        let mut canonical = self.canonical.clone();
        set_meta(
            &mut canonical,
            "warehouse",
            json!({
                "uuid": self.binding.uuid,
                "tag": self.binding.tag,
            }),
        );
        canonical
    }
}

/// Sets `_meta.<key>` on an object document, replacing a `_meta` that is not
/// an object. Other documents are left alone.
pub fn set_meta(document: &mut Value, key: &str, value: Value) {
    let Value::Object(map) = document else {
        return;
    };
    let meta = map.entry("_meta").or_insert_with(|| json!({}));
    if !meta.is_object() {
        *meta = json!({});
    }
    if let Value::Object(meta) = meta {
        meta.insert(key.to_string(), value);
    }
}

/// `x-api-key`, when present and not empty.
pub fn header_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn content_format(headers: &HeaderMap) -> Result<WireFormat> {
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return Err(GatewayError::MissingContentType);
    };
    let content_type = content_type
        .to_str()
        .map_err(|_| GatewayError::UnknownContentType("<non-ascii>".to_string()))?;

    WireFormat::from_content_type(content_type)
        .ok_or_else(|| GatewayError::UnknownContentType(content_type.to_string()))
}

pub async fn ingest(state: &GatewayState, headers: &HeaderMap, body: &Bytes) -> Result<Ingested> {
    let format = content_format(headers)?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(GatewayError::EmptyRequest);
    }

    let wire = format.parse(body).map_err(rejected)?;
    let credential = header_credential(headers);

    match format {
        WireFormat::Json => ingest_json(state, wire, credential).await,
        WireFormat::Xml => ingest_xml(state, wire, credential).await,
    }
}

async fn ingest_json(
    state: &GatewayState,
    canonical: Value,
    credential: Option<String>,
) -> Result<Ingested> {
    if !canonical.is_object() {
        return Err(rejected(GatewayError::InvalidJson(
            "the body must be a JSON object".to_string(),
        )));
    }

    let credential = match credential {
        Some(credential) => credential,
        None => body_credential(&canonical).ok_or(GatewayError::MissingApiKey)?,
    };
    let binding = state.tenants.resolve_tenant(&credential).await?;
    tracing::debug!(tenant = %binding.uuid, "Accepted JSON request");

    Ok(Ingested {
        binding,
        format: WireFormat::Json,
        canonical,
        schema: None,
    })
}

async fn ingest_xml(
    state: &GatewayState,
    wire: Value,
    credential: Option<String>,
) -> Result<Ingested> {
    let credential = match credential {
        Some(credential) => credential,
        None => {
            // Without a header the credential can only be read through a schema,
            // and the tenant's own schema is not known yet.
            let default = state.schemas.get(&state.default_schema).ok_or_else(|| {
                GatewayError::UnsupportedSchema(state.default_schema.clone())
            })?;
            default.credential(&wire).ok_or(GatewayError::MissingApiKey)?
        }
    };

    let binding = state.tenants.resolve_tenant(&credential).await?;
    let schema = state
        .schemas
        .get(&binding.schema)
        .ok_or_else(|| GatewayError::UnsupportedSchema(binding.schema.clone()))?;

    let canonical =
        decode_document(&wire, &schema.request_template, &schema.request).map_err(rejected)?;
    tracing::debug!(tenant = %binding.uuid, schema = %schema.name, "Decoded XML request");

    Ok(Ingested {
        binding,
        format: WireFormat::Xml,
        canonical,
        schema: Some(schema),
    })
}

fn body_credential(canonical: &Value) -> Option<String> {
    let path = Path::parse(JSON_CREDENTIAL_PATH).ok()?;
    match path.read(canonical)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn rejected<E: Into<GatewayError>>(e: E) -> GatewayError {
    let error = e.into();
    counter!(TRANSCODE_FAILURES, "code" => error.code().as_str()).increment(1);
    tracing::debug!(error = %error, "Rejected request body");
    error
}
