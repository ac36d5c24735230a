use crate::audit::AuditConfig;
use serde::Deserialize;
use std::collections::HashMap;
use tenants::config::{BackendConfig, TenantConfigError, TenantStoreConfig};
use thiserror::Error;
use transcoder::SchemaRegistry;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Tenant references unknown schema: {0}")]
    UnknownSchema(String),

    #[error("Default schema is not registered: {0}")]
    UnknownDefaultSchema(String),

    #[error(transparent)]
    Tenant(#[from] TenantConfigError),
}

fn default_schema() -> String {
    "cag".to_string()
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming requests
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    /// Schema used to read the credential from a request that has no
    /// `x-api-key` header.
    #[serde(default = "default_schema")]
    pub default_schema: String,
    #[serde(default)]
    pub backend: BackendConfig,
    /// Legacy optimizer per tenant tag, used by the `/optimize` passthrough.
    #[serde(default)]
    pub legacy_urls: HashMap<String, Url>,
    pub tenant_store: TenantStoreConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Config {
    /// Validates the gateway configuration against the schemas that exist.
    pub fn validate(&self, schemas: &SchemaRegistry) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.backend.validate()?;
        self.tenant_store.validate()?;

        if !schemas.contains(&self.default_schema) {
            return Err(ValidationError::UnknownDefaultSchema(
                self.default_schema.clone(),
            ));
        }

        for schema in self.tenant_store.referenced_schemas() {
            if !schemas.contains(schema) {
                return Err(ValidationError::UnknownSchema(schema.to_string()));
            }
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}
