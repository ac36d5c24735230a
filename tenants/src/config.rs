use crate::types::TenantRecord;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use url::Url;
use uuid::Uuid;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TenantConfigError {
    #[error("Duplicate tenant uuid: {0}")]
    DuplicateTenant(Uuid),

    #[error("Tenant {0} has an empty api key")]
    EmptyCredential(Uuid),

    #[error("Backend timeout cannot be 0")]
    InvalidTimeout,
}

/// Where tenant records come from.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum TenantStoreConfig {
    /// Records listed inline in the config file.
    Static { tenants: Vec<TenantRecord> },
    /// Records looked up per request from the control plane.
    ControlPlane { url: Url },
}

impl TenantStoreConfig {
    pub fn validate(&self) -> Result<(), TenantConfigError> {
        let TenantStoreConfig::Static { tenants } = self else {
            return Ok(());
        };

        let mut seen = HashSet::new();
        for tenant in tenants {
            if !seen.insert(tenant.uuid) {
                return Err(TenantConfigError::DuplicateTenant(tenant.uuid));
            }
            if tenant.api_key.is_empty() {
                return Err(TenantConfigError::EmptyCredential(tenant.uuid));
            }
        }
        Ok(())
    }

    /// Schema names referenced by statically configured tenants.
    pub fn referenced_schemas(&self) -> Vec<&str> {
        match self {
            TenantStoreConfig::Static { tenants } => {
                tenants.iter().map(|t| t.schema.as_str()).collect()
            }
            TenantStoreConfig::ControlPlane { .. } => Vec::new(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_url() -> Url {
    Url::parse("http://localhost:8080").expect("valid default url")
}

fn default_url_env_prefix() -> String {
    "PICKGATE_OPTIMIZER_URL_".to_string()
}

/// Optimizer backend addressing.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct BackendConfig {
    /// Timeout for one backend call, connection to last body byte.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Used when neither `urls` nor the environment know a tag.
    #[serde(default = "default_url")]
    pub default_url: Url,
    /// Environment variable prefix; the tag, uppercased, is appended.
    #[serde(default = "default_url_env_prefix")]
    pub url_env_prefix: String,
    /// Explicit backend per tenant tag.
    #[serde(default)]
    pub urls: HashMap<String, Url>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            timeout_secs: default_timeout_secs(),
            default_url: default_url(),
            url_env_prefix: default_url_env_prefix(),
            urls: HashMap::new(),
        }
    }
}

impl BackendConfig {
    pub fn validate(&self) -> Result<(), TenantConfigError> {
        if self.timeout_secs == 0 {
            return Err(TenantConfigError::InvalidTimeout);
        }
        Ok(())
    }
}
