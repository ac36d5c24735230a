use crate::types::TenantRecord;
use async_trait::async_trait;

#[derive(thiserror::Error, Debug)]
pub enum TenantStoreError {
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tenant store returned status {0}")]
    UnexpectedStatus(u16),
    #[error("tenant store unavailable")]
    RetriesExceeded,
}

/// Credential lookup. Returns every record carrying the credential so the
/// caller can tell "unknown" from "ambiguous".
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn lookup(&self, credential: &str) -> Result<Vec<TenantRecord>, TenantStoreError>;

    fn is_ready(&self) -> bool {
        true
    }
}

/// Tenants listed in the config file.
pub struct StaticTenantStore {
    tenants: Vec<TenantRecord>,
}

impl StaticTenantStore {
    pub fn new(tenants: Vec<TenantRecord>) -> Self {
        StaticTenantStore { tenants }
    }
}

#[async_trait]
impl TenantStore for StaticTenantStore {
    async fn lookup(&self, credential: &str) -> Result<Vec<TenantRecord>, TenantStoreError> {
        Ok(self
            .tenants
            .iter()
            .filter(|tenant| tenant.api_key == credential)
            .cloned()
            .collect())
    }
}
