use crate::config::BackendConfig;
use crate::metrics_defs::{BACKEND_URL_FALLBACKS, TENANT_RESOLUTIONS};
use crate::store::{TenantStore, TenantStoreError};
use crate::types::TenantBinding;
use shared::counter;
use std::sync::Arc;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("no tenant for credential")]
    NotFound,
    #[error("credential matches {0} tenants")]
    Conflict(usize),
    #[error("tenant store error: {0}")]
    Store(#[from] TenantStoreError),
}

/// Resolves credentials to tenant bindings. Nothing is cached across calls.
#[derive(Clone)]
pub struct TenantRouter {
    store: Arc<dyn TenantStore>,
    backend: BackendConfig,
}

impl TenantRouter {
    pub fn new(store: Arc<dyn TenantStore>, backend: BackendConfig) -> Self {
        TenantRouter { store, backend }
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub async fn resolve_tenant(&self, credential: &str) -> Result<TenantBinding, ResolveError> {
        let mut records = match self.store.lookup(credential).await {
            Ok(records) => records,
            Err(e) => {
                counter!(TENANT_RESOLUTIONS, "outcome" => "error").increment(1);
                tracing::error!(error = %e, "Tenant lookup failed");
                return Err(e.into());
            }
        };

        match records.len() {
            0 => {
                counter!(TENANT_RESOLUTIONS, "outcome" => "not_found").increment(1);
                Err(ResolveError::NotFound)
            }
            1 => {
                counter!(TENANT_RESOLUTIONS, "outcome" => "found").increment(1);
                let record = records.remove(0);
                let backend_url = self.backend_url_for(&record.tag);
                Ok(TenantBinding::from_record(record, backend_url))
            }
            n => {
                counter!(TENANT_RESOLUTIONS, "outcome" => "conflict").increment(1);
                tracing::error!(matches = n, "Credential is shared by several tenants");
                Err(ResolveError::Conflict(n))
            }
        }
    }

    /// Backend for a tenant tag: configured URL, then the environment, then the default.
    pub fn backend_url_for(&self, tag: &str) -> Url {
        self.backend_url_with_env(tag, |key| std::env::var(key).ok())
    }

    fn backend_url_with_env(&self, tag: &str, env: impl Fn(&str) -> Option<String>) -> Url {
        if let Some(url) = self.backend.urls.get(tag) {
            return url.clone();
        }

        let key = format!("{}{}", self.backend.url_env_prefix, tag.to_uppercase());
        if let Some(raw) = env(&key) {
            match Url::parse(&raw) {
                Ok(url) => return url,
                Err(e) => tracing::warn!(key = %key, error = %e, "Ignoring invalid backend URL from environment"),
            }
        }

        counter!(BACKEND_URL_FALLBACKS).increment(1);
        tracing::warn!(
            tag,
            key = %key,
            default = %self.backend.default_url,
            "No backend URL configured for tenant tag, using default"
        );
        self.backend.default_url.clone()
    }
}
