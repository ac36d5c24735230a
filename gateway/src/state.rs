use crate::audit::{AuditSink, build_sink};
use crate::backend::{Backend, HttpBackend, UpstreamClient, build_client};
use crate::config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use tasks::{InMemoryTaskStore, TaskManager};
use tenants::config::TenantStoreConfig;
use tenants::control_plane::ControlPlaneTenantStore;
use tenants::{StaticTenantStore, TenantRouter, TenantStore};
use transcoder::SchemaRegistry;
use url::Url;

/// Everything a request handler needs. Built once at startup and shared.
pub struct GatewayState {
    pub schemas: Arc<SchemaRegistry>,
    pub default_schema: String,
    pub tenants: TenantRouter,
    pub tasks: TaskManager,
    pub backend: Arc<dyn Backend>,
    pub audit: Arc<dyn AuditSink>,
    pub legacy_urls: HashMap<String, Url>,
    pub legacy_client: UpstreamClient,
    pub timeout_secs: u64,
}

impl GatewayState {
    pub fn from_config(config: &Config, schemas: Arc<SchemaRegistry>) -> Self {
        let store: Arc<dyn TenantStore> = match &config.tenant_store {
            TenantStoreConfig::Static { tenants } => {
                Arc::new(StaticTenantStore::new(tenants.clone()))
            }
            TenantStoreConfig::ControlPlane { url } => {
                Arc::new(ControlPlaneTenantStore::new(url.clone()))
            }
        };
        let client = build_client();

        GatewayState {
            schemas,
            default_schema: config.default_schema.clone(),
            tenants: TenantRouter::new(store, config.backend.clone()),
            tasks: TaskManager::new(Arc::new(InMemoryTaskStore::new())),
            backend: Arc::new(HttpBackend::new(client.clone(), config.backend.timeout_secs)),
            audit: build_sink(&config.audit),
            legacy_urls: config.legacy_urls.clone(),
            legacy_client: client,
            timeout_secs: config.backend.timeout_secs,
        }
    }
}
