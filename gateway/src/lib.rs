//! The pick-route gateway: authenticates warehouse requests, translates them to
//! the canonical shape and forwards them to the tenant's optimizer.

pub mod api;
pub mod audit;
pub mod backend;
pub mod config;
pub mod errors;
pub mod http;
pub mod ingest;
pub mod metrics_defs;
pub mod router;
pub mod service;
pub mod state;

#[cfg(test)]
mod testutils;

pub use errors::{ErrorCode, GatewayError};
pub use service::GatewayService;
pub use state::GatewayState;

use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use transcoder::SchemaRegistry;

pub async fn run(config: config::Config) -> Result<(), GatewayError> {
    let schemas = Arc::new(SchemaRegistry::builtin()?);
    config.validate(&schemas)?;

    let state = Arc::new(GatewayState::from_config(&config, schemas));
    let tenants = state.tenants.clone();

    let gateway_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        GatewayService::new(state),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, GatewayError>::new(move || tenants.is_ready()),
    );

    tokio::try_join!(gateway_task, admin_task)?;
    Ok(())
}
