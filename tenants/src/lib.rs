//! Tenant bindings: who a credential belongs to and where its traffic goes.

pub mod config;
pub mod control_plane;
pub mod metrics_defs;
pub mod router;
pub mod store;
pub mod types;

pub use router::{ResolveError, TenantRouter};
pub use store::{StaticTenantStore, TenantStore, TenantStoreError};
pub use types::{TenantBinding, TenantRecord};
