use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// A tenant as stored: one row per warehouse credential.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    /// Short routing tag, e.g. `CAG`. Selects the backend.
    pub tag: String,
    pub api_key: String,
    /// Name of the wire schema used to translate this tenant's traffic.
    pub schema: String,
}

/// A tenant resolved for one request. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct TenantBinding {
    pub id: u64,
    pub uuid: Uuid,
    pub name: String,
    pub tag: String,
    pub credential: String,
    pub backend_url: Url,
    pub schema: String,
}

impl TenantBinding {
    pub fn from_record(record: TenantRecord, backend_url: Url) -> Self {
        TenantBinding {
            id: record.id,
            uuid: record.uuid,
            name: record.name,
            tag: record.tag,
            credential: record.api_key,
            backend_url,
            schema: record.schema,
        }
    }

    /// Identifier recorded as the owner of this tenant's tasks.
    pub fn owner_id(&self) -> String {
        self.id.to_string()
    }
}
