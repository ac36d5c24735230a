//! Metrics definitions for tenant resolution.

use shared::metrics_defs::{MetricDef, MetricType};

pub const TENANT_RESOLUTIONS: MetricDef = MetricDef {
    name: "tenants.resolutions",
    metric_type: MetricType::Counter,
    description: "Credential lookups. Tagged with outcome (found, not_found, conflict, error).",
};

pub const CONTROL_PLANE_LOOKUP_DURATION: MetricDef = MetricDef {
    name: "control_plane.lookup.duration",
    metric_type: MetricType::Histogram,
    description: "Time to look up a credential in the control plane in seconds",
};

pub const BACKEND_URL_FALLBACKS: MetricDef = MetricDef {
    name: "tenants.backend_url.fallback",
    metric_type: MetricType::Counter,
    description: "Backend URL resolutions that fell back to the default URL",
};

pub const ALL_METRICS: &[MetricDef] = &[
    TENANT_RESOLUTIONS,
    CONTROL_PLANE_LOOKUP_DURATION,
    BACKEND_URL_FALLBACKS,
];
