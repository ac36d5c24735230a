use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with status, handler.",
};

pub const REQUESTS_INFLIGHT: MetricDef = MetricDef {
    name: "requests.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of requests currently being processed",
};

pub const TRANSCODE_FAILURES: MetricDef = MetricDef {
    name: "transcode.failures",
    metric_type: MetricType::Counter,
    description: "Requests rejected while reading or translating the body. Tagged with code.",
};

pub const BACKEND_DURATION: MetricDef = MetricDef {
    name: "backend.duration",
    metric_type: MetricType::Histogram,
    description: "Optimizer backend call duration in seconds. Tagged with outcome.",
};

pub const AUDIT_FAILURES: MetricDef = MetricDef {
    name: "audit.failures",
    metric_type: MetricType::Counter,
    description: "Audit events that could not be delivered",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    REQUESTS_INFLIGHT,
    TRANSCODE_FAILURES,
    BACKEND_DURATION,
    AUDIT_FAILURES,
];
