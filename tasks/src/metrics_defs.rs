use shared::metrics_defs::{MetricDef, MetricType};

pub const TASKS_CREATED: MetricDef = MetricDef {
    name: "tasks.created",
    metric_type: MetricType::Counter,
    description: "Number of tasks persisted. Tagged with kind.",
};

pub const TASK_TRANSITIONS: MetricDef = MetricDef {
    name: "tasks.transitions",
    metric_type: MetricType::Counter,
    description: "Status transitions requested. Tagged with status and outcome (applied, unchanged, rejected).",
};

pub const TASK_DURATION: MetricDef = MetricDef {
    name: "tasks.duration",
    metric_type: MetricType::Histogram,
    description: "Time from dispatch to a terminal status in seconds. Tagged with status.",
};

pub const ALL_METRICS: &[MetricDef] = &[TASKS_CREATED, TASK_TRANSITIONS, TASK_DURATION];
