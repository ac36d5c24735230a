use http_body_util::combinators::BoxBody;
use hyper::StatusCode;
use hyper::body::Bytes;
use hyper::Response;
use serde_json::{Value, json};
use shared::http::make_json_response;
use tasks::TaskError;
use tenants::ResolveError;
use thiserror::Error;
use transcoder::{TableError, TranscodeError};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::config::ValidationError;

/// Result type alias for gateway operations
pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

/// Client-facing error codes. Each maps to exactly one HTTP status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    E001,
    E002,
    E003,
    E004,
    E005,
    E006,
    E008,
    E009,
    E010,
    E011,
    E012,
    E013,
    E014,
    E015,
    E016,
    E017,
    E018,
    E019,
    E020,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E003 => "E003",
            ErrorCode::E004 => "E004",
            ErrorCode::E005 => "E005",
            ErrorCode::E006 => "E006",
            ErrorCode::E008 => "E008",
            ErrorCode::E009 => "E009",
            ErrorCode::E010 => "E010",
            ErrorCode::E011 => "E011",
            ErrorCode::E012 => "E012",
            ErrorCode::E013 => "E013",
            ErrorCode::E014 => "E014",
            ErrorCode::E015 => "E015",
            ErrorCode::E016 => "E016",
            ErrorCode::E017 => "E017",
            ErrorCode::E018 => "E018",
            ErrorCode::E019 => "E019",
            ErrorCode::E020 => "E020",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::E002 | ErrorCode::E003 => StatusCode::UNAUTHORIZED,
            ErrorCode::E005
            | ErrorCode::E010
            | ErrorCode::E014
            | ErrorCode::E015
            | ErrorCode::E016
            | ErrorCode::E017
            | ErrorCode::E018
            | ErrorCode::E019
            | ErrorCode::E020 => StatusCode::BAD_REQUEST,
            ErrorCode::E011 => StatusCode::NOT_FOUND,
            ErrorCode::E012 => StatusCode::FORBIDDEN,
            ErrorCode::E013 => StatusCode::IM_A_TEAPOT,
            ErrorCode::E001
            | ErrorCode::E004
            | ErrorCode::E006
            | ErrorCode::E008
            | ErrorCode::E009 => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors that can occur while handling a request
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(
        "Missing API key. Please set the X-Api-Key header or specify it in the request body in accordance with the request content type."
    )]
    MissingApiKey,

    #[error("Invalid API key. Please check your API key.")]
    InvalidApiKey,

    #[error("Conflicting API keys. Contact support to resolve the issue.")]
    ConflictingApiKeys,

    #[error("Missing or empty request body.")]
    EmptyRequest,

    #[error("Could not reach the tenant store. {0}")]
    StoreUnavailable(String),

    #[error("Optimization error. {0}")]
    Optimization(#[from] BackendError),

    #[error("Queuing error. {0}")]
    Queue(String),

    #[error("Missing task ID. Please specify the task ID in the request.")]
    MissingTaskId,

    #[error(
        "Invalid task UUID: {0}. Please check the URL in the response message for the POST request."
    )]
    InvalidTaskId(String),

    #[error(
        "Warehouse {0} has no permission to access task. Please check if the API key or the task ID is correct."
    )]
    TaskNotOwned(Uuid),

    #[error("Task has failed.")]
    TaskFailed(Value),

    #[error("Invalid XML request. {0}")]
    InvalidXml(String),

    #[error(
        "Missing required field in request: {0}. Please make sure all required fields are added."
    )]
    MissingField(String),

    #[error("Value at path is invalid: {0}. Please contact support to resolve the issue.")]
    InvalidValue(String),

    #[error("Invalid JSON request, please make sure the request body is valid JSON. {0}")]
    InvalidJson(String),

    #[error(
        "Missing Content-Type. Please set the Content-Type header to one of the following: application/json, text/json, application/xml, text/xml."
    )]
    MissingContentType,

    #[error(
        "Unknown Content-Type: {0}. Supported types are: application/json, text/json, application/xml, text/xml."
    )]
    UnknownContentType(String),

    #[error("Unsupported wire schema for warehouse: {0}")]
    UnsupportedSchema(String),

    #[error("Failed to read request body: {0}")]
    RequestBody(String),

    #[error("Unknown error. {0}")]
    Internal(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Could not build wire schemas: {0}")]
    Schema(#[from] TableError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GatewayError::MissingApiKey => ErrorCode::E002,
            GatewayError::InvalidApiKey => ErrorCode::E003,
            GatewayError::ConflictingApiKeys => ErrorCode::E004,
            GatewayError::EmptyRequest => ErrorCode::E005,
            GatewayError::StoreUnavailable(_) => ErrorCode::E006,
            GatewayError::Optimization(_) => ErrorCode::E008,
            GatewayError::Queue(_) => ErrorCode::E009,
            GatewayError::MissingTaskId => ErrorCode::E010,
            GatewayError::InvalidTaskId(_) => ErrorCode::E011,
            GatewayError::TaskNotOwned(_) => ErrorCode::E012,
            GatewayError::TaskFailed(_) => ErrorCode::E013,
            GatewayError::InvalidXml(_) => ErrorCode::E014,
            GatewayError::MissingField(_) => ErrorCode::E015,
            GatewayError::InvalidValue(_) => ErrorCode::E016,
            GatewayError::InvalidJson(_) => ErrorCode::E017,
            GatewayError::MissingContentType => ErrorCode::E018,
            GatewayError::UnknownContentType(_) => ErrorCode::E019,
            GatewayError::UnsupportedSchema(_) => ErrorCode::E020,
            GatewayError::RequestBody(_)
            | GatewayError::Internal(_)
            | GatewayError::Config(_)
            | GatewayError::Schema(_)
            | GatewayError::Io(_) => ErrorCode::E001,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.code().status()
    }

    /// The `{"error": {...}}` body sent to clients.
    pub fn to_body(&self) -> Value {
        let mut error = json!({
            "code": self.code().as_str(),
            "message": self.to_string(),
        });
        if let GatewayError::TaskFailed(details) = self {
            error["details"] = details.clone();
        }
        json!({ "error": error })
    }

    pub fn into_response(self) -> Response<BoxBody<Bytes, GatewayError>> {
        make_json_response(self.status(), &self.to_body())
    }
}

impl From<TranscodeError> for GatewayError {
    fn from(e: TranscodeError) -> Self {
        match e {
            TranscodeError::MalformedXml(_) | TranscodeError::XmlEncoding(_) => {
                GatewayError::InvalidXml(e.to_string())
            }
            TranscodeError::MalformedJson(_) => GatewayError::InvalidJson(e.to_string()),
            TranscodeError::MissingField(name) => GatewayError::MissingField(name),
            TranscodeError::InvalidValue(name) => GatewayError::InvalidValue(name),
        }
    }
}

impl From<ResolveError> for GatewayError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::NotFound => GatewayError::InvalidApiKey,
            ResolveError::Conflict(_) => GatewayError::ConflictingApiKeys,
            ResolveError::Store(e) => GatewayError::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<TaskError> for GatewayError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Store(e) => GatewayError::StoreUnavailable(e.to_string()),
            other => GatewayError::Queue(other.to_string()),
        }
    }
}
