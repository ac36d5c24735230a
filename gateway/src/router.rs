use crate::api::utils::{HandlerResponse, bytes_response};
use crate::api::{legacy, pickroute, singlebatch, test};
use crate::errors::{GatewayError, Result};
use crate::state::GatewayState;
use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use std::sync::Arc;

/// What a matched request is handed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    TestGet,
    TestPost,
    PickRoute,
    SingleBatchCreate,
    SingleBatchMissingId,
    SingleBatchStatus(String),
    Legacy,
}

impl Action {
    /// Low-cardinality name used to tag metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Action::TestGet | Action::TestPost => "test",
            Action::PickRoute => "pickroute",
            Action::SingleBatchCreate => "singlebatch_create",
            Action::SingleBatchMissingId | Action::SingleBatchStatus(_) => "singlebatch_status",
            Action::Legacy => "legacy",
        }
    }
}

/// Finds the action for a request line. Trailing slashes are ignored.
pub fn find_action(method: &Method, path: &str) -> Option<Action> {
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    let action = match (method, path) {
        (&Method::GET, "/test") => Action::TestGet,
        (&Method::POST, "/test") => Action::TestPost,
        (&Method::POST, "/v1/optimize/pickroute") => Action::PickRoute,
        (&Method::POST, singlebatch::PATH) => Action::SingleBatchCreate,
        (&Method::GET, singlebatch::PATH) => Action::SingleBatchMissingId,
        (&Method::POST, "/optimize") => Action::Legacy,
        (&Method::GET, path) => {
            let id = path
                .strip_prefix(singlebatch::PATH)?
                .strip_prefix('/')?;
            if id.is_empty() || id.contains('/') {
                return None;
            }
            Action::SingleBatchStatus(id.to_string())
        }
        _ => return None,
    };
    Some(action)
}

/// Router that matches incoming requests against the gateway's endpoints
#[derive(Clone)]
pub struct Router {
    state: Arc<GatewayState>,
}

impl Router {
    pub fn new(state: Arc<GatewayState>) -> Self {
        Self { state }
    }

    /// Routes an incoming request. Errors are rendered as responses here, so
    /// the returned label is the only thing callers need besides the response.
    pub async fn route<B>(&self, req: Request<B>) -> (&'static str, HandlerResponse)
    where
        B: hyper::body::Body + Send + 'static,
        B::Error: std::fmt::Display,
    {
        let Some(action) = find_action(req.method(), req.uri().path()) else {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                "No route matched"
            );
            return ("none", self.handle_no_route());
        };
        tracing::debug!(action = ?action, "Matched route");

        let name = action.name();
        let response = match self.handle_action(req, action).await {
            Ok(response) => response,
            Err(e) => {
                if e.status().is_server_error() {
                    tracing::error!(action = name, code = e.code().as_str(), error = %e, "Request failed");
                } else {
                    tracing::info!(action = name, code = e.code().as_str(), error = %e, "Request rejected");
                }
                e.into_response()
            }
        };
        (name, response)
    }

    async fn handle_action<B>(&self, req: Request<B>, action: Action) -> Result<HandlerResponse>
    where
        B: hyper::body::Body + Send + 'static,
        B::Error: std::fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let body: Bytes = body
            .collect()
            .await
            .map_err(|e| GatewayError::RequestBody(e.to_string()))?
            .to_bytes();
        let state = self.state.as_ref();

        match action {
            Action::TestGet => Ok(test::get()),
            Action::TestPost => Ok(test::post(&parts.headers)),
            Action::PickRoute => pickroute::handle(state, &parts.headers, body).await,
            Action::SingleBatchCreate => singlebatch::create(state, &parts.headers, body).await,
            Action::SingleBatchMissingId => Err(GatewayError::MissingTaskId),
            Action::SingleBatchStatus(id) => singlebatch::status(state, &parts.headers, &id).await,
            Action::Legacy => legacy::handle(state, &parts.headers, body).await,
        }
    }

    /// Handles an unmatched request
    fn handle_no_route(&self) -> HandlerResponse {
        bytes_response(StatusCode::NOT_FOUND, "text/plain", "No route matched\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_matching() {
        assert_eq!(find_action(&Method::GET, "/test"), Some(Action::TestGet));
        assert_eq!(find_action(&Method::POST, "/test/"), Some(Action::TestPost));
        assert_eq!(
            find_action(&Method::POST, "/v1/optimize/pickroute"),
            Some(Action::PickRoute)
        );
        assert_eq!(
            find_action(&Method::POST, "/v1/optimize/singlebatch"),
            Some(Action::SingleBatchCreate)
        );
        assert_eq!(find_action(&Method::POST, "/optimize"), Some(Action::Legacy));
    }

    #[test]
    fn test_task_id_matching() {
        assert_eq!(
            find_action(&Method::GET, "/v1/optimize/singlebatch"),
            Some(Action::SingleBatchMissingId)
        );
        assert_eq!(
            find_action(&Method::GET, "/v1/optimize/singlebatch/"),
            Some(Action::SingleBatchMissingId)
        );
        assert_eq!(
            find_action(&Method::GET, "/v1/optimize/singlebatch/abc"),
            Some(Action::SingleBatchStatus("abc".to_string()))
        );
        assert_eq!(find_action(&Method::GET, "/v1/optimize/singlebatch/a/b"), None);
        assert_eq!(find_action(&Method::GET, "/v1/optimize/singlebatchx"), None);
    }

    #[test]
    fn test_no_route_matched() {
        assert_eq!(find_action(&Method::GET, "/different"), None);
        assert_eq!(find_action(&Method::GET, "/"), None);
        // Method must match too
        assert_eq!(find_action(&Method::GET, "/v1/optimize/pickroute"), None);
        assert_eq!(find_action(&Method::DELETE, "/test"), None);
    }
}
