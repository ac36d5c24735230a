use crate::http::{make_boxed_error_response, make_json_response};
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::json;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;

/// Serves `/health` (process is up) and `/ready` (dependencies are usable).
pub struct AdminService<F, E> {
    is_ready: F,
    _error: PhantomData<E>,
}

impl<F, E> AdminService<F, E>
where
    F: Fn() -> bool,
{
    pub fn new(is_ready: F) -> Self {
        Self {
            is_ready,
            _error: PhantomData,
        }
    }
}

impl<F, E> Service<Request<Incoming>> for AdminService<F, E>
where
    F: Fn() -> bool + Send + Sync + 'static,
    E: Send + 'static,
{
    type Response = Response<BoxBody<Bytes, E>>;
    type Error = E;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = route(req.method(), req.uri().path(), || (self.is_ready)());
        Box::pin(async move { Ok(response) })
    }
}

fn route<E: 'static>(
    method: &Method,
    path: &str,
    is_ready: impl FnOnce() -> bool,
) -> Response<BoxBody<Bytes, E>> {
    if method != Method::GET {
        return make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
    }

    match path {
        "/health" => make_json_response(StatusCode::OK, &json!({"status": "ok"})),
        "/ready" if is_ready() => make_json_response(StatusCode::OK, &json!({"status": "ready"})),
        "/ready" => make_json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({"status": "not ready"}),
        ),
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}
