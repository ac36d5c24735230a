use crate::api::utils::HandlerResponse;
use crate::errors::GatewayError;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::router::Router;
use crate::state::GatewayState;
use hyper::Request;
use hyper::body::Incoming;
use hyper::service::Service;
use shared::{gauge, histogram};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// The main listener's hyper service.
#[derive(Clone)]
pub struct GatewayService {
    router: Router,
}

impl GatewayService {
    pub fn new(state: Arc<GatewayState>) -> Self {
        GatewayService {
            router: Router::new(state),
        }
    }

    /// Serves one request. Never fails: errors are already responses.
    pub async fn handle<B>(&self, req: Request<B>) -> HandlerResponse
    where
        B: hyper::body::Body + Send + 'static,
        B::Error: std::fmt::Display,
    {
        let started = Instant::now();
        gauge!(REQUESTS_INFLIGHT).increment(1.0);

        let (handler, response) = self.router.route(req).await;

        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
        histogram!(
            REQUEST_DURATION,
            "handler" => handler,
            "status" => response.status().as_str().to_string()
        )
        .record(started.elapsed().as_secs_f64());

        response
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = HandlerResponse;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
