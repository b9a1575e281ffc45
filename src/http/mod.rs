//! HTTP surface: router, shared state and rate-limit middleware.

mod error;
mod handlers;
pub mod params;

pub use error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Router,
};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::ratelimit::{RouteLimiters, TokenBucket};
use crate::service::{GeocodeService, RequestContext};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GeocodeService>,
    store_timeout: Option<Duration>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl AppState {
    pub fn new(service: Arc<GeocodeService>) -> Self {
        Self {
            service,
            store_timeout: None,
            shutdown: None,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// In-flight store calls are abandoned once this flips to `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn request_context(&self) -> RequestContext {
        let mut ctx = RequestContext::new();
        if let Some(timeout) = self.store_timeout {
            ctx = ctx.with_timeout(timeout);
        }
        if let Some(shutdown) = &self.shutdown {
            ctx = ctx.with_cancel(shutdown.clone());
        }
        ctx
    }
}

async fn enforce_rate_limit(
    State(bucket): State<Arc<TokenBucket>>,
    request: Request,
    next: Next,
) -> Response {
    if bucket.allow() {
        next.run(request).await
    } else {
        warn!("Rate limit exceeded on {}", request.uri().path());
        ApiError::rate_limited().into_response()
    }
}

fn limited(route: MethodRouter<AppState>, bucket: Option<&Arc<TokenBucket>>) -> MethodRouter<AppState> {
    match bucket {
        Some(bucket) => route.route_layer(middleware::from_fn_with_state(
            Arc::clone(bucket),
            enforce_rate_limit,
        )),
        None => route,
    }
}

/// Build the API router. Without limiters no admission control is applied.
pub fn create_router(state: AppState, limiters: Option<RouteLimiters>) -> Router {
    let limiters = limiters.as_ref();

    Router::new()
        .route(
            "/search",
            limited(get(handlers::search), limiters.map(|l| &l.search)),
        )
        .route(
            "/reverse",
            limited(get(handlers::reverse), limiters.map(|l| &l.reverse)),
        )
        .route(
            "/lookup",
            limited(get(handlers::lookup), limiters.map(|l| &l.lookup)),
        )
        .route(
            "/details",
            limited(get(handlers::details), limiters.map(|l| &l.details)),
        )
        .route("/status", get(handlers::status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
