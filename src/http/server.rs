//! HTTP server setup.
//!
//! # Responsibilities
//! - Host the routing engine behind an axum listener
//! - Wire up middleware (CORS, request ID, tracing, timeout)
//! - Buffer each request body up to the configured limit (413 JSON beyond
//!   it) and hand a core `Request` to the router
//! - Stop accepting on shutdown and drain in-flight requests
//!
//! # Design Decisions
//! - axum only sees a catch-all route; all dispatch happens in
//!   `routing::Router`
//! - CORS preflight is answered by the layer before routing

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::any,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{CorsConfig, ServerConfig};
use crate::http::{ErrorBody, Request, X_REQUEST_ID};
use crate::routing::Router;

#[derive(Clone)]
struct HostState {
    router: Arc<Router>,
    max_body_size: usize,
}

/// HTTP server for the task API.
pub struct HttpServer {
    app: axum::Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, router: Router) -> Self {
        let state = HostState {
            router: Arc::new(router),
            max_body_size: config.limits.max_body_size,
        };
        Self {
            app: Self::build_app(config, state),
        }
    }

    /// Build the axum app with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &ServerConfig, state: HostState) -> axum::Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        let mut app = axum::Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

        if config.cors.enabled {
            app = app.layer(cors_layer(&config.cors));
        }
        app
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origin = match config.allow_origin.as_str() {
        "*" => AllowOrigin::any(),
        origin => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!(origin, error = %e, "Invalid CORS origin; allowing any");
                AllowOrigin::any()
            }
        },
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE])
}

/// Buffer the body and run the request through the routing engine.
async fn dispatch(
    State(state): State<HostState>,
    request: axum::extract::Request,
) -> axum::response::Response {
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(method = %parts.method, uri = %parts.uri, error = %e, "Request body rejected");
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                axum::Json(ErrorBody::new("Request body too large")),
            )
                .into_response();
        }
    };

    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let request = Request::from_parts(parts.method, target, parts.headers, body);
    state.router.handle(request).await.into_http()
}
