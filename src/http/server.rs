//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build shared state (rate limiter, credential authority, document store)
//! - Wire the layer stack around the routes
//! - Bind to the listener and serve until shutdown
//!
//! # Data Flow
//! ```text
//! SetRequestId → Trace → PropagateRequestId → security headers
//!     → error_translator → Timeout → CatchPanic → pipeline → routes
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::JwtAuthority;
use crate::config::ApiConfig;
use crate::http::pipeline::{pipeline_middleware, Pipeline};
use crate::http::request::make_request_span;
use crate::http::response::{error_translator, panic_response, TranslatorState};
use crate::lifecycle::{shutdown, Shutdown};
use crate::routes::{self, store::DocumentStore, AppState};
use crate::security::{headers::with_security_headers, RateLimiter};

/// HTTP server for the API.
pub struct ApiServer {
    router: Router,
    config: ApiConfig,
    limiter: Arc<RateLimiter>,
    store: Arc<DocumentStore>,
}

impl ApiServer {
    /// Create a new server with the given configuration.
    pub fn new(config: ApiConfig) -> Self {
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let authority = Arc::new(JwtAuthority::from_config(&config.auth));
        let store = Arc::new(DocumentStore::new());

        let pipeline = Arc::new(Pipeline::new(
            limiter.clone(),
            authority.clone(),
            config.security.max_body_size,
        ));
        let state = AppState {
            store: store.clone(),
            issuer: authority,
        };

        let router = build_router(&config, routes::router(state), pipeline);
        Self {
            router,
            config,
            limiter,
            store,
        }
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn store(&self) -> Arc<DocumentStore> {
        self.store.clone()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = self.limiter.clone().spawn_sweeper(
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs),
            shutdown.subscribe(),
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown.subscribe()))
            .await?;

        if let Err(e) = sweeper.await {
            tracing::warn!(error = %e, "Rate window sweeper ended abnormally");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wrap `routes` in the pipeline and the outer layers.
#[allow(deprecated)]
pub fn build_router(config: &ApiConfig, routes: Router, pipeline: Arc<Pipeline>) -> Router {
    let translator = TranslatorState {
        trust_forwarded_for: config.rate_limit.trust_forwarded_for,
    };

    let router = routes
        .layer(middleware::from_fn_with_state(pipeline, pipeline_middleware))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(middleware::from_fn_with_state(translator, error_translator));

    let router = if config.security.enable_headers {
        with_security_headers(router)
    } else {
        router
    };

    router
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_request_span)
                .on_request(())
                .on_response(())
                .on_failure(()),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
