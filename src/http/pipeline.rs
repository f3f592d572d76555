//! The ordered front-door pipeline.
//!
//! # Data Flow
//! ```text
//! request
//!     → Admission       (rate limit on caller address)
//!     → BodyParsing     (buffer with size limit, parse JSON)
//!     → Validation      (public routes: route schema)
//!     → Authentication  (protected routes: bearer credential)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Each stage is a function `(&Parts, RequestContext) -> Result<RequestContext, ApiError>`
//!   threaded through `STAGES` in order; the first error ends the request
//! - Validation is a no-op on protected routes and authentication is a no-op
//!   on public ones, so every request walks the same list
//! - The buffered body is handed back to the handler unchanged

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, request::Parts, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    BoxError,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;

use crate::auth::{self, CallerIdentity, TokenVerifier};
use crate::error::ApiError;
use crate::http::request::ClientAddr;
use crate::observability::metrics;
use crate::security::{Decision, RateLimiter};
use crate::validation::{self, schema, Schema};

/// One step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Admission,
    BodyParsing,
    Validation,
    Authentication,
}

/// Fixed stage order. Admission must precede authentication.
pub const STAGES: [Stage; 4] = [
    Stage::Admission,
    Stage::BodyParsing,
    Stage::Validation,
    Stage::Authentication,
];

/// How a route is guarded.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    /// Unauthenticated entry point, guarded by a schema.
    Public(&'static Schema),
    /// Requires a bearer credential.
    Protected,
}

/// Classify a request. Only `POST /signin` and `POST /signup` are public,
/// matched exactly; any other spelling is protected like the catch-all.
pub fn classify(method: &Method, path: &str) -> Access {
    if method != Method::POST {
        return Access::Protected;
    }
    match path {
        "/signin" => Access::Public(&schema::SIGNIN),
        "/signup" => Access::Public(&schema::SIGNUP),
        _ => Access::Protected,
    }
}

/// State threaded through the stages.
#[derive(Debug)]
pub struct RequestContext {
    pub client: ClientAddr,
    pub access: Access,
    pub body: Option<Body>,
    pub raw_body: Bytes,
    pub json: Option<Value>,
    pub identity: Option<CallerIdentity>,
}

/// The stage runner and its collaborators.
pub struct Pipeline {
    limiter: Arc<RateLimiter>,
    verifier: Arc<dyn TokenVerifier>,
    max_body_size: usize,
}

impl Pipeline {
    pub fn new(limiter: Arc<RateLimiter>, verifier: Arc<dyn TokenVerifier>, max_body_size: usize) -> Self {
        Self {
            limiter,
            verifier,
            max_body_size,
        }
    }

    /// Run every stage on `request`; on success return it with the caller attached.
    pub async fn process(&self, request: Request) -> Result<Request, ApiError> {
        let (mut parts, body) = request.into_parts();
        let client = parts
            .extensions
            .get::<ClientAddr>()
            .copied()
            .unwrap_or(ClientAddr(None));

        let mut ctx = RequestContext {
            client,
            access: classify(&parts.method, parts.uri.path()),
            body: Some(body),
            raw_body: Bytes::new(),
            json: None,
            identity: None,
        };

        for stage in STAGES {
            ctx = match stage {
                Stage::Admission => self.admit(&parts, ctx)?,
                Stage::BodyParsing => self.parse_body(&parts, ctx).await?,
                Stage::Validation => self.validate(&parts, ctx)?,
                Stage::Authentication => self.authenticate(&parts, ctx)?,
            };
        }

        if let Some(identity) = ctx.identity {
            parts.extensions.insert(identity);
        }
        Ok(Request::from_parts(parts, Body::from(ctx.raw_body)))
    }

    fn admit(&self, _parts: &Parts, ctx: RequestContext) -> Result<RequestContext, ApiError> {
        match self.limiter.check(&ctx.client.key()) {
            Decision::Allowed { .. } => Ok(ctx),
            Decision::Limited { retry_after } => {
                tracing::warn!(client = %ctx.client, "Rate limit exceeded");
                metrics::record_rate_limited();
                // Round up so a client never retries inside the current window.
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Err(ApiError::RateLimited { retry_after_secs: secs })
            }
        }
    }

    async fn parse_body(&self, parts: &Parts, mut ctx: RequestContext) -> Result<RequestContext, ApiError> {
        let body = ctx.body.take().unwrap_or_default();
        let bytes = Limited::new(body, self.max_body_size)
            .collect()
            .await
            .map_err(|e| body_read_error(e, self.max_body_size))?
            .to_bytes();

        if !bytes.is_empty() && is_json(parts) {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| ApiError::MalformedBody(format!("Malformed JSON body: {}", e)))?;
            ctx.json = Some(value);
        }
        ctx.raw_body = bytes;
        Ok(ctx)
    }

    fn validate(&self, _parts: &Parts, ctx: RequestContext) -> Result<RequestContext, ApiError> {
        let Access::Public(schema) = ctx.access else {
            return Ok(ctx);
        };

        let body = ctx.json.as_ref().unwrap_or(&Value::Null);
        match validation::validate(schema, body) {
            Ok(()) => Ok(ctx),
            Err(errors) => {
                tracing::debug!(route = schema.route, fields = ?errors.fields(), "Request body rejected");
                metrics::record_validation_failure(schema.route);
                Err(ApiError::ValidationFailed(errors))
            }
        }
    }

    fn authenticate(&self, parts: &Parts, mut ctx: RequestContext) -> Result<RequestContext, ApiError> {
        if let Access::Public(_) = ctx.access {
            return Ok(ctx);
        }
        let identity = auth::authenticate(&parts.headers, self.verifier.as_ref())?;
        ctx.identity = Some(identity);
        Ok(ctx)
    }
}

/// Only an exceeded limit is a 413; anything else means the body never arrived intact.
fn body_read_error(err: BoxError, limit: usize) -> ApiError {
    if err.downcast_ref::<LengthLimitError>().is_some() {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::MalformedBody(format!("Failed to read request body: {}", err))
    }
}

fn is_json(parts: &Parts) -> bool {
    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Axum middleware running the pipeline in front of every route.
pub async fn pipeline_middleware(
    State(pipeline): State<Arc<Pipeline>>,
    request: Request,
    next: Next,
) -> Response {
    match pipeline.process(request).await {
        Ok(request) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}
