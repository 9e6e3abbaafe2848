//! Tower middleware for request tracking and admission control.
//!
//! - **Correlation ID**: extract or generate an ID per request, wrap the
//!   request in an `http_request` span and echo the ID back
//! - **Rate limiting**: admit or refuse each request through the shared
//!   [`RateLimitGuard`] before the handler runs
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use qrpass_core::RouteClass;
//! use qrpass_web::middleware::{correlation_id_layer, RateLimitLayer};
//!
//! let app = Router::new()
//!     .route("/api/v1/tickets/verify", post(verify_ticket))
//!     .route_layer(RateLimitLayer::from_state(&state, RouteClass::Verification))
//!     .layer(correlation_id_layer());
//! ```

use crate::error::AppError;
use crate::extractors::{resolve_client_ip, ClientIp};
use crate::metrics;
use crate::state::AppState;
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use qrpass_core::{Admission, Clock, RateLimitGuard, RouteClass};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Header carrying the per-window request limit.
pub const RATE_LIMIT_LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Header carrying the requests left in the current window.
pub const RATE_LIMIT_REMAINING_HEADER: HeaderName =
    HeaderName::from_static("x-ratelimit-remaining");

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

/// Create a layer that adds correlation ID tracking to all requests.
#[must_use]
pub const fn correlation_id_layer() -> CorrelationIdLayer {
    CorrelationIdLayer
}

/// Layer for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdLayer;

impl<S> Layer<S> for CorrelationIdLayer {
    type Service = CorrelationIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationIdMiddleware { inner }
    }
}

/// Middleware service for correlation ID tracking.
#[derive(Clone, Debug)]
pub struct CorrelationIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request> for CorrelationIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let correlation_id = req
            .headers()
            .get(CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        req.extensions_mut().insert(correlation_id);

        let span = tracing::info_span!(
            "http_request",
            correlation_id = %correlation_id,
            method = %req.method(),
            uri = %req.uri().path(),
        );

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.instrument(span).await?;

            if let Ok(header_value) = HeaderValue::from_str(&correlation_id.to_string()) {
                response
                    .headers_mut()
                    .insert(CORRELATION_ID_HEADER, header_value);
            }

            Ok(response)
        })
    }
}

/// Layer that gates requests through a [`RateLimitGuard`].
///
/// Nest one layer per route class: the general layer around the whole API
/// and a verification layer around the ticket routes. When layers nest,
/// the innermost (most specific) limit wins the `X-RateLimit-*` headers.
#[derive(Clone)]
pub struct RateLimitLayer {
    guard: Arc<RateLimitGuard>,
    clock: Arc<dyn Clock>,
    route_class: RouteClass,
    trust_proxy_headers: bool,
}

impl RateLimitLayer {
    /// Create a layer for one route class.
    #[must_use]
    pub fn new(
        guard: Arc<RateLimitGuard>,
        clock: Arc<dyn Clock>,
        route_class: RouteClass,
        trust_proxy_headers: bool,
    ) -> Self {
        Self {
            guard,
            clock,
            route_class,
            trust_proxy_headers,
        }
    }

    /// Create a layer sharing the guard and clock held in `state`.
    #[must_use]
    pub fn from_state(state: &AppState, route_class: RouteClass) -> Self {
        Self::new(
            Arc::clone(&state.guard),
            Arc::clone(&state.clock),
            route_class,
            state.trust_proxy_headers,
        )
    }
}

impl fmt::Debug for RateLimitLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitLayer")
            .field("route_class", &self.route_class)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            layer: self.clone(),
        }
    }
}

/// Middleware service produced by [`RateLimitLayer`].
#[derive(Clone, Debug)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    layer: RateLimitLayer,
}

impl<S> Service<Request> for RateLimitMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let ip = resolve_client_ip(
            req.headers(),
            req.extensions(),
            self.layer.trust_proxy_headers,
        );
        req.extensions_mut().insert(ClientIp(ip));

        let route_class = self.layer.route_class;
        let admission = self
            .layer
            .guard
            .admit(route_class, &ip.to_string(), self.layer.clock.now());

        match admission {
            Admission::Rejected { retry_after, .. } => {
                metrics::record_rate_limit_rejection(route_class);
                Box::pin(async move { Ok(AppError::rate_limited(retry_after).into_response()) })
            }
            Admission::Admitted {
                limit, remaining, ..
            } => {
                let fut = self.inner.call(req);
                Box::pin(async move {
                    let mut response = fut.await?;
                    // An inner layer refused the request.
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        return Ok(response);
                    }
                    let headers = response.headers_mut();
                    headers
                        .entry(RATE_LIMIT_LIMIT_HEADER)
                        .or_insert(HeaderValue::from(limit));
                    headers
                        .entry(RATE_LIMIT_REMAINING_HEADER)
                        .or_insert(HeaderValue::from(remaining));
                    Ok(response)
                })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use chrono::{Duration, TimeZone, Utc};
    use qrpass_core::{RateLimitConfig, WindowPolicy};
    use qrpass_testing::FixedClock;
    use tower::ServiceExt;

    fn limited_router(max_requests: u32) -> Router {
        let guard = Arc::new(RateLimitGuard::new(
            RateLimitConfig::default()
                .with_general(WindowPolicy::new(Duration::minutes(1), max_requests)),
        ));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        ));

        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(RateLimitLayer::new(guard, clock, RouteClass::General, true))
    }

    fn request_from(ip: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri("/test")
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_correlation_id_generated_if_missing() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let response = app
            .oneshot(axum::http::Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let correlation_id = response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present");
        assert!(Uuid::parse_str(correlation_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_correlation_id_preserved_from_request() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(correlation_id_layer());

        let request_uuid = Uuid::new_v4();
        let request = axum::http::Request::builder()
            .uri("/test")
            .header(CORRELATION_ID_HEADER, request_uuid.to_string())
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get(CORRELATION_ID_HEADER).unwrap(),
            request_uuid.to_string().as_str()
        );
    }

    #[tokio::test]
    async fn test_admitted_requests_carry_headers() {
        let app = limited_router(2);

        let response = app.oneshot(request_from("203.0.113.1")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(RATE_LIMIT_LIMIT_HEADER).unwrap(), "2");
        assert_eq!(response.headers().get(RATE_LIMIT_REMAINING_HEADER).unwrap(), "1");
    }

    #[tokio::test]
    async fn test_over_limit_returns_429_without_calling_handler() {
        let app = limited_router(1);

        let first = app.clone().oneshot(request_from("203.0.113.1")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.clone().oneshot(request_from("203.0.113.1")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            second.headers().get(axum::http::header::RETRY_AFTER).unwrap(),
            "60"
        );

        let other_client = app.oneshot(request_from("203.0.113.2")).await.unwrap();
        assert_eq!(other_client.status(), StatusCode::OK);
    }
}
