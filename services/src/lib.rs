//! Reservation booking backend.
//!
//! Serves a single page plus a JSON API over one reservation document that is
//! cached on local disk and mirrored, best-effort, to Google Drive.

use crate::config::Config;
use crate::remote::RemoteFileGateway;
use crate::reservations::{AppState, ReservationService};
use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse},
    routing::{any, get},
};
use opentelemetry::{global, propagation::Extractor};
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub mod cache;
pub mod config;
pub mod remote;
pub mod reservations;
pub mod telemetry;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// `{version}+{commit}`, reported in the `x-service-version` header.
pub const SERVICE_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_COMMIT"));

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl<'a> Extractor for HeaderExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Creates the application router over the given reservation service.
pub async fn routes<G>(service: ReservationService<G>, config: Config) -> Router
where
    G: RemoteFileGateway,
{
    let state = AppState::new(service);

    Router::new()
        .route("/", get(index))
        .route("/is-health", get(health_check::<G>))
        .nest("/api", reservations::routes::<G>())
        .fallback(any(catch_all))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                // Check if the request has a trace context header
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let user_agent = request.headers().get(axum::http::header::USER_AGENT);
                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?user_agent,
                );

                span.set_parent(parent_context);

                span
            }),
        )
        .layer(Extension(config))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check<G>(
    State(state): State<AppState<G>>,
    Extension(config): Extension<Config>,
) -> impl IntoResponse
where
    G: RemoteFileGateway,
{
    let mut response = match state.service.local().ensure_exists().await {
        Ok(()) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Local reservation cache is not usable");
            (StatusCode::SERVICE_UNAVAILABLE, "503").into_response()
        }
    };

    response.headers_mut().insert(
        HeaderName::from_static("x-service-env"),
        HeaderValue::from_static(config.environment().as_str()),
    );
    response.headers_mut().insert(
        HeaderName::from_static("x-service-version"),
        HeaderValue::from_static(SERVICE_VERSION),
    );

    response
}

async fn catch_all() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}
