//! HTTP surface of the gateway.

use axum::{
	body::Body,
	extract::{rejection::JsonRejection, FromRequestParts, Path, State},
	http::{header, request::Parts, StatusCode},
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use futures::StreamExt;
use ride_core::{RideEngine, RideError};
use ride_types::{
	CancellationFee, ErrorResponse, EstimateModel, GetEstimatesRequest, RideStatus,
	ServiceListing,
};
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

const NDJSON: &str = "application/x-ndjson";

#[derive(Clone)]
pub struct AppState {
	engine: Arc<RideEngine>,
}

/// Builds the router with all gateway routes.
pub fn router(engine: Arc<RideEngine>) -> Router {
	Router::new()
		.route("/health", get(health_check))
		.route("/v1/services", get(list_services))
		.route("/v1/estimates", post(get_estimates))
		.route("/v1/estimates/{id}/refresh", post(refresh_estimate))
		.route(
			"/v1/requests/{id}",
			post(post_ride_request)
				.get(get_ride_request)
				.delete(delete_ride_request),
		)
		.with_state(AppState { engine })
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Serves the router until `shutdown` resolves.
pub async fn serve(
	engine: Arc<RideEngine>,
	host: &str,
	port: u16,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
	info!("Ride gateway listening on {}:{}", host, port);

	axum::serve(listener, router(engine))
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}

/// Caller session token from `Authorization: Bearer <token>`.
pub struct SessionToken(pub String);

impl<S> FromRequestParts<S> for SessionToken
where
	S: Send + Sync,
{
	type Rejection = ApiFailure;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.headers
			.get(header::AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.map(|token| SessionToken(token.to_string()))
			.ok_or_else(|| ApiFailure(RideError::Auth("missing bearer session token".to_string())))
	}
}

/// A [`RideError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiFailure(pub RideError);

impl From<RideError> for ApiFailure {
	fn from(e: RideError) -> Self {
		ApiFailure(e)
	}
}

impl IntoResponse for ApiFailure {
	fn into_response(self) -> Response {
		let (status, code) = match &self.0 {
			RideError::Validation(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			RideError::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
			RideError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
			RideError::UpstreamNotFound(_) => (StatusCode::NOT_FOUND, "UPSTREAM_NOT_FOUND"),
			RideError::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
			RideError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
			RideError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
			RideError::Storage(_) | RideError::Config(_) => {
				(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
			}
		};

		if status.is_server_error() {
			warn!(error = %self.0, "Request failed");
		}

		let body = ErrorResponse {
			error: code.to_string(),
			message: self.0.to_string(),
		};
		(status, Json(body)).into_response()
	}
}

async fn health_check() -> Json<serde_json::Value> {
	Json(serde_json::json!({ "status": "ok" }))
}

async fn list_services(State(state): State<AppState>) -> Json<ServiceListing> {
	let services = state
		.engine
		.registry()
		.descriptors()
		.into_iter()
		.cloned()
		.collect();
	Json(ServiceListing { services })
}

/// Streams quotes as newline-delimited JSON, one object per service.
async fn get_estimates(
	State(state): State<AppState>,
	SessionToken(session): SessionToken,
	payload: Result<Json<GetEstimatesRequest>, JsonRejection>,
) -> Result<Response, ApiFailure> {
	let Json(request) = payload.map_err(|e| RideError::Validation(e.body_text()))?;
	let quotes = state.engine.get_estimates(session, request)?;

	let lines = quotes.filter_map(|quote| async move {
		match serde_json::to_vec(&quote) {
			Ok(mut line) => {
				line.push(b'\n');
				Some(Ok::<_, Infallible>(line))
			}
			Err(e) => {
				warn!(estimate_id = %quote.estimate_id, error = %e, "Dropping unserializable quote");
				None
			}
		}
	});

	Ok(([(header::CONTENT_TYPE, NDJSON)], Body::from_stream(lines)).into_response())
}

async fn refresh_estimate(
	State(state): State<AppState>,
	SessionToken(session): SessionToken,
	Path(id): Path<String>,
) -> Result<Json<EstimateModel>, ApiFailure> {
	Ok(Json(state.engine.refresh_estimate(&session, &id).await?))
}

async fn post_ride_request(
	State(state): State<AppState>,
	SessionToken(session): SessionToken,
	Path(id): Path<String>,
) -> Result<Json<RideStatus>, ApiFailure> {
	Ok(Json(state.engine.post_ride_request(&session, &id).await?))
}

async fn get_ride_request(
	State(state): State<AppState>,
	SessionToken(session): SessionToken,
	Path(id): Path<String>,
) -> Result<Json<RideStatus>, ApiFailure> {
	Ok(Json(state.engine.get_ride_request(&session, &id).await?))
}

async fn delete_ride_request(
	State(state): State<AppState>,
	SessionToken(session): SessionToken,
	Path(id): Path<String>,
) -> Result<Json<CancellationFee>, ApiFailure> {
	Ok(Json(state.engine.delete_ride_request(&session, &id).await?))
}
