//! HTTP surface over the intent pipeline.
//!
//! Two logical operations, submit an intent and build a transaction, plus
//! the reconciliation hook that records broadcast hashes, and a health
//! probe. Responses map the pipeline taxonomy onto status codes so callers
//! can distinguish user-fixable requests from upstream failures.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use txforge_core::{IntentRef, Pipeline};
use txforge_types::{IntentError, IntentRecord, UnsignedTransaction};

#[derive(Clone)]
struct AppState {
	pipeline: Arc<Pipeline>,
}

pub fn router(pipeline: Arc<Pipeline>) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/intents", post(create_intent))
		.route("/v1/intents/{id}/transactions", post(build_by_id))
		.route("/v1/intents/{id}/confirmation", post(record_confirmation))
		.route("/v1/transactions", post(build_inline))
		.with_state(AppState { pipeline })
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

pub async fn serve(pipeline: Arc<Pipeline>, port: u16) -> anyhow::Result<()> {
	let app = router(pipeline);
	let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
	info!("API server listening on port {}", port);
	axum::serve(listener, app).await?;
	Ok(())
}

#[derive(Deserialize)]
struct CreateIntentRequest {
	kind: String,
	payload: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildRequest {
	signer_address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineBuildRequest {
	kind: String,
	payload: Value,
	signer_address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationRequest {
	tx_hash: String,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_intent(
	State(state): State<AppState>,
	Json(request): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<IntentRecord>), ApiError> {
	let record = state
		.pipeline
		.create_intent(&request.kind, &request.payload)
		.await?;
	Ok((StatusCode::CREATED, Json(record)))
}

async fn build_by_id(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<BuildRequest>,
) -> Result<Json<Value>, ApiError> {
	let transactions = state
		.pipeline
		.build_transaction(IntentRef::Id(id), &request.signer_address)
		.await?;
	Ok(Json(transactions_body(transactions)))
}

async fn build_inline(
	State(state): State<AppState>,
	Json(request): Json<InlineBuildRequest>,
) -> Result<Json<Value>, ApiError> {
	let transactions = state
		.pipeline
		.build_transaction(
			IntentRef::Data {
				kind: request.kind,
				payload: request.payload,
			},
			&request.signer_address,
		)
		.await?;
	Ok(Json(transactions_body(transactions)))
}

async fn record_confirmation(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(request): Json<ConfirmationRequest>,
) -> Result<Json<IntentRecord>, ApiError> {
	let record = state
		.pipeline
		.record_confirmation(&id, &request.tx_hash)
		.await?;
	Ok(Json(record))
}

fn transactions_body(transactions: Vec<UnsignedTransaction>) -> Value {
	json!({ "transactions": transactions })
}

struct ApiError(IntentError);

impl From<IntentError> for ApiError {
	fn from(error: IntentError) -> Self {
		Self(error)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = status_for(&self.0);
		let body = match &self.0 {
			IntentError::Validation(errors) => json!({
				"error": self.0.to_string(),
				"fields": errors.errors,
			}),
			_ => json!({ "error": self.0.to_string() }),
		};
		(status, Json(body)).into_response()
	}
}

fn status_for(error: &IntentError) -> StatusCode {
	match error {
		IntentError::Validation(_) | IntentError::UnsupportedKind(_) => StatusCode::BAD_REQUEST,
		IntentError::Domain(_) => StatusCode::UNPROCESSABLE_ENTITY,
		IntentError::NotFound(_) => StatusCode::NOT_FOUND,
		IntentError::Expired { .. } => StatusCode::GONE,
		IntentError::DuplicateTxHash(_) => StatusCode::CONFLICT,
		IntentError::FeeDataUnavailable(_) | IntentError::UpstreamData(_) => {
			StatusCode::BAD_GATEWAY
		}
		IntentError::Io(_) => StatusCode::SERVICE_UNAVAILABLE,
		IntentError::Storage(_) | IntentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use txforge_types::ValidationErrors;

	#[test]
	fn status_mapping_follows_the_taxonomy() {
		let cases = [
			(
				IntentError::Validation(ValidationErrors::single("chain", "bad")),
				StatusCode::BAD_REQUEST,
			),
			(
				IntentError::UnsupportedKind("x".into()),
				StatusCode::BAD_REQUEST,
			),
			(
				IntentError::Domain("no route".into()),
				StatusCode::UNPROCESSABLE_ENTITY,
			),
			(IntentError::NotFound("x".into()), StatusCode::NOT_FOUND),
			(
				IntentError::Expired {
					id: "x".into(),
					expires_at: Utc::now(),
				},
				StatusCode::GONE,
			),
			(
				IntentError::DuplicateTxHash("0xabc".into()),
				StatusCode::CONFLICT,
			),
			(
				IntentError::FeeDataUnavailable("x".into()),
				StatusCode::BAD_GATEWAY,
			),
			(
				IntentError::UpstreamData("x".into()),
				StatusCode::BAD_GATEWAY,
			),
			(
				IntentError::Io("timeout".into()),
				StatusCode::SERVICE_UNAVAILABLE,
			),
		];

		for (error, expected) in cases {
			assert_eq!(status_for(&error), expected, "{}", error);
		}
	}
}
