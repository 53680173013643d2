// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Maps the taxonomic `BrokerError` kinds onto HTTP status codes (§7).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use broker_core::BrokerError;
use serde_json::json;

/// Wraps `BrokerError` for use as an axum handler error type. The default
/// mapping treats `NotFound` as 404; the account-activate and quota-patch
/// routes translate it to 400 instead (preserved from the source: clients
/// depend on that status there — see `account_not_found_as_400`).
pub struct ApiError(pub BrokerError);

impl From<BrokerError> for ApiError {
	fn from(err: BrokerError) -> Self {
		Self(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, message) = match &self.0 {
			BrokerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
			BrokerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
			BrokerError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
			BrokerError::PersistSecrets(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
			BrokerError::PersistState(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
			BrokerError::PersistStateRollbackFailed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
			BrokerError::UpstreamHttp { .. } => (StatusCode::BAD_GATEWAY, self.0.to_string()),
			BrokerError::SecretCorrupt(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
			BrokerError::NeedReauth(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
			BrokerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
		};

		(status, Json(json!({ "error": message }))).into_response()
	}
}

/// Account id resolution failures on `activate`/quota-patch are reported as
/// 400, not 404 — the source behaves this way and clients depend on it
/// (§9 open question, resolved: preserve).
pub fn account_not_found_as_400(err: BrokerError) -> ApiError {
	match err {
		BrokerError::NotFound(msg) => ApiError(BrokerError::Validation(msg)),
		other => ApiError(other),
	}
}
