// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias used across the broker crates.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Taxonomic error kinds (§7). The HTTP layer maps each variant to a status
/// code; callers elsewhere (the OAuth engine, the switch loop) match on the
/// sentinel variants directly rather than parsing a message string.
#[derive(Debug, Error)]
pub enum BrokerError {
	#[error("validation: {0}")]
	Validation(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("conflict: {0}")]
	Conflict(String),

	/// Secret-store write failed; the registry was never touched.
	#[error("failed to persist secrets: {0}")]
	PersistSecrets(String),

	/// Registry write failed after the secret was already written; the
	/// secret write has been rolled back (best-effort).
	#[error("failed to persist account metadata: {0}")]
	PersistState(String),

	/// A rollback attempted after `PersistState` itself failed. Carries both
	/// the original cause and the rollback failure.
	#[error("failed to persist account metadata: {state_err} (rollback also failed: {rollback_err})")]
	PersistStateRollbackFailed {
		state_err: String,
		rollback_err: String,
	},

	#[error("upstream http error ({status}): {body}")]
	UpstreamHttp { status: u16, body: String },

	/// A stored secret blob failed to unprotect (corrupted, or re-keyed out
	/// from under us). Distinct from `NotFound`: the caller must not treat
	/// this the same as an absent account (§4.B).
	#[error("secret store entry could not be unprotected: {0}")]
	SecretCorrupt(String),

	#[error("reauthorization required: {0}")]
	NeedReauth(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl BrokerError {
	pub fn persist_state_rollback_failed(state_err: impl Into<String>, rollback_err: impl Into<String>) -> Self {
		Self::PersistStateRollbackFailed {
			state_err: state_err.into(),
			rollback_err: rollback_err.into(),
		}
	}
}

impl From<std::io::Error> for BrokerError {
	fn from(err: std::io::Error) -> Self {
		BrokerError::Internal(err.to_string())
	}
}

impl From<serde_json::Error> for BrokerError {
	fn from(err: serde_json::Error) -> Self {
		BrokerError::Internal(format!("serde: {err}"))
	}
}
