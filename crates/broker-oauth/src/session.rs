// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component G: the browser-facing authorization-code + PKCE flow and its
//! in-memory session table (§4.G, §5 "OAuth engine mutex").

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use broker_core::{Account, AddAccountInput, BrokerError, BrokerResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::id_token::parse_id_token;
use crate::pkce::{generate_state, Pkce};
use crate::provider;
use crate::token_exchange;

const SESSION_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthStatus {
	Pending,
	Success,
	Error,
	Expired,
}

struct OAuthSession {
	provider: String,
	status: OAuthStatus,
	code_verifier: String,
	auth_url: String,
	account_id: Option<String>,
	error: Option<String>,
	expires_at: DateTime<Utc>,
}

/// What callers outside the engine are allowed to see — never the verifier.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthSessionSnapshot {
	pub state: String,
	pub provider: String,
	pub status: OAuthStatus,
	pub auth_url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub account_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub expires_at: DateTime<Utc>,
}

fn snapshot(state: &str, session: &OAuthSession) -> OAuthSessionSnapshot {
	OAuthSessionSnapshot {
		state: state.to_string(),
		provider: session.provider.clone(),
		status: session.status,
		auth_url: session.auth_url.clone(),
		account_id: session.account_id.clone(),
		error: session.error.clone(),
		expires_at: session.expires_at,
	}
}

/// The seam `HandleCallback` uses to turn a successful exchange into a
/// registry entry, implemented by the Manager (component F) and injected
/// here to avoid a dependency cycle between the two components.
#[async_trait]
pub trait AccountRegistrar: Send + Sync {
	async fn add_account(&self, input: AddAccountInput) -> BrokerResult<Account>;
}

pub struct OAuthEngine {
	sessions: Mutex<HashMap<String, OAuthSession>>,
	http: reqwest::Client,
	registrar: Arc<dyn AccountRegistrar>,
}

impl OAuthEngine {
	pub fn new(registrar: Arc<dyn AccountRegistrar>) -> Self {
		Self {
			sessions: Mutex::new(HashMap::new()),
			http: broker_http::new_client(),
			registrar,
		}
	}

	/// §4.G `Start`.
	pub async fn start(&self, provider_tag: &str) -> BrokerResult<OAuthSessionSnapshot> {
		let config = provider::lookup(provider_tag)
			.ok_or_else(|| BrokerError::Validation(format!("unknown provider {provider_tag}")))?;

		let state = generate_state();
		let pkce = Pkce::generate();

		let mut url = url::Url::parse(config.auth_url).map_err(|e| BrokerError::Internal(e.to_string()))?;
		{
			let mut query = url.query_pairs_mut();
			query
				.append_pair("response_type", "code")
				.append_pair("client_id", config.client_id)
				.append_pair("redirect_uri", config.redirect_uri)
				.append_pair("scope", &config.scopes.join(" "))
				.append_pair("state", &state)
				.append_pair("code_challenge", &pkce.challenge)
				.append_pair("code_challenge_method", "S256");
			for (key, value) in config.extra_auth_params {
				query.append_pair(key, value);
			}
		}

		let session = OAuthSession {
			provider: config.tag.to_string(),
			status: OAuthStatus::Pending,
			code_verifier: pkce.verifier,
			auth_url: url.to_string(),
			account_id: None,
			error: None,
			expires_at: Utc::now() + Duration::minutes(SESSION_TTL_MINUTES),
		};

		let mut sessions = self.sessions.lock().await;
		let snap = snapshot(&state, &session);
		sessions.insert(state, session);
		Ok(snap)
	}

	/// §4.G `Status`.
	pub async fn status(&self, state: &str) -> BrokerResult<OAuthSessionSnapshot> {
		let mut sessions = self.sessions.lock().await;
		let session = sessions
			.get_mut(state)
			.ok_or_else(|| BrokerError::NotFound(format!("unknown oauth session {state}")))?;
		expire_if_due(session);
		Ok(snapshot(state, session))
	}

	/// §4.G `HandleCallback`.
	pub async fn handle_callback(&self, query: &HashMap<String, String>) -> BrokerResult<OAuthSessionSnapshot> {
		let state = query
			.get("state")
			.cloned()
			.ok_or_else(|| BrokerError::Validation("missing state".into()))?;

		// Fail fast on known-bad query shapes while holding the lock only
		// long enough to read the session and (if already unusable) record
		// the terminal state.
		let (provider_tag, code_verifier) = {
			let mut sessions = self.sessions.lock().await;
			let session = match sessions.get_mut(&state) {
				Some(s) => s,
				None => return Err(BrokerError::NotFound(format!("unknown oauth session {state}"))),
			};
			expire_if_due(session);

			if session.status == OAuthStatus::Expired {
				return Ok(snapshot(&state, session));
			}

			if let Some(error) = query.get("error") {
				session.status = OAuthStatus::Error;
				session.error = Some(error.clone());
				return Ok(snapshot(&state, session));
			}

			let code = query.get("code").cloned().unwrap_or_default();
			if code.is_empty() {
				session.status = OAuthStatus::Error;
				session.error = Some("callback missing code".into());
				return Ok(snapshot(&state, session));
			}

			let Some(config) = provider::lookup(&session.provider) else {
				session.status = OAuthStatus::Error;
				session.error = Some(format!("provider {} no longer configured", session.provider));
				return Ok(snapshot(&state, session));
			};

			(config.tag.to_string(), session.code_verifier.clone())
		};

		let code = query.get("code").cloned().unwrap_or_default();
		let config = provider::lookup(&provider_tag).expect("checked above");

		// Network call happens without the session-table lock held (§5).
		let exchange_result = token_exchange::exchange_code(&self.http, config, &code, &code_verifier).await;

		let mut sessions = self.sessions.lock().await;
		let Some(session) = sessions.get_mut(&state) else {
			// Session was dropped/overwritten while we were on the network.
			return Err(BrokerError::NotFound(format!("unknown oauth session {state}")));
		};
		expire_if_due(session);
		if session.status == OAuthStatus::Expired {
			return Ok(snapshot(&state, session));
		}

		let exchanged = match exchange_result {
			Ok(tokens) => tokens,
			Err(err) => {
				session.status = OAuthStatus::Error;
				session.error = Some(err.to_string());
				return Ok(snapshot(&state, session));
			}
		};

		let (email, provider_account_id) = exchanged.id_token.as_deref().map(parse_id_token).unwrap_or_default();

		let account_id = if !email.is_empty() {
			format!("{provider_tag}:{}", email.to_ascii_lowercase())
		} else if !provider_account_id.is_empty() {
			format!("{provider_tag}:{provider_account_id}")
		} else {
			format!("{provider_tag}:{}", Utc::now().format("%Y%m%dT%H%M%SZ"))
		};

		let input = AddAccountInput {
			id: account_id.clone(),
			provider: provider_tag.clone(),
			email,
			access_token: exchanged.access_token,
			refresh_token: exchanged.refresh_token,
			id_token: exchanged.id_token,
			account_id: if provider_account_id.is_empty() { None } else { Some(provider_account_id) },
			access_expires_at: Some(exchanged.access_expires_at),
			refresh_expires_at: None,
		};

		match self.registrar.add_account(input).await {
			Ok(account) => {
				session.status = OAuthStatus::Success;
				session.account_id = Some(account.id);
				session.error = None;
			}
			Err(err) => {
				session.status = OAuthStatus::Error;
				session.error = Some(classify_add_account_failure(&err));
			}
		}

		Ok(snapshot(&state, session))
	}
}

fn expire_if_due(session: &mut OAuthSession) {
	if session.status == OAuthStatus::Pending && Utc::now() > session.expires_at {
		session.status = OAuthStatus::Expired;
		session.error = Some("oauth session expired".into());
	}
}

fn classify_add_account_failure(err: &BrokerError) -> String {
	match err {
		BrokerError::PersistSecrets(_) => "failed to store OAuth credentials locally".to_string(),
		BrokerError::PersistState(_) => "failed to persist account metadata locally".to_string(),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_core::{Account, AccountStatus};
	use std::sync::atomic::{AtomicUsize, Ordering};

	struct StubRegistrar {
		calls: AtomicUsize,
		fail_with: Option<fn() -> BrokerError>,
	}

	#[async_trait]
	impl AccountRegistrar for StubRegistrar {
		async fn add_account(&self, input: AddAccountInput) -> BrokerResult<Account> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if let Some(f) = self.fail_with {
				return Err(f());
			}
			Ok(Account {
				id: input.id,
				provider: input.provider,
				email: input.email,
				status: AccountStatus::Ready,
				access_expires_at: input.access_expires_at,
				refresh_expires_at: None,
				last_refresh_at: None,
				last_applied_at: None,
				last_error: String::new(),
				quota: Default::default(),
				created_at: Utc::now(),
				updated_at: Utc::now(),
			})
		}
	}

	fn engine(fail_with: Option<fn() -> BrokerError>) -> OAuthEngine {
		OAuthEngine::new(Arc::new(StubRegistrar { calls: AtomicUsize::new(0), fail_with }))
	}

	#[tokio::test]
	async fn start_builds_s256_auth_url() {
		let engine = engine(None);
		let snap = engine.start("codex").await.unwrap();
		assert!(snap.auth_url.contains("code_challenge_method=S256"));
		assert_eq!(snap.status, OAuthStatus::Pending);
	}

	#[tokio::test]
	async fn start_rejects_unknown_provider() {
		let engine = engine(None);
		assert!(engine.start("bogus").await.is_err());
	}

	#[tokio::test]
	async fn status_on_unknown_state_is_not_found() {
		let engine = engine(None);
		assert!(engine.status("nope").await.is_err());
	}

	#[tokio::test]
	async fn callback_with_error_query_transitions_to_error() {
		let engine = engine(None);
		let started = engine.start("codex").await.unwrap();

		let mut query = HashMap::new();
		query.insert("state".to_string(), started.state.clone());
		query.insert("error".to_string(), "access_denied".to_string());

		let snap = engine.handle_callback(&query).await.unwrap();
		assert_eq!(snap.status, OAuthStatus::Error);
		assert_eq!(snap.error.as_deref(), Some("access_denied"));
	}

	#[tokio::test]
	async fn callback_with_empty_code_transitions_to_error() {
		let engine = engine(None);
		let started = engine.start("codex").await.unwrap();

		let mut query = HashMap::new();
		query.insert("state".to_string(), started.state.clone());
		query.insert("code".to_string(), "".to_string());

		let snap = engine.handle_callback(&query).await.unwrap();
		assert_eq!(snap.status, OAuthStatus::Error);
	}

	#[tokio::test]
	async fn callback_with_unknown_state_is_not_found() {
		let engine = engine(None);
		let mut query = HashMap::new();
		query.insert("state".to_string(), "does-not-exist".to_string());
		query.insert("code".to_string(), "abc".to_string());
		assert!(engine.handle_callback(&query).await.is_err());
	}

	#[test]
	fn classifies_persist_failures_into_user_facing_stages() {
		assert_eq!(
			classify_add_account_failure(&BrokerError::PersistSecrets("disk full".into())),
			"failed to store OAuth credentials locally"
		);
		assert_eq!(
			classify_add_account_failure(&BrokerError::PersistState("disk full".into())),
			"failed to persist account metadata locally"
		);
	}
}
