// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component F: the single point where any mutation to the registry or
//! secrets happens (§4.F, §5 "Manager mutex").

use std::sync::Arc;

use async_trait::async_trait;
use broker_applier::CredentialApplier;
use broker_core::{
	Account, AccountRegistry, AccountStatus, AddAccountInput, AuthSecrets, BrokerError, BrokerResult, QuotaSnapshot,
	RoutingStrategy,
};
use broker_oauth::AccountRegistrar;
use broker_secret::SecretString;
use broker_store::{SecretStore, StateStore};
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use crate::switch::{is_switchable, order_candidates, SwitchResult};

const TOKEN_FRESHNESS_SKEW: i64 = 30;

/// Result of a quota sync for one account (`SyncAllQuotasFromUpstream`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccountSyncResult {
	pub account_id: String,
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncAllResult {
	pub total: usize,
	pub succeeded: usize,
	pub failed: usize,
	pub results: Vec<AccountSyncResult>,
}

/// The single process-wide coordinator. Every public method that reads the
/// registry and may write it back acquires `lock` for the whole sequence —
/// it is never released and reacquired mid-operation (§5).
pub struct Manager {
	lock: Mutex<()>,
	state_store: Arc<dyn StateStore>,
	secret_store: Arc<dyn SecretStore>,
	applier: Arc<dyn CredentialApplier>,
	http: reqwest::Client,
}

impl Manager {
	pub fn new(state_store: Arc<dyn StateStore>, secret_store: Arc<dyn SecretStore>, applier: Arc<dyn CredentialApplier>) -> Self {
		Self {
			lock: Mutex::new(()),
			state_store,
			secret_store,
			applier,
			http: broker_http::new_client(),
		}
	}

	pub(crate) fn state_store(&self) -> &Arc<dyn StateStore> {
		&self.state_store
	}

	/// Fetches `account_id`'s secrets, treating an unprotect/corruption
	/// failure as need-reauth rather than letting it surface as a raw
	/// internal error (§4.B): marks the account `need_reauth` and persists
	/// the registry before handing the caller a `NeedReauth` error.
	async fn get_secrets_marking_corruption(&self, registry: &mut AccountRegistry, account_id: &str) -> BrokerResult<AuthSecrets> {
		match self.secret_store.get(account_id).await {
			Ok(Some(secrets)) => Ok(secrets),
			Ok(None) => Err(BrokerError::NeedReauth(format!("no secret record for account {account_id}"))),
			Err(BrokerError::SecretCorrupt(msg)) => {
				let now = Utc::now();
				if let Some(account) = registry.accounts.get_mut(account_id) {
					account.mark_need_reauth(msg.clone(), now);
				}
				let _ = self.state_store.save(registry).await;
				Err(BrokerError::NeedReauth(msg))
			}
			Err(other) => Err(other),
		}
	}

	/// `AddAccount` (§4.F). All-or-nothing: secret write then registry
	/// write, with best-effort rollback on the second failure.
	pub async fn add_account(&self, input: AddAccountInput) -> BrokerResult<Account> {
		if input.id.trim().is_empty() {
			return Err(BrokerError::Validation("account id must not be empty".into()));
		}
		if input.provider.trim().is_empty() {
			return Err(BrokerError::Validation("provider must not be empty".into()));
		}
		if input.access_token.trim().is_empty() {
			return Err(BrokerError::Validation("access token must not be empty".into()));
		}

		let _guard = self.lock.lock().await;
		let mut registry = self.state_store.load().await?;

		let now = Utc::now();
		let created_at = registry.accounts.get(&input.id).map(|a| a.created_at).unwrap_or(now);

		let account = Account {
			id: input.id.clone(),
			provider: input.provider.clone(),
			email: input.email.clone(),
			status: AccountStatus::Ready,
			access_expires_at: input.access_expires_at,
			refresh_expires_at: input.refresh_expires_at,
			last_refresh_at: None,
			last_applied_at: None,
			last_error: String::new(),
			quota: registry.accounts.get(&input.id).map(|a| a.quota.clone()).unwrap_or_default(),
			created_at,
			updated_at: now,
		};

		let secrets = AuthSecrets {
			access_token: SecretString::new(input.access_token.clone()),
			refresh_token: input.refresh_token.clone().map(SecretString::new),
			id_token: input.id_token.clone().map(SecretString::new),
			provider_account_id: input.account_id.clone(),
			access_expires_at: input.access_expires_at,
			refresh_expires_at: input.refresh_expires_at,
		};

		self
			.secret_store
			.put(&input.id, &secrets)
			.await
			.map_err(|e| BrokerError::PersistSecrets(e.to_string()))?;

		registry.accounts.insert(input.id.clone(), account.clone());
		if registry.active_account_id.is_none() {
			registry.active_account_id = Some(input.id.clone());
		}

		if let Err(save_err) = self.state_store.save(&registry).await {
			match self.secret_store.delete(&input.id).await {
				Ok(()) => return Err(BrokerError::PersistState(save_err.to_string())),
				Err(rollback_err) => {
					return Err(BrokerError::persist_state_rollback_failed(save_err.to_string(), rollback_err.to_string()));
				}
			}
		}

		Ok(account)
	}

	/// `ListAccounts` — sorted by `updated_at` descending, ties by id ascending.
	pub async fn list_accounts(&self) -> BrokerResult<Vec<Account>> {
		let _guard = self.lock.lock().await;
		let registry = self.state_store.load().await?;
		Ok(registry.list_sorted().into_iter().cloned().collect())
	}

	/// A full registry snapshot for `GET /v1/status`.
	pub async fn status(&self) -> BrokerResult<AccountRegistry> {
		let _guard = self.lock.lock().await;
		self.state_store.load().await
	}

	/// `SetActiveAccount` (§4.F). State is not mutated if `Apply` fails.
	pub async fn set_active_account(&self, id: &str) -> BrokerResult<()> {
		let _guard = self.lock.lock().await;
		let mut registry = self.state_store.load().await?;

		let account = registry
			.accounts
			.get(id)
			.ok_or_else(|| BrokerError::NotFound(format!("unknown account {id}")))?
			.clone();

		if !account.is_usable() {
			return Err(BrokerError::Validation(format!("account {id} is in {:?} state", account.status)));
		}

		let secrets = self.get_secrets_marking_corruption(&mut registry, id).await?;

		self.applier.apply(&account, &secrets).await?;

		let now = Utc::now();
		let account = registry.accounts.get_mut(id).expect("checked above");
		account.last_applied_at = Some(now);
		account.updated_at = now;
		registry.active_account_id = Some(id.to_string());
		registry.updated_at = now;

		self.state_store.save(&registry).await.map_err(|e| BrokerError::PersistState(e.to_string()))
	}

	/// `SetStrategy`.
	pub async fn set_strategy(&self, tag: &str) -> BrokerResult<()> {
		let strategy = RoutingStrategy::parse(tag).ok_or_else(|| BrokerError::Validation(format!("unknown strategy {tag}")))?;
		let _guard = self.lock.lock().await;
		let mut registry = self.state_store.load().await?;
		registry.strategy = strategy;
		self.state_store.save(&registry).await.map_err(|e| BrokerError::PersistState(e.to_string()))
	}

	/// `UpdateQuota` — overwrites the stored snapshot wholesale.
	pub async fn update_quota(&self, id: &str, mut snapshot: QuotaSnapshot) -> BrokerResult<()> {
		let _guard = self.lock.lock().await;
		let mut registry = self.state_store.load().await?;
		let now = Utc::now();
		snapshot.last_updated = Some(now);

		let account = registry
			.accounts
			.get_mut(id)
			.ok_or_else(|| BrokerError::NotFound(format!("unknown account {id}")))?;
		account.quota = snapshot;
		account.updated_at = now;

		self.state_store.save(&registry).await.map_err(|e| BrokerError::PersistState(e.to_string()))
	}

	/// `SyncQuotaFromUpstream(id?)` — picks the active account if `id` is empty.
	pub async fn sync_quota_from_upstream(&self, id: Option<&str>) -> BrokerResult<QuotaSnapshot> {
		let _guard = self.lock.lock().await;
		let mut registry = self.state_store.load().await?;

		let account_id = match id {
			Some(id) => id.to_string(),
			None => registry
				.active_account_id
				.clone()
				.ok_or_else(|| BrokerError::Validation("no active account".into()))?,
		};

		if let Err(err) = self.ensure_fresh_token(&mut registry, &account_id).await {
			let now = Utc::now();
			if let Some(account) = registry.accounts.get_mut(&account_id) {
				account.mark_need_reauth(err.to_string(), now);
			}
			let _ = self.state_store.save(&registry).await;
			return Err(err);
		}

		let account = registry
			.accounts
			.get(&account_id)
			.ok_or_else(|| BrokerError::NotFound(format!("unknown account {account_id}")))?
			.clone();

		let secrets = self.get_secrets_marking_corruption(&mut registry, &account_id).await?;

		let fetched = broker_quota::fetch_quota(&self.http, secrets.access_token.expose(), secrets.provider_account_id.as_deref())
			.await?;

		let merged = account.quota.merge(&fetched);

		let now = Utc::now();
		let account = registry.accounts.get_mut(&account_id).expect("checked above");
		account.quota = merged.clone();
		account.updated_at = now;
		self.state_store.save(&registry).await.map_err(|e| BrokerError::PersistState(e.to_string()))?;

		Ok(merged)
	}

	/// `SyncAllQuotasFromUpstream` — never aborts on individual failures.
	pub async fn sync_all_quotas_from_upstream(&self) -> BrokerResult<SyncAllResult> {
		let ids: Vec<String> = {
			let _guard = self.lock.lock().await;
			let registry = self.state_store.load().await?;
			registry.accounts.values().filter(|a| a.provider == "codex").map(|a| a.id.clone()).collect()
		};

		let mut results = Vec::with_capacity(ids.len());
		let mut succeeded = 0usize;
		for id in &ids {
			match self.sync_quota_from_upstream(Some(id)).await {
				Ok(_) => {
					succeeded += 1;
					results.push(AccountSyncResult { account_id: id.clone(), success: true, error: None });
				}
				Err(err) => {
					results.push(AccountSyncResult { account_id: id.clone(), success: false, error: Some(err.to_string()) });
				}
			}
		}

		Ok(SyncAllResult {
			total: ids.len(),
			succeeded,
			failed: ids.len() - succeeded,
			results,
		})
	}

	/// `HandleQuotaError` — the switch decision (§4.F).
	pub async fn handle_quota_error(&self, status_code: u16, message: &str) -> BrokerResult<SwitchResult> {
		if !is_switchable(status_code, message) {
			return Ok(SwitchResult { switched: false, from_account_id: None, to_account_id: None, reason: "not-switchable-error".into() });
		}

		let _guard = self.lock.lock().await;
		let mut registry = self.state_store.load().await?;

		if registry.accounts.is_empty() {
			return Err(BrokerError::Validation("no accounts configured".into()));
		}
		let active_id = registry
			.active_account_id
			.clone()
			.ok_or_else(|| BrokerError::Validation("no active account".into()))?;

		let candidate_ids = order_candidates(registry.accounts.values(), &active_id, registry.strategy);

		let now = Utc::now();
		let mut switched_to: Option<String> = None;

		for candidate_id in candidate_ids {
			let is_disabled = registry.accounts.get(&candidate_id).map(|a| a.status == AccountStatus::Disabled).unwrap_or(true);
			if is_disabled {
				continue;
			}

			match self.ensure_fresh_token(&mut registry, &candidate_id).await {
				Ok(()) => {
					switched_to = Some(candidate_id);
					break;
				}
				Err(err) => {
					if let Some(account) = registry.accounts.get_mut(&candidate_id) {
						account.mark_need_reauth(err.to_string(), now);
					}
				}
			}
		}

		let result = if let Some(to) = switched_to.clone() {
			if let Some(account) = registry.accounts.get_mut(&to) {
				account.mark_ready(now);
			}
			registry.active_account_id = Some(to.clone());
			SwitchResult { switched: true, from_account_id: Some(active_id), to_account_id: Some(to), reason: "quota-exceeded".into() }
		} else {
			SwitchResult { switched: false, from_account_id: Some(active_id), to_account_id: None, reason: "no-available-account".into() }
		};

		self.state_store.save(&registry).await.map_err(|e| BrokerError::PersistState(e.to_string()))?;
		Ok(result)
	}

	/// Private helper: ensures `account_id`'s access token is usable,
	/// refreshing it if necessary (§4.F `ensureFreshToken`).
	async fn ensure_fresh_token(&self, registry: &mut AccountRegistry, account_id: &str) -> BrokerResult<()> {
		let now = Utc::now();

		let account = registry
			.accounts
			.get(account_id)
			.ok_or_else(|| BrokerError::NotFound(format!("unknown account {account_id}")))?
			.clone();

		let fresh = match account.access_expires_at {
			None => true,
			Some(expires_at) => expires_at > now + Duration::seconds(TOKEN_FRESHNESS_SKEW),
		};
		if fresh {
			return Ok(());
		}

		let secrets = self.get_secrets_marking_corruption(registry, account_id).await?;

		let Some(refresh_token) = secrets.refresh_token.as_ref() else {
			return Err(BrokerError::NeedReauth("refresh token missing".into()));
		};
		if let Some(refresh_expires_at) = account.refresh_expires_at {
			if refresh_expires_at <= now {
				return Err(BrokerError::NeedReauth("refresh token expired".into()));
			}
		}
		let Some(provider_config) = broker_oauth::lookup(&account.provider) else {
			return Err(BrokerError::NeedReauth(format!("provider {} refresh is not implemented", account.provider)));
		};

		let exchanged = broker_oauth::refresh(&self.http, provider_config, refresh_token.expose())
			.await
			.map_err(|e| BrokerError::NeedReauth(e.to_string()))?;

		let mut new_secrets = secrets.clone();
		new_secrets.access_token = SecretString::new(exchanged.access_token.clone());
		if let Some(refresh_token) = exchanged.refresh_token.clone() {
			new_secrets.refresh_token = Some(SecretString::new(refresh_token));
		}
		if let Some(id_token) = exchanged.id_token.clone() {
			new_secrets.id_token = Some(SecretString::new(id_token));
		}
		new_secrets.access_expires_at = Some(exchanged.access_expires_at);

		self
			.secret_store
			.put(account_id, &new_secrets)
			.await
			.map_err(|e| BrokerError::NeedReauth(e.to_string()))?;

		let account = registry.accounts.get_mut(account_id).expect("checked above");
		account.access_expires_at = Some(exchanged.access_expires_at);
		account.last_refresh_at = Some(now);
		account.updated_at = now;

		Ok(())
	}
}

#[async_trait]
impl AccountRegistrar for Manager {
	async fn add_account(&self, input: AddAccountInput) -> BrokerResult<Account> {
		Manager::add_account(self, input).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use broker_applier::NoopApplier;
	use broker_store::{FileSecretStore, FileStateStore, IdentityProtector};

	fn manager(dir: &std::path::Path) -> Manager {
		let state_store = Arc::new(FileStateStore::new(dir.join("registry.json")));
		let secret_store = Arc::new(FileSecretStore::new(dir.join("secrets"), Arc::new(IdentityProtector)));
		Manager::new(state_store, secret_store, Arc::new(NoopApplier))
	}

	fn input(id: &str) -> AddAccountInput {
		AddAccountInput {
			id: id.into(),
			provider: "codex".into(),
			email: String::new(),
			access_token: "at-1".into(),
			refresh_token: None,
			id_token: None,
			account_id: None,
			access_expires_at: None,
			refresh_expires_at: None,
		}
	}

	#[tokio::test]
	async fn add_account_rejects_empty_id() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		let mut bad = input("");
		bad.id = String::new();
		assert!(manager.add_account(bad).await.is_err());
	}

	#[tokio::test]
	async fn first_add_account_becomes_active() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		manager.add_account(input("A")).await.unwrap();
		let status = manager.status().await.unwrap();
		assert_eq!(status.active_account_id.as_deref(), Some("A"));
	}

	#[tokio::test]
	async fn set_active_account_rejects_unknown_id() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		assert!(manager.set_active_account("nope").await.is_err());
	}

	#[tokio::test]
	async fn set_strategy_rejects_unknown_tag() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		assert!(manager.set_strategy("bogus").await.is_err());
	}

	#[tokio::test]
	async fn handle_quota_error_on_non_switchable_message_leaves_state_unchanged() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		manager.add_account(input("A")).await.unwrap();

		let result = manager.handle_quota_error(200, "ok").await.unwrap();
		assert!(!result.switched);
		assert_eq!(result.reason, "not-switchable-error");

		let status = manager.status().await.unwrap();
		assert_eq!(status.active_account_id.as_deref(), Some("A"));
	}

	#[tokio::test]
	async fn handle_quota_error_switches_to_fresh_candidate() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		manager.add_account(input("A")).await.unwrap();
		manager.add_account(input("B")).await.unwrap();

		let result = manager.handle_quota_error(429, "quota exceeded").await.unwrap();
		assert!(result.switched);
		assert_eq!(result.to_account_id.as_deref(), Some("B"));

		let status = manager.status().await.unwrap();
		assert_eq!(status.active_account_id.as_deref(), Some("B"));
	}

	#[tokio::test]
	async fn handle_quota_error_with_no_other_accounts_reports_no_available_account() {
		let dir = tempfile::tempdir().unwrap();
		let manager = manager(dir.path());
		manager.add_account(input("A")).await.unwrap();

		let result = manager.handle_quota_error(429, "quota exceeded").await.unwrap();
		assert!(!result.switched);
		assert_eq!(result.reason, "no-available-account");
	}
}
