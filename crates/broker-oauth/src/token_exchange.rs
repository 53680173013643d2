// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Component D (Token Refresher) and the token-exchange half of component G
//! (§4.D, §4.G): both are a POST to the provider's token endpoint, they
//! just differ in grant type.

use broker_core::{BrokerError, BrokerResult};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::provider::ProviderConfig;

const DEFAULT_EXPIRES_IN: i64 = 3600;

/// Result of a successful token exchange.
#[derive(Debug, Clone)]
pub struct ExchangedTokens {
	pub access_token: String,
	pub refresh_token: Option<String>,
	pub id_token: Option<String>,
	pub access_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: Option<String>,
	refresh_token: Option<String>,
	id_token: Option<String>,
	expires_in: Option<i64>,
}

/// `grant_type=refresh_token` (§4.D). No retry at this layer.
pub async fn refresh(client: &reqwest::Client, provider: &ProviderConfig, refresh_token: &str) -> BrokerResult<ExchangedTokens> {
	let params = [
		("grant_type", "refresh_token"),
		("refresh_token", refresh_token),
		("client_id", provider.client_id),
	];
	exchange(client, provider.token_url, &params).await
}

/// `grant_type=authorization_code` (§4.G callback).
pub async fn exchange_code(
	client: &reqwest::Client,
	provider: &ProviderConfig,
	code: &str,
	code_verifier: &str,
) -> BrokerResult<ExchangedTokens> {
	let params = [
		("grant_type", "authorization_code"),
		("code", code),
		("redirect_uri", provider.redirect_uri),
		("client_id", provider.client_id),
		("code_verifier", code_verifier),
	];
	exchange(client, provider.token_url, &params).await
}

async fn exchange(client: &reqwest::Client, token_url: &str, params: &[(&str, &str)]) -> BrokerResult<ExchangedTokens> {
	let response = client
		.post(token_url)
		.form(params)
		.send()
		.await
		.map_err(|e| BrokerError::UpstreamHttp { status: 0, body: e.to_string() })?;

	let status = response.status();
	let body = response.text().await.unwrap_or_default();

	if !status.is_success() {
		let trimmed: String = body.chars().take(2048).collect();
		return Err(BrokerError::UpstreamHttp { status: status.as_u16(), body: trimmed });
	}

	let parsed: TokenResponse =
		serde_json::from_str(&body).map_err(|e| BrokerError::UpstreamHttp { status: status.as_u16(), body: e.to_string() })?;

	let access_token = parsed
		.access_token
		.filter(|t| !t.is_empty())
		.ok_or_else(|| BrokerError::UpstreamHttp { status: status.as_u16(), body: "missing access_token".into() })?;

	let expires_in = parsed.expires_in.filter(|v| *v > 0).unwrap_or(DEFAULT_EXPIRES_IN);

	Ok(ExchangedTokens {
		access_token,
		refresh_token: parsed.refresh_token,
		id_token: parsed.id_token,
		access_expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
	})
}
