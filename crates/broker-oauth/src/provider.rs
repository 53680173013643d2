// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provider table (§9 "Provider table"): adding a provider is data, not
//! code.

/// Static OAuth configuration for one provider, keyed by lowercased tag.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
	pub tag: &'static str,
	pub client_id: &'static str,
	pub auth_url: &'static str,
	pub token_url: &'static str,
	pub redirect_uri: &'static str,
	pub scopes: &'static [&'static str],
	pub extra_auth_params: &'static [(&'static str, &'static str)],
}

const CODEX_REDIRECT_URI: &str = "http://localhost:1455/auth/callback";

const PROVIDERS: &[ProviderConfig] = &[ProviderConfig {
	tag: "codex",
	client_id: "app_EMoamEEZ73f0CkXaXp7hrann",
	auth_url: "https://auth.openai.com/oauth/authorize",
	token_url: "https://auth.openai.com/oauth/token",
	redirect_uri: CODEX_REDIRECT_URI,
	scopes: &["openid", "profile", "email", "offline_access"],
	extra_auth_params: &[("id_token_add_organizations", "true")],
}];

/// Looks up a provider by its lowercased tag.
pub fn lookup(tag: &str) -> Option<&'static ProviderConfig> {
	let tag = tag.to_ascii_lowercase();
	PROVIDERS.iter().find(|p| p.tag == tag)
}

/// All provider tags this installation knows how to drive OAuth for.
pub fn known_tags() -> Vec<&'static str> {
	PROVIDERS.iter().map(|p| p.tag).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookup_is_case_insensitive() {
		assert!(lookup("CODEX").is_some());
		assert!(lookup("codex").is_some());
	}

	#[test]
	fn unknown_provider_returns_none() {
		assert!(lookup("anthropic").is_none());
	}

	#[test]
	fn known_tags_contains_codex() {
		assert!(known_tags().contains(&"codex"));
	}
}
