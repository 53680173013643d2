// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Best-effort JWT payload decoding. Shared by the OAuth callback handler
//! (§4.G) and the local-credential importer (§4.H) — both need the same
//! `(email, provider_account_id)` extraction and neither may fail loudly on
//! a malformed token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

/// Extracts `(email, provider_account_id)` from an id token's JWT payload.
/// Never fails: an empty or malformed token yields `("", "")`.
pub fn parse_id_token(id_token: &str) -> (String, String) {
	let Some(payload_segment) = id_token.split('.').nth(1) else {
		return (String::new(), String::new());
	};
	if payload_segment.is_empty() {
		return (String::new(), String::new());
	}

	let Ok(bytes) = decode_base64url_with_padding(payload_segment) else {
		return (String::new(), String::new());
	};

	let Ok(claims) = serde_json::from_slice::<Value>(&bytes) else {
		return (String::new(), String::new());
	};

	let email = claims.get("email").and_then(Value::as_str).unwrap_or_default().to_string();

	let account_id = claims
		.get("https://api.openai.com/auth")
		.and_then(|auth| auth.get("chatgpt_account_id"))
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_string();

	(email, account_id)
}

fn decode_base64url_with_padding(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
	let padded = match segment.len() % 4 {
		0 => segment.to_string(),
		n => format!("{segment}{}", "=".repeat(4 - n)),
	};
	URL_SAFE_NO_PAD.decode(segment).or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(&padded))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode_claims(claims: &Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(b"{}");
		let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
		format!("{header}.{payload}.sig")
	}

	#[test]
	fn round_trips_email_and_account_id() {
		let token = encode_claims(&serde_json::json!({
			"email": "u@x",
			"https://api.openai.com/auth": {"chatgpt_account_id": "acct-1"},
		}));
		assert_eq!(parse_id_token(&token), ("u@x".to_string(), "acct-1".to_string()));
	}

	#[test]
	fn empty_token_yields_empty_pair() {
		assert_eq!(parse_id_token(""), (String::new(), String::new()));
	}

	#[test]
	fn malformed_token_yields_empty_pair_not_panic() {
		assert_eq!(parse_id_token("not-a-jwt"), (String::new(), String::new()));
		assert_eq!(parse_id_token("a.b"), (String::new(), String::new()));
		assert_eq!(parse_id_token("a.!!!notbase64!!!.c"), (String::new(), String::new()));
	}
}
