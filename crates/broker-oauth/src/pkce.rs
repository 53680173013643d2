// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authorization-code + PKCE (S256) material (§4.G).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// A code verifier and its derived S256 challenge.
#[derive(Debug, Clone)]
pub struct Pkce {
	pub verifier: String,
	pub challenge: String,
}

impl Pkce {
	/// Generates a fresh verifier from 32 random bytes and derives its
	/// challenge.
	pub fn generate() -> Self {
		let mut bytes = [0u8; 32];
		getrandom::getrandom(&mut bytes).expect("system RNG unavailable");
		let verifier = URL_SAFE_NO_PAD.encode(bytes);
		let challenge = challenge_for(&verifier);
		Self { verifier, challenge }
	}
}

/// `state` nonce: 24 random URL-safe bytes, base64 encoded (§4.G `Start`).
pub fn generate_state() -> String {
	let mut bytes = [0u8; 24];
	getrandom::getrandom(&mut bytes).expect("system RNG unavailable");
	URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge: URL-safe base64 (no padding) of SHA-256(verifier).
pub fn challenge_for(verifier: &str) -> String {
	let digest = Sha256::digest(verifier.as_bytes());
	URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rfc7636_test_vector() {
		let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
		assert_eq!(challenge_for(verifier), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
	}

	#[test]
	fn generate_produces_43_character_verifier() {
		let pkce = Pkce::generate();
		assert_eq!(pkce.verifier.len(), 43);
	}

	#[test]
	fn generate_is_not_deterministic() {
		let a = Pkce::generate();
		let b = Pkce::generate();
		assert_ne!(a.verifier, b.verifier);
	}

	#[test]
	fn verifier_and_state_are_url_safe_base64() {
		let pkce = Pkce::generate();
		let state = generate_state();
		for s in [pkce.verifier.as_str(), pkce.challenge.as_str(), state.as_str()] {
			assert!(s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
		}
	}
}
