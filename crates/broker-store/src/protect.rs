// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The byte-level protection seam secret blobs pass through before they
//! touch disk.
//!
//! The OS-native primitive behind this (DPAPI, Keychain, libsecret, ...) is
//! explicitly out of scope: callers see only `protect`/`unprotect` on
//! opaque byte strings. [`IdentityProtector`] is the only implementation
//! shipped here; it is a stand-in for whatever platform-specific protector
//! a deployment wires in, and keeps the on-disk format stable regardless of
//! which one that ends up being.

use broker_core::{BrokerError, BrokerResult};

/// A reversible transform applied to a serialized secret blob prior to
/// writing it to disk, and undone after reading it back.
pub trait SecretProtector: Send + Sync {
	fn protect(&self, plaintext: &[u8]) -> BrokerResult<Vec<u8>>;
	fn unprotect(&self, protected: &[u8]) -> BrokerResult<Vec<u8>>;
}

/// Passthrough protector. Used when no platform-native primitive is wired
/// in; also what the test suite uses so fixtures stay readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityProtector;

impl SecretProtector for IdentityProtector {
	fn protect(&self, plaintext: &[u8]) -> BrokerResult<Vec<u8>> {
		Ok(plaintext.to_vec())
	}

	fn unprotect(&self, protected: &[u8]) -> BrokerResult<Vec<u8>> {
		Ok(protected.to_vec())
	}
}

/// Protector that fails every call. Exercises the "unprotect failure is not
/// the same as not-found" distinction the secret store relies on.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingProtector;

impl SecretProtector for FailingProtector {
	fn protect(&self, _plaintext: &[u8]) -> BrokerResult<Vec<u8>> {
		Err(BrokerError::Internal("protect: simulated failure".into()))
	}

	fn unprotect(&self, _protected: &[u8]) -> BrokerResult<Vec<u8>> {
		Err(BrokerError::Internal("unprotect: simulated failure".into()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_protector_round_trips() {
		let p = IdentityProtector;
		let blob = b"hello secret".to_vec();
		let protected = p.protect(&blob).unwrap();
		assert_eq!(protected, blob);
		let back = p.unprotect(&protected).unwrap();
		assert_eq!(back, blob);
	}

	#[test]
	fn failing_protector_errors_on_both_directions() {
		let p = FailingProtector;
		assert!(p.protect(b"x").is_err());
		assert!(p.unprotect(b"x").is_err());
	}
}
