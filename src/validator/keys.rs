//! Verification key material for the HS256 and RS256 algorithms.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey};
use rsa::{RsaPublicKey, pkcs8::DecodePublicKey, traits::PublicKeyParts};
// self
use crate::{_prelude::*, config::ValidatorConfig};

/// Failures while loading the RS256 public key.
#[derive(Debug, ThisError)]
pub enum KeyError {
	/// PEM document is not an SPKI-encoded RSA public key.
	#[error("Public key is not a valid SPKI PEM document.")]
	Spki(#[from] rsa::pkcs8::spki::Error),
	/// Key components were rejected by the verifier.
	#[error("Public key components are unusable.")]
	Components(#[from] jsonwebtoken::errors::Error),
}

/// Optional HS256 shared secret and optional RS256 public key.
///
/// Immutable once built; rotate keys by building a new validator.
#[derive(Clone, Default)]
pub struct SigningKeys {
	shared_secret: Option<DecodingKey>,
	public_key: Option<DecodingKey>,
}
impl SigningKeys {
	/// Loads the keys named in `config`.
	///
	/// An unusable public key is logged and left absent, so RS256 tokens are rejected while
	/// HS256 keeps working.
	pub fn from_config(config: &ValidatorConfig) -> Self {
		let mut keys = Self::default();

		if let Some(secret) = config.signing_key.as_ref().filter(|secret| !secret.is_empty()) {
			keys = keys.with_shared_secret(secret.expose().as_bytes());
		}
		if let Some(pem) = config.public_key_pem.as_deref().filter(|pem| !pem.trim().is_empty()) {
			match Self::parse_spki_pem(pem) {
				Ok(key) => keys.public_key = Some(key),
				Err(e) => tracing::error!(error = %e, "RS256 public key could not be loaded."),
			}
		}

		keys
	}

	/// Sets the HS256 shared secret.
	pub fn with_shared_secret(mut self, secret: &[u8]) -> Self {
		self.shared_secret = Some(DecodingKey::from_secret(secret));

		self
	}

	/// Sets the RS256 public key from an SPKI PEM document.
	pub fn with_public_key_pem(mut self, pem: &str) -> Result<Self, KeyError> {
		self.public_key = Some(Self::parse_spki_pem(pem)?);

		Ok(self)
	}

	/// Parses an SPKI (`BEGIN PUBLIC KEY`) PEM document into an RS256 verification key.
	pub fn parse_spki_pem(pem: &str) -> Result<DecodingKey, KeyError> {
		let key = RsaPublicKey::from_public_key_pem(pem.trim())?;
		let modulus = URL_SAFE_NO_PAD.encode(key.n().to_bytes_be());
		let exponent = URL_SAFE_NO_PAD.encode(key.e().to_bytes_be());

		Ok(DecodingKey::from_rsa_components(&modulus, &exponent)?)
	}

	/// Key used for `algorithm`; `None` for unsupported algorithms or absent keys.
	pub fn key_for(&self, algorithm: Algorithm) -> Option<&DecodingKey> {
		match algorithm {
			Algorithm::HS256 => self.shared_secret.as_ref(),
			Algorithm::RS256 => self.public_key.as_ref(),
			_ => None,
		}
	}
}
impl Debug for SigningKeys {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SigningKeys")
			.field("shared_secret_set", &self.shared_secret.is_some())
			.field("public_key_set", &self.public_key.is_some())
			.finish()
	}
}
