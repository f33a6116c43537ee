//! Bearer-token validation and license-based authorization.
//!
//! [`TokenValidator::authorize`] walks a fixed sequence: extract the token (header first, then
//! the injected fallback), read `alg` from the unverified header, pick the key configured for
//! that algorithm (HS256 or RS256 only), verify signature and `exp`, decode [`BearerClaims`],
//! and check the first required entitlement against the license items. Every failure is a
//! [`Rejection`] that maps to HTTP 403; the reason is only logged.

mod keys;

pub use keys::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, Validation};
// self
use crate::{
	_prelude::*,
	auth::{BEARER_SCHEME, BearerClaims, RequestContext, TokenSecret, secret::split_authorization},
	config::ValidatorConfig,
	obs::{self, OpKind, OpOutcome, OpSpan},
};

/// Step of the validation sequence at which a token was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValidationStage {
	/// Reading the token from the request.
	Extraction,
	/// Decoding the unverified JOSE header.
	Header,
	/// Selecting the key for the announced algorithm.
	KeySelection,
	/// Verifying signature and registered claims.
	Signature,
	/// Checking the required entitlement.
	Authorization,
}
impl ValidationStage {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Extraction => "extraction",
			Self::Header => "header",
			Self::KeySelection => "key_selection",
			Self::Signature => "signature",
			Self::Authorization => "authorization",
		}
	}
}

/// Reason a bearer token was rejected.
///
/// The `Display` strings are meant for logs; callers should only ever see
/// [`Rejection::status`] and [`Rejection::PUBLIC_MESSAGE`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum Rejection {
	/// Neither the header nor the injected fallback carried a token.
	#[error("No bearer token was supplied.")]
	MissingToken,
	/// Authorization scheme is not `bearer`.
	#[error("Authorization scheme is not bearer.")]
	InvalidScheme,
	/// Token is not a three-part JWT with a readable header.
	#[error("Token is malformed.")]
	MalformedToken,
	/// Header announced an algorithm other than HS256 or RS256.
	#[error("Token algorithm `{alg}` is not accepted.")]
	UnsupportedAlgorithm {
		/// Announced algorithm.
		alg: String,
	},
	/// No key is configured for the announced algorithm.
	#[error("No verification key is configured for `{alg}`.")]
	MissingKey {
		/// Announced algorithm.
		alg: String,
	},
	/// Signature or registered claims failed verification.
	#[error("Token signature or claims are invalid: {reason}.")]
	InvalidSignature {
		/// Verifier's reason.
		reason: String,
	},
	/// Token lacks the required entitlement.
	#[error("Token does not grant entitlement `{entitlement}`.")]
	MissingEntitlement {
		/// Entitlement that was required.
		entitlement: String,
	},
}
impl Rejection {
	/// Body returned to rejected callers.
	pub const PUBLIC_MESSAGE: &'static str = "Forbidden";

	/// HTTP status of every rejection.
	pub const fn status(&self) -> u16 {
		403
	}

	/// Stage at which the rejection happened.
	pub const fn stage(&self) -> ValidationStage {
		match self {
			Self::MissingToken | Self::InvalidScheme => ValidationStage::Extraction,
			Self::MalformedToken => ValidationStage::Header,
			Self::UnsupportedAlgorithm { .. } | Self::MissingKey { .. } =>
				ValidationStage::KeySelection,
			Self::InvalidSignature { .. } => ValidationStage::Signature,
			Self::MissingEntitlement { .. } => ValidationStage::Authorization,
		}
	}
}

/// Result of a successful authorization.
#[derive(Clone, Debug)]
pub struct Authorized {
	/// Verified claims.
	pub claims: BearerClaims,
	/// The verified token, without the scheme.
	pub token: TokenSecret,
}
impl Authorized {
	/// Authenticated user ID, when the token carries one.
	pub fn user_id(&self) -> Option<&str> {
		self.claims.user_id.as_deref()
	}

	/// Attaches the token and user ID to a request context.
	pub fn apply(&self, mut context: RequestContext) -> RequestContext {
		context.access_token = Some(self.token.clone());
		context.user_id = self.claims.user_id.clone();

		context
	}
}

#[derive(Deserialize)]
struct UnverifiedHeader {
	alg: String,
}

/// Verifies inbound bearer tokens.
#[derive(Clone, Debug)]
pub struct TokenValidator {
	keys: SigningKeys,
	leeway_secs: u64,
}
impl TokenValidator {
	/// Builds a validator from configuration.
	pub fn new(config: &ValidatorConfig) -> Self {
		Self { keys: SigningKeys::from_config(config), leeway_secs: config.leeway_secs }
	}

	/// Builds a validator from preloaded keys.
	pub fn with_keys(keys: SigningKeys) -> Self {
		Self { keys, leeway_secs: 0 }
	}

	/// Sets the clock-skew leeway for `exp`.
	pub fn with_leeway_secs(mut self, leeway_secs: u64) -> Self {
		self.leeway_secs = leeway_secs;

		self
	}

	/// Authenticates and authorizes a request.
	///
	/// `header` is the raw `Authorization` value; `injected` is used when it is missing or
	/// empty. Only the first entry of `required` is checked; an empty slice or a blank first
	/// entry skips the entitlement check.
	pub fn authorize(
		&self,
		header: Option<&str>,
		injected: Option<&str>,
		required: &[&str],
	) -> Result<Authorized, Rejection> {
		const KIND: OpKind = OpKind::Validate;

		let _span = OpSpan::new(KIND, "authorize").entered();

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = self.authorize_inner(header, injected, required);

		if let Err(rejection) = &result {
			tracing::warn!(
				stage = rejection.stage().as_str(),
				reason = %rejection,
				entitlement = required.first().copied().unwrap_or_default(),
				"Bearer token rejected."
			);
		}

		obs::record_op_outcome(KIND, OpOutcome::from_success(result.is_ok()));

		result
	}

	fn authorize_inner(
		&self,
		header: Option<&str>,
		injected: Option<&str>,
		required: &[&str],
	) -> Result<Authorized, Rejection> {
		let raw = [header, injected]
			.into_iter()
			.flatten()
			.map(str::trim)
			.find(|value| !value.is_empty())
			.ok_or(Rejection::MissingToken)?;
		let (scheme, token) = split_authorization(raw).ok_or(Rejection::InvalidScheme)?;

		if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
			return Err(Rejection::InvalidScheme);
		}

		let algorithm = match read_algorithm(token)?.as_str() {
			"HS256" => Algorithm::HS256,
			"RS256" => Algorithm::RS256,
			other => return Err(Rejection::UnsupportedAlgorithm { alg: other.to_owned() }),
		};
		let key = self
			.keys
			.key_for(algorithm)
			.ok_or_else(|| Rejection::MissingKey { alg: format!("{algorithm:?}") })?;
		let mut validation = Validation::new(algorithm);

		validation.validate_aud = false;
		validation.required_spec_claims.clear();
		validation.leeway = self.leeway_secs;

		let claims = jsonwebtoken::decode::<BearerClaims>(token, key, &validation)
			.map_err(|e| Rejection::InvalidSignature { reason: e.to_string() })?
			.claims;

		let entitlement = required.first().copied().filter(|key| !key.trim().is_empty());

		if let Some(entitlement) = entitlement.filter(|key| !claims.has_license(key)) {
			tracing::info!(
				user_id = claims.user_id.as_deref().unwrap_or_default(),
				entitlement,
				"User lacks the required entitlement."
			);

			return Err(Rejection::MissingEntitlement { entitlement: entitlement.to_owned() });
		}

		Ok(Authorized { claims, token: TokenSecret::new(token) })
	}
}

fn read_algorithm(token: &str) -> Result<String, Rejection> {
	let mut parts = token.split('.');
	let (Some(header), Some(_), Some(_), None) = (parts.next(), parts.next(), parts.next(), parts.next())
	else {
		return Err(Rejection::MalformedToken);
	};
	let bytes = URL_SAFE_NO_PAD
		.decode(header.trim_end_matches('='))
		.map_err(|_| Rejection::MalformedToken)?;
	let header = serde_json::from_slice::<UnverifiedHeader>(&bytes)
		.map_err(|_| Rejection::MalformedToken)?;

	Ok(header.alg)
}

#[cfg(test)]
mod tests {
	// crates.io
	use jsonwebtoken::{EncodingKey, Header};
	// self
	use super::*;

	fn hs256(claims: serde_json::Value, secret: &str) -> String {
		jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			&claims,
			&EncodingKey::from_secret(secret.as_bytes()),
		)
		.expect("HS256 token should encode.")
	}

	fn validator() -> TokenValidator {
		TokenValidator::new(&ValidatorConfig::default().with_signing_key("s3cret"))
	}

	fn licensed_claims() -> serde_json::Value {
		serde_json::json!({
			"user_id": "u1",
			"complex_authorities": { "license_items": [{ "key": "proj-x" }] },
		})
	}

	#[test]
	fn hs256_license_check_uses_first_entitlement() {
		let header = format!("Bearer {}", hs256(licensed_claims(), "s3cret"));
		let authorized = validator()
			.authorize(Some(&header), None, &["proj-x", "proj-y"])
			.expect("Token with the first entitlement should be accepted.");

		assert_eq!(authorized.user_id(), Some("u1"));

		let rejection = validator()
			.authorize(Some(&header), None, &["proj-y", "proj-x"])
			.expect_err("Token without the first entitlement should be rejected.");

		assert_eq!(rejection, Rejection::MissingEntitlement { entitlement: "proj-y".into() });
		assert_eq!(rejection.status(), 403);
		assert!(validator().authorize(Some(&header), None, &[]).is_ok());
	}

	#[test]
	fn blank_entitlement_skips_license_check() {
		let header = format!("Bearer {}", hs256(licensed_claims(), "s3cret"));

		let cases: [&[&str]; 3] = [&[""], &[" "], &["", "proj-y"]];

		for required in cases {
			let authorized = validator()
				.authorize(Some(&header), None, required)
				.expect("Blank entitlement should only require a valid signature.");

			assert_eq!(authorized.user_id(), Some("u1"));
		}
	}

	#[test]
	fn wrong_secret_is_rejected() {
		let header = format!("Bearer {}", hs256(licensed_claims(), "other"));
		let rejection = validator()
			.authorize(Some(&header), None, &[])
			.expect_err("Token signed with another secret should be rejected.");

		assert_eq!(rejection.stage(), ValidationStage::Signature);
	}

	#[test]
	fn unexpected_algorithms_are_rejected() {
		let none_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(br#"{"user_id":"u1"}"#);
		let unsigned = format!("Bearer {none_header}.{payload}.");

		assert_eq!(
			validator().authorize(Some(&unsigned), None, &[]).err(),
			Some(Rejection::UnsupportedAlgorithm { alg: "none".into() })
		);

		let hs384 = jsonwebtoken::encode(
			&Header::new(Algorithm::HS384),
			&licensed_claims(),
			&EncodingKey::from_secret(b"s3cret"),
		)
		.expect("HS384 token should encode.");

		assert_eq!(
			validator().authorize(Some(&format!("Bearer {hs384}")), None, &[]).err(),
			Some(Rejection::UnsupportedAlgorithm { alg: "HS384".into() })
		);
	}

	#[test]
	fn rs256_without_public_key_is_rejected() {
		let rs_header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
		let token = format!("Bearer {rs_header}.e30.c2ln");

		assert_eq!(
			validator().authorize(Some(&token), None, &[]).err(),
			Some(Rejection::MissingKey { alg: "RS256".into() })
		);
	}

	#[test]
	fn extraction_failures_are_rejected() {
		let token = hs256(licensed_claims(), "s3cret");

		assert_eq!(validator().authorize(None, None, &[]).err(), Some(Rejection::MissingToken));
		assert_eq!(validator().authorize(Some("  "), None, &[]).err(), Some(Rejection::MissingToken));
		assert_eq!(
			validator().authorize(Some(&format!("Basic {token}")), None, &[]).err(),
			Some(Rejection::InvalidScheme)
		);
		assert_eq!(
			validator().authorize(Some("Bearer not-a-jwt"), None, &[]).err(),
			Some(Rejection::MalformedToken)
		);
		assert_eq!(
			validator().authorize(Some("Bearer a.b.c.d"), None, &[]).err(),
			Some(Rejection::MalformedToken)
		);
	}

	#[test]
	fn injected_token_is_a_fallback() {
		let injected = format!("bearer {}", hs256(licensed_claims(), "s3cret"));
		let authorized = validator()
			.authorize(Some(""), Some(&injected), &["proj-x"])
			.expect("Injected token should be used when the header is empty.");
		let context = authorized.apply(RequestContext::detached());

		assert_eq!(context.user_id.as_deref(), Some("u1"));
		assert!(context.access_token.is_some());
	}

	#[test]
	fn expired_tokens_are_rejected_unless_within_leeway() {
		let exp = OffsetDateTime::now_utc().unix_timestamp() - 120;
		let header = format!(
			"Bearer {}",
			hs256(serde_json::json!({ "user_id": "u1", "exp": exp }), "s3cret")
		);

		assert!(matches!(
			validator().authorize(Some(&header), None, &[]),
			Err(Rejection::InvalidSignature { .. })
		));
		assert!(validator().with_leeway_secs(600).authorize(Some(&header), None, &[]).is_ok());
	}
}
