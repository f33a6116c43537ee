//! Redacting wrapper for access tokens and client secrets.

// self
use crate::_prelude::*;

/// Authorization scheme used for every token this crate forwards.
pub const BEARER_SCHEME: &str = "Bearer";

/// Secret string (access token, client secret) that never shows up in `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Extracts the token from an `Authorization` header value using the bearer scheme.
	///
	/// The scheme is matched case-insensitively. Returns `None` for other schemes or when the
	/// token part is missing.
	pub fn from_bearer_header(value: &str) -> Option<Self> {
		let (scheme, token) = split_authorization(value)?;

		if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
			return None;
		}

		Some(Self::new(token))
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds no characters.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Formats the secret as an `Authorization` header value (`Bearer <token>`).
	pub fn bearer_header(&self) -> String {
		format!("{BEARER_SCHEME} {}", self.0)
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Splits an `Authorization` header value into `(scheme, credentials)`.
pub(crate) fn split_authorization(value: &str) -> Option<(&str, &str)> {
	let mut parts = value.trim().splitn(2, char::is_whitespace);
	let scheme = parts.next().filter(|scheme| !scheme.is_empty())?;
	let token = parts.next().map(str::trim).filter(|token| !token.is_empty())?;

	Some((scheme, token))
}
