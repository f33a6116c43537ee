//! Service-user credential issued by the client-credentials grant.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Identity fields the identity provider attaches to a client-credentials response.
///
/// The provider is inconsistent about their types (numbers or strings), so they are kept
/// as raw JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuedIdentity {
	/// Identifier of the user the service account acts as.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_id: Option<Value>,
	/// Login name of that user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_name: Option<Value>,
	/// Display name of that user.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_display_name: Option<Value>,
	/// Token identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jti: Option<String>,
}

/// Access token held by the credential cache; replaced wholesale on every refresh.
#[derive(Clone)]
pub struct ServiceCredential {
	/// Access token secret.
	pub access_token: TokenSecret,
	/// Token type reported by the provider (usually `bearer`).
	pub token_type: String,
	/// Lifetime in seconds as reported by the provider.
	pub expires_in: u64,
	/// Space-delimited scope string, when the provider returned one.
	pub scope: Option<String>,
	/// Instant the credential was received.
	pub issued_at: OffsetDateTime,
	/// Opaque identity fields of the response.
	pub identity: IssuedIdentity,
}
impl ServiceCredential {
	/// Instant after which the provider considers the token expired.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at + Duration::from_secs(self.expires_in)
	}

	/// Returns `true` if the credential has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at()
	}
}
impl Debug for ServiceCredential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceCredential")
			.field("access_token", &self.access_token)
			.field("token_type", &self.token_type)
			.field("expires_in", &self.expires_in)
			.field("scope", &self.scope)
			.field("issued_at", &self.issued_at)
			.field("identity", &self.identity)
			.finish()
	}
}
