//! In-process cache holding the current service credential.

// self
use crate::{
	_prelude::*,
	auth::{ServiceCredential, TokenSecret},
};

/// Shared slot for the most recent [`ServiceCredential`].
///
/// The lock guards only the pointer swap; readers clone the `Arc` and release it
/// immediately, so a reader observes either the previous credential or the new one.
#[derive(Clone, Debug, Default)]
pub struct CredentialCache(Arc<Mutex<Option<Arc<ServiceCredential>>>>);
impl CredentialCache {
	/// Returns the cached credential, if any refresh has succeeded.
	pub fn load(&self) -> Option<Arc<ServiceCredential>> {
		self.0.lock().clone()
	}

	/// Replaces the cached credential wholesale and returns the previous one.
	pub fn store(
		&self,
		credential: impl Into<Arc<ServiceCredential>>,
	) -> Option<Arc<ServiceCredential>> {
		self.0.lock().replace(credential.into())
	}

	/// Returns the cached access token, if present and non-empty.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.load()
			.map(|credential| credential.access_token.clone())
			.filter(|token| !token.is_empty())
	}

	/// Drops the cached credential.
	pub fn clear(&self) {
		self.0.lock().take();
	}
}
