//! Local-development session interceptor.
//!
//! Reads a session file written by a local login tool and offers its token as the fallback
//! authorization value for [`crate::validator::TokenValidator::authorize`], so a service can be
//! exercised locally without a real caller token.

// std
use std::{
	path::{Path, PathBuf},
	time::SystemTime,
};
// self
use crate::{_prelude::*, error::ConfigError};

#[derive(Deserialize)]
struct SessionFile {
	access_token: String,
	#[serde(default)]
	token_type: String,
}

#[derive(Clone, Default)]
struct Session {
	authorization: Option<String>,
	modified: Option<SystemTime>,
}

/// Token source backed by a JSON session file (`{"access_token", "token_type"}`).
pub struct SessionInterceptor {
	path: PathBuf,
	session: RwLock<Session>,
}
impl SessionInterceptor {
	/// Loads the session file at `path`.
	///
	/// A missing or malformed file is logged; the interceptor then has no token until a later
	/// reload succeeds.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		let interceptor = Self { path: path.into(), session: Default::default() };

		if let Err(e) = interceptor.reload() {
			tracing::error!(error = %e, "Session file could not be loaded.");
		}

		interceptor
	}

	/// Path of the watched session file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Re-reads the session file. On failure the previous token is kept.
	pub fn reload(&self) -> Result<(), ConfigError> {
		let bytes = std::fs::read(&self.path).map_err(|e| self.file_error(e))?;
		let modified = std::fs::metadata(&self.path).and_then(|meta| meta.modified()).ok();

		self.install(&bytes, modified)
	}

	/// Authorization value (`"<token_type> <access_token>"`) of the loaded session.
	pub fn authorization_value(&self) -> Option<String> {
		self.session.read().authorization.clone()
	}

	/// Polls the session file's modification time every `interval` and reloads on change
	/// until `cancel` fires.
	pub async fn watch(&self, interval: Duration, cancel: CancellationToken) {
		loop {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				_ = tokio::time::sleep(interval) => {},
			}

			let modified = match tokio::fs::metadata(&self.path).await {
				Ok(meta) => meta.modified().ok(),
				// Editors briefly remove the file while saving.
				Err(_) => continue,
			};

			if modified == self.session.read().modified {
				continue;
			}

			tracing::info!(path = %self.path.display(), "Session file changed, reloading token.");

			let result = match tokio::fs::read(&self.path).await {
				Ok(bytes) => self.install(&bytes, modified),
				Err(e) => Err(self.file_error(e)),
			};

			if let Err(e) = result {
				tracing::error!(error = %e, "Session file could not be reloaded.");
			}
		}
	}

	fn install(&self, bytes: &[u8], modified: Option<SystemTime>) -> Result<(), ConfigError> {
		let mut session = self.session.write();

		// Record the timestamp even for a bad file so the watcher waits for the next write.
		session.modified = modified;

		let file = serde_json::from_slice::<SessionFile>(bytes).map_err(|source| {
			ConfigError::SessionFormat { path: self.path.display().to_string(), source }
		})?;

		session.authorization = Some(format!("{} {}", file.token_type, file.access_token));

		Ok(())
	}

	fn file_error(&self, source: std::io::Error) -> ConfigError {
		ConfigError::SessionFile { path: self.path.display().to_string(), source }
	}
}
impl Debug for SessionInterceptor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionInterceptor")
			.field("path", &self.path)
			.field("loaded", &self.session.read().authorization.is_some())
			.finish()
	}
}
