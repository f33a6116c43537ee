//! Transport primitives shared by the request executor and the token refresh flow.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack. The executor calls it
//! directly; the client-credentials grant reaches it through [`GrantHttpHandle`], an
//! [`AsyncHttpClient`] adapter that records [`ResponseMetadata`] in a
//! [`ResponseMetadataSlot`] so `oauth2` failures can be classified with the HTTP status that
//! caused them.

// crates.io
use oauth2::{AsyncHttpClient, HttpClientError};
// self
use crate::_prelude::*;

pub use oauth2::{HttpRequest, HttpResponse};

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a, E> = Pin<Box<dyn Future<Output = Result<HttpResponse, E>> + 'a + Send>>;

/// Abstraction over HTTP stacks able to execute a fully built request.
///
/// Implementations must read the whole response body before resolving so the underlying
/// connection can be reused, and must not follow redirects on behalf of the caller unless
/// that is the desired behavior for every endpoint.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// Sends `request` and resolves with the buffered response.
	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError>;

	/// Returns `true` when `error` represents a timeout rather than a connection failure.
	fn is_timeout(error: &Self::TransportError) -> bool {
		let _ = error;

		false
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] handle used by the `oauth2` token exchange.
pub struct GrantHttpHandle<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	slot: ResponseMetadataSlot,
}
impl<T> GrantHttpHandle<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a handle that records outcomes in `slot`.
	pub fn new(transport: Arc<T>, slot: ResponseMetadataSlot) -> Self {
		Self { transport, slot }
	}
}
impl<'c, T> AsyncHttpClient<'c> for GrantHttpHandle<T>
where
	T: ?Sized + HttpTransport,
{
	type Error = HttpClientError<T::TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response = self.transport.execute(request).await.map_err(Box::new)?;

			self.slot.store(ResponseMetadata { status: Some(response.status().as_u16()) });

			Ok(response)
		})
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	type TransportError = ReqwestError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		Box::pin(async move {
			let response = self.0.execute(reqwest::Request::try_from(request)?).await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new = HttpResponse::new(response.bytes().await?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}

	fn is_timeout(error: &Self::TransportError) -> bool {
		error.is_timeout()
	}
}

#[cfg(test)]
pub(crate) mod scripted {
	//! In-memory transport replaying a fixed script of responses.

	// std
	use std::{collections::VecDeque, io};
	// crates.io
	use oauth2::http::{HeaderMap, HeaderValue, Method, StatusCode, header::CONTENT_DISPOSITION};
	// self
	use super::*;

	/// One scripted reply.
	#[derive(Debug)]
	pub(crate) enum Reply {
		Status(u16, Vec<u8>),
		Attachment(String, Vec<u8>),
		Fail(io::ErrorKind),
	}

	/// Snapshot of a request seen by the transport.
	#[derive(Clone, Debug)]
	pub(crate) struct Seen {
		pub(crate) method: Method,
		pub(crate) uri: String,
		pub(crate) headers: HeaderMap,
		pub(crate) body: Vec<u8>,
	}

	#[derive(Debug, Default)]
	pub(crate) struct ScriptedTransport {
		replies: Mutex<VecDeque<Reply>>,
		seen: Mutex<Vec<Seen>>,
		latency: Duration,
	}
	impl ScriptedTransport {
		pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
			Self { replies: Mutex::new(replies.into_iter().collect()), ..Default::default() }
		}

		pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
			self.latency = latency;

			self
		}

		pub(crate) fn seen(&self) -> Vec<Seen> {
			self.seen.lock().clone()
		}

		pub(crate) fn calls(&self) -> usize {
			self.seen.lock().len()
		}
	}
	impl HttpTransport for ScriptedTransport {
		type TransportError = io::Error;

		fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
			Box::pin(async move {
				self.seen.lock().push(Seen {
					method: request.method().clone(),
					uri: request.uri().to_string(),
					headers: request.headers().clone(),
					body: request.body().clone(),
				});

				if !self.latency.is_zero() {
					tokio::time::sleep(self.latency).await;
				}

				let reply = self.replies.lock().pop_front().unwrap_or(Reply::Status(404, Vec::new()));
				let (status, body, file_name) = match reply {
					Reply::Status(status, body) => (status, body, None),
					Reply::Attachment(name, body) => (200, body, Some(name)),
					Reply::Fail(kind) => return Err(io::Error::new(kind, "scripted failure")),
				};
				let mut response = HttpResponse::new(body);

				*response.status_mut() =
					StatusCode::from_u16(status).map_err(|e| io::Error::other(e.to_string()))?;

				if let Some(name) = file_name {
					let value = HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))
						.map_err(|e| io::Error::other(e.to_string()))?;

					response.headers_mut().insert(CONTENT_DISPOSITION, value);
				}

				Ok(response)
			})
		}

		fn is_timeout(error: &Self::TransportError) -> bool {
			error.kind() == io::ErrorKind::TimedOut
		}
	}
}
