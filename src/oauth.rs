//! Client-credentials grant facade over the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicErrorResponseType, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{IssuedIdentity, ServiceCredential, TokenSecret},
	config::ServiceUserConfig,
	error::{ConfigError, TransientError, TransportError},
	http::{GrantHttpHandle, HttpTransport, ResponseMetadata, ResponseMetadataSlot},
};

/// Token response carrying the provider's identity fields next to the standard ones.
pub type IdentityTokenResponse = StandardTokenResponse<IssuedIdentity, BasicTokenType>;

type GrantClient = oauth2::Client<
	BasicErrorResponse,
	IdentityTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

impl oauth2::ExtraTokenFields for IssuedIdentity {}

pub(crate) trait OAuth2Facade
where
	Self: Send + Sync,
{
	fn exchange_client_credentials(&self) -> FacadeFuture<'_, ServiceCredential>;
}

/// Client-credentials exchange against one token endpoint.
///
/// Client authentication uses HTTP Basic (`client_id:client_secret`), the form body carries
/// `grant_type=client_credentials`, and the response is parsed as JSON.
pub(crate) struct BasicFacade<T>
where
	T: ?Sized + HttpTransport,
{
	oauth_client: GrantClient,
	transport: Arc<T>,
}
impl<T> BasicFacade<T>
where
	T: ?Sized + HttpTransport,
{
	pub(crate) fn from_config(config: &ServiceUserConfig, transport: Arc<T>) -> Result<Self> {
		config.validate()?;

		let token_url = TokenUrl::from_url(config.token_url.clone());
		let oauth_client: GrantClient = oauth2::Client::new(ClientId::new(config.client_id.clone()))
			.set_client_secret(ClientSecret::new(config.client_secret.expose().to_owned()))
			.set_token_uri(token_url);

		Ok(Self { oauth_client, transport })
	}
}
impl<T> OAuth2Facade for BasicFacade<T>
where
	T: ?Sized + HttpTransport,
{
	fn exchange_client_credentials(&self) -> FacadeFuture<'_, ServiceCredential> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = GrantHttpHandle::new(self.transport.clone(), meta.clone());
			let response = self
				.oauth_client
				.exchange_client_credentials()
				.request_async(&handle)
				.await
				.map_err(|err| map_request_error::<T>(meta.take(), err))?;

			map_token_response(response)
		})
	}
}

fn map_token_response(response: IdentityTokenResponse) -> Result<ServiceCredential> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let access_token = response.access_token().secret();

	if access_token.is_empty() {
		return Err(ConfigError::MissingAccessToken.into());
	}

	let token_type = match response.token_type() {
		BasicTokenType::Bearer => "bearer".to_owned(),
		BasicTokenType::Mac => "mac".to_owned(),
		BasicTokenType::Extension(other) => other.clone(),
	};
	let scope = response.scopes().map(|scopes| {
		scopes.iter().map(|scope| scope.as_str()).collect::<Vec<_>>().join(" ")
	});

	Ok(ServiceCredential {
		access_token: TokenSecret::new(access_token.as_str()),
		token_type,
		expires_in,
		scope,
		issued_at: OffsetDateTime::now_utc(),
		identity: response.extra_fields().clone(),
	})
}

fn map_request_error<T>(
	meta: Option<ResponseMetadata>,
	err: RequestTokenError<HttpClientError<T::TransportError>, BasicErrorResponse>,
) -> Error
where
	T: ?Sized + HttpTransport,
{
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, status),
		RequestTokenError::Request(error) => map_transport_error::<T>(error, status),
		RequestTokenError::Parse(error, _body) =>
			TransientError::TokenResponseParse { source: error, status }.into(),
		RequestTokenError::Other(message) =>
			TransientError::TokenEndpoint { message, status }.into(),
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let message = match response.error_description() {
		Some(description) => description.clone(),
		None => response.error().as_ref().to_owned(),
	};

	match response.error() {
		BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient =>
			Error::InvalidClient { reason: message },
		_ => TransientError::TokenEndpoint { message, status }.into(),
	}
}

fn map_transport_error<T>(err: HttpClientError<T::TransportError>, status: Option<u16>) -> Error
where
	T: ?Sized + HttpTransport,
{
	match err {
		HttpClientError::Reqwest(inner) =>
			if T::is_timeout(&inner) {
				TransientError::TokenEndpoint {
					message: "request timed out while calling the token endpoint".into(),
					status,
				}
				.into()
			} else {
				TransportError::network(*inner).into()
			},
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint { message, status }.into(),
		_ => TransientError::TokenEndpoint {
			message: "HTTP client error occurred while calling the token endpoint".into(),
			status,
		}
		.into(),
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::io::ErrorKind;
	// crates.io
	use oauth2::http::{Method, header::AUTHORIZATION};
	// self
	use super::*;
	use crate::http::scripted::{Reply, ScriptedTransport};

	fn config() -> ServiceUserConfig {
		ServiceUserConfig::new("https://idp.example.com/oauth/token", "svc-client", "svc-secret")
			.expect("Service user configuration should be valid.")
	}

	fn facade(replies: Vec<Reply>) -> (BasicFacade<ScriptedTransport>, Arc<ScriptedTransport>) {
		let transport = Arc::new(ScriptedTransport::new(replies));
		let facade = BasicFacade::from_config(&config(), transport.clone())
			.expect("Facade should build from a valid configuration.");

		(facade, transport)
	}

	#[tokio::test]
	async fn exchange_parses_identity_fields() {
		let body = serde_json::json!({
			"access_token": "service-token",
			"token_type": "bearer",
			"expires_in": 3600,
			"scope": "read write",
			"user_id": 42,
			"user_name": "svc",
			"jti": "abc",
		});
		let (grant, transport) =
			facade(vec![Reply::Status(200, serde_json::to_vec(&body).expect("Body serializes."))]);
		let credential = grant
			.exchange_client_credentials()
			.await
			.expect("Client credentials exchange should succeed.");

		assert_eq!(credential.access_token.expose(), "service-token");
		assert_eq!(credential.token_type, "bearer");
		assert_eq!(credential.expires_in, 3600);
		assert_eq!(credential.scope.as_deref(), Some("read write"));
		assert_eq!(credential.identity.user_id, Some(serde_json::json!(42)));
		assert_eq!(credential.identity.jti.as_deref(), Some("abc"));

		let seen = transport.seen();

		assert_eq!(seen.len(), 1);
		assert_eq!(seen[0].method, Method::POST);
		assert_eq!(seen[0].uri, "https://idp.example.com/oauth/token");
		assert!(
			seen[0]
				.headers
				.get(AUTHORIZATION)
				.and_then(|value| value.to_str().ok())
				.is_some_and(|value| value.starts_with("Basic "))
		);
		assert_eq!(seen[0].body, b"grant_type=client_credentials");
	}

	#[tokio::test]
	async fn missing_expires_in_is_an_error() {
		let body = br#"{"access_token":"service-token","token_type":"bearer"}"#.to_vec();
		let (grant, _) = facade(vec![Reply::Status(200, body)]);
		let err = grant
			.exchange_client_credentials()
			.await
			.expect_err("Responses without expires_in should be rejected.");

		assert!(matches!(err, Error::Config(ConfigError::MissingExpiresIn)));
	}

	#[tokio::test]
	async fn invalid_client_is_classified() {
		let body = br#"{"error":"invalid_client","error_description":"bad secret"}"#.to_vec();
		let (grant, _) = facade(vec![Reply::Status(401, body)]);
		let err = grant
			.exchange_client_credentials()
			.await
			.expect_err("invalid_client should fail the exchange.");

		assert!(matches!(err, Error::InvalidClient { ref reason } if reason == "bad secret"));
	}

	#[tokio::test]
	async fn transport_failures_are_classified() {
		let (refused, _) = facade(vec![Reply::Fail(ErrorKind::ConnectionRefused)]);
		let err = refused
			.exchange_client_credentials()
			.await
			.expect_err("Connection failures should surface.");

		assert!(matches!(err, Error::Transport(TransportError::Network { .. })));

		let (timed_out, _) = facade(vec![Reply::Fail(ErrorKind::TimedOut)]);
		let err = timed_out
			.exchange_client_credentials()
			.await
			.expect_err("Timeouts should surface.");

		assert!(matches!(err, Error::Transient(TransientError::TokenEndpoint { .. })));
	}

	#[tokio::test]
	async fn malformed_json_is_transient() {
		let (grant, _) = facade(vec![Reply::Status(200, b"not json".to_vec())]);
		let err = grant
			.exchange_client_credentials()
			.await
			.expect_err("Malformed JSON should fail the exchange.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenResponseParse { status: Some(200), .. })
		));
	}
}
