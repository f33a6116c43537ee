#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
// self
use common::*;
use hal_broker::{
	auth::RequestContext,
	client::CallOptions,
	config::{ClientConfig, RefreshPolicy},
	error::Error,
};

#[tokio::test]
async fn service_user_token_is_fetched_and_attached() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/oauth/token")
				.header("authorization", BASIC_AUTHORIZATION)
				.header("content-type", "application/x-www-form-urlencoded")
				.form_urlencoded_tuple("grant_type", "client_credentials");
			then.status(200)
				.header("content-type", "application/json")
				.body(token_body("svc-token", 3600));
		})
		.await;
	let projects = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/projects").header("authorization", "Bearer svc-token");
			then.status(200).header("content-type", "application/hal+json").body(r#"{"page":0}"#);
		})
		.await;
	let client = build_client(ClientConfig::default().with_service_user(service_user(&server)));

	wait_for_credential(&client).await;

	let credential =
		client.credential_cache().load().expect("Credential should be cached after refresh.");

	assert_eq!(credential.expires_in, 3600);
	assert_eq!(credential.identity.user_id, Some(serde_json::json!("svc-user")));
	assert_eq!(credential.identity.jti.as_deref(), Some("jti-1"));

	let outcome = client
		.get(&RequestContext::detached(), &server.url("/api/projects"), CallOptions::service_user())
		.await;

	assert!(outcome.is_success(), "Unexpected outcome: {outcome:?}.");
	assert_eq!(outcome.body, br#"{"page":0}"#);

	token.assert_calls_async(1).await;
	projects.assert_calls_async(1).await;

	client.stop_refresh();
}

#[tokio::test]
async fn rejected_client_credentials_surface_as_invalid_client() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client","error_description":"bad secret"}"#);
		})
		.await;
	let client = build_client(
		ClientConfig::default()
			.with_service_user(service_user(&server))
			.with_refresh(RefreshPolicy { startup_backoff_secs: 3600, ..Default::default() }),
	);
	let err = client.refresh_now().await.expect_err("Refused credentials should fail the refresh.");

	assert!(matches!(err, Error::InvalidClient { .. }), "Unexpected error: {err:?}.");
	assert!(client.credential_cache().load().is_none());

	let outcome = client
		.get(&RequestContext::detached(), &server.url("/api/projects"), CallOptions::service_user())
		.await;

	assert_eq!(outcome.status, 403);
	assert!(token.calls_async().await >= 1);

	client.stop_refresh();
}

#[tokio::test]
async fn refresh_now_without_service_user_is_disabled() {
	let client = build_client(ClientConfig::default());

	assert!(matches!(client.refresh_now().await, Err(Error::ServiceUserDisabled)));
	assert!(client.refresh_metrics().is_none());
}
