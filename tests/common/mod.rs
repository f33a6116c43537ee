#![allow(dead_code)]

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
// self
use hal_broker::{
	client::ReqwestHalClient,
	config::{ClientConfig, RetryPolicy, ServiceUserConfig},
	http::ReqwestTransport,
	reqwest::Client,
};

pub const CLIENT_ID: &str = "svc";
pub const CLIENT_SECRET: &str = "secret";
/// `Basic base64("svc:secret")`.
pub const BASIC_AUTHORIZATION: &str = "Basic c3ZjOnNlY3JldA==";

pub fn token_body(token: &str, expires_in: u64) -> String {
	serde_json::json!({
		"access_token": token,
		"token_type": "bearer",
		"expires_in": expires_in,
		"user_id": "svc-user",
		"user_name": "svc",
		"jti": "jti-1",
	})
	.to_string()
}

pub fn service_user(server: &MockServer) -> ServiceUserConfig {
	ServiceUserConfig::new(&server.url("/oauth/token"), CLIENT_ID, CLIENT_SECRET)
		.expect("Mock token endpoint should form a valid service user configuration.")
}

pub fn fast_retry() -> RetryPolicy {
	RetryPolicy { max_attempts: 3, delay_millis: 10 }
}

/// Builds a reqwest transport that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_transport() -> ReqwestTransport {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestTransport::with_client(client)
}

pub fn build_client(config: ClientConfig) -> ReqwestHalClient {
	ReqwestHalClient::with_transport(config, test_transport())
		.expect("Client should build against the mock server.")
}

/// Polls until the background refresh has stored a credential.
pub async fn wait_for_credential(client: &ReqwestHalClient) {
	for _ in 0..100 {
		if client.credential_cache().access_token().is_some() {
			return;
		}

		tokio::time::sleep(Duration::from_millis(20)).await;
	}

	panic!("Service credential was not refreshed in time.");
}
