//! Demonstrates a service-user call through `HalClient` against a mocked identity provider
//! and HAL API, then gates an inbound request with `TokenValidator`.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use hal_broker::{
	auth::RequestContext,
	client::{CallOptions, ReqwestHalClient},
	config::{ClientConfig, ServiceUserConfig, ValidatorConfig},
	hal,
	http::ReqwestTransport,
	reqwest::Client,
	validator::TokenValidator,
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-service\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let project_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/projects/1747").header("authorization", "Bearer demo-service");
			then.status(200).header("content-type", "application/hal+json").body(
				"{\"urn\":\"robotic-eyes:project:1747\",\"_links\":{\"self\":{\"href\":\"https://api.example.com/api/v2/projects/1747{?projection}\"}}}",
			);
		})
		.await;
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let config = ClientConfig::default().with_service_user(ServiceUserConfig::new(
		&server.url("/oauth/token"),
		"demo-client",
		"super-secret",
	)?);
	let client = ReqwestHalClient::with_transport(config, transport)?;

	client.refresh_now().await?;

	let body = client
		.get(
			&RequestContext::detached(),
			&server.url("/api/v2/projects/1747"),
			CallOptions::service_user(),
		)
		.await
		.into_result()?;

	println!("Project self link: {}.", hal::self_link_from_hal(&body));
	println!("Project number: {}.", hal::number_from_urn(&hal::urn_from_hal(&body)));

	let inbound = jsonwebtoken::encode(
		&Header::new(Algorithm::HS256),
		&serde_json::json!({
			"user_id": "u1",
			"complex_authorities": { "license_items": [{ "key": "proj-x" }] },
		}),
		&EncodingKey::from_secret(b"s3cret"),
	)?;
	let validator = TokenValidator::new(&ValidatorConfig::default().with_signing_key("s3cret"));
	let authorized = validator.authorize(Some(&format!("Bearer {inbound}")), None, &["proj-x"])?;

	println!("Inbound caller: {}.", authorized.user_id().unwrap_or("unknown"));

	client.stop_refresh();
	// The background schedule and `refresh_now` may both have reached the endpoint.
	assert!(token_mock.calls_async().await >= 1);
	project_mock.assert_async().await;

	Ok(())
}
