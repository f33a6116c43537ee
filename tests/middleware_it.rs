#![cfg(feature = "axum")]

// std
use std::sync::Arc;
// crates.io
use axum::{
	Extension, Router,
	body::Body,
	http::{Request, StatusCode, header::AUTHORIZATION},
	middleware::from_fn_with_state,
	routing::get,
};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use tower::ServiceExt;
// self
use hal_broker::{
	auth::{BearerClaims, RequestContext},
	config::ValidatorConfig,
	interceptor::SessionInterceptor,
	middleware::{BearerGuard, inject_session_token, require_bearer},
	validator::TokenValidator,
};

fn token() -> String {
	jsonwebtoken::encode(
		&Header::new(Algorithm::HS256),
		&serde_json::json!({
			"user_id": "u1",
			"complex_authorities": { "license_items": [{ "key": "proj-x" }] },
		}),
		&EncodingKey::from_secret(b"s3cret"),
	)
	.expect("HS256 token should encode.")
}

async fn whoami(
	Extension(context): Extension<RequestContext>,
	Extension(claims): Extension<BearerClaims>,
) -> String {
	format!(
		"{}:{}",
		context.user_id.unwrap_or_default(),
		claims.complex_authorities.license_items.len()
	)
}

fn app(entitlement: &str) -> Router {
	let validator = TokenValidator::new(&ValidatorConfig::default().with_signing_key("s3cret"));

	Router::new()
		.route("/whoami", get(whoami))
		.layer(from_fn_with_state(
			BearerGuard::new(validator).with_entitlement(entitlement),
			require_bearer,
		))
}

async fn body_text(response: axum::response::Response) -> String {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");

	String::from_utf8(bytes.to_vec()).expect("Response body should be UTF-8.")
}

#[tokio::test]
async fn authorized_requests_reach_the_handler_with_context() {
	let request = Request::builder()
		.uri("/whoami")
		.header(AUTHORIZATION, format!("Bearer {}", token()))
		.body(Body::empty())
		.expect("Request should build.");
	let response = app("proj-x").oneshot(request).await.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(body_text(response).await, "u1:1");
}

#[tokio::test]
async fn rejected_requests_get_a_bare_forbidden() {
	for header in [None, Some(format!("Bearer {}", token())), Some("Basic abc".to_owned())] {
		let mut builder = Request::builder().uri("/whoami");

		if let Some(header) = header {
			builder = builder.header(AUTHORIZATION, header);
		}

		let response = app("proj-y")
			.oneshot(builder.body(Body::empty()).expect("Request should build."))
			.await
			.expect("Router should respond.");

		assert_eq!(response.status(), StatusCode::FORBIDDEN);
		assert!(body_text(response).await.is_empty());
	}
}

#[tokio::test]
async fn session_token_is_used_when_the_header_is_missing() {
	let path = std::env::temp_dir()
		.join(format!("hal-broker-middleware-{}.json", std::process::id()));

	std::fs::write(
		&path,
		serde_json::json!({ "access_token": token(), "token_type": "bearer" }).to_string(),
	)
	.expect("Session file should be written.");

	let interceptor = Arc::new(SessionInterceptor::new(&path));
	let app = app("proj-x").layer(from_fn_with_state(interceptor, inject_session_token));
	let response = app
		.oneshot(Request::builder().uri("/whoami").body(Body::empty()).expect("Request should build."))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(body_text(response).await, "u1:1");

	let _ = std::fs::remove_file(&path);
}
