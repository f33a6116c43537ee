//! axum middleware guarding routes with [`TokenValidator`].
//!
//! ```ignore
//! let guard = BearerGuard::new(validator).with_entitlement("proj-x");
//! let app = Router::new()
//! 	.route("/projects", get(list))
//! 	.layer(axum::middleware::from_fn_with_state(guard, require_bearer));
//! ```

// crates.io
use axum::{
	extract::{Request, State},
	http::{StatusCode, header::AUTHORIZATION},
	middleware::Next,
	response::{IntoResponse, Response},
};
// self
use crate::{
	_prelude::*, auth::RequestContext, interceptor::SessionInterceptor, validator::TokenValidator,
};

/// Authorization value injected ahead of [`require_bearer`], used when the request carries no
/// `Authorization` header.
#[derive(Clone, Debug)]
pub struct InjectedToken(pub String);

/// State of [`require_bearer`]: the validator and the entitlement a route requires.
#[derive(Clone, Debug)]
pub struct BearerGuard {
	validator: Arc<TokenValidator>,
	entitlement: Option<String>,
}
impl BearerGuard {
	/// Guard that only authenticates.
	pub fn new(validator: impl Into<Arc<TokenValidator>>) -> Self {
		Self { validator: validator.into(), entitlement: None }
	}

	/// Requires `entitlement` among the token's license items.
	pub fn with_entitlement(mut self, entitlement: impl Into<String>) -> Self {
		self.entitlement = Some(entitlement.into());

		self
	}
}

/// Validates the bearer token and stores [`RequestContext`] and
/// [`crate::auth::BearerClaims`] as request extensions. Rejected requests get a bare 403.
pub async fn require_bearer(
	State(guard): State<BearerGuard>,
	mut req: Request,
	next: Next,
) -> Response {
	let header = req.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok());
	let injected = req.extensions().get::<InjectedToken>().map(|token| token.0.as_str());
	let authorized =
		match guard.validator.authorize(header, injected, guard.entitlement.as_deref().as_slice()) {
			Ok(authorized) => authorized,
			Err(rejection) => return StatusCode::from_u16(rejection.status())
				.unwrap_or(StatusCode::FORBIDDEN)
				.into_response(),
		};
	let context = authorized.apply(RequestContext::from_headers(req.headers()));

	req.extensions_mut().insert(context);
	req.extensions_mut().insert(authorized.claims);

	next.run(req).await
}

/// Inserts the session interceptor's token as [`InjectedToken`].
pub async fn inject_session_token(
	State(interceptor): State<Arc<SessionInterceptor>>,
	mut req: Request,
	next: Next,
) -> Response {
	if let Some(value) = interceptor.authorization_value() {
		req.extensions_mut().insert(InjectedToken(value));
	}

	next.run(req).await
}
