//! Outbound header assembly and `Content-Disposition` parsing.

// crates.io
use oauth2::http::{
	HeaderMap, HeaderName, HeaderValue, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::{X_FORWARDED_FOR, X_FORWARDED_HOST, X_FORWARDED_PORT, X_FORWARDED_PREFIX, X_FORWARDED_PROTO},
	executor::{ForwardingMode, OutboundRequest},
	http::HttpRequest,
};

const X_REQUESTED_WITH: &str = "x-requested-with";

/// Builds the HTTP request for one attempt.
pub(crate) fn build_request(
	request: &OutboundRequest,
	external_base_path: &str,
) -> Result<HttpRequest, oauth2::http::Error> {
	let mut builder = Request::builder()
		.method(request.verb.method())
		.uri(request.url.as_str())
		.header(CONTENT_TYPE, request.content_type.as_str())
		.header(ACCEPT, request.accept.as_str())
		.header(X_REQUESTED_WITH, "XMLHttpRequest");
	let forwarding = &request.forwarding;
	let mut forwarded = vec![(X_FORWARDED_FOR, forwarding.for_host.as_str())];

	if matches!(request.forwarding_mode, ForwardingMode::Full) {
		forwarded.extend([
			(X_FORWARDED_HOST, forwarding.host.as_str()),
			(X_FORWARDED_PORT, forwarding.port.as_str()),
			(X_FORWARDED_PROTO, forwarding.proto.as_str()),
			(X_FORWARDED_PREFIX, external_base_path),
		]);
	}

	for (name, value) in forwarded {
		if !value.is_empty() {
			builder = builder.header(HeaderName::from_static(name), value);
		}
	}

	if let Some(token) = &request.token {
		let mut value = HeaderValue::try_from(token.bearer_header())?;

		value.set_sensitive(true);

		builder = builder.header(AUTHORIZATION, value);
	}

	builder.body(request.payload.clone().unwrap_or_default())
}

/// Extracts the `filename` parameter of a `Content-Disposition` header.
///
/// `filename*` (RFC 5987, UTF-8 only) takes precedence over `filename`. Quoted values may
/// contain `;` and backslash escapes.
pub(crate) fn file_name_from_headers(headers: &HeaderMap) -> Option<String> {
	let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
	let mut plain = None;
	let mut extended = None;

	for (name, value) in disposition_parameters(value) {
		if name.eq_ignore_ascii_case("filename*") {
			extended = decode_extended(&value);
		} else if name.eq_ignore_ascii_case("filename") {
			plain = Some(value);
		}
	}

	extended.or(plain).filter(|name| !name.is_empty())
}

/// Splits the parameters after the disposition type into `(name, value)` pairs, unquoting
/// quoted-string values. An unterminated quote runs to the end of the header.
fn disposition_parameters(header: &str) -> Vec<(String, String)> {
	let mut chars = header.chars().peekable();
	let mut parameters = Vec::new();

	// Disposition type.
	for c in chars.by_ref() {
		if c == ';' {
			break;
		}
	}

	while chars.peek().is_some() {
		let mut name = String::new();

		while let Some(c) = chars.next_if(|c| *c != '=' && *c != ';') {
			name.push(c);
		}

		if chars.next() != Some('=') {
			continue;
		}

		while chars.next_if(|c| c.is_whitespace()).is_some() {}

		let mut value = String::new();

		if chars.next_if_eq(&'"').is_some() {
			while let Some(c) = chars.next() {
				match c {
					'"' => break,
					'\\' => value.extend(chars.next()),
					c => value.push(c),
				}
			}

			for c in chars.by_ref() {
				if c == ';' {
					break;
				}
			}
		} else {
			for c in chars.by_ref() {
				if c == ';' {
					break;
				}

				value.push(c);
			}

			value.truncate(value.trim_end().len());
		}

		parameters.push((name.trim().to_owned(), value));
	}

	parameters
}

fn decode_extended(raw: &str) -> Option<String> {
	let mut parts = raw.splitn(3, '\'');
	let charset = parts.next()?;
	let _language = parts.next()?;
	let encoded = parts.next()?;

	if !charset.eq_ignore_ascii_case("utf-8") {
		return None;
	}

	let bytes = encoded.as_bytes();
	let mut decoded = Vec::with_capacity(bytes.len());
	let mut i = 0;

	while i < bytes.len() {
		if bytes[i] == b'%' && i + 2 < bytes.len() {
			let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok()?;

			decoded.push(u8::from_str_radix(hex, 16).ok()?);
			i += 3;
		} else {
			decoded.push(bytes[i]);
			i += 1;
		}
	}

	String::from_utf8(decoded).ok()
}
