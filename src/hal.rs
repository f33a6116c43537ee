//! Helpers for reading HAL/HATEOAS documents returned by the resource API.
//!
//! All lookups are lenient: a missing field, an unexpected type, or a body that is not JSON
//! yields an empty string rather than an error.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Removes the URI-template suffix of a HATEOAS link (`.../project{?projection}`).
pub fn strip_template_parameter(template_url: &str) -> &str {
	template_url.split('{').next().unwrap_or_default()
}

/// Returns the stripped `_links.<rel>.href` of a HAL document.
pub fn link_from_hal(body: &[u8], rel: &str) -> String {
	let rel = rel.replace('~', "~0").replace('/', "~1");

	string_at(body, &format!("/_links/{rel}/href"))
}

/// Returns the stripped self link of a HAL document.
pub fn self_link_from_hal(body: &[u8]) -> String {
	link_from_hal(body, "self")
}

/// Returns the stripped `urn` field of a HAL document.
pub fn urn_from_hal(body: &[u8]) -> String {
	string_at(body, "/urn")
}

/// Extracts the content hash from a download link (`...?contentHash=<hash>`).
pub fn hash_from_download_link(link: &str) -> &str {
	link.split('=').nth(1).unwrap_or_default()
}

/// Returns the last path segment of a tag URL; empty when the input is not an absolute URL.
pub fn guid_from_tag_url(tag_url: &str) -> String {
	Url::parse(tag_url)
		.ok()
		.and_then(|url| {
			url.path_segments()
				.and_then(|mut segments| segments.next_back().map(str::to_owned))
		})
		.unwrap_or_default()
}

/// Returns the numeric part of a URN such as `robotic-eyes:project:1747`.
pub fn number_from_urn(urn: &str) -> &str {
	urn.split(':').nth(2).unwrap_or_default()
}

fn string_at(body: &[u8], pointer: &str) -> String {
	serde_json::from_slice::<Value>(body)
		.ok()
		.and_then(|document| document.pointer(pointer).and_then(Value::as_str).map(str::to_owned))
		.map(|value| strip_template_parameter(&value).to_owned())
		.unwrap_or_default()
}

/// Error document returned by the resource API on failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteStatus {
	/// Human-readable message.
	pub message: String,
	/// Server-side timestamp of the failure.
	pub timestamp: String,
	/// Request path that failed.
	pub path: String,
	/// Machine-readable failure type (`OPTIMISTIC_LOCKING_FAILURE`).
	#[serde(rename = "type", skip_serializing_if = "String::is_empty")]
	pub kind: String,
	/// HTTP status reported in the document.
	pub status: u16,
	/// HTTP reason phrase.
	pub error: String,
}
impl RemoteStatus {
	/// Parses an error document; `None` when the body is not a JSON object.
	pub fn parse(body: &[u8]) -> Option<Self> {
		serde_json::from_slice(body).ok()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn template_parameters_are_stripped() {
		assert_eq!(
			strip_template_parameter(
				"https://rex.example.com/api/v2/rexReferences/1000/project{?projection}"
			),
			"https://rex.example.com/api/v2/rexReferences/1000/project"
		);
		assert_eq!(strip_template_parameter("plain"), "plain");
		assert_eq!(strip_template_parameter(""), "");
	}

	#[test]
	fn links_are_read_from_hal_documents() {
		let body = br#"{
			"urn": "robotic-eyes:project:1747",
			"_links": {
				"self": { "href": "https://api.example.com/projects/1747{?projection}" },
				"publicShare": { "href": "https://api.example.com/share/abc" }
			}
		}"#;

		assert_eq!(self_link_from_hal(body), "https://api.example.com/projects/1747");
		assert_eq!(link_from_hal(body, "publicShare"), "https://api.example.com/share/abc");
		assert_eq!(link_from_hal(body, "project"), "");
		assert_eq!(urn_from_hal(body), "robotic-eyes:project:1747");
		assert_eq!(number_from_urn(&urn_from_hal(body)), "1747");
		assert_eq!(self_link_from_hal(b"not json"), "");
	}

	#[test]
	fn link_relations_are_escaped_in_lookups() {
		let body = br#"{
			"_links": {
				"rex:files/latest": { "href": "https://api.example.com/files/latest" },
				"a~b": { "href": "https://api.example.com/tilde" },
				"rex:files": { "latest": { "href": "https://api.example.com/wrong" } }
			}
		}"#;

		assert_eq!(link_from_hal(body, "rex:files/latest"), "https://api.example.com/files/latest");
		assert_eq!(link_from_hal(body, "a~b"), "https://api.example.com/tilde");
	}

	#[test]
	fn download_link_hash_is_extracted() {
		assert_eq!(
			hash_from_download_link("https://host/projectFiles/1747/file?contentHash=2dd1aee5"),
			"2dd1aee5"
		);
		assert_eq!(hash_from_download_link("https://host/projectFiles/1747/file"), "");
	}

	#[test]
	fn tag_guid_is_last_segment() {
		assert_eq!(guid_from_tag_url("https://rex.codes/v1/7c5a1b2e"), "7c5a1b2e");
		assert_eq!(guid_from_tag_url("rex.codes/v1/7c5a1b2e"), "");
		assert_eq!(number_from_urn("robotic-eyes"), "");
	}

	#[test]
	fn remote_status_parses_leniently() {
		let status = RemoteStatus::parse(
			br#"{"message":"conflict","status":409,"error":"Conflict","type":"OPTIMISTIC_LOCKING_FAILURE","extra":1}"#,
		)
		.expect("Error document should parse.");

		assert_eq!(status.status, 409);
		assert_eq!(status.kind, "OPTIMISTIC_LOCKING_FAILURE");
		assert!(status.path.is_empty());
		assert!(RemoteStatus::parse(b"<html>").is_none());
	}
}
