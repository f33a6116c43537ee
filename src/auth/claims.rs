//! Custom claims carried by bearer tokens of the identity provider.

// self
use crate::_prelude::*;

/// Claims extracted from a verified bearer token.
///
/// Every field is optional and unknown fields are ignored, so tokens issued for other
/// audiences still decode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BearerClaims {
	/// Identifier of the authenticated user.
	pub user_id: Option<String>,
	/// License and quota information.
	pub complex_authorities: ComplexAuthorities,
	/// Expiry as seconds since the Unix epoch.
	pub exp: Option<i64>,
	/// Token issuer.
	pub iss: Option<String>,
	/// Token subject.
	pub sub: Option<String>,
}
impl BearerClaims {
	/// Returns `true` if any license item carries the provided key.
	pub fn has_license(&self, key: &str) -> bool {
		self.complex_authorities.license_items.iter().any(|item| item.key == key)
	}

	/// Looks up a license item by key.
	pub fn license(&self, key: &str) -> Option<&LicenseItem> {
		self.complex_authorities.license_items.iter().find(|item| item.key == key)
	}

	/// Storage quota granted to the user, if present.
	pub fn max_storage_value(&self) -> Option<i64> {
		self.complex_authorities.max_storage.value
	}
}

/// Authority block of [`BearerClaims`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexAuthorities {
	/// Entitlements granted to the user.
	pub license_items: Vec<LicenseItem>,
	/// Storage quota.
	pub max_storage: MaxStorage,
}

/// Single entitlement entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseItem {
	/// Entitlement name.
	pub key: String,
	/// Boolean payload, when the entitlement is a flag.
	#[serde(rename = "valueBoolean", skip_serializing_if = "Option::is_none")]
	pub value_boolean: Option<bool>,
	/// Numeric payload, when the entitlement is a quantity.
	#[serde(rename = "valueLong", skip_serializing_if = "Option::is_none")]
	pub value_long: Option<i64>,
}

/// Storage quota entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxStorage {
	/// Quota value.
	pub value: Option<i64>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn claims_decode_leniently() {
		let claims: BearerClaims = serde_json::from_value(serde_json::json!({
			"user_id": "u1",
			"aud": ["ignored"],
			"complex_authorities": {
				"license_items": [
					{ "key": "proj-x", "valueBoolean": true },
					{ "key": "seats", "valueLong": 5 },
				],
				"max_storage": { "value": 1024 },
			},
		}))
		.expect("Claims with unknown fields should decode.");

		assert_eq!(claims.user_id.as_deref(), Some("u1"));
		assert!(claims.has_license("proj-x"));
		assert!(!claims.has_license("proj-y"));
		assert_eq!(claims.license("seats").and_then(|item| item.value_long), Some(5));
		assert_eq!(claims.max_storage_value(), Some(1024));
	}

	#[test]
	fn empty_claims_decode() {
		let claims: BearerClaims =
			serde_json::from_str("{}").expect("Empty claims object should decode.");

		assert_eq!(claims, BearerClaims::default());
		assert!(!claims.has_license("anything"));
	}
}
