// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Free-form diagnostic data attached to events, grouped into named sections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Section name -> key -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
	sections: BTreeMap<String, Map<String, Value>>,
}

impl Metadata {
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets `section.key`. A `null` value removes the key instead.
	pub fn add(&mut self, section: &str, key: &str, value: impl Into<Value>) {
		let value = value.into();
		if value.is_null() {
			self.clear_key(section, key);
			return;
		}
		self.sections
			.entry(section.to_string())
			.or_default()
			.insert(key.to_string(), value);
	}

	/// Merges every entry of `values` into `section`, with the same `null` rule as [`add`](Self::add).
	pub fn add_section(&mut self, section: &str, values: Map<String, Value>) {
		for (key, value) in values {
			self.add(section, &key, value);
		}
	}

	pub fn clear_section(&mut self, section: &str) {
		self.sections.remove(section);
	}

	/// Removes one key; drops the section once it is empty.
	pub fn clear_key(&mut self, section: &str, key: &str) {
		if let Some(values) = self.sections.get_mut(section) {
			values.remove(key);
			if values.is_empty() {
				self.sections.remove(section);
			}
		}
	}

	pub fn section(&self, section: &str) -> Option<&Map<String, Value>> {
		self.sections.get(section)
	}

	pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
		self.sections.get(section).and_then(|values| values.get(key))
	}

	pub fn is_empty(&self) -> bool {
		self.sections.is_empty()
	}

	pub fn sections(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
		self.sections.iter().map(|(name, values)| (name.as_str(), values))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_add_and_get() {
		let mut metadata = Metadata::new();
		metadata.add("device", "rooted", false);
		metadata.add("device", "locale", "en_AU");

		assert_eq!(metadata.get("device", "rooted"), Some(&json!(false)));
		assert_eq!(metadata.get("device", "locale"), Some(&json!("en_AU")));
		assert!(metadata.get("device", "missing").is_none());
		assert!(metadata.get("missing", "rooted").is_none());
	}

	#[test]
	fn test_null_clears_key() {
		let mut metadata = Metadata::new();
		metadata.add("app", "flavor", "beta");
		metadata.add("app", "flavor", Value::Null);

		assert!(metadata.get("app", "flavor").is_none());
		assert!(metadata.section("app").is_none());
		assert!(metadata.is_empty());
	}

	#[test]
	fn test_clear_section_keeps_others() {
		let mut metadata = Metadata::new();
		metadata.add("app", "flavor", "beta");
		metadata.add("device", "rooted", true);
		metadata.clear_section("app");

		assert!(metadata.section("app").is_none());
		assert_eq!(metadata.sections().count(), 1);
	}

	#[test]
	fn test_add_section_merges() {
		let mut metadata = Metadata::new();
		metadata.add("account", "tier", "free");

		let Value::Object(values) = json!({"tier": "pro", "seats": 3, "trial": null}) else {
			unreachable!()
		};
		metadata.add_section("account", values);

		assert_eq!(metadata.get("account", "tier"), Some(&json!("pro")));
		assert_eq!(metadata.get("account", "seats"), Some(&json!(3)));
		assert!(metadata.get("account", "trial").is_none());
	}

	#[test]
	fn test_serializes_as_nested_object() {
		let mut metadata = Metadata::new();
		metadata.add("app", "flavor", "beta");
		assert_eq!(
			serde_json::to_value(&metadata).unwrap(),
			json!({"app": {"flavor": "beta"}})
		);
	}
}
