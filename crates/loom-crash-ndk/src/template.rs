// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The process-wide event template.
//!
//! Every field is synchronized on its own: strings and metadata sit behind
//! individual `RwLock`s, numeric and boolean fields are atomics. Writers to
//! different fields never contend, and a snapshot never blocks a writer for
//! longer than one field copy.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::time::Duration;

use chrono::Utc;
use loom_crash_core::{AppInfo, EventRecord, Metadata, Text, UserInfo};
use parking_lot::RwLock;
use serde_json::Value;

use crate::breadcrumbs::BreadcrumbLog;

const VERSION_CODE_UNSET: i64 = i64::MIN;
const DURATION_UNSET: i64 = -1;
const FOREGROUND_UNSET: u8 = 0;
const FOREGROUND_NO: u8 = 1;
const FOREGROUND_YES: u8 = 2;

macro_rules! text_accessors {
	($($field:ident, $setter:ident;)*) => {
		$(
			pub fn $field(&self) -> Option<Text> {
				self.$field.read().clone()
			}

			pub fn $setter(&self, value: Option<&str>) {
				let value = Text::from_opt(value);
				*self.$field.write() = value;
			}
		)*
	};
}

/// Long-lived "current known state" cloned into every report.
pub struct EventTemplate {
	context: RwLock<Option<Text>>,
	user_id: RwLock<Option<Text>>,
	user_email: RwLock<Option<Text>>,
	user_name: RwLock<Option<Text>>,
	binary_arch: RwLock<Option<Text>>,
	build_uuid: RwLock<Option<Text>>,
	app_id: RwLock<Option<Text>>,
	release_stage: RwLock<Option<Text>>,
	app_type: RwLock<Option<Text>>,
	version: RwLock<Option<Text>>,
	version_code: AtomicI64,
	duration_secs: AtomicI64,
	duration_in_foreground_secs: AtomicI64,
	in_foreground: AtomicU8,
	metadata: RwLock<Metadata>,
	breadcrumbs: BreadcrumbLog,
}

impl EventTemplate {
	pub fn new(max_breadcrumbs: usize) -> Self {
		Self {
			context: RwLock::new(None),
			user_id: RwLock::new(None),
			user_email: RwLock::new(None),
			user_name: RwLock::new(None),
			binary_arch: RwLock::new(None),
			build_uuid: RwLock::new(None),
			app_id: RwLock::new(None),
			release_stage: RwLock::new(None),
			app_type: RwLock::new(None),
			version: RwLock::new(None),
			version_code: AtomicI64::new(VERSION_CODE_UNSET),
			duration_secs: AtomicI64::new(DURATION_UNSET),
			duration_in_foreground_secs: AtomicI64::new(DURATION_UNSET),
			in_foreground: AtomicU8::new(FOREGROUND_UNSET),
			metadata: RwLock::new(Metadata::new()),
			breadcrumbs: BreadcrumbLog::new(max_breadcrumbs),
		}
	}

	text_accessors! {
		context, set_context;
		user_id, set_user_id;
		user_email, set_user_email;
		user_name, set_user_name;
		binary_arch, set_binary_arch;
		build_uuid, set_build_uuid;
		app_id, set_app_id;
		release_stage, set_release_stage;
		app_type, set_app_type;
		version, set_version;
	}

	/// Sets all three user fields. Each field is written on its own.
	pub fn set_user(&self, id: Option<&str>, email: Option<&str>, name: Option<&str>) {
		self.set_user_id(id);
		self.set_user_email(email);
		self.set_user_name(name);
	}

	pub fn user(&self) -> UserInfo {
		UserInfo {
			id: self.user_id(),
			email: self.user_email(),
			name: self.user_name(),
		}
	}

	pub fn version_code(&self) -> Option<i32> {
		match self.version_code.load(Ordering::Acquire) {
			VERSION_CODE_UNSET => None,
			code => i32::try_from(code).ok(),
		}
	}

	pub fn set_version_code(&self, value: Option<i32>) {
		let raw = value.map_or(VERSION_CODE_UNSET, i64::from);
		self.version_code.store(raw, Ordering::Release);
	}

	pub fn duration(&self) -> Option<Duration> {
		load_duration(&self.duration_secs)
	}

	pub fn set_duration(&self, value: Option<Duration>) {
		store_duration(&self.duration_secs, value);
	}

	pub fn duration_in_foreground(&self) -> Option<Duration> {
		load_duration(&self.duration_in_foreground_secs)
	}

	pub fn set_duration_in_foreground(&self, value: Option<Duration>) {
		store_duration(&self.duration_in_foreground_secs, value);
	}

	pub fn in_foreground(&self) -> Option<bool> {
		match self.in_foreground.load(Ordering::Acquire) {
			FOREGROUND_YES => Some(true),
			FOREGROUND_NO => Some(false),
			_ => None,
		}
	}

	pub fn set_in_foreground(&self, value: Option<bool>) {
		let raw = match value {
			Some(true) => FOREGROUND_YES,
			Some(false) => FOREGROUND_NO,
			None => FOREGROUND_UNSET,
		};
		self.in_foreground.store(raw, Ordering::Release);
	}

	pub fn app(&self) -> AppInfo {
		AppInfo {
			binary_arch: self.binary_arch(),
			build_uuid: self.build_uuid(),
			id: self.app_id(),
			release_stage: self.release_stage(),
			app_type: self.app_type(),
			version: self.version(),
			version_code: self.version_code(),
			duration: self.duration(),
			duration_in_foreground: self.duration_in_foreground(),
			in_foreground: self.in_foreground(),
		}
	}

	pub fn add_metadata(&self, section: &str, key: &str, value: impl Into<Value>) {
		let value = value.into();
		self.metadata.write().add(section, key, value);
	}

	pub fn clear_metadata_section(&self, section: &str) {
		self.metadata.write().clear_section(section);
	}

	pub fn clear_metadata(&self, section: &str, key: &str) {
		self.metadata.write().clear_key(section, key);
	}

	pub fn metadata_value(&self, section: &str, key: &str) -> Option<Value> {
		self.metadata.read().get(section, key).cloned()
	}

	pub fn breadcrumbs(&self) -> &BreadcrumbLog {
		&self.breadcrumbs
	}

	/// Clones the current state into a new record owned by the caller.
	///
	/// Fields are read one at a time; a write racing with the snapshot lands
	/// either entirely in it or not at all, field by field.
	pub fn snapshot(&self) -> EventRecord {
		EventRecord {
			timestamp: Utc::now(),
			context: self.context(),
			app: self.app(),
			user: self.user(),
			error: None,
			severity: Default::default(),
			unhandled: false,
			breadcrumbs: self.breadcrumbs.snapshot(),
			metadata: self.metadata.read().clone(),
		}
	}
}

fn load_duration(slot: &AtomicI64) -> Option<Duration> {
	let secs = slot.load(Ordering::Acquire);
	u64::try_from(secs).ok().map(Duration::from_secs)
}

fn store_duration(slot: &AtomicI64, value: Option<Duration>) {
	let raw = value.map_or(DURATION_UNSET, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX));
	slot.store(raw, Ordering::Release);
}

#[cfg(test)]
mod tests {
	use super::*;
	use loom_crash_core::BreadcrumbType;
	use proptest::prelude::*;
	use std::sync::Arc;
	use std::thread;

	#[test]
	fn test_new_template_is_unset() {
		let template = EventTemplate::new(10);
		let snapshot = template.snapshot();
		assert!(snapshot.context.is_none());
		assert_eq!(snapshot.app, AppInfo::default());
		assert!(snapshot.user.is_empty());
		assert!(snapshot.breadcrumbs.is_empty());
		assert!(snapshot.metadata.is_empty());
	}

	#[test]
	fn test_numeric_fields_distinguish_unset_from_zero() {
		let template = EventTemplate::new(10);
		assert_eq!(template.version_code(), None);
		template.set_version_code(Some(0));
		assert_eq!(template.version_code(), Some(0));
		template.set_version_code(None);
		assert_eq!(template.version_code(), None);

		template.set_duration(Some(Duration::ZERO));
		assert_eq!(template.duration(), Some(Duration::ZERO));
		assert_eq!(template.duration_in_foreground(), None);

		assert_eq!(template.in_foreground(), None);
		template.set_in_foreground(Some(false));
		assert_eq!(template.in_foreground(), Some(false));
	}

	#[test]
	fn test_version_code_extremes() {
		let template = EventTemplate::new(1);
		template.set_version_code(Some(i32::MIN));
		assert_eq!(template.version_code(), Some(i32::MIN));
		template.set_version_code(Some(i32::MAX));
		assert_eq!(template.version_code(), Some(i32::MAX));
	}

	#[test]
	fn test_snapshot_isolation() {
		let template = EventTemplate::new(10);
		template.set_version_code(Some(42));
		template.set_context(Some("MainActivity"));
		template.breadcrumbs().leave("launched", BreadcrumbType::State);

		let snapshot = template.snapshot();

		template.set_version_code(Some(43));
		template.set_context(Some("SettingsActivity"));
		template.breadcrumbs().leave("navigated", BreadcrumbType::Navigation);
		template.add_metadata("app", "flavor", "beta");

		assert_eq!(snapshot.app.version_code, Some(42));
		assert_eq!(snapshot.context(), Some("MainActivity"));
		assert_eq!(snapshot.breadcrumbs.len(), 1);
		assert!(snapshot.metadata.is_empty());
	}

	#[test]
	fn test_set_user_and_metadata() {
		let template = EventTemplate::new(10);
		template.set_user(Some("u-1"), Some("jo@example.com"), None);
		template.add_metadata("account", "tier", "pro");

		let user = template.user();
		assert_eq!(user.id.as_deref(), Some("u-1"));
		assert_eq!(user.email.as_deref(), Some("jo@example.com"));
		assert!(user.name.is_none());
		assert_eq!(template.metadata_value("account", "tier"), Some(Value::from("pro")));

		template.clear_metadata("account", "tier");
		assert!(template.metadata_value("account", "tier").is_none());
	}

	#[test]
	fn test_concurrent_writers_same_field() {
		let template = Arc::new(EventTemplate::new(1));
		let candidates: Vec<String> = (0..8).map(|i| format!("screen-{i}")).collect();

		let handles: Vec<_> = candidates
			.iter()
			.cloned()
			.map(|value| {
				let template = Arc::clone(&template);
				thread::spawn(move || {
					for _ in 0..500 {
						template.set_context(Some(&value));
						let seen = template.context().unwrap();
						assert!(seen.starts_with("screen-"));
					}
				})
			})
			.collect();
		for handle in handles {
			handle.join().unwrap();
		}

		let last = template.context().unwrap();
		assert!(candidates.iter().any(|c| last == c.as_str()));
	}

	#[test]
	fn test_concurrent_writers_different_fields() {
		let template = Arc::new(EventTemplate::new(1));
		let writer = {
			let template = Arc::clone(&template);
			thread::spawn(move || {
				for code in 0..1_000 {
					template.set_version_code(Some(code));
				}
			})
		};
		for _ in 0..1_000 {
			template.set_release_stage(Some("production"));
			let _ = template.snapshot();
		}
		writer.join().unwrap();

		assert_eq!(template.version_code(), Some(999));
		assert_eq!(template.release_stage().as_deref(), Some("production"));
	}

	proptest! {
		#[test]
		fn last_write_wins(codes in proptest::collection::vec(any::<i32>(), 1..32)) {
			let template = EventTemplate::new(1);
			for code in &codes {
				template.set_version_code(Some(*code));
			}
			prop_assert_eq!(template.version_code(), codes.last().copied());
		}

		#[test]
		fn duration_last_write_wins(secs in proptest::collection::vec(0u64..1_000_000, 1..16)) {
			let template = EventTemplate::new(1);
			for s in &secs {
				template.set_duration_in_foreground(Some(Duration::from_secs(*s)));
			}
			prop_assert_eq!(
				template.duration_in_foreground(),
				secs.last().map(|s| Duration::from_secs(*s))
			);
		}
	}
}
