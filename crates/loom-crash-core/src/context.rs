// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Context types for crash events (app, user, error).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CrashError;
use crate::text::Text;

/// Application state at report time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
	/// "arm64-v8a", "x86_64"
	pub binary_arch: Option<Text>,
	pub build_uuid: Option<Text>,
	/// Package name, e.g. "com.example.app"
	pub id: Option<Text>,
	/// "production", "staging", "development"
	pub release_stage: Option<Text>,
	/// "android", "unity", "react-native"
	#[serde(rename = "type")]
	pub app_type: Option<Text>,
	pub version: Option<Text>,
	pub version_code: Option<i32>,
	#[serde(default, with = "duration_secs")]
	pub duration: Option<Duration>,
	#[serde(default, with = "duration_secs")]
	pub duration_in_foreground: Option<Duration>,
	/// Unknown until the lifecycle collaborator reports a transition.
	pub in_foreground: Option<bool>,
}

impl AppInfo {
	pub fn set_binary_arch(&mut self, value: Option<&str>) {
		self.binary_arch = Text::from_opt(value);
	}

	pub fn set_build_uuid(&mut self, value: Option<&str>) {
		self.build_uuid = Text::from_opt(value);
	}

	pub fn set_id(&mut self, value: Option<&str>) {
		self.id = Text::from_opt(value);
	}

	pub fn set_release_stage(&mut self, value: Option<&str>) {
		self.release_stage = Text::from_opt(value);
	}

	pub fn set_app_type(&mut self, value: Option<&str>) {
		self.app_type = Text::from_opt(value);
	}

	pub fn set_version(&mut self, value: Option<&str>) {
		self.version = Text::from_opt(value);
	}

	/// `true` while the app is in the foreground; `false` before any transition was reported.
	pub fn is_in_foreground(&self) -> bool {
		self.in_foreground.unwrap_or(false)
	}
}

/// User context at report time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
	pub id: Option<Text>,
	pub email: Option<Text>,
	pub name: Option<Text>,
}

impl UserInfo {
	pub fn new(id: Option<&str>, email: Option<&str>, name: Option<&str>) -> Self {
		Self {
			id: Text::from_opt(id),
			email: Text::from_opt(email),
			name: Text::from_opt(name),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.id.is_none() && self.email.is_none() && self.name.is_none()
	}
}

/// The error an event describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
	/// "java.lang.OutOfMemoryError", "ANR", "SIGSEGV"
	pub error_class: Text,
	pub message: Option<Text>,
}

impl ErrorInfo {
	pub fn new(error_class: &str, message: Option<&str>) -> Result<Self, CrashError> {
		Ok(Self {
			error_class: Text::new(error_class).ok_or(CrashError::EmptyErrorClass)?,
			message: Text::from_opt(message),
		})
	}
}

/// Serializes `Option<Duration>` as whole seconds.
mod duration_secs {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
		match value {
			Some(duration) => serializer.serialize_some(&duration.as_secs()),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
		Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
	}
}
