// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The event record: one error, crash, or ANR occurrence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::breadcrumb::Breadcrumb;
use crate::context::{AppInfo, ErrorInfo, UserInfo};
use crate::error::CrashError;
use crate::metadata::Metadata;
use crate::text::Text;

/// Severity of an event.
///
/// The numeric codes match `bsg_severity_t` in the native header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	#[default]
	Error,
	Warning,
	Info,
}

impl Severity {
	pub fn code(self) -> i32 {
		self as i32
	}
}

impl TryFrom<i32> for Severity {
	type Error = CrashError;

	fn try_from(code: i32) -> Result<Self, CrashError> {
		match code {
			0 => Ok(Severity::Error),
			1 => Ok(Severity::Warning),
			2 => Ok(Severity::Info),
			_ => Err(CrashError::UnknownSeverityCode(code)),
		}
	}
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error => write!(f, "error"),
			Self::Warning => write!(f, "warning"),
			Self::Info => write!(f, "info"),
		}
	}
}

impl FromStr for Severity {
	type Err = CrashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"error" => Ok(Self::Error),
			"warning" => Ok(Self::Warning),
			"info" => Ok(Self::Info),
			_ => Err(CrashError::InvalidSeverity(s.to_string())),
		}
	}
}

/// A captured error/crash/ANR report.
///
/// A record is either the long-lived template's snapshot handed to the
/// reporting pipeline, or one built directly by a caller. Snapshots are owned
/// by exactly one pipeline run; mutating one never affects the template it was
/// cloned from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
	pub timestamp: DateTime<Utc>,
	pub context: Option<Text>,
	pub app: AppInfo,
	pub user: UserInfo,
	pub error: Option<ErrorInfo>,
	pub severity: Severity,
	/// `true` for reports the host did not raise itself (crashes, ANRs).
	pub unhandled: bool,
	pub breadcrumbs: Vec<Breadcrumb>,
	#[serde(default, skip_serializing_if = "Metadata::is_empty")]
	pub metadata: Metadata,
}

impl Default for EventRecord {
	fn default() -> Self {
		Self {
			timestamp: Utc::now(),
			context: None,
			app: AppInfo::default(),
			user: UserInfo::default(),
			error: None,
			severity: Severity::default(),
			unhandled: false,
			breadcrumbs: Vec::new(),
			metadata: Metadata::default(),
		}
	}
}

impl EventRecord {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn context(&self) -> Option<&str> {
		self.context.as_deref()
	}

	pub fn set_context(&mut self, value: Option<&str>) {
		self.context = Text::from_opt(value);
	}

	pub fn app(&self) -> &AppInfo {
		&self.app
	}

	pub fn app_mut(&mut self) -> &mut AppInfo {
		&mut self.app
	}

	pub fn set_user(&mut self, id: Option<&str>, email: Option<&str>, name: Option<&str>) {
		self.user = UserInfo::new(id, email, name);
	}

	pub fn set_error(&mut self, error_class: &str, message: Option<&str>) -> Result<(), CrashError> {
		self.error = Some(ErrorInfo::new(error_class, message)?);
		Ok(())
	}

	pub fn error_class(&self) -> Option<&str> {
		self.error.as_ref().map(|e| e.error_class.as_str())
	}

	pub fn error_message(&self) -> Option<&str> {
		self.error.as_ref().and_then(|e| e.message.as_deref())
	}

	pub fn to_json(&self) -> Result<String, CrashError> {
		Ok(serde_json::to_string(self)?)
	}
}
