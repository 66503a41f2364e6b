// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Breadcrumb types for crash events (events leading up to a report).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CrashError;
use crate::text::Text;

/// A breadcrumb representing a significant event that happened before a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breadcrumb {
	pub timestamp: DateTime<Utc>,
	pub message: Text,
	#[serde(rename = "type")]
	pub breadcrumb_type: BreadcrumbType,
	#[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
	pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Breadcrumb {
	/// Creates a breadcrumb stamped with the current time.
	pub fn new(message: &str, breadcrumb_type: BreadcrumbType) -> Result<Self, CrashError> {
		let message = Text::new(message).ok_or(CrashError::EmptyBreadcrumbMessage)?;
		Ok(Self {
			timestamp: Utc::now(),
			message,
			breadcrumb_type,
			metadata: serde_json::Map::new(),
		})
	}

	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.metadata.insert(key.into(), value.into());
		self
	}
}

/// Kind of a breadcrumb.
///
/// The numeric codes match the order of `bsg_breadcrumb_t` in the native header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadcrumbType {
	Error,
	Log,
	Manual,
	Navigation,
	Process,
	Request,
	State,
	User,
}

impl BreadcrumbType {
	pub const ALL: [BreadcrumbType; 8] = [
		Self::Error,
		Self::Log,
		Self::Manual,
		Self::Navigation,
		Self::Process,
		Self::Request,
		Self::State,
		Self::User,
	];

	pub fn code(self) -> i32 {
		self as i32
	}
}

impl TryFrom<i32> for BreadcrumbType {
	type Error = CrashError;

	fn try_from(code: i32) -> Result<Self, CrashError> {
		usize::try_from(code)
			.ok()
			.and_then(|idx| Self::ALL.get(idx).copied())
			.ok_or(CrashError::UnknownBreadcrumbTypeCode(code))
	}
}

impl fmt::Display for BreadcrumbType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error => write!(f, "error"),
			Self::Log => write!(f, "log"),
			Self::Manual => write!(f, "manual"),
			Self::Navigation => write!(f, "navigation"),
			Self::Process => write!(f, "process"),
			Self::Request => write!(f, "request"),
			Self::State => write!(f, "state"),
			Self::User => write!(f, "user"),
		}
	}
}

impl FromStr for BreadcrumbType {
	type Err = CrashError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"error" => Ok(Self::Error),
			"log" => Ok(Self::Log),
			"manual" => Ok(Self::Manual),
			"navigation" => Ok(Self::Navigation),
			"process" => Ok(Self::Process),
			"request" => Ok(Self::Request),
			"state" => Ok(Self::State),
			"user" => Ok(Self::User),
			_ => Err(CrashError::InvalidBreadcrumbType(s.to_string())),
		}
	}
}
