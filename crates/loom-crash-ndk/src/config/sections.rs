// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections: breadcrumbs, ANR detection, release stages, logging.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default breadcrumb log capacity.
pub const DEFAULT_MAX_BREADCRUMBS: usize = 100;
/// Default time the liveness token may stay unchanged before an ANR is reported.
pub const DEFAULT_ANR_THRESHOLD_MS: u64 = 5_000;
/// Default interval between two reads of the liveness token.
pub const DEFAULT_ANR_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BreadcrumbsConfigLayer {
	pub max_breadcrumbs: Option<usize>,
}

impl BreadcrumbsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.max_breadcrumbs.is_some() {
			self.max_breadcrumbs = other.max_breadcrumbs;
		}
	}

	pub fn finalize(self) -> BreadcrumbsConfig {
		BreadcrumbsConfig {
			max_breadcrumbs: self.max_breadcrumbs.unwrap_or(DEFAULT_MAX_BREADCRUMBS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BreadcrumbsConfig {
	pub max_breadcrumbs: usize,
}

impl Default for BreadcrumbsConfig {
	fn default() -> Self {
		BreadcrumbsConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnrConfigLayer {
	pub threshold_ms: Option<u64>,
	pub poll_interval_ms: Option<u64>,
}

impl AnrConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.threshold_ms.is_some() {
			self.threshold_ms = other.threshold_ms;
		}
		if other.poll_interval_ms.is_some() {
			self.poll_interval_ms = other.poll_interval_ms;
		}
	}

	pub fn finalize(self) -> AnrConfig {
		AnrConfig {
			threshold_ms: self.threshold_ms.unwrap_or(DEFAULT_ANR_THRESHOLD_MS),
			poll_interval_ms: self.poll_interval_ms.unwrap_or(DEFAULT_ANR_POLL_INTERVAL_MS),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnrConfig {
	pub threshold_ms: u64,
	pub poll_interval_ms: u64,
}

impl AnrConfig {
	pub fn threshold(&self) -> Duration {
		Duration::from_millis(self.threshold_ms)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}

impl Default for AnrConfig {
	fn default() -> Self {
		AnrConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseConfigLayer {
	pub enabled_release_stages: Option<Vec<String>>,
	pub discard_classes: Option<Vec<String>>,
}

impl ReleaseConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled_release_stages.is_some() {
			self.enabled_release_stages = other.enabled_release_stages;
		}
		if other.discard_classes.is_some() {
			self.discard_classes = other.discard_classes;
		}
	}

	pub fn finalize(self) -> ReleaseConfig {
		ReleaseConfig {
			enabled_release_stages: self.enabled_release_stages,
			discard_classes: self.discard_classes.unwrap_or_default(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseConfig {
	/// `None` reports from every release stage.
	pub enabled_release_stages: Option<Vec<String>>,
	/// Error classes that are never reported. Matched exactly.
	#[serde(default)]
	pub discard_classes: Vec<String>,
}

impl ReleaseConfig {
	/// Whether an event from `release_stage` may be delivered.
	///
	/// Events without a release stage are always allowed.
	pub fn should_notify(&self, release_stage: Option<&str>) -> bool {
		match (&self.enabled_release_stages, release_stage) {
			(Some(stages), Some(stage)) => stages.iter().any(|s| s == stage),
			_ => true,
		}
	}

	pub fn should_discard(&self, error_class: Option<&str>) -> bool {
		error_class.is_some_and(|class| self.discard_classes.iter().any(|c| c == class))
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(|| "info".to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
	pub level: String,
}

impl Default for LoggingConfig {
	fn default() -> Self {
		LoggingConfigLayer::default().finalize()
	}
}
