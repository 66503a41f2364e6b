// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use super::error::ConfigError;
use super::sections::{AnrConfigLayer, BreadcrumbsConfigLayer, LoggingConfigLayer, ReleaseConfigLayer};
use super::NativeConfigLayer;

/// Environment variable naming the TOML config file.
pub const CONFIG_FILE_ENV: &str = "LOOM_CRASH_CONFIG_FILE";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<NativeConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<NativeConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(NativeConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// The file named by `LOOM_CRASH_CONFIG_FILE`, if set.
	pub fn from_env() -> Option<Self> {
		env_var(CONFIG_FILE_ENV).map(Self::new)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<NativeConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(NativeConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: NativeConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: LOOM_CRASH_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<NativeConfigLayer, ConfigError> {
		debug!("loading environment variables");
		load_from_lookup(env_var)
	}
}

/// Builds a layer from any variable lookup.
pub(crate) fn load_from_lookup(
	lookup: impl Fn(&str) -> Option<String>,
) -> Result<NativeConfigLayer, ConfigError> {
	let get = |name: &str| lookup(name).filter(|s| !s.is_empty());

	Ok(NativeConfigLayer {
		breadcrumbs: Some(BreadcrumbsConfigLayer {
			max_breadcrumbs: parse_number(&get, "LOOM_CRASH_MAX_BREADCRUMBS")?,
		}),
		anr: Some(AnrConfigLayer {
			threshold_ms: parse_number(&get, "LOOM_CRASH_ANR_THRESHOLD_MS")?,
			poll_interval_ms: parse_number(&get, "LOOM_CRASH_ANR_POLL_INTERVAL_MS")?,
		}),
		release: Some(ReleaseConfigLayer {
			enabled_release_stages: get("LOOM_CRASH_ENABLED_RELEASE_STAGES").map(|v| split_list(&v)),
			discard_classes: get("LOOM_CRASH_DISCARD_CLASSES").map(|v| split_list(&v)),
		}),
		logging: Some(LoggingConfigLayer {
			level: get("LOOM_CRASH_LOG_LEVEL"),
		}),
	})
}

fn split_list(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(str::to_string)
		.collect()
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parse_number<T: std::str::FromStr>(
	get: &impl Fn(&str) -> Option<String>,
	name: &str,
) -> Result<Option<T>, ConfigError> {
	match get(name) {
		Some(v) => v
			.trim()
			.parse()
			.map(Some)
			.map_err(|_| ConfigError::invalid_value(name, format!("invalid number '{v}'"))),
		None => Ok(None),
	}
}
