// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the native agent.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`LOOM_CRASH_*`)
//! 2. Config file named by `LOOM_CRASH_CONFIG_FILE`
//! 3. Built-in defaults

pub mod error;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One partially-specified configuration layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NativeConfigLayer {
	pub breadcrumbs: Option<BreadcrumbsConfigLayer>,
	pub anr: Option<AnrConfigLayer>,
	pub release: Option<ReleaseConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

impl NativeConfigLayer {
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.breadcrumbs, other.breadcrumbs, BreadcrumbsConfigLayer::merge);
		merge_section(&mut self.anr, other.anr, AnrConfigLayer::merge);
		merge_section(&mut self.release, other.release, ReleaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	let Some(other) = other else {
		return;
	};
	match base {
		Some(existing) => merge(existing, other),
		None => *base = Some(other),
	}
}

/// Fully resolved agent configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeConfig {
	pub breadcrumbs: BreadcrumbsConfig,
	pub anr: AnrConfig,
	pub release: ReleaseConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<NativeConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource), Box::new(EnvSource)];
	if let Some(file) = TomlSource::from_env() {
		sources.push(Box::new(file));
	}
	load_from_sources(sources)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<NativeConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<NativeConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = NativeConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize a configuration layer into resolved config.
pub fn finalize(layer: NativeConfigLayer) -> Result<NativeConfig, ConfigError> {
	let config = NativeConfig {
		breadcrumbs: layer.breadcrumbs.unwrap_or_default().finalize(),
		anr: layer.anr.unwrap_or_default().finalize(),
		release: layer.release.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		max_breadcrumbs = config.breadcrumbs.max_breadcrumbs,
		anr_threshold_ms = config.anr.threshold_ms,
		anr_poll_interval_ms = config.anr.poll_interval_ms,
		release_stage_filter = config.release.enabled_release_stages.is_some(),
		"Native agent configuration loaded"
	);

	Ok(config)
}

/// Validate cross-field configuration rules.
pub fn validate_config(config: &NativeConfig) -> Result<(), ConfigError> {
	if config.breadcrumbs.max_breadcrumbs == 0 {
		return Err(ConfigError::validation("max_breadcrumbs must be at least 1"));
	}
	if config.anr.poll_interval_ms == 0 {
		return Err(ConfigError::validation("anr.poll_interval_ms must be at least 1"));
	}
	if config.anr.threshold_ms < config.anr.poll_interval_ms {
		return Err(ConfigError::validation(format!(
			"anr.threshold_ms ({}) must not be shorter than anr.poll_interval_ms ({})",
			config.anr.threshold_ms, config.anr.poll_interval_ms
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_finalize_defaults() {
		let config = finalize(NativeConfigLayer::default()).unwrap();
		assert_eq!(config, NativeConfig::default());
		assert_eq!(config.breadcrumbs.max_breadcrumbs, DEFAULT_MAX_BREADCRUMBS);
	}

	#[test]
	fn test_merge_prefers_later_layer() {
		let mut base = NativeConfigLayer {
			breadcrumbs: Some(BreadcrumbsConfigLayer {
				max_breadcrumbs: Some(10),
			}),
			anr: Some(AnrConfigLayer {
				threshold_ms: Some(4_000),
				poll_interval_ms: Some(50),
			}),
			..Default::default()
		};
		base.merge(NativeConfigLayer {
			anr: Some(AnrConfigLayer {
				threshold_ms: Some(8_000),
				poll_interval_ms: None,
			}),
			logging: Some(LoggingConfigLayer {
				level: Some("trace".to_string()),
			}),
			..Default::default()
		});

		let config = finalize(base).unwrap();
		assert_eq!(config.breadcrumbs.max_breadcrumbs, 10);
		assert_eq!(config.anr.threshold_ms, 8_000);
		assert_eq!(config.anr.poll_interval_ms, 50);
		assert_eq!(config.logging.level, "trace");
	}

	#[test]
	fn test_rejects_zero_capacity() {
		let layer = NativeConfigLayer {
			breadcrumbs: Some(BreadcrumbsConfigLayer {
				max_breadcrumbs: Some(0),
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_rejects_threshold_below_poll_interval() {
		let layer = NativeConfigLayer {
			anr: Some(AnrConfigLayer {
				threshold_ms: Some(10),
				poll_interval_ms: Some(100),
			}),
			..Default::default()
		};
		assert!(matches!(finalize(layer), Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_file_overrides_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("crash.toml");
		std::fs::write(&path, "[breadcrumbs]\nmax_breadcrumbs = 7\n").unwrap();

		let config =
			load_from_sources(vec![Box::new(TomlSource::new(&path)), Box::new(DefaultsSource)]).unwrap();
		assert_eq!(config.breadcrumbs.max_breadcrumbs, 7);
		assert_eq!(config.anr, AnrConfig::default());
	}
}
