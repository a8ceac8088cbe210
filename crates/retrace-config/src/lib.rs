// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for retrace.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`RETRACE_*`)
//!
//! # Usage
//!
//! ```ignore
//! use retrace_config::load_config;
//!
//! let config = load_config()?;
//! println!("artifacts live in {}", config.store.data_dir.display());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::RetraceConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct RetraceConfig {
	pub store: StoreConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`RETRACE_*`)
/// 2. Config file (`/etc/retrace/retrace.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<RetraceConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration with a custom config file path, which must exist.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<RetraceConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::required(config_path)),
		Box::new(EnvSource),
	])
}

/// Merge sources in precedence order and finalize.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<RetraceConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = RetraceConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: RetraceConfigLayer) -> Result<RetraceConfig, ConfigError> {
	let store = layer.store.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	validate_config(&store)?;

	info!(
		data_dir = %store.data_dir.display(),
		retention_days = store.retention_days,
		sweep_interval_secs = store.sweep_interval_secs,
		accumulation = %store.accumulation,
		"configuration loaded"
	);

	Ok(RetraceConfig { store, logging })
}

fn validate_config(store: &StoreConfig) -> Result<(), ConfigError> {
	if store.retention_days == 0 {
		return Err(ConfigError::Validation(
			"retention_days must be at least 1; a zero retention would sweep every artifact"
				.to_string(),
		));
	}
	if store.sweep_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"sweep_interval_secs must be greater than zero".to_string(),
		));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FixedSource(Precedence, RetraceConfigLayer);

	impl ConfigSource for FixedSource {
		fn name(&self) -> &'static str {
			"fixed"
		}

		fn precedence(&self) -> Precedence {
			self.0
		}

		fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
			Ok(self.1.clone())
		}
	}

	fn retention_layer(days: u32) -> RetraceConfigLayer {
		RetraceConfigLayer {
			store: Some(StoreConfigLayer {
				retention_days: Some(days),
				..Default::default()
			}),
			logging: None,
		}
	}

	#[test]
	fn test_defaults_only() {
		let config = load_from_sources(vec![Box::new(DefaultsSource)]).unwrap();
		assert_eq!(config.store.retention_days, 30);
		assert_eq!(config.logging.level, "info");
	}

	#[test]
	fn test_higher_precedence_wins_regardless_of_order() {
		let config = load_from_sources(vec![
			Box::new(FixedSource(Precedence::Environment, retention_layer(3))),
			Box::new(FixedSource(Precedence::ConfigFile, retention_layer(60))),
			Box::new(DefaultsSource),
		])
		.unwrap();
		assert_eq!(config.store.retention_days, 3);
	}

	#[test]
	fn test_zero_retention_rejected() {
		let result = load_from_sources(vec![Box::new(FixedSource(
			Precedence::ConfigFile,
			retention_layer(0),
		))]);
		assert!(matches!(result, Err(ConfigError::Validation(_))));
	}

	#[test]
	fn test_explicit_config_file_must_exist() {
		let dir = tempfile::tempdir().unwrap();
		let result = load_config_with_file(dir.path().join("missing.toml"));
		assert!(matches!(result, Err(ConfigError::FileRead { .. })));
	}

	#[test]
	fn test_load_with_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("retrace.toml");
		std::fs::write(&path, "[store]\nsweep_interval_secs = 3600\n").unwrap();

		let config = load_from_sources(vec![
			Box::new(DefaultsSource),
			Box::new(TomlSource::new(&path)),
		])
		.unwrap();
		assert_eq!(config.store.sweep_interval_secs, 3600);
		assert_eq!(config.store.retention_days, 30);
	}
}
