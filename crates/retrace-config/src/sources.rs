// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::io::ErrorKind;
use std::path::PathBuf;

use retrace_symbolicate::AccumulationMode;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::RetraceConfigLayer;
use crate::sections::{LoggingConfigLayer, StoreConfigLayer};

const SYSTEM_CONFIG_PATH: &str = "/etc/retrace/retrace.toml";

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
	fn load(&self) -> Result<RetraceConfigLayer, ConfigError>;
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

	fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(RetraceConfigLayer::default())
	}
}

/// TOML file configuration source.
///
/// The system-wide file is optional. A file named explicitly (for example
/// with `--config`) must exist.
pub struct TomlSource {
	path: PathBuf,
	required: bool,
}

impl TomlSource {
	/// An optional file: a missing file yields an empty layer.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: false,
		}
	}

	/// A file that must exist.
	pub fn required(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			required: true,
		}
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
		let content = match std::fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(e) if e.kind() == ErrorKind::NotFound && !self.required => {
				debug!(path = %self.path.display(), "config file not found, skipping");
				return Ok(RetraceConfigLayer::default());
			}
			Err(e) => {
				return Err(ConfigError::FileRead {
					path: self.path.clone(),
					source: e,
				})
			}
		};
		debug!(path = %self.path.display(), "loaded config file");

		let layer: RetraceConfigLayer =
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
/// Convention: RETRACE_<FIELD>
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from an arbitrary variable lookup.
	pub fn load_with(
		&self,
		lookup: impl Fn(&str) -> Option<String>,
	) -> Result<RetraceConfigLayer, ConfigError> {
		let env = Env { lookup };

		let accumulation = match env.var("RETRACE_ACCUMULATION") {
			Some(v) => Some(v.parse::<AccumulationMode>().map_err(|message| {
				ConfigError::InvalidValue {
					key: "RETRACE_ACCUMULATION".to_string(),
					message,
				}
			})?),
			None => None,
		};

		Ok(RetraceConfigLayer {
			store: Some(StoreConfigLayer {
				data_dir: env.var("RETRACE_DATA_DIR").map(PathBuf::from),
				retention_days: env.parse("RETRACE_RETENTION_DAYS")?,
				sweep_interval_secs: env.parse("RETRACE_SWEEP_INTERVAL_SECS")?,
				accumulation,
			}),
			logging: Some(LoggingConfigLayer {
				level: env.var("RETRACE_LOG_LEVEL"),
			}),
		})
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<RetraceConfigLayer, ConfigError> {
		debug!("loading environment variables");
		self.load_with(|name| std::env::var(name).ok())
	}
}

struct Env<F> {
	lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
	fn var(&self, name: &str) -> Option<String> {
		(self.lookup)(name).filter(|s| !s.is_empty())
	}

	fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {} value '{v}'", std::any::type_name::<T>()),
			}),
			None => Ok(None),
		}
	}
}
