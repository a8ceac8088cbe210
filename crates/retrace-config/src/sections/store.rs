// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Artifact store configuration section.

use std::path::PathBuf;
use std::time::Duration;

use retrace_symbolicate::AccumulationMode;
use serde::{Deserialize, Serialize};

const DEFAULT_DATA_DIR: &str = "./retrace-data";
const DEFAULT_RETENTION_DAYS: u32 = 30;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86400; // 24 hours

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreConfigLayer {
	pub data_dir: Option<PathBuf>,
	pub retention_days: Option<u32>,
	pub sweep_interval_secs: Option<u64>,
	pub accumulation: Option<AccumulationMode>,
}

impl StoreConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.data_dir.is_some() {
			self.data_dir = other.data_dir;
		}
		if other.retention_days.is_some() {
			self.retention_days = other.retention_days;
		}
		if other.sweep_interval_secs.is_some() {
			self.sweep_interval_secs = other.sweep_interval_secs;
		}
		if other.accumulation.is_some() {
			self.accumulation = other.accumulation;
		}
	}

	pub fn finalize(self) -> StoreConfig {
		StoreConfig {
			data_dir: self
				.data_dir
				.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
			retention_days: self.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS),
			sweep_interval_secs: self
				.sweep_interval_secs
				.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
			accumulation: self.accumulation.unwrap_or_default(),
		}
	}
}

/// Artifact store configuration (runtime, fully resolved).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
	/// Directory holding persisted artifacts.
	pub data_dir: PathBuf,
	pub retention_days: u32,
	pub sweep_interval_secs: u64,
	pub accumulation: AccumulationMode,
}

impl StoreConfig {
	/// Store rooted at `data_dir` with every other setting at its default.
	pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
		Self {
			data_dir: data_dir.into(),
			..Self::default()
		}
	}

	pub fn retention(&self) -> Duration {
		Duration::from_secs(u64::from(self.retention_days) * 24 * 60 * 60)
	}

	pub fn sweep_interval(&self) -> Duration {
		Duration::from_secs(self.sweep_interval_secs)
	}
}

impl Default for StoreConfig {
	fn default() -> Self {
		StoreConfigLayer::default().finalize()
	}
}
