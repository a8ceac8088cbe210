// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mapping artifact types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IngestError;

/// Identity of a mapping artifact: one per deployed `(application, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
	pub application_id: String,
	pub version: String,
}

impl ArtifactKey {
	/// Build a key, rejecting blank components and control characters.
	pub fn new(
		application_id: impl Into<String>,
		version: impl Into<String>,
	) -> Result<Self, IngestError> {
		let application_id = application_id.into();
		let version = version.into();

		validate_component("application id", &application_id)?;
		validate_component("version", &version)?;

		Ok(Self {
			application_id,
			version,
		})
	}
}

fn validate_component(what: &str, value: &str) -> Result<(), IngestError> {
	if value.trim().is_empty() {
		return Err(IngestError::InvalidKey(format!("{what} must not be empty")));
	}
	if value.chars().any(char::is_control) {
		return Err(IngestError::InvalidKey(format!(
			"{what} must not contain control characters"
		)));
	}
	Ok(())
}

impl fmt::Display for ArtifactKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}@{}", self.application_id, self.version)
	}
}

/// Decoded mapping artifact container.
///
/// `sources_content` is always aligned 1:1 with `sources`; entries for which
/// no original text was captured are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingArtifact {
	pub key: ArtifactKey,
	/// Name of the built file this artifact describes (`file` field).
	pub generated_file_hint: Option<String>,
	pub sources: Vec<String>,
	pub sources_content: Vec<Option<String>>,
	pub names: Vec<String>,
	/// Undecoded delta-encoded mapping text.
	pub mappings_raw: String,
	pub stored_at: DateTime<Utc>,
	pub size_bytes: u64,
	/// Hex SHA-256 of the raw ingested bytes.
	pub sha256: String,
}

impl MappingArtifact {
	pub fn source_count(&self) -> usize {
		self.sources.len()
	}

	pub fn name_count(&self) -> usize {
		self.names.len()
	}

	/// Check if any source has embedded content.
	pub fn has_sources_content(&self) -> bool {
		self.sources_content.iter().any(Option::is_some)
	}

	/// Original text for a source index, if it was captured.
	pub fn source_content(&self, index: usize) -> Option<&str> {
		self.sources_content.get(index).and_then(|c| c.as_deref())
	}
}

/// A single decoded position mapping.
///
/// All positions are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingEntry {
	pub generated_line: u32,
	pub generated_column: u32,
	/// Index into the artifact's `sources`.
	pub source_index: u32,
	pub source_line: u32,
	pub source_column: u32,
	/// Optional index into the artifact's `names`.
	pub name_index: Option<u32>,
}
