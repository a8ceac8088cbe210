// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parsing of the JSON mapping-artifact container.
//!
//! Accepts the conventional shape
//! `{ version, sources, sourcesContent?, names, mappings, file? }`.
//! Unknown fields are ignored.

use chrono::{DateTime, Utc};
use retrace_core::{ArtifactKey, IngestError, MappingArtifact};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

/// The only container version this engine understands.
pub const SUPPORTED_VERSION: u64 = 3;

/// Raw container JSON structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMappingArtifact {
	#[serde(default)]
	version: Option<u64>,
	#[serde(default)]
	file: Option<String>,
	#[serde(default)]
	sources: Option<Vec<String>>,
	#[serde(default)]
	sources_content: Option<Vec<Option<String>>>,
	#[serde(default)]
	names: Vec<String>,
	#[serde(default)]
	mappings: Option<String>,
}

/// Hex SHA-256 of raw artifact bytes.
pub fn sha256_hex(data: &[u8]) -> String {
	hex::encode(Sha256::digest(data))
}

/// Parse artifact bytes into a [`MappingArtifact`].
///
/// The mappings text is kept undecoded; decoding happens when the index is
/// built.
pub fn parse_artifact(
	key: ArtifactKey,
	data: &[u8],
	stored_at: DateTime<Utc>,
) -> Result<MappingArtifact, IngestError> {
	let raw: RawMappingArtifact = serde_json::from_slice(data)?;

	if let Some(version) = raw.version {
		if version != SUPPORTED_VERSION {
			return Err(IngestError::UnsupportedVersion(version));
		}
	}

	let sources = raw.sources.ok_or(IngestError::MissingField("sources"))?;
	let mappings_raw = raw.mappings.ok_or(IngestError::MissingField("mappings"))?;

	let mut sources_content = raw.sources_content.unwrap_or_default();
	if !sources_content.is_empty() && sources_content.len() != sources.len() {
		warn!(
			artifact = %key,
			sources = sources.len(),
			sources_content = sources_content.len(),
			"sourcesContent length does not match sources, aligning"
		);
	}
	sources_content.resize(sources.len(), None);

	Ok(MappingArtifact {
		key,
		generated_file_hint: raw.file,
		sources,
		sources_content,
		names: raw.names,
		mappings_raw,
		stored_at,
		size_bytes: data.len() as u64,
		sha256: sha256_hex(data),
	})
}
