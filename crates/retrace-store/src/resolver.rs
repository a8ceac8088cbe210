// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runtime position resolution against stored artifacts.

use std::sync::Arc;

use retrace_core::{OriginalLocation, ResolutionMiss, SourceContext};
use retrace_symbolicate::{extract_context, find_source};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::store::{ArtifactStore, StoredArtifact};

/// A resolved location plus surrounding original source, when captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedFrame {
	#[serde(flatten)]
	pub location: OriginalLocation,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub context: Option<SourceContext>,
}

/// Maps generated positions back to original source locations.
///
/// Holds no state beyond the shared store, so clones are cheap and may be
/// used from any number of threads.
#[derive(Debug, Clone)]
pub struct Resolver {
	store: Arc<ArtifactStore>,
}

impl Resolver {
	pub fn new(store: Arc<ArtifactStore>) -> Self {
		Self { store }
	}

	pub fn store(&self) -> &Arc<ArtifactStore> {
		&self.store
	}

	/// Resolve a 0-based generated position to its original location.
	#[instrument(skip(self))]
	pub fn resolve_error(
		&self,
		application_id: &str,
		version: &str,
		generated_file: &str,
		line: u32,
		column: u32,
	) -> Result<OriginalLocation, ResolutionMiss> {
		let stored = self
			.store
			.get(application_id, version)
			.ok_or(ResolutionMiss::NoArtifact)?;
		locate(&stored, generated_file, line, column).map(|hit| hit.location)
	}

	/// [`resolve_error`](Self::resolve_error), plus up to `context_lines`
	/// lines of original source on each side of the hit.
	#[instrument(skip(self))]
	pub fn resolve_with_context(
		&self,
		application_id: &str,
		version: &str,
		generated_file: &str,
		line: u32,
		column: u32,
		context_lines: usize,
	) -> Result<ResolvedFrame, ResolutionMiss> {
		let stored = self
			.store
			.get(application_id, version)
			.ok_or(ResolutionMiss::NoArtifact)?;
		let Hit {
			location,
			source_index,
		} = locate(&stored, generated_file, line, column)?;

		let context = stored
			.artifact()
			.source_content(source_index)
			.and_then(|content| extract_context(content, location.line as usize, context_lines));

		Ok(ResolvedFrame { location, context })
	}
}

struct Hit {
	location: OriginalLocation,
	/// Index of the hit's source in the artifact's `sources`.
	source_index: usize,
}

fn locate(
	stored: &StoredArtifact,
	generated_file: &str,
	line: u32,
	column: u32,
) -> Result<Hit, ResolutionMiss> {
	let artifact = stored.artifact();
	let index = stored.index();

	let source_index = find_source(&artifact.sources, generated_file).ok_or_else(|| {
		debug!(artifact = %stored.key(), generated_file, "generated file matches no source");
		ResolutionMiss::UnknownSource
	})?;
	let source_index = u32::try_from(source_index).map_err(|_| ResolutionMiss::UnknownSource)?;

	let entry = index
		.nearest(line, column, Some(source_index))
		.ok_or(ResolutionMiss::NoMapping)?;

	// The index only keeps entries whose indices are in range.
	let source_index = entry.source_index as usize;
	let source_path = artifact
		.sources
		.get(source_index)
		.cloned()
		.ok_or(ResolutionMiss::NoMapping)?;
	let name = entry
		.name_index
		.and_then(|n| artifact.names.get(n as usize))
		.cloned();

	Ok(Hit {
		location: OriginalLocation {
			source_path,
			line: entry.source_line,
			column: entry.source_column,
			name,
		},
		source_index,
	})
}
