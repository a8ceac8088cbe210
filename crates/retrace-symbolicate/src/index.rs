// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Nearest-entry lookup over the decoded mappings of one artifact.

use std::collections::HashMap;

use retrace_core::{MappingArtifact, MappingEntry};
use serde::Serialize;
use tracing::{debug, warn};

use crate::mappings::{parse_mappings, AccumulationMode};

/// What index construction kept and what it dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
	pub entries: usize,
	pub skipped_segments: usize,
	pub unmapped_segments: usize,
	/// Entries referencing a source or name index out of range.
	pub invalid_entries: usize,
}

impl IndexReport {
	/// True when anything in the artifact could not be used.
	pub fn is_degraded(&self) -> bool {
		self.skipped_segments > 0 || self.invalid_entries > 0
	}
}

/// Read-only lookup structure over an artifact's valid entries.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
	/// Valid entries in parse order (non-decreasing generated line).
	entries: Vec<MappingEntry>,
	/// Positions into `entries`, per source index, in parse order.
	by_source: HashMap<u32, Vec<usize>>,
	report: IndexReport,
}

impl MappingIndex {
	/// Decode the artifact's mappings and index the entries that are safe to
	/// trust.
	pub fn build(artifact: &MappingArtifact, mode: AccumulationMode) -> Self {
		let parsed = parse_mappings(&artifact.mappings_raw, mode);
		let source_count = artifact.source_count();
		let name_count = artifact.name_count();

		let mut invalid_entries = 0;
		let entries: Vec<MappingEntry> = parsed
			.entries
			.into_iter()
			.filter(|entry| {
				let valid = (entry.source_index as usize) < source_count
					&& entry
						.name_index
						.map_or(true, |name| (name as usize) < name_count);
				if !valid {
					invalid_entries += 1;
				}
				valid
			})
			.collect();

		let mut by_source: HashMap<u32, Vec<usize>> = HashMap::new();
		for (position, entry) in entries.iter().enumerate() {
			by_source.entry(entry.source_index).or_default().push(position);
		}

		let report = IndexReport {
			entries: entries.len(),
			skipped_segments: parsed.skipped_segments,
			unmapped_segments: parsed.unmapped_segments,
			invalid_entries,
		};

		if report.is_degraded() {
			warn!(
				artifact = %artifact.key,
				entries = report.entries,
				skipped_segments = report.skipped_segments,
				invalid_entries = report.invalid_entries,
				"mapping artifact partially decoded"
			);
		} else {
			debug!(
				artifact = %artifact.key,
				entries = report.entries,
				mode = %mode,
				"built mapping index"
			);
		}

		Self {
			entries,
			by_source,
			report,
		}
	}

	/// Find the entry closest to a generated position.
	///
	/// Distance is `|Δline| + |Δcolumn|`. When `source_index` is given only
	/// entries for that source are candidates. Ties go to the entry that came
	/// first in the mappings text.
	pub fn nearest(
		&self,
		line: u32,
		column: u32,
		source_index: Option<u32>,
	) -> Option<&MappingEntry> {
		match source_index {
			Some(source) => {
				let positions = self.by_source.get(&source)?;
				closest(positions.iter().map(|&p| &self.entries[p]), line, column)
			}
			None => closest(self.entries.iter(), line, column),
		}
	}

	pub fn report(&self) -> IndexReport {
		self.report
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Candidates must arrive in parse order.
fn closest<'a>(
	candidates: impl Iterator<Item = &'a MappingEntry>,
	line: u32,
	column: u32,
) -> Option<&'a MappingEntry> {
	let mut best: Option<(&MappingEntry, u64)> = None;

	for entry in candidates {
		if let Some((_, best_distance)) = best {
			// Lines only grow from here, so nothing later can be closer.
			if u64::from(entry.generated_line) > u64::from(line) + best_distance {
				break;
			}
		}

		let distance = u64::from(entry.generated_line.abs_diff(line))
			+ u64::from(entry.generated_column.abs_diff(column));

		match best {
			Some((_, best_distance)) if distance >= best_distance => {}
			_ => best = Some((entry, distance)),
		}

		if distance == 0 {
			break;
		}
	}

	best.map(|(entry, _)| entry)
}

/// Find the source whose file name matches the file name of `hint`.
///
/// Directories, query strings and fragments are ignored on both sides. When
/// several sources share a file name the first one wins.
pub fn find_source(sources: &[String], hint: &str) -> Option<usize> {
	let wanted = basename(hint);
	if wanted.is_empty() {
		return None;
	}
	sources.iter().position(|source| basename(source) == wanted)
}

fn basename(path: &str) -> &str {
	let path = path.split(['?', '#']).next().unwrap_or(path);
	path.rsplit(['/', '\\']).next().unwrap_or(path)
}
