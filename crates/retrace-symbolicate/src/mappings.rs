// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decoding of the `mappings` text into ordered mapping entries.
//!
//! The mappings string format:
//! - Generated lines are separated by semicolons (`;`)
//! - Segments within a line are separated by commas (`,`)
//! - Each segment contains 1, 4, or 5 VLQ-encoded deltas

use retrace_core::MappingEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::vlq::decode_vlq_segment;

/// How source-side deltas accumulate across generated lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulationMode {
	/// Source index, line, column and name are cumulative across the whole
	/// artifact. This is what conventional generators emit.
	#[default]
	CrossLine,
	/// Source-side running values reset at the start of every generated line.
	/// Kept for artifacts produced by tooling that relied on that behavior.
	PerLine,
}

impl fmt::Display for AccumulationMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::CrossLine => write!(f, "cross_line"),
			Self::PerLine => write!(f, "per_line"),
		}
	}
}

impl FromStr for AccumulationMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().replace('-', "_").as_str() {
			"cross_line" => Ok(Self::CrossLine),
			"per_line" => Ok(Self::PerLine),
			other => Err(format!("unknown accumulation mode '{other}'")),
		}
	}
}

/// Entries decoded from a mappings string, plus what was left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMappings {
	/// Resolvable entries in emission order.
	pub entries: Vec<MappingEntry>,
	/// Malformed segments (unexpected field count or negative position).
	pub skipped_segments: usize,
	/// Generated-column-only segments.
	pub unmapped_segments: usize,
}

#[derive(Default, Clone, Copy)]
struct SourceState {
	source: i64,
	line: i64,
	column: i64,
	name: i64,
}

impl SourceState {
	/// Apply one segment's deltas. `None` if any running value overflows,
	/// in which case the segment contributes nothing.
	fn advance(&self, generated_column: i64, values: &[i64]) -> Option<(i64, Self)> {
		let column = generated_column.checked_add(values[0])?;
		let name = match values.get(4) {
			Some(&delta) => self.name.checked_add(delta)?,
			None => self.name,
		};
		Some((
			column,
			Self {
				source: self.source.checked_add(values[1])?,
				line: self.line.checked_add(values[2])?,
				column: self.column.checked_add(values[3])?,
				name,
			},
		))
	}
}

/// Decode a mappings string into structured entries.
///
/// Never fails: a bad segment is counted and skipped, and parsing continues
/// with the next one. `generated_line` is non-decreasing across the output.
pub fn parse_mappings(mappings: &str, mode: AccumulationMode) -> ParsedMappings {
	let mut result = ParsedMappings::default();
	let mut state = SourceState::default();

	for (generated_line, line) in mappings.split(';').enumerate() {
		let Ok(generated_line) = u32::try_from(generated_line) else {
			break;
		};

		let mut generated_column = 0i64;
		if mode == AccumulationMode::PerLine {
			state = SourceState::default();
		}

		for segment in line.split(',') {
			if segment.is_empty() {
				continue;
			}

			let values = decode_vlq_segment(segment);

			match values.len() {
				1 => match generated_column.checked_add(values[0]) {
					Some(column) => {
						generated_column = column;
						result.unmapped_segments += 1;
					}
					None => result.skipped_segments += 1,
				},
				4 | 5 => {
					let Some((column, next)) = state.advance(generated_column, &values) else {
						result.skipped_segments += 1;
						continue;
					};
					generated_column = column;
					state = next;
					let name = (values.len() == 5).then_some(state.name);

					match build_entry(generated_line, generated_column, &state, name) {
						Some(entry) => result.entries.push(entry),
						None => result.skipped_segments += 1,
					}
				}
				_ => result.skipped_segments += 1,
			}
		}
	}

	result
}

fn build_entry(
	generated_line: u32,
	generated_column: i64,
	state: &SourceState,
	name: Option<i64>,
) -> Option<MappingEntry> {
	let name_index = match name {
		Some(n) => Some(u32::try_from(n).ok()?),
		None => None,
	};

	Some(MappingEntry {
		generated_line,
		generated_column: u32::try_from(generated_column).ok()?,
		source_index: u32::try_from(state.source).ok()?,
		source_line: u32::try_from(state.line).ok()?,
		source_column: u32::try_from(state.column).ok()?,
		name_index,
	})
}
