// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution results.

use serde::{Deserialize, Serialize};

/// Original position a generated location maps back to.
///
/// Line and column are 0-based, as stored in the mapping artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalLocation {
	pub source_path: String,
	pub line: u32,
	pub column: u32,
	pub name: Option<String>,
}

/// Source lines surrounding a resolved location, for error viewers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceContext {
	pub pre_context: Vec<String>,
	pub context_line: String,
	pub post_context: Vec<String>,
}
