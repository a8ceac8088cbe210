// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store observability types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactStat {
	pub key: ArtifactKey,
	pub size_bytes: u64,
	pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
	pub count: usize,
	pub total_bytes: u64,
	/// Sorted by key.
	pub per_artifact: Vec<ArtifactStat>,
}

impl StoreStats {
	pub fn from_artifacts(mut per_artifact: Vec<ArtifactStat>) -> Self {
		per_artifact.sort_by(|a, b| a.key.cmp(&b.key));
		Self {
			count: per_artifact.len(),
			total_bytes: per_artifact.iter().map(|a| a.size_bytes).sum(),
			per_artifact,
		}
	}
}
