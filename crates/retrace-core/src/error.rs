// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the retrace engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to the caller of `ingest`.
#[derive(Debug, Error)]
pub enum IngestError {
	#[error("invalid artifact key: {0}")]
	InvalidKey(String),

	#[error("malformed mapping artifact: {0}")]
	Malformed(#[from] serde_json::Error),

	#[error("mapping artifact is missing required field: {0}")]
	MissingField(&'static str),

	#[error("unsupported mapping artifact version: expected 3, got {0}")]
	UnsupportedVersion(u64),

	#[error("failed to persist mapping artifact: {0}")]
	Storage(#[from] StorageError),
}

/// Persistent-layer failures, distinct from a legitimate miss.
#[derive(Debug, Error)]
pub enum StorageError {
	#[error("I/O error at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("corrupt artifact metadata at {path}: {source}")]
	CorruptMetadata {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},
}

impl StorageError {
	pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source,
		}
	}
}

/// Expected outcomes of a resolution that did not produce a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ResolutionMiss {
	#[error("no mapping artifact for this application version")]
	NoArtifact,

	#[error("generated file does not match any source in the artifact")]
	UnknownSource,

	#[error("no mapping entry for the requested position")]
	NoMapping,
}
