// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! On-disk layout for mapping artifacts.
//!
//! Each `(application, version)` owns two files named from a deterministic
//! stem: `<stem>.map` holds the raw ingested bytes and `<stem>.meta.json`
//! holds [`ArtifactMeta`]. The metadata file is written last and removed
//! first, so its presence marks a committed artifact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use retrace_core::{ArtifactKey, StorageError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const DATA_SUFFIX: &str = ".map";
const META_SUFFIX: &str = ".meta.json";
const TMP_SUFFIX: &str = ".tmp";
/// Longest sanitised component kept in a file stem.
const MAX_COMPONENT_LEN: usize = 64;

/// Sidecar metadata for a persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
	pub application_id: String,
	pub version: String,
	pub stored_at: DateTime<Utc>,
	pub size_bytes: u64,
	pub sha256: String,
}

impl ArtifactMeta {
	pub fn key(&self) -> ArtifactKey {
		ArtifactKey {
			application_id: self.application_id.clone(),
			version: self.version.clone(),
		}
	}
}

/// Filesystem-backed artifact persistence.
#[derive(Debug, Clone)]
pub struct DiskStorage {
	root: PathBuf,
}

impl DiskStorage {
	/// Open (creating if needed) the storage directory.
	pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
		let root = root.into();
		fs::create_dir_all(&root).map_err(|e| StorageError::io(&root, e))?;
		Ok(Self { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn data_path(&self, key: &ArtifactKey) -> PathBuf {
		self.root.join(format!("{}{DATA_SUFFIX}", file_stem(key)))
	}

	pub fn meta_path(&self, key: &ArtifactKey) -> PathBuf {
		self.root.join(format!("{}{META_SUFFIX}", file_stem(key)))
	}

	/// Persist raw bytes and metadata, replacing any previous copy.
	///
	/// The previous metadata is removed before the data is replaced, so a
	/// failure part way through leaves the key absent rather than pairing
	/// old metadata with new bytes.
	pub fn write(
		&self,
		key: &ArtifactKey,
		data: &[u8],
		meta: &ArtifactMeta,
	) -> Result<(), StorageError> {
		let meta_json = serde_json::to_vec_pretty(meta).map_err(|source| {
			StorageError::CorruptMetadata {
				path: self.meta_path(key),
				source,
			}
		})?;

		remove_if_exists(&self.meta_path(key))?;
		write_atomic(&self.data_path(key), data)?;
		write_atomic(&self.meta_path(key), &meta_json)?;
		Ok(())
	}

	/// Read metadata only. `Ok(None)` when nothing is stored under the key.
	pub fn read_meta(&self, key: &ArtifactKey) -> Result<Option<ArtifactMeta>, StorageError> {
		read_meta_file(&self.meta_path(key))
	}

	/// Read metadata and raw bytes.
	///
	/// Bytes whose digest does not match the metadata (an interrupted
	/// overwrite) are reported as absent.
	pub fn read(&self, key: &ArtifactKey) -> Result<Option<(ArtifactMeta, Vec<u8>)>, StorageError> {
		let Some(meta) = self.read_meta(key)? else {
			return Ok(None);
		};

		let path = self.data_path(key);
		let data = match fs::read(&path) {
			Ok(data) => data,
			Err(e) if e.kind() == ErrorKind::NotFound => {
				warn!(path = %path.display(), "artifact metadata present without data");
				return Ok(None);
			}
			Err(e) => return Err(StorageError::io(path, e)),
		};

		let digest = hex::encode(Sha256::digest(&data));
		if digest != meta.sha256 {
			warn!(
				path = %path.display(),
				expected = %meta.sha256,
				actual = %digest,
				"artifact data does not match its metadata"
			);
			return Ok(None);
		}

		Ok(Some((meta, data)))
	}

	/// Remove both files. Returns whether a committed artifact existed.
	pub fn delete(&self, key: &ArtifactKey) -> Result<bool, StorageError> {
		let existed = remove_if_exists(&self.meta_path(key))?;
		remove_if_exists(&self.data_path(key))?;
		Ok(existed)
	}

	/// Metadata for every committed artifact.
	///
	/// Unreadable metadata files are logged and skipped.
	pub fn list(&self) -> Result<Vec<ArtifactMeta>, StorageError> {
		let entries = fs::read_dir(&self.root).map_err(|e| StorageError::io(&self.root, e))?;

		let mut metas = Vec::new();
		for entry in entries {
			let entry = entry.map_err(|e| StorageError::io(&self.root, e))?;
			let path = entry.path();
			let is_meta = path
				.file_name()
				.and_then(|n| n.to_str())
				.is_some_and(|n| n.ends_with(META_SUFFIX));
			if !is_meta {
				continue;
			}

			match read_meta_file(&path) {
				Ok(Some(meta)) => metas.push(meta),
				Ok(None) => {}
				Err(e) => warn!(error = %e, "skipping unreadable artifact metadata"),
			}
		}

		debug!(count = metas.len(), root = %self.root.display(), "listed persisted artifacts");
		Ok(metas)
	}
}

/// Deterministic, filesystem-safe stem for a key.
///
/// The readable prefix may collide after sanitising; the digest suffix
/// keeps distinct keys apart.
pub fn file_stem(key: &ArtifactKey) -> String {
	let mut hasher = Sha256::new();
	hasher.update(key.application_id.as_bytes());
	hasher.update([0u8]);
	hasher.update(key.version.as_bytes());
	let digest = hex::encode(hasher.finalize());

	format!(
		"{}@{}.{}",
		sanitize(&key.application_id),
		sanitize(&key.version),
		&digest[..16]
	)
}

fn sanitize(component: &str) -> String {
	component
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
				c
			} else {
				'_'
			}
		})
		.take(MAX_COMPONENT_LEN)
		.collect()
}

fn read_meta_file(path: &Path) -> Result<Option<ArtifactMeta>, StorageError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(StorageError::io(path, e)),
	};

	serde_json::from_slice(&bytes)
		.map(Some)
		.map_err(|source| StorageError::CorruptMetadata {
			path: path.to_path_buf(),
			source,
		})
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
	let mut tmp = path.as_os_str().to_owned();
	tmp.push(TMP_SUFFIX);
	let tmp = PathBuf::from(tmp);

	fs::write(&tmp, bytes).map_err(|e| StorageError::io(&tmp, e))?;
	fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

fn remove_if_exists(path: &Path) -> Result<bool, StorageError> {
	match fs::remove_file(path) {
		Ok(()) => Ok(true),
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
		Err(e) => Err(StorageError::io(path, e)),
	}
}
