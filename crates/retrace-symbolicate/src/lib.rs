// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Mapping artifact decoding and position lookup for retrace.
//!
//! This crate provides functionality for:
//! - Decoding Base64 VLQ segments
//! - Parsing mapping text into ordered entries, tolerating bad segments
//! - Indexing entries for nearest-position queries
//! - Extracting source context for display
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use retrace_core::ArtifactKey;
//! use retrace_symbolicate::{find_source, parse_artifact, AccumulationMode, MappingIndex};
//!
//! let json = r#"{
//!     "version": 3,
//!     "sources": ["src/app.ts"],
//!     "names": [],
//!     "mappings": "AAAA"
//! }"#;
//!
//! let key = ArtifactKey::new("dashboard", "1.0.0").unwrap();
//! let artifact = parse_artifact(key, json.as_bytes(), Utc::now()).unwrap();
//! let index = MappingIndex::build(&artifact, AccumulationMode::CrossLine);
//!
//! let source = find_source(&artifact.sources, "app.ts").unwrap();
//! let entry = index.nearest(0, 4, Some(source as u32)).unwrap();
//! assert_eq!(entry.source_line, 0);
//! ```

pub mod artifact;
pub mod context;
pub mod index;
pub mod mappings;
pub mod vlq;

pub use artifact::{parse_artifact, sha256_hex, SUPPORTED_VERSION};
pub use context::extract_context;
pub use index::{find_source, IndexReport, MappingIndex};
pub use mappings::{parse_mappings, AccumulationMode, ParsedMappings};
pub use vlq::decode_vlq_segment;
