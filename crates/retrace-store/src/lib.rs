// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Artifact storage and error position resolution for retrace.
//!
//! This crate provides:
//! - [`ArtifactStore`]: durable, cached storage keyed by application and version
//! - [`Resolver`]: maps generated positions to original source locations
//! - [`RetentionSweeper`]: periodic removal of expired artifacts
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use retrace_config::StoreConfig;
//! use retrace_store::{ArtifactStore, Resolver};
//!
//! let store = Arc::new(ArtifactStore::open(&StoreConfig::default())?);
//! store.ingest("dashboard", "1.4.0", &std::fs::read("dist/app.js.map")?)?;
//!
//! let resolver = Resolver::new(Arc::clone(&store));
//! match resolver.resolve_error("dashboard", "1.4.0", "app.ts", 0, 1520) {
//!     Ok(location) => println!("{}:{}:{}", location.source_path, location.line, location.column),
//!     Err(miss) => println!("unresolved: {miss}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod persist;
pub mod resolver;
pub mod retention;
pub mod store;

pub use persist::{ArtifactMeta, DiskStorage};
pub use resolver::{ResolvedFrame, Resolver};
pub use retention::RetentionSweeper;
pub use store::{ArtifactStore, StoredArtifact};
