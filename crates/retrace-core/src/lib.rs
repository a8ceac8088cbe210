// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the retrace position-mapping engine.
//!
//! This crate provides the shared data model used to translate runtime error
//! locations in built (minified/transpiled) files back to original source
//! positions. It is used by the parsing crate (`retrace-symbolicate`), the
//! storage and resolution crate (`retrace-store`) and the CLI.
//!
//! # Overview
//!
//! - [`ArtifactKey`] identifies one mapping artifact per `(application, version)`
//! - [`MappingArtifact`] is the decoded artifact container
//! - [`MappingEntry`] is one decoded position mapping
//! - [`OriginalLocation`] is the result of a successful resolution
//! - [`ResolutionMiss`] enumerates the expected, non-exceptional misses

pub mod artifact;
pub mod error;
pub mod location;
pub mod stats;

pub use artifact::{ArtifactKey, MappingArtifact, MappingEntry};
pub use error::{IngestError, ResolutionMiss, StorageError};
pub use location::{OriginalLocation, SourceContext};
pub use stats::{ArtifactStat, StoreStats};
