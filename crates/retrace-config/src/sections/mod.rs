// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod logging;
mod store;

pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use store::{StoreConfig, StoreConfigLayer};
