// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration merged across sources.

use serde::Deserialize;

use crate::sections::{LoggingConfigLayer, StoreConfigLayer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetraceConfigLayer {
	#[serde(default)]
	pub store: Option<StoreConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl RetraceConfigLayer {
	/// Overlay `other` on top of `self`; set values in `other` win.
	pub fn merge(&mut self, other: RetraceConfigLayer) {
		merge_section(&mut self.store, other.store, StoreConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: fn(&mut T, T)) {
	let Some(other) = other else {
		return;
	};
	match base {
		Some(base) => merge(base, other),
		None => *base = Some(other),
	}
}
