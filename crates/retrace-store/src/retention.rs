// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Periodic retention sweeps.

use std::sync::Arc;
use std::time::Duration;

use retrace_config::StoreConfig;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::store::ArtifactStore;

/// Runs [`ArtifactStore::sweep_expired`] on a fixed interval.
pub struct RetentionSweeper {
	store: Arc<ArtifactStore>,
	max_age: Duration,
	interval: Duration,
	shutdown_tx: broadcast::Sender<()>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl RetentionSweeper {
	pub fn new(store: Arc<ArtifactStore>, max_age: Duration, interval: Duration) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			store,
			max_age,
			interval,
			shutdown_tx,
			handle: Mutex::new(None),
		}
	}

	pub fn from_config(store: Arc<ArtifactStore>, config: &StoreConfig) -> Self {
		Self::new(store, config.retention(), config.sweep_interval())
	}

	pub fn max_age(&self) -> Duration {
		self.max_age
	}

	pub fn interval(&self) -> Duration {
		self.interval
	}

	/// Run one sweep off the async runtime's worker threads.
	#[instrument(skip(self), fields(max_age_secs = self.max_age.as_secs()))]
	pub async fn run_once(&self) -> usize {
		sweep_blocking(Arc::clone(&self.store), self.max_age).await
	}

	/// Start the background loop. A second call while running is a no-op.
	#[instrument(skip(self), fields(interval_secs = self.interval.as_secs()))]
	pub async fn start(&self) {
		let mut handle = self.handle.lock().await;
		if handle.is_some() {
			warn!("retention sweeper already running");
			return;
		}

		let store = Arc::clone(&self.store);
		let max_age = self.max_age;
		let interval = self.interval;
		let mut shutdown_rx = self.shutdown_tx.subscribe();

		*handle = Some(tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = tokio::time::sleep(interval) => {
						sweep_blocking(Arc::clone(&store), max_age).await;
					}
					_ = shutdown_rx.recv() => {
						info!("shutting down retention sweeper");
						break;
					}
				}
			}
		}));

		info!("retention sweeper started");
	}

	/// Stop the loop and wait for an in-progress sweep to finish.
	#[instrument(skip(self))]
	pub async fn shutdown(&self) {
		let _ = self.shutdown_tx.send(());

		if let Some(handle) = self.handle.lock().await.take() {
			if let Err(e) = handle.await {
				warn!(error = %e, "retention sweeper task ended abnormally");
			}
		}

		info!("retention sweeper shut down");
	}
}

async fn sweep_blocking(store: Arc<ArtifactStore>, max_age: Duration) -> usize {
	match tokio::task::spawn_blocking(move || store.sweep_expired(max_age)).await {
		Ok(removed) => removed,
		Err(e) => {
			warn!(error = %e, "retention sweep task failed");
			0
		}
	}
}
