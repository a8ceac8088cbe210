// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! retrace command-line interface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use retrace_config::RetraceConfig;
use retrace_store::{ArtifactStore, Resolver, RetentionSweeper};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// retrace - map minified error positions back to original source.
#[derive(Parser, Debug)]
#[command(name = "retrace", about = "Mapping artifact store and resolver", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/retrace/retrace.toml)
	#[arg(long, global = true, env = "RETRACE_CONFIG")]
	config: Option<PathBuf>,

	/// Override the artifact data directory
	#[arg(long, global = true)]
	data_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Store a mapping artifact for an application version
	Ingest {
		application_id: String,
		version: String,
		file: PathBuf,
	},
	/// Resolve a generated position to its original location
	Resolve {
		application_id: String,
		version: String,
		generated_file: String,
		/// 0-based generated line
		line: u32,
		/// 0-based generated column
		column: u32,
		/// Include this many lines of original source around the hit
		#[arg(long)]
		context: Option<usize>,
	},
	/// Print the original content of a source file
	Source {
		application_id: String,
		version: String,
		path: String,
	},
	/// Show stored artifact counts and sizes
	Stats,
	/// Remove artifacts older than the retention window
	Sweep {
		/// Retention window in days (defaults to the configured value)
		#[arg(long)]
		max_age_days: Option<u32>,
	},
	/// Run periodic retention sweeps until interrupted
	Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	dotenvy::dotenv().ok();

	let mut config = match &args.config {
		Some(path) => retrace_config::load_config_with_file(path),
		None => retrace_config::load_config(),
	}
	.context("failed to load configuration")?;
	if let Some(data_dir) = &args.data_dir {
		config.store.data_dir = data_dir.clone();
	}

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let store = Arc::new(
		ArtifactStore::open(&config.store).with_context(|| {
			format!(
				"failed to open artifact store at {}",
				config.store.data_dir.display()
			)
		})?,
	);

	run(args.command, store, &config).await
}

async fn run(command: Command, store: Arc<ArtifactStore>, config: &RetraceConfig) -> anyhow::Result<()> {
	match command {
		Command::Ingest {
			application_id,
			version,
			file,
		} => {
			let data = std::fs::read(&file)
				.with_context(|| format!("failed to read {}", file.display()))?;
			store
				.ingest(&application_id, &version, &data)
				.with_context(|| format!("failed to ingest {application_id}@{version}"))?;
			print_json(&serde_json::json!({
				"application_id": application_id,
				"version": version,
				"size_bytes": data.len(),
			}))
		}
		Command::Resolve {
			application_id,
			version,
			generated_file,
			line,
			column,
			context,
		} => {
			let resolver = Resolver::new(store);
			let resolved = match context {
				Some(lines) => resolver
					.resolve_with_context(&application_id, &version, &generated_file, line, column, lines)
					.map(serde_json::to_value),
				None => resolver
					.resolve_error(&application_id, &version, &generated_file, line, column)
					.map(serde_json::to_value),
			};
			match resolved {
				Ok(value) => print_json(&value?),
				Err(miss) => bail!("unresolved {generated_file}:{line}:{column}: {miss}"),
			}
		}
		Command::Source {
			application_id,
			version,
			path,
		} => match store.get_source_content(&application_id, &version, &path) {
			Some(content) => {
				print!("{content}");
				Ok(())
			}
			None => bail!("no source content for {path} in {application_id}@{version}"),
		},
		Command::Stats => print_json(&store.stats()),
		Command::Sweep { max_age_days } => {
			let max_age = match max_age_days {
				Some(days) => days_to_duration(days),
				None => config.store.retention(),
			};
			let removed = RetentionSweeper::new(store, max_age, config.store.sweep_interval())
				.run_once()
				.await;
			print_json(&serde_json::json!({ "removed": removed }))
		}
		Command::Watch => {
			let sweeper = RetentionSweeper::from_config(store, &config.store);
			sweeper.run_once().await;
			sweeper.start().await;

			tokio::signal::ctrl_c()
				.await
				.context("failed to listen for shutdown signal")?;
			tracing::info!("received shutdown signal");

			sweeper.shutdown().await;
			Ok(())
		}
	}
}

fn days_to_duration(days: u32) -> Duration {
	Duration::from_secs(u64::from(days) * 24 * 60 * 60)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}
