// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! plugflow - dataflow pipeline runner
//!
//! Wire stages together in a pipeline file and run them.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plugflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "plugflow=debug"
    } else {
        "plugflow=info"
    };

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if !plugflow::utils::should_use_colors() {
        colored::control::set_override(false);
    }

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            pipeline,
            roots,
            parallel,
            format,
        } => plugflow::cli::run::run(pipeline, roots, parallel, format, cli.verbose).await,
        Commands::Validate { pipeline } => {
            plugflow::cli::validate::run(pipeline, cli.verbose).await
        }
        Commands::Graph { pipeline, format } => {
            plugflow::cli::graph::run(pipeline, format, cli.verbose).await
        }
        Commands::Trace {
            pipeline,
            stage,
            reverse,
        } => plugflow::cli::trace::run(pipeline, stage, reverse, cli.verbose).await,
    }
}
