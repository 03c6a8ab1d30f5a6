// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for plugflow.

pub mod graph;
pub mod run;
pub mod trace;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use crate::errors::PlugflowError;
use crate::graph::{PipelineDefinition, DEFAULT_PIPELINE_FILE};

/// Dataflow pipeline runner
///
/// Wire stages together in a pipeline file and run them.
#[derive(Parser, Debug)]
#[clap(
    name = "plugflow",
    version,
    about = "Run publish/subscribe dataflow pipelines with fan-in joins",
    long_about = None,
    after_help = "Examples:\n\
        plugflow validate                    Check .plugflow.yaml\n\
        plugflow run                         Trigger the root stages\n\
        plugflow graph --format mermaid      Draw the wiring\n\
        plugflow trace --stage combine -r    Show what feeds a stage\n\n\
        See 'plugflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble the pipeline and trigger its root stages
    Run {
        /// Pipeline file
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Trigger these stages instead of the pipeline's roots
        #[clap(short, long = "root", value_name = "STAGE")]
        roots: Vec<String>,

        /// Trigger the roots concurrently
        #[clap(long)]
        parallel: bool,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Validate pipeline wiring
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,
    },

    /// Show pipeline as a graph
    Graph {
        /// Pipeline file
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Output format
        #[clap(short, long, value_enum, default_value_t = GraphFormat::Text)]
        format: GraphFormat,
    },

    /// Show the stages downstream (or upstream) of a stage
    Trace {
        /// Pipeline file
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        pipeline: PathBuf,

        /// Stage to start from
        #[clap(short, long)]
        stage: String,

        /// Follow inputs instead of observers
        #[clap(short, long)]
        reverse: bool,
    },
}

/// Output format for the run command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Graph output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormat {
    Text,
    Dot,
    Mermaid,
}

/// Load a pipeline file, printing recovery steps when that fails
pub(crate) fn load_definition(path: &Path) -> Result<PipelineDefinition> {
    PipelineDefinition::from_file(path).map_err(report)
}

/// Print recovery steps for `err` and turn it into a diagnostic
pub(crate) fn report(err: PlugflowError) -> miette::Report {
    if let Some(recovery) = err.recovery() {
        eprintln!("{}", recovery.to_string().cyan());
    }
    miette::Report::new(err)
}
