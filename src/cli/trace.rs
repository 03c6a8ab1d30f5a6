// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Trace command - show the live wiring around one stage

use miette::Result;
use std::path::PathBuf;

use super::{load_definition, report};
use crate::graph::AssembledGraph;
use crate::transforms::TransformRegistry;

/// Assemble the pipeline and print what `stage` feeds (or is fed by)
pub async fn run(pipeline_path: PathBuf, stage: String, reverse: bool, _verbose: bool) -> Result<()> {
    let definition = load_definition(&pipeline_path)?;
    let registry = TransformRegistry::with_builtins();
    let graph = AssembledGraph::assemble(&definition, &registry).map_err(report)?;

    let text = if reverse {
        graph.reverse_trace(&stage)
    } else {
        graph.trace(&stage)
    }
    .map_err(report)?;

    print!("{}", text);
    Ok(())
}
