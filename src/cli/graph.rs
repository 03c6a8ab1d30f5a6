// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Graph command - visualize pipeline wiring

use miette::Result;
use std::path::PathBuf;

use super::{load_definition, report, GraphFormat};
use crate::graph::WiringDag;

/// Run the graph command
pub async fn run(pipeline_path: PathBuf, format: GraphFormat, _verbose: bool) -> Result<()> {
    let definition = load_definition(&pipeline_path)?;

    let dag = WiringDag::build(&definition).map_err(report)?;

    let output = match format {
        GraphFormat::Text => dag.to_text(&definition)?,
        GraphFormat::Dot => dag.to_dot(),
        GraphFormat::Mermaid => dag.to_mermaid(),
    };

    println!("{}", output);

    Ok(())
}
