// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Run command - assemble the pipeline and trigger its roots

use colored::Colorize;
use miette::Result;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::{load_definition, report, OutputFormat};
use crate::artifact::{Artifact, ArtifactBundle};
use crate::errors::PlugflowError;
use crate::graph::{AssembledGraph, GraphValidator};
use crate::transforms::TransformRegistry;
use crate::utils::{print_section, StageProgressBars};

/// Run the pipeline
pub async fn run(
    pipeline_path: PathBuf,
    roots: Vec<String>,
    parallel: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let definition = load_definition(&pipeline_path)?;
    let registry = TransformRegistry::with_builtins();

    let validation = GraphValidator::validate(&definition, &registry)?;
    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let graph = Arc::new(AssembledGraph::assemble(&definition, &registry).map_err(report)?);

    let roots = if roots.is_empty() {
        graph.roots().to_vec()
    } else {
        roots
    };
    if let Some(missing) = roots.iter().find(|r| graph.stage(r).is_none()) {
        return Err(report(PlugflowError::UnknownStage {
            stage: missing.clone(),
        }));
    }

    let bars = (!verbose && format == OutputFormat::Text).then(|| {
        let bars = Arc::new(StageProgressBars::new());
        graph.add_progress_listener(bars.clone());
        bars
    });

    let started = Instant::now();
    let outcome = if parallel {
        trigger_parallel(&graph, &roots).await
    } else {
        trigger_sequential(&graph, &roots)
    };

    if let Some(bars) = &bars {
        bars.abandon();
    }
    outcome?;

    match format {
        OutputFormat::Text => print_text(&graph),
        OutputFormat::Json => print_json(&graph)?,
    }

    if format == OutputFormat::Text {
        println!();
        println!(
            "{}",
            format!(
                "Triggered {} root stage(s) in {:.2?}",
                roots.len(),
                started.elapsed()
            )
            .green()
            .bold()
        );
    }

    Ok(())
}

fn trigger_sequential(graph: &AssembledGraph, roots: &[String]) -> Result<()> {
    for root in roots {
        graph
            .trigger(root, &ArtifactBundle::empty())
            .map_err(report)?;
    }
    Ok(())
}

/// Trigger each root on its own blocking thread
async fn trigger_parallel(graph: &Arc<AssembledGraph>, roots: &[String]) -> Result<()> {
    let handles: Vec<_> = roots
        .iter()
        .map(|root| {
            let graph = Arc::clone(graph);
            let root = root.clone();
            tokio::task::spawn_blocking(move || {
                graph.trigger(&root, &ArtifactBundle::empty()).map(|_| ())
            })
        })
        .collect();

    let mut first_error = None;
    for handle in handles {
        let result = handle
            .await
            .map_err(|e| miette::miette!("Root stage task failed: {}", e))?;
        if let Err(e) = result {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(report(e)),
        None => Ok(()),
    }
}

/// Render an artifact value for display
fn render_value(artifact: &Artifact) -> String {
    if let Some(value) = artifact.value::<Value>() {
        value.to_string()
    } else if let Some(text) = artifact.value::<String>() {
        text.clone()
    } else {
        "<opaque>".to_string()
    }
}

fn print_text(graph: &AssembledGraph) {
    print_section("Outputs");

    for output in graph.outputs() {
        let bundles = output.bundles();
        if bundles.is_empty() {
            println!("  {} {}", output.name().bold(), "(no output)".dimmed());
            continue;
        }

        println!("  {} ({} bundle(s))", output.name().bold(), bundles.len());
        for (i, bundle) in bundles.iter().enumerate() {
            println!("    #{}", i + 1);
            for artifact in bundle {
                let kind = artifact
                    .kind()
                    .map(|k| format!(" [{}]", k))
                    .unwrap_or_default();
                println!(
                    "      {} = {}{}",
                    artifact.name(),
                    render_value(artifact),
                    kind.dimmed()
                );
            }
        }
    }
}

fn print_json(graph: &AssembledGraph) -> Result<()> {
    let outputs: Vec<Value> = graph
        .outputs()
        .iter()
        .map(|output| {
            let bundles: Vec<Value> = output
                .bundles()
                .iter()
                .map(|bundle| {
                    bundle
                        .iter()
                        .map(|artifact| {
                            json!({
                                "name": artifact.name(),
                                "kind": artifact.kind().map(|k| k.as_str()),
                                "annotation": artifact.annotation(),
                                "value": artifact
                                    .value::<Value>()
                                    .cloned()
                                    .unwrap_or_else(|| Value::String(render_value(artifact))),
                            })
                        })
                        .collect::<Value>()
                })
                .collect();
            json!({ "stage": output.name(), "bundles": bundles })
        })
        .collect();

    let document = json!({
        "pipeline": graph.name(),
        "outputs": outputs,
    });

    let text = serde_json::to_string_pretty(&document)
        .map_err(|e| miette::miette!("Failed to render outputs: {}", e))?;
    println!("{}", text);
    Ok(())
}

