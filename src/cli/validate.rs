// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Validate command - check pipeline wiring

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::report;
use crate::graph::{GraphValidator, PipelineDefinition};
use crate::transforms::TransformRegistry;
use crate::utils::{print_section, print_status, Status};

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let definition = match PipelineDefinition::from_file(&pipeline_path) {
        Ok(d) => d,
        Err(e) => {
            print_status(Status::Error, "Failed to parse pipeline");
            println!();
            return Err(report(e));
        }
    };

    print_status(Status::Ok, format!("Parsed {}", pipeline_path.display()));

    let registry = TransformRegistry::with_builtins();
    let validation = GraphValidator::validate(&definition, &registry)?;

    if !validation.errors.is_empty() {
        print_section("Errors".red());
        for error in &validation.errors {
            print_status(Status::Error, error);
        }
    }

    if !validation.warnings.is_empty() {
        print_section("Warnings".yellow());
        for warning in &validation.warnings {
            print_status(Status::Warning, warning);
        }
    }

    if verbose {
        print_section("Pipeline summary");
        println!("  Name: {}", definition.name);
        println!("  Stages: {}", definition.stages.len());
        for stage in &definition.stages {
            let inputs = if stage.inputs.is_empty() {
                String::new()
            } else {
                let names: Vec<String> = stage
                    .inputs
                    .iter()
                    .map(|i| format!("{} ({})", i.source(), i.mode()))
                    .collect();
                format!(" [inputs: {}]", names.join(", "))
            };
            println!("    - {} ({}){}", stage.name, stage.kind_name(), inputs.dimmed());
        }
        print_status(Status::Info, format!("Roots: {}", definition.roots().join(", ")));
        print_status(Status::Info, format!("Transforms: {}", registry.names().join(", ")));
    }

    println!();

    if !validation.is_valid() {
        return Err(miette::miette!("Pipeline validation failed"));
    }

    if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }
    Ok(())
}
