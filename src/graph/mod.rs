// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Declarative wiring
//!
//! A pipeline file names the stages, their types and the inputs each one
//! observes. This module loads and validates such files, exposes the
//! wiring as a DAG, and assembles it into live stages.

mod assembly;
mod dag;
mod definition;
mod validation;

pub use assembly::AssembledGraph;
pub use dag::WiringDag;
pub use definition::*;
pub use validation::{GraphValidator, ValidationResult};

/// File looked up when no pipeline path is given
pub const DEFAULT_PIPELINE_FILE: &str = ".plugflow.yaml";
