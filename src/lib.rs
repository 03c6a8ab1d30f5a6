// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! # plugflow - Dataflow Execution Core
//!
//! `plugflow` runs pipelines of stages that publish bundles of artifacts to
//! the stages observing them.
//!
//! ## Features
//!
//! - **Synchronous notification** - observers run in registration order
//! - **Fan-in joins** - combine once and iterative inputs into one bundle
//! - **Relays** - fan a bundle out or push it back into the graph
//! - **Declarative wiring** - describe the graph in `.plugflow.yaml`
//!
//! ## Quick Start
//!
//! ```bash
//! # Check the wiring
//! plugflow validate
//!
//! # Trigger the root stages
//! plugflow run
//!
//! # Draw the graph
//! plugflow graph --format mermaid
//! ```

pub mod artifact;
pub mod cli;
pub mod errors;
pub mod graph;
pub mod stage;
pub mod transforms;
pub mod utils;

// Re-export commonly used types
pub use artifact::{Artifact, ArtifactBundle, ArtifactKind};
pub use errors::{PlugflowError, PlugflowResult};
pub use graph::{AssembledGraph, PipelineDefinition};
pub use stage::{
    connect, JoinStage, Notification, Observer, RelayStage, SourceMode, Stage, StageId,
    TransformStage,
};
pub use transforms::TransformRegistry;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
