// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for .plugflow.yaml files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::errors::{PlugflowError, PlugflowResult};
use crate::stage::SourceMode;

/// Pipeline definition from .plugflow.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Definition version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Stages, in wiring order
    pub stages: Vec<StageDefinition>,

    /// Root stages to trigger (default: every stage without inputs)
    #[serde(default)]
    pub run: Vec<String>,
}

fn default_version() -> String {
    "1".to_string()
}

impl PipelineDefinition {
    /// Load a definition, picking the format from the file extension
    pub fn from_file(path: &Path) -> PlugflowResult<Self> {
        if !path.exists() {
            return Err(PlugflowError::DefinitionNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PlugflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse definition from YAML string
    pub fn from_yaml(yaml: &str) -> PlugflowResult<Self> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse definition from JSON string
    pub fn from_json(json: &str) -> PlugflowResult<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    /// Parse definition from TOML string
    pub fn from_toml(toml: &str) -> PlugflowResult<Self> {
        toml::from_str(toml).map_err(Into::into)
    }

    /// Serialize definition to YAML
    pub fn to_yaml(&self) -> PlugflowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&StageDefinition> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get all stage names
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    /// Stages triggered by a run: the `run` list, or every stage without inputs
    pub fn roots(&self) -> Vec<&str> {
        if self.run.is_empty() {
            self.stages
                .iter()
                .filter(|s| s.inputs.is_empty())
                .map(|s| s.name.as_str())
                .collect()
        } else {
            self.run.iter().map(String::as_str).collect()
        }
    }
}

/// A single stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage name (must be unique within the pipeline)
    pub name: String,

    /// Stage description
    #[serde(default)]
    pub description: Option<String>,

    /// What the stage does
    #[serde(flatten)]
    pub kind: StageKind,

    /// Upstream stages this stage observes, in registration order
    #[serde(default)]
    pub inputs: Vec<InputRef>,
}

impl StageDefinition {
    /// Short label for listings
    pub fn kind_name(&self) -> &str {
        match &self.kind {
            StageKind::Transform { transform, .. } => transform,
            StageKind::Relay => "relay",
            StageKind::Join => "join",
        }
    }

    pub fn is_join(&self) -> bool {
        matches!(self.kind, StageKind::Join)
    }
}

/// Stage type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StageKind {
    /// Runs a named transform from the registry
    Transform {
        /// Registry name of the transform
        transform: String,

        /// Transform parameters
        #[serde(default)]
        params: Value,
    },

    /// Forwards its input unchanged
    Relay,

    /// Combines its inputs once every one of them has delivered
    Join,
}

/// Reference to an upstream stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputRef {
    /// Plain stage name (iterative)
    Name(String),

    /// Stage name with an explicit mode
    Detailed {
        /// Name of the upstream stage
        from: String,
        /// Once or iterative
        #[serde(default)]
        mode: SourceMode,
    },
}

impl InputRef {
    /// Name of the upstream stage
    pub fn source(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed { from, .. } => from,
        }
    }

    pub fn mode(&self) -> SourceMode {
        match self {
            Self::Name(_) => SourceMode::Iterative,
            Self::Detailed { mode, .. } => *mode,
        }
    }
}
