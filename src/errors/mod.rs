// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Error types with actionable messages
//!
//! Protocol violations are wiring bugs and abort the notification chain
//! that triggered them. Transform failures never show up here: the stage
//! boundary turns them into "no result".

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::stage::StageId;

/// Result type for plugflow operations
pub type PlugflowResult<T> = Result<T, PlugflowError>;

/// Main error type for plugflow
#[derive(Error, Debug, Diagnostic)]
pub enum PlugflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Protocol Violations
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Join '{join}' received a second bundle from once-source '{source_name}' ({source_id})")]
    #[diagnostic(
        code(plugflow::once_source_redelivered),
        help("A once-source must deliver exactly one bundle for the lifetime of the graph. Wire '{source_name}' as an iterative input instead.")
    )]
    OnceSourceRedelivered {
        join: String,
        source_name: String,
        source_id: StageId,
    },

    #[error("Join '{join}' received a new bundle from iterative source '{source_name}' ({source_id}) before the previous one was combined")]
    #[diagnostic(
        code(plugflow::iterative_source_redelivered),
        help("Every iterative source must fire once per cycle. Check that the other inputs of '{join}' are firing.")
    )]
    IterativeSourceRedelivered {
        join: String,
        source_name: String,
        source_id: StageId,
    },

    #[error("Join '{join}' can not receive data from unknown source '{source_name}' ({source_id})")]
    #[diagnostic(
        code(plugflow::unknown_source),
        help("Register the source with register_once_source or register_iterative_source before executing the graph")
    )]
    UnknownSource {
        join: String,
        source_name: String,
        source_id: StageId,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Wiring Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{source_name}' is already an input of join '{join}'")]
    #[diagnostic(code(plugflow::duplicate_source))]
    DuplicateSource { join: String, source_name: String },

    #[error("Stage '{stage}' can not observe itself")]
    #[diagnostic(code(plugflow::self_source))]
    SelfSource { stage: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Definition Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(plugflow::definition_not_found),
        help("Create a .plugflow.yaml describing your stages and their inputs")
    )]
    DefinitionNotFound { path: PathBuf },

    #[error("Invalid pipeline definition: {reason}")]
    #[diagnostic(code(plugflow::invalid_definition))]
    InvalidDefinition {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Stage name '{stage}' is defined more than once")]
    #[diagnostic(code(plugflow::duplicate_stage))]
    DuplicateStage { stage: String },

    #[error("Stage '{stage}' takes input from unknown stage '{input}'")]
    #[diagnostic(
        code(plugflow::unknown_input),
        help("Check that '{input}' is defined in your pipeline")
    )]
    UnknownInput { stage: String, input: String },

    #[error("Stage '{stage}' not found in pipeline")]
    #[diagnostic(code(plugflow::unknown_stage))]
    UnknownStage { stage: String },

    #[error("Stage '{stage}' uses unknown transform '{transform}'")]
    #[diagnostic(code(plugflow::unknown_transform))]
    UnknownTransform {
        stage: String,
        transform: String,
        #[help]
        help: Option<String>,
    },

    #[error("Invalid parameters for transform '{transform}': {reason}")]
    #[diagnostic(code(plugflow::invalid_params))]
    InvalidParams { transform: String, reason: String },

    #[error("Circular wiring detected")]
    #[diagnostic(
        code(plugflow::circular_dependency),
        help("Review your stage inputs to remove the cycle")
    )]
    CircularDependency { stages: Vec<String> },

    #[error("Stage '{stage}' declares once-input '{input}' but is not a join stage")]
    #[diagnostic(
        code(plugflow::once_input_on_non_join),
        help("Only stages of type 'join' distinguish once and iterative inputs")
    )]
    OnceInputOnNonJoin { stage: String, input: String },

    #[error("Stage '{stage}' is not a join stage")]
    #[diagnostic(code(plugflow::not_a_join))]
    NotAJoin { stage: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(plugflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(plugflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(plugflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(plugflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(plugflow::toml_error))]
    Toml { message: String },
}

impl From<std::io::Error> for PlugflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PlugflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PlugflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for PlugflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl PlugflowError {
    /// Whether this error is a join protocol violation (a wiring bug
    /// detected at run time)
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::OnceSourceRedelivered { .. }
                | Self::IterativeSourceRedelivered { .. }
                | Self::UnknownSource { .. }
        )
    }

    /// Create an unknown transform error listing what is available
    pub fn unknown_transform(stage: &str, transform: &str, available: &[&str]) -> Self {
        let help = if available.is_empty() {
            None
        } else {
            Some(format!("Available transforms: {}", available.join(", ")))
        };

        Self::UnknownTransform {
            stage: stage.to_string(),
            transform: transform.to_string(),
            help,
        }
    }

    /// Recovery steps for this error, if there are any worth showing
    pub fn recovery(&self) -> Option<RecoverySuggestion> {
        match self {
            Self::CircularDependency { stages } => {
                Some(RecoverySuggestion::fix_circular_wiring(stages))
            }
            Self::UnknownInput { stage, input } => {
                Some(RecoverySuggestion::fix_unknown_input(stage, input))
            }
            Self::OnceInputOnNonJoin { stage, input } => {
                Some(RecoverySuggestion::fix_once_input(stage, input))
            }
            Self::OnceSourceRedelivered {
                join, source_name, ..
            }
            | Self::IterativeSourceRedelivered {
                join, source_name, ..
            } => Some(RecoverySuggestion::fix_redelivery(join, source_name)),
            Self::DefinitionNotFound { .. } => Some(RecoverySuggestion::create_definition()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_violation_classification() {
        let err = PlugflowError::UnknownSource {
            join: "combine".into(),
            source_name: "stray".into(),
            source_id: StageId::next(),
        };
        assert!(err.is_protocol_violation());

        let err = PlugflowError::UnknownStage {
            stage: "missing".into(),
        };
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn test_violation_message_names_both_stages() {
        let id = StageId::next();
        let err = PlugflowError::OnceSourceRedelivered {
            join: "combine".into(),
            source_name: "reference".into(),
            source_id: id,
        };
        let message = err.to_string();
        assert!(message.contains("combine"));
        assert!(message.contains("reference"));
        assert!(message.contains(&id.to_string()));
    }

    #[test]
    fn test_unknown_transform_lists_available() {
        let err = PlugflowError::unknown_transform("load", "fasta", &["constant", "select"]);
        match err {
            PlugflowError::UnknownTransform { help, .. } => {
                assert_eq!(help.unwrap(), "Available transforms: constant, select");
            }
            _ => panic!("Expected UnknownTransform"),
        }
    }
}
