// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions for fixing wiring mistakes.

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Suggest fixing a wiring cycle
    pub fn fix_circular_wiring(stages: &[String]) -> Self {
        Self {
            action: "Remove circular wiring".into(),
            steps: vec![
                format!("Detected cycle: {}", stages.join(" → ")),
                "A stage must never observe, directly or transitively, its own output".into(),
                "Use a relay stage to re-inject a bundle manually instead of looping".into(),
            ],
            commands: vec![
                "# Visualize your pipeline:".into(),
                "plugflow graph --format mermaid".into(),
            ],
        }
    }

    /// Suggest fixing an input that references nothing
    pub fn fix_unknown_input(stage: &str, input: &str) -> Self {
        Self {
            action: format!("Define stage '{}' or fix the input of '{}'", input, stage),
            steps: vec![
                format!("Stage '{}' lists '{}' in its inputs", stage, input),
                "Input names must match the name of another stage in the same file".into(),
            ],
            commands: vec![
                "# List the stages plugflow sees:".into(),
                "plugflow validate --verbose".into(),
            ],
        }
    }

    /// Suggest moving a once-input onto a join stage
    pub fn fix_once_input(stage: &str, input: &str) -> Self {
        Self {
            action: format!("Route '{}' through a join stage", input),
            steps: vec![
                format!("Stage '{}' is not a join, so it fires on every bundle it receives", stage),
                "Add a stage of type 'join' that takes the once-input and the iterative inputs".into(),
                format!("Then make '{}' take its input from that join", stage),
            ],
            commands: vec![],
        }
    }

    /// Suggest fixing a source that fires too often for its join
    pub fn fix_redelivery(join: &str, source: &str) -> Self {
        Self {
            action: format!("Check how often '{}' fires into '{}'", source, join),
            steps: vec![
                "Once-sources may deliver a single bundle for the lifetime of the graph".into(),
                "Iterative sources may deliver one bundle per combined emission".into(),
                format!(
                    "If '{}' legitimately fires more often, wire it through its own pipeline branch",
                    source
                ),
            ],
            commands: vec![
                "# Show everything upstream of the join:".into(),
                format!("plugflow trace --stage {} --reverse", join),
            ],
        }
    }

    /// Suggest creating a pipeline file
    pub fn create_definition() -> Self {
        Self {
            action: "Create a pipeline definition".into(),
            steps: vec![
                "No .plugflow.yaml found in current directory".into(),
                "Describe each stage, its type and its inputs".into(),
            ],
            commands: vec![
                "# Point plugflow at another file:".into(),
                "plugflow run path/to/pipeline.yaml".into(),
            ],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}
