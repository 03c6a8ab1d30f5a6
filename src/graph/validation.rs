// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Pipeline validation
//!
//! Validates a definition before any stage is built.

use std::collections::HashSet;

use crate::errors::{PlugflowError, PlugflowResult};
use crate::graph::{PipelineDefinition, StageDefinition, StageKind, WiringDag};
use crate::stage::SourceMode;
use crate::transforms::TransformRegistry;

/// Pipeline validator
pub struct GraphValidator;

impl GraphValidator {
    /// Validate a definition against the transforms in `registry`
    pub fn validate(
        definition: &PipelineDefinition,
        registry: &TransformRegistry,
    ) -> PlugflowResult<ValidationResult> {
        let mut result = ValidationResult::new();

        if definition.stages.is_empty() {
            result.add_error("Pipeline has no stages defined");
            return Ok(result);
        }

        let mut seen_names = HashSet::new();
        for stage in &definition.stages {
            if !seen_names.insert(stage.name.as_str()) {
                result.add_error(&format!("Duplicate stage name: '{}'", stage.name));
            }
        }

        for stage in &definition.stages {
            Self::validate_stage(stage, &seen_names, registry, &mut result);
        }

        // Cycles only make sense to look for once every name resolves
        if result.is_valid() {
            match WiringDag::build(definition) {
                Ok(_) => {}
                Err(PlugflowError::CircularDependency { stages }) => {
                    result.add_error(&format!("Circular wiring: {}", stages.join(" -> ")));
                }
                Err(e) => {
                    result.add_error(&format!("Wiring error: {}", e));
                }
            }
        }

        Self::validate_run(definition, &mut result);

        Ok(result)
    }

    /// Validate a single stage
    fn validate_stage(
        stage: &StageDefinition,
        names: &HashSet<&str>,
        registry: &TransformRegistry,
        result: &mut ValidationResult,
    ) {
        let mut seen_inputs = HashSet::new();

        for input in &stage.inputs {
            let source = input.source();

            if source == stage.name {
                result.add_error(&format!("Stage '{}': Takes input from itself", stage.name));
                continue;
            }

            if !names.contains(source) {
                result.add_error(&format!(
                    "Stage '{}': Input references unknown stage '{}'",
                    stage.name, source
                ));
            }

            if input.mode() == SourceMode::Once && !stage.is_join() {
                result.add_error(&format!(
                    "Stage '{}': Once-input '{}' is only allowed on join stages",
                    stage.name, source
                ));
            }

            if !seen_inputs.insert(source) {
                if stage.is_join() {
                    result.add_error(&format!(
                        "Stage '{}': Input '{}' is listed more than once",
                        stage.name, source
                    ));
                } else {
                    result.add_warning(&format!(
                        "Stage '{}': Input '{}' is listed more than once and will be delivered twice",
                        stage.name, source
                    ));
                }
            }
        }

        match &stage.kind {
            StageKind::Transform { transform, params } => {
                if let Err(e) = registry.create(&stage.name, transform, params) {
                    result.add_error(&format!("Stage '{}': {}", stage.name, e));
                }
            }
            StageKind::Join if stage.inputs.is_empty() => {
                result.add_warning(&format!(
                    "Stage '{}': Join without inputs never fires on its own",
                    stage.name
                ));
            }
            _ => {}
        }
    }

    /// Validate the root stages a run triggers
    fn validate_run(definition: &PipelineDefinition, result: &mut ValidationResult) {
        for root in &definition.run {
            match definition.get_stage(root) {
                None => result.add_error(&format!("Run list references unknown stage '{}'", root)),
                Some(stage) if !stage.inputs.is_empty() => result.add_warning(&format!(
                    "Run list triggers '{}', which also observes other stages",
                    root
                )),
                Some(_) => {}
            }
        }

        if definition.roots().is_empty() {
            result.add_error("Pipeline has no root stages; add a stage without inputs or a 'run' list");
        }
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
