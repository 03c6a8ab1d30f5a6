// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! `constant` - emits a fixed list of JSON artifacts

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parse_params;
use crate::artifact::{Artifact, ArtifactBundle};
use crate::errors::PlugflowResult;
use crate::stage::{Progress, Transform};

/// Kind given to JSON artifacts that do not declare one
pub const JSON_KIND: &str = "json";

/// One artifact to emit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantArtifact {
    pub name: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
}

/// Emits its configured artifacts every time it runs; the input is ignored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Constant {
    #[serde(default)]
    pub artifacts: Vec<ConstantArtifact>,
}

impl Constant {
    pub fn from_params(params: &Value) -> PlugflowResult<Self> {
        parse_params("constant", params)
    }
}

impl Transform for Constant {
    fn transform(
        &self,
        _input: &ArtifactBundle,
        progress: &Progress<'_>,
    ) -> anyhow::Result<Option<Vec<Artifact>>> {
        let total = self.artifacts.len();
        let mut items = Vec::with_capacity(total);

        for (i, entry) in self.artifacts.iter().enumerate() {
            let kind = entry.kind.clone().unwrap_or_else(|| JSON_KIND.to_string());
            let mut artifact = Artifact::new(entry.name.clone(), entry.value.clone()).with_kind(kind);
            if let Some(annotation) = &entry.annotation {
                artifact = artifact.with_annotation(annotation.clone());
            }
            items.push(artifact);
            progress.report_fraction(i + 1, total);
        }

        Ok(Some(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageCore;
    use serde_json::json;

    #[test]
    fn test_emits_configured_artifacts() {
        let constant = Constant::from_params(&json!({
            "artifacts": [
                { "name": "reference", "value": { "build": 38 }, "annotation": "genome build" },
                { "name": "threshold", "value": 0.05, "kind": "number" }
            ]
        }))
        .unwrap();

        let core = StageCore::new("constant");
        let items = constant
            .transform(&ArtifactBundle::empty(), &Progress::new(&core))
            .unwrap()
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind().unwrap().as_str(), JSON_KIND);
        assert_eq!(items[0].annotation(), Some("genome build"));
        assert_eq!(items[0].value::<Value>().unwrap()["build"], 38);
        assert_eq!(items[1].kind().unwrap().as_str(), "number");
    }

    #[test]
    fn test_null_params_mean_nothing_to_emit() {
        let constant = Constant::from_params(&Value::Null).unwrap();
        assert!(constant.artifacts.is_empty());
    }
}
