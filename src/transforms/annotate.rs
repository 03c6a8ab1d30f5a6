// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! `annotate` - re-wraps each input artifact with a new annotation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parse_params;
use crate::artifact::{Artifact, ArtifactBundle};
use crate::errors::PlugflowResult;
use crate::stage::{Progress, Transform};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Annotate {
    #[serde(default)]
    pub annotation: String,
}

impl Annotate {
    pub fn from_params(params: &Value) -> PlugflowResult<Self> {
        parse_params("annotate", params)
    }
}

impl Transform for Annotate {
    fn transform(
        &self,
        input: &ArtifactBundle,
        progress: &Progress<'_>,
    ) -> anyhow::Result<Option<Vec<Artifact>>> {
        if input.is_empty() {
            return Ok(None);
        }

        let items = input
            .iter()
            .enumerate()
            .map(|(i, artifact)| {
                progress.report_fraction(i, input.len());
                artifact.reannotated(self.annotation.clone())
            })
            .collect();

        Ok(Some(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageCore;
    use serde_json::json;

    #[test]
    fn test_annotates_every_artifact() {
        let annotate = Annotate::from_params(&json!({ "annotation": "filtered" })).unwrap();
        let input = ArtifactBundle::external(vec![
            Artifact::new("a", 1).with_annotation("raw"),
            Artifact::new("b", 2),
        ]);

        let core = StageCore::new("annotate");
        let items = annotate.transform(&input, &Progress::new(&core)).unwrap().unwrap();

        assert!(items.iter().all(|a| a.annotation() == Some("filtered")));
        assert_eq!(input.get(0).unwrap().annotation(), Some("raw"));
    }
}
