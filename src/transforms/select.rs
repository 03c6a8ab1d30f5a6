// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! `select` - keeps the input artifacts matching a kind and name filter

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parse_params;
use crate::artifact::{Artifact, ArtifactBundle, ArtifactKind};
use crate::errors::PlugflowResult;
use crate::stage::{Progress, Transform};

/// Empty filters match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Select {
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub names: Vec<String>,
    /// Treat an empty selection as a failure instead of "no result"
    #[serde(default)]
    pub required: bool,
}

impl Select {
    pub fn from_params(params: &Value) -> PlugflowResult<Self> {
        parse_params("select", params)
    }
}

impl Transform for Select {
    fn transform(
        &self,
        input: &ArtifactBundle,
        _progress: &Progress<'_>,
    ) -> anyhow::Result<Option<Vec<Artifact>>> {
        let kinds: Vec<ArtifactKind> = self.kinds.iter().map(ArtifactKind::new).collect();
        let selected: Vec<Artifact> = input
            .of_kinds_with_names(&kinds, self.names.as_slice())
            .into_iter()
            .cloned()
            .collect();

        if selected.is_empty() {
            if self.required {
                anyhow::bail!("no artifact matched kinds {:?} names {:?}", self.kinds, self.names);
            }
            return Ok(None);
        }

        Ok(Some(selected))
    }
}
