// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Built-in transforms and the registry that names them
//!
//! Domain transforms live outside this crate; they plug in by registering
//! a factory under a name that pipeline files can refer to.

mod annotate;
mod constant;
mod select;

pub use annotate::Annotate;
pub use constant::{Constant, ConstantArtifact, JSON_KIND};
pub use select::Select;

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{PlugflowError, PlugflowResult};
use crate::stage::Transform;

/// Builds a transform from its parameters
pub type TransformFactory =
    Box<dyn Fn(&Value) -> PlugflowResult<Box<dyn Transform>> + Send + Sync>;

/// Name-keyed transform factories
pub struct TransformRegistry {
    factories: BTreeMap<String, TransformFactory>,
}

impl TransformRegistry {
    /// Registry with nothing in it
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry holding `constant`, `select` and `annotate`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("constant", |params| {
            Ok(Box::new(Constant::from_params(params)?) as Box<dyn Transform>)
        });
        registry.register("select", |params| {
            Ok(Box::new(Select::from_params(params)?) as Box<dyn Transform>)
        });
        registry.register("annotate", |params| {
            Ok(Box::new(Annotate::from_params(params)?) as Box<dyn Transform>)
        });
        registry
    }

    /// Register (or replace) a factory
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&Value) -> PlugflowResult<Box<dyn Transform>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the transform used by `stage`
    pub fn create(&self, stage: &str, name: &str, params: &Value) -> PlugflowResult<Box<dyn Transform>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| PlugflowError::unknown_transform(stage, name, &self.names()))?;
        factory(params)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Deserialize transform parameters; `null` means "all defaults"
pub(crate) fn parse_params<P>(transform: &str, params: &Value) -> PlugflowResult<P>
where
    P: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(P::default());
    }

    serde_json::from_value(params.clone()).map_err(|e| PlugflowError::InvalidParams {
        transform: transform.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_are_registered() {
        let registry = TransformRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["annotate", "constant", "select"]);
    }

    #[test]
    fn test_unknown_transform() {
        let registry = TransformRegistry::with_builtins();
        let err = registry.create("load", "fasta", &Value::Null).err().unwrap();
        assert!(matches!(err, PlugflowError::UnknownTransform { .. }));
    }

    #[test]
    fn test_bad_params_are_reported() {
        let registry = TransformRegistry::with_builtins();
        let err = registry
            .create("load", "constant", &json!({ "artifacts": "not a list" }))
            .err()
            .unwrap();
        assert!(matches!(err, PlugflowError::InvalidParams { ref transform, .. } if transform == "constant"));
    }

    #[test]
    fn test_custom_factory() {
        let mut registry = TransformRegistry::new();
        registry.register("noop", |_params| {
            Ok(Box::new(Select::default()) as Box<dyn Transform>)
        });
        assert!(registry.contains("noop"));
        assert!(registry.create("s", "noop", &Value::Null).is_ok());
    }
}
