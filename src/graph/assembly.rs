// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Assembly of a definition into live, wired stages

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::artifact::ArtifactBundle;
use crate::errors::{PlugflowError, PlugflowResult};
use crate::graph::{PipelineDefinition, StageKind, WiringDag};
use crate::stage::{
    self, connect, CollectingObserver, JoinStage, ProgressListener, RelayStage, SourceMode, Stage,
    TransformStage,
};
use crate::transforms::TransformRegistry;

/// A pipeline whose stages exist and are connected
///
/// Stages are wired in file order, so a stage's observers are notified in
/// the order the observing stages appear in the definition. Every stage
/// nobody observes gets a [`CollectingObserver`] registered last.
pub struct AssembledGraph {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
    index: HashMap<String, usize>,
    joins: HashMap<String, Arc<JoinStage>>,
    roots: Vec<String>,
    outputs: Vec<Arc<CollectingObserver>>,
}

impl AssembledGraph {
    /// Build and wire every stage of `definition`
    pub fn assemble(
        definition: &PipelineDefinition,
        registry: &TransformRegistry,
    ) -> PlugflowResult<Self> {
        let dag = WiringDag::build(definition)?;

        for stage in &definition.stages {
            if let Some(input) = stage
                .inputs
                .iter()
                .find(|i| i.mode() == SourceMode::Once && !stage.is_join())
            {
                return Err(PlugflowError::OnceInputOnNonJoin {
                    stage: stage.name.clone(),
                    input: input.source().to_string(),
                });
            }
        }

        let roots: Vec<String> = definition.roots().into_iter().map(String::from).collect();
        if let Some(missing) = roots.iter().find(|r| definition.get_stage(r).is_none()) {
            return Err(PlugflowError::UnknownStage {
                stage: missing.clone(),
            });
        }

        let mut stages: Vec<Arc<dyn Stage>> = Vec::with_capacity(definition.stages.len());
        let mut index = HashMap::new();
        let mut joins = HashMap::new();

        for stage_def in &definition.stages {
            let name = stage_def.name.clone();
            let stage: Arc<dyn Stage> = match &stage_def.kind {
                StageKind::Transform { transform, params } => {
                    let transform = registry.create(&name, transform, params)?;
                    Arc::new(TransformStage::new(name.clone(), transform))
                }
                StageKind::Relay => Arc::new(RelayStage::new(name.clone())),
                StageKind::Join => {
                    let join = Arc::new(JoinStage::new(name.clone()));
                    joins.insert(name.clone(), Arc::clone(&join));
                    join
                }
            };

            debug!(stage = %name, id = %stage.id(), kind = stage_def.kind_name(), "stage created");
            index.insert(name, stages.len());
            stages.push(stage);
        }

        for stage_def in &definition.stages {
            let target = &stages[index[&stage_def.name]];

            for input in &stage_def.inputs {
                let source = &stages[index[input.source()]];
                match joins.get(&stage_def.name) {
                    Some(join) => join.register_source(source, input.mode())?,
                    None => connect(source, target)?,
                }
            }
        }

        let mut outputs = Vec::new();
        for terminal in dag.terminals() {
            let collector = Arc::new(CollectingObserver::new(terminal.clone()));
            stages[index[&terminal]].register_observer(collector.clone());
            outputs.push(collector);
        }

        info!(
            pipeline = %definition.name,
            stages = stages.len(),
            joins = joins.len(),
            outputs = outputs.len(),
            "pipeline assembled"
        );

        Ok(Self {
            name: definition.name.clone(),
            stages,
            index,
            joins,
            roots,
            outputs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stages triggered by [`AssembledGraph::trigger_roots`]
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// All stages, in file order
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&Arc<dyn Stage>> {
        self.index.get(name).map(|i| &self.stages[*i])
    }

    fn require(&self, name: &str) -> PlugflowResult<&Arc<dyn Stage>> {
        self.stage(name).ok_or_else(|| PlugflowError::UnknownStage {
            stage: name.to_string(),
        })
    }

    /// The join stage called `name`
    pub fn join(&self, name: &str) -> PlugflowResult<&Arc<JoinStage>> {
        self.require(name)?;
        self.joins.get(name).ok_or_else(|| PlugflowError::NotAJoin {
            stage: name.to_string(),
        })
    }

    /// Collectors attached to the terminal stages, in file order
    pub fn outputs(&self) -> &[Arc<CollectingObserver>] {
        &self.outputs
    }

    /// Execute stage `name` with `input`, running everything downstream
    pub fn trigger(
        &self,
        name: &str,
        input: &ArtifactBundle,
    ) -> PlugflowResult<Option<ArtifactBundle>> {
        let stage = self.require(name)?;
        info!(pipeline = %self.name, stage = name, "triggering");
        stage.execute(input)
    }

    /// Trigger every root in order, each with an empty external bundle
    pub fn trigger_roots(&self) -> PlugflowResult<()> {
        for root in &self.roots {
            self.trigger(root, &ArtifactBundle::empty())?;
        }
        Ok(())
    }

    /// Publish whatever join `name` has buffered
    pub fn flush(&self, name: &str) -> PlugflowResult<Option<ArtifactBundle>> {
        self.join(name)?.flush()
    }

    /// Drop the partial cycle buffered by join `name`
    pub fn reset(&self, name: &str) -> PlugflowResult<()> {
        self.join(name)?.reset();
        Ok(())
    }

    /// Listen to progress from every stage
    pub fn add_progress_listener(&self, listener: Arc<dyn ProgressListener>) {
        for stage in &self.stages {
            stage.add_progress_listener(Arc::clone(&listener));
        }
    }

    pub fn trace(&self, name: &str) -> PlugflowResult<String> {
        Ok(stage::trace(&**self.require(name)?))
    }

    pub fn reverse_trace(&self, name: &str) -> PlugflowResult<String> {
        Ok(stage::reverse_trace(&**self.require(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{ProgressEvent, StageId};
    use serde_json::Value;
    use std::sync::{Barrier, Mutex};

    const COMBINE: &str = r#"
name: combine
stages:
  - name: reference
    type: transform
    transform: constant
    params: { artifacts: [ { name: ref, value: 1 } ] }
  - name: samples
    type: transform
    transform: constant
    params: { artifacts: [ { name: s, value: 2 } ] }
  - name: combine
    type: join
    inputs:
      - { from: reference, mode: once }
      - samples
run: [reference, samples]
"#;

    const CONVERGE: &str = r#"
name: converge
stages:
  - { name: left, type: relay }
  - { name: right, type: relay }
  - { name: join, type: join, inputs: [left, right] }
"#;

    fn assemble(yaml: &str) -> AssembledGraph {
        let definition = PipelineDefinition::from_yaml(yaml).unwrap();
        AssembledGraph::assemble(&definition, &TransformRegistry::with_builtins()).unwrap()
    }

    fn names(bundle: &ArtifactBundle) -> Vec<&str> {
        bundle.iter().map(|a| a.name()).collect()
    }

    #[test]
    fn test_trigger_roots_combines_once_and_iterative() {
        let graph = assemble(COMBINE);
        graph.trigger_roots().unwrap();

        let outputs = graph.outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name(), "combine");

        let bundles = outputs[0].bundles();
        assert_eq!(bundles.len(), 1);
        assert_eq!(names(&bundles[0]), vec!["ref", "s"]);
        assert_eq!(bundles[0].get(0).unwrap().value::<Value>(), Some(&Value::from(1)));
    }

    #[test]
    fn test_once_input_is_reused_and_never_redelivered() {
        let graph = assemble(COMBINE);
        graph.trigger_roots().unwrap();
        graph.trigger("samples", &ArtifactBundle::empty()).unwrap();

        assert_eq!(graph.join("combine").unwrap().emissions(), 2);
        assert_eq!(graph.outputs()[0].len(), 2);

        let err = graph.trigger("reference", &ArtifactBundle::empty()).unwrap_err();
        assert!(matches!(err, PlugflowError::OnceSourceRedelivered { .. }));
    }

    #[test]
    fn test_flush_and_reset_by_name() {
        let graph = assemble(CONVERGE);
        graph.trigger("left", &ArtifactBundle::external(vec![])).unwrap();

        let status = graph.join("join").unwrap().status();
        assert_eq!(status.iterative_filled, 1);

        graph.reset("join").unwrap();
        assert_eq!(graph.join("join").unwrap().status().iterative_filled, 0);

        // Empty bundles merge to nothing, so the flush has nothing to send
        graph.trigger("left", &ArtifactBundle::external(vec![])).unwrap();
        assert!(graph.flush("join").unwrap().is_none());
        assert!(graph.outputs()[0].is_empty());
    }

    #[test]
    fn test_join_lookup_errors() {
        let graph = assemble(CONVERGE);
        assert!(matches!(graph.flush("left"), Err(PlugflowError::NotAJoin { .. })));
        assert!(matches!(graph.reset("nowhere"), Err(PlugflowError::UnknownStage { .. })));
        assert!(matches!(
            graph.trigger("nowhere", &ArtifactBundle::empty()),
            Err(PlugflowError::UnknownStage { .. })
        ));
    }

    #[test]
    fn test_observers_follow_file_order() {
        let graph = assemble(
            r#"
name: fan
stages:
  - { name: root, type: relay }
  - { name: b, type: relay, inputs: [root] }
  - { name: a, type: relay, inputs: [root] }
"#,
        );

        let observers: Vec<String> = graph
            .stage("root")
            .unwrap()
            .core()
            .observers()
            .iter()
            .map(|o| o.observer_name().to_string())
            .collect();
        assert_eq!(observers, vec!["b", "a"]);

        let outputs: Vec<&str> = graph.outputs().iter().map(|o| o.name()).collect();
        assert_eq!(outputs, vec!["b", "a"]);
    }

    #[test]
    fn test_concurrent_roots_emit_once() {
        for _ in 0..50 {
            let graph = assemble(CONVERGE);
            let barrier = Barrier::new(2);

            std::thread::scope(|s| {
                for root in ["left", "right"] {
                    let graph = &graph;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        graph
                            .trigger(root, &ArtifactBundle::external(vec![]))
                            .unwrap();
                    });
                }
            });

            assert_eq!(graph.join("join").unwrap().emissions(), 1);
            assert_eq!(graph.outputs()[0].len(), 1);
        }
    }

    #[derive(Default)]
    struct Finished(Mutex<Vec<(StageId, String)>>);

    impl ProgressListener for Finished {
        fn progress(&self, event: &ProgressEvent) {
            if event.percent == 100 {
                self.0
                    .lock()
                    .unwrap()
                    .push((event.stage, event.stage_name.clone()));
            }
        }
    }

    #[test]
    fn test_progress_from_every_stage() {
        let graph = assemble(COMBINE);
        let finished = Arc::new(Finished::default());
        graph.add_progress_listener(finished.clone());

        graph.trigger_roots().unwrap();

        let names: Vec<String> = finished.0.lock().unwrap().iter().map(|(_, n)| n.clone()).collect();
        assert!(names.contains(&"reference".to_string()));
        assert!(names.contains(&"samples".to_string()));
    }

    #[test]
    fn test_trace_by_name() {
        let graph = assemble(COMBINE);
        let down = graph.trace("reference").unwrap();
        assert!(down.starts_with("reference\n"));
        assert!(down.contains("   combine\n"));
        assert!(down.contains("      combine [observer]\n"));

        let up = graph.reverse_trace("combine").unwrap();
        assert_eq!(up, "combine\n   reference\n   samples\n");
    }

    #[test]
    fn test_assembly_rejects_bad_wiring() {
        let registry = TransformRegistry::with_builtins();

        let once_on_relay = PipelineDefinition::from_yaml(
            r#"
name: bad
stages:
  - { name: a, type: relay }
  - { name: b, type: relay, inputs: [{ from: a, mode: once }] }
"#,
        )
        .unwrap();
        assert!(matches!(
            AssembledGraph::assemble(&once_on_relay, &registry),
            Err(PlugflowError::OnceInputOnNonJoin { .. })
        ));

        let unknown_transform = PipelineDefinition::from_yaml(
            "name: bad\nstages:\n  - { name: a, type: transform, transform: fasta }\n",
        )
        .unwrap();
        assert!(matches!(
            AssembledGraph::assemble(&unknown_transform, &registry),
            Err(PlugflowError::UnknownTransform { .. })
        ));

        let duplicate_join_input = PipelineDefinition::from_yaml(
            "name: bad\nstages:\n  - { name: a, type: relay }\n  - { name: j, type: join, inputs: [a, a] }\n",
        )
        .unwrap();
        assert!(matches!(
            AssembledGraph::assemble(&duplicate_join_input, &registry),
            Err(PlugflowError::DuplicateSource { .. })
        ));
    }
}
