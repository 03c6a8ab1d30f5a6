// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Wiring DAG for pipeline definitions
//!
//! Builds the producer -> observer graph of a definition, ensuring every
//! input exists and the wiring is acyclic before any stage is created.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use crate::errors::PlugflowError;
use crate::graph::PipelineDefinition;
use crate::stage::SourceMode;

/// Producer -> observer graph of a pipeline definition
pub struct WiringDag {
    graph: DiGraph<usize, SourceMode>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl WiringDag {
    /// Create an empty DAG
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build the DAG from a definition
    pub fn build(definition: &PipelineDefinition) -> Result<Self, PlugflowError> {
        let mut dag = Self::new();

        for (idx, stage) in definition.stages.iter().enumerate() {
            if dag.name_to_index.contains_key(&stage.name) {
                return Err(PlugflowError::DuplicateStage {
                    stage: stage.name.clone(),
                });
            }
            let node = dag.graph.add_node(idx);
            dag.name_to_index.insert(stage.name.clone(), node);
            dag.index_to_name.insert(node, stage.name.clone());
        }

        for stage in &definition.stages {
            let stage_node = dag.name_to_index[&stage.name];

            for input in &stage.inputs {
                let input_node = dag.name_to_index.get(input.source()).ok_or_else(|| {
                    PlugflowError::UnknownInput {
                        stage: stage.name.clone(),
                        input: input.source().to_string(),
                    }
                })?;

                dag.graph.add_edge(*input_node, stage_node, input.mode());
            }
        }

        dag.validate_acyclic()?;

        Ok(dag)
    }

    fn validate_acyclic(&self) -> Result<(), PlugflowError> {
        toposort(&self.graph, None)
            .map(|_| ())
            .map_err(|cycle| PlugflowError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Walk forward from `start` until the path returns to a visited stage
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let mut path = vec![start];
        let mut current = start;

        loop {
            let next = self
                .graph
                .neighbors_directed(current, Direction::Outgoing)
                .find(|n| petgraph::algo::has_path_connecting(&self.graph, *n, start, None));

            match next {
                Some(n) if n == start => {
                    path.push(n);
                    break;
                }
                Some(n) if !path.contains(&n) => {
                    path.push(n);
                    current = n;
                }
                _ => break,
            }
        }

        path.into_iter()
            .map(|n| self.index_to_name[&n].clone())
            .collect()
    }

    /// Definition indices in producer-before-observer order
    pub fn topological_order(&self) -> Result<Vec<usize>, PlugflowError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| PlugflowError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Stage names in producer-before-observer order
    pub fn topological_order_names(&self) -> Result<Vec<String>, PlugflowError> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .map(|n| self.index_to_name[&n].clone())
                    .collect()
            })
            .map_err(|cycle| PlugflowError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Stages a stage observes, with the mode of each input
    pub fn dependencies(&self, stage_name: &str) -> Option<Vec<(String, SourceMode)>> {
        let node = self.name_to_index.get(stage_name)?;
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(*node, Direction::Incoming)
            .map(|e| (self.index_to_name[&e.source()].clone(), *e.weight()))
            .collect();
        // petgraph yields the most recent edge first
        deps.reverse();
        Some(deps)
    }

    /// Stages observing a stage
    pub fn dependents(&self, stage_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(stage_name)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, Direction::Outgoing)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        deps.reverse();
        Some(deps)
    }

    /// Stages nobody observes
    pub fn terminals(&self) -> Vec<String> {
        self.graph
            .node_indices()
            .filter(|n| self.graph.neighbors_directed(*n, Direction::Outgoing).count() == 0)
            .map(|n| self.index_to_name[&n].clone())
            .collect()
    }

    /// Check if stage A is downstream (directly or transitively) of stage B
    pub fn depends_on(&self, stage_a: &str, stage_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(stage_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(stage_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Generate Mermaid diagram of the wiring; once inputs are dashed
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for node in self.graph.node_indices() {
            let name = &self.index_to_name[&node];
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for edge in self.graph.edge_references() {
            let from_name = &self.index_to_name[&edge.source()];
            let to_name = &self.index_to_name[&edge.target()];
            match edge.weight() {
                SourceMode::Once => {
                    out.push_str(&format!("    {} -.->|once| {}\n", from_name, to_name))
                }
                SourceMode::Iterative => {
                    out.push_str(&format!("    {} --> {}\n", from_name, to_name))
                }
            }
        }

        out
    }

    /// Generate DOT diagram of the wiring; once inputs are dashed
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for edge in self.graph.edge_references() {
            let from_name = &self.index_to_name[&edge.source()];
            let to_name = &self.index_to_name[&edge.target()];
            let style = match edge.weight() {
                SourceMode::Once => " [style=dashed, label=\"once\"]",
                SourceMode::Iterative => "",
            };
            out.push_str(&format!("    \"{}\" -> \"{}\"{};\n", from_name, to_name, style));
        }

        for node in self.graph.node_indices() {
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", self.index_to_name[&node]));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text listing of stages in wiring order
    pub fn to_text(&self, definition: &PipelineDefinition) -> Result<String, PlugflowError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, idx) in order.iter().enumerate() {
            let stage = &definition.stages[*idx];
            let deps = self.dependencies(&stage.name).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, stage.name, stage.kind_name()));

            if !deps.is_empty() {
                let inputs: Vec<String> = deps
                    .iter()
                    .map(|(name, mode)| match mode {
                        SourceMode::Once => format!("{} (once)", name),
                        SourceMode::Iterative => name.clone(),
                    })
                    .collect();
                out.push_str(&format!(" [inputs: {}]", inputs.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for WiringDag {
    fn default() -> Self {
        Self::new()
    }
}
