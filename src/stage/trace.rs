// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Indented text views of the live wiring around a stage

use std::collections::HashSet;
use std::fmt::Write;

use super::{Stage, StageId};

const INDENT: usize = 3;

/// Everything downstream of `stage`, one observer per line
pub fn trace(stage: &dyn Stage) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    trace_down(stage, 0, &mut seen, &mut out);
    out
}

/// Everything upstream of `stage`, one input per line
pub fn reverse_trace(stage: &dyn Stage) -> String {
    let mut out = String::new();
    let mut seen = HashSet::new();
    trace_up(stage, 0, &mut seen, &mut out);
    out
}

fn trace_down(stage: &dyn Stage, depth: usize, seen: &mut HashSet<StageId>, out: &mut String) {
    if !seen.insert(stage.id()) {
        let _ = writeln!(out, "{:indent$}{} (see above)", "", stage.name(), indent = depth * INDENT);
        return;
    }
    let _ = writeln!(out, "{:indent$}{}", "", stage.name(), indent = depth * INDENT);

    for observer in stage.core().observers() {
        match observer.as_stage() {
            Some(next) => trace_down(next, depth + 1, seen, out),
            None => {
                let _ = writeln!(
                    out,
                    "{:indent$}{} [observer]",
                    "",
                    observer.observer_name(),
                    indent = (depth + 1) * INDENT
                );
            }
        }
    }
}

fn trace_up(stage: &dyn Stage, depth: usize, seen: &mut HashSet<StageId>, out: &mut String) {
    if !seen.insert(stage.id()) {
        let _ = writeln!(out, "{:indent$}{} (see above)", "", stage.name(), indent = depth * INDENT);
        return;
    }
    let _ = writeln!(out, "{:indent$}{}", "", stage.name(), indent = depth * INDENT);

    for input in stage.core().inputs() {
        trace_up(&*input, depth + 1, seen, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{connect, CollectingObserver, JoinStage, RelayStage};
    use std::sync::Arc;

    #[test]
    fn test_trace_both_directions() {
        let root: Arc<dyn Stage> = Arc::new(RelayStage::new("root"));
        let left: Arc<dyn Stage> = Arc::new(RelayStage::new("left"));
        let right: Arc<dyn Stage> = Arc::new(RelayStage::new("right"));
        let join = Arc::new(JoinStage::new("join"));
        connect(&root, &left).unwrap();
        connect(&root, &right).unwrap();
        join.register_iterative_source(&left).unwrap();
        join.register_iterative_source(&right).unwrap();
        join.register_observer(Arc::new(CollectingObserver::new("sink")));

        let down = trace(&*root);
        assert_eq!(
            down,
            "root\n   left\n      join\n         sink [observer]\n   right\n      join (see above)\n"
        );

        let up = reverse_trace(&*join);
        assert_eq!(up, "join\n   left\n      root\n   right\n      root (see above)\n");
    }
}
