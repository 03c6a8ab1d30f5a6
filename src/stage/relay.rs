// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Relay stage
//!
//! Forwards its input unchanged. Used to fan one bundle out to several
//! branches or to push a previously produced bundle back into the graph.

use std::sync::Arc;

use tracing::debug;

use super::{Notification, Observer, Stage, StageCore};
use crate::artifact::ArtifactBundle;
use crate::errors::PlugflowResult;

/// Stateless pass-through stage
///
/// The bundle keeps its original producer, but observers are notified with
/// the relay as the producer, so a join wired to a relay attributes the
/// bundle to the relay's slot.
#[derive(Debug)]
pub struct RelayStage {
    core: StageCore,
}

impl RelayStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: StageCore::new(name),
        }
    }
}

impl Observer for RelayStage {
    fn on_notification(&self, notification: &Notification) -> PlugflowResult<()> {
        self.execute(&notification.bundle).map(|_| ())
    }

    fn observer_name(&self) -> &str {
        self.core.name()
    }

    fn as_stage(&self) -> Option<&dyn Stage> {
        Some(self)
    }
}

impl Stage for RelayStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    // Publishes even an empty bundle: triggering a relay is an explicit
    // request to fire its branch.
    fn execute(&self, input: &ArtifactBundle) -> PlugflowResult<Option<ArtifactBundle>> {
        debug!(stage = %self.core.name(), artifacts = input.len(), "relaying");
        self.core.publish(input.clone())?;
        self.core.report_progress(100);
        Ok(Some(input.clone()))
    }

    fn into_observer(self: Arc<Self>) -> Arc<dyn Observer> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::stage::CollectingObserver;

    #[test]
    fn test_relay_fans_out_unchanged() {
        let relay = RelayStage::new("fan");
        let left = Arc::new(CollectingObserver::new("left"));
        let right = Arc::new(CollectingObserver::new("right"));
        relay.register_observer(left.clone());
        relay.register_observer(right.clone());

        let original_producer = crate::stage::StageId::next();
        let input = ArtifactBundle::new(vec![Artifact::new("a", 1), Artifact::new("b", 2)], original_producer);
        let output = relay.execute(&input).unwrap().unwrap();

        assert_eq!(output.len(), 2);
        assert_eq!(output.producer(), Some(original_producer));
        for sink in [&left, &right] {
            let seen = sink.notifications();
            assert_eq!(seen.len(), 1);
            assert_eq!(seen[0].producer, relay.id());
            assert_eq!(seen[0].bundle.get(1).unwrap().name(), "b");
        }
    }

    #[test]
    fn test_relay_forwards_empty_trigger() {
        let relay = RelayStage::new("kick");
        let sink = Arc::new(CollectingObserver::new("sink"));
        relay.register_observer(sink.clone());

        relay.execute(&ArtifactBundle::empty()).unwrap();

        assert_eq!(sink.len(), 1);
        assert!(sink.bundles()[0].is_empty());
    }
}
