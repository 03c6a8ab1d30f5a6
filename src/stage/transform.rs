// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Adapter turning a domain transform into a stage

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Notification, Observer, Progress, Stage, StageCore};
use crate::artifact::{Artifact, ArtifactBundle};
use crate::errors::PlugflowResult;

/// A domain computation run by a [`TransformStage`]
///
/// Implementations must not assume anything about the graph around them.
/// Returning `Ok(None)` or an error both mean "nothing produced"; the
/// error is logged at the stage boundary and never propagates.
pub trait Transform: Send + Sync {
    fn transform(
        &self,
        input: &ArtifactBundle,
        progress: &Progress<'_>,
    ) -> anyhow::Result<Option<Vec<Artifact>>>;
}

impl<T: Transform + ?Sized> Transform for Box<T> {
    fn transform(
        &self,
        input: &ArtifactBundle,
        progress: &Progress<'_>,
    ) -> anyhow::Result<Option<Vec<Artifact>>> {
        (**self).transform(input, progress)
    }
}

/// [`Transform`] backed by a closure
pub struct FnTransform<F>(F);

impl<F> Transform for FnTransform<F>
where
    F: Fn(&ArtifactBundle, &Progress<'_>) -> anyhow::Result<Option<Vec<Artifact>>> + Send + Sync,
{
    fn transform(
        &self,
        input: &ArtifactBundle,
        progress: &Progress<'_>,
    ) -> anyhow::Result<Option<Vec<Artifact>>> {
        (self.0)(input, progress)
    }
}

/// Stage that runs a [`Transform`] and publishes non-empty results
pub struct TransformStage<T> {
    core: StageCore,
    transform: T,
}

impl<T: Transform> TransformStage<T> {
    pub fn new(name: impl Into<String>, transform: T) -> Self {
        Self {
            core: StageCore::new(name),
            transform,
        }
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }
}

impl<F> TransformStage<FnTransform<F>> {
    /// Stage running the given closure
    pub fn from_fn(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ArtifactBundle, &Progress<'_>) -> anyhow::Result<Option<Vec<Artifact>>>
            + Send
            + Sync,
    {
        Self::new(name, FnTransform(f))
    }
}

impl<T: Transform + 'static> Observer for TransformStage<T> {
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

impl<T: Transform + 'static> Stage for TransformStage<T> {
    fn core(&self) -> &StageCore {
        &self.core
    }

    fn execute(&self, input: &ArtifactBundle) -> PlugflowResult<Option<ArtifactBundle>> {
        debug!(stage = %self.core.name(), artifacts = input.len(), "executing");

        let progress = Progress::new(&self.core);
        let outcome = self.transform.transform(input, &progress);

        let result = match outcome {
            Ok(Some(items)) => {
                let bundle = ArtifactBundle::new(items, self.core.id());
                if bundle.is_empty() {
                    debug!(stage = %self.core.name(), "empty result; nothing published");
                    Ok(Some(bundle))
                } else {
                    self.core.publish(bundle.clone()).map(|()| Some(bundle))
                }
            }
            Ok(None) => {
                debug!(stage = %self.core.name(), "no result");
                Ok(None)
            }
            Err(err) => {
                warn!(stage = %self.core.name(), error = %err, "transform failed; nothing published");
                Ok(None)
            }
        };

        progress.report(100);
        result
    }

    fn into_observer(self: Arc<Self>) -> Arc<dyn Observer> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{connect, CollectingObserver};
    use anyhow::bail;

    fn doubler(name: &str) -> Arc<dyn Stage> {
        Arc::new(TransformStage::from_fn(name, |input, _progress| {
            let items = input
                .iter()
                .filter_map(|a| a.value::<i32>().map(|v| Artifact::new(a.name(), v * 2)))
                .collect();
            Ok(Some(items))
        }))
    }

    #[test]
    fn test_result_is_published_with_own_identity() {
        let stage = doubler("double");
        let sink = Arc::new(CollectingObserver::new("sink"));
        stage.register_observer(sink.clone());

        let input = ArtifactBundle::external(vec![Artifact::new("n", 21)]);
        let output = stage.execute(&input).unwrap().unwrap();

        assert_eq!(output.producer(), Some(stage.id()));
        assert_eq!(output.get(0).unwrap().value::<i32>(), Some(&42));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.notifications()[0].producer, stage.id());
        // Input is left alone
        assert_eq!(input.get(0).unwrap().value::<i32>(), Some(&21));
    }

    #[test]
    fn test_failure_publishes_nothing() {
        let stage: Arc<dyn Stage> = Arc::new(TransformStage::from_fn("broken", |_input, _progress| {
            bail!("could not parse input")
        }));
        let sink = Arc::new(CollectingObserver::new("sink"));
        stage.register_observer(sink.clone());

        let output = stage.execute(&ArtifactBundle::empty()).unwrap();

        assert!(output.is_none());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_empty_result_is_not_published() {
        let stage: Arc<dyn Stage> = Arc::new(TransformStage::from_fn("quiet", |_input, _progress| {
            Ok(Some(Vec::new()))
        }));
        let sink = Arc::new(CollectingObserver::new("sink"));
        stage.register_observer(sink.clone());

        let output = stage.execute(&ArtifactBundle::empty()).unwrap();

        assert!(output.unwrap().is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_downstream_stage_reenters_execute() {
        let first = doubler("first");
        let second = doubler("second");
        let sink = Arc::new(CollectingObserver::new("sink"));
        connect(&first, &second).unwrap();
        second.register_observer(sink.clone());

        first
            .execute(&ArtifactBundle::external(vec![Artifact::new("n", 5)]))
            .unwrap();

        let bundles = sink.bundles();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].get(0).unwrap().value::<i32>(), Some(&20));
        assert_eq!(second.core().inputs()[0].id(), first.id());
    }

    #[test]
    fn test_connect_rejects_self() {
        let stage = doubler("loop");
        assert!(connect(&stage, &stage).is_err());
    }
}
