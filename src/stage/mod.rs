// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Stages and the notification protocol
//!
//! A stage consumes an [`ArtifactBundle`], produces a new one (or nothing),
//! and delivers a [`Notification`] to every registered [`Observer`] in
//! registration order. Delivery is synchronous: each observer, including
//! whatever it triggers downstream, runs to completion before the next one
//! is notified. The first observer error stops delivery and is returned to
//! whoever called `execute`.

mod collect;
mod join;
mod relay;
mod trace;
mod transform;

pub use collect::CollectingObserver;
pub use join::{JoinStage, JoinStatus, SourceMode};
pub use relay::RelayStage;
pub use trace::{reverse_trace, trace};
pub use transform::{FnTransform, Transform, TransformStage};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, warn};

use crate::artifact::ArtifactBundle;
use crate::errors::{PlugflowError, PlugflowResult};

/// Identity of a stage instance
///
/// Allocated once per constructed stage; two stages never share an id even
/// when they are configured identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(u64);

static NEXT_STAGE_ID: AtomicU64 = AtomicU64::new(1);

impl StageId {
    /// Allocate a fresh identity
    pub fn next() -> Self {
        Self(NEXT_STAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage#{}", self.0)
    }
}

/// Completion event delivered to observers
#[derive(Debug, Clone)]
pub struct Notification {
    /// The bundle the producer published
    pub bundle: ArtifactBundle,
    /// Stage that published it
    pub producer: StageId,
    /// Name of that stage, for diagnostics
    pub producer_name: String,
}

/// Receiver of completion notifications
pub trait Observer: Send + Sync {
    /// Handle a notification. Errors abort the notification chain.
    fn on_notification(&self, notification: &Notification) -> PlugflowResult<()>;

    /// Name shown in traces
    fn observer_name(&self) -> &str {
        "observer"
    }

    /// The stage behind this observer, when it is one
    fn as_stage(&self) -> Option<&dyn Stage> {
        None
    }
}

/// Progress update from a running stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: StageId,
    pub stage_name: String,
    /// Percentage, 0 to 100 inclusive
    pub percent: u8,
}

/// Advisory progress telemetry; never affects control flow
pub trait ProgressListener: Send + Sync {
    fn progress(&self, event: &ProgressEvent);
}

/// A unit of work in the dataflow graph
///
/// Every stage is also an [`Observer`]: wiring a stage downstream of
/// another makes it re-enter [`Stage::execute`] with each delivered bundle.
pub trait Stage: Observer {
    /// Shared identity, observer and progress bookkeeping
    fn core(&self) -> &StageCore;

    /// Run this stage on `input`
    ///
    /// `Ok(None)` means "no result": nothing was published. Errors are
    /// protocol violations raised somewhere in the notification chain.
    fn execute(&self, input: &ArtifactBundle) -> PlugflowResult<Option<ArtifactBundle>>;

    /// Convert a shared handle to this stage into an observer handle
    fn into_observer(self: Arc<Self>) -> Arc<dyn Observer>;

    fn id(&self) -> StageId {
        self.core().id()
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Add an observer. Adding the same observer twice notifies it twice.
    fn register_observer(&self, observer: Arc<dyn Observer>) {
        self.core().register_observer(observer);
    }

    fn add_progress_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.core().add_progress_listener(listener);
    }
}

/// Bookkeeping shared by every stage implementation
pub struct StageCore {
    id: StageId,
    name: String,
    observers: RwLock<Vec<Arc<dyn Observer>>>,
    progress_listeners: RwLock<Vec<Arc<dyn ProgressListener>>>,
    inputs: RwLock<Vec<Weak<dyn Stage>>>,
}

impl StageCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: StageId::next(),
            name: name.into(),
            observers: RwLock::new(Vec::new()),
            progress_listeners: RwLock::new(Vec::new()),
            inputs: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn register_observer(&self, observer: Arc<dyn Observer>) {
        debug!(stage = %self.name, observer = observer.observer_name(), "observer registered");
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Snapshot of the registered observers, in registration order
    pub fn observers(&self) -> Vec<Arc<dyn Observer>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn add_progress_listener(&self, listener: Arc<dyn ProgressListener>) {
        self.progress_listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Remember `source` as an upstream input of this stage
    pub fn record_input(&self, source: &Arc<dyn Stage>) {
        self.inputs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(source));
    }

    /// Upstream stages that are still alive, in wiring order
    pub fn inputs(&self) -> Vec<Arc<dyn Stage>> {
        self.inputs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Deliver `bundle` to every observer in registration order
    ///
    /// The observer list is snapshotted first so handlers may wire new
    /// observers without deadlocking.
    pub fn publish(&self, bundle: ArtifactBundle) -> PlugflowResult<()> {
        let observers = self.observers();
        if observers.is_empty() {
            debug!(stage = %self.name, "no observers; terminal stage");
            return Ok(());
        }

        let notification = Notification {
            bundle,
            producer: self.id,
            producer_name: self.name.clone(),
        };

        for observer in observers {
            debug!(
                stage = %self.name,
                observer = observer.observer_name(),
                artifacts = notification.bundle.len(),
                "notifying"
            );
            observer.on_notification(&notification)?;
        }

        Ok(())
    }

    /// Report progress; values above 100 are clamped
    pub fn report_progress(&self, percent: u8) {
        let percent = if percent > 100 {
            warn!(stage = %self.name, percent, "progress above 100 clamped");
            100
        } else {
            percent
        };

        let listeners = self
            .progress_listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if listeners.is_empty() {
            return;
        }

        let event = ProgressEvent {
            stage: self.id,
            stage_name: self.name.clone(),
            percent,
        };
        for listener in listeners {
            listener.progress(&event);
        }
    }
}

impl fmt::Debug for StageCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("observers", &self.observer_count())
            .finish_non_exhaustive()
    }
}

/// Progress handle given to a running transform
pub struct Progress<'a> {
    core: &'a StageCore,
}

impl<'a> Progress<'a> {
    pub fn new(core: &'a StageCore) -> Self {
        Self { core }
    }

    /// Report a percentage between 0 and 100
    pub fn report(&self, percent: u8) {
        self.core.report_progress(percent);
    }

    /// Report `done` out of `total` units of work
    pub fn report_fraction(&self, done: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = (done.min(total) * 100 / total) as u8;
        self.report(percent);
    }
}

/// Wire `target` to receive every bundle `source` publishes
pub fn connect(source: &Arc<dyn Stage>, target: &Arc<dyn Stage>) -> PlugflowResult<()> {
    if source.id() == target.id() {
        return Err(PlugflowError::SelfSource {
            stage: target.name().to_string(),
        });
    }

    source.register_observer(Arc::clone(target).into_observer());
    target.core().record_input(source);
    Ok(())
}
