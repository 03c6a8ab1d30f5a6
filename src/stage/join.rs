// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Fan-in join stage
//!
//! Buffers the latest bundle from each registered source and publishes one
//! combined bundle per cycle. A cycle completes when every source slot holds
//! a bundle. Once-sources keep their bundle across cycles; iterative sources
//! are cleared after each combined emission.
//!
//! The check-store-combine-clear sequence runs under one mutex per join.
//! Publishing the combined bundle happens after the lock is released, so
//! slow downstream work never blocks other sources from being buffered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{Notification, Observer, Stage, StageCore, StageId};
use crate::artifact::ArtifactBundle;
use crate::errors::{PlugflowError, PlugflowResult};

/// How often a source is expected to deliver into a join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Delivers exactly once; its bundle is reused by every cycle
    Once,
    /// Delivers once per cycle
    #[default]
    Iterative,
}

impl std::fmt::Display for SourceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::Iterative => write!(f, "iterative"),
        }
    }
}

#[derive(Debug)]
struct Slot {
    source: StageId,
    source_name: String,
    mode: SourceMode,
    value: Option<ArtifactBundle>,
}

/// Slots in registration order; a source appears at most once
#[derive(Debug, Default)]
struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    fn position(&self, source: StageId) -> Option<usize> {
        self.slots.iter().position(|s| s.source == source)
    }

    fn is_complete(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|s| s.value.is_some())
    }

    /// Filled slots, once-slots first, each class in registration order
    fn filled(&self) -> impl Iterator<Item = &ArtifactBundle> {
        let once = self
            .slots
            .iter()
            .filter(|s| s.mode == SourceMode::Once);
        let iterative = self
            .slots
            .iter()
            .filter(|s| s.mode == SourceMode::Iterative);
        once.chain(iterative).filter_map(|s| s.value.as_ref())
    }

    fn clear(&mut self, mode: Option<SourceMode>) {
        for slot in &mut self.slots {
            if mode.map_or(true, |m| slot.mode == m) {
                slot.value = None;
            }
        }
    }

    /// If every slot is filled, build the merged bundle and clear the
    /// iterative slots
    fn take_if_complete(&mut self, producer: StageId) -> Option<ArtifactBundle> {
        if !self.is_complete() {
            return None;
        }

        let merged = ArtifactBundle::merge(self.filled(), producer);
        self.clear(Some(SourceMode::Iterative));
        Some(merged)
    }
}

/// Snapshot of how many slots of each class are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinStatus {
    pub once_filled: usize,
    pub once_total: usize,
    pub iterative_filled: usize,
    pub iterative_total: usize,
}

impl JoinStatus {
    pub fn is_complete(&self) -> bool {
        self.once_total + self.iterative_total > 0
            && self.once_filled == self.once_total
            && self.iterative_filled == self.iterative_total
    }
}

/// Stage combining bundles from several upstream stages
#[derive(Debug)]
pub struct JoinStage {
    core: StageCore,
    slots: Mutex<SlotTable>,
    emissions: AtomicU64,
}

impl JoinStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: StageCore::new(name),
            slots: Mutex::new(SlotTable::default()),
            emissions: AtomicU64::new(0),
        }
    }

    /// Take a single bundle from `source` and reuse it in every combination
    pub fn register_once_source(self: &Arc<Self>, source: &Arc<dyn Stage>) -> PlugflowResult<()> {
        self.register_source(source, SourceMode::Once)
    }

    /// Take one bundle from `source` per combination
    pub fn register_iterative_source(
        self: &Arc<Self>,
        source: &Arc<dyn Stage>,
    ) -> PlugflowResult<()> {
        self.register_source(source, SourceMode::Iterative)
    }

    /// Add `source` as an input of the given mode and observe it
    pub fn register_source(
        self: &Arc<Self>,
        source: &Arc<dyn Stage>,
        mode: SourceMode,
    ) -> PlugflowResult<()> {
        if source.id() == self.core.id() {
            return Err(PlugflowError::SelfSource {
                stage: self.core.name().to_string(),
            });
        }

        {
            let mut table = self.lock_slots();
            if table.position(source.id()).is_some() {
                return Err(PlugflowError::DuplicateSource {
                    join: self.core.name().to_string(),
                    source_name: source.name().to_string(),
                });
            }
            table.slots.push(Slot {
                source: source.id(),
                source_name: source.name().to_string(),
                mode,
                value: None,
            });
        }

        source.register_observer(Arc::clone(self).into_observer());
        self.core.record_input(source);
        debug!(join = %self.core.name(), source = %source.name(), %mode, "source registered");
        Ok(())
    }

    /// Publish whatever is buffered right now, then clear every slot
    ///
    /// Skips the completeness check. Still-empty slots contribute nothing.
    /// Once-slots are cleared too, so their sources may deliver again.
    /// Returns the published bundle, or `None` if there was nothing to send.
    pub fn flush(&self) -> PlugflowResult<Option<ArtifactBundle>> {
        let merged = {
            let mut table = self.lock_slots();
            let merged = ArtifactBundle::merge(table.filled(), self.core.id());
            table.clear(None);
            merged
        };

        if merged.is_empty() {
            debug!(join = %self.core.name(), "flush found nothing buffered");
            return Ok(None);
        }

        info!(join = %self.core.name(), artifacts = merged.len(), "flushing");
        self.emit(merged).map(Some)
    }

    /// Drop any partially collected cycle; once-slots are kept
    pub fn reset(&self) {
        self.lock_slots().clear(Some(SourceMode::Iterative));
        debug!(join = %self.core.name(), "iterative slots reset");
    }

    pub fn status(&self) -> JoinStatus {
        let table = self.lock_slots();
        let mut status = JoinStatus::default();
        for slot in &table.slots {
            let filled = usize::from(slot.value.is_some());
            match slot.mode {
                SourceMode::Once => {
                    status.once_total += 1;
                    status.once_filled += filled;
                }
                SourceMode::Iterative => {
                    status.iterative_total += 1;
                    status.iterative_filled += filled;
                }
            }
        }
        status
    }

    /// Registered sources, in registration order
    pub fn sources(&self) -> Vec<(StageId, String, SourceMode)> {
        self.lock_slots()
            .slots
            .iter()
            .map(|s| (s.source, s.source_name.clone(), s.mode))
            .collect()
    }

    /// Whether `source` currently has a buffered bundle
    pub fn is_filled(&self, source: StageId) -> bool {
        let table = self.lock_slots();
        table
            .position(source)
            .is_some_and(|i| table.slots[i].value.is_some())
    }

    /// Number of combined bundles published so far (flushes included)
    pub fn emissions(&self) -> u64 {
        self.emissions.load(Ordering::Relaxed)
    }

    /// Store a delivered bundle and, if that completes the cycle, take the
    /// merged bundle. Runs entirely under the slot lock; on error the table
    /// is left exactly as it was.
    fn accept(&self, notification: &Notification) -> PlugflowResult<Option<ArtifactBundle>> {
        let mut table = self.lock_slots();

        let Some(index) = table.position(notification.producer) else {
            error!(join = %self.core.name(), source = %notification.producer_name, "delivery from unknown source");
            return Err(PlugflowError::UnknownSource {
                join: self.core.name().to_string(),
                source_name: notification.producer_name.clone(),
                source_id: notification.producer,
            });
        };

        let slot = &mut table.slots[index];
        if slot.value.is_some() {
            error!(join = %self.core.name(), source = %slot.source_name, mode = %slot.mode, "duplicate delivery");
            let join = self.core.name().to_string();
            let source_name = slot.source_name.clone();
            let source_id = slot.source;
            return Err(match slot.mode {
                SourceMode::Once => PlugflowError::OnceSourceRedelivered {
                    join,
                    source_name,
                    source_id,
                },
                SourceMode::Iterative => PlugflowError::IterativeSourceRedelivered {
                    join,
                    source_name,
                    source_id,
                },
            });
        }

        slot.value = Some(notification.bundle.clone());
        debug!(join = %self.core.name(), source = %slot.source_name, mode = %slot.mode, "slot filled");

        Ok(table.take_if_complete(self.core.id()))
    }

    fn emit(&self, merged: ArtifactBundle) -> PlugflowResult<ArtifactBundle> {
        let cycle = self.emissions.fetch_add(1, Ordering::Relaxed) + 1;
        info!(join = %self.core.name(), cycle, artifacts = merged.len(), "combined emission");

        let result = self.core.publish(merged.clone());
        self.core.report_progress(100);
        result.map(|()| merged)
    }

    fn lock_slots(&self) -> MutexGuard<'_, SlotTable> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Observer for JoinStage {
    fn on_notification(&self, notification: &Notification) -> PlugflowResult<()> {
        if let Some(merged) = self.accept(notification)? {
            self.emit(merged)?;
        }
        Ok(())
    }

    fn observer_name(&self) -> &str {
        self.core.name()
    }

    fn as_stage(&self) -> Option<&dyn Stage> {
        Some(self)
    }
}

impl Stage for JoinStage {
    fn core(&self) -> &StageCore {
        &self.core
    }

    /// Attempt a gated emission; `input` is ignored because a join only
    /// combines what its sources delivered.
    fn execute(&self, _input: &ArtifactBundle) -> PlugflowResult<Option<ArtifactBundle>> {
        let merged = self.lock_slots().take_if_complete(self.core.id());
        match merged {
            Some(merged) => self.emit(merged).map(Some),
            None => Ok(None),
        }
    }

    fn into_observer(self: Arc<Self>) -> Arc<dyn Observer> {
        self
    }
}
