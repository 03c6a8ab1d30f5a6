// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Progress bar utilities
//!
//! One bar per stage, fed by the stage progress listeners.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::stage::{ProgressEvent, ProgressListener, StageId};

fn stage_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{msg:>16} [{bar:30.cyan/blue}] {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Per-stage progress bars; a bar appears the first time its stage reports
pub struct StageProgressBars {
    multi: MultiProgress,
    bars: Mutex<HashMap<StageId, ProgressBar>>,
}

impl StageProgressBars {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// Bars that track progress without drawing anything
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar_for(&self, event: &ProgressEvent) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        bars.entry(event.stage)
            .or_insert_with(|| {
                let pb = self.multi.add(ProgressBar::new(100));
                pb.set_style(stage_style());
                pb.set_message(event.stage_name.clone());
                pb
            })
            .clone()
    }

    /// Last reported percentage of a stage
    pub fn position(&self, stage: StageId) -> Option<u64> {
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&stage)
            .map(ProgressBar::position)
    }

    pub fn len(&self) -> usize {
        self.bars.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Leave every unfinished bar where it stopped
    pub fn abandon(&self) {
        for bar in self.bars.lock().unwrap_or_else(PoisonError::into_inner).values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

impl Default for StageProgressBars {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for StageProgressBars {
    fn progress(&self, event: &ProgressEvent) {
        let bar = self.bar_for(event);
        let percent = u64::from(event.percent);

        // A stage that runs again starts a fresh bar
        if bar.is_finished() && percent < 100 {
            bar.reset();
        }

        bar.set_position(percent);
        if percent == 100 {
            bar.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stage: StageId, percent: u8) -> ProgressEvent {
        ProgressEvent {
            stage,
            stage_name: "load".into(),
            percent,
        }
    }

    #[test]
    fn test_one_bar_per_stage() {
        let bars = StageProgressBars::hidden();
        let a = StageId::next();
        let b = StageId::next();

        bars.progress(&event(a, 30));
        bars.progress(&event(a, 60));
        bars.progress(&event(b, 100));

        assert_eq!(bars.len(), 2);
        assert_eq!(bars.position(a), Some(60));
        assert_eq!(bars.position(b), Some(100));
    }

    #[test]
    fn test_rerun_restarts_bar() {
        let bars = StageProgressBars::hidden();
        let a = StageId::next();

        bars.progress(&event(a, 100));
        bars.progress(&event(a, 10));

        assert_eq!(bars.position(a), Some(10));
    }
}
