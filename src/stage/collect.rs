// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 plugflow contributors

//! Observer that keeps everything it is sent

use std::sync::{Mutex, PoisonError};

use super::{Notification, Observer};
use crate::artifact::ArtifactBundle;
use crate::errors::PlugflowResult;

/// Records notifications for later inspection
#[derive(Debug)]
pub struct CollectingObserver {
    name: String,
    received: Mutex<Vec<Notification>>,
}

impl CollectingObserver {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copies of every notification received so far
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Bundles received so far, in arrival order
    pub fn bundles(&self) -> Vec<ArtifactBundle> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|n| n.bundle.clone())
            .collect()
    }

    /// Remove and return everything received so far
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.received.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Observer for CollectingObserver {
    fn on_notification(&self, notification: &Notification) -> PlugflowResult<()> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }

    fn observer_name(&self) -> &str {
        &self.name
    }
}
