// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared buffer of messages waiting for a bulk drain.
//!
//! One mutex guards the queue. It is held only to append, to swap the queue
//! out, or to append a failed batch back, never across I/O.

use std::mem;
use std::sync::{Mutex, MutexGuard};

use tracing::error;

use crate::message::LogMessage;

/// A buffered message and the number of failed drains it has been part of.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    pub message: LogMessage,
    pub attempts: u32,
}

impl From<LogMessage> for Pending {
    fn from(message: LogMessage) -> Self {
        Pending {
            message,
            attempts: 0,
        }
    }
}

#[derive(Debug)]
pub struct LogBuffer {
    entries: Mutex<Vec<Pending>>,
    threshold: usize,
}

impl LogBuffer {
    /// `threshold` is the soft size at which a drain should be triggered.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        LogBuffer {
            entries: Mutex::new(Vec::with_capacity(threshold.min(1024))),
            threshold,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Pending>> {
        // a panic while holding the lock leaves a valid Vec behind
        self.entries.lock().unwrap_or_else(|poisoned| {
            error!("Log buffer lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Appends a message and returns the buffer size right after the append.
    pub fn push(&self, message: LogMessage) -> usize {
        let mut entries = self.lock();
        entries.push(Pending::from(message));
        entries.len()
    }

    /// Takes every buffered entry, leaving the buffer empty.
    #[must_use]
    pub fn take(&self) -> Vec<Pending> {
        mem::take(&mut *self.lock())
    }

    /// Appends entries from a failed drain to the tail of the buffer.
    pub fn requeue(&self, batch: Vec<Pending>) {
        if batch.is_empty() {
            return;
        }
        self.lock().extend(batch);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether a buffer holding `size` entries should be drained.
    #[must_use]
    pub fn threshold_reached(&self, size: usize) -> bool {
        size >= self.threshold
    }
}
