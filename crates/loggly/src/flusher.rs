// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::buffer::{LogBuffer, Pending};
use crate::message::encode_batch;
use crate::shipper::{DeliveryOutcome, Shipper};

/// What a single drain did with the messages it captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushResult {
    /// Nothing to send.
    Empty,
    /// The batch was accepted by the intake.
    Delivered(usize),
    /// The batch failed and this many messages went back into the buffer.
    Requeued(usize),
    /// The batch failed and this many messages were discarded.
    Dropped(usize),
}

/// Drains a [`LogBuffer`] into a [`Shipper`].
///
/// Concurrent flushes are allowed: each one owns the snapshot it took.
#[derive(Clone)]
pub struct Flusher {
    buffer: Arc<LogBuffer>,
    shipper: Arc<dyn Shipper>,
    requeue_limit: Option<u32>,
}

impl Flusher {
    #[must_use]
    pub fn new(
        buffer: Arc<LogBuffer>,
        shipper: Arc<dyn Shipper>,
        requeue_limit: Option<u32>,
    ) -> Self {
        Flusher {
            buffer,
            shipper,
            requeue_limit,
        }
    }

    #[must_use]
    pub fn buffer(&self) -> &Arc<LogBuffer> {
        &self.buffer
    }

    /// Ships everything currently buffered as one newline-delimited payload.
    pub async fn flush(&self) -> FlushResult {
        let batch = self.buffer.take();
        if batch.is_empty() {
            return FlushResult::Empty;
        }

        let body = encode_batch(batch.iter().map(|p| &p.message));
        if body.is_empty() {
            error!("None of the {} buffered messages could be encoded", batch.len());
            return FlushResult::Dropped(batch.len());
        }

        debug!("Flushing {} log messages", batch.len());
        let outcome = self.shipper.deliver(body).await;
        match outcome {
            DeliveryOutcome::Success => FlushResult::Delivered(batch.len()),
            DeliveryOutcome::OtherStatus(status) => {
                error!(
                    "Intake answered with status {}, dropping {} log messages",
                    status,
                    batch.len()
                );
                FlushResult::Dropped(batch.len())
            }
            DeliveryOutcome::AuthRejected | DeliveryOutcome::TransportError(_) => {
                self.requeue(batch, &outcome)
            }
        }
    }

    fn requeue(&self, batch: Vec<Pending>, outcome: &DeliveryOutcome) -> FlushResult {
        let total = batch.len();
        let retained: Vec<Pending> = batch
            .into_iter()
            .map(|p| Pending {
                attempts: p.attempts.saturating_add(1),
                ..p
            })
            .filter(|p| !self.requeue_limit.is_some_and(|limit| p.attempts > limit))
            .collect();

        let dropped = total - retained.len();
        if dropped > 0 {
            warn!(
                "Dropping {} log messages that exceeded the requeue limit after {}",
                dropped, outcome
            );
        }
        if retained.is_empty() {
            return FlushResult::Dropped(dropped);
        }

        let requeued = retained.len();
        debug!("Requeueing {} log messages after {}", requeued, outcome);
        self.buffer.requeue(retained);
        FlushResult::Requeued(requeued)
    }
}
