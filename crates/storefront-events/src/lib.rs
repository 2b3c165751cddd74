#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, unreachable_pub)]

//! Event bus for storefront payment and locale activity.
//!
//! Events carry sequential identifiers and a bounded replay ring so late
//! subscribers (the activity log, tests) can catch up on what they missed.
//! Delivery uses `tokio::broadcast`; when a subscriber lags, the oldest events
//! are dropped rather than blocking publishers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Identifier assigned to each published event.
pub type EventId = u64;

const DEFAULT_REPLAY_CAPACITY: usize = 256;

/// Typed domain events surfaced by the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A payment was handed to a provider (or the manual fallback).
    PaymentProcessed {
        /// Order number.
        order_number: String,
        /// Payment method tag used for dispatch.
        method: String,
        /// Transaction identifier, if the provider issued one.
        transaction_id: Option<String>,
        /// Resulting payment status.
        status: String,
    },
    /// A refund was requested.
    PaymentRefunded {
        /// Transaction the refund applies to.
        transaction_id: String,
        /// Payment method tag used for dispatch.
        method: String,
        /// Refund identifier, if the provider issued one.
        refund_id: Option<String>,
        /// Resulting refund status.
        status: String,
    },
    /// A provider reported a failed payment operation.
    PaymentFailed {
        /// Operation that failed (`process`, `refund`, `status`).
        operation: String,
        /// Payment method tag used for dispatch.
        method: String,
        /// Provider message.
        message: String,
    },
    /// A visitor switched locale explicitly.
    LocaleChanged {
        /// Previously stored locale, if any.
        previous: Option<String>,
        /// Newly selected locale.
        locale: String,
    },
    /// The set of degraded components changed.
    HealthChanged {
        /// Components currently degraded.
        degraded: Vec<String>,
    },
}

impl Event {
    /// Machine-friendly discriminator, also used as a metrics label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PaymentProcessed { .. } => "payment_processed",
            Self::PaymentRefunded { .. } => "payment_refunded",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::LocaleChanged { .. } => "locale_changed",
            Self::HealthChanged { .. } => "health_changed",
        }
    }
}

/// Event plus its identifier and emission time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Sequential identifier.
    pub id: EventId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Payload.
    pub event: Event,
}

/// Shared event bus built on top of `tokio::broadcast`.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    buffer: Arc<Mutex<VecDeque<EventEnvelope>>>,
    next_id: Arc<AtomicU64>,
    replay_capacity: usize,
}

impl EventBus {
    /// Construct a bus whose broadcast channel and replay ring hold
    /// `capacity` events. A zero capacity is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            next_id: Arc::new(AtomicU64::new(1)),
            replay_capacity: capacity,
        }
    }

    /// Construct a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    fn buffer(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish an event, returning its sequential identifier.
    ///
    /// Id assignment, buffering and broadcast happen under the replay lock,
    /// so subscribers observe ids in strictly increasing order.
    pub fn publish(&self, event: Event) -> EventId {
        let mut buffer = self.buffer();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        if buffer.len() == self.replay_capacity {
            buffer.pop_front();
        }
        buffer.push_back(envelope.clone());

        // No live subscribers is not an error; the replay ring keeps the event.
        let _ = self.sender.send(envelope);
        id
    }

    /// Subscribe, replaying buffered events newer than `since_id` first.
    ///
    /// The receiver is created under the replay lock, so the backlog and the
    /// live feed neither overlap nor leave a gap.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let buffer = self.buffer();
        let receiver = self.sender.subscribe();
        let backlog = since_id.map_or_else(VecDeque::new, |since| {
            buffer
                .iter()
                .filter(|item| item.id > since)
                .cloned()
                .collect()
        });
        EventStream { backlog, receiver }
    }

    /// Last assigned identifier, if any events have been published.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.buffer().back().map(|event| event.id)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber handle yielding the replay backlog, then live events.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    receiver: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event; `None` once the bus is dropped.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
