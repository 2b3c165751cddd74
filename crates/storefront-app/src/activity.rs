//! Activity log: records every domain event as one structured log line.

use storefront_events::{Event, EventEnvelope, EventStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Drain `stream` on a background task until the bus closes.
#[must_use]
pub fn spawn_activity_log(mut stream: EventStream) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut recorded = 0;
        while let Some(envelope) = stream.next().await {
            record(&envelope);
            recorded += 1;
        }
        debug!(recorded, "activity log stream closed");
        recorded
    })
}

fn record(envelope: &EventEnvelope) {
    let event_id = envelope.id;
    match &envelope.event {
        Event::PaymentProcessed {
            order_number,
            method,
            transaction_id,
            status,
        } => info!(
            event_id,
            order = %order_number,
            method = %method,
            transaction_id = transaction_id.as_deref(),
            status = %status,
            "payment processed"
        ),
        Event::PaymentRefunded {
            transaction_id,
            method,
            refund_id,
            status,
        } => info!(
            event_id,
            transaction_id = %transaction_id,
            method = %method,
            refund_id = refund_id.as_deref(),
            status = %status,
            "payment refunded"
        ),
        Event::PaymentFailed {
            operation,
            method,
            message,
        } => warn!(
            event_id,
            operation = %operation,
            method = %method,
            message = %message,
            "payment operation failed"
        ),
        Event::LocaleChanged { previous, locale } => info!(
            event_id,
            previous = previous.as_deref(),
            locale = %locale,
            "locale changed"
        ),
        Event::HealthChanged { degraded } => {
            if degraded.is_empty() {
                info!(event_id, "all components healthy");
            } else {
                warn!(event_id, degraded = ?degraded, "components degraded");
            }
        }
    }
}
