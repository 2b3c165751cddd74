//! Prometheus-backed metrics registry.
//!
//! # Design
//! - Collector registration happens once in [`Metrics::new`]; callers only
//!   see `inc_*` helpers.
//! - Label values are bounded: routes are matched templates, locales come
//!   from the allow-list, sources and outcomes are fixed enums, methods are
//!   payment tags.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Metrics registry shared by the HTTP layer and the app.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    locale_resolutions_total: IntCounterVec,
    locale_redirects_total: IntCounter,
    locale_session_repairs_total: IntCounter,
    payments_total: IntCounterVec,
    active_sessions: IntGauge,
}

/// Point-in-time view used by the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Locale redirects issued.
    pub locale_redirects_total: u64,
    /// Corrupted session locale values repaired.
    pub locale_session_repairs_total: u64,
    /// Live sessions in the store.
    pub active_sessions: i64,
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl Metrics {
    /// Build a registry with every storefront collector registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code", "locale"],
        )?;
        let events_emitted_total = counter_vec(
            "events_emitted_total",
            "Domain events emitted by type",
            &["type"],
        )?;
        let locale_resolutions_total = counter_vec(
            "locale_resolutions_total",
            "Locale resolutions by winning source",
            &["source"],
        )?;
        let locale_redirects_total = counter(
            "locale_redirects_total",
            "Redirects issued to canonical locale URLs",
        )?;
        let locale_session_repairs_total = counter(
            "locale_session_repairs_total",
            "Array-valued session locales coerced to a single code",
        )?;
        let payments_total = counter_vec(
            "payments_total",
            "Payment operations by method and outcome",
            &["operation", "method", "outcome"],
        )?;
        let active_sessions = IntGauge::with_opts(Opts::new(
            "active_sessions",
            "Sessions currently held in memory",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "active_sessions",
            source,
        })?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "events_emitted_total", &events_emitted_total)?;
        register(&registry, "locale_resolutions_total", &locale_resolutions_total)?;
        register(&registry, "locale_redirects_total", &locale_redirects_total)?;
        register(
            &registry,
            "locale_session_repairs_total",
            &locale_session_repairs_total,
        )?;
        register(&registry, "payments_total", &payments_total)?;
        register(&registry, "active_sessions", &active_sessions)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                events_emitted_total,
                locale_resolutions_total,
                locale_redirects_total,
                locale_session_repairs_total,
                payments_total,
                active_sessions,
            }),
        })
    }

    /// Count an HTTP response for `route` served in `locale`.
    pub fn inc_http_request(&self, route: &str, status: u16, locale: &str) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str(), locale])
            .inc();
    }

    /// Count an emitted domain event.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Count a locale resolution by winning source.
    pub fn inc_locale_resolution(&self, source: &str) {
        self.inner
            .locale_resolutions_total
            .with_label_values(&[source])
            .inc();
    }

    /// Count a locale redirect.
    pub fn inc_locale_redirect(&self) {
        self.inner.locale_redirects_total.inc();
    }

    /// Count a repaired session locale value.
    pub fn inc_locale_session_repair(&self) {
        self.inner.locale_session_repairs_total.inc();
    }

    /// Count a payment operation.
    pub fn inc_payment(&self, operation: &str, method: &str, outcome: &str) {
        self.inner
            .payments_total
            .with_label_values(&[operation, method, outcome])
            .inc();
    }

    /// Record the number of live sessions.
    pub fn set_active_sessions(&self, count: usize) {
        self.inner
            .active_sessions
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Snapshot of the counters reported on `/health`.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            locale_redirects_total: self.inner.locale_redirects_total.get(),
            locale_session_repairs_total: self.inner.locale_session_repairs_total.get(),
            active_sessions: self.inner.active_sessions.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_and_render_reflect_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/v1/payments", 200, "de");
        metrics.inc_event("payment_processed");
        metrics.inc_locale_resolution("accept_language");
        metrics.inc_locale_redirect();
        metrics.inc_locale_redirect();
        metrics.inc_locale_session_repair();
        metrics.inc_payment("process", "mock", "completed");
        metrics.set_active_sessions(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.locale_redirects_total, 2);
        assert_eq!(snapshot.locale_session_repairs_total, 1);
        assert_eq!(snapshot.active_sessions, 3);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total{code=\"200\",locale=\"de\",route=\"/v1/payments\"} 1"));
        assert!(rendered.contains("locale_resolutions_total{source=\"accept_language\"} 1"));
        assert!(rendered.contains(
            "payments_total{method=\"mock\",operation=\"process\",outcome=\"completed\"} 1"
        ));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_locale_redirect();
        assert_eq!(second.snapshot().locale_redirects_total, 0);
        Ok(())
    }
}
