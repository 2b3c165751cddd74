//! API application state, health tracking, and event publication.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use storefront_config::LocaleConfig;
use storefront_events::{Event, EventBus, EventId};
use storefront_i18n::{LocaleRedirectRule, LocaleResolver, SessionData};
use storefront_payments::PaymentDispatcher;
use storefront_telemetry::Metrics;

use crate::session::SessionStore;

pub(crate) struct ApiState {
    pub(crate) resolver: LocaleResolver,
    pub(crate) redirect_rule: LocaleRedirectRule,
    pub(crate) cookie_max_age: Duration,
    pub(crate) payments: PaymentDispatcher,
    pub(crate) telemetry: Metrics,
    pub(crate) events: EventBus,
    sessions: SessionStore,
    health_status: Mutex<Vec<String>>,
}

impl ApiState {
    pub(crate) fn new(
        locale: &LocaleConfig,
        payments: PaymentDispatcher,
        events: EventBus,
        telemetry: Metrics,
    ) -> Self {
        Self {
            resolver: LocaleResolver::new(locale.supported.clone()),
            redirect_rule: LocaleRedirectRule::new(
                locale.supported.clone(),
                locale.excluded_prefixes.iter().cloned(),
            ),
            cookie_max_age: locale.cookie_max_age,
            payments,
            telemetry,
            events,
            sessions: SessionStore::new(locale.session_ttl),
            health_status: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn load_session(&self, id: &str) -> Option<SessionData> {
        self.sessions.load(id)
    }

    pub(crate) fn save_session(&self, id: Option<&str>, data: SessionData) -> String {
        let id = self.sessions.save(id, data);
        self.telemetry.set_active_sessions(self.sessions.len());
        id
    }

    /// Publish on the bus and count the emission.
    pub(crate) fn publish(&self, event: Event) -> EventId {
        self.telemetry.inc_event(event.kind());
        self.events.publish(event)
    }

    pub(crate) fn add_degraded_component(&self, component: &str) -> bool {
        let mut guard = Self::lock_guard(&self.health_status);
        if guard.iter().any(|entry| entry == component) {
            return false;
        }
        guard.push(component.to_string());
        guard.sort();
        let snapshot = guard.clone();
        drop(guard);
        self.publish(Event::HealthChanged { degraded: snapshot });
        true
    }

    pub(crate) fn remove_degraded_component(&self, component: &str) -> bool {
        let mut guard = Self::lock_guard(&self.health_status);
        let previous = guard.len();
        guard.retain(|entry| entry != component);
        if guard.len() == previous {
            return false;
        }
        let snapshot = guard.clone();
        drop(guard);
        self.publish(Event::HealthChanged { degraded: snapshot });
        true
    }

    pub(crate) fn current_health_degraded(&self) -> Vec<String> {
        Self::lock_guard(&self.health_status).clone()
    }

    fn lock_guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;
    use std::time::Duration;

    use storefront_config::LocaleConfig;
    use storefront_events::EventBus;
    use storefront_i18n::SupportedLocales;
    use storefront_payments::{MockProvider, PaymentDispatcher};
    use storefront_telemetry::Metrics;

    use super::ApiState;

    pub(crate) fn locale_config(codes: &[&str], default: &str) -> anyhow::Result<LocaleConfig> {
        Ok(LocaleConfig {
            supported: SupportedLocales::new(codes.iter().copied(), default)?,
            cookie_max_age: Duration::from_secs(365 * 24 * 60 * 60),
            excluded_prefixes: vec![
                "/v1".to_string(),
                "/health".to_string(),
                "/metrics".to_string(),
            ],
            session_ttl: Duration::from_secs(1800),
        })
    }

    pub(crate) fn state() -> anyhow::Result<Arc<ApiState>> {
        let dispatcher = PaymentDispatcher::new(vec![Arc::new(MockProvider::new())]);
        Ok(Arc::new(ApiState::new(
            &locale_config(&["en", "de", "fr"], "en")?,
            dispatcher,
            EventBus::new(),
            Metrics::new()?,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_events::Event;

    #[tokio::test]
    async fn degraded_components_publish_health_changes() -> anyhow::Result<()> {
        let state = fixtures::state()?;
        let mut stream = state.events.subscribe(None);

        assert!(state.add_degraded_component("payments.order_capture"));
        assert!(!state.add_degraded_component("payments.order_capture"));
        assert_eq!(
            state.current_health_degraded(),
            vec!["payments.order_capture".to_string()]
        );
        assert!(state.remove_degraded_component("payments.order_capture"));
        assert!(!state.remove_degraded_component("payments.order_capture"));

        let first = stream.next().await;
        assert!(matches!(
            first.map(|envelope| envelope.event),
            Some(Event::HealthChanged { degraded }) if degraded.len() == 1
        ));
        let second = stream.next().await;
        assert!(matches!(
            second.map(|envelope| envelope.event),
            Some(Event::HealthChanged { degraded }) if degraded.is_empty()
        ));
        Ok(())
    }

    #[test]
    fn saving_sessions_updates_gauge() -> anyhow::Result<()> {
        let state = fixtures::state()?;
        let id = state.save_session(None, SessionData::new());
        assert!(state.load_session(&id).is_some());
        assert_eq!(state.telemetry.snapshot().active_sessions, 1);
        Ok(())
    }
}
