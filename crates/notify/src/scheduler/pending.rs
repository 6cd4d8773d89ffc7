//! Re-drives events left unprocessed, for example by a crash between
//! persisting an event and dispatching it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{RecurringJob, SweepReport};
use crate::processor::EventProcessor;
use crate::store::NotificationStore;

/// Events handled per sweep.
pub const PENDING_BATCH_SIZE: i64 = 500;

pub struct PendingEventSweep {
    store: Arc<dyn NotificationStore>,
    processor: Arc<EventProcessor>,
    interval: Duration,
}

impl PendingEventSweep {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        processor: Arc<EventProcessor>,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            processor,
            interval,
        }
    }
}

#[async_trait]
impl RecurringJob for PendingEventSweep {
    fn name(&self) -> &'static str {
        "pending_events"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let events = match self.store.list_unprocessed_events(PENDING_BATCH_SIZE).await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!(error = %e, "Pending sweep: failed to list events");
                report.errors.push(e.to_string());
                return report;
            }
        };

        let mut tenants = HashSet::new();
        for event in &events {
            tenants.insert(event.tenant());
            let dispatch = self.processor.process_event(event).await;
            report.triggered += 1;
            if let Some(error) = dispatch.error {
                report.errors.push(error);
            }
        }
        report.projects = tenants.len();

        if !events.is_empty() {
            tracing::info!(processed = events.len(), "Pending sweep re-processed events");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::testing::{self, InMemoryDirectory, InMemoryStore, Recorders};
    use crate::timezone::FALLBACK_TIMEZONE;
    use comanda_core::event_types::RESERVATION_UPDATE;
    use comanda_core::types::Tenant;
    use comanda_db::models::notification::NewEvent;
    use serde_json::json;

    #[tokio::test]
    async fn unprocessed_events_are_dispatched_and_marked() {
        let tenant = Tenant::new(1, 10);
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        directory.add_project(testing::project(tenant));
        store.seed_config(tenant, RESERVATION_UPDATE, true, &["email"]);
        store.seed_template(tenant, "email", "Reserva alterada", "{{customer_name}}");

        let recorders = Recorders::new();
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            directory.clone(),
            recorders.registry(),
            FALLBACK_TIMEZONE,
        ));
        let processor = Arc::new(EventProcessor::new(store.clone(), directory, dispatcher));
        let sweep = PendingEventSweep::new(store.clone(), processor, Duration::from_secs(300));

        for id in 1..=2 {
            store.seed_event(
                tenant,
                NewEvent {
                    event_type: RESERVATION_UPDATE.to_string(),
                    entity_type: "reservation".to_string(),
                    entity_id: id,
                    data: json!({"customer_name": "Ana", "customer_email": "ana@example.com"}),
                },
            );
        }

        let report = sweep.run_once().await;
        assert_eq!(report.triggered, 2);
        assert_eq!(report.projects, 1);
        assert!(store.events().iter().all(|e| e.processed));
        assert_eq!(recorders.email.sent().len(), 2);

        let again = sweep.run_once().await;
        assert_eq!(again.triggered, 0);
        assert_eq!(store.logs().len(), 2);
    }
}
