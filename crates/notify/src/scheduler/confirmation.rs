//! Hourly 24h-confirmation sweep.
//!
//! For every active project with the confirmation flag on, loads the
//! `confirmed` reservations scheduled between 23 and 25 hours from now in
//! the project's timezone and triggers `confirmation_24h` for each. A
//! reservation is skipped when the tenant has a confirmation log from the
//! last two hours that did not fail, which absorbs the overlap between
//! consecutive windows. The log's current status is checked, so a `sent`
//! row later rewritten to `delivered` by the status webhook still counts.
//! Customers without a phone or email are skipped before any event is
//! created.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use comanda_core::event_types::CONFIRMATION_24H;
use comanda_core::log_status;
use comanda_db::models::restaurant::{Project, Reservation, RESERVATION_STATUS_CONFIRMED};

use super::{RecurringJob, SweepReport};
use crate::directory::TenantDirectory;
use crate::dispatcher::Recipients;
use crate::processor::{EventProcessor, TriggerOutcome};
use crate::store::NotificationStore;
use crate::timezone;

const WINDOW_START_HOURS: i64 = 23;
const WINDOW_END_HOURS: i64 = 25;
const DEDUP_WINDOW_HOURS: i64 = 2;

/// Local `[now+23h, now+25h]` in `tz`.
pub fn confirmation_window(now: DateTime<Utc>, tz: Tz) -> (NaiveDateTime, NaiveDateTime) {
    let local = timezone::local_now(now, tz);
    (
        local + TimeDelta::hours(WINDOW_START_HOURS),
        local + TimeDelta::hours(WINDOW_END_HOURS),
    )
}

pub struct ConfirmationSweep {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn TenantDirectory>,
    processor: Arc<EventProcessor>,
    default_timezone: Tz,
    interval: Duration,
}

impl ConfirmationSweep {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn TenantDirectory>,
        processor: Arc<EventProcessor>,
        default_timezone: Tz,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            directory,
            processor,
            default_timezone,
            interval,
        }
    }

    /// One sweep as of `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let projects = match self.directory.active_projects().await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(error = %e, "Confirmation sweep: failed to list projects");
                report.errors.push(e.to_string());
                return report;
            }
        };

        for project in &projects {
            report.projects += 1;
            self.sweep_project(project, now, &mut report).await;
        }

        report
    }

    async fn sweep_project(&self, project: &Project, now: DateTime<Utc>, report: &mut SweepReport) {
        let tenant = project.tenant();

        match self.directory.settings(tenant).await {
            Ok(settings) if settings.notify_confirmation_24h => {}
            Ok(_) => return,
            Err(e) => {
                tracing::error!(%tenant, error = %e, "Confirmation sweep: failed to load settings");
                report.errors.push(e.to_string());
                return;
            }
        }

        let tz = timezone::resolve(project.timezone.as_deref(), self.default_timezone);
        let (start, end) = confirmation_window(now, tz);
        let reservations = match self.directory.reservations_between(tenant, start, end).await {
            Ok(reservations) => reservations,
            Err(e) => {
                tracing::error!(%tenant, error = %e, "Confirmation sweep: failed to load reservations");
                report.errors.push(e.to_string());
                return;
            }
        };

        let since = now - TimeDelta::hours(DEDUP_WINDOW_HOURS);
        for reservation in reservations
            .iter()
            .filter(|r| r.status == RESERVATION_STATUS_CONFIRMED)
        {
            self.confirm(project, reservation, since, report).await;
        }
    }

    async fn confirm(
        &self,
        project: &Project,
        reservation: &Reservation,
        since: DateTime<Utc>,
        report: &mut SweepReport,
    ) {
        let tenant = project.tenant();

        let recipients = match self.directory.customer(tenant, reservation.customer_id).await {
            Ok(Some(customer)) => Recipients::new(customer.phone, customer.email),
            Ok(None) => {
                tracing::warn!(%tenant, reservation_id = reservation.id, "Confirmation sweep: customer not found");
                report.failed += 1;
                return;
            }
            Err(e) => {
                report.errors.push(e.to_string());
                return;
            }
        };

        if recipients.addresses().is_empty() {
            tracing::debug!(%tenant, reservation_id = reservation.id, "Confirmation sweep: customer has no phone or email");
            report.unreachable += 1;
            return;
        }

        match self
            .store
            .log_exists_since(tenant, CONFIRMATION_24H, &log_status::FAILED_CLASS, since)
            .await
        {
            Ok(true) => {
                tracing::debug!(%tenant, reservation_id = reservation.id, "Confirmation already sent recently");
                report.deduplicated += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(%tenant, error = %e, "Confirmation sweep: dedup check failed");
                report.errors.push(e.to_string());
                return;
            }
        }

        match self.processor.confirmation_24h(tenant, reservation).await {
            TriggerOutcome::Processed(_) => report.triggered += 1,
            TriggerOutcome::Disabled => {}
            TriggerOutcome::NotFound(_) | TriggerOutcome::Failed(_) => report.failed += 1,
        }
    }
}

#[async_trait]
impl RecurringJob for ConfirmationSweep {
    fn name(&self) -> &'static str {
        "confirmation_24h"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run_once(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Dispatcher;
    use crate::testing::{self, InMemoryDirectory, InMemoryStore, Recorders};
    use crate::timezone::FALLBACK_TIMEZONE;
    use crate::webhook::{StatusMatch, StatusUpdate, WebhookIngest};
    use chrono::TimeZone;
    use comanda_core::types::Tenant;
    use comanda_db::models::notification::NewLog;
    use comanda_db::models::restaurant::ProjectSettings;

    const TENANT: Tenant = Tenant {
        org_id: 1,
        project_id: 10,
    };

    struct Harness {
        store: Arc<InMemoryStore>,
        directory: Arc<InMemoryDirectory>,
        recorders: Recorders,
        sweep: ConfirmationSweep,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        directory.add_project(testing::project(TENANT));
        directory.set_settings(
            TENANT,
            ProjectSettings {
                notify_confirmation_24h: true,
                ..ProjectSettings::default()
            },
        );
        store.seed_config(TENANT, CONFIRMATION_24H, true, &["sms"]);
        store.seed_template(TENANT, "sms", "", "Confirmando {{reservation_time}}");

        let recorders = Recorders::new();
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            directory.clone(),
            recorders.registry(),
            FALLBACK_TIMEZONE,
        ));
        let processor = Arc::new(EventProcessor::new(
            store.clone(),
            directory.clone(),
            dispatcher,
        ));
        let sweep = ConfirmationSweep::new(
            store.clone(),
            directory.clone(),
            processor,
            FALLBACK_TIMEZONE,
            Duration::from_secs(3600),
        );
        Harness {
            store,
            directory,
            recorders,
            sweep,
        }
    }

    /// A confirmed reservation for a new customer, `hours` ahead of `now` in
    /// São Paulo.
    fn book(h: &Harness, id: i64, phone: &str, now: DateTime<Utc>, hours: i64) {
        h.directory
            .add_customer(TENANT, testing::customer(id, Some(phone), None));
        let at = timezone::local_now(now, FALLBACK_TIMEZONE) + TimeDelta::hours(hours);
        h.directory
            .add_reservation(testing::reservation(TENANT, id, id, at));
    }

    #[test]
    fn window_is_local_to_the_project() {
        let now = Utc.with_ymd_and_hms(2026, 7, 1, 15, 0, 0).unwrap();
        let (start, end) = confirmation_window(now, chrono_tz::America::Sao_Paulo);
        assert_eq!(start.to_string(), "2026-07-02 11:00:00");
        assert_eq!(end.to_string(), "2026-07-02 13:00:00");
    }

    #[tokio::test]
    async fn reservations_in_window_are_confirmed_once() {
        let h = harness();
        let now = Utc::now();
        book(&h, 1, "+5511911110001", now, 24);
        book(&h, 2, "+5511911110002", now, 48);

        let first = h.sweep.sweep_at(now).await;
        assert_eq!(first.triggered, 1);
        assert_eq!(h.store.logs().len(), 1);
        assert_eq!(h.recorders.sms.sent()[0].recipient, "+5511911110001");

        let second = h.sweep.sweep_at(now).await;
        assert_eq!(second.triggered, 0);
        assert_eq!(second.deduplicated, 1);
        assert_eq!(h.store.logs().len(), 1);
    }

    fn confirmation_log(recipient: &str, status: &str) -> NewLog {
        NewLog {
            event_type: CONFIRMATION_24H.to_string(),
            channel: "sms".to_string(),
            recipient: recipient.to_string(),
            subject: String::new(),
            message: String::new(),
            status: status.to_string(),
            external_id: None,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn recent_confirmation_to_another_customer_suppresses_the_tenant() {
        let h = harness();
        let now = Utc::now();
        book(&h, 1, "+5511911110001", now, 24);
        h.store.seed_log_at(
            TENANT,
            &confirmation_log("+5511999999999", log_status::SENT),
            now - TimeDelta::minutes(30),
        );

        let report = h.sweep.sweep_at(now).await;
        assert_eq!(report.triggered, 0);
        assert_eq!(report.deduplicated, 1);
        assert!(h.recorders.sms.sent().is_empty());
    }

    #[tokio::test]
    async fn second_reservation_in_the_same_sweep_is_deduplicated() {
        let h = harness();
        let now = Utc::now();
        book(&h, 1, "+5511911110001", now, 24);
        book(&h, 2, "+5511911110002", now, 24);

        let report = h.sweep.sweep_at(now).await;
        assert_eq!(report.triggered, 1);
        assert_eq!(report.deduplicated, 1);
        assert_eq!(h.store.logs().len(), 1);
    }

    #[tokio::test]
    async fn delivered_status_still_deduplicates_the_next_sweep() {
        let h = harness();
        let now = Utc::now();
        book(&h, 1, "+5511911110001", now, 24);

        let first = h.sweep.sweep_at(now).await;
        assert_eq!(first.triggered, 1);
        let sid = h.store.logs()[0].external_id.clone().unwrap();

        let ingest = WebhookIngest::new(h.store.clone());
        let matched = ingest
            .apply_status(&StatusUpdate {
                message_sid: sid,
                message_status: "delivered".to_string(),
                error_code: None,
            })
            .await
            .unwrap();
        assert_eq!(matched, StatusMatch::Updated(1));
        assert_eq!(h.store.logs()[0].status, log_status::DELIVERED);

        // One hour later the reservation is still inside the 23h..25h window.
        let second = h.sweep.sweep_at(now + TimeDelta::hours(1)).await;
        assert_eq!(second.triggered, 0);
        assert_eq!(second.deduplicated, 1);
        assert_eq!(h.store.logs().len(), 1);
        assert_eq!(h.recorders.sms.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_confirmation_is_retried() {
        let h = harness();
        let now = Utc::now();
        book(&h, 1, "+5511911110001", now, 24);
        h.store.seed_log_at(
            TENANT,
            &confirmation_log("+5511911110001", "undelivered"),
            now - TimeDelta::minutes(30),
        );

        let report = h.sweep.sweep_at(now).await;
        assert_eq!(report.triggered, 1);
        assert_eq!(report.deduplicated, 0);
    }

    #[tokio::test]
    async fn customer_without_contact_is_skipped_without_an_event() {
        let h = harness();
        let now = Utc::now();
        h.directory.add_customer(TENANT, testing::customer(7, None, None));
        let at = timezone::local_now(now, FALLBACK_TIMEZONE) + TimeDelta::hours(24);
        h.directory
            .add_reservation(testing::reservation(TENANT, 7, 7, at));

        let report = h.sweep.sweep_at(now).await;
        assert_eq!(report.unreachable, 1);
        assert_eq!(report.triggered, 0);
        assert!(h.store.events().is_empty());
    }

    #[tokio::test]
    async fn sent_log_older_than_two_hours_does_not_dedup() {
        let h = harness();
        let now = Utc::now();
        book(&h, 1, "+5511911110001", now, 24);
        h.store.seed_log_at(
            TENANT,
            &confirmation_log("+5511911110001", log_status::SENT),
            now - TimeDelta::hours(3),
        );

        let report = h.sweep.sweep_at(now).await;
        assert_eq!(report.triggered, 1);
        assert_eq!(report.deduplicated, 0);
    }

    #[tokio::test]
    async fn flag_off_and_unconfirmed_reservations_are_ignored() {
        let h = harness();
        let now = Utc::now();
        h.directory.add_customer(TENANT, testing::customer(3, Some("+55"), None));
        let at = timezone::local_now(now, FALLBACK_TIMEZONE) + TimeDelta::hours(24);
        let mut pending = testing::reservation(TENANT, 3, 3, at);
        pending.status = "pending".to_string();
        h.directory.add_reservation(pending);

        let report = h.sweep.sweep_at(now).await;
        assert_eq!(report.projects, 1);
        assert_eq!(report.triggered, 0);

        h.directory.set_settings(TENANT, ProjectSettings::default());
        book(&h, 4, "+5511911110004", now, 24);
        let report = h.sweep.sweep_at(now).await;
        assert_eq!(report.triggered, 0);
        assert!(h.store.events().is_empty());
    }
}
