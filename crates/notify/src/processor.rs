//! Event persistence and the domain triggers.
//!
//! Every trigger follows the same path: check the tenant's notifiable flag,
//! assemble a payload from directory records, persist a
//! [`NotificationEvent`], dispatch it inline and mark it processed. Triggers
//! are fire-and-forget: they return a [`TriggerOutcome`] and never fail the
//! domain action that called them.

use std::collections::HashMap;
use std::sync::Arc;

use comanda_core::event_types::{self, ENTITY_RESERVATION, ENTITY_TABLE};
use comanda_core::render::{DATE_FORMAT, TIME_FORMAT};
use comanda_core::types::{DbId, Tenant};
use comanda_db::models::notification::{NewEvent, NotificationEvent};
use comanda_db::models::restaurant::{Customer, Project, Reservation, RestaurantTable};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::directory::TenantDirectory;
use crate::dispatcher::{DispatchReport, Dispatcher, Recipients};
use crate::error::{NotifyError, NotifyResult};
use crate::store::NotificationStore;

/// Payload keys read back as recipients.
const PHONE_KEYS: [&str; 2] = ["customer_phone", "phone"];
const EMAIL_KEYS: [&str; 2] = ["customer_email", "email"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedEvent {
    pub event_id: DbId,
    pub report: DispatchReport,
}

/// Result of a domain trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The tenant flag for this trigger is off; no event was created.
    Disabled,
    /// A directory record the payload needs does not exist.
    NotFound(&'static str),
    Processed(ProcessedEvent),
    /// Storage failed before or while persisting the event.
    Failed(String),
}

pub struct EventProcessor {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn TenantDirectory>,
    dispatcher: Arc<Dispatcher>,
}

impl EventProcessor {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn TenantDirectory>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            store,
            directory,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Persist an unprocessed event and dispatch it immediately.
    ///
    /// `payload` must be a JSON object; its scalar values become template
    /// variables.
    pub async fn create_and_process_event(
        &self,
        tenant: Tenant,
        event_type: &str,
        entity_type: &str,
        entity_id: DbId,
        payload: Value,
    ) -> NotifyResult<ProcessedEvent> {
        if !payload.is_object() {
            return Err(NotifyError::Payload("payload must be a JSON object".into()));
        }

        let event = self
            .store
            .create_event(
                tenant,
                &NewEvent {
                    event_type: event_type.to_string(),
                    entity_type: entity_type.to_string(),
                    entity_id,
                    data: payload,
                },
            )
            .await?;

        tracing::debug!(%tenant, event_id = event.id, event_type, "Notification event recorded");
        let report = self.process_event(&event).await;
        Ok(ProcessedEvent {
            event_id: event.id,
            report,
        })
    }

    /// Dispatch a stored event and mark it processed, whatever the
    /// per-channel outcome.
    pub async fn process_event(&self, event: &NotificationEvent) -> DispatchReport {
        let tenant = event.tenant();
        let variables = variables_from_payload(&event.data);
        let recipients = recipients_from_payload(&event.data);

        let mut report = self
            .dispatcher
            .dispatch(tenant, &event.event_type, &recipients, &variables)
            .await;

        if let Err(e) = self.store.mark_event_processed(event.id).await {
            tracing::error!(%tenant, event_id = event.id, error = %e, "Failed to mark event processed");
            report.record_error(e);
        }

        tracing::info!(
            %tenant,
            event_id = event.id,
            event_type = %event.event_type,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "Notification event processed"
        );
        report
    }

    // -----------------------------------------------------------------------
    // Domain triggers
    // -----------------------------------------------------------------------

    pub async fn reservation_created(&self, tenant: Tenant, reservation_id: DbId) -> TriggerOutcome {
        self.reservation_trigger(tenant, event_types::RESERVATION_CREATE, reservation_id)
            .await
    }

    pub async fn reservation_updated(&self, tenant: Tenant, reservation_id: DbId) -> TriggerOutcome {
        self.reservation_trigger(tenant, event_types::RESERVATION_UPDATE, reservation_id)
            .await
    }

    pub async fn reservation_cancelled(
        &self,
        tenant: Tenant,
        reservation_id: DbId,
    ) -> TriggerOutcome {
        self.reservation_trigger(tenant, event_types::RESERVATION_CANCEL, reservation_id)
            .await
    }

    /// A table was freed; notify the customer waiting for it.
    pub async fn table_available(
        &self,
        tenant: Tenant,
        table_id: DbId,
        customer_id: DbId,
    ) -> TriggerOutcome {
        if let Some(gated) = self.gate(tenant, event_types::TABLE_AVAILABLE).await {
            return gated;
        }

        let table = match self.directory.table(tenant, table_id).await {
            Ok(Some(table)) => table,
            Ok(None) => return TriggerOutcome::NotFound("table"),
            Err(e) => return failed(tenant, event_types::TABLE_AVAILABLE, e),
        };
        let customer = match self.directory.customer(tenant, customer_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => return TriggerOutcome::NotFound("customer"),
            Err(e) => return failed(tenant, event_types::TABLE_AVAILABLE, e),
        };
        let project = match self.directory.project(tenant).await {
            Ok(project) => project,
            Err(e) => return failed(tenant, event_types::TABLE_AVAILABLE, e),
        };

        let mut payload = customer_fields(&customer);
        insert_table(&mut payload, &table);
        insert_project(&mut payload, project.as_ref());

        self.fire(
            tenant,
            event_types::TABLE_AVAILABLE,
            ENTITY_TABLE,
            table.id,
            payload,
        )
        .await
    }

    /// Reminder for a reservation due in about a day.
    pub async fn confirmation_24h(&self, tenant: Tenant, reservation: &Reservation) -> TriggerOutcome {
        if let Some(gated) = self.gate(tenant, event_types::CONFIRMATION_24H).await {
            return gated;
        }
        self.fire_reservation(tenant, event_types::CONFIRMATION_24H, reservation)
            .await
    }

    async fn reservation_trigger(
        &self,
        tenant: Tenant,
        event_type: &'static str,
        reservation_id: DbId,
    ) -> TriggerOutcome {
        if let Some(gated) = self.gate(tenant, event_type).await {
            return gated;
        }
        match self.directory.reservation(tenant, reservation_id).await {
            Ok(Some(reservation)) => self.fire_reservation(tenant, event_type, &reservation).await,
            Ok(None) => TriggerOutcome::NotFound("reservation"),
            Err(e) => failed(tenant, event_type, e),
        }
    }

    async fn fire_reservation(
        &self,
        tenant: Tenant,
        event_type: &'static str,
        reservation: &Reservation,
    ) -> TriggerOutcome {
        let customer = match self.directory.customer(tenant, reservation.customer_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => return TriggerOutcome::NotFound("customer"),
            Err(e) => return failed(tenant, event_type, e),
        };
        let table = match reservation.table_id {
            Some(table_id) => match self.directory.table(tenant, table_id).await {
                Ok(table) => table,
                Err(e) => return failed(tenant, event_type, e),
            },
            None => None,
        };
        let project = match self.directory.project(tenant).await {
            Ok(project) => project,
            Err(e) => return failed(tenant, event_type, e),
        };

        let payload = reservation_payload(reservation, &customer, table.as_ref(), project.as_ref());
        self.fire(tenant, event_type, ENTITY_RESERVATION, reservation.id, payload)
            .await
    }

    /// `Some` when the trigger must not create an event.
    async fn gate(&self, tenant: Tenant, event_type: &'static str) -> Option<TriggerOutcome> {
        match self.directory.settings(tenant).await {
            Ok(settings) if settings.allows(event_type) => None,
            Ok(_) => {
                tracing::debug!(%tenant, event_type, "Trigger disabled by project settings");
                Some(TriggerOutcome::Disabled)
            }
            Err(e) => Some(failed(tenant, event_type, e)),
        }
    }

    async fn fire(
        &self,
        tenant: Tenant,
        event_type: &'static str,
        entity_type: &str,
        entity_id: DbId,
        payload: Map<String, Value>,
    ) -> TriggerOutcome {
        match self
            .create_and_process_event(tenant, event_type, entity_type, entity_id, Value::Object(payload))
            .await
        {
            Ok(processed) => TriggerOutcome::Processed(processed),
            Err(e) => failed(tenant, event_type, e),
        }
    }
}

fn failed(tenant: Tenant, event_type: &str, error: impl std::fmt::Display) -> TriggerOutcome {
    tracing::error!(%tenant, event_type, error = %error, "Notification trigger failed");
    TriggerOutcome::Failed(error.to_string())
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

fn customer_fields(customer: &Customer) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("customer_name".into(), customer.name.clone().into());
    if let Some(phone) = &customer.phone {
        payload.insert("customer_phone".into(), phone.clone().into());
    }
    if let Some(email) = &customer.email {
        payload.insert("customer_email".into(), email.clone().into());
    }
    payload
}

fn insert_table(payload: &mut Map<String, Value>, table: &RestaurantTable) {
    payload.insert("table".into(), table.label.clone().into());
    payload.insert("table_capacity".into(), table.capacity.into());
}

fn insert_project(payload: &mut Map<String, Value>, project: Option<&Project>) {
    if let Some(project) = project {
        payload.insert("project_name".into(), project.name.clone().into());
    }
}

fn reservation_payload(
    reservation: &Reservation,
    customer: &Customer,
    table: Option<&RestaurantTable>,
    project: Option<&Project>,
) -> Map<String, Value> {
    let mut payload = customer_fields(customer);
    payload.insert("reservation_id".into(), reservation.id.into());
    payload.insert(
        "reservation_date".into(),
        reservation.reservation_date.format(DATE_FORMAT).to_string().into(),
    );
    payload.insert(
        "reservation_time".into(),
        reservation.reservation_time.format(TIME_FORMAT).to_string().into(),
    );
    payload.insert("party_size".into(), reservation.party_size.into());
    payload.insert("status".into(), reservation.status.clone().into());
    if let Some(notes) = &reservation.notes {
        payload.insert("notes".into(), notes.clone().into());
    }
    if let Some(table) = table {
        insert_table(&mut payload, table);
    }
    insert_project(&mut payload, project);
    payload
}

/// Template variables from an event payload: strings, numbers and booleans
/// at the top level. Nulls, arrays and nested objects are ignored.
pub fn variables_from_payload(data: &Value) -> HashMap<String, String> {
    let Some(object) = data.as_object() else {
        return HashMap::new();
    };
    object
        .iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

/// Recipients from an event payload; `customer_*` keys win over the bare
/// `phone`/`email` keys.
pub fn recipients_from_payload(data: &Value) -> Recipients {
    let first = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| data.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };
    Recipients::new(first(&PHONE_KEYS), first(&EMAIL_KEYS))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
