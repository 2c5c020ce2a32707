//! Appointment summary and the appointment boundary to the record store.
//!
//! `summarize` is the pure reduction: per-status counts over a newest-first
//! listing. `AppointmentService` wraps the store calls (list, create, get,
//! update), logs every store failure and hands the caller an explicit error.
//! A failed listing never turns into an empty summary.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CollectionIds;
use crate::db::{to_fields, Document, DocumentId, Query, RecordStore, StoreError, ATTR_CREATED_AT};
use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, AppointmentUpdate, NewAppointment};

// ─── Summary ──────────────────────────────────────────────────────────────────

/// Counts plus the listing they were computed from. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    /// Length of the listing; exceeds the counter sum when unrecognized statuses are present.
    pub total_count: usize,
    pub scheduled_count: usize,
    pub pending_count: usize,
    pub cancelled_count: usize,
    pub documents: Vec<Appointment>,
}

/// Reduce a newest-first listing to per-status counts. Order is kept as given.
pub fn summarize(documents: Vec<Appointment>) -> AppointmentSummary {
    let mut scheduled_count = 0;
    let mut pending_count = 0;
    let mut cancelled_count = 0;

    for appointment in &documents {
        match appointment.status.known() {
            Some(AppointmentStatus::Scheduled) => scheduled_count += 1,
            Some(AppointmentStatus::Pending) => pending_count += 1,
            Some(AppointmentStatus::Cancelled) => cancelled_count += 1,
            None => {}
        }
    }

    AppointmentSummary {
        total_count: documents.len(),
        scheduled_count,
        pending_count,
        cancelled_count,
        documents,
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Appointment not found: {0}")]
    NotFound(String),

    #[error("Appointment rejected: {0}")]
    ValidationRejected(String),

    #[error("Appointment {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) | StoreError::CollectionNotFound { .. } => {
                AppointmentError::StoreUnavailable(err.to_string())
            }
            StoreError::NotFound { id, .. } => AppointmentError::NotFound(id),
            StoreError::Rejected(reason) | StoreError::Conflict(reason) => {
                AppointmentError::ValidationRejected(reason)
            }
        }
    }
}

// ─── Boundary ─────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn RecordStore>,
    database_id: String,
    collection_id: String,
}

impl AppointmentService {
    pub fn new(store: Arc<dyn RecordStore>, ids: &CollectionIds) -> Self {
        Self {
            store,
            database_id: ids.database_id.clone(),
            collection_id: ids.appointments.clone(),
        }
    }

    /// Whole collection, newest first, summarized.
    pub fn fetch_summary(&self) -> Result<AppointmentSummary, AppointmentError> {
        let list = self
            .store
            .list_documents(
                &self.database_id,
                &self.collection_id,
                &[Query::order_desc(ATTR_CREATED_AT)],
            )
            .map_err(|e| store_failure("list appointments", e))?;

        let appointments = list
            .documents
            .iter()
            .map(decode)
            .collect::<Result<Vec<_>, _>>()?;

        if list.total != appointments.len() as u64 {
            tracing::warn!(
                reported = list.total,
                returned = appointments.len(),
                "Store total differs from returned appointments"
            );
        }

        let summary = summarize(appointments);
        tracing::debug!(
            total = summary.total_count,
            scheduled = summary.scheduled_count,
            pending = summary.pending_count,
            cancelled = summary.cancelled_count,
            "Appointment summary computed"
        );
        Ok(summary)
    }

    pub fn create_appointment(&self, new: &NewAppointment) -> Result<Appointment, AppointmentError> {
        let fields = to_fields(new)
            .map_err(|e| AppointmentError::ValidationRejected(e.to_string()))?;
        let doc = self
            .store
            .create_document(&self.database_id, &self.collection_id, DocumentId::Unique, fields)
            .map_err(|e| store_failure("create appointment", e))?;

        tracing::info!(id = %doc.id, status = new.status.as_str(), "Appointment created");
        decode(&doc)
    }

    pub fn get_appointment(&self, id: &str) -> Result<Appointment, AppointmentError> {
        let doc = self
            .store
            .get_document(&self.database_id, &self.collection_id, id)
            .map_err(|e| store_failure("get appointment", e))?;
        decode(&doc)
    }

    /// Write a caller-supplied status (plus optional schedule, physician and
    /// cancellation reason). No transition rules are enforced here.
    /// Any status other than cancelled clears a stored cancellation reason.
    pub fn update_appointment(
        &self,
        id: &str,
        update: &AppointmentUpdate,
    ) -> Result<Appointment, AppointmentError> {
        let mut fields = to_fields(update)
            .map_err(|e| AppointmentError::ValidationRejected(e.to_string()))?;
        if update.status != AppointmentStatus::Cancelled {
            fields.insert("cancellationReason".into(), serde_json::Value::Null);
        }
        let doc = self
            .store
            .update_document(&self.database_id, &self.collection_id, id, fields)
            .map_err(|e| store_failure("update appointment", e))?;

        tracing::info!(id, status = update.status.as_str(), "Appointment updated");
        decode(&doc)
    }
}

fn decode(doc: &Document) -> Result<Appointment, AppointmentError> {
    doc.decode().map_err(|e| {
        tracing::error!(id = %doc.id, error = %e, "Malformed appointment document");
        AppointmentError::Malformed {
            id: doc.id.clone(),
            reason: e.to_string(),
        }
    })
}

fn store_failure(operation: &'static str, err: StoreError) -> AppointmentError {
    match &err {
        StoreError::NotFound { .. } => tracing::warn!(operation, error = %err, "Record store call failed"),
        _ => tracing::error!(operation, error = %err, "Record store call failed"),
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentList, Fields};
    use crate::models::StatusValue;
    use crate::test_support::{memory_store, seed_patient, seed_user, DB};
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 9, minute, 0).unwrap()
    }

    fn appt(id: &str, status: &str, minute: u32) -> Appointment {
        Appointment {
            id: id.into(),
            created_at: at(minute),
            updated_at: at(minute),
            patient: "p1".into(),
            user_id: "u1".into(),
            primary_physician: "John Green".into(),
            schedule: at(minute),
            status: StatusValue::from(status.to_string()),
            reason: "Checkup".into(),
            note: None,
            cancellation_reason: None,
        }
    }

    // ── summarize ──

    #[test]
    fn empty_listing_summarizes_to_zeroes() {
        let summary = summarize(Vec::new());
        assert_eq!(summary.total_count, 0);
        assert_eq!(summary.scheduled_count, 0);
        assert_eq!(summary.pending_count, 0);
        assert_eq!(summary.cancelled_count, 0);
        assert!(summary.documents.is_empty());
    }

    #[test]
    fn mixed_listing_with_unknown_status() {
        let input = vec![
            appt("a", "scheduled", 5),
            appt("b", "pending", 4),
            appt("c", "pending", 3),
            appt("d", "cancelled", 2),
            appt("e", "archived", 1),
        ];
        let summary = summarize(input.clone());
        assert_eq!(summary.total_count, 5);
        assert_eq!(summary.scheduled_count, 1);
        assert_eq!(summary.pending_count, 2);
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.documents, input);
    }

    #[test]
    fn known_statuses_only_counts_sum_to_total() {
        let statuses = ["pending", "scheduled", "cancelled", "pending", "scheduled", "scheduled"];
        let input: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| appt(&i.to_string(), s, i as u32))
            .collect();
        let s = summarize(input);
        assert_eq!(s.scheduled_count + s.pending_count + s.cancelled_count, s.total_count);
    }

    #[test]
    fn any_unknown_status_makes_sum_strictly_smaller() {
        let input = vec![appt("a", "scheduled", 2), appt("b", "Scheduled", 1), appt("c", "", 0)];
        let s = summarize(input);
        assert!(s.scheduled_count + s.pending_count + s.cancelled_count < s.total_count);
        assert_eq!(s.scheduled_count, 1);
    }

    #[test]
    fn order_is_preserved_even_when_not_newest_first() {
        let input = vec![appt("old", "pending", 1), appt("new", "pending", 9)];
        let summary = summarize(input.clone());
        let ids: Vec<_> = summary.documents.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "new"]);
    }

    #[test]
    fn summarize_is_idempotent() {
        let input = vec![appt("a", "cancelled", 2), appt("b", "archived", 1)];
        assert_eq!(summarize(input.clone()), summarize(input));
    }

    #[test]
    fn summary_serializes_camel_case_envelope() {
        let value = serde_json::to_value(summarize(vec![appt("a", "pending", 0)])).unwrap();
        assert_eq!(value["totalCount"], 1);
        assert_eq!(value["pendingCount"], 1);
        assert_eq!(value["scheduledCount"], 0);
        assert_eq!(value["cancelledCount"], 0);
        assert_eq!(value["documents"][0]["$id"], "a");
    }

    // ── boundary ──

    /// Store double whose every call fails the way a dropped network link would.
    struct UnreachableStore;

    impl RecordStore for UnreachableStore {
        fn create_document(&self, _: &str, _: &str, _: DocumentId, _: Fields) -> Result<Document, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn get_document(&self, _: &str, _: &str, _: &str) -> Result<Document, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn list_documents(&self, _: &str, _: &str, _: &[Query]) -> Result<DocumentList, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
        fn update_document(&self, _: &str, _: &str, _: &str, _: Fields) -> Result<Document, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    /// Store double that replays a fixed listing.
    struct CannedStore(DocumentList);

    impl RecordStore for CannedStore {
        fn create_document(&self, _: &str, _: &str, _: DocumentId, _: Fields) -> Result<Document, StoreError> {
            Err(StoreError::Rejected("read-only".into()))
        }
        fn get_document(&self, _: &str, c: &str, id: &str) -> Result<Document, StoreError> {
            Err(StoreError::NotFound { collection_id: c.into(), id: id.into() })
        }
        fn list_documents(&self, _: &str, _: &str, _: &[Query]) -> Result<DocumentList, StoreError> {
            Ok(self.0.clone())
        }
        fn update_document(&self, _: &str, _: &str, _: &str, _: Fields) -> Result<Document, StoreError> {
            Err(StoreError::Rejected("read-only".into()))
        }
    }

    fn service(store: Arc<dyn RecordStore>) -> AppointmentService {
        AppointmentService::new(store, &CollectionIds::default())
    }

    fn new_appointment(user_id: &str, patient_id: &str, status: AppointmentStatus) -> NewAppointment {
        NewAppointment {
            user_id: user_id.into(),
            patient: patient_id.into(),
            primary_physician: "Leila Cameron".into(),
            schedule: at(30),
            status,
            reason: "Persistent cough".into(),
            note: Some("Prefers mornings".into()),
        }
    }

    #[test]
    fn network_failure_is_store_unavailable_not_empty_summary() {
        let err = service(Arc::new(UnreachableStore)).fetch_summary().unwrap_err();
        assert!(matches!(err, AppointmentError::StoreUnavailable(_)));
    }

    #[test]
    fn missing_collection_is_store_unavailable() {
        let store = memory_store();
        let ids = CollectionIds {
            appointments: "no-such-collection".into(),
            ..CollectionIds::default()
        };
        let err = AppointmentService::new(store, &ids).fetch_summary().unwrap_err();
        assert!(matches!(err, AppointmentError::StoreUnavailable(_)));
    }

    #[test]
    fn malformed_document_fails_the_whole_summary() {
        let mut data = Fields::new();
        data.insert("status".into(), json!("pending"));
        let doc = Document {
            id: "broken".into(),
            database_id: DB.into(),
            collection_id: "appointments".into(),
            created_at: at(0),
            updated_at: at(0),
            data,
        };
        let store = CannedStore(DocumentList { total: 1, documents: vec![doc] });
        let err = service(Arc::new(store)).fetch_summary().unwrap_err();
        assert!(matches!(err, AppointmentError::Malformed { ref id, .. } if id == "broken"));
    }

    #[test]
    fn fetch_summary_counts_stored_appointments_newest_first() {
        let store = memory_store();
        let user = seed_user(&*store, "ada@example.com");
        let patient = seed_patient(&*store, &user);
        let svc = service(store.clone());

        let first = svc
            .create_appointment(&new_appointment(&user, &patient, AppointmentStatus::Pending))
            .unwrap();
        let second = svc
            .create_appointment(&new_appointment(&user, &patient, AppointmentStatus::Scheduled))
            .unwrap();
        // Written by some other workflow with a status this service does not know.
        let legacy = store
            .create_document(
                DB,
                "appointments",
                DocumentId::Unique,
                json!({
                    "patient": patient,
                    "userId": user,
                    "primaryPhysician": "John Green",
                    "schedule": "2024-07-02T10:00:00Z",
                    "status": "no-show",
                    "reason": "Follow-up",
                })
                .as_object()
                .unwrap()
                .clone(),
            )
            .unwrap();

        let summary = svc.fetch_summary().unwrap();
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.scheduled_count, 1);
        assert_eq!(summary.cancelled_count, 0);
        let ids: Vec<_> = summary.documents.iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, vec![legacy.id, second.id, first.id]);
        assert_eq!(
            summary.documents[0].status,
            StatusValue::Unrecognized("no-show".into())
        );
    }

    #[test]
    fn create_then_get() {
        let store = memory_store();
        let user = seed_user(&*store, "ada@example.com");
        let patient = seed_patient(&*store, &user);
        let svc = service(store);

        let created = svc
            .create_appointment(&new_appointment(&user, &patient, AppointmentStatus::Pending))
            .unwrap();
        assert_eq!(created.status.known(), Some(AppointmentStatus::Pending));
        assert_eq!(created.note.as_deref(), Some("Prefers mornings"));

        let fetched = svc.get_appointment(&created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn get_unknown_is_not_found() {
        let err = service(memory_store()).get_appointment("nope").unwrap_err();
        assert!(matches!(err, AppointmentError::NotFound(ref id) if id == "nope"));
    }

    #[test]
    fn create_with_dangling_patient_is_rejected() {
        let store = memory_store();
        let user = seed_user(&*store, "ada@example.com");
        let err = service(store)
            .create_appointment(&new_appointment(&user, "ghost", AppointmentStatus::Pending))
            .unwrap_err();
        assert!(matches!(err, AppointmentError::ValidationRejected(_)));
    }

    #[test]
    fn update_writes_status_and_cancellation_reason() {
        let store = memory_store();
        let user = seed_user(&*store, "ada@example.com");
        let patient = seed_patient(&*store, &user);
        let svc = service(store);
        let created = svc
            .create_appointment(&new_appointment(&user, &patient, AppointmentStatus::Pending))
            .unwrap();

        let updated = svc
            .update_appointment(
                &created.id,
                &AppointmentUpdate {
                    status: AppointmentStatus::Cancelled,
                    schedule: None,
                    primary_physician: None,
                    cancellation_reason: Some("Travelling".into()),
                },
            )
            .unwrap();
        assert_eq!(updated.status.known(), Some(AppointmentStatus::Cancelled));
        assert_eq!(updated.cancellation_reason.as_deref(), Some("Travelling"));
        assert_eq!(updated.reason, created.reason);

        let summary = svc.fetch_summary().unwrap();
        assert_eq!(summary.cancelled_count, 1);
        assert_eq!(summary.pending_count, 0);
    }

    #[test]
    fn rescheduling_a_cancelled_appointment_clears_the_reason() {
        let store = memory_store();
        let user = seed_user(&*store, "ada@example.com");
        let patient = seed_patient(&*store, &user);
        let svc = service(store);
        let created = svc
            .create_appointment(&new_appointment(&user, &patient, AppointmentStatus::Pending))
            .unwrap();

        svc.update_appointment(
            &created.id,
            &AppointmentUpdate {
                status: AppointmentStatus::Cancelled,
                schedule: None,
                primary_physician: None,
                cancellation_reason: Some("Travelling".into()),
            },
        )
        .unwrap();

        let rescheduled = svc
            .update_appointment(
                &created.id,
                &AppointmentUpdate {
                    status: AppointmentStatus::Scheduled,
                    schedule: Some(at(45)),
                    primary_physician: Some("Jane Powell".into()),
                    cancellation_reason: None,
                },
            )
            .unwrap();
        assert_eq!(rescheduled.status.known(), Some(AppointmentStatus::Scheduled));
        assert_eq!(rescheduled.cancellation_reason, None);
        assert_eq!(rescheduled.primary_physician, "Jane Powell");

        let stored = svc.get_appointment(&created.id).unwrap();
        assert_eq!(stored.cancellation_reason, None);
    }

    #[test]
    fn update_unknown_is_not_found() {
        let err = service(memory_store())
            .update_appointment(
                "nope",
                &AppointmentUpdate {
                    status: AppointmentStatus::Scheduled,
                    schedule: Some(at(0)),
                    primary_physician: Some("Jane Powell".into()),
                    cancellation_reason: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppointmentError::NotFound(_)));
    }
}
