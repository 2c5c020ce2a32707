//! Shared fixtures for unit tests.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::config::CollectionIds;
use crate::db::{default_schemas, to_fields, DocumentId, RecordStore, SqliteRecordStore};
use crate::models::enums::Gender;
use crate::models::PatientRegistration;

pub const DB: &str = crate::config::DEFAULT_DATABASE_ID;

pub fn memory_store() -> Arc<SqliteRecordStore> {
    Arc::new(SqliteRecordStore::open_in_memory(default_schemas(&CollectionIds::default())).unwrap())
}

/// Insert a user document and return its id.
pub fn seed_user(store: &dyn RecordStore, email: &str) -> String {
    let fields = json!({"name": "Ada Lovelace", "email": email, "phone": "+15550001111"});
    store
        .create_document(DB, "users", DocumentId::Unique, fields.as_object().unwrap().clone())
        .unwrap()
        .id
}

pub fn registration(user_id: &str) -> PatientRegistration {
    PatientRegistration {
        user_id: user_id.into(),
        name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "+15550001111".into(),
        birth_date: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
        gender: Gender::Female,
        address: "12 Analytical Way, London".into(),
        occupation: "Mathematician".into(),
        emergency_contact_name: "Charles Babbage".into(),
        emergency_contact_number: "+15550002222".into(),
        primary_physician: "Jane Powell".into(),
        insurance_provider: "Acme Health".into(),
        insurance_policy_number: "ABC123456".into(),
        allergies: Some("Penicillin".into()),
        current_medication: None,
        family_medical_history: None,
        past_medical_history: None,
        identification_type: None,
        identification_number: None,
        treatment_consent: true,
        disclosure_consent: true,
        privacy_consent: true,
    }
}

/// Insert a patient document for `user_id` and return its id.
pub fn seed_patient(store: &dyn RecordStore, user_id: &str) -> String {
    store
        .create_document(
            DB,
            "patients",
            DocumentId::Unique,
            to_fields(&registration(user_id)).unwrap(),
        )
        .unwrap()
        .id
}
