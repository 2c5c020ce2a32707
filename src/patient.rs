//! Sign-up and patient registration boundary.
//!
//! Identification document uploads are not stored; only the identification
//! type and number travel with the registration.

use std::sync::Arc;

use thiserror::Error;

use crate::config::CollectionIds;
use crate::db::{to_fields, Document, DocumentId, Query, RecordStore, StoreError, ATTR_CREATED_AT};
use crate::models::{NewUser, Patient, PatientRegistration, User};

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Registration rejected: {0}")]
    ValidationRejected(String),

    #[error("{entity} {id} is malformed: {reason}")]
    Malformed {
        entity: &'static str,
        id: String,
        reason: String,
    },
}

impl PatientError {
    fn from_store(entity: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) | StoreError::CollectionNotFound { .. } => {
                PatientError::StoreUnavailable(err.to_string())
            }
            StoreError::NotFound { id, .. } => PatientError::NotFound { entity, id },
            StoreError::Rejected(reason) | StoreError::Conflict(reason) => {
                PatientError::ValidationRejected(reason)
            }
        }
    }
}

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn RecordStore>,
    database_id: String,
    users: String,
    patients: String,
}

impl PatientService {
    pub fn new(store: Arc<dyn RecordStore>, ids: &CollectionIds) -> Self {
        Self {
            store,
            database_id: ids.database_id.clone(),
            users: ids.users.clone(),
            patients: ids.patients.clone(),
        }
    }

    /// Create a user, or return the existing one when the email is taken.
    pub fn create_user(&self, user: &NewUser) -> Result<User, PatientError> {
        let fields = to_fields(user).map_err(|e| PatientError::ValidationRejected(e.to_string()))?;

        match self
            .store
            .create_document(&self.database_id, &self.users, DocumentId::Unique, fields)
        {
            Ok(doc) => {
                tracing::info!(id = %doc.id, "User created");
                decode("User", &doc)
            }
            Err(StoreError::Conflict(reason)) => {
                tracing::info!(%reason, "User already exists, returning existing record");
                self.find_user_by_email(&user.email)
            }
            Err(e) => Err(store_failure("User", "create user", e)),
        }
    }

    pub fn get_user(&self, id: &str) -> Result<User, PatientError> {
        let doc = self
            .store
            .get_document(&self.database_id, &self.users, id)
            .map_err(|e| store_failure("User", "get user", e))?;
        decode("User", &doc)
    }

    fn find_user_by_email(&self, email: &str) -> Result<User, PatientError> {
        let list = self
            .store
            .list_documents(
                &self.database_id,
                &self.users,
                &[Query::equal("email", email), Query::limit(1)],
            )
            .map_err(|e| store_failure("User", "find user by email", e))?;

        match list.documents.first() {
            Some(doc) => decode("User", doc),
            None => Err(PatientError::NotFound {
                entity: "User",
                id: email.to_string(),
            }),
        }
    }

    pub fn register_patient(&self, registration: &PatientRegistration) -> Result<Patient, PatientError> {
        let fields = to_fields(registration)
            .map_err(|e| PatientError::ValidationRejected(e.to_string()))?;
        let doc = self
            .store
            .create_document(&self.database_id, &self.patients, DocumentId::Unique, fields)
            .map_err(|e| store_failure("Patient", "register patient", e))?;

        tracing::info!(id = %doc.id, user_id = %registration.user_id, "Patient registered");
        decode("Patient", &doc)
    }

    /// Most recent patient record registered by `user_id`.
    pub fn get_patient(&self, user_id: &str) -> Result<Patient, PatientError> {
        let list = self
            .store
            .list_documents(
                &self.database_id,
                &self.patients,
                &[
                    Query::equal("userId", user_id),
                    Query::order_desc(ATTR_CREATED_AT),
                    Query::limit(1),
                ],
            )
            .map_err(|e| store_failure("Patient", "get patient", e))?;

        match list.documents.first() {
            Some(doc) => decode("Patient", doc),
            None => {
                tracing::warn!(user_id, "No patient registered for user");
                Err(PatientError::NotFound {
                    entity: "Patient",
                    id: user_id.to_string(),
                })
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(entity: &'static str, doc: &Document) -> Result<T, PatientError> {
    doc.decode().map_err(|e| {
        tracing::error!(entity, id = %doc.id, error = %e, "Malformed document");
        PatientError::Malformed {
            entity,
            id: doc.id.clone(),
            reason: e.to_string(),
        }
    })
}

fn store_failure(entity: &'static str, operation: &'static str, err: StoreError) -> PatientError {
    match &err {
        StoreError::NotFound { .. } => tracing::warn!(operation, error = %err, "Record store call failed"),
        _ => tracing::error!(operation, error = %err, "Record store call failed"),
    }
    PatientError::from_store(entity, err)
}
