//! Collection schemas enforced by the store on every write.

use chrono::NaiveDate;
use serde_json::Value;

use super::document::{parse_timestamp, Fields};
use crate::config::CollectionIds;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    String { max_len: usize },
    Email,
    Boolean,
    /// RFC 3339 timestamp with offset.
    Timestamp,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Id of a document in another collection of the same database.
    Reference { collection_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: String,
    pub kind: AttributeKind,
    pub required: bool,
    pub unique: bool,
}

impl Attribute {
    pub fn new(key: &str, kind: AttributeKind) -> Self {
        Self {
            key: key.to_string(),
            kind,
            required: false,
            unique: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

fn string(key: &str, max_len: usize) -> Attribute {
    Attribute::new(key, AttributeKind::String { max_len })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub database_id: String,
    pub collection_id: String,
    pub attributes: Vec<Attribute>,
}

/// Whether a write carries the whole document or only changed attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

impl CollectionSchema {
    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key == key)
    }

    /// Type and presence checks that need no other documents.
    /// Returns the reason for the first violation found.
    pub fn check(&self, fields: &Fields, mode: WriteMode) -> Result<(), String> {
        for key in fields.keys() {
            if key.starts_with('$') {
                return Err(format!("System attribute {key} cannot be written"));
            }
            if self.attribute(key).is_none() {
                return Err(format!(
                    "Unknown attribute {key} for collection {}",
                    self.collection_id
                ));
            }
        }

        for attr in &self.attributes {
            match fields.get(&attr.key) {
                None | Some(Value::Null) => {
                    let missing = fields.get(&attr.key).is_none();
                    // Updates may omit attributes, but never null out a required one.
                    if attr.required && !(mode == WriteMode::Update && missing) {
                        return Err(format!("Missing required attribute {}", attr.key));
                    }
                }
                Some(value) => check_kind(&attr.key, &attr.kind, value)?,
            }
        }
        Ok(())
    }

    /// References present in `fields`, as `(attribute, collection_id, id)`.
    pub fn references<'a>(&'a self, fields: &'a Fields) -> Vec<(&'a str, &'a str, &'a str)> {
        self.attributes
            .iter()
            .filter_map(|attr| match (&attr.kind, fields.get(&attr.key)) {
                (AttributeKind::Reference { collection_id }, Some(Value::String(id))) => {
                    Some((attr.key.as_str(), collection_id.as_str(), id.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// Unique attributes present in `fields`, with their values.
    pub fn unique_values<'a>(&'a self, fields: &'a Fields) -> Vec<(&'a str, &'a Value)> {
        self.attributes
            .iter()
            .filter(|attr| attr.unique)
            .filter_map(|attr| match fields.get(&attr.key) {
                Some(Value::Null) | None => None,
                Some(value) => Some((attr.key.as_str(), value)),
            })
            .collect()
    }
}

fn check_kind(key: &str, kind: &AttributeKind, value: &Value) -> Result<(), String> {
    match (kind, value) {
        (AttributeKind::String { max_len }, Value::String(s)) => {
            if s.chars().count() > *max_len {
                return Err(format!("Attribute {key} exceeds {max_len} characters"));
            }
            Ok(())
        }
        (AttributeKind::Email, Value::String(s)) => {
            if crate::validation::is_valid_email(s) {
                Ok(())
            } else {
                Err(format!("Attribute {key} is not a valid email"))
            }
        }
        (AttributeKind::Boolean, Value::Bool(_)) => Ok(()),
        (AttributeKind::Timestamp, Value::String(s)) => match parse_timestamp(s) {
            Ok(_) => Ok(()),
            Err(_) => Err(format!("Attribute {key} is not an RFC 3339 timestamp")),
        },
        (AttributeKind::Date, Value::String(s)) => {
            match NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Ok(_) => Ok(()),
                Err(_) => Err(format!("Attribute {key} is not a YYYY-MM-DD date")),
            }
        }
        (AttributeKind::Reference { .. }, Value::String(s)) if !s.is_empty() => Ok(()),
        _ => Err(format!("Attribute {key} has the wrong type")),
    }
}

/// Schemas for the users, patients and appointments collections.
pub fn default_schemas(ids: &CollectionIds) -> Vec<CollectionSchema> {
    let reference = |collection_id: &str| AttributeKind::Reference {
        collection_id: collection_id.to_string(),
    };

    let users = CollectionSchema {
        database_id: ids.database_id.clone(),
        collection_id: ids.users.clone(),
        attributes: vec![
            string("name", 100).required(),
            Attribute::new("email", AttributeKind::Email).required().unique(),
            string("phone", 32).required(),
        ],
    };

    let patients = CollectionSchema {
        database_id: ids.database_id.clone(),
        collection_id: ids.patients.clone(),
        attributes: vec![
            Attribute::new("userId", reference(&ids.users)).required(),
            string("name", 100).required(),
            Attribute::new("email", AttributeKind::Email).required(),
            string("phone", 32).required(),
            Attribute::new("birthDate", AttributeKind::Date).required(),
            string("gender", 16).required(),
            string("address", 500).required(),
            string("occupation", 500).required(),
            string("emergencyContactName", 50).required(),
            string("emergencyContactNumber", 32).required(),
            string("primaryPhysician", 100).required(),
            string("insuranceProvider", 50).required(),
            string("insurancePolicyNumber", 50).required(),
            string("allergies", 1000),
            string("currentMedication", 1000),
            string("familyMedicalHistory", 1000),
            string("pastMedicalHistory", 1000),
            string("identificationType", 50),
            string("identificationNumber", 50),
            Attribute::new("treatmentConsent", AttributeKind::Boolean).required(),
            Attribute::new("disclosureConsent", AttributeKind::Boolean).required(),
            Attribute::new("privacyConsent", AttributeKind::Boolean).required(),
        ],
    };

    let appointments = CollectionSchema {
        database_id: ids.database_id.clone(),
        collection_id: ids.appointments.clone(),
        attributes: vec![
            Attribute::new("patient", reference(&ids.patients)).required(),
            Attribute::new("userId", reference(&ids.users)).required(),
            string("primaryPhysician", 100).required(),
            Attribute::new("schedule", AttributeKind::Timestamp).required(),
            // Plain string: rows written by older workflows may carry other statuses.
            string("status", 32).required(),
            string("reason", 500).required(),
            string("note", 500),
            string("cancellationReason", 500),
        ],
    };

    vec![users, patients, appointments]
}
