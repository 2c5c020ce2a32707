//! Document representation shared by every record store.
//!
//! A document is a flat JSON object: system attributes are prefixed with `$`
//! (`$id`, `$createdAt`, ...) and everything else is a user attribute
//! constrained by the collection schema.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ATTR_ID: &str = "$id";
pub const ATTR_CREATED_AT: &str = "$createdAt";
pub const ATTR_UPDATED_AT: &str = "$updatedAt";

/// Maximum length of a caller-chosen document id.
pub const MAX_ID_LEN: usize = 36;

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$databaseId")]
    pub database_id: String,
    #[serde(rename = "$collectionId")]
    pub collection_id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "$updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Fields,
}

impl Document {
    /// Decode into a typed record. System attributes are visible to the
    /// target type under their `$` names.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }
}

/// A page of documents plus the number of matches ignoring limit/offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentList {
    pub total: u64,
    pub documents: Vec<Document>,
}

/// Id to assign on create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentId {
    /// Let the store generate one.
    Unique,
    Custom(String),
}

impl DocumentId {
    pub fn custom(id: impl Into<String>) -> Self {
        Self::Custom(id.into())
    }
}

/// Check a caller-chosen id: 1–36 chars of `[A-Za-z0-9._-]`, alphanumeric first.
pub fn validate_custom_id(id: &str) -> Result<(), String> {
    if id.is_empty() || id.len() > MAX_ID_LEN {
        return Err(format!("Document id must be 1-{MAX_ID_LEN} characters"));
    }
    let mut chars = id.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err("Document id must start with a letter or digit".into());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
        return Err("Document id may only contain a-z, A-Z, 0-9, '.', '_' and '-'".into());
    }
    Ok(())
}

/// Query clauses accepted by `RecordStore::list_documents`.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Attribute equals any of the values.
    Equal { attribute: String, values: Vec<Value> },
    OrderAsc(String),
    OrderDesc(String),
    Limit(usize),
    Offset(usize),
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal {
            attribute: attribute.into(),
            values: vec![value.into()],
        }
    }

    pub fn equal_any<I, V>(attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Equal {
            attribute: attribute.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Self::OrderAsc(attribute.into())
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self::OrderDesc(attribute.into())
    }

    pub fn limit(n: usize) -> Self {
        Self::Limit(n)
    }

    pub fn offset(n: usize) -> Self {
        Self::Offset(n)
    }
}

/// Serialize a record into document fields. Fails unless it serializes to an object.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Fixed-width UTC timestamp; lexical order equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}
