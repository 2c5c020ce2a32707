//! Record store: create / get / list / update over schema-checked collections.
//!
//! Boundaries hold an `Arc<dyn RecordStore>` so tests can swap in doubles.
//! `SqliteRecordStore` keeps every collection in one `documents` table and
//! serializes access through a single connection.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::document::{
    format_timestamp, parse_timestamp, validate_custom_id, Document, DocumentId, DocumentList,
    Fields, Query, ATTR_CREATED_AT, ATTR_ID, ATTR_UPDATED_AT,
};
use super::schema::{CollectionSchema, WriteMode};
use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    #[error("Collection not found: {database_id}/{collection_id}")]
    CollectionNotFound {
        database_id: String,
        collection_id: String,
    },

    #[error("Document not found: {collection_id}/{id}")]
    NotFound { collection_id: String, id: String },

    #[error("Document rejected: {0}")]
    Rejected(String),

    #[error("Document conflict: {0}")]
    Conflict(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => StoreError::Conflict(err.to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<DatabaseError> for StoreError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Sqlite(e) => e.into(),
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Document store consumed by the appointment and patient boundaries.
pub trait RecordStore: Send + Sync {
    fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: DocumentId,
        fields: Fields,
    ) -> Result<Document, StoreError>;

    fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
    ) -> Result<Document, StoreError>;

    fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, StoreError>;

    /// Merge `fields` into an existing document and bump `$updatedAt`.
    fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError>;
}

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    schemas: HashMap<(String, String), CollectionSchema>,
}

impl SqliteRecordStore {
    /// Open (or create) a file-backed store and run migrations.
    pub fn open(path: &Path, schemas: Vec<CollectionSchema>) -> Result<Self, DatabaseError> {
        Ok(Self::with_connection(open_database(path)?, schemas))
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(schemas: Vec<CollectionSchema>) -> Result<Self, DatabaseError> {
        Ok(Self::with_connection(open_memory_database()?, schemas))
    }

    /// Wrap an already migrated connection.
    pub fn with_connection(conn: Connection, schemas: Vec<CollectionSchema>) -> Self {
        let schemas = schemas
            .into_iter()
            .map(|s| ((s.database_id.clone(), s.collection_id.clone()), s))
            .collect();
        Self {
            conn: Mutex::new(conn),
            schemas,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))
    }

    fn schema(&self, database_id: &str, collection_id: &str) -> Result<&CollectionSchema, StoreError> {
        self.schemas
            .get(&(database_id.to_string(), collection_id.to_string()))
            .ok_or_else(|| StoreError::CollectionNotFound {
                database_id: database_id.to_string(),
                collection_id: collection_id.to_string(),
            })
    }
}

impl RecordStore for SqliteRecordStore {
    fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: DocumentId,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let schema = self.schema(database_id, collection_id)?;
        let id = match id {
            DocumentId::Unique => Uuid::new_v4().simple().to_string(),
            DocumentId::Custom(id) => {
                validate_custom_id(&id).map_err(StoreError::Rejected)?;
                id
            }
        };
        schema
            .check(&fields, WriteMode::Create)
            .map_err(StoreError::Rejected)?;

        let conn = self.lock()?;
        check_references(&conn, schema, &fields)?;
        check_unique(&conn, schema, &fields, None)?;

        let now = Utc::now();
        let stamp = format_timestamp(&now);
        let payload = serde_json::to_string(&fields)
            .map_err(|e| StoreError::Rejected(format!("Unserializable document: {e}")))?;

        conn.execute(
            "INSERT INTO documents (database_id, collection_id, id, created_at, updated_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![database_id, collection_id, id, stamp, stamp, payload],
        )
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict(format!("Document {collection_id}/{id} already exists"))
            }
            other => other,
        })?;

        tracing::debug!(database_id, collection_id, id = %id, "Document created");

        Ok(Document {
            id,
            database_id: database_id.to_string(),
            collection_id: collection_id.to_string(),
            created_at: now,
            updated_at: now,
            data: fields,
        })
    }

    fn get_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
    ) -> Result<Document, StoreError> {
        self.schema(database_id, collection_id)?;
        let conn = self.lock()?;
        fetch_document(&conn, database_id, collection_id, id)?.ok_or_else(|| StoreError::NotFound {
            collection_id: collection_id.to_string(),
            id: id.to_string(),
        })
    }

    fn list_documents(
        &self,
        database_id: &str,
        collection_id: &str,
        queries: &[Query],
    ) -> Result<DocumentList, StoreError> {
        let schema = self.schema(database_id, collection_id)?;
        let plan = ListPlan::build(schema, queries)?;

        let conn = self.lock()?;

        let mut where_params: Vec<SqlValue> =
            vec![database_id.to_string().into(), collection_id.to_string().into()];
        where_params.extend(plan.where_params.iter().cloned());

        let count_sql = format!("SELECT COUNT(*) FROM documents WHERE {}", plan.where_sql);
        let total: i64 = conn.query_row(&count_sql, params_from_iter(where_params.iter()), |row| {
            row.get(0)
        })?;

        let select_sql = format!(
            "SELECT id, created_at, updated_at, data FROM documents WHERE {} ORDER BY {} LIMIT ?{}",
            plan.where_sql,
            plan.order_sql,
            if plan.offset.is_some() { " OFFSET ?" } else { "" },
        );
        let mut select_params = where_params;
        select_params.extend(plan.order_params.iter().cloned());
        select_params.push(plan.limit.map_or(-1, |n| n as i64).into());
        if let Some(offset) = plan.offset {
            select_params.push((offset as i64).into());
        }

        let mut stmt = conn.prepare(&select_sql)?;
        let rows = stmt
            .query_map(params_from_iter(select_params.iter()), read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let documents = rows
            .into_iter()
            .map(|row| row.into_document(database_id, collection_id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DocumentList {
            total: total as u64,
            documents,
        })
    }

    fn update_document(
        &self,
        database_id: &str,
        collection_id: &str,
        id: &str,
        fields: Fields,
    ) -> Result<Document, StoreError> {
        let schema = self.schema(database_id, collection_id)?;
        schema
            .check(&fields, WriteMode::Update)
            .map_err(StoreError::Rejected)?;

        let conn = self.lock()?;
        let mut doc = fetch_document(&conn, database_id, collection_id, id)?.ok_or_else(|| {
            StoreError::NotFound {
                collection_id: collection_id.to_string(),
                id: id.to_string(),
            }
        })?;

        check_references(&conn, schema, &fields)?;
        check_unique(&conn, schema, &fields, Some(id))?;

        for (key, value) in fields {
            if value.is_null() {
                doc.data.remove(&key);
            } else {
                doc.data.insert(key, value);
            }
        }
        doc.updated_at = Utc::now();

        let payload = serde_json::to_string(&doc.data)
            .map_err(|e| StoreError::Rejected(format!("Unserializable document: {e}")))?;
        conn.execute(
            "UPDATE documents SET data = ?1, updated_at = ?2
             WHERE database_id = ?3 AND collection_id = ?4 AND id = ?5",
            params![
                payload,
                format_timestamp(&doc.updated_at),
                database_id,
                collection_id,
                id
            ],
        )?;

        tracing::debug!(database_id, collection_id, id, "Document updated");
        Ok(doc)
    }
}

// ═══════════════════════════════════════════
// Row access
// ═══════════════════════════════════════════

struct DocumentRow {
    id: String,
    created_at: String,
    updated_at: String,
    data: String,
}

impl DocumentRow {
    fn into_document(self, database_id: &str, collection_id: &str) -> Result<Document, StoreError> {
        let corrupt = |what: &str, e: &dyn std::fmt::Display| {
            StoreError::Unavailable(format!(
                "Corrupt {what} in {collection_id}/{}: {e}",
                self.id
            ))
        };
        let created_at = parse_timestamp(&self.created_at).map_err(|e| corrupt("$createdAt", &e))?;
        let updated_at = parse_timestamp(&self.updated_at).map_err(|e| corrupt("$updatedAt", &e))?;
        let data: Fields = serde_json::from_str(&self.data).map_err(|e| corrupt("payload", &e))?;
        Ok(Document {
            id: self.id,
            database_id: database_id.to_string(),
            collection_id: collection_id.to_string(),
            created_at,
            updated_at,
            data,
        })
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        created_at: row.get(1)?,
        updated_at: row.get(2)?,
        data: row.get(3)?,
    })
}

fn fetch_document(
    conn: &Connection,
    database_id: &str,
    collection_id: &str,
    id: &str,
) -> Result<Option<Document>, StoreError> {
    let row = conn
        .query_row(
            "SELECT id, created_at, updated_at, data FROM documents
             WHERE database_id = ?1 AND collection_id = ?2 AND id = ?3",
            params![database_id, collection_id, id],
            read_row,
        )
        .optional()?;
    row.map(|r| r.into_document(database_id, collection_id))
        .transpose()
}

fn check_references(
    conn: &Connection,
    schema: &CollectionSchema,
    fields: &Fields,
) -> Result<(), StoreError> {
    for (attribute, target, id) in schema.references(fields) {
        let exists = conn
            .query_row(
                "SELECT 1 FROM documents WHERE database_id = ?1 AND collection_id = ?2 AND id = ?3",
                params![schema.database_id, target, id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::Rejected(format!(
                "Attribute {attribute} references missing {target} document {id}"
            )));
        }
    }
    Ok(())
}

fn check_unique(
    conn: &Connection,
    schema: &CollectionSchema,
    fields: &Fields,
    exclude_id: Option<&str>,
) -> Result<(), StoreError> {
    for (attribute, value) in schema.unique_values(fields) {
        let taken = conn
            .query_row(
                "SELECT 1 FROM documents
                 WHERE database_id = ?1 AND collection_id = ?2
                   AND json_extract(data, ?3) = ?4 AND id IS NOT ?5
                 LIMIT 1",
                params![
                    schema.database_id,
                    schema.collection_id,
                    json_path(attribute),
                    json_to_sql(attribute, value)?,
                    exclude_id
                ],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if taken {
            return Err(StoreError::Conflict(format!(
                "Another {} document already has this {attribute}",
                schema.collection_id
            )));
        }
    }
    Ok(())
}

fn json_path(attribute: &str) -> String {
    format!("$.{attribute}")
}

fn json_to_sql(attribute: &str, value: &Value) -> Result<SqlValue, StoreError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(SqlValue::Integer(i)),
            None => n
                .as_f64()
                .map(SqlValue::Real)
                .ok_or_else(|| StoreError::Rejected(format!("Unsupported number for {attribute}"))),
        },
        Value::Array(_) | Value::Object(_) => Err(StoreError::Rejected(format!(
            "Attribute {attribute} cannot be compared against a composite value"
        ))),
    }
}

// ═══════════════════════════════════════════
// Query planning
// ═══════════════════════════════════════════

/// SQL fragments for a list call. `where_sql` opens with the database and
/// collection predicates; the caller binds those two parameters first.
#[derive(Debug)]
struct ListPlan {
    where_sql: String,
    where_params: Vec<SqlValue>,
    order_sql: String,
    order_params: Vec<SqlValue>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl ListPlan {
    fn build(schema: &CollectionSchema, queries: &[Query]) -> Result<Self, StoreError> {
        let mut where_sql = String::from("database_id = ? AND collection_id = ?");
        let mut where_params = Vec::new();
        let mut orders: Vec<String> = Vec::new();
        let mut order_params = Vec::new();
        let mut limit = None;
        let mut offset = None;

        for query in queries {
            match query {
                Query::Equal { attribute, values } => {
                    if values.is_empty() {
                        return Err(StoreError::Rejected(format!(
                            "Equal query on {attribute} needs at least one value"
                        )));
                    }
                    let (expr, param) = column(schema, attribute)?;
                    where_params.extend(param);
                    let placeholders = vec!["?"; values.len()].join(", ");
                    where_sql.push_str(&format!(" AND {expr} IN ({placeholders})"));
                    for value in values {
                        where_params.push(json_to_sql(attribute, value)?);
                    }
                }
                Query::OrderAsc(attribute) | Query::OrderDesc(attribute) => {
                    let (expr, param) = column(schema, attribute)?;
                    order_params.extend(param);
                    let dir = if matches!(query, Query::OrderAsc(_)) { "ASC" } else { "DESC" };
                    orders.push(format!("{expr} {dir}"));
                }
                Query::Limit(n) => limit = Some(*n),
                Query::Offset(n) => offset = Some(*n),
            }
        }

        // Ties fall back to insertion order, in the direction of the primary sort.
        let primary = queries
            .iter()
            .find(|q| matches!(q, Query::OrderAsc(_) | Query::OrderDesc(_)));
        let tiebreak = match primary {
            Some(Query::OrderDesc(_)) => "seq DESC",
            _ => "seq ASC",
        };
        orders.push(tiebreak.to_string());

        Ok(Self {
            where_sql,
            where_params,
            order_sql: orders.join(", "),
            order_params,
            limit,
            offset,
        })
    }
}

/// SQL expression for an attribute, plus the JSON path parameter it binds.
fn column(schema: &CollectionSchema, attribute: &str) -> Result<(&'static str, Option<SqlValue>), StoreError> {
    match attribute {
        ATTR_ID => Ok(("id", None)),
        ATTR_CREATED_AT => Ok(("created_at", None)),
        ATTR_UPDATED_AT => Ok(("updated_at", None)),
        key if schema.attribute(key).is_some() => {
            Ok(("json_extract(data, ?)", Some(SqlValue::Text(json_path(key)))))
        }
        key => Err(StoreError::Rejected(format!(
            "Unknown attribute {key} in query on {}",
            schema.collection_id
        ))),
    }
}
