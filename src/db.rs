use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{is_identifier, DocumentStoreSettings, RelationalStoreSettings};

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// One review as scraped. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReview {
    pub rating: String,
    pub title: String,
    pub review_text: String,
    pub reviewer_name: String,
    pub location: String,
    pub date: String,
}

/// A raw document read back from the store. Keys absent from the document
/// (or `null`) come back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoredReview {
    #[serde(rename = "_id")]
    pub id: i64,
    pub rating: Option<String>,
    pub title: Option<String>,
    pub review_text: Option<String>,
    pub reviewer_name: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedReview {
    pub rating: Option<String>,
    pub title: Option<String>,
    pub processed_review: Option<String>,
    pub reviewer_name: Option<String>,
    pub buyer_status: Option<String>,
    pub location_clean: Option<String>,
    pub processed_date: NaiveDateTime,
}

pub const NORMALIZED_COLUMNS: [&str; 7] = [
    "rating",
    "title",
    "processed_review",
    "reviewer_name",
    "buyer_status",
    "location_clean",
    "processed_date",
];

fn open(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

// ── Document store ──

pub fn connect_documents(settings: &DocumentStoreSettings) -> Result<Connection> {
    let conn = open(&settings.path()?)?;
    init_documents(&conn)?;
    Ok(conn)
}

pub fn init_documents(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id          INTEGER PRIMARY KEY,
            collection  TEXT NOT NULL,
            body        TEXT NOT NULL,
            inserted_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);
        ",
    )?;
    Ok(())
}

/// Bulk insert, all or nothing. Bodies are stored as JSON with no schema.
pub fn insert_documents<T: Serialize>(
    conn: &Connection,
    collection: &str,
    docs: &[T],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT INTO documents (collection, body) VALUES (?1, ?2)")?;
        for doc in docs {
            let body = serde_json::to_string(doc)?;
            count += stmt.execute(rusqlite::params![collection, body])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_documents(conn: &Connection, collection: &str) -> Result<Vec<StoredReview>> {
    let mut stmt =
        conn.prepare("SELECT id, body FROM documents WHERE collection = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map([collection], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut docs = Vec::with_capacity(rows.len());
    for (id, body) in rows {
        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(map)) => {
                let field = |key: &str| match map.get(key) {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                };
                docs.push(StoredReview {
                    id,
                    rating: field("rating"),
                    title: field("title"),
                    review_text: field("review_text"),
                    reviewer_name: field("reviewer_name"),
                    location: field("location"),
                    date: field("date"),
                });
            }
            Ok(_) => warn!("Document {} in {} is not an object, skipping", id, collection),
            Err(e) => warn!("Document {} in {} is not valid JSON: {}", id, collection, e),
        }
    }
    debug!("Read {} documents from {}", docs.len(), collection);
    Ok(docs)
}

pub fn count_documents(conn: &Connection, collection: &str) -> Result<usize> {
    let n: usize = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE collection = ?1",
        [collection],
        |r| r.get(0),
    )?;
    Ok(n)
}

// ── Relational store ──

pub fn connect_relational(settings: &RelationalStoreSettings) -> Result<Connection> {
    open(&settings.path()?)
}

/// Drop and recreate `table`, then insert every row in one transaction.
pub fn replace_table(conn: &Connection, table: &str, rows: &[NormalizedReview]) -> Result<usize> {
    if !is_identifier(table) {
        bail!("Refusing to write to table {:?}", table);
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
             rating           TEXT,
             title            TEXT,
             processed_review TEXT,
             reviewer_name    TEXT,
             buyer_status     TEXT,
             location_clean   TEXT,
             processed_date   TEXT NOT NULL
         );"
    ))?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} ({})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            NORMALIZED_COLUMNS.join(", ")
        ))?;
        for r in rows {
            count += stmt.execute(rusqlite::params![
                r.rating,
                r.title,
                r.processed_review,
                r.reviewer_name,
                r.buyer_status,
                r.location_clean,
                r.processed_date.format(DATE_FORMAT).to_string(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    if !is_identifier(table) {
        bail!("Invalid table name {:?}", table);
    }
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(cols)
}

/// Row count, or `None` when the table has not been loaded yet.
pub fn table_rows(conn: &Connection, table: &str) -> Result<Option<usize>> {
    if table_columns(conn, table)?.is_empty() {
        return Ok(None);
    }
    let n: usize = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
    Ok(Some(n))
}
