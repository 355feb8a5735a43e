pub mod date;
pub mod location;
pub mod text;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{self, NormalizedReview, StoredReview};
use crate::export;
use date::DateNormalizer;
use location::split_location;
use text::TextNormalizer;

pub struct Normalizers {
    pub text: TextNormalizer,
    pub date: DateNormalizer,
}

/// Derive the analysis row from a raw document. The raw review text,
/// location and date do not survive.
pub fn normalize_review(doc: &StoredReview, n: &Normalizers) -> NormalizedReview {
    let (buyer_status, location_clean) = split_location(doc.location.as_deref());
    NormalizedReview {
        rating: doc.rating.clone(),
        title: doc.title.clone(),
        processed_review: n.text.normalize(doc.review_text.as_deref()),
        reviewer_name: doc.reviewer_name.clone(),
        buyer_status,
        location_clean,
        processed_date: n.date.normalize(doc.date.as_deref()),
    }
}

pub struct TransformStats {
    pub documents: usize,
    pub rows: usize,
}

/// Read every document of `collection`, normalize, and replace `table`.
/// A failed backup write is logged and does not stop the load.
pub fn run(
    docs: &Connection,
    collection: &str,
    relational: &Connection,
    table: &str,
    n: &Normalizers,
    backup: Option<&Path>,
) -> Result<TransformStats> {
    let raw = db::fetch_documents(docs, collection)
        .with_context(|| format!("Failed to read collection {}", collection))?;
    info!("Loaded {} documents from {}", raw.len(), collection);

    if let Some(path) = backup {
        match export::write_csv(path, &raw) {
            Ok(_) => info!("Raw backup written to {:?}", path),
            Err(e) => warn!("Raw backup to {:?} failed: {:#}", path, e),
        }
    }

    let rows: Vec<NormalizedReview> = raw.iter().map(|d| normalize_review(d, n)).collect();
    let loaded = db::replace_table(relational, table, &rows)
        .with_context(|| format!("Failed to load table {}", table))?;
    info!("Loaded {} rows into {}", loaded, table);
    Ok(TransformStats {
        documents: raw.len(),
        rows: loaded,
    })
}
