use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::db::{RawReview, StoredReview};

/// A record type with a fixed CSV column layout. `HEADER` must list the
/// serialized field names in order.
pub trait CsvRow: Serialize {
    const HEADER: &'static [&'static str];
}

impl CsvRow for RawReview {
    const HEADER: &'static [&'static str] =
        &["rating", "title", "review_text", "reviewer_name", "location", "date"];
}

impl CsvRow for StoredReview {
    const HEADER: &'static [&'static str] =
        &["_id", "rating", "title", "review_text", "reviewer_name", "location", "date"];
}

/// Write `rows` as UTF-8 CSV under the row type's header, creating parent
/// directories. An empty slice still gets the header.
pub fn write_csv<T: CsvRow>(path: &Path, rows: &[T]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer.write_record(T::HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}
