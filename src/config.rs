use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::date::DatePolicy;

const ENV_PREFIX: &str = "REVIEWS";

const SQLITE_SCHEME: &str = "sqlite:";

const DEFAULT_SEED_URL: &str = "https://www.flipkart.com/samsung-galaxy-s24-ultra-5g-titanium-gray-256-gb/product-reviews/itm12ef5ea0212ed?pid=MOBGX2F3RQKKKTAW&lid=LSTMOBGX2F3RQKKKTAWNDZUYP&marketplace=FLIPKART";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("seed url must not be empty")]
    EmptySeedUrl,
    #[error("table name {0:?} is not a plain identifier")]
    InvalidTable(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("unsupported store url {0:?}, expected sqlite:<path>")]
    UnsupportedUrl(String),
}

/// Every endpoint and tunable of the pipeline. Nothing downstream reads
/// constants for these; components receive the relevant section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub selectors: Selectors,
    pub output: OutputSettings,
    pub document_store: DocumentStoreSettings,
    pub relational_store: RelationalStoreSettings,
    pub transform: TransformSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub seed_url: String,
    /// Pause after every successfully fetched page.
    pub delay_ms: u64,
    /// Transport timeout per request; `None` leaves it to the server.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            seed_url: DEFAULT_SEED_URL.to_string(),
            delay_ms: 1000,
            timeout_secs: Some(30),
            user_agent: concat!("review_etl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SourceSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// CSS selectors for the review listing markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub page_summary: String,
    pub container: String,
    pub rating: String,
    pub title: String,
    pub review_text: String,
    pub reviewer_name: String,
    pub location: String,
    /// Matches several elements per container; the last one is the date.
    pub date: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            page_summary: "div._1G0WLw.mpIySA span".to_string(),
            container: "div.col.EPCmJX.Ma1fCG".to_string(),
            rating: "div.XQDdHH.Ga3i8K".to_string(),
            title: "p.z9E0IG".to_string(),
            review_text: "div.ZmyHeo".to_string(),
            reviewer_name: "p._2NsDsF.AwS1CA".to_string(),
            location: "p.MztJPv".to_string(),
            date: "p._2NsDsF".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub csv_path: PathBuf,
    /// Copy of the documents read back by the transform stage.
    pub backup_csv: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("outputs/flip_review.csv"),
            backup_csv: Some(PathBuf::from("outputs/output_file.csv")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreSettings {
    /// Directory holding one SQLite file per database, `sqlite:<dir>`.
    pub url: String,
    pub database: String,
    pub collection: String,
}

impl Default for DocumentStoreSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:data".to_string(),
            database: "flipkart".to_string(),
            collection: "flipkart_review".to_string(),
        }
    }
}

impl DocumentStoreSettings {
    pub fn path(&self) -> Result<PathBuf, SettingsError> {
        Ok(sqlite_path(&self.url)?.join(format!("{}.sqlite", self.database)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationalStoreSettings {
    /// Database file, `sqlite:<path>`.
    pub url: String,
    pub table: String,
}

impl Default for RelationalStoreSettings {
    fn default() -> Self {
        Self {
            url: "sqlite:data/reviews_db.sqlite".to_string(),
            table: "flipkart_reviews_transformed".to_string(),
        }
    }
}

impl RelationalStoreSettings {
    pub fn path(&self) -> Result<PathBuf, SettingsError> {
        sqlite_path(&self.url)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformSettings {
    pub date_policy: DatePolicy,
}

impl Settings {
    /// Layer an optional TOML file and `REVIEWS_*` environment variables over
    /// the defaults. Nested keys use `__`, e.g. `REVIEWS_SOURCE__DELAY_MS`.
    pub fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.source.seed_url.trim().is_empty() {
            return Err(SettingsError::EmptySeedUrl);
        }
        if self.document_store.database.trim().is_empty() {
            return Err(SettingsError::Empty("document_store.database"));
        }
        if self.document_store.collection.trim().is_empty() {
            return Err(SettingsError::Empty("document_store.collection"));
        }
        self.document_store.path()?;
        self.relational_store.path()?;
        if !is_identifier(&self.relational_store.table) {
            return Err(SettingsError::InvalidTable(
                self.relational_store.table.clone(),
            ));
        }
        Ok(())
    }
}

/// Path part of a `sqlite:<path>` or `sqlite://<path>` url.
pub fn sqlite_path(url: &str) -> Result<PathBuf, SettingsError> {
    let rest = url
        .trim()
        .strip_prefix(SQLITE_SCHEME)
        .ok_or_else(|| SettingsError::UnsupportedUrl(url.to_string()))?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    if rest.is_empty() {
        return Err(SettingsError::UnsupportedUrl(url.to_string()));
    }
    Ok(PathBuf::from(rest))
}

/// Table names are interpolated into DDL, so only `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
