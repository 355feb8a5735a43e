mod config;
mod crawl;
mod db;
mod export;
mod fetcher;
mod parser;
mod transform;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::config::Settings;
use crate::crawl::FixedDelay;
use crate::fetcher::HttpFetcher;
use crate::parser::pagination::PageCountResolver;
use crate::parser::reviews::ReviewExtractor;
use crate::transform::date::DateNormalizer;
use crate::transform::text::{Lexicon, TextNormalizer};
use crate::transform::Normalizers;

#[derive(Parser)]
#[command(name = "review_etl", about = "Product review scraper and normalizer")]
struct Cli {
    /// TOML settings file (REVIEWS_* environment variables apply on top)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Default)]
struct SourceArgs {
    /// Review listing URL; `page=N` is appended per page
    #[arg(long)]
    seed_url: Option<String>,
    /// Pause between page requests in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,
    /// Where to write the raw reviews CSV
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all review pages into the CSV file and document store
    Extract {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Normalize stored documents into the relational table
    Transform,
    /// Extract, then transform
    Run {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show document and table counts
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Extract { source } => {
            apply_overrides(&mut settings, source)?;
            extract(&settings).await
        }
        Commands::Transform => transform(&settings),
        Commands::Run { source } => {
            apply_overrides(&mut settings, source)?;
            let t_extract = Instant::now();
            extract(&settings).await?;
            println!("Extracted in {:.1}s", t_extract.elapsed().as_secs_f64());
            transform(&settings)
        }
        Commands::Stats => stats(&settings),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn apply_overrides(settings: &mut Settings, args: SourceArgs) -> Result<()> {
    if let Some(url) = args.seed_url {
        settings.source.seed_url = url;
    }
    if let Some(ms) = args.delay_ms {
        settings.source.delay_ms = ms;
    }
    if let Some(csv) = args.csv {
        settings.output.csv_path = csv;
    }
    settings.validate()?;
    Ok(())
}

async fn extract(settings: &Settings) -> Result<()> {
    let fetcher = HttpFetcher::new(&settings.source)?;
    let resolver = PageCountResolver::new(&settings.selectors.page_summary)?;
    let extractor = ReviewExtractor::new(&settings.selectors)?;
    let mut limiter = FixedDelay(settings.source.delay());

    let outcome = crawl::scrape_reviews(
        &settings.source.seed_url,
        &fetcher,
        &resolver,
        &extractor,
        &mut limiter,
    )
    .await;
    let s = &outcome.stats;
    println!(
        "Scraped {} pages ({} ok, {} failed): {} reviews.",
        s.pages, s.ok, s.failed, s.reviews
    );

    let csv_path = &settings.output.csv_path;
    match export::write_csv(csv_path, &outcome.reviews) {
        Ok(n) => println!("Saved {} reviews to {}", n, csv_path.display()),
        Err(e) => error!("Writing {:?} failed: {:#}", csv_path, e),
    }

    let store = &settings.document_store;
    let stored = db::connect_documents(store)
        .and_then(|conn| db::insert_documents(&conn, &store.collection, &outcome.reviews));
    match stored {
        Ok(n) => {
            println!("Inserted {} reviews into {}", n, store.collection);
            Ok(())
        }
        Err(e) => {
            error!("Document store write failed: {:#}", e);
            Err(e.context(format!("Failed to store reviews in {}", store.url)))
        }
    }
}

fn transform(settings: &Settings) -> Result<()> {
    let docs = db::connect_documents(&settings.document_store)?;
    let relational = db::connect_relational(&settings.relational_store)?;
    let normalizers = Normalizers {
        text: TextNormalizer::new(Lexicon::english()),
        date: DateNormalizer::new(settings.transform.date_policy),
    };
    info!("Date policy: {:?}", settings.transform.date_policy);

    let table = &settings.relational_store.table;
    let stats = transform::run(
        &docs,
        &settings.document_store.collection,
        &relational,
        table,
        &normalizers,
        settings.output.backup_csv.as_deref(),
    )
    .map_err(|e| {
        error!("Transform failed: {:#}", e);
        e
    })?;
    println!(
        "Loaded {} rows into {} ({} documents read).",
        stats.rows, table, stats.documents
    );
    Ok(())
}

fn stats(settings: &Settings) -> Result<()> {
    let store = &settings.document_store;
    let docs = db::connect_documents(store)?;
    let documents = db::count_documents(&docs, &store.collection)?;
    println!("Documents: {} ({} in {}/{})", documents, store.collection, store.url, store.database);

    let rel = &settings.relational_store;
    let relational = db::connect_relational(rel)
        .with_context(|| format!("Failed to open {}", rel.url))?;
    match db::table_rows(&relational, &rel.table)? {
        Some(rows) => {
            println!("Rows:      {} ({})", rows, rel.table);
            let cols = db::table_columns(&relational, &rel.table)?;
            println!("Columns:   {}", cols.join(", "));
        }
        None => println!("Rows:      - ({} not loaded yet)", rel.table),
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply() {
        let cli = Cli::try_parse_from([
            "review_etl",
            "extract",
            "--seed-url",
            "https://shop.example/r?pid=9",
            "--delay-ms",
            "0",
        ])
        .unwrap();
        let Commands::Extract { source } = cli.command else {
            panic!("expected extract");
        };
        let mut settings = Settings::default();
        apply_overrides(&mut settings, source).unwrap();
        assert_eq!(settings.source.seed_url, "https://shop.example/r?pid=9");
        assert_eq!(settings.source.delay_ms, 0);
    }

    #[test]
    fn durations() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
