use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::db::RawReview;
use crate::fetcher::{page_url, PageFetcher};
use crate::parser::pagination::{PageCount, PageCountResolver};
use crate::parser::reviews::ReviewExtractor;

/// Called after every fetched page, before the next request goes out.
pub trait RateLimiter {
    fn pause(&mut self) -> impl Future<Output = ()> + Send;
}

pub struct FixedDelay(pub Duration);

impl RateLimiter for FixedDelay {
    async fn pause(&mut self) {
        tokio::time::sleep(self.0).await;
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapeStats {
    pub pages: u32,
    pub ok: u32,
    pub failed: u32,
    pub reviews: usize,
}

pub struct ScrapeOutcome {
    pub reviews: Vec<RawReview>,
    pub stats: ScrapeStats,
}

/// Walk every review page of `seed_url` in order and collect all reviews.
/// Page failures are logged and skipped; this never fails as a whole.
pub async fn scrape_reviews<F, R>(
    seed_url: &str,
    fetcher: &F,
    resolver: &PageCountResolver,
    extractor: &ReviewExtractor,
    limiter: &mut R,
) -> ScrapeOutcome
where
    F: PageFetcher,
    R: RateLimiter,
{
    let total = match fetcher.fetch(seed_url).await {
        Ok(markup) => resolver.resolve(&markup),
        Err(e) => {
            warn!("Seed page {} unavailable ({}), scraping a single page", seed_url, e);
            PageCount::ONE
        }
    };
    info!("Scraping {} review pages from {}", total, seed_url);

    let pb = ProgressBar::new(u64::from(total.get()));
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let mut reviews = Vec::new();
    let mut stats = ScrapeStats {
        pages: total.get(),
        ..Default::default()
    };

    for page in 1..=total.get() {
        let url = page_url(seed_url, page);
        pb.inc(1);
        let markup = match fetcher.fetch(&url).await {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping page {}/{}: {}", page, total, e);
                stats.failed += 1;
                continue;
            }
        };

        let found = extractor.extract_page(&markup);
        info!("Page {}/{}: {} reviews", page, total, found.len());
        reviews.extend(found);
        stats.ok += 1;

        limiter.pause().await;
    }

    pb.finish_and_clear();
    stats.reviews = reviews.len();
    info!(
        "Scraped {} pages ({} ok, {} failed), {} reviews",
        stats.pages, stats.ok, stats.failed, stats.reviews
    );
    ScrapeOutcome { reviews, stats }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::config::Selectors;
    use crate::fetcher::FetchError;
    use crate::parser::reviews::SENTINEL;

    const SEED: &str = "https://shop.example/product-reviews/itm1?pid=P1";

    #[derive(Default)]
    struct MockFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl MockFetcher {
        fn with(mut self, url: &str, markup: &str) -> Self {
            self.pages.insert(url.to_string(), markup.to_string());
            self
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PageFetcher for MockFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    #[derive(Default)]
    struct CountingLimiter {
        pauses: usize,
    }

    impl RateLimiter for CountingLimiter {
        async fn pause(&mut self) {
            self.pauses += 1;
        }
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn summary(pages: u32) -> String {
        format!(r#"<div class="_1G0WLw mpIySA"><span>Page 1 of {}</span></div>"#, pages)
    }

    fn review_page(titles: &[&str]) -> String {
        let mut html = String::new();
        for t in titles {
            html.push_str(&format!(
                r#"<div class="col EPCmJX Ma1fCG"><p class="z9E0IG">{}</p></div>"#,
                t
            ));
        }
        html
    }

    async fn run(fetcher: &MockFetcher, limiter: &mut CountingLimiter) -> ScrapeOutcome {
        let selectors = Selectors::default();
        let resolver = PageCountResolver::new(&selectors.page_summary).unwrap();
        let extractor = ReviewExtractor::new(&selectors).unwrap();
        scrape_reviews(SEED, fetcher, &resolver, &extractor, limiter).await
    }

    #[tokio::test]
    async fn unreachable_second_page_is_skipped() {
        let page1 = fixture("reviews_page1");
        let fetcher = MockFetcher::default()
            .with(SEED, &page1)
            .with(&page_url(SEED, 1), &page1);
        let mut limiter = CountingLimiter::default();

        let out = run(&fetcher, &mut limiter).await;

        assert_eq!(out.reviews.len(), 2);
        assert_eq!(out.reviews[0].title, "Terrific purchase");
        assert_eq!(out.reviews[1].title, SENTINEL);
        assert_eq!(
            out.stats,
            ScrapeStats {
                pages: 2,
                ok: 1,
                failed: 1,
                reviews: 2
            }
        );
        assert_eq!(
            fetcher.requested(),
            vec![SEED.to_string(), page_url(SEED, 1), page_url(SEED, 2)]
        );
        // no pause after a failed page
        assert_eq!(limiter.pauses, 1);
    }

    #[tokio::test]
    async fn pages_accumulate_in_order() {
        let fetcher = MockFetcher::default()
            .with(SEED, &summary(3))
            .with(&page_url(SEED, 1), &review_page(&["a", "b"]))
            .with(&page_url(SEED, 2), &fixture("reviews_empty"))
            .with(&page_url(SEED, 3), &review_page(&["c"]));
        let mut limiter = CountingLimiter::default();

        let out = run(&fetcher, &mut limiter).await;

        let titles: Vec<&str> = out.reviews.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(out.stats.ok, 3);
        assert_eq!(out.stats.failed, 0);
        assert_eq!(limiter.pauses, 3);
    }

    #[tokio::test]
    async fn unreachable_seed_scrapes_one_page() {
        let fetcher = MockFetcher::default().with(&page_url(SEED, 1), &review_page(&["only"]));
        let mut limiter = CountingLimiter::default();

        let out = run(&fetcher, &mut limiter).await;

        assert_eq!(out.stats.pages, 1);
        assert_eq!(out.reviews.len(), 1);
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn nothing_reachable_yields_empty() {
        let fetcher = MockFetcher::default();
        let mut limiter = CountingLimiter::default();

        let out = run(&fetcher, &mut limiter).await;

        assert!(out.reviews.is_empty());
        assert_eq!(out.stats.failed, 1);
        assert_eq!(limiter.pauses, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_delay_sleeps() {
        let start = tokio::time::Instant::now();
        FixedDelay(Duration::from_secs(1)).pause().await;
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
