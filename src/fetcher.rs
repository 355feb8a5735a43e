use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use crate::config::SourceSettings;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// One request, one page of markup. No retries.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &SourceSettings) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().user_agent(&settings.user_agent);
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        // pages are decoded as UTF-8 whatever the headers claim
        let body = response.bytes().await?;
        debug!(
            "Fetched {} ({} bytes) in {}ms",
            url,
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Append the `page` query parameter to the seed URL.
pub fn page_url(seed: &str, page: u32) -> String {
    let sep = if seed.ends_with('?') || seed.ends_with('&') {
        ""
    } else if seed.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{}{}page={}", seed, sep, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_separators() {
        assert_eq!(
            page_url("https://shop.example/reviews/itm1?pid=X&lid=Y", 3),
            "https://shop.example/reviews/itm1?pid=X&lid=Y&page=3"
        );
        assert_eq!(page_url("https://shop.example/reviews", 1), "https://shop.example/reviews?page=1");
        assert_eq!(page_url("https://shop.example/reviews?", 2), "https://shop.example/reviews?page=2");
        assert_eq!(page_url("https://shop.example/r?a=1&", 2), "https://shop.example/r?a=1&page=2");
    }

    #[test]
    fn client_builds_from_defaults() {
        assert!(HttpFetcher::new(&SourceSettings::default()).is_ok());
    }

    #[test]
    fn status_error_message() {
        let err = FetchError::Status {
            url: "https://shop.example/r?page=2".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "https://shop.example/r?page=2 answered HTTP 404");
    }
}
