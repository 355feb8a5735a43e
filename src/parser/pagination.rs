use std::fmt;

use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::{compile, element_text, SelectorError};

/// Number of review pages, never below one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCount(u32);

impl PageCount {
    pub const ONE: PageCount = PageCount(1);

    pub fn new(n: u32) -> Option<Self> {
        (n >= 1).then_some(PageCount(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct PageCountResolver {
    summary: Selector,
}

impl PageCountResolver {
    pub fn new(summary_selector: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            summary: compile("page_summary", summary_selector)?,
        })
    }

    /// Read the total from the pagination summary ("Page 1 of 34").
    /// Anything unexpected falls back to a single page.
    pub fn resolve(&self, markup: &str) -> PageCount {
        match self.try_resolve(markup) {
            Ok(count) => {
                debug!("Resolved {} review pages", count);
                count
            }
            Err(reason) => {
                warn!("Could not read page count ({}), assuming 1", reason);
                PageCount::ONE
            }
        }
    }

    fn try_resolve(&self, markup: &str) -> Result<PageCount, String> {
        let doc = Html::parse_document(markup);
        let summary = doc
            .select(&self.summary)
            .next()
            .ok_or_else(|| "summary element missing".to_string())?;
        let text = element_text(summary);
        let token = text
            .split_whitespace()
            .last()
            .ok_or_else(|| "summary element is empty".to_string())?;
        let n: u32 = token
            .parse()
            .map_err(|_| format!("{:?} is not a page number", token))?;
        PageCount::new(n).ok_or_else(|| "summary reports zero pages".to_string())
    }
}
