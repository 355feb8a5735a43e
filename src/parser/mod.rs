pub mod pagination;
pub mod reviews;

use scraper::{ElementRef, Selector};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid {field} selector {selector:?}: {message}")]
pub struct SelectorError {
    pub field: &'static str,
    pub selector: String,
    pub message: String,
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError {
        field,
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Descendant text nodes, each trimmed, concatenated.
fn element_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}
