use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::{compile, element_text, SelectorError};
use crate::config::Selectors;
use crate::db::RawReview;

/// Placeholder stored for any field the markup does not provide.
pub const SENTINEL: &str = "N/A";

/// Result of one per-field lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Extracted(String),
    Fallback,
}

impl Field {
    fn from_element(el: Option<ElementRef<'_>>) -> Self {
        match el {
            Some(el) => Field::Extracted(element_text(el)),
            None => Field::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Field::Fallback)
    }

    pub fn into_value(self) -> String {
        match self {
            Field::Extracted(s) => s,
            Field::Fallback => SENTINEL.to_string(),
        }
    }
}

/// Result of extracting one review container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    Review(RawReview),
    /// Structurally unusable; carries the reason.
    Malformed(String),
}

pub struct ReviewExtractor {
    container: Selector,
    rating: Selector,
    title: Selector,
    review_text: Selector,
    reviewer_name: Selector,
    location: Selector,
    date: Selector,
}

impl ReviewExtractor {
    pub fn new(selectors: &Selectors) -> Result<Self, SelectorError> {
        Ok(Self {
            container: compile("container", &selectors.container)?,
            rating: compile("rating", &selectors.rating)?,
            title: compile("title", &selectors.title)?,
            review_text: compile("review_text", &selectors.review_text)?,
            reviewer_name: compile("reviewer_name", &selectors.reviewer_name)?,
            location: compile("location", &selectors.location)?,
            date: compile("date", &selectors.date)?,
        })
    }

    /// All reviews on one page, in document order. Malformed containers are
    /// logged and left out; a page without containers yields nothing.
    pub fn extract_page(&self, markup: &str) -> Vec<RawReview> {
        let mut reviews = Vec::new();
        for (i, outcome) in self.extract_containers(markup).into_iter().enumerate() {
            match outcome {
                Container::Review(r) => reviews.push(r),
                Container::Malformed(reason) => {
                    warn!("Skipping review container #{}: {}", i + 1, reason)
                }
            }
        }
        reviews
    }

    pub fn extract_containers(&self, markup: &str) -> Vec<Container> {
        let doc = Html::parse_document(markup);
        doc.select(&self.container)
            .map(|el| self.extract_container(el))
            .collect()
    }

    fn extract_container(&self, el: ElementRef<'_>) -> Container {
        // Fields of an enclosing container would mix two reviews.
        if el.select(&self.container).next().is_some() {
            return Container::Malformed("container wraps another review container".into());
        }

        let first = |sel: &Selector| Field::from_element(el.select(sel).next());
        let fields = [
            ("rating", first(&self.rating)),
            ("title", first(&self.title)),
            ("review_text", first(&self.review_text)),
            ("reviewer_name", first(&self.reviewer_name)),
            ("location", first(&self.location)),
            // helper metadata shares the date's class and renders before it
            ("date", Field::from_element(el.select(&self.date).last())),
        ];

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, f)| f.is_fallback())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            debug!("Review container missing {}", missing.join(", "));
        }

        let [rating, title, review_text, reviewer_name, location, date] =
            fields.map(|(_, f)| f.into_value());
        Container::Review(RawReview {
            rating,
            title,
            review_text,
            reviewer_name,
            location,
            date,
        })
    }
}
