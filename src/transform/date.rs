use std::sync::LazyLock;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s+(day|days|week|weeks|month|months|year|years)\s+ago$").unwrap()
});

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%d %b, %Y", "%d %b %Y", "%d %B, %Y", "%d %B %Y", "%Y-%m-%d", "%d/%m/%Y"];
// Month-only stamps ("Mar, 2024") are pinned to the first of the month.
const MONTH_FORMATS: &[&str] = &["%b, %Y", "%b %Y", "%B, %Y", "%B %Y"];

/// What ends up in `processed_date`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePolicy {
    /// Always the time of normalization; the scraped stamp is not consulted.
    /// Matches the output the pipeline has always produced.
    #[default]
    WallClock,
    /// The parsed stamp, or the time of normalization when parsing fails.
    Parsed,
}

pub struct DateNormalizer {
    policy: DatePolicy,
    clock: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
}

impl DateNormalizer {
    pub fn new(policy: DatePolicy) -> Self {
        Self::with_clock(policy, || Local::now().naive_local())
    }

    pub fn with_clock<F>(policy: DatePolicy, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        Self {
            policy,
            clock: Box::new(clock),
        }
    }

    pub fn normalize(&self, raw: Option<&str>) -> NaiveDateTime {
        let now = (self.clock)();
        match self.policy {
            DatePolicy::WallClock => now,
            DatePolicy::Parsed => raw.and_then(|s| parse_loose(s, now)).unwrap_or(now),
        }
    }
}

/// Parse the date stamps review pages render: absolute dates in a handful
/// of layouts, month/year only, and "N days ago" style relative stamps
/// resolved against `now`. Stamps that land outside chrono's range are
/// unparseable.
pub fn parse_loose(raw: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    for fmt in MONTH_FORMATS {
        // chrono needs a day to build a date
        let padded = format!("1 {}", s);
        let padded_fmt = format!("%d {}", fmt);
        if let Ok(d) = NaiveDate::parse_from_str(&padded, &padded_fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    let lower = s.to_lowercase();
    if lower == "today" {
        return Some(now);
    }
    if lower == "yesterday" {
        return days_before(now, 1);
    }
    let caps = RELATIVE_RE.captures(&lower)?;
    let n: i64 = caps[1].parse().ok()?;
    let per_unit = match &caps[2] {
        "day" | "days" => 1,
        "week" | "weeks" => 7,
        "month" | "months" => 30,
        _ => 365,
    };
    days_before(now, n.checked_mul(per_unit)?)
}

fn days_before(now: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    now.checked_sub_signed(Duration::try_days(days)?)
}
