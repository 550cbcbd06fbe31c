//! Domain types shared between the gateway, the editor state and the terminal front-end.
//!
//! Field names follow the backend's JSON wire format (`Category` is capitalised there).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The partition of the article corpus the backend keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CountryCode {
    #[serde(rename = "SWE")]
    Swe,
    #[serde(rename = "DEN")]
    Den,
    #[serde(rename = "FIN")]
    Fin,
    #[serde(rename = "POL")]
    Pol,
}

impl CountryCode {
    /// Selector order, as shown in the header.
    pub const ALL: [CountryCode; 4] = [
        CountryCode::Swe,
        CountryCode::Den,
        CountryCode::Fin,
        CountryCode::Pol,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            CountryCode::Swe => "SWE",
            CountryCode::Den => "DEN",
            CountryCode::Fin => "FIN",
            CountryCode::Pol => "POL",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CountryCode::Swe => "Swedish News",
            CountryCode::Den => "Danish News",
            CountryCode::Fin => "Finnish News",
            CountryCode::Pol => "Polish News",
        }
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        CountryCode::Swe
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CountryCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        CountryCode::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown country code: {} (expected SWE, DEN, FIN or POL)", s))
    }
}

/// Recency window of the article list, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeWindow {
    Day,
    TwoDays,
    ThreeDays,
    Week,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::Day,
        TimeWindow::TwoDays,
        TimeWindow::ThreeDays,
        TimeWindow::Week,
    ];

    pub fn hours(&self) -> u32 {
        match self {
            TimeWindow::Day => 24,
            TimeWindow::TwoDays => 48,
            TimeWindow::ThreeDays => 72,
            TimeWindow::Week => 168,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Day => "Last 24 hours",
            TimeWindow::TwoDays => "Last 48 hours",
            TimeWindow::ThreeDays => "Last 72 hours",
            TimeWindow::Week => "Last Week",
        }
    }

    pub fn from_hours(hours: u32) -> Option<Self> {
        TimeWindow::ALL.into_iter().find(|w| w.hours() == hours)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow::Day
    }
}

impl TryFrom<u32> for TimeWindow {
    type Error = String;

    fn try_from(hours: u32) -> std::result::Result<Self, Self::Error> {
        TimeWindow::from_hours(hours)
            .ok_or_else(|| format!("Unsupported time window: {}h (expected 24, 48, 72 or 168)", hours))
    }
}

impl From<TimeWindow> for u32 {
    fn from(window: TimeWindow) -> u32 {
        window.hours()
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hours: u32 = s
            .trim()
            .trim_end_matches('h')
            .parse()
            .map_err(|_| format!("Invalid time window: {}", s))?;
        TimeWindow::try_from(hours)
    }
}

/// Article list filters. An unset filter is sent as an empty query parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub source: Option<String>,
    pub category: Option<String>,
    pub time: TimeWindow,
}

impl FilterState {
    pub fn with_time(time: TimeWindow) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }

    /// Query parameters in the order the backend documents them.
    pub fn query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("search", self.search.clone()),
            ("source", self.source.clone().unwrap_or_default()),
            ("category", self.category.clone().unwrap_or_default()),
            ("time", self.time.hours().to_string()),
        ]
    }
}

/// Lazily fetched short description bundle for one article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticlePreview {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl ArticlePreview {
    pub fn description_or_placeholder(&self) -> &str {
        if self.description.trim().is_empty() {
            "No preview available."
        } else {
            &self.description
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub url: String,
    #[serde(default)]
    pub published: String,
    #[serde(rename = "Category", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<ArticlePreview>,
}

impl Article {
    pub fn category_label(&self) -> &str {
        match self.category.as_deref() {
            Some(c) if !c.trim().is_empty() => c,
            _ => "Uncategorized",
        }
    }

    /// Publication date, when the backend timestamp is in one of the formats it emits.
    pub fn published_date(&self) -> Option<NaiveDate> {
        let raw = self.published.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.date_naive());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt.date_naive());
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(dt.date());
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }

    pub fn with_preview(&self, preview: ArticlePreview) -> Article {
        Article {
            preview: Some(preview),
            ..self.clone()
        }
    }
}

/// An editable summary with provenance. `articles` are snapshots taken at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Writeup {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub articles: Vec<Article>,
}

impl Writeup {
    /// Copy with new editor content and a refreshed update timestamp.
    pub fn with_content(&self, content: impl Into<String>, now: DateTime<Utc>) -> Writeup {
        Writeup {
            content: content.into(),
            updated_at: now,
            ..self.clone()
        }
    }
}
