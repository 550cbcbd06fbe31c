use common::{Article, ArticlePreview, CountryCode, FilterState};
use serde::Deserialize;

pub mod remote;

/// Prompt sent when a single-article request carries no instructions.
pub const DEFAULT_SINGLE_INSTRUCTIONS: &str = "Please provide a concise summary of the following news article, highlighting the key points and maintaining an objective tone.";

/// Prompt sent when a merged request carries no instructions.
pub const DEFAULT_MERGED_INSTRUCTIONS: &str = "Please provide a comprehensive summary of the following news articles, highlighting the key points and maintaining an objective tone.";

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Client-side view of the backend: article listing, facets, previews and summaries.
///
/// Every call is a single attempt. Implementations never retry.
#[async_trait::async_trait]
pub trait ContentGateway: Send + Sync {
    /// One page of articles. `page` starts at 1.
    async fn list_articles(
        &self,
        country: CountryCode,
        page: u32,
        filters: &FilterState,
    ) -> GatewayResult<ArticlePage>;

    /// Distinct source names for the country.
    async fn list_sources(&self, country: CountryCode) -> GatewayResult<Vec<String>>;

    /// Distinct category labels for the country.
    async fn list_categories(&self, country: CountryCode) -> GatewayResult<Vec<String>>;

    async fn fetch_preview(&self, country: CountryCode, article_id: i64) -> GatewayResult<ArticlePreview>;

    /// Summarize one article. Empty `instructions` fall back to [`DEFAULT_SINGLE_INSTRUCTIONS`].
    async fn summarize(
        &self,
        article: &Article,
        instructions: &str,
        selected_text: Option<&str>,
    ) -> GatewayResult<SingleSummary>;

    /// Summarize several articles in one call. Empty `instructions` fall back to
    /// [`DEFAULT_MERGED_INSTRUCTIONS`].
    async fn summarize_merged(
        &self,
        articles: &[Article],
        instructions: &str,
        selected_text: Option<&str>,
    ) -> GatewayResult<MergedSummary>;
}

/// Response of the article list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArticlePage {
    pub articles: Vec<Article>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SingleSummary {
    #[serde(rename = "summary")]
    pub summary_text: String,
    /// The article as the backend understood it.
    pub article: Article,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MergedSummary {
    #[serde(rename = "summary")]
    pub summary_text: String,
    #[serde(default)]
    pub articles: Vec<Article>,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The backend answered with a non-success status.
    #[error("{operation}: {message} (HTTP {status})")]
    Backend {
        operation: &'static str,
        status: u16,
        message: String,
        error_type: Option<String>,
        error_detail: Option<String>,
    },

    /// No response was received.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// A success response whose body is not what the endpoint documents.
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// HTTP status for backend errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Backend { status, .. } => Some(*status),
            GatewayError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Multi-line text suitable for a user-facing alert.
    pub fn report(&self) -> String {
        match self {
            GatewayError::Backend {
                message,
                error_type,
                error_detail,
                ..
            } => format!(
                "{}\nError type: {}\nError details: {}",
                message,
                error_type.as_deref().unwrap_or("Unknown"),
                error_detail.as_deref().unwrap_or("No additional details"),
            ),
            other => other.to_string(),
        }
    }
}
