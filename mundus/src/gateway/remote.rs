use anyhow::{Context, Result};
use common::{Article, ArticlePreview, CountryCode, FilterState, GatewayConfig};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{
    ArticlePage, ContentGateway, GatewayError, GatewayResult, MergedSummary, SingleSummary,
    DEFAULT_MERGED_INSTRUCTIONS, DEFAULT_SINGLE_INSTRUCTIONS,
};

/// Content gateway talking to the backend's JSON HTTP API.
pub struct RemoteGateway {
    base_url: Url,
    per_page: u32,
    client: reqwest::Client,
}

impl RemoteGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid backend base URL: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Backend base URL cannot carry a path: {}", config.base_url);
        }

        let mut builder = reqwest::Client::builder().user_agent("Mundus/0.1.0");
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("failed to build reqwest client")?;

        Ok(Self {
            base_url,
            per_page: config.per_page.max(1),
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/api/<segments...>`, with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &'static str, url: Url) -> GatewayResult<T> {
        debug!(%url, "gateway: GET");
        let response = self.client.get(url).send().await?;
        read_json(operation, response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        body: &B,
    ) -> GatewayResult<T> {
        debug!(%url, "gateway: POST");
        let response = self.client.post(url).json(body).send().await?;
        read_json(operation, response).await
    }
}

#[async_trait::async_trait]
impl ContentGateway for RemoteGateway {
    async fn list_articles(
        &self,
        country: CountryCode,
        page: u32,
        filters: &FilterState,
    ) -> GatewayResult<ArticlePage> {
        if page == 0 {
            return Err(GatewayError::InvalidRequest("page must be at least 1".to_string()));
        }
        let mut url = self.endpoint(&["articles", country.code()]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &page.to_string());
            query.append_pair("per_page", &self.per_page.to_string());
            for (key, value) in filters.query_pairs() {
                query.append_pair(key, &value);
            }
        }
        self.get_json("Failed to fetch articles", url).await
    }

    async fn list_sources(&self, country: CountryCode) -> GatewayResult<Vec<String>> {
        let url = self.endpoint(&["sources", country.code()]);
        self.get_json("Failed to fetch sources", url).await
    }

    async fn list_categories(&self, country: CountryCode) -> GatewayResult<Vec<String>> {
        let url = self.endpoint(&["categories", country.code()]);
        // Articles without a category come back as null entries.
        let categories: Vec<Option<String>> = self.get_json("Failed to fetch categories", url).await?;
        Ok(categories.into_iter().flatten().collect())
    }

    async fn fetch_preview(&self, country: CountryCode, article_id: i64) -> GatewayResult<ArticlePreview> {
        let id = article_id.to_string();
        let url = self.endpoint(&["article-preview", country.code(), &id]);
        let body: serde_json::Value = self.get_json("Failed to fetch article preview", url).await?;

        // The preview is either the whole body or nested under the echoed article.
        let nested = body.get("preview").filter(|p| p.is_object()).cloned();
        let preview = match nested {
            Some(nested) => serde_json::from_value(nested)?,
            None => serde_json::from_value(body)?,
        };
        Ok(preview)
    }

    async fn summarize(
        &self,
        article: &Article,
        instructions: &str,
        selected_text: Option<&str>,
    ) -> GatewayResult<SingleSummary> {
        debug!(
            article_id = article.id,
            url = %article.url,
            source = %article.source,
            "gateway: requesting single-article summary"
        );
        let body = SummarizeRequest {
            article: ArticleRef::from(article),
            instructions: instructions_or(instructions, DEFAULT_SINGLE_INSTRUCTIONS),
            selected_text: selected_text.unwrap_or_default(),
        };
        let url = self.endpoint(&["summarize"]);
        self.post_json("Failed to generate summary", url, &body).await
    }

    async fn summarize_merged(
        &self,
        articles: &[Article],
        instructions: &str,
        selected_text: Option<&str>,
    ) -> GatewayResult<MergedSummary> {
        if articles.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "at least one article is required".to_string(),
            ));
        }
        debug!(count = articles.len(), "gateway: requesting merged summary");
        let body = SummarizeMergedRequest {
            articles: articles.iter().map(ArticleRef::from).collect(),
            instructions: instructions_or(instructions, DEFAULT_MERGED_INSTRUCTIONS),
            selected_text: selected_text.unwrap_or_default(),
        };
        let url = self.endpoint(&["summarize-merged"]);
        self.post_json("Failed to generate summary", url, &body).await
    }
}

fn instructions_or<'a>(instructions: &'a str, default: &'a str) -> &'a str {
    if instructions.trim().is_empty() {
        default
    } else {
        instructions
    }
}

/// Turn a response into `T`, or into a [`GatewayError::Backend`] for non-success statuses.
async fn read_json<T: DeserializeOwned>(
    operation: &'static str,
    response: reqwest::Response,
) -> GatewayResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let err = backend_error(operation, status, &body);
        warn!(status = status.as_u16(), error = %err, "gateway: backend returned an error");
        return Err(err);
    }

    Ok(serde_json::from_str(&body)?)
}

fn backend_error(operation: &'static str, status: StatusCode, body: &str) -> GatewayError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let status_text = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string());

    let (message, error_type, error_detail) = match parsed {
        Some(e) => (
            e.error.unwrap_or(status_text),
            e.error_type,
            e.error_args.map(|args| match args {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
        ),
        None => (status_text, None, None),
    };

    GatewayError::Backend {
        operation,
        status: status.as_u16(),
        message,
        error_type,
        error_detail,
    }
}

// Backend request/response structures

/// Article fields the summarize endpoints read.
#[derive(Debug, Serialize)]
struct ArticleRef<'a> {
    id: i64,
    title: &'a str,
    source: &'a str,
    url: &'a str,
    published: &'a str,
    #[serde(rename = "Category", skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

impl<'a> From<&'a Article> for ArticleRef<'a> {
    fn from(article: &'a Article) -> Self {
        Self {
            id: article.id,
            title: &article.title,
            source: &article.source,
            url: &article.url,
            published: &article.published,
            category: article.category.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummarizeRequest<'a> {
    article: ArticleRef<'a>,
    instructions: &'a str,
    selected_text: &'a str,
}

#[derive(Debug, Serialize)]
struct SummarizeMergedRequest<'a> {
    articles: Vec<ArticleRef<'a>>,
    instructions: &'a str,
    selected_text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error_args: Option<serde_json::Value>,
}
