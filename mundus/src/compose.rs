//! Writeup generation: request selection, summary dispatch and HTML composition.
//!
//! Both generate paths (the browse preview and the composer) go through
//! [`GenerationRequest`], so a single-article and a merged writeup are built the same way.

use chrono::{DateTime, Utc};
use common::{Article, Writeup};
use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::{debug, info};

use crate::gateway::{ContentGateway, GatewayResult, MergedSummary, SingleSummary};
use crate::parser::{merged_headline, parse_summary, ParsedSummary};

/// Articles a generation call summarizes.
#[derive(Debug, Clone, PartialEq)]
pub enum Contributors {
    Single(Article),
    Merged(Vec<Article>),
}

impl Contributors {
    /// `None` for an empty slice; one article goes through the single-article endpoint.
    pub fn from_articles(articles: &[Article]) -> Option<Self> {
        match articles {
            [] => None,
            [one] => Some(Contributors::Single(one.clone())),
            many => Some(Contributors::Merged(many.to_vec())),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Contributors::Single(_) => 1,
            Contributors::Merged(articles) => articles.len(),
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Contributors::Merged(_))
    }

    fn articles(&self) -> &[Article] {
        match self {
            Contributors::Single(article) => std::slice::from_ref(article),
            Contributors::Merged(articles) => articles,
        }
    }

    /// Headline used when the response carries no `HEADLINE:` line.
    fn default_headline(&self) -> String {
        match self {
            Contributors::Single(article) => article.title.clone(),
            Contributors::Merged(articles) => merged_headline(articles.len()),
        }
    }
}

/// Identity kept when a writeup is regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replaces {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to produce one writeup, captured at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub contributors: Contributors,
    pub instructions: String,
    pub selected_text: Option<String>,
    pub replaces: Option<Replaces>,
}

impl GenerationRequest {
    pub fn new(contributors: Contributors, instructions: impl Into<String>) -> Self {
        Self {
            contributors,
            instructions: instructions.into(),
            selected_text: None,
            replaces: None,
        }
    }

    /// Request for the given articles, or `None` when there are none.
    pub fn for_articles(articles: &[Article], instructions: impl Into<String>) -> Option<Self> {
        Contributors::from_articles(articles).map(|c| Self::new(c, instructions))
    }

    /// Re-summarize the articles a writeup was built from, keeping its identity.
    pub fn regenerate(writeup: &Writeup, instructions: impl Into<String>) -> Option<Self> {
        let mut request = Self::for_articles(&writeup.articles, instructions)?;
        request.replaces = Some(Replaces {
            id: writeup.id,
            created_at: writeup.created_at,
        });
        Some(request)
    }

    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    /// One gateway call: `summarize` for a single article, `summarize_merged` otherwise.
    pub async fn send(&self, gateway: &dyn ContentGateway) -> GatewayResult<GenerationResponse> {
        let selected_text = self.selected_text.as_deref();
        match &self.contributors {
            Contributors::Single(article) => {
                debug!(article_id = article.id, "compose: dispatching single summary");
                let summary = gateway
                    .summarize(article, &self.instructions, selected_text)
                    .await?;
                Ok(GenerationResponse::Single(summary))
            }
            Contributors::Merged(articles) => {
                debug!(count = articles.len(), "compose: dispatching merged summary");
                let summary = gateway
                    .summarize_merged(articles, &self.instructions, selected_text)
                    .await?;
                Ok(GenerationResponse::Merged(summary))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResponse {
    Single(SingleSummary),
    Merged(MergedSummary),
}

impl GenerationResponse {
    fn summary_text(&self) -> &str {
        match self {
            GenerationResponse::Single(s) => &s.summary_text,
            GenerationResponse::Merged(m) => &m.summary_text,
        }
    }

    /// Headline used when the summary carries no `HEADLINE:` marker. A single summary
    /// takes the title the backend echoed, falling back to the requested article's.
    fn default_headline(&self, contributors: &Contributors) -> String {
        match self {
            GenerationResponse::Single(s) if !s.article.title.trim().is_empty() => s.article.title.clone(),
            _ => contributors.default_headline(),
        }
    }

    /// Canonical articles echoed by the backend, if any.
    fn canonical_articles(&self) -> Vec<Article> {
        match self {
            GenerationResponse::Single(s) => vec![s.article.clone()],
            GenerationResponse::Merged(m) => m.articles.clone(),
        }
    }
}

/// Hands out writeup ids: millisecond timestamps, strictly increasing.
#[derive(Debug, Default)]
pub struct WriteupIds {
    last: i64,
}

impl WriteupIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, now: DateTime<Utc>) -> i64 {
        let candidate = now.timestamp_millis();
        let id = if candidate <= self.last {
            self.last + 1
        } else {
            candidate
        };
        self.last = id;
        id
    }
}

/// Turn a successful response into a writeup.
///
/// Regeneration keeps the replaced writeup's id and creation time; otherwise a fresh id is
/// drawn from `ids`. Contributing articles are the backend's canonical copies, or the
/// requested articles when the backend echoed none.
pub fn build_writeup(
    request: &GenerationRequest,
    response: &GenerationResponse,
    ids: &mut WriteupIds,
    now: DateTime<Utc>,
) -> Writeup {
    let parsed = parse_summary(response.summary_text(), &response.default_headline(&request.contributors));

    let mut articles = response.canonical_articles();
    if articles.is_empty() {
        articles = request.contributors.articles().to_vec();
    }
    let content = compose_html(&parsed, &articles);

    let (id, created_at) = match request.replaces {
        Some(r) => (r.id, r.created_at),
        None => (ids.next(now), now),
    };
    info!(writeup_id = id, articles = articles.len(), headline = %parsed.headline, "compose: writeup ready");

    Writeup {
        id,
        title: parsed.headline,
        content,
        created_at,
        updated_at: now,
        articles,
    }
}

/// `<p><strong>headline</strong></p><p>body</p><p><em>As reported by links</em></p>`
pub fn compose_html(parsed: &ParsedSummary, articles: &[Article]) -> String {
    format!(
        "<p><strong>{}</strong></p><p>{}</p><p><em>As reported by {}</em></p>",
        encode_text(&parsed.headline),
        encode_text(&parsed.body),
        attribution(articles),
    )
}

/// One link per article, source name as text, joined by ", ".
pub fn attribution(articles: &[Article]) -> String {
    articles
        .iter()
        .map(|a| {
            format!(
                r#"<a href="{}" target="_blank">{}</a>"#,
                encode_double_quoted_attribute(&a.url),
                encode_text(&a.source)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}
