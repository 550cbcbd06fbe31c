//! Browse/filter view: a paged, filterable article list for one country with an
//! on-demand preview panel.
//!
//! Loads are split in two halves. `begin_*` methods update the view synchronously and
//! return a ticket describing the request; `finish_*` methods apply the gateway result
//! only while that ticket is still the latest one issued.

use common::{Article, ArticlePreview, CountryCode, FilterState, TimeWindow};
use tracing::{error, info, warn};

use crate::compose::{Contributors, GenerationRequest};
use crate::gateway::{ArticlePage, ContentGateway, GatewayError, GatewayResult};

/// Observable state of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseState {
    Idle,
    LoadingList,
    ListLoaded,
    PreviewCollapsed,
    PreviewLoading,
    PreviewLoaded,
    GeneratingWriteup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListPhase {
    Idle,
    Loading,
    Loaded,
}

/// The preview panel. At most one article is expanded at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Collapsed,
    /// Placeholder shown while the request is in flight.
    Loading(Article),
    Loaded(Article),
    Generating(Article),
}

impl Preview {
    pub fn article(&self) -> Option<&Article> {
        match self {
            Preview::Collapsed => None,
            Preview::Loading(a) | Preview::Loaded(a) | Preview::Generating(a) => Some(a),
        }
    }
}

/// One filter edit. Every edit sends the list back to page 1.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Search(String),
    /// `None` means all sources.
    Source(Option<String>),
    /// `None` means all categories.
    Category(Option<String>),
    Time(TimeWindow),
}

/// A dispatched article list load.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub seq: u64,
    pub country: CountryCode,
    pub page: u32,
    pub filters: FilterState,
    /// Also refresh the source and category facets.
    pub with_facets: bool,
}

/// Result of a list load: the page, plus facets when they were requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ListLoad {
    pub page: ArticlePage,
    pub facets: Option<(Vec<String>, Vec<String>)>,
}

/// Perform the gateway calls a [`ListRequest`] describes.
///
/// With facets, sources, categories and articles are fetched concurrently and the load
/// fails as a whole if any one of them fails.
pub async fn fetch_list(gateway: &dyn ContentGateway, request: &ListRequest) -> GatewayResult<ListLoad> {
    if request.with_facets {
        let (sources, categories, page) = tokio::try_join!(
            gateway.list_sources(request.country),
            gateway.list_categories(request.country),
            gateway.list_articles(request.country, request.page, &request.filters),
        )?;
        Ok(ListLoad {
            page,
            facets: Some((sources, categories)),
        })
    } else {
        let page = gateway
            .list_articles(request.country, request.page, &request.filters)
            .await?;
        Ok(ListLoad { page, facets: None })
    }
}

/// A dispatched preview fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewRequest {
    pub seq: u64,
    pub country: CountryCode,
    pub article_id: i64,
}

/// What a completion half did with its result.
#[derive(Debug)]
pub enum LoadOutcome {
    Applied,
    /// A newer request superseded this one; the result was dropped.
    Stale,
    Failed(GatewayError),
}

impl LoadOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied)
    }
}

#[derive(Debug)]
pub struct BrowseView {
    country: CountryCode,
    filters: FilterState,
    page: u32,
    total_pages: u32,
    articles: Vec<Article>,
    sources: Vec<String>,
    categories: Vec<String>,
    list_phase: ListPhase,
    list_seq: u64,
    preview: Preview,
    preview_seq: u64,
    collapsed_by_click: bool,
}

impl BrowseView {
    pub fn new(country: CountryCode, time: TimeWindow) -> Self {
        Self {
            country,
            filters: FilterState::with_time(time),
            page: 1,
            total_pages: 1,
            articles: Vec::new(),
            sources: Vec::new(),
            categories: Vec::new(),
            list_phase: ListPhase::Idle,
            list_seq: 0,
            preview: Preview::Collapsed,
            preview_seq: 0,
            collapsed_by_click: false,
        }
    }

    pub fn state(&self) -> BrowseState {
        match &self.preview {
            Preview::Generating(_) => BrowseState::GeneratingWriteup,
            Preview::Loaded(_) => BrowseState::PreviewLoaded,
            Preview::Loading(_) => BrowseState::PreviewLoading,
            Preview::Collapsed => match self.list_phase {
                ListPhase::Idle => BrowseState::Idle,
                ListPhase::Loading => BrowseState::LoadingList,
                ListPhase::Loaded if self.collapsed_by_click => BrowseState::PreviewCollapsed,
                ListPhase::Loaded => BrowseState::ListLoaded,
            },
        }
    }

    pub fn country(&self) -> CountryCode {
        self.country
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn article(&self, article_id: i64) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == article_id)
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    pub fn is_loading(&self) -> bool {
        self.list_phase == ListPhase::Loading
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn page_info(&self) -> String {
        format!("Page {} of {}", self.page, self.total_pages)
    }

    /// Start a list load for the current country, page and filters.
    /// Any open preview is closed, and an in-flight preview becomes stale.
    pub fn begin_list_load(&mut self, with_facets: bool) -> ListRequest {
        self.list_seq += 1;
        self.list_phase = ListPhase::Loading;
        self.close_preview(false);
        ListRequest {
            seq: self.list_seq,
            country: self.country,
            page: self.page,
            filters: self.filters.clone(),
            with_facets,
        }
    }

    /// Reload list and facets without changing anything.
    pub fn reload(&mut self) -> ListRequest {
        self.begin_list_load(true)
    }

    /// Point the view at another country. Source and category filters are country
    /// specific and are cleared; search text and time window carry over.
    pub fn set_country(&mut self, country: CountryCode) -> ListRequest {
        self.country = country;
        self.page = 1;
        self.total_pages = 1;
        self.filters.source = None;
        self.filters.category = None;
        self.articles.clear();
        self.sources.clear();
        self.categories.clear();
        self.begin_list_load(true)
    }

    pub fn change_filter(&mut self, change: FilterChange) -> ListRequest {
        match change {
            FilterChange::Search(text) => self.filters.search = text,
            FilterChange::Source(source) => self.filters.source = source.filter(|s| !s.is_empty()),
            FilterChange::Category(category) => {
                self.filters.category = category.filter(|c| !c.is_empty())
            }
            FilterChange::Time(time) => self.filters.time = time,
        }
        self.page = 1;
        self.begin_list_load(false)
    }

    /// `None` on the last page.
    pub fn next_page(&mut self) -> Option<ListRequest> {
        if !self.has_next_page() {
            return None;
        }
        self.page += 1;
        Some(self.begin_list_load(false))
    }

    /// `None` on page 1.
    pub fn previous_page(&mut self) -> Option<ListRequest> {
        if !self.has_previous_page() {
            return None;
        }
        self.page -= 1;
        Some(self.begin_list_load(false))
    }

    pub fn finish_list_load(&mut self, request: &ListRequest, result: GatewayResult<ListLoad>) -> LoadOutcome {
        if request.seq != self.list_seq {
            warn!(
                seq = request.seq,
                current = self.list_seq,
                "browse: discarding stale article list response"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(load) => {
                info!(
                    country = %request.country,
                    page = request.page,
                    count = load.page.articles.len(),
                    "browse: article list loaded"
                );
                self.articles = load.page.articles;
                self.total_pages = load.page.total_pages.max(1);
                if let Some((sources, categories)) = load.facets {
                    self.sources = sources;
                    self.categories = categories;
                }
                self.list_phase = ListPhase::Loaded;
                LoadOutcome::Applied
            }
            Err(e) => {
                error!(country = %request.country, page = request.page, error = %e, "browse: error loading data");
                self.list_phase = if self.articles.is_empty() {
                    ListPhase::Idle
                } else {
                    ListPhase::Loaded
                };
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Card click. Collapses the card if it is the expanded one, otherwise shows the
    /// preview placeholder and returns the fetch to perform.
    pub fn click_card(&mut self, article_id: i64) -> Option<PreviewRequest> {
        if self.preview.article().map(|a| a.id) == Some(article_id) {
            self.close_preview(true);
            return None;
        }

        let Some(article) = self.article(article_id).cloned() else {
            warn!(article_id, "browse: click on an article that is not listed");
            return None;
        };

        self.preview_seq += 1;
        self.collapsed_by_click = false;
        self.preview = Preview::Loading(article);
        Some(PreviewRequest {
            seq: self.preview_seq,
            country: self.country,
            article_id,
        })
    }

    pub fn finish_preview(
        &mut self,
        request: &PreviewRequest,
        result: GatewayResult<ArticlePreview>,
    ) -> LoadOutcome {
        let pending = match &self.preview {
            Preview::Loading(a) if request.seq == self.preview_seq => a.clone(),
            _ => {
                warn!(article_id = request.article_id, "browse: discarding stale preview response");
                return LoadOutcome::Stale;
            }
        };

        match result {
            Ok(preview) => {
                let expanded = pending.with_preview(preview);
                if let Some(entry) = self.articles.iter_mut().find(|a| a.id == expanded.id) {
                    *entry = expanded.clone();
                }
                self.preview = Preview::Loaded(expanded);
                LoadOutcome::Applied
            }
            Err(e) => {
                error!(article_id = request.article_id, error = %e, "browse: error loading article preview");
                self.preview = Preview::Collapsed;
                LoadOutcome::Failed(e)
            }
        }
    }

    /// "Generate Writeup" on the expanded preview. Only available once the preview has
    /// loaded, and not while a generation from it is running.
    pub fn begin_writeup(&mut self) -> Option<GenerationRequest> {
        let Preview::Loaded(article) = &self.preview else {
            return None;
        };
        let article = article.clone();
        let snapshot = Article {
            preview: None,
            ..article.clone()
        };
        self.preview = Preview::Generating(article);
        // The preview action always uses the default prompt.
        Some(GenerationRequest::new(Contributors::Single(snapshot), ""))
    }

    /// Return the preview to its loaded state after a generation, whatever the outcome.
    pub fn finish_writeup(&mut self) {
        if let Preview::Generating(article) = &self.preview {
            self.preview = Preview::Loaded(article.clone());
        }
    }

    fn close_preview(&mut self, by_click: bool) {
        self.preview_seq += 1;
        self.preview = Preview::Collapsed;
        self.collapsed_by_click = by_click;
    }
}
