//! Editor session: the shared coordinator behind every view.
//!
//! The session owns the selection, the writeup collection and the current country, and
//! routes events between the browse view, the selection panel and the composer. Every
//! network-backed action comes in two forms: a synchronous `begin_*`/`complete_*` pair
//! for callers that drive the gateway themselves, and an async method that does both.

use chrono::Utc;
use common::{Article, ArticlePreview, CountryCode, EditorConfig, SettingsStore, Writeup};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::compose::{build_writeup, Contributors, GenerationRequest, GenerationResponse, WriteupIds};
use crate::gateway::{ContentGateway, GatewayError, GatewayResult};
use crate::state::{SelectionSet, WriteupCollection};
use crate::views::browse::{fetch_list, ListLoad};
use crate::views::{BrowseView, ComposerView, FilterChange, ListRequest, LoadOutcome, PreviewRequest, SelectionPanel};

/// A user-facing message raised by a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
}

impl Alert {
    fn new(prefix: &str, error: &GatewayError) -> Self {
        Self {
            message: format!("{}: {}", prefix, error.report()),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Where a generation was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOrigin {
    /// "Generate Writeup" on an expanded preview.
    Preview,
    /// The composer's generate button.
    Composer,
    /// "Generate Merged Writeup" on the selection panel.
    SelectionPanel,
    /// Regeneration of an existing writeup.
    Regenerate,
}

impl GenerationOrigin {
    fn alert_prefix(&self) -> &'static str {
        match self {
            GenerationOrigin::SelectionPanel => "Failed to generate merged writeup",
            _ => "Failed to generate writeup",
        }
    }
}

/// A dispatched generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTicket {
    pub origin: GenerationOrigin,
    pub request: GenerationRequest,
    /// Country epoch at dispatch. Results from before a country switch are dropped.
    epoch: u64,
}

pub struct EditorSession {
    gateway: Arc<dyn ContentGateway>,
    country: CountryCode,
    epoch: u64,
    selection: SelectionSet,
    writeups: WriteupCollection,
    browse: BrowseView,
    panel: SelectionPanel,
    composer: ComposerView,
    ids: WriteupIds,
    merging: bool,
    alerts: VecDeque<Alert>,
    surface_load_errors: bool,
}

impl EditorSession {
    pub async fn new(
        gateway: Arc<dyn ContentGateway>,
        settings: Arc<dyn SettingsStore>,
        editor: &EditorConfig,
    ) -> Self {
        let composer = ComposerView::load(settings).await;
        Self {
            gateway,
            country: editor.default_country,
            epoch: 0,
            selection: SelectionSet::new(),
            writeups: WriteupCollection::new(),
            browse: BrowseView::new(editor.default_country, editor.default_time_window),
            panel: SelectionPanel::new(),
            composer,
            ids: WriteupIds::new(),
            merging: false,
            alerts: VecDeque::new(),
            surface_load_errors: editor.surface_load_errors,
        }
    }

    pub fn country(&self) -> CountryCode {
        self.country
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn writeups(&self) -> &WriteupCollection {
        &self.writeups
    }

    pub fn browse(&self) -> &BrowseView {
        &self.browse
    }

    pub fn panel(&self) -> &SelectionPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut SelectionPanel {
        &mut self.panel
    }

    pub fn composer(&self) -> &ComposerView {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut ComposerView {
        &mut self.composer
    }

    pub fn is_merging(&self) -> bool {
        self.merging
    }

    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }

    /// Take every pending alert, oldest first.
    pub fn drain_alerts(&mut self) -> Vec<Alert> {
        self.alerts.drain(..).collect()
    }

    fn push_alert(&mut self, alert: Alert) {
        warn!(alert = %alert, "session: alert raised");
        self.alerts.push_back(alert);
    }

    // List loading

    pub fn begin_initial_load(&mut self) -> ListRequest {
        self.browse.reload()
    }

    /// Switch the source country. Selection and writeups are not comparable across
    /// countries, so both are emptied.
    pub fn begin_switch_country(&mut self, country: CountryCode) -> ListRequest {
        info!(from = %self.country, to = %country, "session: switching country");
        self.country = country;
        self.epoch += 1;
        self.selection.clear();
        self.writeups.reset();
        self.panel.sync(0);
        self.merging = false;
        self.composer.finish_generation();
        self.browse.set_country(country)
    }

    pub fn begin_filter_change(&mut self, change: FilterChange) -> ListRequest {
        self.browse.change_filter(change)
    }

    pub fn complete_list_load(&mut self, request: &ListRequest, result: GatewayResult<ListLoad>) -> bool {
        match self.browse.finish_list_load(request, result) {
            LoadOutcome::Applied => true,
            LoadOutcome::Stale => false,
            LoadOutcome::Failed(e) => {
                if self.surface_load_errors {
                    self.push_alert(Alert::new("Failed to load articles", &e));
                }
                false
            }
        }
    }

    async fn run_list_load(&mut self, request: ListRequest) -> bool {
        let result = fetch_list(self.gateway.as_ref(), &request).await;
        self.complete_list_load(&request, result)
    }

    /// Load facets and the first page. Returns whether the list was updated.
    pub async fn initialize(&mut self) -> bool {
        let request = self.begin_initial_load();
        self.run_list_load(request).await
    }

    pub async fn reload(&mut self) -> bool {
        let request = self.browse.reload();
        self.run_list_load(request).await
    }

    pub async fn switch_country(&mut self, country: CountryCode) -> bool {
        let request = self.begin_switch_country(country);
        self.run_list_load(request).await
    }

    pub async fn change_filter(&mut self, change: FilterChange) -> bool {
        let request = self.begin_filter_change(change);
        self.run_list_load(request).await
    }

    /// `false` without a request when already on the last page.
    pub async fn next_page(&mut self) -> bool {
        match self.browse.next_page() {
            Some(request) => self.run_list_load(request).await,
            None => false,
        }
    }

    /// `false` without a request when already on page 1.
    pub async fn previous_page(&mut self) -> bool {
        match self.browse.previous_page() {
            Some(request) => self.run_list_load(request).await,
            None => false,
        }
    }

    // Preview

    pub fn begin_open_article(&mut self, article_id: i64) -> Option<PreviewRequest> {
        self.browse.click_card(article_id)
    }

    pub fn complete_open_article(
        &mut self,
        request: &PreviewRequest,
        result: GatewayResult<ArticlePreview>,
    ) -> bool {
        match self.browse.finish_preview(request, result) {
            LoadOutcome::Applied => true,
            LoadOutcome::Stale => false,
            LoadOutcome::Failed(e) => {
                self.push_alert(Alert::new("Failed to load article preview", &e));
                false
            }
        }
    }

    /// Card click: expand (fetching the preview) or collapse.
    pub async fn open_article(&mut self, article_id: i64) -> bool {
        let Some(request) = self.begin_open_article(article_id) else {
            return false;
        };
        let result = self
            .gateway
            .fetch_preview(request.country, request.article_id)
            .await;
        self.complete_open_article(&request, result)
    }

    // Selection

    /// Checkbox on a listed article. Never expands or collapses the card.
    /// Returns the new membership, or `None` if the article is not listed.
    pub fn toggle_selection(&mut self, article_id: i64) -> Option<bool> {
        let article = self.browse.article(article_id)?.clone();
        Some(self.toggle_article(&article))
    }

    pub fn toggle_article(&mut self, article: &Article) -> bool {
        let snapshot = Article {
            preview: None,
            ..article.clone()
        };
        let selected = self.selection.toggle(&snapshot);
        self.panel.force_expand(self.selection.len());
        selected
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.panel.sync(0);
    }

    pub fn is_selected(&self, article_id: i64) -> bool {
        self.selection.contains(article_id)
    }

    // Generation

    pub fn begin_preview_writeup(&mut self) -> Option<GenerationTicket> {
        let request = self.browse.begin_writeup()?;
        Some(self.ticket(GenerationOrigin::Preview, request))
    }

    pub fn begin_compose(&mut self) -> Option<GenerationTicket> {
        let request = self.composer.begin_generation(self.selection.articles())?;
        Some(self.ticket(GenerationOrigin::Composer, request))
    }

    /// The selection panel always asks for a merged summary with the default prompt.
    pub fn begin_merge(&mut self) -> Option<GenerationTicket> {
        if self.merging || self.selection.is_empty() {
            return None;
        }
        self.merging = true;
        let request = GenerationRequest::new(Contributors::Merged(self.selection.articles().to_vec()), "");
        Some(self.ticket(GenerationOrigin::SelectionPanel, request))
    }

    pub fn begin_regenerate(&mut self, writeup_id: i64) -> Option<GenerationTicket> {
        let writeup = self.writeups.get(writeup_id)?.clone();
        let request = self.composer.begin_regeneration(&writeup)?;
        Some(self.ticket(GenerationOrigin::Regenerate, request))
    }

    fn ticket(&self, origin: GenerationOrigin, request: GenerationRequest) -> GenerationTicket {
        GenerationTicket {
            origin,
            request,
            epoch: self.epoch,
        }
    }

    /// Apply a generation result. On success the writeup is upserted and its id returned;
    /// on failure an alert is queued and the collection is left untouched.
    pub fn complete_generation(
        &mut self,
        ticket: &GenerationTicket,
        result: GatewayResult<GenerationResponse>,
    ) -> Option<i64> {
        // The country switch already reset the in-flight flags; any set now belong to a newer ticket.
        if ticket.epoch != self.epoch {
            warn!(origin = ?ticket.origin, "session: discarding generation from before a country switch");
            return None;
        }

        match ticket.origin {
            GenerationOrigin::Preview => self.browse.finish_writeup(),
            GenerationOrigin::Composer | GenerationOrigin::Regenerate => self.composer.finish_generation(),
            GenerationOrigin::SelectionPanel => self.merging = false,
        }

        match result {
            Ok(response) => {
                let writeup = build_writeup(&ticket.request, &response, &mut self.ids, Utc::now());
                let id = writeup.id;
                self.writeups.upsert(writeup);
                Some(id)
            }
            Err(e) => {
                self.push_alert(Alert::new(ticket.origin.alert_prefix(), &e));
                None
            }
        }
    }

    async fn run_generation(&mut self, ticket: Option<GenerationTicket>) -> Option<i64> {
        let ticket = ticket?;
        let result = ticket.request.send(self.gateway.as_ref()).await;
        self.complete_generation(&ticket, result)
    }

    pub async fn generate_from_preview(&mut self) -> Option<i64> {
        let ticket = self.begin_preview_writeup();
        self.run_generation(ticket).await
    }

    pub async fn generate(&mut self) -> Option<i64> {
        let ticket = self.begin_compose();
        self.run_generation(ticket).await
    }

    pub async fn merge_selected(&mut self) -> Option<i64> {
        let ticket = self.begin_merge();
        self.run_generation(ticket).await
    }

    pub async fn regenerate(&mut self, writeup_id: i64) -> Option<i64> {
        let ticket = self.begin_regenerate(writeup_id);
        self.run_generation(ticket).await
    }

    // Writeup editing

    /// Editor change on a writeup's content.
    pub fn edit_writeup(&mut self, writeup_id: i64, html: &str) -> bool {
        self.composer
            .on_content_change(&mut self.writeups, writeup_id, html, Utc::now())
    }

    pub fn visible_writeups(&self) -> Vec<&Writeup> {
        self.composer.visible_writeups(&self.writeups)
    }
}
