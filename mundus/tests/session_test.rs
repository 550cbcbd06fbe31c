use common::{
    Article, ArticlePreview, CountryCode, EditorConfig, FilterState, GatewayConfig, MemorySettingsStore,
    TimeWindow,
};
use mundus::gateway::remote::RemoteGateway;
use mundus::gateway::{
    ArticlePage, ContentGateway, GatewayError, GatewayResult, MergedSummary, SingleSummary,
};
use mundus::session::EditorSession;
use mundus::views::browse::{ListLoad, ListRequest};
use mundus::views::{BrowseState, FilterChange, PanelVisibility, Preview};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const PER_PAGE: usize = 2;

/// In-process backend with a fixed corpus per country.
#[derive(Default)]
struct FakeGateway {
    corpus: HashMap<CountryCode, Vec<Article>>,
    fail_sources: AtomicBool,
    fail_previews: AtomicBool,
    fail_summaries: AtomicBool,
    summarize_calls: Mutex<Vec<(Vec<i64>, String)>>,
}

impl FakeGateway {
    fn new() -> Self {
        let mut corpus = HashMap::new();
        corpus.insert(
            CountryCode::Swe,
            vec![
                article(1, "Storm hits Malmö", "A", "u1"),
                article(2, "Storm moves north", "B", "u2"),
                article(3, "Election results", "SVT", "https://svt.se/3"),
                article(4, "Budget talks", "SVT", "https://svt.se/4"),
                article(5, "Ice hockey final", "Expressen", "https://expressen.se/5"),
            ],
        );
        corpus.insert(
            CountryCode::Den,
            vec![article(101, "Copenhagen marathon", "DR", "https://dr.dk/101")],
        );
        Self {
            corpus,
            ..Self::default()
        }
    }

    fn boom() -> GatewayError {
        GatewayError::Backend {
            operation: "Failed to generate summary",
            status: 500,
            message: "boom".to_string(),
            error_type: None,
            error_detail: None,
        }
    }
}

fn article(id: i64, title: &str, source: &str, url: &str) -> Article {
    Article {
        id,
        title: title.to_string(),
        source: source.to_string(),
        url: url.to_string(),
        published: "2024-03-01 08:00:00".to_string(),
        category: Some("News".to_string()),
        scraped_at: None,
        preview: None,
    }
}

#[async_trait::async_trait]
impl ContentGateway for FakeGateway {
    async fn list_articles(
        &self,
        country: CountryCode,
        page: u32,
        filters: &FilterState,
    ) -> GatewayResult<ArticlePage> {
        let matching: Vec<Article> = self
            .corpus
            .get(&country)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|a| a.title.to_lowercase().contains(&filters.search.to_lowercase()))
            .filter(|a| filters.source.as_deref().map_or(true, |s| a.source == s))
            .collect();
        let total_pages = ((matching.len() + PER_PAGE - 1) / PER_PAGE) as u32;
        let start = (page as usize - 1) * PER_PAGE;
        Ok(ArticlePage {
            articles: matching.iter().skip(start).take(PER_PAGE).cloned().collect(),
            total: matching.len() as u64,
            page,
            per_page: PER_PAGE as u32,
            total_pages,
        })
    }

    async fn list_sources(&self, country: CountryCode) -> GatewayResult<Vec<String>> {
        if self.fail_sources.load(Ordering::SeqCst) {
            return Err(GatewayError::Backend {
                operation: "Failed to fetch sources",
                status: 502,
                message: "Bad Gateway".to_string(),
                error_type: None,
                error_detail: None,
            });
        }
        let mut sources: Vec<String> = self
            .corpus
            .get(&country)
            .map(|articles| articles.iter().map(|a| a.source.clone()).collect())
            .unwrap_or_default();
        sources.sort();
        sources.dedup();
        Ok(sources)
    }

    async fn list_categories(&self, _country: CountryCode) -> GatewayResult<Vec<String>> {
        Ok(vec!["News".to_string()])
    }

    async fn fetch_preview(&self, _country: CountryCode, article_id: i64) -> GatewayResult<ArticlePreview> {
        if self.fail_previews.load(Ordering::SeqCst) {
            return Err(GatewayError::Backend {
                operation: "Failed to fetch article preview",
                status: 404,
                message: "Article not found".to_string(),
                error_type: None,
                error_detail: None,
            });
        }
        Ok(ArticlePreview {
            description: format!("Preview of {}", article_id),
            favicon: None,
            image: None,
        })
    }

    async fn summarize(
        &self,
        article: &Article,
        instructions: &str,
        _selected_text: Option<&str>,
    ) -> GatewayResult<SingleSummary> {
        self.summarize_calls
            .lock()
            .unwrap()
            .push((vec![article.id], instructions.to_string()));
        if self.fail_summaries.load(Ordering::SeqCst) {
            return Err(Self::boom());
        }
        Ok(SingleSummary {
            summary_text: format!("HEADLINE: About {}\nSUMMARY: Body for {}.", article.title, article.id),
            article: article.clone(),
        })
    }

    async fn summarize_merged(
        &self,
        articles: &[Article],
        instructions: &str,
        _selected_text: Option<&str>,
    ) -> GatewayResult<MergedSummary> {
        self.summarize_calls
            .lock()
            .unwrap()
            .push((articles.iter().map(|a| a.id).collect(), instructions.to_string()));
        if self.fail_summaries.load(Ordering::SeqCst) {
            return Err(Self::boom());
        }
        Ok(MergedSummary {
            summary_text: "Several outlets report the same story.".to_string(),
            articles: articles.to_vec(),
        })
    }
}

fn editor_config() -> EditorConfig {
    EditorConfig {
        default_country: CountryCode::Swe,
        default_time_window: TimeWindow::Day,
        surface_load_errors: false,
        render_width: 80,
    }
}

async fn session_with(gateway: Arc<FakeGateway>, editor: &EditorConfig) -> EditorSession {
    let settings = Arc::new(MemorySettingsStore::with_instructions("Keep it short."));
    EditorSession::new(gateway, settings, editor).await
}

async fn loaded_session() -> (Arc<FakeGateway>, EditorSession) {
    let gateway = Arc::new(FakeGateway::new());
    let mut session = session_with(gateway.clone(), &editor_config()).await;
    assert!(session.initialize().await);
    (gateway, session)
}

#[tokio::test]
async fn test_initial_load_fetches_facets_and_first_page() {
    let (_, session) = loaded_session().await;
    let browse = session.browse();

    assert_eq!(browse.state(), BrowseState::ListLoaded);
    assert_eq!(browse.articles().len(), 2);
    assert_eq!(browse.page_info(), "Page 1 of 3");
    assert_eq!(browse.sources(), ["A", "B", "Expressen", "SVT"]);
    assert_eq!(browse.categories(), ["News"]);
    assert!(!session.has_alerts());
}

#[tokio::test]
async fn test_initial_load_fails_as_a_whole() {
    let gateway = Arc::new(FakeGateway::new());
    gateway.fail_sources.store(true, Ordering::SeqCst);

    let mut session = session_with(gateway.clone(), &editor_config()).await;
    assert!(!session.initialize().await);
    assert!(session.browse().articles().is_empty());
    assert_eq!(session.browse().state(), BrowseState::Idle);
    // Logged only by default.
    assert!(!session.has_alerts());

    let surfacing = EditorConfig {
        surface_load_errors: true,
        ..editor_config()
    };
    let mut session = session_with(gateway, &surfacing).await;
    assert!(!session.initialize().await);
    let alerts = session.drain_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.starts_with("Failed to load articles: Bad Gateway"));
}

#[tokio::test]
async fn test_filter_change_resets_page() {
    let (_, mut session) = loaded_session().await;
    assert!(session.next_page().await);
    assert!(session.next_page().await);
    assert_eq!(session.browse().page(), 3);
    assert!(!session.next_page().await);

    assert!(session.change_filter(FilterChange::Search("storm".to_string())).await);
    assert_eq!(session.browse().page(), 1);
    assert_eq!(session.browse().total_pages(), 1);
    let ids: Vec<i64> = session.browse().articles().iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![1, 2]);

    assert!(!session.previous_page().await);
}

#[tokio::test]
async fn test_stale_list_response_is_discarded() {
    let (gateway, mut session) = loaded_session().await;

    let slow: ListRequest = session.begin_filter_change(FilterChange::Search("budget".to_string()));
    let fast: ListRequest = session.begin_filter_change(FilterChange::Search("election".to_string()));

    let fast_page = gateway
        .list_articles(fast.country, fast.page, &fast.filters)
        .await
        .unwrap();
    assert!(session.complete_list_load(&fast, Ok(ListLoad { page: fast_page, facets: None })));

    let slow_page = gateway
        .list_articles(slow.country, slow.page, &slow.filters)
        .await
        .unwrap();
    assert!(!session.complete_list_load(&slow, Ok(ListLoad { page: slow_page, facets: None })));

    let titles: Vec<&str> = session.browse().articles().iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["Election results"]);
}

#[tokio::test]
async fn test_checkbox_toggle_expands_panel_without_opening_card() {
    let (_, mut session) = loaded_session().await;
    assert_eq!(session.panel().visibility(), PanelVisibility::Hidden);

    assert_eq!(session.toggle_selection(1), Some(true));
    assert_eq!(session.panel().visibility(), PanelVisibility::Expanded);
    assert_eq!(*session.browse().preview(), Preview::Collapsed);

    session.panel_mut().on_leave();
    assert_eq!(session.panel().visibility(), PanelVisibility::Minimized);
    assert_eq!(session.toggle_selection(2), Some(true));
    assert_eq!(session.panel().visibility(), PanelVisibility::Expanded);

    assert_eq!(session.toggle_selection(1), Some(false));
    assert_eq!(session.toggle_selection(2), Some(false));
    assert_eq!(session.panel().visibility(), PanelVisibility::Hidden);
    assert_eq!(session.toggle_selection(999), None);
}

#[tokio::test]
async fn test_preview_then_generate_single_writeup() {
    let (gateway, mut session) = loaded_session().await;

    assert!(session.open_article(1).await);
    assert_eq!(session.browse().state(), BrowseState::PreviewLoaded);

    let id = session.generate_from_preview().await.expect("writeup");
    assert_eq!(session.browse().state(), BrowseState::PreviewLoaded);

    let writeup = session.writeups().get(id).unwrap();
    assert_eq!(writeup.title, "About Storm hits Malmö");
    assert_eq!(
        writeup.content,
        "<p><strong>About Storm hits Malmö</strong></p><p>Body for 1.</p>\
         <p><em>As reported by <a href=\"u1\" target=\"_blank\">A</a></em></p>"
    );
    // The preview action sends the default (empty) instructions.
    assert_eq!(gateway.summarize_calls.lock().unwrap()[0], (vec![1], String::new()));
}

#[tokio::test]
async fn test_composer_generate_uses_saved_instructions_and_merges() {
    let (gateway, mut session) = loaded_session().await;
    session.toggle_selection(1);
    session.toggle_selection(2);
    assert_eq!(session.composer().generate_label(2), Some("Generate Merged Writeup"));

    let id = session.generate().await.expect("merged writeup");
    let writeup = session.writeups().get(id).unwrap();
    assert_eq!(writeup.title, "Merged Writeup - 2 Articles");
    assert!(writeup.content.ends_with(
        r#"<p><em>As reported by <a href="u1" target="_blank">A</a>, <a href="u2" target="_blank">B</a></em></p>"#
    ));
    assert_eq!(writeup.articles.len(), 2);
    assert_eq!(
        gateway.summarize_calls.lock().unwrap()[0],
        (vec![1, 2], "Keep it short.".to_string())
    );
    assert!(!session.composer().is_generating());
}

#[tokio::test]
async fn test_panel_merge_always_uses_merged_endpoint_with_default_prompt() {
    let (gateway, mut session) = loaded_session().await;
    session.toggle_selection(3);

    let id = session.merge_selected().await.expect("writeup");
    assert_eq!(session.writeups().get(id).unwrap().title, "Merged Writeup - 1 Articles");
    assert_eq!(gateway.summarize_calls.lock().unwrap()[0], (vec![3], String::new()));

    session.clear_selection();
    assert!(session.merge_selected().await.is_none());
    assert_eq!(session.panel().visibility(), PanelVisibility::Hidden);
}

#[tokio::test]
async fn test_country_switch_empties_selection_and_writeups() {
    let (_, mut session) = loaded_session().await;
    session.toggle_selection(1);
    session.toggle_selection(2);
    session.generate().await.expect("writeup");
    assert_eq!(session.writeups().len(), 1);
    assert!(session.change_filter(FilterChange::Source(Some("A".to_string()))).await);

    assert!(session.switch_country(CountryCode::Den).await);
    assert_eq!(session.country(), CountryCode::Den);
    assert!(session.selection().is_empty());
    assert!(session.writeups().is_empty());
    assert_eq!(session.browse().filters().source, None);
    assert_eq!(session.browse().articles()[0].id, 101);

    // Switching to the same country still resets.
    session.toggle_selection(101);
    assert!(session.switch_country(CountryCode::Den).await);
    assert!(session.selection().is_empty());
}

#[tokio::test]
async fn test_generation_from_before_country_switch_is_dropped() {
    let (gateway, mut session) = loaded_session().await;
    session.toggle_selection(1);

    let ticket = session.begin_compose().expect("ticket");
    assert!(session.begin_compose().is_none());
    let request = session.begin_switch_country(CountryCode::Fin);
    let result = ticket.request.send(gateway.as_ref()).await;

    assert_eq!(session.complete_generation(&ticket, result), None);
    assert!(session.writeups().is_empty());
    assert!(!session.composer().is_generating());
    assert_eq!(request.country, CountryCode::Fin);
}

#[tokio::test]
async fn test_old_generation_leaves_newer_composer_generation_in_flight() {
    let (gateway, mut session) = loaded_session().await;
    session.toggle_selection(1);
    let old = session.begin_compose().expect("old ticket");

    assert!(session.switch_country(CountryCode::Den).await);
    session.toggle_selection(101);
    let current = session.begin_compose().expect("current ticket");

    let result = old.request.send(gateway.as_ref()).await;
    assert_eq!(session.complete_generation(&old, result), None);
    assert!(session.composer().is_generating());
    assert!(session.begin_compose().is_none());

    let result = current.request.send(gateway.as_ref()).await;
    let id = session.complete_generation(&current, result).expect("writeup");
    assert_eq!(session.writeups().get(id).unwrap().articles[0].id, 101);
    assert!(!session.composer().is_generating());
}

#[tokio::test]
async fn test_old_generation_leaves_newer_preview_and_merge_in_flight() {
    let (gateway, mut session) = loaded_session().await;
    assert!(session.open_article(1).await);
    let old_preview = session.begin_preview_writeup().expect("old preview ticket");
    session.toggle_selection(2);
    let old_merge = session.begin_merge().expect("old merge ticket");

    assert!(session.switch_country(CountryCode::Den).await);
    assert!(!session.is_merging());
    assert!(session.open_article(101).await);
    let current_preview = session.begin_preview_writeup().expect("current preview ticket");
    session.toggle_selection(101);
    let current_merge = session.begin_merge().expect("current merge ticket");

    for old in [&old_preview, &old_merge] {
        let result = old.request.send(gateway.as_ref()).await;
        assert_eq!(session.complete_generation(old, result), None);
    }
    assert_eq!(session.browse().state(), BrowseState::GeneratingWriteup);
    assert!(session.is_merging());
    assert!(session.begin_merge().is_none());
    assert!(session.writeups().is_empty());

    for current in [&current_preview, &current_merge] {
        let result = current.request.send(gateway.as_ref()).await;
        assert!(session.complete_generation(current, result).is_some());
    }
    assert_eq!(session.browse().state(), BrowseState::PreviewLoaded);
    assert!(!session.is_merging());
    assert_eq!(session.writeups().len(), 2);
}

#[tokio::test]
async fn test_failed_preview_collapses_card_and_raises_alert() {
    let (gateway, mut session) = loaded_session().await;
    gateway.fail_previews.store(true, Ordering::SeqCst);

    assert!(!session.open_article(1).await);
    assert_eq!(*session.browse().preview(), Preview::Collapsed);

    let alerts = session.drain_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0]
        .message
        .starts_with("Failed to load article preview: Article not found"));
}

#[tokio::test]
async fn test_failed_preview_writeup_returns_to_loaded_preview() {
    let (gateway, mut session) = loaded_session().await;
    assert!(session.open_article(1).await);
    gateway.fail_summaries.store(true, Ordering::SeqCst);

    assert!(session.generate_from_preview().await.is_none());
    assert_eq!(session.browse().state(), BrowseState::PreviewLoaded);
    assert!(session.writeups().is_empty());

    let alerts = session.drain_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.starts_with("Failed to generate writeup: boom"));
}

#[tokio::test]
async fn test_failed_generation_raises_alert_and_keeps_writeups() {
    let (gateway, mut session) = loaded_session().await;
    session.toggle_selection(1);
    session.generate().await.expect("first writeup");
    let before = session.writeups().as_slice().to_vec();

    gateway.fail_summaries.store(true, Ordering::SeqCst);
    assert!(session.generate().await.is_none());
    assert_eq!(session.writeups().as_slice(), before.as_slice());
    assert!(session.composer().can_generate(1));

    let alerts = session.drain_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(
        alerts[0].message,
        "Failed to generate writeup: boom\nError type: Unknown\nError details: No additional details"
    );
    assert!(!session.has_alerts());
}

#[tokio::test]
async fn test_regenerate_and_edit_keep_identity() {
    let (_, mut session) = loaded_session().await;
    session.toggle_selection(1);
    let id = session.generate().await.expect("writeup");
    let created_at = session.writeups().get(id).unwrap().created_at;

    assert!(session.edit_writeup(id, "<p>Hand edited</p>"));
    assert_eq!(session.writeups().get(id).unwrap().content, "<p>Hand edited</p>");

    session.composer_mut().set_instructions("Rewrite it.");
    assert_eq!(session.regenerate(id).await, Some(id));
    let regenerated = session.writeups().get(id).unwrap();
    assert_eq!(session.writeups().len(), 1);
    assert_eq!(regenerated.created_at, created_at);
    assert!(regenerated.content.contains("Body for 1."));

    session.composer_mut().set_writeup_query("malmö");
    assert_eq!(session.visible_writeups().len(), 1);
    session.composer_mut().set_writeup_query("nothing like this");
    assert!(session.visible_writeups().is_empty());
}

#[tokio::test]
async fn test_backend_error_body_through_remote_gateway() {
    let mut server = mockito::Server::new_async().await;

    let _articles = server
        .mock("GET", mockito::Matcher::Regex(r"^/api/articles/SWE".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"articles": [{"id": 1, "title": "T", "source": "A", "url": "u1", "published": ""}],
                "total": 1, "page": 1, "per_page": 10, "total_pages": 1}"#,
        )
        .create_async()
        .await;
    let _sources = server
        .mock("GET", "/api/sources/SWE")
        .with_status(200)
        .with_body(r#"["A"]"#)
        .create_async()
        .await;
    let _categories = server
        .mock("GET", "/api/categories/SWE")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let summarize = server
        .mock("POST", "/api/summarize")
        .with_status(500)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"boom"}"#)
        .create_async()
        .await;

    let gateway = RemoteGateway::new(&GatewayConfig {
        base_url: server.url(),
        ..GatewayConfig::default()
    })
    .expect("gateway");
    let settings = Arc::new(MemorySettingsStore::new());
    let mut session = EditorSession::new(Arc::new(gateway), settings, &editor_config()).await;

    assert!(session.initialize().await);
    session.toggle_selection(1);
    assert!(session.generate().await.is_none());
    assert!(session.writeups().is_empty());

    let alerts = session.drain_alerts();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.starts_with("Failed to generate writeup: boom"));

    summarize.assert_async().await;
}
