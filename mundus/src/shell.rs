//! Interactive line shell over an [`EditorSession`].
//!
//! One command per line; the shell renders session state as plain text after each one.

use anyhow::{Context, Result};
use common::{CountryCode, TimeWindow, Writeup};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::session::EditorSession;
use crate::views::{FilterChange, PanelVisibility, Preview};

const HELP: &str = "\
Commands:
  country <SWE|DEN|FIN|POL>   switch source country (clears selection and writeups)
  search <text>               filter by text (empty clears)
  source <name|->             filter by source, '-' for all sources
  category <name|->           filter by category, '-' for all categories
  time <24|48|72|168>         recency window in hours
  next | prev                 change page
  reload                      reload articles, sources and categories
  list                        show the article list
  open <n>                    expand or collapse the preview of article n
  select <n>                  toggle article n in the selection
  selected                    show the selection panel
  clear                       clear the selection
  merge                       merged writeup from the selection (default prompt)
  write                       writeup from the open preview (default prompt)
  generate                    writeup from the selection with your instructions
  writeups [query]            list writeups, optionally filtered
  show <n>                    render writeup n
  edit <n> <html>             replace the content of writeup n
  regen <n>                   regenerate writeup n with your instructions
  instructions [text]         show or edit the instructions (not saved)
  save                        save the instructions
  export <path>               write all writeups to a JSON file
  quit                        exit";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Country(CountryCode),
    Search(String),
    Source(Option<String>),
    Category(Option<String>),
    Time(TimeWindow),
    Next,
    Prev,
    Reload,
    List,
    Open(usize),
    Select(usize),
    Selected,
    Clear,
    Merge,
    Write,
    Generate,
    Writeups(String),
    Show(usize),
    Edit(usize, String),
    Regen(usize),
    Instructions(Option<String>),
    Save,
    Export(PathBuf),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> std::result::Result<Command, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "country" => Command::Country(rest.parse()?),
            "search" => Command::Search(rest.to_string()),
            "source" => Command::Source(optional_arg(rest)),
            "category" => Command::Category(optional_arg(rest)),
            "time" => Command::Time(rest.parse()?),
            "next" => Command::Next,
            "prev" => Command::Prev,
            "reload" => Command::Reload,
            "list" | "ls" => Command::List,
            "open" => Command::Open(index_arg(rest)?),
            "select" => Command::Select(index_arg(rest)?),
            "selected" => Command::Selected,
            "clear" => Command::Clear,
            "merge" => Command::Merge,
            "write" => Command::Write,
            "generate" => Command::Generate,
            "writeups" => Command::Writeups(rest.to_string()),
            "show" => Command::Show(index_arg(rest)?),
            "edit" => {
                let (n, html) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: edit <n> <html>".to_string())?;
                Command::Edit(index_arg(n)?, html.trim().to_string())
            }
            "regen" => Command::Regen(index_arg(rest)?),
            "instructions" => Command::Instructions((!rest.is_empty()).then(|| rest.to_string())),
            "save" => Command::Save,
            "export" if !rest.is_empty() => Command::Export(PathBuf::from(rest)),
            "export" => return Err("usage: export <path>".to_string()),
            "quit" | "exit" => Command::Quit,
            "" => return Err("empty command".to_string()),
            other => return Err(format!("Unknown command: {} (try 'help')", other)),
        };
        Ok(command)
    }
}

fn optional_arg(rest: &str) -> Option<String> {
    match rest {
        "" | "-" => None,
        value => Some(value.to_string()),
    }
}

/// 1-based index argument.
fn index_arg(rest: &str) -> std::result::Result<usize, String> {
    match rest.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Expected a number starting at 1, got '{}'", rest)),
    }
}

/// What the shell should do after a line.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue(String),
    Quit,
}

pub struct Shell {
    session: EditorSession,
    render_width: usize,
}

impl Shell {
    pub fn new(session: EditorSession, render_width: usize) -> Self {
        Self {
            session,
            render_width: render_width.max(20),
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    /// Initial load, then read commands from stdin until `quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        self.session.initialize().await;
        println!("Mundus Editor ({}). Type 'help' for commands.", self.session.country().display_name());
        println!("{}", self.render_list());
        self.print_alerts();

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("mundus> ");
            std::io::stdout().flush().context("Failed to flush stdout")?;

            let Some(line) = lines.next_line().await.context("Failed to read from stdin")? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }

            match self.execute(&line).await {
                Ok(Step::Continue(output)) => {
                    if !output.is_empty() {
                        println!("{}", output);
                    }
                }
                Ok(Step::Quit) => break,
                Err(e) => println!("Error: {:#}", e),
            }
            self.print_alerts();
        }
        Ok(())
    }

    fn print_alerts(&mut self) {
        for alert in self.session.drain_alerts() {
            println!("!! {}", alert);
        }
    }

    /// Run one line. Parse errors and unknown indexes come back as output text; only
    /// local failures such as saving settings or writing an export are errors.
    pub async fn execute(&mut self, line: &str) -> Result<Step> {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(message) => return Ok(Step::Continue(message)),
        };
        debug!(?command, "shell: command");

        let output = match command {
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Step::Quit),
            Command::Country(country) => {
                self.session.switch_country(country).await;
                self.render_list()
            }
            Command::Search(text) => self.filter(FilterChange::Search(text)).await,
            Command::Source(source) => self.filter(FilterChange::Source(source)).await,
            Command::Category(category) => self.filter(FilterChange::Category(category)).await,
            Command::Time(time) => self.filter(FilterChange::Time(time)).await,
            Command::Next => {
                if !self.session.browse().has_next_page() {
                    "Already on the last page.".to_string()
                } else {
                    self.session.next_page().await;
                    self.render_list()
                }
            }
            Command::Prev => {
                if !self.session.browse().has_previous_page() {
                    "Already on the first page.".to_string()
                } else {
                    self.session.previous_page().await;
                    self.render_list()
                }
            }
            Command::Reload => {
                self.session.reload().await;
                self.render_list()
            }
            Command::List => self.render_list(),
            Command::Open(n) => match self.article_id(n) {
                Some(id) => {
                    self.session.open_article(id).await;
                    self.render_list()
                }
                None => format!("No article {} on this page.", n),
            },
            Command::Select(n) => match self.article_id(n).and_then(|id| self.session.toggle_selection(id)) {
                Some(_) => self.render_selection(),
                None => format!("No article {} on this page.", n),
            },
            Command::Selected => {
                self.session.panel_mut().on_click();
                self.render_selection()
            }
            Command::Clear => {
                self.session.clear_selection();
                "Selection cleared.".to_string()
            }
            Command::Merge => {
                if self.session.selection().is_empty() {
                    "No articles selected.".to_string()
                } else {
                    let id = self.session.merge_selected().await;
                    self.render_created(id)
                }
            }
            Command::Write => {
                if !matches!(self.session.browse().preview(), Preview::Loaded(_)) {
                    "Open an article preview first.".to_string()
                } else {
                    let id = self.session.generate_from_preview().await;
                    self.render_created(id)
                }
            }
            Command::Generate => {
                let selected = self.session.selection().len();
                match self.session.composer().generate_label(selected) {
                    None => "No articles selected.".to_string(),
                    Some(_) => {
                        let id = self.session.generate().await;
                        self.render_created(id)
                    }
                }
            }
            Command::Writeups(query) => {
                self.session.composer_mut().set_writeup_query(query);
                self.render_writeups()
            }
            Command::Show(n) => match self.writeup(n) {
                Some(writeup) => self.render_writeup(writeup)?,
                None => format!("No writeup {}.", n),
            },
            Command::Edit(n, html) => match self.writeup(n).map(|w| w.id) {
                Some(id) => {
                    self.session.edit_writeup(id, &html);
                    format!("Writeup {} updated.", n)
                }
                None => format!("No writeup {}.", n),
            },
            Command::Regen(n) => match self.writeup(n).map(|w| w.id) {
                Some(id) => {
                    let regenerated = self.session.regenerate(id).await;
                    self.render_created(regenerated)
                }
                None => format!("No writeup {}.", n),
            },
            Command::Instructions(None) => self.session.composer().instructions().to_string(),
            Command::Instructions(Some(text)) => {
                self.session.composer_mut().set_instructions(text);
                "Instructions updated (use 'save' to keep them).".to_string()
            }
            Command::Save => {
                self.session.composer().save_instructions().await?;
                "Instructions saved.".to_string()
            }
            Command::Export(path) => {
                self.export(&path).await?;
                format!(
                    "Exported {} writeups to {}",
                    self.session.writeups().len(),
                    path.display()
                )
            }
        };
        Ok(Step::Continue(output))
    }

    async fn filter(&mut self, change: FilterChange) -> String {
        self.session.change_filter(change).await;
        self.render_list()
    }

    fn article_id(&self, n: usize) -> Option<i64> {
        self.session.browse().articles().get(n - 1).map(|a| a.id)
    }

    fn writeup(&self, n: usize) -> Option<&Writeup> {
        self.session.visible_writeups().get(n - 1).copied()
    }

    async fn export(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self.session.writeups().as_slice())
            .context("Failed to serialize writeups")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;
        Ok(())
    }

    // Rendering

    pub fn render_list(&self) -> String {
        let browse = self.session.browse();
        let filters = browse.filters();
        let mut out = String::new();

        let _ = writeln!(
            out,
            "== {} ({}) | {} | search: '{}' | source: {} | category: {}",
            self.session.country().display_name(),
            self.session.country(),
            filters.time.label(),
            filters.search,
            filters.source.as_deref().unwrap_or("All Sources"),
            filters.category.as_deref().unwrap_or("All Categories"),
        );

        if browse.is_loading() {
            let _ = writeln!(out, "Loading articles...");
        }
        if browse.articles().is_empty() {
            let _ = writeln!(out, "No articles.");
        }

        let open_id = browse.preview().article().map(|a| a.id);
        for (i, article) in browse.articles().iter().enumerate() {
            let mark = if self.session.is_selected(article.id) { "[x]" } else { "[ ]" };
            let _ = writeln!(out, "{} {:>2}. {}", mark, i + 1, article.title);
            let published = article
                .published_date()
                .map(|d| d.to_string())
                .unwrap_or_else(|| article.published.clone());
            let _ = writeln!(
                out,
                "        Source: {} | Category: {} | Published: {}",
                article.source,
                article.category_label(),
                published
            );
            if open_id == Some(article.id) {
                self.render_preview(&mut out);
            }
        }

        let _ = write!(
            out,
            "{}{}{}",
            if browse.has_previous_page() { "< prev  " } else { "" },
            browse.page_info(),
            if browse.has_next_page() { "  next >" } else { "" }
        );
        out
    }

    fn render_preview(&self, out: &mut String) {
        match self.session.browse().preview() {
            Preview::Collapsed => {}
            Preview::Loading(_) => {
                let _ = writeln!(out, "        Loading preview...");
            }
            Preview::Loaded(article) | Preview::Generating(article) => {
                match &article.preview {
                    Some(preview) => {
                        let _ = writeln!(out, "        {}", preview.description_or_placeholder());
                        if let Some(image) = &preview.image {
                            let _ = writeln!(out, "        Image: {}", image);
                        }
                    }
                    None => {
                        let _ = writeln!(out, "        No preview available.");
                    }
                }
                let _ = writeln!(out, "        Read Full Article: {}", article.url);
                let action = if matches!(self.session.browse().preview(), Preview::Generating(_)) {
                    "Generating..."
                } else {
                    "Generate Writeup ('write')"
                };
                let _ = writeln!(out, "        {}", action);
            }
        }
    }

    fn render_selection(&self) -> String {
        let selection = self.session.selection();
        let mut out = String::new();
        match self.session.panel().visibility() {
            PanelVisibility::Hidden => return "No articles selected".to_string(),
            PanelVisibility::Minimized => {
                let _ = write!(out, "Selected Articles ({})", selection.len());
                return out;
            }
            PanelVisibility::Expanded => {}
        }
        let _ = writeln!(out, "Selected Articles ({})", selection.len());
        for article in selection.iter() {
            let _ = writeln!(out, "  - {} ({})", article.title, article.source);
        }
        let _ = write!(out, "Actions: 'merge' Generate Merged Writeup, 'clear' Clear Selection");
        out
    }

    fn render_writeups(&self) -> String {
        let visible = self.session.visible_writeups();
        if visible.is_empty() {
            return "No writeups.".to_string();
        }
        let mut out = String::new();
        for (i, writeup) in visible.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>2}. {}  (Created: {} | Updated: {})",
                i + 1,
                writeup.title,
                writeup.created_at.format("%Y-%m-%d %H:%M:%S"),
                writeup.updated_at.format("%Y-%m-%d %H:%M:%S"),
            );
        }
        out.trim_end().to_string()
    }

    fn render_writeup(&self, writeup: &Writeup) -> Result<String> {
        let text = html2text::from_read(writeup.content.as_bytes(), self.render_width)
            .context("Failed to render writeup HTML")?;
        Ok(format!("# {}\n\n{}", writeup.title, text.trim_end()))
    }

    fn render_created(&self, id: Option<i64>) -> String {
        let Some(id) = id else {
            return "No writeup created.".to_string();
        };
        match self.session.writeups().get(id) {
            Some(writeup) => match self.render_writeup(writeup) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "shell: could not render writeup");
                    format!("Writeup ready: {}", writeup.title)
                }
            },
            None => "No writeup created.".to_string(),
        }
    }
}
