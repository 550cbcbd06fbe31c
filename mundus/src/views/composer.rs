//! Composition/editor view: the writeups tab, the instructions tab and the generate action.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::{Article, SettingsStore, Writeup};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::compose::GenerationRequest;
use crate::gateway::DEFAULT_SINGLE_INSTRUCTIONS;
use crate::state::WriteupCollection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorTab {
    #[default]
    Writeups,
    Instructions,
}

pub struct ComposerView {
    settings: Arc<dyn SettingsStore>,
    tab: EditorTab,
    instructions: String,
    generating: bool,
    writeup_query: String,
}

impl ComposerView {
    /// Build the view, reading persisted instructions once. A store failure is logged and
    /// the default prompt is used.
    pub async fn load(settings: Arc<dyn SettingsStore>) -> Self {
        let instructions = match settings.load_instructions().await {
            Ok(Some(saved)) if !saved.is_empty() => {
                debug!("composer: loaded saved instructions");
                saved
            }
            Ok(_) => DEFAULT_SINGLE_INSTRUCTIONS.to_string(),
            Err(e) => {
                warn!(error = %e, "composer: could not read saved instructions, using default");
                DEFAULT_SINGLE_INSTRUCTIONS.to_string()
            }
        };
        Self {
            settings,
            tab: EditorTab::default(),
            instructions,
            generating: false,
            writeup_query: String::new(),
        }
    }

    pub fn tab(&self) -> EditorTab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: EditorTab) {
        self.tab = tab;
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Edit the instructions. Nothing is persisted until [`ComposerView::save_instructions`].
    pub fn set_instructions(&mut self, instructions: impl Into<String>) {
        self.instructions = instructions.into();
    }

    pub async fn save_instructions(&self) -> Result<()> {
        self.settings
            .save_instructions(&self.instructions)
            .await
            .context("Failed to save writeup instructions")?;
        info!("composer: instructions saved");
        Ok(())
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn can_generate(&self, selected: usize) -> bool {
        selected > 0 && !self.generating
    }

    /// Label of the generate button, `None` while it is hidden.
    pub fn generate_label(&self, selected: usize) -> Option<&'static str> {
        match selected {
            0 => None,
            _ if self.generating => Some("Generating writeup..."),
            1 => Some("Generate Writeup"),
            _ => Some("Generate Merged Writeup"),
        }
    }

    /// Start generating from the selection with the current instructions.
    pub fn begin_generation(&mut self, selected: &[Article]) -> Option<GenerationRequest> {
        if !self.can_generate(selected.len()) {
            return None;
        }
        let request = GenerationRequest::for_articles(selected, self.instructions.clone())?;
        self.generating = true;
        Some(request)
    }

    /// Start regenerating an existing writeup under its own id.
    pub fn begin_regeneration(&mut self, writeup: &Writeup) -> Option<GenerationRequest> {
        if self.generating {
            return None;
        }
        let request = GenerationRequest::regenerate(writeup, self.instructions.clone())?;
        self.generating = true;
        Some(request)
    }

    /// Re-enable the generate action, whatever the outcome.
    pub fn finish_generation(&mut self) {
        self.generating = false;
    }

    /// Editor change on a writeup: store the new HTML with a fresh update time.
    /// Returns false for an unknown id.
    pub fn on_content_change(
        &self,
        writeups: &mut WriteupCollection,
        writeup_id: i64,
        html: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(updated) = writeups.get(writeup_id).map(|w| w.with_content(html, now)) else {
            warn!(writeup_id, "composer: edit for an unknown writeup");
            return false;
        };
        writeups.upsert(updated);
        true
    }

    pub fn writeup_query(&self) -> &str {
        &self.writeup_query
    }

    pub fn set_writeup_query(&mut self, query: impl Into<String>) {
        self.writeup_query = query.into();
    }

    /// Writeups shown in the writeups tab under the current search.
    pub fn visible_writeups<'a>(&self, writeups: &'a WriteupCollection) -> Vec<&'a Writeup> {
        writeups.search(&self.writeup_query)
    }
}
