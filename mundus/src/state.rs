//! In-memory editor state: the article selection and the writeup collection.
//!
//! Both containers are owned by the session coordinator and mutated only from its
//! event handlers.

use common::{Article, Writeup};

/// Ordered set of selected articles, keyed by article id.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    articles: Vec<Article>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove the article if an entry with the same id is present, append it otherwise.
    /// Returns true when the article is selected afterwards.
    pub fn toggle(&mut self, article: &Article) -> bool {
        if let Some(pos) = self.articles.iter().position(|a| a.id == article.id) {
            self.articles.remove(pos);
            false
        } else {
            self.articles.push(article.clone());
            true
        }
    }

    pub fn clear(&mut self) {
        self.articles.clear();
    }

    pub fn contains(&self, article_id: i64) -> bool {
        self.articles.iter().any(|a| a.id == article_id)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn iter(&self) -> impl Iterator<Item = &Article> {
        self.articles.iter()
    }
}

/// Ordered collection of writeups, addressed by writeup id.
#[derive(Debug, Clone, Default)]
pub struct WriteupCollection {
    writeups: Vec<Writeup>,
}

impl WriteupCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the writeup with the same id in place, or append a new one.
    pub fn upsert(&mut self, writeup: Writeup) {
        match self.writeups.iter_mut().find(|w| w.id == writeup.id) {
            Some(existing) => *existing = writeup,
            None => self.writeups.push(writeup),
        }
    }

    pub fn get(&self, id: i64) -> Option<&Writeup> {
        self.writeups.iter().find(|w| w.id == id)
    }

    pub fn len(&self) -> usize {
        self.writeups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writeups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Writeup> {
        self.writeups.iter()
    }

    pub fn as_slice(&self) -> &[Writeup] {
        &self.writeups
    }

    /// Writeups whose title or content contains `query`, ignoring case.
    /// An empty query matches everything.
    pub fn search<'a>(&'a self, query: &str) -> Vec<&'a Writeup> {
        let needle = query.trim().to_lowercase();
        self.writeups
            .iter()
            .filter(|w| {
                needle.is_empty()
                    || w.title.to_lowercase().contains(&needle)
                    || w.content.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Drop every writeup. Only a source-country switch does this.
    pub(crate) fn reset(&mut self) {
        self.writeups.clear();
    }
}
