//! Shared mock collaborators for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AppError;
use crate::render::{RenderedPage, Renderer};
use crate::websearch::{SearchHit, WebSearcher};

/// Renderer serving canned HTML per URL; unknown URLs fail like a dead site.
#[derive(Default)]
pub struct MockRenderer {
    pages: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn render_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, AppError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(html) => RenderedPage::new(url, html.clone()),
            None => Err(AppError::Render(format!("no page registered for {url}"))),
        }
    }
}

/// Web searcher serving canned hits per query.
#[derive(Default)]
pub struct MockSearcher {
    hits: HashMap<String, Vec<SearchHit>>,
    pub queries: Mutex<Vec<String>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_urls(mut self, query: &str, urls: &[&str]) -> Self {
        let hits = urls
            .iter()
            .map(|u| SearchHit {
                url: u.to_string(),
                title: String::new(),
                description: String::new(),
            })
            .collect();
        self.hits.insert(query.to_string(), hits);
        self
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &str, _count: usize) -> Result<Vec<SearchHit>, AppError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.hits.get(query).cloned().unwrap_or_default())
    }
}
