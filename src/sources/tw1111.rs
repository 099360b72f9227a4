use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::AppError;
use crate::models::posting::{JobPosting, SourcePlatform};
use crate::render::{RenderedPage, Renderer};
use crate::sources::{JobSource, SalaryScale, SearchCriteria, passes_min_salary, urlencoded};

const BASE_URL: &str = "https://www.1111.com.tw";

// 1111's markup shifts between releases; each field tries a selector
// ladder and takes the first that matches.
const CARD_SELECTORS: &[&str] = &[
    ".job_item",
    ".joblist_item",
    r#"[class*="job-item"]"#,
    ".job-list-item",
];
const TITLE_SELECTORS: &[&str] = &[r#"a[href*="/job/"]"#, "h2", ".job_name", ".job-name"];
const COMPANY_SELECTORS: &[&str] = &[".corp_name", ".company-name", r#"[class*="company"]"#];
const SALARY_SELECTORS: &[&str] = &[".salary", r#"[class*="salary"]"#];
const AREA_SELECTORS: &[&str] = &[".job_area", ".area", r#"[class*="area"]"#];

/// 1111 adapter. List page only; no detail pages.
pub struct Tw1111 {
    renderer: Arc<dyn Renderer>,
}

impl Tw1111 {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    fn first_text(card: &RenderedPage, ladder: &[&str]) -> Option<String> {
        ladder.iter().find_map(|css| card.select_first_text(css))
    }

    fn parse_card(card: &RenderedPage) -> Option<JobPosting> {
        let title = Self::first_text(card, TITLE_SELECTORS)?;
        let company = Self::first_text(card, COMPANY_SELECTORS).unwrap_or_default();

        let mut posting = JobPosting::new(SourcePlatform::Tw1111, company, title);
        posting.link = card
            .select_first_attr(r#"a[href*="/job/"]"#, "href")
            .and_then(|href| card.resolve(&href))
            .unwrap_or_default();
        posting.salary_range =
            Self::first_text(card, SALARY_SELECTORS).unwrap_or_else(|| "面議".to_string());
        posting.location = Self::first_text(card, AREA_SELECTORS).unwrap_or_default();
        posting.last_updated = Utc::now().format("%Y-%m-%d").to_string();
        Some(posting)
    }
}

#[async_trait]
impl JobSource for Tw1111 {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Tw1111
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<JobPosting>, AppError> {
        let mut url = format!("{BASE_URL}/search/job?ks={}", urlencoded(&criteria.keyword));
        if !criteria.location.is_empty() {
            url.push_str(&format!("&d0={}", urlencoded(&criteria.location)));
        }
        let page = self.renderer.render(&url).await?;

        let cards = CARD_SELECTORS
            .iter()
            .map(|css| page.select_html(css))
            .find(|cards| !cards.is_empty())
            .unwrap_or_default();
        if cards.is_empty() {
            tracing::warn!("1111: no job cards on result page");
            return Ok(Vec::new());
        }
        tracing::info!("1111: {} job cards found", cards.len());

        let mut results = Vec::new();
        for (i, card_html) in cards.into_iter().enumerate() {
            if results.len() >= criteria.max_results {
                break;
            }

            let Some(posting) = Self::parse_card(&page.fragment(card_html)) else {
                tracing::warn!("1111: skipping malformed card {}", i + 1);
                continue;
            };

            // This platform lists full amounts, not "K" shorthand.
            if !passes_min_salary(&posting.salary_range, criteria.min_salary, SalaryScale::Raw) {
                continue;
            }

            results.push(posting);
        }

        Ok(results)
    }
}
