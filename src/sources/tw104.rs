use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::AppError;
use crate::models::posting::{JobPosting, SourcePlatform, clean_description};
use crate::render::{RenderedPage, Renderer};
use crate::sources::{JobSource, SalaryScale, SearchCriteria, passes_min_salary, urlencoded};

const BASE_URL: &str = "https://www.104.com.tw";

/// Contact-person label on 104 detail pages, e.g. "聯絡人：王小姐".
static CONTACT_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"聯絡人[:：\s]*([^\s\n應徵回]+)").unwrap());

/// 104 adapter. The list page carries company/title/tags; each posting's
/// detail page is opened for the job description and contact person.
pub struct Tw104 {
    renderer: Arc<dyn Renderer>,
    detail_pause: Duration,
}

impl Tw104 {
    pub fn new(renderer: Arc<dyn Renderer>, detail_pause: Duration) -> Self {
        Self {
            renderer,
            detail_pause,
        }
    }

    fn parse_card(&self, card: &RenderedPage) -> Option<JobPosting> {
        let company = card.select_first_text(".info-company__text")?;
        let title = card.select_first_text(".info-job__text")?;

        let mut posting = JobPosting::new(SourcePlatform::Tw104, company, title);
        posting.link = card
            .select_first_attr(".info-job__text", "href")
            .and_then(|href| card.resolve(&href))
            .unwrap_or_default();

        // Salary, location and experience share one tag list; classify by
        // content the way the list page renders them.
        posting.salary_range = "面議".to_string();
        for tag in card.select_texts(".info-tags .info-tags__text") {
            if tag.contains('市') || tag.contains('縣') {
                posting.location = tag;
            } else if tag.contains("經歷") {
                posting.experience = tag;
            } else if tag.contains("月薪") || tag.contains('元') {
                posting.salary_range = tag;
            }
        }

        posting.last_updated = card.select_first_text(".date-container").unwrap_or_default();
        Some(posting)
    }

    async fn fill_from_detail(&self, posting: &mut JobPosting) {
        match self.renderer.render(&posting.link).await {
            Ok(detail) => {
                if let Some(desc) = detail.select_first_text(".job-description__content") {
                    posting.description = clean_description(&desc);
                }
                if posting.contact_person.is_empty()
                    && let Some(cap) = CONTACT_LABEL.captures(&detail.text())
                {
                    posting.contact_person = cap[1].to_string();
                }
            }
            Err(e) => {
                tracing::warn!("104: detail page failed for {}: {e}", posting.link);
            }
        }
    }
}

#[async_trait]
impl JobSource for Tw104 {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Tw104
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<JobPosting>, AppError> {
        let url = format!(
            "{BASE_URL}/jobs/search/?keyword={}",
            urlencoded(&criteria.keyword)
        );
        let page = self.renderer.render(&url).await?;

        let cards = page.select_html(".job-summary");
        if cards.is_empty() {
            tracing::warn!("104: no job cards on result page");
            return Ok(Vec::new());
        }
        tracing::info!("104: {} job cards found", cards.len());

        let mut results = Vec::new();
        for (i, card_html) in cards.into_iter().enumerate() {
            if results.len() >= criteria.max_results {
                break;
            }

            let Some(mut posting) = self.parse_card(&page.fragment(card_html)) else {
                tracing::warn!("104: skipping malformed card {}", i + 1);
                continue;
            };

            if !passes_min_salary(
                &posting.salary_range,
                criteria.min_salary,
                SalaryScale::Thousands,
            ) {
                continue;
            }

            if !posting.link.is_empty() {
                self.fill_from_detail(&mut posting).await;
            }

            results.push(posting);

            // Detail pages raise the request rate; pause every third one.
            if results.len() % 3 == 0 && !self.detail_pause.is_zero() {
                tokio::time::sleep(self.detail_pause).await;
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRenderer;

    const LIST_HTML: &str = r#"
        <div class="job-summary">
            <a class="info-job__text" href="/job/abc123">後端工程師</a>
            <div class="info-company__text">甲骨科技股份有限公司</div>
            <div class="info-tags">
                <span class="info-tags__text">台北市內湖區</span>
                <span class="info-tags__text">3年以上經歷</span>
                <span class="info-tags__text">月薪50,000~70,000元</span>
            </div>
            <div class="date-container">12/05</div>
        </div>
        <div class="job-summary">
            <a class="info-job__text" href="/job/def456">資料工程師</a>
            <div class="info-tags">
                <span class="info-tags__text">新北市</span>
            </div>
        </div>
    "#;

    const DETAIL_HTML: &str = r#"
        <div class="job-description__content">
            負責 API 開發。
            維運既有服務。
        </div>
        <div>聯絡人：王小姐</div>
    "#;

    fn renderer() -> Arc<MockRenderer> {
        Arc::new(
            MockRenderer::new()
                .with_page(
                    "https://www.104.com.tw/jobs/search/?keyword=%E5%B7%A5%E7%A8%8B%E5%B8%AB",
                    LIST_HTML,
                )
                .with_page("https://www.104.com.tw/job/abc123", DETAIL_HTML),
        )
    }

    #[tokio::test]
    async fn parses_cards_and_detail_pages() {
        let source = Tw104::new(renderer(), Duration::ZERO);
        let results = source
            .search(&SearchCriteria::new("工程師"))
            .await
            .unwrap();

        // The second card has no company element and is skipped as malformed.
        assert_eq!(results.len(), 1);
        let p = &results[0];
        assert_eq!(p.company, "甲骨科技股份有限公司");
        assert_eq!(p.title, "後端工程師");
        assert_eq!(p.link, "https://www.104.com.tw/job/abc123");
        assert_eq!(p.location, "台北市內湖區");
        assert_eq!(p.experience, "3年以上經歷");
        assert_eq!(p.salary_range, "月薪50,000~70,000元");
        assert_eq!(p.last_updated, "12/05");
        assert_eq!(p.description, "負責 API 開發。 維運既有服務。");
        assert_eq!(p.contact_person, "王小姐");
    }

    #[tokio::test]
    async fn min_salary_filters_with_thousands_heuristic() {
        let source = Tw104::new(renderer(), Duration::ZERO);
        let mut criteria = SearchCriteria::new("工程師");
        criteria.min_salary = 60_000;

        // "月薪50,000~..." reads as 50K under the heuristic and is dropped.
        let results = source.search(&criteria).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn missing_result_list_yields_empty_not_error() {
        let renderer = Arc::new(MockRenderer::new().with_page(
            "https://www.104.com.tw/jobs/search/?keyword=x",
            "<html><body>maintenance</body></html>",
        ));
        let source = Tw104::new(renderer, Duration::ZERO);
        let results = source.search(&SearchCriteria::new("x")).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn detail_failure_keeps_the_posting() {
        // Only the list page is registered; the detail fetch fails.
        let renderer = Arc::new(MockRenderer::new().with_page(
            "https://www.104.com.tw/jobs/search/?keyword=%E5%B7%A5%E7%A8%8B%E5%B8%AB",
            LIST_HTML,
        ));
        let source = Tw104::new(renderer, Duration::ZERO);
        let results = source
            .search(&SearchCriteria::new("工程師"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].description.is_empty());
        assert!(results[0].contact_person.is_empty());
    }
}
