use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;

use crate::error::AppError;
use crate::models::posting::{JobPosting, SourcePlatform, clean_description};
use crate::render::Renderer;
use crate::sources::{JobSource, SearchCriteria, urlencoded};

const BASE_URL: &str = "https://www.cake.me";

/// Cake.me adapter. The search page is a Next.js app; postings are read from
/// the embedded `__NEXT_DATA__` JSON blob instead of the rendered DOM.
pub struct Cake {
    renderer: Arc<dyn Renderer>,
}

impl Cake {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    fn parse_job(raw: &Value) -> Option<JobPosting> {
        let title = raw.get("title").and_then(Value::as_str)?.to_string();
        let company = raw
            .pointer("/page/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut posting = JobPosting::new(SourcePlatform::Cake, company, title);

        if let (Some(company_path), Some(job_path)) = (
            raw.pointer("/page/path").and_then(Value::as_str),
            raw.get("path").and_then(Value::as_str),
        ) {
            posting.link = format!("{BASE_URL}/companies/{company_path}/jobs/{job_path}");
        }

        posting.salary_range = format_salary(raw.get("salary"));
        posting.location = pick_location(raw);
        posting.experience = seniority_label(
            raw.get("seniorityLevel").and_then(Value::as_str).unwrap_or(""),
        )
        .to_string();
        posting.description = clean_description(
            raw.get("description").and_then(Value::as_str).unwrap_or(""),
        );
        posting.last_updated = updated_date(raw.get("contentUpdatedAt"));

        Some(posting)
    }
}

/// Synthesize a human-readable range from structured salary bounds.
fn format_salary(salary: Option<&Value>) -> String {
    let Some(salary) = salary else {
        return "面議".to_string();
    };
    let Some(min) = amount(salary.get("min")) else {
        return "面議".to_string();
    };

    let currency = salary.get("currency").and_then(Value::as_str).unwrap_or("TWD");
    let unit = match salary.get("type").and_then(Value::as_str).unwrap_or("") {
        "per_year" => "年",
        "per_hour" => "時",
        "per_day" => "日",
        _ => "月",
    };

    match amount(salary.get("max")) {
        Some(max) if max != min => format!("{min}-{max} {currency}/{unit}"),
        _ => format!("{min}+ {currency}/{unit}"),
    }
}

fn amount(v: Option<&Value>) -> Option<u64> {
    let v = v?;
    v.as_u64().or_else(|| v.as_f64().map(|f| f as u64))
}

/// First listed location, preferring the zh-TW label.
fn pick_location(raw: &Value) -> String {
    if let Some(locales) = raw.get("locationsWithLocale").and_then(Value::as_array)
        && !locales.is_empty()
    {
        if let Some(zh) = locales
            .iter()
            .find_map(|l| l.get("zh-TW").and_then(Value::as_str))
        {
            return zh.to_string();
        }
        if let Some(en) = locales[0].get("en").and_then(Value::as_str) {
            return en.to_string();
        }
    }
    raw.get("locations")
        .and_then(Value::as_array)
        .and_then(|l| l.first())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn seniority_label(level: &str) -> &'static str {
    match level {
        "entry_level" => "0-2年",
        "mid_senior_level" => "2-5年",
        "associate" => "1-3年",
        "internship_level" => "實習",
        "director" => "5年以上",
        "executive" => "10年以上",
        _ => "",
    }
}

/// `contentUpdatedAt` arrives as epoch millis or an ISO string.
fn updated_date(v: Option<&Value>) -> String {
    match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Some(Value::String(s)) => s.split('T').next().unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

#[async_trait]
impl JobSource for Cake {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Cake
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<JobPosting>, AppError> {
        let mut url = format!("{BASE_URL}/jobs/{}", urlencoded(&criteria.keyword));
        if !criteria.location.is_empty() {
            url.push_str(&format!("?location={}", urlencoded(&criteria.location)));
        }
        let page = self.renderer.render(&url).await?;

        let Some(blob) = page.select_first_text("script#__NEXT_DATA__") else {
            tracing::warn!("cake: __NEXT_DATA__ not found on result page");
            return Ok(Vec::new());
        };
        let data: Value = serde_json::from_str(&blob)
            .map_err(|e| AppError::Parse(format!("cake: bad __NEXT_DATA__: {e}")))?;

        let Some(jobs) = data
            .pointer("/props/pageProps/initialState/jobSearch/entityByPathId")
            .and_then(Value::as_object)
        else {
            tracing::warn!("cake: no job entities in page state");
            return Ok(Vec::new());
        };
        tracing::info!("cake: {} job entities found", jobs.len());

        let mut results = Vec::new();
        for raw in jobs.values() {
            if results.len() >= criteria.max_results {
                break;
            }

            // Structured bounds here, so the filter compares them directly.
            if criteria.min_salary > 0
                && let Some(min) = raw.get("salary").and_then(|s| amount(s.get("min")))
                && min < u64::from(criteria.min_salary)
            {
                continue;
            }

            match Self::parse_job(raw) {
                Some(posting) => results.push(posting),
                None => tracing::warn!("cake: skipping malformed job entity"),
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRenderer;

    fn search_html(entities: &str) -> String {
        format!(
            r#"<html><body>
            <script id="__NEXT_DATA__" type="application/json">
            {{"props":{{"pageProps":{{"initialState":{{"jobSearch":{{"entityByPathId":{entities}}}}}}}}}}}
            </script></body></html>"#
        )
    }

    const ENTITIES: &str = r#"{
        "j1": {
            "title": "ML Engineer",
            "path": "ml-engineer",
            "page": {"name": "丙智慧股份有限公司", "path": "bingwise"},
            "salary": {"min": 900000, "max": 1400000, "currency": "TWD", "type": "per_year"},
            "locationsWithLocale": [{"zh-TW": "台北市", "en": "Taipei"}],
            "seniorityLevel": "mid_senior_level",
            "description": "Build   and ship\nmodels",
            "contentUpdatedAt": "2025-06-30T08:00:00Z"
        },
        "j2": {
            "path": "no-title",
            "page": {"name": "無名公司", "path": "noname"}
        }
    }"#;

    fn renderer() -> Arc<MockRenderer> {
        Arc::new(
            MockRenderer::new().with_page("https://www.cake.me/jobs/ml", &search_html(ENTITIES)),
        )
    }

    #[tokio::test]
    async fn parses_next_data_entities() {
        let source = Cake::new(renderer());
        let results = source.search(&SearchCriteria::new("ml")).await.unwrap();

        // j2 has no title and is skipped as malformed.
        assert_eq!(results.len(), 1);
        let p = &results[0];
        assert_eq!(p.company, "丙智慧股份有限公司");
        assert_eq!(p.title, "ML Engineer");
        assert_eq!(
            p.link,
            "https://www.cake.me/companies/bingwise/jobs/ml-engineer"
        );
        assert_eq!(p.salary_range, "900000-1400000 TWD/年");
        assert_eq!(p.location, "台北市");
        assert_eq!(p.experience, "2-5年");
        assert_eq!(p.description, "Build and ship models");
        assert_eq!(p.last_updated, "2025-06-30");
    }

    #[tokio::test]
    async fn structured_salary_filter_compares_raw_min() {
        let source = Cake::new(renderer());
        let mut criteria = SearchCriteria::new("ml");
        criteria.min_salary = 1_000_000;
        assert!(source.search(&criteria).await.unwrap().is_empty());

        criteria.min_salary = 800_000;
        assert_eq!(source.search(&criteria).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_next_data_yields_empty() {
        let renderer = Arc::new(
            MockRenderer::new().with_page("https://www.cake.me/jobs/ml", "<html></html>"),
        );
        let source = Cake::new(renderer);
        assert!(
            Cake::new(Arc::new(MockRenderer::new()))
                .search(&SearchCriteria::new("down"))
                .await
                .is_err()
        );
        assert!(
            source
                .search(&SearchCriteria::new("ml"))
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn salary_synthesis_covers_the_unit_map() {
        let v: Value = serde_json::json!({"min": 50000, "max": 50000, "currency": "TWD", "type": "per_month"});
        assert_eq!(format_salary(Some(&v)), "50000+ TWD/月");

        let v: Value = serde_json::json!({"min": 200, "currency": "TWD", "type": "per_hour"});
        assert_eq!(format_salary(Some(&v)), "200+ TWD/時");

        assert_eq!(format_salary(None), "面議");
        assert_eq!(format_salary(Some(&serde_json::json!({}))), "面議");
    }

    #[test]
    fn location_prefers_zh_tw_then_en_then_plain() {
        let raw = serde_json::json!({"locationsWithLocale": [{"en": "Kaohsiung"}]});
        assert_eq!(pick_location(&raw), "Kaohsiung");

        let raw = serde_json::json!({"locations": ["Tainan"]});
        assert_eq!(pick_location(&raw), "Tainan");
    }
}
