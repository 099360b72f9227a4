// Source adapter module.
// Defines the trait and registry for per-platform job listing adapters.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;

use crate::error::AppError;
use crate::models::posting::{JobPosting, SourcePlatform};
use crate::render::Renderer;

pub mod cake;
pub mod tw104;
pub mod tw1111;

/// Search parameters passed explicitly to every adapter.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
    pub keyword: String,
    pub location: String,
    /// Minimum monthly salary in TWD; 0 disables the filter.
    pub min_salary: u32,
    /// Cap on postings returned per platform.
    pub max_results: usize,
}

impl SearchCriteria {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            location: String::new(),
            min_salary: 0,
            max_results: 20,
        }
    }
}

/// Trait that all listing-platform adapters implement.
/// Each adapter fetches rendered pages for its platform and returns
/// postings already converted to the canonical schema.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn platform(&self) -> SourcePlatform;

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<JobPosting>, AppError>;
}

/// Build the adapter set for the enabled platforms.
/// `detail_pause` paces adapters that open per-posting detail pages.
pub fn build(
    platforms: &[SourcePlatform],
    renderer: Arc<dyn Renderer>,
    detail_pause: Duration,
) -> Vec<Box<dyn JobSource>> {
    platforms
        .iter()
        .map(|p| match p {
            SourcePlatform::Tw104 => {
                Box::new(tw104::Tw104::new(renderer.clone(), detail_pause)) as Box<dyn JobSource>
            }
            SourcePlatform::Tw1111 => Box::new(tw1111::Tw1111::new(renderer.clone())),
            SourcePlatform::Cake => Box::new(cake::Cake::new(renderer.clone())),
        })
        .collect()
}

/// Characters that encodeURIComponent does NOT encode.
/// RFC 3986 unreserved: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const ENCODE_URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URL-encode a string for use in query parameters.
pub(crate) fn urlencoded(s: &str) -> String {
    utf8_percent_encode(s, ENCODE_URI_COMPONENT_SET).to_string()
}

/// How a platform's salary text relates to the first integer token in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SalaryScale {
    /// Token is "K" shorthand; multiply by 1000 before comparing.
    Thousands,
    /// Token is the full amount (comma groups joined).
    Raw,
}

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static GROUPED_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d][\d,]*").unwrap());

/// Minimum-salary filter over free-form salary text.
///
/// Known approximation carried over from the observed platforms: the first
/// integer token is taken as the amount, and on platforms using "K"
/// shorthand it is multiplied by 1000. Unparseable text (e.g. 面議) always
/// passes so negotiable postings are never dropped.
pub(crate) fn passes_min_salary(salary_text: &str, min_salary: u32, scale: SalaryScale) -> bool {
    if min_salary == 0 {
        return true;
    }

    let amount = match scale {
        SalaryScale::Thousands => DIGIT_RUN
            .find(salary_text)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .map(|n| n.saturating_mul(1000)),
        SalaryScale::Raw => GROUPED_DIGITS
            .find(salary_text)
            .and_then(|m| m.as_str().replace(',', "").parse::<u64>().ok()),
    };

    match amount {
        Some(n) => n >= u64::from(min_salary),
        None => true,
    }
}
