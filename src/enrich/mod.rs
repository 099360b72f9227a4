// Contact enrichment engine: discover a company's website through the
// search collaborator, crawl a prioritized handful of pages, and fill
// whatever contact fields the postings are still missing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use url::Url;

use crate::models::contact::ContactRecord;
use crate::models::posting::JobPosting;
use crate::render::{RenderedPage, Renderer};
use crate::websearch::WebSearcher;

pub mod extract;

const DISCOVERY_RESULTS: usize = 3;
/// Same-site pages visited after the homepage.
const MAX_CONTACT_PAGES: usize = 2;

/// Listing/social aggregators; hits on these are never a company website.
const AGGREGATOR_DENYLIST: &[&str] = &[
    "104.com",
    "1111.com",
    "518.com",
    "cakeresume",
    "cake.me",
    "linkedin",
    "facebook",
    "twincn",
    "findcompany",
];

static CONTACT_OR_ABOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)contact|聯絡|聯繫|關於|about|公司介紹|公司簡介|客服|服務|招募|人才|careers")
        .unwrap()
});
static CONTACT_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)contact|聯絡|聯繫").unwrap());
static ABOUT_HINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)about|關於").unwrap());

pub struct ContactEnricher {
    renderer: Arc<dyn Renderer>,
    searcher: Arc<dyn WebSearcher>,
    company_delay: Duration,
}

impl ContactEnricher {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        searcher: Arc<dyn WebSearcher>,
        company_delay: Duration,
    ) -> Self {
        Self {
            renderer,
            searcher,
            company_delay,
        }
    }

    /// Fill missing contact fields on each posting, best effort. Postings
    /// come back in input order; companies repeated within the batch are
    /// resolved once through a per-run memo table.
    pub async fn enrich(&self, postings: Vec<JobPosting>) -> Vec<JobPosting> {
        let total = postings.len();
        let mut memo: HashMap<String, ContactRecord> = HashMap::new();
        let mut out = Vec::with_capacity(total);

        for (i, mut posting) in postings.into_iter().enumerate() {
            let company = posting.company.clone();
            if company.is_empty() {
                out.push(posting);
                continue;
            }

            if let Some(record) = memo.get(&company) {
                apply_missing(&mut posting, record);
                out.push(posting);
                continue;
            }

            if posting.has_complete_contact() {
                tracing::info!("{company}: contact info already complete");
                memo.insert(company, contact_of(&posting));
                out.push(posting);
                continue;
            }

            tracing::info!("{company}: enriching contact info");
            let record = self.resolve_company(&company).await;
            apply_missing(&mut posting, &record);
            tracing::info!(
                "{company}: phone={} email={}",
                if posting.contact_phone.is_empty() { "無" } else { posting.contact_phone.as_str() },
                if posting.contact_email.is_empty() { "無" } else { posting.contact_email.as_str() },
            );
            memo.insert(company, contact_of(&posting));
            out.push(posting);

            if i + 1 < total && !self.company_delay.is_zero() {
                tokio::time::sleep(self.company_delay).await;
            }
        }

        out
    }

    async fn resolve_company(&self, company: &str) -> ContactRecord {
        let Some(website) = self.discover_website(company).await else {
            tracing::warn!("{company}: no company website found");
            return ContactRecord::default();
        };
        tracing::info!("{company}: crawling {website}");
        self.crawl_contact(&website).await
    }

    /// One search query per company; first hit outside the aggregator
    /// denylist wins. No retries.
    async fn discover_website(&self, company: &str) -> Option<String> {
        let query = format!("{company} 官網");
        let hits = match self.searcher.search(&query, DISCOVERY_RESULTS).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("{company}: website search failed: {e}");
                return None;
            }
        };
        for hit in hits {
            tracing::debug!("{company}: search hit {} ({} {})", hit.url, hit.title, hit.description);
            if is_company_site(&hit.url) {
                return Some(hit.url);
            }
        }
        None
    }

    async fn crawl_contact(&self, website: &str) -> ContactRecord {
        let home = match self.renderer.render(website).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Crawl failed for {website}: {e}");
                return ContactRecord::default();
            }
        };

        // Ranked record list: homepage first, then contact/about pages in
        // priority order. The fold keeps the earlier value per field.
        let mut records = vec![extract::extract_contact(&home)];

        if !ContactRecord::merge_ranked(&records).has_phone_and_email() {
            for link in rank_contact_links(&home).into_iter().take(MAX_CONTACT_PAGES) {
                match self.renderer.render(&link).await {
                    Ok(page) => records.push(extract::extract_contact(&page)),
                    Err(e) => {
                        tracing::warn!("Contact page failed for {link}: {e}");
                        continue;
                    }
                }
                if ContactRecord::merge_ranked(&records).has_phone_and_email() {
                    break;
                }
            }
        }

        ContactRecord::merge_ranked(&records)
    }
}

fn is_company_site(url: &str) -> bool {
    match Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) {
        Some(host) => !AGGREGATOR_DENYLIST.iter().any(|d| host.contains(d)),
        None => false,
    }
}

/// Same-site links whose text or URL suggests a contact/about page,
/// deduplicated, contact hits ranked above about hits above the rest.
fn rank_contact_links(home: &RenderedPage) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut scored: Vec<(i32, String)> = Vec::new();

    for link in home.links() {
        if !home.same_site(&link.href) || link.href == home.url() {
            continue;
        }
        let haystack = format!("{} {}", link.text, link.href.to_lowercase());
        if !CONTACT_OR_ABOUT.is_match(&haystack) {
            continue;
        }
        if !seen.insert(link.href.clone()) {
            continue;
        }
        let href_lower = link.href.to_lowercase();
        let score = if CONTACT_HINT.is_match(&href_lower) {
            3
        } else if ABOUT_HINT.is_match(&href_lower) {
            2
        } else {
            1
        };
        scored.push((score, link.href));
    }

    // Stable sort keeps document order within a rank.
    scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
    scored.into_iter().map(|(_, url)| url).collect()
}

/// Copy only the fields the posting is still missing.
fn apply_missing(posting: &mut JobPosting, record: &ContactRecord) {
    if posting.contact_person.is_empty() && !record.person.is_empty() {
        posting.contact_person = record.person.clone();
    }
    if posting.contact_phone.is_empty() && !record.phone.is_empty() {
        posting.contact_phone = record.phone.clone();
    }
    if posting.contact_email.is_empty() && !record.email.is_empty() {
        posting.contact_email = record.email.clone();
    }
}

fn contact_of(posting: &JobPosting) -> ContactRecord {
    ContactRecord {
        person: posting.contact_person.clone(),
        phone: posting.contact_phone.clone(),
        email: posting.contact_email.clone(),
    }
}
