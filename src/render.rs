// Rendering collaborator seam. The core only needs "give me this URL as a
// page I can query"; a headless-browser collaborator can implement the same
// trait when a target site requires JS rendering.

use std::time::Duration;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use crate::error::AppError;

/// Supplies rendered page content for a URL.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<RenderedPage, AppError>;
}

/// A link found on a page: anchor text plus resolved absolute URL.
#[derive(Debug, Clone)]
pub struct PageLink {
    pub text: String,
    pub href: String,
}

/// Fetched page content with CSS-selector accessors.
///
/// Holds the raw HTML and re-parses per query: `scraper::Html` is not `Send`,
/// so it must never live across an await point.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    url: Url,
    html: String,
}

impl RenderedPage {
    pub fn new(url: &str, html: String) -> Result<Self, AppError> {
        let url = Url::parse(url).map_err(|e| AppError::Parse(format!("Bad URL {url}: {e}")))?;
        Ok(Self { url, html })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// A sub-document (e.g. one listing card) that keeps this page's URL for
    /// link resolution.
    pub fn fragment(&self, html: String) -> RenderedPage {
        RenderedPage {
            url: self.url.clone(),
            html,
        }
    }

    /// Trimmed text content of every element matching `css`.
    pub fn select_texts(&self, css: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(css) else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        doc.select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn select_first_text(&self, css: &str) -> Option<String> {
        self.select_texts(css).into_iter().next()
    }

    /// `attr` value of the first element matching `css`.
    pub fn select_first_attr(&self, css: &str, attr: &str) -> Option<String> {
        let selector = Selector::parse(css).ok()?;
        let doc = Html::parse_document(&self.html);
        doc.select(&selector)
            .find_map(|el| el.value().attr(attr).map(str::to_string))
    }

    /// Outer HTML of every element matching `css`, for per-card sub-queries.
    pub fn select_html(&self, css: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(css) else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        doc.select(&selector).map(|el| el.html()).collect()
    }

    /// All anchors with their hrefs resolved against the page URL.
    /// Keeps http(s) targets only.
    pub fn links(&self) -> Vec<PageLink> {
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        doc.select(&selector)
            .filter_map(|el| {
                let href = el.value().attr("href")?;
                let resolved = self.url.join(href).ok()?;
                if resolved.scheme() != "http" && resolved.scheme() != "https" {
                    return None;
                }
                Some(PageLink {
                    text: el.text().collect::<String>().trim().to_string(),
                    href: resolved.to_string(),
                })
            })
            .collect()
    }

    /// Addresses of `mailto:` anchors, query part stripped.
    pub fn mailto_addresses(&self) -> Vec<String> {
        let Ok(selector) = Selector::parse(r#"a[href^="mailto:"]"#) else {
            return Vec::new();
        };
        let doc = Html::parse_document(&self.html);
        doc.select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| {
                let addr = href.trim_start_matches("mailto:");
                addr.split('?').next().unwrap_or(addr).trim().to_string()
            })
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Full text content of the page.
    pub fn text(&self) -> String {
        let doc = Html::parse_document(&self.html);
        doc.root_element().text().collect::<String>()
    }

    /// Text of the footer region, if one is identifiable.
    pub fn footer_text(&self) -> Option<String> {
        for css in ["footer", r#"[class*="footer"]"#] {
            if let Some(text) = self.select_first_text(css) {
                return Some(text);
            }
        }
        None
    }

    /// Resolve a possibly-relative href against the page URL.
    pub fn resolve(&self, href: &str) -> Option<String> {
        self.url.join(href).ok().map(|u| u.to_string())
    }

    /// Whether the URL's host matches this page's host.
    pub fn same_site(&self, href: &str) -> bool {
        match (self.host(), Url::parse(href).ok().and_then(|u| u.host_str().map(str::to_string))) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain-HTTP renderer for static content.
pub struct HttpRenderer {
    client: reqwest::Client,
    settle: Duration,
}

impl HttpRenderer {
    /// `timeout` bounds navigation; `settle` is an extra pause after load,
    /// matching the settle-delay contract of browser-based renderers.
    pub fn new(timeout: Duration, settle: Duration) -> Result<Self, AppError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
                .parse()
                .expect("static header value"),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            "zh-TW,zh;q=0.9,en;q=0.8".parse().expect("static header value"),
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, settle })
    }

    pub fn with_timeout_ms(timeout_ms: u64, settle_ms: u64) -> Result<Self, AppError> {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(settle_ms),
        )
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<RenderedPage, AppError> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Render(format!("HTTP {status} for {url}")));
        }

        let html = resp.text().await?;
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        RenderedPage::new(url, html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(html: &str) -> RenderedPage {
        RenderedPage::new("https://example.com.tw/about/", html.to_string()).unwrap()
    }

    #[test]
    fn selects_texts_and_attrs() {
        let p = page(
            r#"<div class="card"><a class="job" href="/j/1">工程師</a></div>
               <div class="card"><a class="job" href="/j/2">分析師</a></div>"#,
        );
        assert_eq!(p.select_texts(".job"), vec!["工程師", "分析師"]);
        assert_eq!(p.select_first_attr(".job", "href").as_deref(), Some("/j/1"));
    }

    #[test]
    fn links_resolve_relative_hrefs() {
        let p = page(r#"<a href="../contact">聯絡我們</a><a href="mailto:x@y.tw">mail</a>"#);
        let links = p.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].href, "https://example.com.tw/contact");
        assert_eq!(links[0].text, "聯絡我們");
    }

    #[test]
    fn mailto_addresses_strip_query_part() {
        let p = page(r#"<a href="mailto:hr@example.com?subject=hi">徵才信箱</a>"#);
        assert_eq!(p.mailto_addresses(), vec!["hr@example.com"]);
    }

    #[test]
    fn footer_text_falls_back_to_class_hint() {
        let p = page(r#"<div class="site-footer">電話：02-2345-6789</div>"#);
        assert!(p.footer_text().unwrap().contains("02-2345-6789"));

        let p = page("<footer>0800-123-456</footer>");
        assert_eq!(p.footer_text().as_deref(), Some("0800-123-456"));
    }

    #[test]
    fn same_site_compares_hosts() {
        let p = page("");
        assert!(p.same_site("https://example.com.tw/jobs"));
        assert!(!p.same_site("https://www.104.com.tw/job/1"));
    }
}
