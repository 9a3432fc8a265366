//! Job listings collaborator: posting links from a search page and the description behind each.
//!
//! Page parsing is split from fetching so it can be tested against saved HTML.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::config::ScrapeSettings;
use crate::errors::PipelineError;
use crate::models::job::PostingLink;

/// Link to each posting on a search results page.
pub const POSTING_LINK_SELECTOR: &str = "a.base-card__full-link";
/// Description container on a posting page, in order of preference.
pub const DESCRIPTION_SELECTORS: &[&str] =
    &[".description__text", ".show-more-less-html__markup"];

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";

#[async_trait]
pub trait JobBoard: Send + Sync {
    /// Posting links in page order.
    async fn posting_links(&self) -> Result<Vec<PostingLink>, PipelineError>;

    /// Raw description text of one posting.
    async fn description(&self, url: &str) -> Result<String, PipelineError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct HttpListingScraper {
    client: Client,
    settings: ScrapeSettings,
}

impl HttpListingScraper {
    pub fn new(settings: ScrapeSettings) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(settings.timeout_secs))
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build HTTP client"),
            settings,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::PageLoadTimeout {
                    url: url.to_string(),
                }
            } else {
                PipelineError::Connection(format!("{url}: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Connection(format!("{url} returned {status}")));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::PageLoadTimeout {
                    url: url.to_string(),
                }
            } else {
                PipelineError::Connection(format!("{url}: {e}"))
            }
        })
    }
}

#[async_trait]
impl JobBoard for HttpListingScraper {
    async fn posting_links(&self) -> Result<Vec<PostingLink>, PipelineError> {
        let url = search_url(&self.settings)?;
        info!("Fetching job listings from {}", url);
        let html = self.fetch(url.as_str()).await?;
        let links = parse_posting_links(&html)?;
        info!("Found {} postings", links.len());
        Ok(links)
    }

    async fn description(&self, url: &str) -> Result<String, PipelineError> {
        let html = self.fetch(url).await?;
        let description = parse_description(&html, url)?;
        debug!("Fetched description ({} chars) for {}", description.len(), url);
        Ok(description)
    }
}

/// Search URL with keywords and work-type filter.
pub fn search_url(settings: &ScrapeSettings) -> Result<Url, PipelineError> {
    Url::parse_with_params(
        &settings.search_url,
        &[
            ("keywords", settings.keywords.join(" ")),
            ("f_WT", settings.work_type.code().to_string()),
        ],
    )
    .map_err(|e| PipelineError::Config(format!("invalid SEARCH_URL '{}': {e}", settings.search_url)))
}

fn selector(css: &str) -> Result<Selector, PipelineError> {
    Selector::parse(css)
        .map_err(|e| PipelineError::Internal(anyhow::anyhow!("invalid selector '{css}': {e}")))
}

/// Extracts `(title, url)` pairs. Links without text or href are skipped; a page without any
/// posting links yields an empty list.
pub fn parse_posting_links(html: &str) -> Result<Vec<PostingLink>, PipelineError> {
    let document = Html::parse_document(html);
    let link_selector = selector(POSTING_LINK_SELECTOR)?;

    let links = document
        .select(&link_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim();
            let title = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            if href.is_empty() || title.is_empty() {
                return None;
            }
            Some(PostingLink {
                title,
                url: href.to_string(),
            })
        })
        .collect();
    Ok(links)
}

/// Extracts the description text of a posting page.
pub fn parse_description(html: &str, url: &str) -> Result<String, PipelineError> {
    let document = Html::parse_document(html);
    for css in DESCRIPTION_SELECTORS {
        let description_selector = selector(css)?;
        if let Some(element) = document.select(&description_selector).next() {
            let text = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            if !text.is_empty() {
                return Ok(text);
            }
        }
    }
    Err(PipelineError::ElementNotFound {
        selector: DESCRIPTION_SELECTORS.join(", "),
        url: url.to_string(),
    })
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
