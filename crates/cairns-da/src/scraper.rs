use crate::config::{ConfigError, ScraperConfig};
use crate::parser::{
    ParseError, RecordContext, SearchForm, parse_application, parse_search_form,
    parse_search_results,
};
use crate::types::DevelopmentApplication;
use crate::utils::{MonthRange, RunReport};

use chrono::Local;
use futures::{StreamExt, stream};
use reqwest::Client;
use reqwest::cookie::{CookieStore, Jar};
use std::sync::Arc;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Invalid configuration: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),
}

/// Entry point of a scrape. Holds configuration only; every run opens its own
/// [`Session`] through [`WebScraper::bootstrap`].
#[derive(Debug, Clone)]
pub struct WebScraper {
    config: ScraperConfig,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_config(ScraperConfig::default())
    }

    pub fn with_config(config: ScraperConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            config: config.validate()?,
        })
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Visits the search initialization page with a fresh cookie jar so the
    /// portal allocates search state for this run.
    pub async fn bootstrap(&self) -> Result<Session, ScraperError> {
        let search_url = self.config.parsed_search_url()?;
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.as_str())
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        log::info!("Opening portal session at {}...", search_url);
        let (page_url, html) = get_html(&client, search_url).await?;

        if jar.cookies(&page_url).is_none() {
            log::warn!("Portal did not set a session cookie, searches may fail");
        }

        let form = parse_search_form(&html, &page_url)?;
        log::debug!(
            "Search form posts to {} with {} default field(s)",
            form.action,
            form.fields.len()
        );

        Ok(Session {
            client,
            jar,
            form,
            context: RecordContext {
                date_scraped: Local::now().date_naive(),
                info_url: self.config.search_url.clone(),
                feedback_url: self.config.feedback_url.clone(),
            },
        })
    }

    /// Bootstrap, search `range`, then fetch every application found.
    pub async fn scrape(
        &self,
        range: MonthRange,
        concurrency: usize,
    ) -> Result<RunReport, ScraperError> {
        let session = self.bootstrap().await?;
        let results = session.search(range).await?;
        Ok(session
            .fetch_applications(results.detail_urls(), concurrency)
            .await)
    }
}

/// A bootstrapped portal session. The cookie jar inside is only valid for
/// the run that created it.
#[derive(Debug)]
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    form: SearchForm,
    context: RecordContext,
}

impl Session {
    pub fn has_cookies_for(&self, url: &Url) -> bool {
        self.jar.cookies(url).is_some()
    }

    pub async fn search(&self, range: MonthRange) -> Result<SearchResults, ScraperError> {
        log::info!("Searching for applications lodged {}...", range);

        let params = self.form.with_overrides(&range.form_fields());
        let response = self
            .client
            .post(self.form.action.clone())
            .form(&params)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
            .error_for_status()?;
        let page_url = response.url().clone();
        let html = response
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;

        let detail_urls = parse_search_results(&html, &page_url)
            .inspect_err(|e| log::error!("{e}"))?;
        log::info!("Found {} application(s)", detail_urls.len());

        Ok(SearchResults { range, detail_urls })
    }

    /// `Ok(None)` when the page carries no council reference.
    pub async fn fetch_application(
        &self,
        url: &Url,
    ) -> Result<Option<DevelopmentApplication>, ScraperError> {
        log::debug!("Fetching application: {}", url);
        let (_, html) = get_html(&self.client, url.clone()).await?;
        Ok(parse_application(&html, &self.context)?)
    }

    /// Fetches detail pages with at most `concurrency` requests in flight.
    /// Failed pages are counted and logged, they never stop the others.
    pub async fn fetch_applications(&self, urls: &[Url], concurrency: usize) -> RunReport {
        log::info!("Fetching {} application page(s)...", urls.len());

        let mut pages = stream::iter(urls)
            .map(|url| async move { (url, self.fetch_application(url).await) })
            .buffer_unordered(concurrency.max(1));

        let mut report = RunReport::default();
        while let Some((url, result)) = pages.next().await {
            match result {
                Ok(Some(application)) => report.applications.push(application),
                Ok(None) => {
                    log::debug!("No council reference on {}, skipping", url);
                    report.skipped += 1;
                }
                Err(e) => {
                    log::warn!("Failed to fetch application {}: {}", url, e);
                    report.failed += 1;
                }
            }
        }

        log::info!(
            "Successfully scraped {} application(s)",
            report.applications.len()
        );
        report
    }
}

/// Detail page links returned by one search.
#[derive(Debug, Clone)]
pub struct SearchResults {
    range: MonthRange,
    detail_urls: Vec<Url>,
}

impl SearchResults {
    pub fn range(&self) -> MonthRange {
        self.range
    }

    pub fn detail_urls(&self) -> &[Url] {
        &self.detail_urls
    }

    pub fn len(&self) -> usize {
        self.detail_urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detail_urls.is_empty()
    }
}

async fn get_html(client: &Client, url: Url) -> Result<(Url, String), ScraperError> {
    let response = client
        .get(url)
        .send()
        .await
        .inspect_err(|e| log::error!("HTTP error: {e:?}"))?
        .error_for_status()?;
    let page_url = response.url().clone();
    let html = response
        .text()
        .await
        .inspect_err(|e| log::error!("Decode error: {e:?}"))?;
    Ok((page_url, html))
}
