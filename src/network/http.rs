//! HTTP metadata fetching: page title and favicon of a local web service

use crate::config::ScanConfig;
use crate::network::AttemptOutcome;
use once_cell::sync::Lazy;
use reqwest::{redirect, Client, Url};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Conventional favicon location when the page declares none
pub const DEFAULT_FAVICON_PATH: &str = "/favicon.ico";

/// Same-host redirect hops followed before the redirect itself is used
const MAX_REDIRECTS: usize = 5;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid title selector"));
static ICON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="icon"]"#).expect("valid icon selector"));
static SHORTCUT_ICON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="shortcut icon"]"#).expect("valid shortcut icon selector"));

/// Display metadata for one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    pub title: String,
    pub favicon: Option<String>,
}

impl ServiceMetadata {
    /// Placeholder used when no candidate host answered over HTTP
    pub fn unknown(port: u16) -> Self {
        Self {
            title: format!("Unknown Service ({})", port),
            favicon: None,
        }
    }
}

/// Metadata for a port plus what went wrong on the hosts that did not answer
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub port: u16,
    pub metadata: ServiceMetadata,
    /// `(host, outcome)` for every host tried before the answering one
    pub failures: Vec<(String, AttemptOutcome)>,
}

/// What the root page declares about itself
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub title: Option<String>,
    pub icon_href: Option<String>,
}

/// Extract the first non-empty `<title>` and the declared favicon `href`.
///
/// `rel="icon"` wins over `rel="shortcut icon"`; empty values count as absent.
pub fn parse_page(html: &str) -> PageInfo {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty());

    let icon_href = [&*ICON_SELECTOR, &*SHORTCUT_ICON_SELECTOR]
        .into_iter()
        .find_map(|selector| {
            document
                .select(selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
        })
        .map(str::to_string);

    PageInfo { title, icon_href }
}

/// Resolve a favicon reference against the URL the page was served from.
///
/// A container-internal host is swapped for `localhost` so the URL works from
/// a browser on the developer machine.
pub fn resolve_favicon(base: &Url, href: Option<&str>, container_alias: &str) -> Option<String> {
    let mut resolved = base
        .join(href.unwrap_or(DEFAULT_FAVICON_PATH))
        .or_else(|_| base.join(DEFAULT_FAVICON_PATH))
        .ok()?;

    if resolved.host_str() == Some(container_alias) {
        resolved.set_host(Some("localhost")).ok()?;
    }

    Some(resolved.to_string())
}

/// Build display metadata from a fetched page
pub fn metadata_from_page(port: u16, html: &str, base: &Url, container_alias: &str) -> ServiceMetadata {
    let page = parse_page(html);
    ServiceMetadata {
        title: page.title.unwrap_or_else(|| format!("Service ({})", port)),
        favicon: resolve_favicon(base, page.icon_href.as_deref(), container_alias),
    }
}

/// Redirects are followed only while they stay on the original host and port
fn same_host_policy() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.stop();
        }

        let same_origin = attempt.previous().first().map_or(false, |origin| {
            origin.host_str() == attempt.url().host_str()
                && origin.port_or_known_default() == attempt.url().port_or_known_default()
        });

        if same_origin {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

/// Fetches root-page metadata from candidate hosts in priority order
#[derive(Debug, Clone)]
pub struct MetadataFetcher {
    client: Client,
    hosts: Vec<String>,
    container_alias: String,
}

impl MetadataFetcher {
    pub fn new(hosts: Vec<String>, timeout: Duration, container_alias: impl Into<String>) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(same_host_policy())
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            hosts,
            container_alias: container_alias.into(),
        })
    }

    /// Fetcher for the hosts, timeout and alias of a scan configuration
    pub fn from_config(config: &ScanConfig) -> crate::Result<Self> {
        Self::new(
            config.http_hosts(),
            config.fetch_timeout_duration(),
            config.container_host_alias.clone(),
        )
    }

    /// GET `http://<host>:<port>/` and read the body
    async fn fetch_page(&self, host: &str, port: u16) -> Result<(Url, String), AttemptOutcome> {
        let base = format!("http://{}:{}/", host, port);
        let response = self.client.get(&base).send().await.map_err(|e| classify(&e))?;

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify(&e))?;

        Ok((final_url, body))
    }

    /// Metadata from the first host that answers, or a placeholder
    pub async fn fetch(&self, port: u16) -> FetchOutcome {
        let mut failures = Vec::new();

        for host in &self.hosts {
            match self.fetch_page(host, port).await {
                Ok((base, body)) => {
                    return FetchOutcome {
                        port,
                        metadata: metadata_from_page(port, &body, &base, &self.container_alias),
                        failures,
                    };
                }
                Err(outcome) => failures.push((host.clone(), outcome)),
            }
        }

        FetchOutcome {
            port,
            metadata: ServiceMetadata::unknown(port),
            failures,
        }
    }
}

fn classify(err: &reqwest::Error) -> AttemptOutcome {
    if err.is_timeout() {
        AttemptOutcome::TimedOut
    } else if err.is_connect() {
        AttemptOutcome::Refused
    } else {
        AttemptOutcome::Failed(err.to_string())
    }
}
