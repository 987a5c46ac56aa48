//! Project source adapters
//!
//! Every source keeps the never-fail contract of [`ProjectSource`]: HTTP and
//! parse failures surface internally as [`SourceError`], are logged, and the
//! caller sees an empty list.

mod coingecko;
mod cryptorank;

pub use coingecko::CoinGeckoSource;
pub use cryptorank::CryptoRankSource;

use async_trait::async_trait;
use crypto_scout_domain::{Project, ProjectSource, Section};
use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;
use std::time::Duration;

/// Errors raised inside source adapters
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid payload: {0}")]
    Payload(String),
}

/// Shared settings for the HTTP sources
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// CoinGecko public API root
    pub coingecko_api_base: String,
    /// CoinGecko website root, used for coin pages and the web fallback
    pub coingecko_web_base: String,
    /// CryptoRank website root
    pub cryptorank_base: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Pages are cut to this many bytes before scraping
    pub max_page_bytes: usize,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            coingecko_api_base: "https://api.coingecko.com/api/v3".to_string(),
            coingecko_web_base: "https://www.coingecko.com".to_string(),
            cryptorank_base: "https://cryptorank.io".to_string(),
            user_agent: "Mozilla/5.0 (crypto-scout)".to_string(),
            timeout: Duration::from_secs(20),
            max_page_bytes: 200_000,
        }
    }
}

/// Build the HTTP client shared by scraping adapters
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

/// GET a page as text, cut to `limit` bytes on a char boundary
pub async fn fetch_text(client: &Client, url: &str, limit: usize) -> Result<String, SourceError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(SourceError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let mut text = response.text().await?;
    if text.len() > limit {
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    Ok(text)
}

/// An anchor found in a page: raw `href` and its visible text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

static RE_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).expect("valid regex")
});
static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

/// All anchors in document order
pub fn extract_links(html: &str) -> Vec<Link> {
    RE_ANCHOR
        .captures_iter(html)
        .map(|caps| Link {
            href: decode_entities(caps[1].trim()),
            text: visible_text(&caps[2]),
        })
        .collect()
}

/// Strip tags, decode common entities and collapse whitespace
fn visible_text(fragment: &str) -> String {
    let stripped = RE_TAG.replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Make a site-relative link absolute
pub fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), href)
    } else {
        href.to_string()
    }
}

/// Keep the first project per URL, up to `cap`
pub fn unique_by_url(projects: Vec<Project>, cap: usize) -> Vec<Project> {
    let mut seen = std::collections::HashSet::new();
    projects
        .into_iter()
        .filter(|p| seen.insert(p.url.clone()))
        .take(cap)
        .collect()
}

/// Fixed projects for offline runs and tests
pub struct StubSource {
    projects: Vec<Project>,
}

impl StubSource {
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    /// A stub that never returns anything
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// A handful of plausible fixtures
    pub fn sample() -> Self {
        Self::new(vec![
            Project::new("Aurora Mesh", "AMSH", "https://www.coingecko.com/en/coins/aurora-mesh"),
            Project::new("Tidal Ledger", "TIDE", "https://www.coingecko.com/en/coins/tidal-ledger"),
            Project::new("Quill Protocol", "", "https://cryptorank.io/ico/quill-protocol"),
        ])
    }
}

#[async_trait]
impl ProjectSource for StubSource {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn serves(&self, _section: Section) -> bool {
        true
    }

    async fn fetch_projects(&self, _section: Section) -> Vec<Project> {
        self.projects.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_links_handles_nested_markup() {
        let html = r#"
            <div><a class="row" href="/en/coins/foo-token">
                <span>Foo</span> <em>Token</em>
            </a></div>
            <A HREF='https://example.com/?a=1&amp;b=2'>Ex&amp;ample</A>
        "#;

        let links = extract_links(html);
        assert_eq!(
            links,
            vec![
                Link {
                    href: "/en/coins/foo-token".to_string(),
                    text: "Foo Token".to_string(),
                },
                Link {
                    href: "https://example.com/?a=1&b=2".to_string(),
                    text: "Ex&ample".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(absolutize("https://a.io/", "/x"), "https://a.io/x");
        assert_eq!(absolutize("https://a.io", "https://b.io/y"), "https://b.io/y");
    }

    #[test]
    fn test_unique_by_url_caps_and_keeps_first() {
        let projects = vec![
            Project::new("A", "", "https://x/a"),
            Project::new("A again", "", "https://x/a"),
            Project::new("B", "", "https://x/b"),
            Project::new("C", "", "https://x/c"),
        ];
        let names: Vec<_> = unique_by_url(projects, 2).into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[tokio::test]
    async fn test_stub_source_serves_everything() {
        let source = StubSource::sample();
        for section in Section::ALL {
            assert!(source.serves(section));
            assert_eq!(source.fetch_projects(section).await.len(), 3);
        }
        assert!(StubSource::empty().fetch_projects(Section::New).await.is_empty());
    }
}
