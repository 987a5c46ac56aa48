//! CryptoRank upcoming token sales, scraped from the public listing page

use async_trait::async_trait;
use crypto_scout_domain::{Project, ProjectSource, Section};
use reqwest::Client;

use super::{
    SourceError, SourceSettings, absolutize, extract_links, fetch_text, http_client, unique_by_url,
};

const SCRAPE_CAP: usize = 30;
const MAX_LINK_TEXT_CHARS: usize = 50;
const PROJECT_PATHS: [&str; 3] = ["/price/", "/coins/", "/ico/"];

/// CryptoRank source, serving the `upcoming` section
pub struct CryptoRankSource {
    client: Client,
    settings: SourceSettings,
}

impl CryptoRankSource {
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        let client = http_client(&settings.user_agent, settings.timeout)?;
        Ok(Self { client, settings })
    }

    async fn upcoming(&self) -> Result<Vec<Project>, SourceError> {
        let base = self.settings.cryptorank_base.trim_end_matches('/');
        let page = format!("{base}/upcoming-ico");
        let html = fetch_text(&self.client, &page, self.settings.max_page_bytes).await?;

        let projects = extract_links(&html)
            .into_iter()
            .filter(|link| {
                !link.text.is_empty() && link.text.chars().count() <= MAX_LINK_TEXT_CHARS
            })
            .map(|link| (absolutize(base, &link.href), link.text))
            .filter(|(url, _)| PROJECT_PATHS.iter().any(|p| url.contains(p)))
            .map(|(url, name)| Project::new(name, "", url))
            .collect();

        Ok(unique_by_url(projects, SCRAPE_CAP))
    }
}

#[async_trait]
impl ProjectSource for CryptoRankSource {
    fn name(&self) -> &'static str {
        "cryptorank"
    }

    fn serves(&self, section: Section) -> bool {
        section == Section::Upcoming
    }

    async fn fetch_projects(&self, section: Section) -> Vec<Project> {
        if !self.serves(section) {
            return vec![];
        }

        match self.upcoming().await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(error = %e, "CryptoRank fetch failed");
                vec![]
            }
        }
    }
}
