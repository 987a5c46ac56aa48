//! CoinGecko: recently added, trending and biggest movers

use async_trait::async_trait;
use crypto_scout_domain::{Project, ProjectSource, Section};
use reqwest::Client;
use serde::Deserialize;

use super::{
    SourceError, SourceSettings, absolutize, extract_links, fetch_text, http_client, unique_by_url,
};

const API_CAP: usize = 50;
const SCRAPE_CAP: usize = 30;
const MOVERS_CAP: usize = 30;
const MAX_SCRAPED_NAME_CHARS: usize = 40;

/// CoinGecko source, serving the `new`, `trending` and `movers` sections
pub struct CoinGeckoSource {
    client: Client,
    settings: SourceSettings,
}

#[derive(Deserialize)]
struct ListedCoin {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct TrendingResponse {
    #[serde(default)]
    coins: Vec<TrendingEntry>,
}

#[derive(Deserialize)]
struct TrendingEntry {
    item: ListedCoin,
}

#[derive(Deserialize)]
struct MarketCoin {
    id: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    name: String,
    price_change_percentage_24h: Option<f64>,
}

impl CoinGeckoSource {
    pub fn new(settings: SourceSettings) -> Result<Self, SourceError> {
        let client = http_client(&settings.user_agent, settings.timeout)?;
        Ok(Self { client, settings })
    }

    fn coin_page(&self, id: &str) -> String {
        format!(
            "{}/en/coins/{}",
            self.settings.coingecko_web_base.trim_end_matches('/'),
            id
        )
    }

    fn to_project(&self, coin: ListedCoin) -> Project {
        let url = self.coin_page(&coin.id);
        Project::new(coin.name.trim(), coin.symbol.trim().to_uppercase(), url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!(
            "{}{}",
            self.settings.coingecko_api_base.trim_end_matches('/'),
            path
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        response
            .json()
            .await
            .map_err(|e| SourceError::Payload(e.to_string()))
    }

    async fn new_from_api(&self) -> Result<Vec<Project>, SourceError> {
        let coins: Vec<ListedCoin> = self.get_json("/coins/list/new").await?;
        let projects = coins
            .into_iter()
            .take(API_CAP)
            .filter(|c| !c.name.trim().is_empty() && !c.id.trim().is_empty())
            .map(|c| self.to_project(c))
            .collect();
        Ok(projects)
    }

    async fn new_from_web(&self) -> Result<Vec<Project>, SourceError> {
        let base = self.settings.coingecko_web_base.trim_end_matches('/');
        let page = format!("{base}/en/new-cryptocurrencies");
        let html = fetch_text(&self.client, &page, self.settings.max_page_bytes).await?;

        let projects = extract_links(&html)
            .into_iter()
            .filter(|link| link.href.contains("/en/coins/"))
            .filter(|link| {
                !link.text.is_empty() && link.text.chars().count() <= MAX_SCRAPED_NAME_CHARS
            })
            .map(|link| Project::new(link.text, "", absolutize(base, &link.href)))
            .collect();
        Ok(unique_by_url(projects, SCRAPE_CAP))
    }

    async fn recently_added(&self) -> Result<Vec<Project>, SourceError> {
        match self.new_from_api().await {
            Ok(projects) if !projects.is_empty() => Ok(projects),
            Ok(_) => {
                tracing::info!("CoinGecko new-coins API returned nothing, trying the website");
                self.new_from_web().await
            }
            Err(e) => {
                tracing::info!(error = %e, "CoinGecko new-coins API unavailable, trying the website");
                self.new_from_web().await
            }
        }
    }

    async fn trending(&self) -> Result<Vec<Project>, SourceError> {
        let response: TrendingResponse = self.get_json("/search/trending").await?;
        Ok(response
            .coins
            .into_iter()
            .map(|entry| entry.item)
            .filter(|c| !c.name.trim().is_empty())
            .map(|c| self.to_project(c))
            .collect())
    }

    async fn movers(&self) -> Result<Vec<Project>, SourceError> {
        let mut coins: Vec<MarketCoin> = self
            .get_json("/coins/markets?vs_currency=usd&order=volume_desc&per_page=100&page=1")
            .await?;

        coins.retain(|c| c.price_change_percentage_24h.is_some_and(f64::is_finite));
        coins.sort_by(|a, b| {
            let a = a.price_change_percentage_24h.unwrap_or_default().abs();
            let b = b.price_change_percentage_24h.unwrap_or_default().abs();
            b.total_cmp(&a)
        });

        Ok(coins
            .into_iter()
            .filter(|c| !c.name.trim().is_empty())
            .take(MOVERS_CAP)
            .map(|c| {
                self.to_project(ListedCoin {
                    id: c.id,
                    symbol: c.symbol,
                    name: c.name,
                })
            })
            .collect())
    }
}

#[async_trait]
impl ProjectSource for CoinGeckoSource {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    fn serves(&self, section: Section) -> bool {
        matches!(section, Section::New | Section::Trending | Section::Movers)
    }

    async fn fetch_projects(&self, section: Section) -> Vec<Project> {
        let result = match section {
            Section::New => self.recently_added().await,
            Section::Trending => self.trending().await,
            Section::Movers => self.movers().await,
            Section::Upcoming => return vec![],
        };

        match result {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!(section = %section, error = %e, "CoinGecko fetch failed");
                vec![]
            }
        }
    }
}
