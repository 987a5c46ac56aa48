//! Configuration loading and management

use anyhow::{Context, Result};
use crypto_scout_adapters::llm::LlmConfig as AdapterLlmConfig;
use crypto_scout_adapters::llm::openai_compat::DEFAULT_BASE_URL as DEFAULT_LLM_BASE_URL;
use crypto_scout_adapters::sources::SourceSettings;
use crypto_scout_adapters::x_api::DEFAULT_BASE_URL as DEFAULT_X_BASE_URL;
use crypto_scout_domain::policy::PostFormat;
use crypto_scout_domain::usecases::{DEFAULT_FALLBACK_TEXT, RunConfig};
use crypto_scout_domain::{Section, SectionSchedule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub x: XConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub publish: PublishConfig,

    #[serde(default)]
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// Bound on each source, resolver and publish call
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Fixed seed for reproducible picks; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_project_cooldown")]
    pub project_cooldown_days: u32,

    #[serde(default = "default_text_cooldown")]
    pub text_cooldown_days: u32,

    #[serde(default = "default_pool_size")]
    pub fallback_pool_size: usize,

    /// Posted when every source is empty; empty string disables it
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,

    /// UTC hour ("0".."23") to section overrides
    #[serde(default)]
    pub schedule: BTreeMap<String, Section>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// live or stub
    #[serde(default = "default_sources_provider")]
    pub provider: String,

    #[serde(default = "default_coingecko_api_base")]
    pub coingecko_api_base: String,

    #[serde(default = "default_coingecko_web_base")]
    pub coingecko_web_base: String,

    #[serde(default = "default_cryptorank_base")]
    pub cryptorank_base: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_page_bytes")]
    pub max_page_bytes: usize,

    /// Follow redirects to find each project's canonical URL
    #[serde(default = "default_true")]
    pub resolve_urls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Look up the project's official X handle before drafting
    #[serde(default = "default_true")]
    pub handle_lookup: bool,

    #[serde(default)]
    pub openai_compat: OpenAiCompatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCompatConfig {
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_x_user_token_env")]
    pub oauth2_user_token_env: String,

    #[serde(default = "default_x_base_url")]
    pub base_url: String,

    #[serde(default = "default_x_max_chars")]
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Card image attached to some posts
    #[serde(default)]
    pub card_path: Option<PathBuf>,

    #[serde(default = "default_attach_probability")]
    pub attach_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_daemon_interval")]
    pub interval_secs: u64,
}

// Default value functions
fn default_state_path() -> PathBuf {
    PathBuf::from("./state.json")
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("./crypto-scout.lock")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_call_timeout() -> u64 {
    45
}

fn default_project_cooldown() -> u32 {
    7
}

fn default_text_cooldown() -> u32 {
    14
}

fn default_pool_size() -> usize {
    20
}

fn default_fallback_text() -> String {
    DEFAULT_FALLBACK_TEXT.to_string()
}

fn default_sources_provider() -> String {
    "live".to_string()
}

fn default_coingecko_api_base() -> String {
    SourceSettings::default().coingecko_api_base
}

fn default_coingecko_web_base() -> String {
    SourceSettings::default().coingecko_web_base
}

fn default_cryptorank_base() -> String {
    SourceSettings::default().cryptorank_base
}

fn default_user_agent() -> String {
    SourceSettings::default().user_agent
}

fn default_source_timeout() -> u64 {
    20
}

fn default_max_page_bytes() -> usize {
    200_000
}

fn default_llm_provider() -> String {
    "openai_compat".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.6
}

fn default_llm_timeout() -> u64 {
    45
}

fn default_llm_retries() -> u32 {
    2
}

fn default_max_output_tokens() -> u32 {
    400
}

fn default_llm_api_key_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_llm_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}

fn default_x_user_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_x_base_url() -> String {
    DEFAULT_X_BASE_URL.to_string()
}

fn default_x_max_chars() -> usize {
    280
}

fn default_attach_probability() -> f64 {
    0.25
}

fn default_retry_backoff() -> u64 {
    15
}

fn default_max_backoff() -> u64 {
    900
}

fn default_daemon_interval() -> u64 {
    3600
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            lock_path: default_lock_path(),
            log_level: default_log_level(),
            dry_run: default_true(),
            call_timeout_secs: default_call_timeout(),
            seed: None,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            project_cooldown_days: default_project_cooldown(),
            text_cooldown_days: default_text_cooldown(),
            fallback_pool_size: default_pool_size(),
            fallback_text: default_fallback_text(),
            schedule: BTreeMap::new(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            provider: default_sources_provider(),
            coingecko_api_base: default_coingecko_api_base(),
            coingecko_web_base: default_coingecko_web_base(),
            cryptorank_base: default_cryptorank_base(),
            user_agent: default_user_agent(),
            timeout_secs: default_source_timeout(),
            max_page_bytes: default_max_page_bytes(),
            resolve_urls: default_true(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
            retries: default_llm_retries(),
            max_output_tokens: default_max_output_tokens(),
            handle_lookup: default_true(),
            openai_compat: OpenAiCompatConfig::default(),
        }
    }
}

impl Default for OpenAiCompatConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_llm_api_key_env(),
            base_url: default_llm_base_url(),
        }
    }
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            oauth2_user_token_env: default_x_user_token_env(),
            base_url: default_x_base_url(),
            max_chars: default_x_max_chars(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            card_path: None,
            attach_probability: default_attach_probability(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            retry_backoff_secs: default_retry_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_daemon_interval(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("CRYPTO_SCOUT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Default schedule with the configured hour overrides applied
    pub fn schedule(&self) -> Result<SectionSchedule> {
        let overrides = self
            .selection
            .schedule
            .iter()
            .map(|(hour, section)| {
                let hour: u8 = hour
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid schedule hour: {hour}"))?;
                Ok((hour, *section))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        SectionSchedule::with_overrides(&overrides).context("Invalid section schedule")
    }

    /// Orchestrator settings for a run
    pub fn run_config(&self, dry_run: bool) -> Result<RunConfig> {
        let probability = self.media.attach_probability;
        if !(0.0..=1.0).contains(&probability) {
            anyhow::bail!("media.attach_probability must be within [0, 1], got {probability}");
        }

        Ok(RunConfig {
            project_cooldown_days: self.selection.project_cooldown_days,
            text_cooldown_days: self.selection.text_cooldown_days,
            fallback_pool_size: self.selection.fallback_pool_size,
            fallback_text: self.selection.fallback_text.clone(),
            dry_run,
            call_timeout: Duration::from_secs(self.general.call_timeout_secs),
            retry_backoff: Duration::from_secs(self.publish.retry_backoff_secs),
            max_backoff: Duration::from_secs(self.publish.max_backoff_secs),
            card_path: self.media.card_path.clone(),
            attach_probability: probability,
            schedule: self.schedule()?,
            format: PostFormat::default(),
        })
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            coingecko_api_base: self.sources.coingecko_api_base.clone(),
            coingecko_web_base: self.sources.coingecko_web_base.clone(),
            cryptorank_base: self.sources.cryptorank_base.clone(),
            user_agent: self.sources.user_agent.clone(),
            timeout: Duration::from_secs(self.sources.timeout_secs),
            max_page_bytes: self.sources.max_page_bytes,
        }
    }

    pub fn adapter_llm_config(&self) -> AdapterLlmConfig {
        AdapterLlmConfig {
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            max_output_tokens: self.llm.max_output_tokens,
            timeout_secs: self.llm.timeout_secs,
            retries: self.llm.retries,
        }
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# crypto-scout configuration

[general]
state_path = "./state.json"
lock_path = "./crypto-scout.lock"
log_level = "info"
dry_run = true
call_timeout_secs = 45
# seed = 42

[selection]
project_cooldown_days = 7
text_cooldown_days = 14
fallback_pool_size = 20
# Empty string disables the announcement when every source is empty
fallback_text = "No clean data pulled today. Skipping research post to avoid noise."

# UTC hour -> section (new, trending, movers, upcoming)
[selection.schedule]
# "7" = "new"
# "15" = "new"

[sources]
provider = "live"  # live, stub
coingecko_api_base = "https://api.coingecko.com/api/v3"
coingecko_web_base = "https://www.coingecko.com"
cryptorank_base = "https://cryptorank.io"
user_agent = "Mozilla/5.0 (crypto-scout)"
timeout_secs = 20
max_page_bytes = 200000
resolve_urls = true

[llm]
provider = "openai_compat"  # openai_compat, stub
model = "gpt-4o-mini"
temperature = 0.6
timeout_secs = 45
retries = 2
max_output_tokens = 400
handle_lookup = true

[llm.openai_compat]
api_key_env = "GITHUB_TOKEN"
base_url = "https://models.github.ai/inference"

[x]
enabled = false
oauth2_user_token_env = "X_USER_TOKEN"
base_url = "https://api.x.com"
max_chars = 280

[media]
# card_path = "./card.png"
attach_probability = 0.25

[publish]
retry_backoff_secs = 15
max_backoff_secs = 900

[daemon]
interval_secs = 3600
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_toml_parses_to_defaults() {
        let parsed: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();

        assert!(parsed.general.dry_run);
        assert_eq!(parsed.selection.project_cooldown_days, 7);
        assert_eq!(parsed.selection.text_cooldown_days, 14);
        assert_eq!(parsed.sources.provider, "live");
        assert_eq!(parsed.llm.openai_compat.api_key_env, "GITHUB_TOKEN");
        assert_eq!(parsed.daemon.interval_secs, 3600);
    }

    #[test]
    fn test_schedule_overrides_apply() {
        let mut config = AppConfig::default();
        config
            .selection
            .schedule
            .insert("3".to_string(), Section::Movers);

        let schedule = config.schedule().unwrap();
        assert_eq!(schedule.section_for(3), Section::Movers);
        assert_eq!(schedule.section_for(7), Section::New);
    }

    #[test]
    fn test_schedule_rejects_bad_hours() {
        let mut config = AppConfig::default();
        config
            .selection
            .schedule
            .insert("noon".to_string(), Section::New);
        assert!(config.schedule().is_err());

        config.selection.schedule.clear();
        config
            .selection
            .schedule
            .insert("24".to_string(), Section::New);
        assert!(config.schedule().is_err());
    }

    #[test]
    fn test_run_config_validates_probability() {
        let mut config = AppConfig::default();
        assert!(config.run_config(true).is_ok());

        config.media.attach_probability = 1.5;
        assert!(config.run_config(true).is_err());
    }
}
