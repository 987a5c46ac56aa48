//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use time::Date;

/// A candidate project discovered by a source adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Display name
    pub name: String,
    /// Short ticker, may be empty
    #[serde(default)]
    pub symbol: String,
    /// Canonical page for the project, may be empty
    #[serde(default)]
    pub url: String,
}

impl Project {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            url: url.into(),
        }
    }

    /// Deduplication key: the normalized URL, or the lowercased name when
    /// the project has no URL yet
    pub fn identity(&self) -> String {
        let url = normalize_url(&self.url);
        if url.is_empty() {
            format!("name:{}", self.name.trim().to_lowercase())
        } else {
            url
        }
    }
}

/// Trim whitespace, drop the fragment and any trailing slashes
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or_default();
    without_fragment.trim_end_matches('/').to_string()
}

/// Upstream category covered by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    /// Recently listed coins
    New,
    /// Trending searches
    Trending,
    /// Biggest 24h price moves
    Movers,
    /// Upcoming token sales
    Upcoming,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::New,
        Section::Trending,
        Section::Movers,
        Section::Upcoming,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::New => "new",
            Section::Trending => "trending",
            Section::Movers => "movers",
            Section::Upcoming => "upcoming",
        }
    }

    /// Source description handed to the content generator
    pub fn label(self) -> &'static str {
        match self {
            Section::New => "CoinGecko recently added",
            Section::Trending => "CoinGecko trending searches",
            Section::Movers => "CoinGecko biggest 24h movers",
            Section::Upcoming => "CryptoRank upcoming token sales",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown section '{0}' (expected new, trending, movers or upcoming)")]
pub struct ParseSectionError(pub String);

impl FromStr for Section {
    type Err = ParseSectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Section::New),
            "trending" => Ok(Section::Trending),
            "movers" => Ok(Section::Movers),
            "upcoming" => Ok(Section::Upcoming),
            other => Err(ParseSectionError(other.to_string())),
        }
    }
}

/// Durable deduplication state, persisted as one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Project identity -> date of the last successful post about it
    #[serde(default)]
    pub seen_projects: BTreeMap<String, Date>,
    /// Text fingerprint -> date it was last posted
    #[serde(default)]
    pub seen_texts: BTreeMap<String, Date>,
    /// Carried through unchanged; replies are not sent
    #[serde(default)]
    pub last_reply_date: Option<Date>,
}

impl RunState {
    pub fn remember_project(&mut self, project: &Project, today: Date) {
        self.seen_projects.insert(project.identity(), today);
    }

    pub fn remember_text(&mut self, fingerprint: &str, today: Date) {
        self.seen_texts.insert(fingerprint.to_string(), today);
    }

    pub fn is_empty(&self) -> bool {
        self.seen_projects.is_empty() && self.seen_texts.is_empty() && self.last_reply_date.is_none()
    }
}

/// Request handed to the content generator
#[derive(Debug, Clone)]
pub struct DraftRequest {
    /// Chosen project; `url` is already the canonical URL
    pub project: Project,
    /// Section the project was discovered in
    pub section: Section,
}

/// Raw generator output, before format enforcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Post text
    pub text: String,
    /// Short caption for an attached card
    #[serde(default)]
    pub caption: String,
}

impl Draft {
    pub const MAX_CAPTION_CHARS: usize = 80;

    /// Draft used when the generator is unavailable or returns garbage
    pub fn fallback(project: &Project) -> Self {
        let text = if project.url.trim().is_empty() {
            format!("{} - early project.", project.name.trim())
        } else {
            format!("{} - early project.\nSource: {}", project.name.trim(), project.url.trim())
        };
        Self {
            text,
            caption: project.name.trim().chars().take(Self::MAX_CAPTION_CHARS).collect(),
        }
    }
}

/// Final content handed to a publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPost {
    /// Post text, already formatted
    pub text: String,
    /// Optional image to attach
    pub image_path: Option<PathBuf>,
    /// Short description of the project, used as the image alt text
    pub caption: Option<String>,
}

/// Where the posted candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Drawn from the projects outside their cooldown
    Fresh,
    /// Drawn from the staleness-ranked pool because nothing was fresh
    StalenessFallback,
    /// Static announcement used because every source came back empty
    StaticFallback,
}

/// States visited by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Init,
    SourceLoaded,
    NoSourceData,
    HasCandidates,
    NoFreshCandidates,
    FreshSelected,
    Drafted,
    DuplicateRetry,
    FormatOk,
    PublishAttempt,
    PublishRetry,
    DoneOk,
    DoneSkipped,
}

/// Why a run finished without posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Text still collided with recent history after regeneration
    DuplicateText,
    /// Publishing failed on the first attempt and the retry
    PublishFailed,
    /// Publisher refused the post with a non-retryable error
    PublishRejected,
    /// Dry-run mode, nothing was sent
    DryRun,
    /// No source data and the static fallback is disabled
    NoSourceData,
    /// Another run holds the state lock
    RunInProgress,
}

impl SkipReason {
    pub fn code(self) -> &'static str {
        match self {
            SkipReason::DuplicateText => "duplicate_text",
            SkipReason::PublishFailed => "publish_failed",
            SkipReason::PublishRejected => "publish_rejected",
            SkipReason::DryRun => "dry_run",
            SkipReason::NoSourceData => "no_source_data",
            SkipReason::RunInProgress => "run_in_progress",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    DoneOk,
    DoneSkipped,
}

/// Audit record of a single run, printed as one JSON line
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    /// Whether a publish call was made
    pub attempted: bool,
    /// Whether a post went out
    pub posted: bool,
    /// Skip code when nothing was posted
    pub reason: Option<SkipReason>,
    pub section: Option<Section>,
    pub provenance: Option<Provenance>,
    /// Identity of the chosen project
    pub project: Option<String>,
    /// Fingerprint of the final text
    pub fingerprint: Option<String>,
    pub publish_attempts: u8,
    pub generations: u8,
    pub post_id: Option<String>,
    pub stages: Vec<RunStage>,
    /// Final text, kept out of the summary line
    #[serde(skip)]
    pub text: Option<String>,
}

impl RunReport {
    pub fn new(section: Section) -> Self {
        Self {
            status: RunStatus::DoneSkipped,
            attempted: false,
            posted: false,
            reason: None,
            section: Some(section),
            provenance: None,
            project: None,
            fingerprint: None,
            publish_attempts: 0,
            generations: 0,
            post_id: None,
            stages: vec![RunStage::Init],
            text: None,
        }
    }

    /// Report for a run that never got to load state
    pub fn not_started(reason: SkipReason) -> Self {
        Self {
            section: None,
            reason: Some(reason),
            stages: vec![RunStage::Init, RunStage::DoneSkipped],
            ..Self::new(Section::New)
        }
    }

    pub fn enter(&mut self, stage: RunStage) {
        tracing::debug!(stage = ?stage, "Run stage");
        self.stages.push(stage);
    }

    pub fn skip(&mut self, reason: SkipReason) {
        self.reason = Some(reason);
        self.status = RunStatus::DoneSkipped;
        self.enter(RunStage::DoneSkipped);
    }

    pub fn complete(&mut self, post_id: String) {
        self.posted = true;
        self.reason = None;
        self.post_id = Some(post_id);
        self.status = RunStatus::DoneOk;
        self.enter(RunStage::DoneOk);
    }

    /// Single machine-parseable line
    pub fn summary_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"status\":\"summary_error\",\"attempted\":{},\"posted\":{},\"error\":\"{}\"}}",
                self.attempted, self.posted, e
            )
        })
    }
}
