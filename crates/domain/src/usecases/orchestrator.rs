//! Run orchestrator: one scheduled run from source fetch to saved state

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::Date;

use crate::{
    dedup::{fingerprint, is_duplicate},
    model::{
        DraftRequest, OutboundPost, Project, Provenance, RunReport, RunStage, RunState, Section,
        SkipReason,
    },
    policy::PostFormat,
    ports::{
        Clock, DraftGenerator, ProjectSource, PublishError, PublishResult, Publisher,
        RandomSource, StateError, StateStore, UrlResolver,
    },
    schedule::SectionSchedule,
    selection::{DEFAULT_POOL_SIZE, dedupe_candidates, filter_fresh, staleness_pool},
    usecases::draft::{DraftConfig, DraftUseCase},
};

/// Generator calls allowed in a single run
const MAX_GENERATIONS: u8 = 2;

/// Announcement posted when every source comes back empty
pub const DEFAULT_FALLBACK_TEXT: &str =
    "No clean data pulled today. Skipping research post to avoid noise.";

/// Configuration for a run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Days before a posted project may be picked again
    pub project_cooldown_days: u32,
    /// Days before identical text may be posted again
    pub text_cooldown_days: u32,
    /// Size of the staleness-ranked pool
    pub fallback_pool_size: usize,
    /// Static announcement for empty sources; empty disables it
    pub fallback_text: String,
    /// Dry run mode (don't actually publish)
    pub dry_run: bool,
    /// Upper bound on each source, resolver and publish call
    pub call_timeout: Duration,
    /// Wait before the publish retry when no rate-limit hint is given
    pub retry_backoff: Duration,
    /// Cap on any backoff, including server hints
    pub max_backoff: Duration,
    /// Card image attached to some posts
    pub card_path: Option<PathBuf>,
    /// Chance of attaching the card, in `[0, 1]`
    pub attach_probability: f64,
    pub schedule: SectionSchedule,
    pub format: PostFormat,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            project_cooldown_days: 7,
            text_cooldown_days: 14,
            fallback_pool_size: DEFAULT_POOL_SIZE,
            fallback_text: DEFAULT_FALLBACK_TEXT.to_string(),
            dry_run: true,
            call_timeout: Duration::from_secs(45),
            retry_backoff: Duration::from_secs(15),
            max_backoff: Duration::from_secs(900),
            card_path: None,
            attach_probability: 0.25,
            schedule: SectionSchedule::default(),
            format: PostFormat::default(),
        }
    }
}

/// External collaborators, built once at process start
#[derive(Clone)]
pub struct RunDeps {
    pub sources: Vec<Arc<dyn ProjectSource>>,
    pub resolver: Arc<dyn UrlResolver>,
    pub generator: Arc<dyn DraftGenerator>,
    pub publisher: Arc<dyn Publisher>,
    pub state_store: Arc<dyn StateStore>,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
}

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The run finished but its state could not be saved; the report still
    /// describes what happened, including any post that went out
    #[error("State error: {source}")]
    State {
        report: Box<RunReport>,
        source: StateError,
    },
}

impl RunError {
    /// Report of the run that failed
    pub fn report(&self) -> &RunReport {
        match self {
            RunError::State { report, .. } => report,
        }
    }
}

/// Run orchestrator
pub struct RunOrchestrator {
    deps: RunDeps,
    drafts: DraftUseCase<dyn DraftGenerator>,
    config: RunConfig,
}

impl RunOrchestrator {
    pub fn new(deps: RunDeps, config: RunConfig) -> Self {
        let drafts = DraftUseCase::new(
            Arc::clone(&deps.generator),
            DraftConfig {
                format: config.format.clone(),
                timeout: config.call_timeout,
            },
        );
        Self {
            deps,
            drafts,
            config,
        }
    }

    /// Run the section scheduled for the current UTC hour
    pub async fn run_once(&self) -> Result<RunReport, RunError> {
        let section = self.config.schedule.section_for(self.deps.clock.now().hour());
        self.run_section(section).await
    }

    /// Run a specific section
    ///
    /// State is loaded once and saved exactly once, whatever the outcome.
    pub async fn run_section(&self, section: Section) -> Result<RunReport, RunError> {
        let today = self.deps.clock.now().date();
        let mut state = self.deps.state_store.load().await;
        let mut report = RunReport::new(section);

        tracing::info!(
            section = %section,
            seen_projects = state.seen_projects.len(),
            seen_texts = state.seen_texts.len(),
            dry_run = self.config.dry_run,
            "Starting run"
        );

        self.drive(section, today, &mut state, &mut report).await;

        if let Err(source) = self.deps.state_store.save(&state).await {
            tracing::error!(
                error = %source,
                posted = report.posted,
                "Failed to save run state"
            );
            return Err(RunError::State {
                report: Box::new(report),
                source,
            });
        }

        tracing::info!(
            status = ?report.status,
            posted = report.posted,
            reason = ?report.reason,
            provenance = ?report.provenance,
            "Run finished"
        );

        Ok(report)
    }

    async fn drive(
        &self,
        section: Section,
        today: Date,
        state: &mut RunState,
        report: &mut RunReport,
    ) {
        let candidates = self.load_candidates(section).await;
        report.enter(RunStage::SourceLoaded);

        if candidates.is_empty() {
            report.enter(RunStage::NoSourceData);
            self.post_static_fallback(today, state, report).await;
            return;
        }
        report.enter(RunStage::HasCandidates);

        let (candidate, provenance) = self.pick(candidates, state, today, report);
        report.provenance = Some(provenance);
        report.project = Some(candidate.identity());

        tracing::info!(
            project = %candidate.name,
            url = %candidate.url,
            provenance = ?provenance,
            "Selected project"
        );

        let request = DraftRequest {
            project: Project {
                url: self.resolve(&candidate.url).await,
                ..candidate.clone()
            },
            section,
        };

        let mut draft = self.drafts.generate_or_fallback(&request).await;
        report.generations += 1;
        report.enter(RunStage::Drafted);

        if self.is_duplicate(&draft.text, state, today) {
            report.enter(RunStage::DuplicateRetry);
            tracing::info!("Draft collides with recent text, regenerating");

            report.generations += 1;
            match self.drafts.generate(&request).await {
                Ok(fresh) => draft = fresh,
                Err(e) => tracing::warn!(error = %e, "Regeneration failed, keeping draft"),
            }
            report.enter(RunStage::Drafted);

            if self.is_duplicate(&draft.text, state, today) {
                record_text(report, &draft.text);
                tracing::info!("Draft still duplicate after regeneration, skipping");
                report.skip(SkipReason::DuplicateText);
                return;
            }
        }

        report.enter(RunStage::FormatOk);
        record_text(report, &draft.text);

        if self.config.dry_run {
            tracing::info!(text = %draft.text, "[DRY RUN] Would publish");
            report.skip(SkipReason::DryRun);
            return;
        }

        let post = draft.into_post(self.pick_card());

        if let Some((published, post)) = self
            .publish_with_retry(post, Some(&request), state, today, report)
            .await
        {
            state.remember_project(&candidate, today);
            state.remember_text(&fingerprint(&post.text), today);
            record_text(report, &post.text);
            report.complete(published.id);
        }
    }

    /// Fetch every source serving the section, in order
    async fn load_candidates(&self, section: Section) -> Vec<Project> {
        let mut raw = Vec::new();

        for source in self.deps.sources.iter().filter(|s| s.serves(section)) {
            match tokio::time::timeout(self.config.call_timeout, source.fetch_projects(section))
                .await
            {
                Ok(projects) => {
                    tracing::info!(
                        source = source.name(),
                        count = projects.len(),
                        "Fetched candidates"
                    );
                    raw.extend(projects);
                }
                Err(_) => {
                    tracing::warn!(source = source.name(), "Source fetch timed out");
                }
            }
        }

        dedupe_candidates(raw)
    }

    /// Draw one project from the fresh set, or from the staleness pool
    fn pick(
        &self,
        candidates: Vec<Project>,
        state: &RunState,
        today: Date,
        report: &mut RunReport,
    ) -> (Project, Provenance) {
        let seen = &state.seen_projects;
        let fresh = filter_fresh(&candidates, seen, self.config.project_cooldown_days, today);

        let (mut pool, provenance) = if fresh.is_empty() {
            report.enter(RunStage::NoFreshCandidates);
            tracing::info!(
                candidates = candidates.len(),
                "No fresh candidates, drawing from staleness pool"
            );
            (
                staleness_pool(&candidates, seen, today, self.config.fallback_pool_size),
                Provenance::StalenessFallback,
            )
        } else {
            report.enter(RunStage::FreshSelected);
            (fresh, Provenance::Fresh)
        };

        // Non-empty: candidates is non-empty and the pool keeps at least one
        let index = self.deps.random.index(pool.len()).min(pool.len() - 1);
        (pool.swap_remove(index), provenance)
    }

    async fn resolve(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        match tokio::time::timeout(self.config.call_timeout, self.deps.resolver.resolve(raw)).await
        {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            Ok(_) => raw.to_string(),
            Err(_) => {
                tracing::warn!(url = %raw, "URL resolution timed out, keeping raw URL");
                raw.to_string()
            }
        }
    }

    fn is_duplicate(&self, text: &str, state: &RunState, today: Date) -> bool {
        is_duplicate(text, &state.seen_texts, self.config.text_cooldown_days, today)
    }

    fn pick_card(&self) -> Option<PathBuf> {
        let path = self.config.card_path.as_ref()?;
        if self.deps.random.unit() < self.config.attach_probability {
            Some(path.clone())
        } else {
            None
        }
    }

    async fn post_static_fallback(&self, today: Date, state: &mut RunState, report: &mut RunReport) {
        report.provenance = Some(Provenance::StaticFallback);

        let text = self.config.fallback_text.trim();
        if text.is_empty() {
            tracing::info!("No source data and no fallback text configured");
            report.skip(SkipReason::NoSourceData);
            return;
        }

        record_text(report, text);
        if self.is_duplicate(text, state, today) {
            tracing::info!("Fallback announcement posted recently, skipping");
            report.skip(SkipReason::DuplicateText);
            return;
        }

        if self.config.dry_run {
            tracing::info!(text = %text, "[DRY RUN] Would publish fallback announcement");
            report.skip(SkipReason::DryRun);
            return;
        }

        let post = OutboundPost {
            text: text.to_string(),
            image_path: None,
            caption: None,
        };

        if let Some((published, post)) = self
            .publish_with_retry(post, None, state, today, report)
            .await
        {
            state.remember_text(&fingerprint(&post.text), today);
            report.complete(published.id);
        }
    }

    /// Publish with one retry on a transient failure
    ///
    /// With a request the retry carries freshly generated text, unless the
    /// generation budget is spent or the new text is itself a duplicate.
    /// Returns `None` after marking the report as skipped.
    async fn publish_with_retry(
        &self,
        mut post: OutboundPost,
        request: Option<&DraftRequest>,
        state: &RunState,
        today: Date,
        report: &mut RunReport,
    ) -> Option<(PublishResult, OutboundPost)> {
        let error = match self.attempt(&post, report).await {
            Ok(published) => return Some((published, post)),
            Err(e) => e,
        };

        if !error.is_retryable() {
            tracing::error!(
                platform = self.deps.publisher.platform(),
                error = %error,
                "Publish rejected"
            );
            report.skip(SkipReason::PublishRejected);
            return None;
        }

        report.enter(RunStage::PublishRetry);
        let delay = self.backoff_for(&error);
        tracing::warn!(
            error = %error,
            backoff_secs = delay.as_secs(),
            "Publish failed, retrying once"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(request) = request {
            if report.generations < MAX_GENERATIONS {
                report.generations += 1;
                match self.drafts.generate(request).await {
                    Ok(fresh) if !self.is_duplicate(&fresh.text, state, today) => {
                        post.text = fresh.text;
                    }
                    Ok(_) => tracing::info!("Regenerated text is a duplicate, resending current text"),
                    Err(e) => tracing::warn!(error = %e, "Regeneration failed, resending current text"),
                }
            }
        }

        match self.attempt(&post, report).await {
            Ok(published) => Some((published, post)),
            Err(e) => {
                tracing::error!(
                    platform = self.deps.publisher.platform(),
                    error = %e,
                    "Publish retry failed"
                );
                record_text(report, &post.text);
                report.skip(SkipReason::PublishFailed);
                None
            }
        }
    }

    async fn attempt(
        &self,
        post: &OutboundPost,
        report: &mut RunReport,
    ) -> Result<PublishResult, PublishError> {
        report.enter(RunStage::PublishAttempt);
        report.attempted = true;
        report.publish_attempts += 1;

        let published =
            tokio::time::timeout(self.config.call_timeout, self.deps.publisher.publish(post))
                .await
                .map_err(|_| PublishError::Timeout)??;

        tracing::info!(
            platform = self.deps.publisher.platform(),
            id = %published.id,
            url = ?published.url,
            "Published post"
        );
        Ok(published)
    }

    fn backoff_for(&self, error: &PublishError) -> Duration {
        match error {
            PublishError::RateLimited(Some(wait)) => (*wait)
                .max(self.config.retry_backoff)
                .min(self.config.max_backoff),
            _ => self.config.retry_backoff.min(self.config.max_backoff),
        }
    }
}

fn record_text(report: &mut RunReport, text: &str) {
    report.fingerprint = Some(fingerprint(text));
    report.text = Some(text.to_string());
}
