//! Full runs over the in-process adapters: stub sources, stub generator,
//! stub X publisher and the in-memory state store.

use crypto_scout_adapters::llm::StubGenerator;
use crypto_scout_adapters::sources::StubSource;
use crypto_scout_adapters::state::InMemoryStateStore;
use crypto_scout_adapters::x::StubXPublisher;
use crypto_scout_domain::usecases::{RunConfig, RunDeps, RunOrchestrator};
use crypto_scout_domain::{
    Clock, PassthroughResolver, Project, PublishError, RunState, RunStatus, Section,
    SeededRandom, SkipReason, fingerprint,
};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::{date, datetime};

struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        datetime!(2024-05-10 07:30 UTC)
    }
}

struct Setup {
    generator: Arc<StubGenerator>,
    publisher: Arc<StubXPublisher>,
    store: Arc<InMemoryStateStore>,
    orchestrator: RunOrchestrator,
}

fn setup(publisher: StubXPublisher, store: InMemoryStateStore) -> Setup {
    let generator = Arc::new(StubGenerator::new());
    let publisher = Arc::new(publisher);
    let store = Arc::new(store);

    let deps = RunDeps {
        sources: vec![Arc::new(StubSource::sample())],
        resolver: Arc::new(PassthroughResolver),
        generator: generator.clone(),
        publisher: publisher.clone(),
        state_store: store.clone(),
        clock: Arc::new(FixedClock),
        random: Arc::new(SeededRandom::from_seed(7)),
    };
    let config = RunConfig {
        dry_run: false,
        retry_backoff: Duration::ZERO,
        ..Default::default()
    };

    Setup {
        generator,
        publisher,
        store,
        orchestrator: RunOrchestrator::new(deps, config),
    }
}

#[tokio::test]
async fn posted_run_records_project_and_text() {
    let s = setup(StubXPublisher::new(true), InMemoryStateStore::new());

    let report = s.orchestrator.run_section(Section::New).await.unwrap();

    assert_eq!(report.status, RunStatus::DoneOk);
    assert!(report.posted);
    assert_eq!(report.post_id.as_deref(), Some("stub_1"));

    let published = s.publisher.get_published();
    assert_eq!(published.len(), 1);
    let lines: Vec<_> = published[0].text.split('\n').collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[2].starts_with("Risk:"));

    let state = s.store.snapshot();
    assert_eq!(state.seen_projects.len(), 1);
    assert_eq!(
        state.seen_texts.get(&fingerprint(&published[0].text)),
        Some(&date!(2024 - 05 - 10))
    );
    assert_eq!(s.store.save_count(), 1);
}

#[tokio::test]
async fn two_transient_failures_leave_state_untouched() {
    let mut state = RunState::default();
    state.remember_project(
        &Project::new("Old", "", "https://x/old"),
        date!(2024 - 04 - 01),
    );
    let before = state.clone();

    let s = setup(
        StubXPublisher::failing_with(vec![
            PublishError::Api("502 Bad Gateway".to_string()),
            PublishError::Timeout,
        ]),
        InMemoryStateStore::with_state(state),
    );

    let report = s.orchestrator.run_section(Section::New).await.unwrap();

    assert_eq!(report.status, RunStatus::DoneSkipped);
    assert_eq!(report.reason, Some(SkipReason::PublishFailed));
    assert!(report.attempted);
    assert!(!report.posted);
    assert_eq!(report.publish_attempts, 2);
    // One draft plus the regeneration for the retry
    assert_eq!(s.generator.calls(), 2);

    assert!(s.publisher.get_published().is_empty());
    assert_eq!(s.store.snapshot(), before);
    assert_eq!(s.store.save_count(), 1);
}

#[tokio::test]
async fn disabled_publisher_is_a_terminal_rejection() {
    let s = setup(StubXPublisher::new(false), InMemoryStateStore::new());

    let report = s.orchestrator.run_section(Section::Trending).await.unwrap();

    assert_eq!(report.reason, Some(SkipReason::PublishRejected));
    assert_eq!(report.publish_attempts, 1);
    assert!(s.store.snapshot().is_empty());
}
