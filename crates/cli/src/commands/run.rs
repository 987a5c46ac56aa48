//! Run command - select, draft, and publish one post per cycle

use anyhow::{Context, Result, bail};
use crypto_scout_adapters::{
    outbox::{OutboxPublisher, OutboxWriter},
    run_lock::{RunLock, RunLockError},
    sources::{CoinGeckoSource, CryptoRankSource, StubSource},
    state::FileStateStore,
    url_resolver::HttpUrlResolver,
    x::XPublisher,
};
use crypto_scout_domain::usecases::{RunDeps, RunOrchestrator};
use crypto_scout_domain::{
    PassthroughResolver, ProjectSource, Publisher, RandomSource, RunReport, Section,
    SeededRandom, SkipReason, SystemClock, UrlResolver,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

use crate::args::RunArgs;
use crate::commands::draft::{build_generator, load_api_key};
use crate::config::AppConfig;

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let require_approval = args.require_approval;
    let outbox_path = if require_approval {
        Some(args.outbox.clone().unwrap_or_else(default_outbox_path))
    } else {
        None
    };

    if args.outbox.is_some() && !require_approval {
        tracing::warn!("--outbox is ignored without --require-approval");
    }

    let mut dry_run = args.dry_run || config.general.dry_run;
    if require_approval && dry_run {
        tracing::info!("--require-approval overrides dry-run");
        dry_run = false;
    }

    let state_path = args
        .state
        .clone()
        .unwrap_or_else(|| config.general.state_path.clone());

    tracing::info!(
        dry_run = dry_run,
        daemon = args.daemon,
        require_approval = require_approval,
        outbox = ?outbox_path,
        state = %state_path.display(),
        section = ?args.section,
        "Starting crypto-scout run"
    );

    // Build dependencies
    let publisher = build_publisher(&config, dry_run, outbox_path).await?;
    let deps = RunDeps {
        sources: build_sources(&config)?,
        resolver: build_resolver(&config)?,
        generator: build_generator(&config)?,
        publisher,
        state_store: Arc::new(FileStateStore::new(&state_path)),
        clock: Arc::new(SystemClock),
        random: build_random(&config),
    };

    let orchestrator = RunOrchestrator::new(deps, config.run_config(dry_run)?);
    let lock_path = config.general.lock_path.clone();

    if !args.daemon {
        run_cycle(&orchestrator, &lock_path, args.section).await?;
        tracing::info!("crypto-scout run completed");
        return Ok(());
    }

    // Daemon loop: one cycle per interval until Ctrl+C
    let mut ticker = interval(Duration::from_secs(config.daemon.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = run_cycle(&orchestrator, &lock_path, args.section).await {
                    tracing::error!(error = ?e, "Run cycle failed");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }

    tracing::info!("crypto-scout daemon stopped");
    Ok(())
}

/// One locked run; prints the summary line on stdout
async fn run_cycle(
    orchestrator: &RunOrchestrator,
    lock_path: &Path,
    section: Option<Section>,
) -> Result<()> {
    let _lock = match RunLock::acquire(lock_path) {
        Ok(lock) => lock,
        Err(RunLockError::Held(path)) => {
            tracing::warn!(lock = %path.display(), "Another run is in progress, skipping");
            println!(
                "{}",
                RunReport::not_started(SkipReason::RunInProgress).summary_line()
            );
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to take run lock"),
    };

    let result = match section {
        Some(section) => orchestrator.run_section(section).await,
        None => orchestrator.run_once().await,
    };

    // The summary goes out even when state could not be saved
    let report = match &result {
        Ok(report) => report,
        Err(e) => e.report(),
    };
    println!("{}", report.summary_line());

    result.context("Run failed")?;
    Ok(())
}

fn build_sources(config: &AppConfig) -> Result<Vec<Arc<dyn ProjectSource>>> {
    match config.sources.provider.as_str() {
        "live" => {
            let settings = config.source_settings();
            let coingecko = CoinGeckoSource::new(settings.clone())
                .context("Failed to configure CoinGecko source")?;
            let cryptorank =
                CryptoRankSource::new(settings).context("Failed to configure CryptoRank source")?;
            Ok(vec![Arc::new(coingecko), Arc::new(cryptorank)])
        }
        "stub" => Ok(vec![Arc::new(StubSource::sample())]),
        other => bail!("Unknown sources provider: {}", other),
    }
}

fn build_resolver(config: &AppConfig) -> Result<Arc<dyn UrlResolver>> {
    if config.sources.provider != "live" || !config.sources.resolve_urls {
        return Ok(Arc::new(PassthroughResolver));
    }

    let resolver = HttpUrlResolver::new(
        &config.sources.user_agent,
        Duration::from_secs(config.sources.timeout_secs),
    )
    .context("Failed to build URL resolver")?;
    Ok(Arc::new(resolver))
}

fn build_random(config: &AppConfig) -> Arc<dyn RandomSource> {
    match config.general.seed {
        Some(seed) => Arc::new(SeededRandom::from_seed(seed)),
        None => Arc::new(SeededRandom::from_os()),
    }
}

async fn build_publisher(
    config: &AppConfig,
    dry_run: bool,
    outbox_path: Option<PathBuf>,
) -> Result<Arc<dyn Publisher>> {
    if let Some(outbox_path) = outbox_path {
        let writer = OutboxWriter::new(outbox_path.clone())
            .await
            .context("Failed to initialize outbox writer")?;

        tracing::info!(
            outbox = %outbox_path.display(),
            "Writing approvals to outbox"
        );

        return Ok(Arc::new(OutboxPublisher::new(writer, "x")));
    }

    if dry_run {
        return Ok(Arc::new(XPublisher::disabled()));
    }

    if !config.x.enabled {
        tracing::warn!("Live run with X publishing disabled; posts will be rejected");
        return Ok(Arc::new(XPublisher::disabled()));
    }

    let user_token = load_api_key(&config.x.oauth2_user_token_env, "x")?;
    let publisher = XPublisher::with_base_url(
        user_token,
        config.x.base_url.clone(),
        config.x.max_chars,
        true,
    )
    .context("Failed to configure X publisher")?;
    Ok(Arc::new(publisher))
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}
