//! Doctor command - validate configuration and show status

use anyhow::Result;
use crypto_scout_adapters::state::FileStateStore;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::args::DoctorArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    state: CheckResult,
    sources: CheckResult,
    llm: CheckResult,
    x: CheckResult,
    media: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        state: CheckResult::error("Not checked"),
        sources: CheckResult::error("Not checked"),
        llm: CheckResult::error("Not checked"),
        x: CheckResult::error("Not checked"),
        media: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    // Check config
    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = check_config(&c);
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.state = check_state(&config.general.state_path).await;
        report.sources = check_sources(config);
        report.llm = check_llm(config);
        report.x = check_x(config);
        report.media = check_media(config);
    }

    // Determine overall status
    let checks = [
        &report.config,
        &report.state,
        &report.sources,
        &report.llm,
        &report.x,
        &report.media,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    // Output report
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_config(config: &AppConfig) -> CheckResult {
    match config.run_config(config.general.dry_run) {
        Ok(run) => CheckResult::ok(format!(
            "Configuration loaded (dry_run: {}, cooldowns: {}d projects / {}d texts)",
            run.dry_run, run.project_cooldown_days, run.text_cooldown_days
        )),
        Err(e) => CheckResult::error(format!("Invalid configuration: {:#}", e)),
    }
}

async fn check_state(path: &Path) -> CheckResult {
    match FileStateStore::new(path).inspect().await {
        Ok(Some(state)) => CheckResult::ok(format!(
            "{} seen projects, {} seen texts",
            state.seen_projects.len(),
            state.seen_texts.len()
        ))
        .with_details(serde_json::json!({ "path": path.display().to_string() })),
        Ok(None) => CheckResult::ok(format!(
            "No state file yet at {} (created on first run)",
            path.display()
        )),
        Err(e) => CheckResult::warn(format!(
            "State file {} is unreadable and will be reset: {}",
            path.display(),
            e
        )),
    }
}

fn check_sources(config: &AppConfig) -> CheckResult {
    match config.sources.provider.as_str() {
        "live" => CheckResult::ok("Provider: live (CoinGecko, CryptoRank)").with_details(
            serde_json::json!({
                "coingecko_api_base": config.sources.coingecko_api_base,
                "cryptorank_base": config.sources.cryptorank_base,
                "resolve_urls": config.sources.resolve_urls,
            }),
        ),
        "stub" => CheckResult::warn("Provider: stub (fixed fixtures)"),
        other => CheckResult::error(format!("Unknown sources provider: {}", other)),
    }
}

fn check_llm(config: &AppConfig) -> CheckResult {
    let provider = &config.llm.provider;
    let model = &config.llm.model;

    // Check if API key env var is set (without revealing the value)
    let api_key_env = match provider.as_str() {
        "stub" => return CheckResult::ok("Provider: stub (offline)".to_string()),
        "openai_compat" => &config.llm.openai_compat.api_key_env,
        other => return CheckResult::error(format!("Unknown provider: {}", other)),
    };

    if config.llm.openai_compat.base_url.trim().is_empty() {
        return CheckResult::error("OpenAI-compatible base_url is empty");
    }

    if api_key_env.is_empty() {
        return CheckResult::error(format!("No API key env var configured for {}", provider));
    }

    match std::env::var(api_key_env) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "Provider: {}, Model: {}, API key: {} (set)",
            provider, model, api_key_env
        )),
        _ => CheckResult::warn(format!(
            "Provider: {}, Model: {}, API key: {} (not set, drafts will use fallback text)",
            provider, model, api_key_env
        )),
    }
}

fn check_x(config: &AppConfig) -> CheckResult {
    if !config.x.enabled {
        return CheckResult::ok("X publishing disabled");
    }

    let env_var = &config.x.oauth2_user_token_env;

    if env_var.is_empty() {
        return CheckResult::error("No user token env var configured");
    }

    match std::env::var(env_var) {
        Ok(val) if !val.is_empty() => CheckResult::ok(format!(
            "User token: {} (set), max chars: {}",
            env_var, config.x.max_chars
        )),
        _ => CheckResult::warn(format!("User token: {} (not set)", env_var)),
    }
}

fn check_media(config: &AppConfig) -> CheckResult {
    match &config.media.card_path {
        None => CheckResult::ok("No card image configured"),
        Some(path) if path.is_file() => CheckResult::ok(format!(
            "Card: {} (attached with probability {})",
            path.display(),
            config.media.attach_probability
        )),
        Some(path) => CheckResult::warn(format!(
            "Card image not found: {} (posts go out text-only)",
            path.display()
        )),
    }
}

fn print_report(report: &DoctorReport) {
    println!("crypto-scout Doctor Report");
    println!("==========================");
    println!();

    print_check("Config", &report.config);
    print_check("State", &report.state);
    print_check("Sources", &report.sources);
    print_check("LLM Provider", &report.llm);
    print_check("X", &report.x);
    print_check("Media", &report.media);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: crypto-scout run --dry-run");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
