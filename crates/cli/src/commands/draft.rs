//! Draft command - one-shot generation and formatting

use anyhow::{Context, Result, bail};
use crypto_scout_adapters::{
    handle::XHandleFinder,
    llm::{OpenAiCompatGenerator, StubGenerator},
    sources::http_client,
    state::FileStateStore,
};
use crypto_scout_domain::usecases::{DraftConfig, DraftUseCase};
use crypto_scout_domain::{
    Clock, DraftGenerator, DraftRequest, Project, StateStore, SystemClock, fingerprint,
    is_duplicate,
};
use secrecy::SecretString;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::DraftArgs;
use crate::config::AppConfig;

#[derive(Debug, Serialize)]
struct DraftOutput {
    text: String,
    caption: String,
    generated: bool,
    chars: usize,
    fingerprint: String,
    duplicate: bool,
}

pub async fn execute(args: DraftArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    if args.name.trim().is_empty() {
        bail!("Project name must not be empty");
    }

    let request = DraftRequest {
        project: Project::new(args.name.trim(), args.symbol.trim(), args.url.trim()),
        section: args.section,
    };

    tracing::info!(
        project = %request.project.name,
        section = %request.section,
        provider = %config.llm.provider,
        "Drafting post"
    );

    let generator = build_generator(&config)?;
    let usecase = DraftUseCase::new(
        generator,
        DraftConfig {
            timeout: Duration::from_secs(config.general.call_timeout_secs),
            ..Default::default()
        },
    );
    let draft = usecase.generate_or_fallback(&request).await;

    // Duplicate check against the same history a run would use
    let state_path = args.state.unwrap_or_else(|| config.general.state_path.clone());
    let state = FileStateStore::new(state_path).load().await;
    let today = SystemClock.now().date();
    let duplicate = is_duplicate(
        &draft.text,
        &state.seen_texts,
        config.selection.text_cooldown_days,
        today,
    );

    let output = DraftOutput {
        chars: draft.text.chars().count(),
        fingerprint: fingerprint(&draft.text),
        text: draft.text,
        caption: draft.caption,
        generated: draft.generated,
        duplicate,
    };

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize output")?;
        println!("{}", json);
    } else {
        println!("{}", output.text);
        println!();
        println!("Caption:     {}", output.caption);
        println!("Characters:  {}", output.chars);
        println!("Fingerprint: {}", output.fingerprint);
        println!("Generated:   {}", if output.generated { "yes" } else { "no (fallback)" });
        if output.duplicate {
            println!("Duplicate:   yes, a run would regenerate or skip this text");
        } else {
            println!("Duplicate:   no");
        }
    }

    Ok(())
}

pub(crate) fn build_generator(config: &AppConfig) -> Result<Arc<dyn DraftGenerator>> {
    let llm_config = config.adapter_llm_config();

    match config.llm.provider.as_str() {
        "openai_compat" => {
            let base_url = config.llm.openai_compat.base_url.trim();
            if base_url.is_empty() {
                bail!("OpenAI-compatible base_url is required");
            }
            let api_key = load_api_key(&config.llm.openai_compat.api_key_env, "openai_compat")?;
            let mut generator =
                OpenAiCompatGenerator::new(api_key, base_url.to_string(), llm_config)
                    .context("Failed to configure OpenAI-compatible provider")?;

            if config.llm.handle_lookup {
                let client = http_client(
                    &config.sources.user_agent,
                    Duration::from_secs(config.sources.timeout_secs),
                )
                .context("Failed to build HTTP client for handle lookup")?;
                generator = generator
                    .with_handle_lookup(XHandleFinder::new(client, config.sources.max_page_bytes));
            }

            Ok(Arc::new(generator))
        }
        "stub" => Ok(Arc::new(StubGenerator::new())),
        other => bail!("Unknown LLM provider: {}", other),
    }
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for provider {}", provider);
    }

    let key = std::env::var(env_var).with_context(|| {
        format!(
            "Missing API key env var {} for provider {}",
            env_var, provider
        )
    })?;

    if key.trim().is_empty() {
        bail!(
            "API key env var {} is empty for provider {}",
            env_var,
            provider
        );
    }

    Ok(SecretString::new(key.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_generator_stub() {
        let mut config = AppConfig::default();
        config.llm.provider = "stub".to_string();

        assert!(build_generator(&config).is_ok());
    }

    #[test]
    fn test_build_generator_rejects_unknown_provider() {
        let mut config = AppConfig::default();
        config.llm.provider = "carrier_pigeon".to_string();

        let err = build_generator(&config).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn test_load_api_key_requires_env_name() {
        assert!(load_api_key("  ", "openai_compat").is_err());
        assert!(load_api_key("CRYPTO_SCOUT_TEST_SURELY_UNSET_VAR", "openai_compat").is_err());
    }
}
