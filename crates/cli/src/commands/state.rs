//! State command - inspect the run state document

use anyhow::{Context, Result};
use crypto_scout_adapters::state::FileStateStore;
use crypto_scout_domain::RunState;
use std::path::PathBuf;

use crate::args::{StateArgs, StateCommands};
use crate::config::AppConfig;

pub async fn execute(args: StateArgs, config_path: Option<PathBuf>) -> Result<()> {
    match args.command {
        StateCommands::Show { state, json } => {
            let config = AppConfig::load(config_path.as_deref())?;
            let path = state.unwrap_or_else(|| config.general.state_path.clone());
            show(path, json).await
        }
    }
}

async fn show(path: PathBuf, json: bool) -> Result<()> {
    let store = FileStateStore::new(&path);

    // A run would silently reset an unreadable document; surface it here
    let state = store.inspect().await.with_context(|| {
        format!(
            "State file {} is unreadable; the next run will start from empty state",
            path.display()
        )
    })?;

    let Some(state) = state else {
        if json {
            println!("{}", serde_json::to_string_pretty(&RunState::default())?);
        } else {
            println!("No state file at {}", path.display());
        }
        return Ok(());
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&state).context("Failed to serialize state")?
        );
        return Ok(());
    }

    println!("State: {}", path.display());
    println!();
    println!("Seen projects ({}):", state.seen_projects.len());
    for (project, date) in &state.seen_projects {
        println!("  {}  {}", date, project);
    }
    println!();
    println!("Seen texts ({}):", state.seen_texts.len());
    for (fp, date) in &state.seen_texts {
        println!("  {}  {}", date, fp);
    }
    if let Some(date) = state.last_reply_date {
        println!();
        println!("Last reply date: {}", date);
    }

    Ok(())
}
