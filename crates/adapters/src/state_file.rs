//! JSON file state store

use async_trait::async_trait;
use crypto_scout_domain::{RunState, StateError, StateStore};
use std::path::{Path, PathBuf};
use tokio::fs;

/// State document stored as pretty-printed JSON
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document, reporting why it could not be used
    pub async fn inspect(&self) -> Result<Option<RunState>, StateError> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StateError::Serialization(e.to_string()))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> RunState {
        match self.inspect().await {
            Ok(Some(state)) => state,
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "No state file, starting empty");
                RunState::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file unreadable, starting empty"
                );
                RunState::default()
            }
        }
    }

    async fn save(&self, state: &RunState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut json = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        json.push('\n');

        let temp = self.temp_path();
        fs::write(&temp, json).await?;
        fs::rename(&temp, &self.path).await?;

        tracing::debug!(
            path = %self.path.display(),
            seen_projects = state.seen_projects.len(),
            seen_texts = state.seen_texts.len(),
            "Saved state"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_scout_domain::Project;
    use tempfile::TempDir;
    use time::macros::date;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("state.json"));

        assert!(store.load().await.is_empty());
        assert!(store.inspect().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileStateStore::new(&path);

        assert!(store.load().await.is_empty());
        assert!(matches!(
            store.inspect().await,
            Err(StateError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStateStore::new(dir.path().join("nested").join("state.json"));

        let mut state = RunState::default();
        state.remember_project(&Project::new("Foo", "", "https://x/foo"), date!(2024 - 05 - 01));
        state.remember_text("abc123", date!(2024 - 05 - 01));
        store.save(&state).await.unwrap();

        assert_eq!(store.load().await, state);
        assert!(!store.temp_path().exists());

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"seen_projects\""));
        assert!(raw.contains("2024-05-01"));
    }

    #[tokio::test]
    async fn test_legacy_document_with_missing_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"seen_texts": {"abc": "2024-01-02"}}"#).unwrap();

        let state = FileStateStore::new(&path).load().await;
        assert_eq!(state.seen_texts.get("abc"), Some(&date!(2024 - 01 - 02)));
        assert!(state.seen_projects.is_empty());
        assert!(state.last_reply_date.is_none());
    }
}
