//! Official X handle lookup from a project page

use regex::Regex;
use reqwest::Client;
use std::sync::LazyLock;

use crate::sources::fetch_text;

static RE_HANDLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:x\.com|twitter\.com)/([A-Za-z0-9_]{1,15})\b").expect("valid regex")
});

/// Path segments that look like handles but are site features
const NOT_HANDLES: [&str; 8] = [
    "share", "intent", "home", "i", "search", "hashtag", "login", "explore",
];

/// First plausible `@handle` linked from a page
pub fn find_handle(html: &str) -> Option<String> {
    RE_HANDLE
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .find(|handle| !NOT_HANDLES.contains(&handle.to_ascii_lowercase().as_str()))
        .map(|handle| format!("@{handle}"))
}

/// Fetches project pages and extracts their X handle
#[derive(Debug, Clone)]
pub struct XHandleFinder {
    client: Client,
    max_page_bytes: usize,
}

impl XHandleFinder {
    pub fn new(client: Client, max_page_bytes: usize) -> Self {
        Self {
            client,
            max_page_bytes,
        }
    }

    /// Best effort: any failure means no handle
    pub async fn lookup(&self, page_url: &str) -> Option<String> {
        if page_url.trim().is_empty() {
            return None;
        }

        match fetch_text(&self.client, page_url, self.max_page_bytes).await {
            Ok(html) => {
                let handle = find_handle(&html);
                tracing::debug!(url = %page_url, handle = ?handle, "Handle lookup");
                handle
            }
            Err(e) => {
                tracing::debug!(url = %page_url, error = %e, "Handle lookup failed");
                None
            }
        }
    }
}
