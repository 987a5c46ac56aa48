//! Text deduplication by content fingerprint

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use time::Date;

use crate::selection::is_fresh;

/// Stable hex SHA-256 of the exact post text
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Whether `text` was posted within the text cooldown window
pub fn is_duplicate(
    text: &str,
    seen_texts: &BTreeMap<String, Date>,
    cooldown_days: u32,
    today: Date,
) -> bool {
    !is_fresh(&fingerprint(text), seen_texts, cooldown_days, today)
}
