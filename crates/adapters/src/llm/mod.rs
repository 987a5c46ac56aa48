//! LLM draft generator adapters

pub mod openai_compat;
pub mod stub;

pub use openai_compat::OpenAiCompatGenerator;
pub use stub::StubGenerator;

use crypto_scout_domain::{Draft, DraftRequest};
use serde::{Deserialize, Serialize};

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// Temperature (0.0-1.0)
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on failure
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.6,
            max_output_tokens: 400,
            timeout_secs: 45,
            retries: 2,
        }
    }
}

/// Build the drafting prompt
pub fn build_draft_prompt(request: &DraftRequest, handle: Option<&str>) -> String {
    let project = &request.project;
    let mut prompt = String::new();

    prompt.push_str("You are a crypto research account on X.\n\n");
    prompt.push_str("Write ONE post about a NEW or UPCOMING project.\n");
    prompt.push_str(&format!("Source type: {}\n", request.section.label()));
    prompt.push_str(&format!("Project name: {}\n", project.name.trim()));
    prompt.push_str(&format!("Symbol (may be empty): {}\n", project.symbol.trim()));
    prompt.push_str(&format!("Source URL: {}\n", project.url.trim()));
    prompt.push_str(&format!("Official X handle (may be empty): {}\n\n", handle.unwrap_or("")));

    prompt.push_str(
        r#"Rules:
- Exactly three lines: a hook, one line of detail, then a line starting with "Risk:".
- If a handle is provided, include it EXACTLY ONCE. If it is empty, do not invent one.
- Do not include the URL; it is appended to the second line automatically.
- The risk note names one concrete risk without accusing anyone (e.g. early, unclear tokenomics, low liquidity).
- No emojis, no hashtags.
- At most 200 characters in total.

Also write a very short image caption (at most 80 characters) summarizing the key angle.

Respond with ONLY a JSON object:
{"tweet": "...", "image_caption": "..."}
"#,
    );

    prompt
}

#[derive(Deserialize)]
struct DraftResponse {
    #[serde(default)]
    tweet: String,
    #[serde(default)]
    image_caption: String,
}

/// Parse the model's JSON answer
pub fn parse_draft_response(response: &str) -> Result<Draft, String> {
    let json_str = extract_json(response);

    let parsed: DraftResponse =
        serde_json::from_str(json_str).map_err(|e| format!("Failed to parse JSON: {}", e))?;

    let text = parsed.tweet.trim();
    if text.is_empty() {
        return Err("Response has no tweet text".to_string());
    }

    Ok(Draft {
        text: text.to_string(),
        caption: parsed
            .image_caption
            .trim()
            .chars()
            .take(Draft::MAX_CAPTION_CHARS)
            .collect(),
    })
}

/// Extract JSON from response (handles markdown code blocks)
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // Check for ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim();
        }
    }

    // Check for ``` ... ``` blocks
    if let Some(start) = trimmed.find("```") {
        if let Some(end) = trimmed[start + 3..].find("```") {
            let content = trimmed[start + 3..start + 3 + end].trim();
            // Skip language identifier if present
            if let Some(newline) = content.find('\n') {
                let first_line = &content[..newline];
                if !first_line.starts_with('{') {
                    return content[newline + 1..].trim();
                }
            }
            return content;
        }
    }

    // Fall back to the outermost braces
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
