//! Post format constraints
//!
//! Every outgoing post has exactly three lines: a hook, a link line ending
//! in the project URL, and a risk line starting with the risk marker. The
//! whole post fits in [`MAX_POST_CHARS`] characters.

use regex::Regex;
use std::sync::LazyLock;

/// Scheme-less link such as `cryptorank.io/price/foo`
static BARE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+(\.[\w-]+)*\.[a-z]{2,}/\S*").expect("valid regex"));

/// Hard character budget for a post
pub const MAX_POST_CHARS: usize = 240;

/// Prefix of the third line
pub const RISK_MARKER: &str = "Risk:";

const FOLLOW_LINE: &str = "Follow for more early-stage project research.";
const RISK_DISCLAIMER: &str = "early-stage project, thin liquidity and unverified data. DYOR.";
const ELLIPSIS: &str = "...";

/// Format configuration
#[derive(Debug, Clone)]
pub struct PostFormat {
    /// Maximum characters (Unicode scalar values) in the joined post
    pub max_chars: usize,
    /// Required prefix of line 3
    pub risk_marker: String,
    /// Placeholder for a missing line 1 or 2
    pub follow_line: String,
    /// Body of the synthesized risk line
    pub risk_disclaimer: String,
}

impl Default for PostFormat {
    fn default() -> Self {
        Self {
            max_chars: MAX_POST_CHARS,
            risk_marker: RISK_MARKER.to_string(),
            follow_line: FOLLOW_LINE.to_string(),
            risk_disclaimer: RISK_DISCLAIMER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Prose,
    RiskBody,
    Headline,
}

#[derive(Debug)]
struct Parts<'a> {
    headline: String,
    prose: String,
    url: &'a str,
    marker: &'a str,
    risk_body: String,
}

impl Parts<'_> {
    fn link_line(&self) -> String {
        match (self.prose.is_empty(), self.url.is_empty()) {
            (false, false) => format!("{} {}", self.prose, self.url),
            (true, false) => self.url.to_string(),
            _ => self.prose.clone(),
        }
    }

    fn risk_line(&self) -> String {
        if self.risk_body.is_empty() {
            self.marker.to_string()
        } else {
            format!("{} {}", self.marker, self.risk_body)
        }
    }

    fn render(&self) -> String {
        format!("{}\n{}\n{}", self.headline, self.link_line(), self.risk_line())
    }
}

impl PostFormat {
    /// Normalize a draft into the three-line shape
    ///
    /// Pure: the same draft and URL always give the same post. The first
    /// line carrying the risk marker becomes line 3 wherever it appears;
    /// without one, the third line is taken as the risk note.
    pub fn enforce(&self, draft: &str, canonical_url: &str) -> String {
        let url = canonical_url.trim();

        let lines: Vec<String> = draft
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(strip_urls)
            .collect();

        let risk_index = lines
            .iter()
            .position(|line| self.has_marker(line))
            .or_else(|| (lines.len() > 2).then_some(2));

        let mut body = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != risk_index)
            .map(|(_, line)| line);

        let headline = body
            .next()
            .filter(|line| !line.is_empty())
            .cloned()
            .unwrap_or_else(|| self.follow_line.clone());
        let prose = body
            .next()
            .filter(|line| !line.is_empty())
            .cloned()
            .unwrap_or_else(|| self.follow_line.clone());
        let risk_body = risk_index
            .map(|i| self.risk_body_of(&lines[i]))
            .filter(|body| !body.is_empty())
            .unwrap_or_else(|| self.risk_disclaimer.clone());

        self.fit(Parts {
            headline,
            prose,
            url,
            marker: &self.risk_marker,
            risk_body,
        })
    }

    fn has_marker(&self, line: &str) -> bool {
        line.get(..self.risk_marker.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(&self.risk_marker))
    }

    /// Text after the risk marker, accepting any casing of the marker
    fn risk_body_of(&self, line: &str) -> String {
        if self.has_marker(line) {
            line[self.risk_marker.len()..].trim().to_string()
        } else {
            line.to_string()
        }
    }

    /// Shrink prose until the post fits; the risk marker is never cut
    fn fit(&self, mut parts: Parts<'_>) -> String {
        let url_present = !parts.url.is_empty();

        for slot in [Slot::Prose, Slot::RiskBody, Slot::Headline] {
            let overflow = char_len(&parts.render()).saturating_sub(self.max_chars);
            if overflow == 0 {
                break;
            }

            let (text, floor) = match slot {
                Slot::Prose => (&mut parts.prose, if url_present { 0 } else { 1 }),
                Slot::RiskBody => (&mut parts.risk_body, 0),
                Slot::Headline => (&mut parts.headline, 1),
            };
            let keep = char_len(text).saturating_sub(overflow).max(floor);
            *text = shorten(text, keep);
        }

        let rendered = parts.render();
        if char_len(&rendered) <= self.max_chars {
            return rendered;
        }

        // Only reachable when the URL alone exceeds the budget; the link
        // line is cut and the risk line kept
        tracing::warn!(url = %parts.url, "URL does not fit the post budget");
        let risk_line = parts.risk_line();
        let room = self
            .max_chars
            .saturating_sub(char_len(&parts.headline) + char_len(&risk_line) + 2)
            .max(1);
        let link_line: String = parts.link_line().chars().take(room).collect();
        format!("{}\n{}\n{}", parts.headline, link_line, risk_line)
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Remove URL-like tokens and collapse whitespace
fn strip_urls(line: &str) -> String {
    line.split_whitespace()
        .filter(|token| !is_url_like(token))
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_url_like(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    let bare = lower.trim_start_matches(['(', '[', '<', '"', '\'']);
    lower.contains("://") || bare.starts_with("www.") || BARE_LINK.is_match(bare)
}

/// Cut to at most `keep` characters at a word boundary, marking the cut
fn shorten(text: &str, keep: usize) -> String {
    if char_len(text) <= keep {
        return text.to_string();
    }
    if keep == 0 {
        return String::new();
    }
    if keep <= ELLIPSIS.len() {
        return text.chars().take(keep).collect();
    }

    let head: String = text.chars().take(keep - ELLIPSIS.len()).collect();
    let cut = match head.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => head[..idx].trim_end(),
        _ => head.trim_end(),
    };
    format!("{cut}{ELLIPSIS}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariants(post: &str, url: &str) {
        let lines: Vec<_> = post.split('\n').collect();
        assert_eq!(lines.len(), 3, "not three lines: {post:?}");
        assert!(lines.iter().all(|l| !l.trim().is_empty()), "empty line: {post:?}");
        assert!(lines[1].ends_with(url), "link line: {:?}", lines[1]);
        assert_eq!(post.matches(url).count(), 1, "url repeated: {post:?}");
        let host_and_path = url.split_once("://").map_or(url, |(_, rest)| rest);
        assert_eq!(
            post.matches(host_and_path).count(),
            1,
            "link repeated without scheme: {post:?}"
        );
        assert!(lines[2].starts_with(RISK_MARKER), "risk line: {:?}", lines[2]);
        assert!(post.chars().count() <= MAX_POST_CHARS, "too long: {}", post.chars().count());
    }

    #[test]
    fn test_single_line_draft_is_completed() {
        let format = PostFormat::default();
        let post = format.enforce("Line one only", "https://x/y");

        assert_eq!(
            post,
            "Line one only\n\
             Follow for more early-stage project research. https://x/y\n\
             Risk: early-stage project, thin liquidity and unverified data. DYOR."
        );
        assert_invariants(&post, "https://x/y");
    }

    #[test]
    fn test_empty_draft() {
        let post = PostFormat::default().enforce("", "https://x/y");
        assert_invariants(&post, "https://x/y");
        assert!(post.starts_with(FOLLOW_LINE));
    }

    #[test]
    fn test_extra_lines_are_dropped() {
        let draft = "one\ntwo\nRisk: three\nfour\nfive";
        let post = PostFormat::default().enforce(draft, "https://x/y");

        assert_eq!(post, "one\ntwo https://x/y\nRisk: three");
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let draft = "\n\nHook line\n\n   \nDetails here\n\nRisk: low float\n";
        let post = PostFormat::default().enforce(draft, "https://x/y");

        assert_eq!(post, "Hook line\nDetails here https://x/y\nRisk: low float");
    }

    #[test]
    fn test_existing_urls_are_not_duplicated() {
        let draft = "Foo lists today https://x/y\nSee (https://other.io/foo) and www.foo.io\nrisk: early";
        let post = PostFormat::default().enforce(draft, "https://x/y");

        assert_eq!(post, "Foo lists today\nSee and https://x/y\nRisk: early");
        assert_invariants(&post, "https://x/y");
    }

    #[test]
    fn test_scheme_less_links_are_stripped() {
        let url = "https://cryptorank.io/price/foo";
        let draft = "Foo opens its sale\nDetails at cryptorank.io/price/foo\nRisk: early";
        let post = PostFormat::default().enforce(draft, url);

        assert_eq!(post, format!("Foo opens its sale\nDetails at {url}\nRisk: early"));
        assert_invariants(&post, url);
    }

    #[test]
    fn test_ratings_and_handles_are_not_links() {
        let draft = "Rated 7.5/10 by @foo_io\nand/or more\nRisk: x";
        let post = PostFormat::default().enforce(draft, "https://x/y");
        assert_eq!(post, "Rated 7.5/10 by @foo_io\nand/or more https://x/y\nRisk: x");
    }

    #[test]
    fn test_risk_line_is_found_anywhere() {
        let post = PostFormat::default().enforce("Hook\nRisk: early", "https://x/y");
        assert_eq!(post, format!("Hook\n{FOLLOW_LINE} https://x/y\nRisk: early"));

        let draft = "risk: thin float\nHook\nDetails";
        let post = PostFormat::default().enforce(draft, "https://x/y");
        assert_eq!(post, "Hook\nDetails https://x/y\nRisk: thin float");
    }

    #[test]
    fn test_oversized_url_keeps_risk_line() {
        let url = format!("https://example.com/{}", "a".repeat(300));
        let post = PostFormat::default().enforce("Hook\nDetails\nRisk: early", &url);

        let lines: Vec<_> = post.split('\n').collect();
        assert_eq!(lines.len(), 3, "not three lines: {post:?}");
        assert!(lines[1].starts_with("https://example.com/"));
        assert!(lines[2].starts_with(RISK_MARKER));
        assert!(post.chars().count() <= MAX_POST_CHARS);
    }

    #[test]
    fn test_url_only_line_gets_placeholder() {
        let draft = "Foo launched\nhttps://x/y\nRisk: unclear tokenomics";
        let post = PostFormat::default().enforce(draft, "https://x/y");

        assert_eq!(
            post,
            format!("Foo launched\n{FOLLOW_LINE} https://x/y\nRisk: unclear tokenomics")
        );
    }

    #[test]
    fn test_risk_marker_is_prepended() {
        let post = PostFormat::default().enforce("a\nb\nlow liquidity", "https://x/y");
        assert!(post.ends_with("\nRisk: low liquidity"));
    }

    #[test]
    fn test_bare_risk_marker_gets_disclaimer() {
        let post = PostFormat::default().enforce("a\nb\nRISK:", "https://x/y");
        assert!(post.ends_with(&format!("\nRisk: {RISK_DISCLAIMER}")));
    }

    #[test]
    fn test_long_draft_is_fitted_without_cutting_url() {
        let long = "word ".repeat(80);
        let draft = format!("{long}\n{long}\nRisk: {long}\n{long}\n{long}");
        let url = "https://www.coingecko.com/en/coins/some-very-long-project-slug";
        let post = PostFormat::default().enforce(&draft, url);

        assert_invariants(&post, url);
    }

    #[test]
    fn test_multibyte_text_is_cut_on_char_boundaries() {
        let rocket = "🚀".repeat(300);
        let draft = format!("{rocket}\n{rocket}\n{rocket}");
        let post = PostFormat::default().enforce(&draft, "https://x/y");

        assert_invariants(&post, "https://x/y");
    }

    #[test]
    fn test_enforce_is_deterministic() {
        let format = PostFormat::default();
        let draft = "Alpha\nBeta https://a.b\nGamma";
        assert_eq!(format.enforce(draft, "https://x/y"), format.enforce(draft, "https://x/y"));
    }

    #[test]
    fn test_invariants_over_varied_drafts() {
        let format = PostFormat::default();
        let url = "https://x/y";
        let drafts = [
            "",
            "\n\n\n",
            "one",
            "one\ntwo",
            "one\ntwo\nthree\nfour\nfive",
            "https://x/y",
            "https://x/y\nhttps://x/y\nhttps://x/y",
            "Already has https://x/y twice https://x/y",
            "risk: everything\nRisk: twice\nrisk: thrice",
        ];
        for draft in drafts {
            assert_invariants(&format.enforce(draft, url), url);
        }
    }

    #[test]
    fn test_shorten_respects_word_boundary() {
        assert_eq!(shorten("alpha beta gamma", 12), "alpha...");
        assert_eq!(shorten("alpha", 10), "alpha");
        assert_eq!(shorten("alphabet", 2), "al");
        assert_eq!(shorten("alphabet", 0), "");
    }
}
