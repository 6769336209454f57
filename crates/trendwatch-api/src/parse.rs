// Trending page parsing - regexes over the listing markup, no DOM needed
//
// The page is a stack of `<article class="Box-row">` blocks. Each block gives
// us the repo link in an h2, an optional description paragraph, an optional
// language badge, star/fork links and a "N stars today" counter.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

static RE_ARTICLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<article\b[^>]*class="[^"]*\bBox-row\b[^"]*"[^>]*>(.*?)</article>"#)
        .expect("article regex")
});
static RE_REPO_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<h[12]\b[^>]*>.*?<a\b[^>]*href="/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)/?"#)
        .expect("repo link regex")
});
static RE_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)</h[12]>\s*<p\b[^>]*>(.*?)</p>").expect("description regex"));
static RE_LANGUAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<span\b[^>]*itemprop="programmingLanguage"[^>]*>(.*?)</span>"#)
        .expect("language regex")
});
static RE_STARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*href="[^"]*/stargazers/?"[^>]*>(.*?)</a>"#).expect("stars regex")
});
static RE_FORKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*href="[^"]*/(?:forks|network/members)/?"[^>]*>(.*?)</a>"#)
        .expect("forks regex")
});
static RE_GAINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\d][\d,.]*\s*[kmb]?)\s+stars?\s+(?:today|this\s+week|this\s+month)")
        .expect("gained regex")
});
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// One entry lifted off the trending page
///
/// Only the owner/name pair is mandatory; everything else is whatever the
/// markup happened to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingEntry {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stars: Option<u64>,
    pub forks: Option<u64>,
    pub stars_gained: Option<u64>,
}

impl TrendingEntry {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// What the page turned out to contain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPage {
    /// Entries in display order
    Entries(Vec<TrendingEntry>),
    /// The page explicitly says nothing is trending right now
    NothingTrending,
    /// No entries and no empty-state marker either - markup we don't recognise
    Unrecognized,
}

/// Parse a full trending page into entries, in display order
pub fn parse_trending_page(html: &str) -> ParsedPage {
    let mut entries = Vec::new();
    let mut blocks = 0usize;

    for caps in RE_ARTICLE.captures_iter(html) {
        blocks += 1;
        let block = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        match parse_article(block) {
            Some(entry) => entries.push(entry),
            None => debug!("Dropping trending block #{} without a repo link", blocks),
        }
    }

    if blocks > 0 {
        if entries.len() < blocks {
            warn!(
                "Parsed {} of {} trending blocks; the rest had no identity",
                entries.len(),
                blocks
            );
        }
        return ParsedPage::Entries(entries);
    }

    if html.contains("blankslate") {
        ParsedPage::NothingTrending
    } else {
        ParsedPage::Unrecognized
    }
}

/// Parse a single article body; `None` when the repo identity is missing
pub fn parse_article(block: &str) -> Option<TrendingEntry> {
    let link = RE_REPO_LINK.captures(block)?;
    let owner = link.get(1)?.as_str().to_string();
    let name = link.get(2)?.as_str().to_string();

    let description = capture_text(&RE_DESCRIPTION, block);
    let language = capture_text(&RE_LANGUAGE, block);
    let stars = capture_text(&RE_STARS, block).and_then(|t| parse_count(&t));
    let forks = capture_text(&RE_FORKS, block).and_then(|t| parse_count(&t));

    // The counter sits at the bottom of the block; a description can say
    // "N stars today" too, so drop it and take the last match
    let without_description = RE_DESCRIPTION.replace(block, "");
    let plain = normalize_text(&without_description);
    let stars_gained = RE_GAINED
        .captures_iter(&plain)
        .last()
        .and_then(|c| c.get(1))
        .and_then(|m| parse_count(m.as_str()));

    Some(TrendingEntry {
        owner,
        name,
        description,
        language,
        stars,
        forks,
        stars_gained,
    })
}

fn capture_text(re: &Regex, block: &str) -> Option<String> {
    let raw = re.captures(block)?.get(1)?.as_str();
    let text = normalize_text(raw);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Strip tags, decode entities, collapse whitespace
pub fn normalize_text(fragment: &str) -> String {
    let stripped = RE_TAGS.replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

/// Parse display counts like "1,234", "5.2k", "1.5M" or "234 stars today"
///
/// Best effort: anything unreadable is `None` and the caller picks a default.
pub fn parse_count(text: &str) -> Option<u64> {
    let lowered = text.trim().to_lowercase().replace(',', "");
    let token = lowered
        .split_whitespace()
        .find(|word| word.starts_with(|c: char| c.is_ascii_digit()))?;

    let (number, multiplier) = match token.chars().last()? {
        'k' => (&token[..token.len() - 1], 1_000f64),
        'm' => (&token[..token.len() - 1], 1_000_000f64),
        'b' => (&token[..token.len() - 1], 1_000_000_000f64),
        _ => (token, 1f64),
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}
