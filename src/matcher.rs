//! Phrase-based correction detection.
//!
//! News outlets announce corrections with a small set of stock phrases
//! ("NRK retter", "I en tidligere versjon", ...). [`PhraseMatcher`] looks for
//! those phrases in an article page and isolates the text block carrying
//! the notice.
//!
//! # Algorithm
//!
//! 1. Parse the page and take its visible text (script/style content dropped).
//! 2. Walk block and emphasis nodes (`p`, `div`, `section`, `article`,
//!    headings, `strong`, `em`, `b`, `i`) in document order. The first node
//!    whose text contains a phrase and is longer than `min_node_len` is the
//!    correction body.
//! 3. A matching node is returned truncated to `max_correction_len` chars.
//! 4. If no node qualifies but the page text still contains a phrase, the
//!    configured placeholder is returned.
//! 5. Otherwise there is no correction.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::utils::{collapse_whitespace, truncate_chars};

/// Phrases NRK uses when announcing a correction.
pub const DEFAULT_TRIGGER_PHRASES: &[&str] = &[
    "I en tidligere versjon",
    "NRK retter",
    "RETTELSE",
    "NRK har rettet",
    "Endringen er gjort",
];

/// Returned when a phrase is on the page but no single node could be isolated.
pub const DEFAULT_PLACEHOLDER: &str = "Korrigert (detaljer i artikkelen)";

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

static SCANNED_NODES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("p, div, section, article, h1, h2, h3, h4, h5, h6, strong, em, b, i").unwrap()
});

/// Matching rules. Every field is configuration; the algorithm never
/// hardcodes a phrase or a length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Trigger phrases signalling an editorial correction.
    pub phrases: Vec<String>,
    /// Compare phrases and page text case-insensitively.
    pub case_insensitive: bool,
    /// A node's text must be strictly longer than this (in chars) to count.
    pub min_node_len: usize,
    /// Extracted text is cut to this many chars.
    pub max_correction_len: usize,
    /// Stored when the page matches but no node was isolated.
    pub placeholder: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_TRIGGER_PHRASES.iter().map(|p| p.to_string()).collect(),
            case_insensitive: true,
            min_node_len: 30,
            max_correction_len: 500,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

/// Decides whether a page carries a correction notice.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    config: MatcherConfig,
    /// Phrases as compared, lowercased when matching case-insensitively.
    needles: Vec<String>,
}

impl PhraseMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        let needles = config
            .phrases
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                if config.case_insensitive {
                    p.to_lowercase()
                } else {
                    p.clone()
                }
            })
            .collect();
        Self { config, needles }
    }

    /// Whether `text` contains any configured phrase.
    pub fn contains_phrase(&self, text: &str) -> bool {
        if self.config.case_insensitive {
            let haystack = text.to_lowercase();
            self.needles.iter().any(|n| haystack.contains(n.as_str()))
        } else {
            self.needles.iter().any(|n| text.contains(n.as_str()))
        }
    }

    /// Inspect an article page and return the correction text, if any.
    #[instrument(level = "debug", skip_all, fields(bytes = html.len()))]
    pub fn detect(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        for element in document.select(&SCANNED_NODES) {
            let text = visible_text(element);
            if text.chars().count() > self.config.min_node_len && self.contains_phrase(&text) {
                debug!(tag = element.value().name(), "Correction node found");
                return Some(truncate_chars(&text, self.config.max_correction_len));
            }
        }

        if self.contains_phrase(&visible_text(document.root_element())) {
            debug!("Trigger phrase found outside scanned nodes; using placeholder");
            return Some(self.config.placeholder.clone());
        }

        None
    }
}

/// Text of `element` and its descendants, skipping non-rendered content.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
        }
    }
    collapse_whitespace(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PhraseMatcher {
        PhraseMatcher::new(MatcherConfig::default())
    }

    fn page(body: &str) -> String {
        format!(
            "<!doctype html><html><head><title>Sak</title></head><body>{body}</body></html>"
        )
    }

    #[test]
    fn test_detects_correction_paragraph() {
        let html = page(
            "<h1>Overskrift</h1>\
             <p>Vanlig tekst om saken.</p>\
             <p>NRK retter: Tallet var feil i en tidligere publisert versjon.</p>",
        );
        assert_eq!(
            matcher().detect(&html).as_deref(),
            Some("NRK retter: Tallet var feil i en tidligere publisert versjon.")
        );
    }

    #[test]
    fn test_no_phrase_means_no_correction() {
        let html = page("<p>En helt vanlig nyhetssak om været i Bergen i helgen.</p>");
        assert_eq!(matcher().detect(&html), None);
    }

    #[test]
    fn test_matching_is_case_insensitive_by_default() {
        let html = page("<p>Rettelse: Artikkelen oppga feil dato for arrangementet.</p>");
        assert!(matcher().detect(&html).unwrap().starts_with("Rettelse:"));
    }

    #[test]
    fn test_plain_word_rettelser_triggers_case_insensitively() {
        // "Rettelser" contains "RETTELSE" once case is ignored.
        let html = page("<p>Her finner du en oversikt over alle Rettelser fra redaksjonen.</p>");
        assert_eq!(
            matcher().detect(&html).as_deref(),
            Some("Her finner du en oversikt over alle Rettelser fra redaksjonen.")
        );
    }

    #[test]
    fn test_case_sensitive_matching_when_configured() {
        let m = PhraseMatcher::new(MatcherConfig {
            case_insensitive: false,
            ..MatcherConfig::default()
        });
        let html = page("<p>nrk retter: dette skal ikke treffe når store bokstaver kreves.</p>");
        assert_eq!(m.detect(&html), None);
    }

    #[test]
    fn test_short_node_falls_back_to_placeholder() {
        // Nav label alone is too short to be a correction body.
        let html = page("<nav><div>NRK retter</div></nav><p>Helt annen tekst her.</p>");
        assert_eq!(matcher().detect(&html).as_deref(), Some(DEFAULT_PLACEHOLDER));
    }

    #[test]
    fn test_node_exactly_at_minimum_length_is_rejected() {
        let m = PhraseMatcher::new(MatcherConfig {
            min_node_len: 30,
            ..MatcherConfig::default()
        });
        let exact = "NRK retter: feil tall i saken.";
        assert_eq!(exact.chars().count(), 30);
        assert_eq!(
            m.detect(&page(&format!("<p>{exact}</p>"))).as_deref(),
            Some(DEFAULT_PLACEHOLDER)
        );

        let longer = "NRK retter: feil tall i saken!!";
        assert_eq!(longer.chars().count(), 31);
        assert_eq!(
            m.detect(&page(&format!("<p>{longer}</p>"))).as_deref(),
            Some(longer)
        );
    }

    #[test]
    fn test_phrase_only_in_unscanned_tag_uses_placeholder() {
        let html = page(
            "<ul><li>I en tidligere versjon av denne saken sto det feil navn.</li></ul>",
        );
        assert_eq!(matcher().detect(&html).as_deref(), Some(DEFAULT_PLACEHOLDER));
    }

    #[test]
    fn test_long_node_is_truncated_to_maximum() {
        let m = PhraseMatcher::new(MatcherConfig {
            max_correction_len: 50,
            ..MatcherConfig::default()
        });
        let long = format!("NRK har rettet {}", "ø".repeat(200));
        let html = page(&format!("<p>{long}</p>"));

        let text = m.detect(&html).unwrap();
        assert_eq!(text.chars().count(), 50);
        assert!(text.starts_with("NRK har rettet"));
    }

    #[test]
    fn test_script_and_style_are_ignored() {
        let html = page(
            "<script>var s = 'NRK retter: dette er kode, ikke tekst på siden';</script>\
             <style>.rettelse::after { content: 'RETTELSE'; }</style>\
             <p>Vanlig tekst.</p>",
        );
        assert_eq!(matcher().detect(&html), None);
    }

    #[test]
    fn test_first_qualifying_node_in_document_order_wins() {
        let html = page(
            "<p><strong>RETTELSE: Første rettelse i saken gjelder et årstall.</strong></p>\
             <p>NRK retter: Den andre rettelsen skal ikke velges.</p>",
        );
        assert_eq!(
            matcher().detect(&html).as_deref(),
            Some("RETTELSE: Første rettelse i saken gjelder et årstall.")
        );
    }

    #[test]
    fn test_inline_markup_and_whitespace_are_normalized() {
        let html = page("<p>NRK <em>retter</em>:\n   Tallet   var feil i saken om budsjettet.</p>");
        assert_eq!(
            matcher().detect(&html).as_deref(),
            Some("NRK retter: Tallet var feil i saken om budsjettet.")
        );
    }

    #[test]
    fn test_custom_phrase_list() {
        let m = PhraseMatcher::new(MatcherConfig {
            phrases: vec!["Correction:".to_string()],
            ..MatcherConfig::default()
        });
        let html = page("<p>Correction: An earlier version misstated the year.</p>");
        assert!(m.detect(&html).is_some());
        assert_eq!(m.detect(&page("<p>NRK retter: ikke lenger en trigger her.</p>")), None);
    }

    #[test]
    fn test_blank_phrases_are_ignored() {
        let m = PhraseMatcher::new(MatcherConfig {
            phrases: vec!["   ".to_string()],
            ..MatcherConfig::default()
        });
        assert!(!m.contains_phrase("any text at all"));
    }
}
