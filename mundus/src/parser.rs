// Summary response parser
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

/// Headline and body extracted from a summarization response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSummary {
    pub headline: String,
    pub body: String,
}

fn headline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"HEADLINE: (.*?)\n").expect("valid headline pattern"))
}

fn summary_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)SUMMARY: (.*)\z").expect("valid summary pattern"))
}

/// Split a freeform response into headline and body.
///
/// The backend is asked to answer as `HEADLINE: ...` followed by `SUMMARY: ...`, but
/// nothing enforces it. A missing headline falls back to `default_headline`; a missing
/// summary falls back to the whole response. This never fails.
pub fn parse_summary(raw: &str, default_headline: &str) -> ParsedSummary {
    let headline = match headline_pattern().captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => {
            debug!("parser: no HEADLINE marker, using default headline");
            default_headline.to_string()
        }
    };

    let body = match summary_pattern().captures(raw) {
        Some(caps) => caps[1].trim().to_string(),
        None => {
            debug!("parser: no SUMMARY marker, using the whole response as body");
            raw.to_string()
        }
    };

    ParsedSummary { headline, body }
}

/// Fallback headline for a writeup built from `count` articles.
pub fn merged_headline(count: usize) -> String {
    format!("Merged Writeup - {} Articles", count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_headline_and_multiline_summary() {
        let raw = "HEADLINE: Storm Hits City\nSUMMARY: Heavy rain caused flooding.\nMore details follow.";
        let parsed = parse_summary(raw, "Original title");
        assert_eq!(parsed.headline, "Storm Hits City");
        assert_eq!(parsed.body, "Heavy rain caused flooding.\nMore details follow.");
    }

    #[test]
    fn plain_text_uses_both_fallbacks() {
        let parsed = parse_summary("Just a plain summary.", "Original title");
        assert_eq!(parsed.headline, "Original title");
        assert_eq!(parsed.body, "Just a plain summary.");
    }

    #[test]
    fn headline_without_summary_keeps_raw_body() {
        let raw = "HEADLINE: Only a headline\nand then some prose";
        let parsed = parse_summary(raw, "unused");
        assert_eq!(parsed.headline, "Only a headline");
        assert_eq!(parsed.body, raw);
    }

    #[test]
    fn summary_without_headline_uses_default_headline() {
        let parsed = parse_summary("Intro text\nSUMMARY:  Body here.  \n", &merged_headline(3));
        assert_eq!(parsed.headline, "Merged Writeup - 3 Articles");
        assert_eq!(parsed.body, "Body here.");
    }

    #[test]
    fn headline_needs_a_line_break() {
        let parsed = parse_summary("HEADLINE: dangling", "fallback");
        assert_eq!(parsed.headline, "fallback");
        assert_eq!(parsed.body, "HEADLINE: dangling");
    }

    #[test]
    fn tolerates_carriage_returns_and_preamble() {
        let raw = "Sure! Here you go.\r\nHEADLINE: **Bold Claim**\r\nSUMMARY: First line.\r\nSecond line.\r\n";
        let parsed = parse_summary(raw, "fallback");
        assert_eq!(parsed.headline, "**Bold Claim**");
        assert_eq!(parsed.body, "First line.\r\nSecond line.");
    }
}
