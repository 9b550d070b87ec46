//! Keyword vocabulary tables, keyed by `# language: xx` directive.
//!
//! Only the English dialect ships today, but the shape is data-driven —
//! `Keywords` is plain data and [`lookup`] is a linear scan over a
//! static table — so adding a dialect is a data change, not a parser
//! change.

#[derive(Debug, Clone, Copy)]
pub struct Keywords {
    pub language: &'static str,
    pub feature: &'static [&'static str],
    pub rule: &'static [&'static str],
    pub background: &'static [&'static str],
    pub scenario: &'static [&'static str],
    pub scenario_outline: &'static [&'static str],
    pub examples: &'static [&'static str],
    pub given: &'static [&'static str],
    pub when: &'static [&'static str],
    pub then: &'static [&'static str],
    pub and: &'static [&'static str],
    pub but: &'static [&'static str],
}

pub const ENGLISH: Keywords = Keywords {
    language: "en",
    feature: &["Feature"],
    rule: &["Rule"],
    background: &["Background"],
    scenario: &["Scenario", "Example"],
    scenario_outline: &["Scenario Outline", "Scenario Template"],
    examples: &["Examples", "Scenarios"],
    given: &["Given"],
    when: &["When"],
    then: &["Then"],
    and: &["And"],
    but: &["But"],
};

const DIALECTS: &[Keywords] = &[ENGLISH];

/// Look up a dialect by its `# language: xx` tag. Falls back to English
/// for an unknown tag — the lexer never fails on account of keywords.
pub fn lookup(language: &str) -> Keywords {
    DIALECTS
        .iter()
        .copied()
        .find(|k| k.language.eq_ignore_ascii_case(language))
        .unwrap_or(ENGLISH)
}

/// A primary header keyword this dialect recognizes, with the matched
/// keyword text and which kind of header it introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKeyword {
    Feature,
    Rule,
    Background,
    Scenario,
    ScenarioOutline,
    Examples,
}

impl Keywords {
    /// Classify a trimmed line as `keyword: rest`, returning the header
    /// kind, the exact keyword text matched and the text after `:`.
    pub fn match_header<'a>(&self, line: &'a str) -> Option<(HeaderKeyword, &'static str, &'a str)> {
        let groups: &[(&[&str], HeaderKeyword)] = &[
            (self.scenario_outline, HeaderKeyword::ScenarioOutline),
            (self.examples, HeaderKeyword::Examples),
            (self.background, HeaderKeyword::Background),
            (self.scenario, HeaderKeyword::Scenario),
            (self.rule, HeaderKeyword::Rule),
            (self.feature, HeaderKeyword::Feature),
        ];

        for (keywords, kind) in groups {
            for kw in *keywords {
                if let Some(rest) = line.strip_prefix(kw) {
                    if let Some(rest) = rest.strip_prefix(':') {
                        return Some((*kind, kw, rest));
                    }
                }
            }
        }
        None
    }

    /// Classify a trimmed line's leading word as a step keyword,
    /// returning the matched keyword and the remaining text.
    pub fn match_step<'a>(&self, line: &'a str) -> Option<(&'static str, &'a str)> {
        if let Some(rest) = line.strip_prefix('*') {
            if rest.is_empty() || rest.starts_with(' ') {
                return Some(("*", rest.trim_start_matches(' ')));
            }
        }
        let groups: &[&[&str]] = &[self.given, self.when, self.then, self.and, self.but];
        for keywords in groups {
            for kw in *keywords {
                if let Some(rest) = line.strip_prefix(kw) {
                    if let Some(rest) = rest.strip_prefix(' ') {
                        return Some((kw, rest));
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_english() {
        let k = lookup("xx-not-a-real-dialect");
        assert_eq!(k.language, "en");
    }

    #[test]
    fn matches_scenario_outline_before_scenario() {
        let k = ENGLISH;
        let (kind, kw, rest) = k.match_header("Scenario Outline: Foo").unwrap();
        assert_eq!(kind, HeaderKeyword::ScenarioOutline);
        assert_eq!(kw, "Scenario Outline");
        assert_eq!(rest, " Foo");
    }

    #[test]
    fn matches_star_step() {
        let k = ENGLISH;
        let (kw, rest) = k.match_step("* a thing happens").unwrap();
        assert_eq!(kw, "*");
        assert_eq!(rest, "a thing happens");
    }
}
