//! Line-oriented tokenizer. Never fails: unrecognized text becomes
//! [`TokenKind::Other`] and is left for the parser (or the enclosing
//! header's description) to deal with. Keyword classification is
//! delegated to [`crate::keywords`] so the dialect table can grow
//! without touching the line-scanning logic here.

use std::path::{Path, PathBuf};

use crate::diagnostics::SourceLocation;
use crate::keywords::{self, HeaderKeyword, Keywords};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKeyword {
    Given,
    When,
    Then,
    And,
    But,
    Star,
}

impl StepKeyword {
    fn from_str(s: &str) -> Self {
        match s {
            "Given" => StepKeyword::Given,
            "When" => StepKeyword::When,
            "Then" => StepKeyword::Then,
            "And" => StepKeyword::And,
            "But" => StepKeyword::But,
            "*" => StepKeyword::Star,
            other => panic!("not a step keyword: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStringMarker {
    TripleQuote,
    TripleBacktick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    FeatureLine { keyword_text: String, name: String },
    RuleLine { keyword_text: String, name: String },
    BackgroundLine { keyword_text: String, name: String },
    ScenarioLine { keyword_text: String, name: String },
    ScenarioOutlineLine { keyword_text: String, name: String },
    ExamplesLine { keyword_text: String, name: String },
    StepLine { keyword: StepKeyword, keyword_text: String, text: String },
    TagLine { tags: Vec<String> },
    TableRow { cells: Vec<String> },
    DocStringDelim { marker: DocStringMarker, content_type: Option<String> },
    DocStringLine { content: String },
    Comment { text: String },
    Empty,
    Other { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
    pub indent: usize,
}

/// Tokenize a full source buffer. `file` is used only to stamp locations.
pub fn tokenize(source: &str, file: &Path) -> Vec<Token> {
    Lexer::new(source, file).run()
}

struct Lexer<'a> {
    file: PathBuf,
    lines: std::str::Lines<'a>,
    line_no: usize,
    keywords: Keywords,
    open_docstring: Option<(DocStringMarker, usize)>,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file: &Path) -> Self {
        let keywords = detect_language(source);
        Lexer {
            file: file.to_path_buf(),
            lines: source.lines(),
            line_no: 0,
            keywords,
            open_docstring: None,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(raw_line) = self.lines.next() {
            self.line_no += 1;
            self.classify(raw_line);
        }
        self
            .tokens
    }

    fn push(&mut self, indent: usize, column: usize, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            location: SourceLocation::new(self.file.clone(), self.line_no, column),
            indent,
        });
    }

    fn classify(&mut self, raw_line: &str) {
        let indent = raw_line.len() - raw_line.trim_start_matches(' ').len();
        let trimmed = raw_line.trim_start_matches(' ');

        if let Some((marker, open_indent)) = self.open_docstring {
            if indent == open_indent && is_docstring_delim(trimmed, marker) {
                self.open_docstring = None;
                self.push(indent, indent + 1, TokenKind::DocStringDelim { marker, content_type: None });
                return;
            }
            self.push(indent, indent + 1, TokenKind::DocStringLine { content: raw_line.to_string() });
            return;
        }

        let trimmed_end = trimmed.trim_end();

        if trimmed_end.is_empty() {
            self.push(indent, indent + 1, TokenKind::Empty);
            return;
        }

        if self.line_no == 1 {
            if let Some(_lang) = parse_language_directive(trimmed_end) {
                // Already consumed by `detect_language`; still record as a comment.
                self.push(indent, indent + 1, TokenKind::Comment { text: trimmed_end.to_string() });
                return;
            }
        }

        if let Some(text) = trimmed_end.strip_prefix('#') {
            self.push(indent, indent + 1, TokenKind::Comment { text: text.trim_start().to_string() });
            return;
        }

        if let Some(rest) = trimmed_end.strip_prefix('@') {
            let mut tags = vec![format!("@{}", rest.split_whitespace().next().unwrap_or(""))];
            tags.extend(
                trimmed_end
                    .split_whitespace()
                    .skip(1)
                    .filter(|t| t.starts_with('@'))
                    .map(|t| t.to_string()),
            );
            self.push(indent, indent + 1, TokenKind::TagLine { tags });
            return;
        }

        if let Some(rest) = trimmed_end.strip_prefix('|') {
            let cells = split_table_row(rest);
            self.push(indent, indent + 1, TokenKind::TableRow { cells });
            return;
        }

        if let Some(marker) = docstring_opener(trimmed_end) {
            let content_type = docstring_content_type(trimmed_end, marker);
            self.open_docstring = Some((marker, indent));
            self.push(indent, indent + 1, TokenKind::DocStringDelim { marker, content_type });
            return;
        }

        if let Some((kind, keyword_text, rest)) = self.keywords.match_header(trimmed_end) {
            let name = rest.trim().to_string();
            let kw = keyword_text.to_string();
            let token = match kind {
                HeaderKeyword::Feature => TokenKind::FeatureLine { keyword_text: kw, name },
                HeaderKeyword::Rule => TokenKind::RuleLine { keyword_text: kw, name },
                HeaderKeyword::Background => TokenKind::BackgroundLine { keyword_text: kw, name },
                HeaderKeyword::Scenario => TokenKind::ScenarioLine { keyword_text: kw, name },
                HeaderKeyword::ScenarioOutline => TokenKind::ScenarioOutlineLine { keyword_text: kw, name },
                HeaderKeyword::Examples => TokenKind::ExamplesLine { keyword_text: kw, name },
            };
            self.push(indent, indent + 1, token);
            return;
        }

        if let Some((kw, text)) = self.keywords.match_step(trimmed_end) {
            let keyword = StepKeyword::from_str(kw);
            self.push(
                indent,
                indent + 1,
                TokenKind::StepLine {
                    keyword,
                    keyword_text: kw.to_string(),
                    text: text.to_string(),
                },
            );
            return;
        }

        self.push(indent, indent + 1, TokenKind::Other { text: trimmed_end.to_string() });
    }
}

fn detect_language(source: &str) -> Keywords {
    match source.lines().next() {
        Some(first) => match parse_language_directive(first.trim()) {
            Some(lang) => keywords::lookup(&lang),
            None => keywords::ENGLISH,
        },
        None => keywords::ENGLISH,
    }
}

fn parse_language_directive(line: &str) -> Option<String> {
    let rest = line.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix("language:")?;
    Some(rest.trim().to_string())
}

fn is_docstring_delim(trimmed_end: &str, marker: DocStringMarker) -> bool {
    match marker {
        DocStringMarker::TripleQuote => trimmed_end.trim_end() == "\"\"\"",
        DocStringMarker::TripleBacktick => trimmed_end.trim_end() == "```",
    }
}

fn docstring_opener(trimmed_end: &str) -> Option<DocStringMarker> {
    if trimmed_end.starts_with("\"\"\"") {
        Some(DocStringMarker::TripleQuote)
    } else if trimmed_end.starts_with("```") {
        Some(DocStringMarker::TripleBacktick)
    } else {
        None
    }
}

fn docstring_content_type(trimmed_end: &str, marker: DocStringMarker) -> Option<String> {
    let prefix_len = match marker {
        DocStringMarker::TripleQuote => 3,
        DocStringMarker::TripleBacktick => 3,
    };
    let rest = trimmed_end.get(prefix_len..).unwrap_or("").trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Split a `|`-delimited table row into trimmed, unescaped cells.
/// `rest` is the line with the leading `|` already stripped.
fn split_table_row(rest: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => current.push('|'),
                Some('n') => current.push('\n'),
                Some('\\') => current.push('\\'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '|' => {
                cells.push(current.trim().to_string());
                current = String::new();
            }
            other => current.push(other),
        }
    }
    // Trailing text after the final `|` is ignored (matches a trailing
    // `|` terminator); only push it if non-whitespace, to tolerate rows
    // without a trailing pipe.
    if !current.trim().is_empty() {
        cells.push(current.trim().to_string());
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn toks(src: &str) -> Vec<TokenKind> {
        tokenize(src, Path::new("test.feature"))
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn classifies_feature_and_scenario() {
        let src = "Feature: Eating\n\n  Scenario: Eating cucumbers\n    Given I have 12 cucumbers\n";
        let kinds = toks(src);
        assert!(matches!(&kinds[0], TokenKind::FeatureLine { name, .. } if name == "Eating"));
        assert!(matches!(&kinds[1], TokenKind::Empty));
        assert!(matches!(&kinds[2], TokenKind::ScenarioLine { name, .. } if name == "Eating cucumbers"));
        assert!(matches!(&kinds[3], TokenKind::StepLine { keyword: StepKeyword::Given, text, .. } if text == "I have 12 cucumbers"));
    }

    #[test]
    fn classifies_tags_and_table() {
        let kinds = toks("@smoke @wip\n| a | b |\n");
        assert!(matches!(&kinds[0], TokenKind::TagLine { tags } if tags == &vec!["@smoke".to_string(), "@wip".to_string()]));
        assert!(matches!(&kinds[1], TokenKind::TableRow { cells } if cells == &vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn table_row_unescapes_pipe_and_backslash() {
        let kinds = toks(r"| a\|b | c\\d |");
        match &kinds[0] {
            TokenKind::TableRow { cells } => {
                assert_eq!(cells, &vec!["a|b".to_string(), "c\\d".to_string()]);
            }
            other => panic!("expected table row, got {other:?}"),
        }
    }

    #[test]
    fn docstring_captures_verbatim_lines_until_matching_delim() {
        let src = "    \"\"\"\n    line one\n      indented\n    \"\"\"\n";
        let kinds = toks(src);
        assert!(matches!(&kinds[0], TokenKind::DocStringDelim { marker: DocStringMarker::TripleQuote, .. }));
        assert!(matches!(&kinds[1], TokenKind::DocStringLine { content } if content == "    line one"));
        assert!(matches!(&kinds[2], TokenKind::DocStringLine { content } if content == "      indented"));
        assert!(matches!(&kinds[3], TokenKind::DocStringDelim { .. }));
    }

    #[test]
    fn docstring_delim_must_match_opener_indent() {
        // Closing delimiter at a different indent stays inside the docstring.
        let src = "  \"\"\"\n\"\"\"\n  \"\"\"\n";
        let kinds = toks(src);
        assert!(matches!(&kinds[0], TokenKind::DocStringDelim { .. }));
        assert!(matches!(&kinds[1], TokenKind::DocStringLine { content } if content.is_empty()));
        assert!(matches!(&kinds[2], TokenKind::DocStringDelim { .. }));
    }

    #[test]
    fn unknown_text_becomes_other() {
        let kinds = toks("this is free text\n");
        assert!(matches!(&kinds[0], TokenKind::Other { text } if text == "this is free text"));
    }

    #[test]
    fn language_directive_switches_dialect_without_failing_on_unknown() {
        // English is the only bundled dialect; an unrecognized tag still
        // tokenizes the rest of the file using the fallback.
        let src = "# language: fr\nFeature: something\n";
        let kinds = toks(src);
        assert!(matches!(&kinds[0], TokenKind::Comment { .. }));
        assert!(matches!(&kinds[1], TokenKind::FeatureLine { .. }));
    }
}
