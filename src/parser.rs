//! Recursive-descent parser over the token stream. Never throws:
//! unexpected tokens are recorded as diagnostics and skipped, and
//! parsing resumes from there, so a single bad line never takes down
//! the rest of the file. The resulting AST may be partial but every
//! surviving node is well-formed (every field set, every location
//! real). One function per node kind builds that node up field by
//! field from the cursor, the way a hand-written recursive-descent
//! parser does without a parser-generator's generated `Pair` tree to
//! lean on.

use std::path::{Path, PathBuf};

use crate::ast::*;
use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceLocation};
use crate::keywords;
use crate::lexer::{self, StepKeyword, Token, TokenKind};

pub struct ParseResult {
    pub feature: Option<Feature>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Tokenize and parse a source buffer in one step.
pub fn parse(source: &str, file: &Path) -> ParseResult {
    let tokens: Vec<Token> = lexer::tokenize(source, file)
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Comment { .. }))
        .collect();
    Parser::new(tokens, file).parse_feature()
}

fn token_kind_name(kind: &TokenKind) -> &'static str {
    match kind {
        TokenKind::FeatureLine { .. } => "feature-line",
        TokenKind::RuleLine { .. } => "rule-line",
        TokenKind::BackgroundLine { .. } => "background-line",
        TokenKind::ScenarioLine { .. } => "scenario-line",
        TokenKind::ScenarioOutlineLine { .. } => "scenario-outline-line",
        TokenKind::ExamplesLine { .. } => "examples-line",
        TokenKind::StepLine { .. } => "step-line",
        TokenKind::TagLine { .. } => "tag-line",
        TokenKind::TableRow { .. } => "table-row",
        TokenKind::DocStringDelim { .. } => "docstring-delim",
        TokenKind::DocStringLine { .. } => "docstring-line",
        TokenKind::Comment { .. } => "comment",
        TokenKind::Empty => "empty",
        TokenKind::Other { .. } => "other",
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: PathBuf,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<Token>, file: &Path) -> Self {
        Parser {
            tokens,
            pos: 0,
            file: file.to_path_buf(),
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eof_location(&self) -> SourceLocation {
        match self.tokens.last() {
            Some(t) => SourceLocation::new(self.file.clone(), t.location.line + 1, 1),
            None => SourceLocation::new(self.file.clone(), 1, 1),
        }
    }

    fn emit(&mut self, location: SourceLocation, kind: DiagnosticKind, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(location, kind, message));
    }

    fn skip_empty(&mut self) {
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Empty)) {
            self.advance();
        }
    }

    /// Consume consecutive `TagLine` tokens into `tags`, validating each
    /// against `@[^\s]+`. Returns the location of the first tag line
    /// seen, if any (for `orphan-tags` reporting).
    fn collect_tags(&mut self, tags: &mut Vec<String>, first_loc: &mut Option<SourceLocation>) {
        while let Some(TokenKind::TagLine { .. }) = self.peek().map(|t| &t.kind) {
            let tok = self.advance().unwrap();
            if first_loc.is_none() {
                *first_loc = Some(tok.location.clone());
            }
            if let TokenKind::TagLine { tags: found } = tok.kind {
                for tag in found {
                    if tag.len() <= 1 {
                        self.emit(
                            tok.location.clone(),
                            DiagnosticKind::InvalidTag,
                            format!("Invalid tag: `{tag}`"),
                        );
                        continue;
                    }
                    tags.push(tag);
                }
            }
        }
    }

    /// Consume `Other`/`Empty` tokens into a description, trimming
    /// trailing blank lines.
    fn collect_description(&mut self) -> String {
        let mut lines: Vec<String> = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Other { text }) => {
                    lines.push(text.clone());
                    self.advance();
                }
                Some(TokenKind::Empty) => {
                    lines.push(String::new());
                    self.advance();
                }
                _ => break,
            }
        }
        while matches!(lines.last(), Some(l) if l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    fn parse_feature(mut self) -> ParseResult {
        self.skip_empty();

        let mut tags = Vec::new();
        let mut tags_loc = None;
        self.collect_tags(&mut tags, &mut tags_loc);

        let (keyword_text, name, location, language) = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::FeatureLine { keyword_text, name }) => {
                let keyword_text = keyword_text.clone();
                let name = name.clone();
                let tok = self.advance().unwrap();
                (keyword_text, name, tok.location, keywords::ENGLISH.language.to_string())
            }
            _ => {
                let loc = tags_loc.clone().unwrap_or_else(|| self.eof_location());
                if tags_loc.is_some() {
                    self.emit(loc.clone(), DiagnosticKind::OrphanTags, "Tags with no owning header");
                }
                self.emit(loc, DiagnosticKind::NoSuchFeature, "No Feature found in file");
                return ParseResult {
                    feature: None,
                    diagnostics: self.diagnostics,
                };
            }
        };
        let _ = &keyword_text;

        let description = self.collect_description();
        let mut children = Vec::new();

        let mut pending_tags: Vec<String> = Vec::new();
        let mut pending_loc: Option<SourceLocation> = None;

        loop {
            self.skip_empty();
            self.collect_tags(&mut pending_tags, &mut pending_loc);

            match self.peek().map(|t| &t.kind) {
                None => break,
                Some(TokenKind::BackgroundLine { .. }) => {
                    if !pending_tags.is_empty() {
                        self.emit(
                            pending_loc.clone().unwrap(),
                            DiagnosticKind::OrphanTags,
                            "Background does not accept tags",
                        );
                        pending_tags.clear();
                        pending_loc = None;
                    }
                    children.push(Child::Background(self.parse_background()));
                }
                Some(TokenKind::RuleLine { .. }) => {
                    let tags = std::mem::take(&mut pending_tags);
                    pending_loc = None;
                    children.push(Child::Rule(self.parse_rule(tags)));
                }
                Some(TokenKind::ScenarioLine { .. }) => {
                    let tags = std::mem::take(&mut pending_tags);
                    pending_loc = None;
                    children.push(Child::Scenario(self.parse_scenario(tags)));
                }
                Some(TokenKind::ScenarioOutlineLine { .. }) => {
                    let tags = std::mem::take(&mut pending_tags);
                    pending_loc = None;
                    children.push(Child::ScenarioOutline(self.parse_scenario_outline(tags)));
                }
                Some(TokenKind::FeatureLine { .. }) => {
                    let tok = self.advance().unwrap();
                    self.emit(tok.location, DiagnosticKind::DuplicateFeature, "A file may declare only one Feature");
                }
                Some(other_kind) => {
                    let tok = self.advance().unwrap();
                    self.emit(
                        tok.location,
                        DiagnosticKind::UnexpectedToken,
                        format!("Unexpected token: :{}", token_kind_name(other_kind)),
                    );
                }
            }
        }

        if !pending_tags.is_empty() {
            self.emit(pending_loc.unwrap(), DiagnosticKind::OrphanTags, "Tags with no owning header");
        }

        let feature = Feature {
            language,
            tags,
            name,
            description,
            children,
            location,
        };

        ParseResult {
            feature: Some(feature),
            diagnostics: self.diagnostics,
        }
    }

    fn parse_background(&mut self) -> Background {
        let tok = self.advance().unwrap();
        let name = match tok.kind {
            TokenKind::BackgroundLine { name, .. } => name,
            _ => unreachable!(),
        };
        let description = self.collect_description();
        let steps = self.parse_steps();
        Background {
            name,
            description,
            steps,
            location: tok.location,
        }
    }

    fn parse_rule(&mut self, tags: Vec<String>) -> Rule {
        let tok = self.advance().unwrap();
        let name = match tok.kind {
            TokenKind::RuleLine { name, .. } => name,
            _ => unreachable!(),
        };
        let description = self.collect_description();

        let mut background = None;
        let mut scenarios = Vec::new();
        let mut pending_tags: Vec<String> = Vec::new();
        let mut pending_loc: Option<SourceLocation> = None;

        loop {
            self.skip_empty();
            self.collect_tags(&mut pending_tags, &mut pending_loc);

            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::BackgroundLine { .. }) => {
                    if background.is_some() {
                        let t = self.advance().unwrap();
                        self.emit(
                            t.location,
                            DiagnosticKind::UnexpectedToken,
                            "Unexpected token: :background-line (a Rule may have only one Background)",
                        );
                        continue;
                    }
                    if !pending_tags.is_empty() {
                        self.emit(pending_loc.clone().unwrap(), DiagnosticKind::OrphanTags, "Background does not accept tags");
                        pending_tags.clear();
                        pending_loc = None;
                    }
                    background = Some(self.parse_background());
                }
                Some(TokenKind::ScenarioLine { .. }) => {
                    let tags = std::mem::take(&mut pending_tags);
                    pending_loc = None;
                    scenarios.push(RuleChild::Scenario(self.parse_scenario(tags)));
                }
                Some(TokenKind::ScenarioOutlineLine { .. }) => {
                    let tags = std::mem::take(&mut pending_tags);
                    pending_loc = None;
                    scenarios.push(RuleChild::ScenarioOutline(self.parse_scenario_outline(tags)));
                }
                // Any of these end the Rule block; let the caller re-dispatch.
                None
                | Some(TokenKind::RuleLine { .. })
                | Some(TokenKind::FeatureLine { .. }) => break,
                Some(other_kind) => {
                    let t = self.advance().unwrap();
                    self.emit(
                        t.location,
                        DiagnosticKind::UnexpectedToken,
                        format!("Unexpected token: :{}", token_kind_name(other_kind)),
                    );
                }
            }
        }

        if !pending_tags.is_empty() {
            self.emit(pending_loc.unwrap(), DiagnosticKind::OrphanTags, "Tags with no owning header");
        }

        Rule {
            tags,
            name,
            description,
            background,
            scenarios,
            location: tok.location,
        }
    }

    fn parse_scenario(&mut self, tags: Vec<String>) -> Scenario {
        let tok = self.advance().unwrap();
        let name = match tok.kind {
            TokenKind::ScenarioLine { name, .. } => name,
            _ => unreachable!(),
        };
        let description = self.collect_description();
        let steps = self.parse_steps();
        Scenario {
            tags,
            name,
            description,
            steps,
            location: tok.location,
        }
    }

    fn parse_scenario_outline(&mut self, tags: Vec<String>) -> ScenarioOutline {
        let tok = self.advance().unwrap();
        let name = match tok.kind {
            TokenKind::ScenarioOutlineLine { name, .. } => name,
            _ => unreachable!(),
        };
        let description = self.collect_description();
        let steps = self.parse_steps();

        let mut examples = Vec::new();
        let mut pending_tags: Vec<String> = Vec::new();
        let mut pending_loc: Option<SourceLocation> = None;

        loop {
            self.skip_empty();
            self.collect_tags(&mut pending_tags, &mut pending_loc);

            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::ExamplesLine { .. }) => {
                    let ex_tags = std::mem::take(&mut pending_tags);
                    pending_loc = None;
                    examples.push(self.parse_examples(ex_tags));
                }
                _ => break,
            }
        }

        if !pending_tags.is_empty() {
            self.emit(pending_loc.unwrap(), DiagnosticKind::OrphanTags, "Tags with no owning header");
        }

        if examples.is_empty() {
            self.emit(
                tok.location.clone(),
                DiagnosticKind::MissingExamples,
                format!("Scenario Outline `{name}` has no Examples block"),
            );
        }

        ScenarioOutline {
            tags,
            name,
            description,
            steps,
            examples,
            location: tok.location,
        }
    }

    fn parse_examples(&mut self, tags: Vec<String>) -> Examples {
        let tok = self.advance().unwrap();
        let name = match tok.kind {
            TokenKind::ExamplesLine { name, .. } => name,
            _ => unreachable!(),
        };
        let description = self.collect_description();

        let mut rows = self.parse_table_rows();
        let header = if rows.is_empty() {
            Row { cells: Vec::new(), location: tok.location.clone() }
        } else {
            rows.remove(0)
        };

        if rows.is_empty() {
            self.emit(
                tok.location.clone(),
                DiagnosticKind::EmptyExamples,
                format!("Examples `{name}` has zero data rows"),
            );
        }

        for row in &rows {
            if row.cells.len() != header.cells.len() {
                self.emit(
                    row.location.clone(),
                    DiagnosticKind::RowWidthMismatch,
                    format!(
                        "Row has {} cell(s), expected {} to match the header",
                        row.cells.len(),
                        header.cells.len()
                    ),
                );
            }
        }

        Examples {
            tags,
            name,
            description,
            header,
            rows,
            location: tok.location,
        }
    }

    /// Consume consecutive `TableRow` tokens (separated only by blank
    /// lines, which are skipped) into [`Row`] values.
    fn parse_table_rows(&mut self) -> Vec<Row> {
        let mut rows = Vec::new();
        loop {
            // A single blank line between table rows is tolerated; two or
            // more ends the table (it's indistinguishable from the next
            // block starting).
            let save = self.pos;
            self.skip_empty();
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::TableRow { .. }) => {
                    let tok = self.advance().unwrap();
                    if let TokenKind::TableRow { cells } = tok.kind {
                        rows.push(Row { cells, location: tok.location });
                    }
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
        rows
    }

    fn parse_steps(&mut self) -> Vec<Step> {
        let mut steps = Vec::new();
        loop {
            let save = self.pos;
            self.skip_empty();
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::StepLine { .. }) => {
                    let tok = self.advance().unwrap();
                    let (keyword, keyword_text, text) = match tok.kind {
                        TokenKind::StepLine { keyword, keyword_text, text } => (keyword, keyword_text, text),
                        _ => unreachable!(),
                    };
                    let argument = self.parse_step_argument();
                    steps.push(Step {
                        keyword,
                        keyword_text,
                        text,
                        argument,
                        location: tok.location,
                    });
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
        steps
    }

    fn parse_step_argument(&mut self) -> Option<StepArgument> {
        let save = self.pos;
        self.skip_empty();
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::DocStringDelim { .. }) => Some(StepArgument::DocString(self.parse_docstring())),
            Some(TokenKind::TableRow { .. }) => {
                let rows = self.parse_table_rows();
                let location = rows
                    .first()
                    .map(|r| r.location.clone())
                    .unwrap_or_else(|| self.eof_location());
                if let Some(header) = rows.first() {
                    for row in rows.iter().skip(1) {
                        if row.cells.len() != header.cells.len() {
                            self.emit(
                                row.location.clone(),
                                DiagnosticKind::RowWidthMismatch,
                                format!(
                                    "Row has {} cell(s), expected {} to match the first row",
                                    row.cells.len(),
                                    header.cells.len()
                                ),
                            );
                        }
                    }
                }
                Some(StepArgument::DataTable(DataTable { rows, location }))
            }
            _ => {
                self.pos = save;
                None
            }
        }
    }

    fn parse_docstring(&mut self) -> DocString {
        let open = self.advance().unwrap();
        let (delim, content_type) = match open.kind {
            TokenKind::DocStringDelim { marker, content_type } => (
                match marker {
                    lexer::DocStringMarker::TripleQuote => DocStringDelim::TripleQuote,
                    lexer::DocStringMarker::TripleBacktick => DocStringDelim::TripleBacktick,
                },
                content_type,
            ),
            _ => unreachable!(),
        };

        let mut lines = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::DocStringLine { .. }) => {
                    let tok = self.advance().unwrap();
                    if let TokenKind::DocStringLine { content } = tok.kind {
                        lines.push(content);
                    }
                }
                Some(TokenKind::DocStringDelim { .. }) => {
                    self.advance();
                    break;
                }
                _ => {
                    self.emit(
                        self.eof_location(),
                        DiagnosticKind::UnterminatedDocstring,
                        "Docstring was never closed",
                    );
                    break;
                }
            }
        }

        DocString {
            delim,
            content_type,
            lines,
            location: open.location,
        }
    }
}

/// Resolve `And`/`But`/`*` step keywords against the nearest preceding
/// concrete step within the same step list (invariant 5). Pure helper
/// used by the pickle compiler.
pub fn resolve_keyword_kind(steps: &[Step], index: usize) -> StepKeyword {
    match steps[index].keyword {
        StepKeyword::Given | StepKeyword::When | StepKeyword::Then => steps[index].keyword,
        StepKeyword::And | StepKeyword::But | StepKeyword::Star => {
            for earlier in steps[..index].iter().rev() {
                match earlier.keyword {
                    StepKeyword::Given | StepKeyword::When | StepKeyword::Then => return earlier.keyword,
                    _ => continue,
                }
            }
            StepKeyword::Given
        }
    }
}
