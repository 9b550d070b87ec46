//! Canonical pretty-printer. Deterministic and idempotent:
//! `format(parse(format(parse(x)))) == format(parse(x))`. The roundtrip
//! verifier in [`crate::roundtrip`] additionally checks structural AST
//! equality across that cycle.
//!
//! Built as a `String`-building visitor over the full node set, rather
//! than per-type `Display` impls, so indentation context (plain vs.
//! under a `Rule`) can be threaded through explicitly instead of each
//! node guessing its own depth.

use std::fmt::Write as _;

use crate::ast::*;
use crate::lexer::StepKeyword;

/// Render a parsed [`Feature`] to its canonical textual form.
pub fn format_feature(feature: &Feature) -> String {
    let mut out = String::new();
    write_tags(&mut out, &feature.tags, 0);
    write_header(&mut out, 0, "Feature", &feature.name);
    write_description(&mut out, &feature.description, 2);

    for child in &feature.children {
        out.push('\n');
        write_child(&mut out, child);
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn write_child(out: &mut String, child: &Child) {
    match child {
        Child::Background(b) => write_background(out, b, 2),
        Child::Rule(r) => write_rule(out, r),
        Child::Scenario(s) => write_scenario(out, s, 2),
        Child::ScenarioOutline(o) => write_scenario_outline(out, o, 2),
    }
}

fn write_rule(out: &mut String, rule: &Rule) {
    write_tags(out, &rule.tags, 2);
    write_header(out, 2, "Rule", &rule.name);
    write_description(out, &rule.description, 4);

    if let Some(bg) = &rule.background {
        out.push('\n');
        write_background(out, bg, 4);
    }
    for scenario in &rule.scenarios {
        out.push('\n');
        match scenario {
            RuleChild::Scenario(s) => write_scenario(out, s, 4),
            RuleChild::ScenarioOutline(o) => write_scenario_outline(out, o, 4),
        }
    }
}

fn write_background(out: &mut String, background: &Background, level: usize) {
    write_header(out, level, "Background", &background.name);
    write_description(out, &background.description, level + 2);
    write_steps(out, &background.steps, level + 2);
}

fn write_scenario(out: &mut String, scenario: &Scenario, level: usize) {
    write_tags(out, &scenario.tags, level);
    write_header(out, level, "Scenario", &scenario.name);
    write_description(out, &scenario.description, level + 2);
    write_steps(out, &scenario.steps, level + 2);
}

fn write_scenario_outline(out: &mut String, outline: &ScenarioOutline, level: usize) {
    write_tags(out, &outline.tags, level);
    write_header(out, level, "Scenario Outline", &outline.name);
    write_description(out, &outline.description, level + 2);
    write_steps(out, &outline.steps, level + 2);

    for examples in &outline.examples {
        out.push('\n');
        write_examples(out, examples, level + 2);
    }
}

fn write_examples(out: &mut String, examples: &Examples, level: usize) {
    write_tags(out, &examples.tags, level);
    write_header(out, level, "Examples", &examples.name);
    write_description(out, &examples.description, level + 2);

    let mut rows: Vec<&Row> = Vec::with_capacity(examples.rows.len() + 1);
    rows.push(&examples.header);
    rows.extend(examples.rows.iter());
    write_table(out, &rows, level + 2);
}

fn write_steps(out: &mut String, steps: &[Step], level: usize) {
    for step in steps {
        let kw = step_keyword_text(step);
        let _ = writeln!(out, "{}{} {}", indent(level), kw, step.text);
        match &step.argument {
            Some(StepArgument::DocString(doc)) => write_docstring(out, doc, level + 2),
            Some(StepArgument::DataTable(table)) => {
                let rows: Vec<&Row> = table.rows.iter().collect();
                write_table(out, &rows, level + 2);
            }
            None => {}
        }
    }
}

fn step_keyword_text(step: &Step) -> &str {
    match step.keyword {
        StepKeyword::Star => "*",
        _ => &step.keyword_text,
    }
}

fn write_docstring(out: &mut String, doc: &DocString, level: usize) {
    let marker = match doc.delim {
        DocStringDelim::TripleQuote => "\"\"\"",
        DocStringDelim::TripleBacktick => "```",
    };
    let pad = indent(level);
    match &doc.content_type {
        Some(ct) => {
            let _ = writeln!(out, "{pad}{marker}{ct}");
        }
        None => {
            let _ = writeln!(out, "{pad}{marker}");
        }
    }
    for line in &doc.lines {
        let _ = writeln!(out, "{line}");
    }
    let _ = writeln!(out, "{pad}{marker}");
}

/// Column-align a table's cells (rule 5): every cell is padded to the
/// max display width of its column, across header and data rows alike.
fn write_table(out: &mut String, rows: &[&Row], level: usize) {
    if rows.is_empty() {
        return;
    }
    let cols = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
    let mut widths = vec![0usize; cols];
    let escaped: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.cells.iter().map(|c| escape_cell(c)).collect())
        .collect();
    for row in &escaped {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    let pad = indent(level);
    for row in &escaped {
        let mut line = String::from(&pad);
        line.push('|');
        for (i, cell) in row.iter().enumerate() {
            let fill = widths[i] - display_width(cell);
            line.push(' ');
            line.push_str(cell);
            line.extend(std::iter::repeat(' ').take(fill));
            line.push(' ');
            line.push('|');
        }
        out.push_str(&line);
        out.push('\n');
    }
}

fn escape_cell(cell: &str) -> String {
    cell.replace('\\', "\\\\").replace('|', "\\|").replace('\n', "\\n")
}

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn write_tags(out: &mut String, tags: &[String], level: usize) {
    if tags.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}{}", indent(level), tags.join(" "));
}

fn write_description(out: &mut String, description: &str, level: usize) {
    if description.is_empty() {
        return;
    }
    for line in description.lines() {
        if line.is_empty() {
            out.push('\n');
        } else {
            let _ = writeln!(out, "{}{}", indent(level), line.trim_end());
        }
    }
    out.push('\n');
}

fn indent(n: usize) -> String {
    " ".repeat(n)
}

/// Write a `Keyword: name` header line. An empty name (an unnamed
/// `Scenario:`/`Examples:` etc.) omits the trailing space rather than
/// leaving it dangling after the colon.
fn write_header(out: &mut String, level: usize, keyword: &str, name: &str) {
    if name.is_empty() {
        let _ = writeln!(out, "{}{}:", indent(level), keyword);
    } else {
        let _ = writeln!(out, "{}{}: {}", indent(level), keyword, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn fmt(src: &str) -> String {
        let result = parse(src, Path::new("test.feature"));
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        format_feature(&result.feature.unwrap())
    }

    #[test]
    fn simple_feature_is_emitted_with_fixed_indentation() {
        let src = "Feature: Eating\n\n  Scenario: Eating cucumbers\n    Given I have 12 cucumbers\n    When I eat 5 cucumbers\n    Then I should have 7 cucumbers\n";
        let out = fmt(src);
        assert_eq!(out, src);
    }

    #[test]
    fn format_is_idempotent() {
        let src = "Feature: Eating\n\n  Scenario: Eating cucumbers\n    Given I have 12 cucumbers\n";
        let once = fmt(src);
        let twice = fmt(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn tags_are_emitted_above_their_owner() {
        let src = "@smoke @wip\nFeature: F\n\n  @slow\n  Scenario: S\n    Given a\n";
        let out = fmt(src);
        assert!(out.starts_with("@smoke @wip\nFeature: F\n"));
        assert!(out.contains("  @slow\n  Scenario: S\n"));
    }

    #[test]
    fn data_table_columns_align_on_max_width() {
        let src = "Feature: F\n\n  Scenario: S\n    Given a table:\n      | a | bb |\n      | 1 | 2  |\n";
        let out = fmt(src);
        assert!(out.contains("| a | bb |\n"));
        assert!(out.contains("| 1 | 2  |\n"));
    }

    #[test]
    fn scenario_outline_examples_round_trip() {
        let src = "Feature: F\n\n  Scenario Outline: O\n    Given I have role <role>\n\n    Examples: roles\n      | role  |\n      | admin |\n      | user  |\n";
        let out = fmt(src);
        assert_eq!(out, src);
    }

    #[test]
    fn docstring_is_emitted_verbatim() {
        let src = "Feature: F\n\n  Scenario: S\n    Given a docstring:\n      \"\"\"\n      hello\n        world\n      \"\"\"\n";
        let out = fmt(src);
        assert_eq!(out, src);
    }

    #[test]
    fn rule_children_indent_one_level_deeper() {
        let src = "Feature: F\n\n  Rule: R\n\n    Background: B\n      Given setup\n\n    Scenario: S\n      Given a\n";
        let out = fmt(src);
        assert_eq!(out, src);
    }

    #[test]
    fn unnamed_examples_header_omits_trailing_space() {
        let src = "Feature: F\n\n  Scenario Outline: O\n    Given I have role <role>\n\n    Examples:\n      | role  |\n      | admin |\n";
        let out = fmt(src);
        assert!(out.contains("\n    Examples:\n"));
        assert!(!out.contains("Examples: \n"));
        assert_eq!(out, src);
    }

    #[test]
    fn unnamed_scenario_header_omits_trailing_space() {
        let src = "Feature: F\n\n  Scenario:\n    Given a\n";
        let out = fmt(src);
        assert!(out.contains("\n  Scenario:\n"));
        assert!(!out.contains("Scenario: \n"));
        assert_eq!(out, src);
    }

    #[test]
    fn blank_lines_between_top_level_children_collapse_to_one() {
        let src = "Feature: F\n\n  Scenario: A\n    Given a\n\n  Scenario: B\n    Given b\n";
        let out = fmt(src);
        let blank_runs: Vec<&str> = out.split("\n\n").collect();
        assert!(blank_runs.len() >= 2);
        assert!(!out.contains("\n\n\n"));
    }
}
