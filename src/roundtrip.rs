//! Roundtrip verifier: parse → print → parse, then compare the two
//! ASTs with locations stripped. An observer module — it calls into
//! the parser and formatter but adds no state of its own.

use crate::ast::structurally_equal;
use crate::diagnostics::Diagnostic;
use crate::formatter::format_feature;
use crate::parser::parse;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    Ok,
    Mismatch { original_len: usize, reformatted_len: usize },
    ParseErrors(Vec<Diagnostic>),
}

/// Check that `source` round-trips: `parse(format(parse(source)))` is
/// structurally equal to `parse(source)` with locations ignored.
pub fn check(source: &str, file: &Path) -> CheckResult {
    let first = parse(source, file);
    if !first.diagnostics.is_empty() {
        return CheckResult::ParseErrors(first.diagnostics);
    }
    let ast1 = first.feature.expect("no diagnostics implies a parsed feature");

    let reformatted = format_feature(&ast1);
    let second = parse(&reformatted, file);
    let ast2 = match second.feature {
        Some(f) => f,
        None => {
            return CheckResult::Mismatch { original_len: source.len(), reformatted_len: reformatted.len() }
        }
    };

    if structurally_equal(&ast1, &ast2) {
        CheckResult::Ok
    } else {
        CheckResult::Mismatch { original_len: source.len(), reformatted_len: reformatted.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn well_formed_feature_round_trips() {
        let src = "Feature: Eating\n\n  Scenario: Eating cucumbers\n    Given I have 12 cucumbers\n";
        assert_eq!(check(src, Path::new("t.feature")), CheckResult::Ok);
    }

    #[test]
    fn broken_feature_reports_parse_errors_not_mismatch() {
        let src = "Feature: Something\n  Given a\n";
        match check(src, Path::new("t.feature")) {
            CheckResult::ParseErrors(diags) => assert!(!diags.is_empty()),
            other => panic!("expected ParseErrors, got {other:?}"),
        }
    }

    #[test]
    fn outline_with_examples_round_trips() {
        let src = "Feature: F\n\n  Scenario Outline: O\n    Given I have role <role>\n\n    Examples: roles\n      | role  |\n      | admin |\n";
        assert_eq!(check(src, Path::new("t.feature")), CheckResult::Ok);
    }
}
