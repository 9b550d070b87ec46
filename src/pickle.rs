//! Flattens a parsed [`Feature`] into an ordered list of self-contained
//! [`Pickle`]s, one per concrete scenario execution — a plain
//! `Scenario` yields exactly one, a `ScenarioOutline` yields one per
//! Examples row with its `<col>` placeholders substituted.
//!
//! Each pickle is built as a standalone value rather than produced by
//! mutating the source `Step` in place, so the original AST stays
//! untouched for the formatter and roundtrip verifier to use
//! independently. Pickle ids are derived via UUIDv5 from the feature
//! URI and row position, so recompiling the same file twice yields the
//! same ids.

use uuid::Uuid;

use crate::ast::*;
use crate::diagnostics::{Diagnostic, DiagnosticKind, SourceLocation};
use crate::lexer::StepKeyword;
use crate::parser::resolve_keyword_kind;
use crate::template::Template;

/// Namespace used to derive stable pickle ids via UUIDv5. Arbitrary but
/// fixed, the way a URL namespace is fixed for `Uuid::new_v5` callers.
const PICKLE_NAMESPACE: Uuid = Uuid::from_bytes([
    0x3a, 0x9e, 0x70, 0x1e, 0x4b, 0x0d, 0x4f, 0x3f, 0x9c, 0x2a, 0x6e, 0x51, 0x8d, 0x0c, 0x77, 0x11,
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Given,
    When,
    Then,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickleArgument {
    DocString { content_type: Option<String>, content: String },
    DataTable { rows: Vec<Vec<String>> },
}

/// An AST location a `PickleStep` was produced from — the outline step
/// itself, plus the Examples row when expansion substituted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNodeId {
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickleStep {
    pub id: String,
    pub text: String,
    pub keyword_kind: KeywordKind,
    pub argument: Option<PickleArgument>,
    pub ast_node_ids: Vec<AstNodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pickle {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub language: String,
    pub tags: Vec<String>,
    pub steps: Vec<PickleStep>,
}

/// Compile every scenario and outline row in `feature` into pickles, in
/// document order. `uri` identifies the feature file and feeds into
/// each pickle's id. Diagnostics accumulate `undefined-placeholder`
/// entries; they never suppress pickle generation — an unresolved
/// placeholder is left verbatim in the rendered text (see
/// [`Template::render`]).
pub fn compile(feature: &Feature, uri: &str) -> (Vec<Pickle>, Vec<Diagnostic>) {
    let mut pickles = Vec::new();
    let mut diagnostics = Vec::new();

    let feature_background_steps = feature.background().map(|b| b.steps.as_slice()).unwrap_or(&[]);

    for scenario_ref in feature.walk_scenarios() {
        let rule_background = scenario_ref.rule.and_then(|r| r.background.as_ref());
        let rule_tags: Vec<String> = scenario_ref.rule.map(|r| r.tags.clone()).unwrap_or_default();

        match scenario_ref.scenario {
            ScenarioOrOutline::Scenario(scenario) => {
                let mut tags = feature.tags.clone();
                tags.extend(rule_tags.clone());
                tags.extend(scenario.tags.clone());
                dedup_preserve_order(&mut tags);

                let steps = compile_steps(
                    feature_background_steps,
                    rule_background.map(|b| b.steps.as_slice()).unwrap_or(&[]),
                    &scenario.steps,
                );

                let pickle_id = pickle_id(uri, scenario.location.line, 0);
                pickles.push(Pickle {
                    id: pickle_id,
                    uri: uri.to_string(),
                    name: scenario.name.clone(),
                    language: feature.language.clone(),
                    tags,
                    steps,
                });
            }
            ScenarioOrOutline::Outline(outline) => {
                for examples in &outline.examples {
                    let mut base_tags = feature.tags.clone();
                    base_tags.extend(rule_tags.clone());
                    base_tags.extend(outline.tags.clone());
                    base_tags.extend(examples.tags.clone());
                    dedup_preserve_order(&mut base_tags);

                    for (row_index, row) in examples.rows.iter().enumerate() {
                        let lookup = |name: &str| {
                            examples
                                .header
                                .cells
                                .iter()
                                .position(|h| h == name)
                                .and_then(|i| row.cells.get(i).cloned())
                        };

                        let steps = compile_outline_steps(
                            feature_background_steps,
                            rule_background.map(|b| b.steps.as_slice()).unwrap_or(&[]),
                            &outline.steps,
                            &lookup,
                            row,
                            &mut diagnostics,
                        );

                        let pickle_id = pickle_id(uri, outline.location.line, row_index + 1);
                        pickles.push(Pickle {
                            id: pickle_id,
                            uri: uri.to_string(),
                            name: outline.name.clone(),
                            language: feature.language.clone(),
                            tags: base_tags.clone(),
                            steps,
                        });
                    }
                }
            }
        }
    }

    (pickles, diagnostics)
}

fn pickle_id(uri: &str, line: usize, row_index: usize) -> String {
    let key = format!("{uri}#{line}#{row_index}");
    Uuid::new_v5(&PICKLE_NAMESPACE, key.as_bytes()).to_string()
}

fn dedup_preserve_order(tags: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    tags.retain(|t| seen.insert(t.clone()));
}

fn compile_steps(
    feature_background: &[Step],
    rule_background: &[Step],
    scenario_steps: &[Step],
) -> Vec<PickleStep> {
    let mut out = Vec::new();
    out.extend(plain_pickle_steps(feature_background));
    out.extend(plain_pickle_steps(rule_background));
    out.extend(plain_pickle_steps(scenario_steps));
    out
}

fn plain_pickle_steps(steps: &[Step]) -> Vec<PickleStep> {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let argument = step.argument.as_ref().map(|arg| match arg {
                StepArgument::DocString(doc) => PickleArgument::DocString {
                    content_type: doc.content_type.clone(),
                    content: doc.lines.join("\n"),
                },
                StepArgument::DataTable(table) => PickleArgument::DataTable {
                    rows: table.rows.iter().map(|r| r.cells.clone()).collect(),
                },
            });
            PickleStep {
                id: format!("ps-{}", short_hash(&format!("{}#{}", step.location, i))),
                text: step.text.clone(),
                keyword_kind: keyword_kind(resolve_keyword_kind(steps, i)),
                argument,
                ast_node_ids: vec![AstNodeId { location: step.location.clone() }],
            }
        })
        .collect()
}

fn compile_outline_steps(
    feature_background: &[Step],
    rule_background: &[Step],
    outline_steps: &[Step],
    lookup: &impl Fn(&str) -> Option<String>,
    row: &Row,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<PickleStep> {
    let mut out = Vec::new();
    out.extend(plain_pickle_steps(feature_background));
    out.extend(plain_pickle_steps(rule_background));

    for (i, step) in outline_steps.iter().enumerate() {
        let text_template = Template::parse(&step.text);
        let (text, unresolved) = text_template.render(lookup);
        for name in &unresolved {
            diagnostics.push(Diagnostic::new(
                row.location.clone(),
                DiagnosticKind::UndefinedPlaceholder,
                format!("Placeholder `<{name}>` has no matching Examples column"),
            ));
        }

        let argument = step.argument.as_ref().map(|arg| match arg {
            StepArgument::DocString(doc) => {
                let content_template = Template::parse(&doc.lines.join("\n"));
                let (content, unresolved) = content_template.render(lookup);
                for name in &unresolved {
                    diagnostics.push(Diagnostic::new(
                        row.location.clone(),
                        DiagnosticKind::UndefinedPlaceholder,
                        format!("Placeholder `<{name}>` has no matching Examples column"),
                    ));
                }
                PickleArgument::DocString { content_type: doc.content_type.clone(), content }
            }
            StepArgument::DataTable(table) => {
                let rows = table
                    .rows
                    .iter()
                    .map(|r| {
                        r.cells
                            .iter()
                            .map(|cell| {
                                let (rendered, unresolved) = Template::parse(cell).render(lookup);
                                for name in &unresolved {
                                    diagnostics.push(Diagnostic::new(
                                        row.location.clone(),
                                        DiagnosticKind::UndefinedPlaceholder,
                                        format!("Placeholder `<{name}>` has no matching Examples column"),
                                    ));
                                }
                                rendered
                            })
                            .collect()
                    })
                    .collect();
                PickleArgument::DataTable { rows }
            }
        });

        out.push(PickleStep {
            id: format!("ps-{}", short_hash(&format!("{}#{}", step.location, i))),
            text,
            keyword_kind: keyword_kind(resolve_keyword_kind(outline_steps, i)),
            argument,
            ast_node_ids: vec![
                AstNodeId { location: step.location.clone() },
                AstNodeId { location: row.location.clone() },
            ],
        });
    }

    out
}

fn keyword_kind(step_keyword: StepKeyword) -> KeywordKind {
    match step_keyword {
        StepKeyword::Given => KeywordKind::Given,
        StepKeyword::When => KeywordKind::When,
        StepKeyword::Then => KeywordKind::Then,
        StepKeyword::And | StepKeyword::But | StepKeyword::Star => {
            unreachable!("resolve_keyword_kind never returns a connector keyword")
        }
    }
}

fn short_hash(input: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::path::Path;

    fn compile_src(src: &str) -> (Vec<Pickle>, Vec<Diagnostic>) {
        let result = parse(src, Path::new("test.feature"));
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        compile(&result.feature.unwrap(), "test.feature")
    }

    #[test]
    fn plain_scenario_becomes_one_pickle() {
        let src = "Feature: F\n\n  Scenario: S\n    Given a\n    When b\n    Then c\n";
        let (pickles, diags) = compile_src(src);
        assert!(diags.is_empty());
        assert_eq!(pickles.len(), 1);
        assert_eq!(pickles[0].steps.len(), 3);
        assert_eq!(pickles[0].steps[0].keyword_kind, KeywordKind::Given);
    }

    #[test]
    fn background_steps_are_prepended() {
        let src = "Feature: F\n\n  Background: B\n    Given setup\n\n  Scenario: S\n    When b\n";
        let (pickles, _) = compile_src(src);
        assert_eq!(pickles[0].steps.len(), 2);
        assert_eq!(pickles[0].steps[0].text, "setup");
    }

    #[test]
    fn outline_expands_one_pickle_per_row() {
        let src = "Feature: F\n\n  Scenario Outline: O\n    Given I have role <role>\n\n    Examples:\n      | role  |\n      | admin |\n      | user  |\n";
        let (pickles, diags) = compile_src(src);
        assert!(diags.is_empty());
        assert_eq!(pickles.len(), 2);
        assert_eq!(pickles[0].steps[0].text, "I have role admin");
        assert_eq!(pickles[1].steps[0].text, "I have role user");
        assert_ne!(pickles[0].id, pickles[1].id);
    }

    #[test]
    fn unresolved_placeholder_is_a_diagnostic() {
        let src = "Feature: F\n\n  Scenario Outline: O\n    Given I have role <missing>\n\n    Examples:\n      | role  |\n      | admin |\n";
        let (pickles, diags) = compile_src(src);
        assert_eq!(pickles[0].steps[0].text, "I have role <missing>");
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::UndefinedPlaceholder));
    }

    #[test]
    fn tags_inherit_from_feature_rule_and_scenario() {
        let src = "@feat\nFeature: F\n\n  @rule\n  Rule: R\n\n    @scn\n    Scenario: S\n      Given a\n";
        let (pickles, _) = compile_src(src);
        assert_eq!(pickles[0].tags, vec!["@feat".to_string(), "@rule".to_string(), "@scn".to_string()]);
    }

    #[test]
    fn connector_steps_resolve_to_preceding_concrete_kind() {
        let src = "Feature: F\n\n  Scenario: S\n    Given a\n    And b\n    When c\n    But d\n";
        let (pickles, _) = compile_src(src);
        let kinds: Vec<_> = pickles[0].steps.iter().map(|s| s.keyword_kind).collect();
        assert_eq!(kinds, vec![KeywordKind::Given, KeywordKind::Given, KeywordKind::When, KeywordKind::When]);
    }
}
