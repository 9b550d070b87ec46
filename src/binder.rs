//! Matches each pickle step against a registry snapshot, classifying the
//! result as `Bound`, `Undefined`, `Ambiguous` or `ArityMismatch` before
//! any step is executed. Separating this from execution lets a whole
//! suite's bindings be checked up front, so a run can fail before any
//! step's side effects happen.
//!
//! Arity is validated here too, rather than left for the step function
//! to discover by panicking on a bad destructure — an arity mismatch is
//! classified as a `Plan` diagnostic like any other unresolved binding.

use crate::pickle::{Pickle, PickleStep};
use crate::registry::StepDef;

#[derive(Debug, Clone)]
pub struct Alternative {
    pub id: String,
    pub pattern_src: String,
    pub source: String,
}

#[derive(Debug, Clone)]
pub enum Binding {
    Bound { stepdef_id: String, captures: Vec<String> },
    Undefined,
    Ambiguous { alternatives: Vec<Alternative> },
    ArityMismatch { expected_set: Vec<usize>, actual: usize },
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub pickle: Pickle,
    pub bindings: Vec<Binding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PlanningIssueKind {
    Undefined,
    Ambiguous,
    InvalidArity,
}

#[derive(Debug, Clone)]
pub struct PlanningIssue {
    pub kind: PlanningIssueKind,
    pub step_text: String,
    pub alternatives: Vec<Alternative>,
    pub arity_expected: Vec<usize>,
    pub arity_actual: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct BindSuite {
    pub plans: Vec<Plan>,
    pub runnable: bool,
    pub diagnostics: Vec<PlanningIssue>,
}

/// Bind a single pickle step against a stepdef snapshot.
pub fn bind_step(step: &PickleStep, stepdefs: &[StepDef]) -> Binding {
    let matches: Vec<&StepDef> = stepdefs
        .iter()
        .filter(|def| is_full_match(&def.pattern, &step.text))
        .collect();

    match matches.len() {
        0 => Binding::Undefined,
        1 => {
            let def = matches[0];
            let captures = capture_groups(&def.pattern, &step.text);
            let n = captures.len();
            if def.arity == n || def.arity == n + 1 {
                Binding::Bound { stepdef_id: def.id.clone(), captures }
            } else {
                Binding::ArityMismatch { expected_set: vec![n, n + 1], actual: def.arity }
            }
        }
        _ => Binding::Ambiguous {
            alternatives: matches
                .iter()
                .map(|def| Alternative {
                    id: def.id.clone(),
                    pattern_src: def.pattern_src.clone(),
                    source: def.source.to_string(),
                })
                .collect(),
        },
    }
}

fn is_full_match(pattern: &regex::Regex, text: &str) -> bool {
    match pattern.find(text) {
        Some(m) => m.start() == 0 && m.end() == text.len(),
        None => false,
    }
}

fn capture_groups(pattern: &regex::Regex, text: &str) -> Vec<String> {
    pattern
        .captures(text)
        .map(|caps| {
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default()
}

/// Bind every pickle in `pickles` against `stepdefs`, producing one
/// [`Plan`] per pickle plus a flat, deduplicated list of planning
/// issues for the report layer.
pub fn bind_suite(pickles: &[Pickle], stepdefs: &[StepDef]) -> BindSuite {
    let mut plans = Vec::with_capacity(pickles.len());
    let mut diagnostics = Vec::new();
    let mut runnable = true;

    for pickle in pickles {
        let bindings: Vec<Binding> = pickle.steps.iter().map(|s| bind_step(s, stepdefs)).collect();

        for (step, binding) in pickle.steps.iter().zip(&bindings) {
            match binding {
                Binding::Undefined => {
                    runnable = false;
                    log::warn!("undefined step: {}", step.text);
                    diagnostics.push(PlanningIssue {
                        kind: PlanningIssueKind::Undefined,
                        step_text: step.text.clone(),
                        alternatives: Vec::new(),
                        arity_expected: Vec::new(),
                        arity_actual: None,
                    });
                }
                Binding::Ambiguous { alternatives } => {
                    runnable = false;
                    log::warn!("ambiguous step: {} ({} candidates)", step.text, alternatives.len());
                    diagnostics.push(PlanningIssue {
                        kind: PlanningIssueKind::Ambiguous,
                        step_text: step.text.clone(),
                        alternatives: alternatives.clone(),
                        arity_expected: Vec::new(),
                        arity_actual: None,
                    });
                }
                Binding::ArityMismatch { expected_set, actual } => {
                    runnable = false;
                    log::warn!("arity mismatch for step: {} (expected {:?}, got {})", step.text, expected_set, actual);
                    diagnostics.push(PlanningIssue {
                        kind: PlanningIssueKind::InvalidArity,
                        step_text: step.text.clone(),
                        alternatives: Vec::new(),
                        arity_expected: expected_set.clone(),
                        arity_actual: Some(*actual),
                    });
                }
                Binding::Bound { .. } => {}
            }
        }

        plans.push(Plan { pickle: pickle.clone(), bindings });
    }

    BindSuite { plans, runnable, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, StepOutcome};
    use crate::registry::{Registry, StepSource};
    use std::sync::Arc;

    fn pickle_with_step(text: &str) -> Pickle {
        use crate::pickle::{AstNodeId, KeywordKind};
        use crate::diagnostics::SourceLocation;

        Pickle {
            id: "p1".into(),
            uri: "test.feature".into(),
            name: "S".into(),
            language: "en".into(),
            tags: vec![],
            steps: vec![PickleStep {
                id: "ps-1".into(),
                text: text.to_string(),
                keyword_kind: KeywordKind::Given,
                argument: None,
                ast_node_ids: vec![AstNodeId { location: SourceLocation::new("test.feature", 1, 1) }],
            }],
        }
    }

    fn noop() -> crate::registry::StepFn {
        Arc::new(|_captures, _ctx| StepOutcome::Continue(None))
    }

    #[test]
    fn exact_single_match_binds() {
        let mut reg = Registry::new();
        reg.register("^I have (\\d+) cukes$", 1, StepSource { file: "f".into(), line: 1 }, noop()).unwrap();
        let snapshot = reg.snapshot();

        let pickle = pickle_with_step("I have 12 cukes");
        let binding = bind_step(&pickle.steps[0], &snapshot);
        match binding {
            Binding::Bound { captures, .. } => assert_eq!(captures, vec!["12".to_string()]),
            other => panic!("expected Bound, got {other:?}"),
        }
    }

    #[test]
    fn zero_matches_is_undefined() {
        let reg = Registry::new();
        let pickle = pickle_with_step("nothing registered");
        let binding = bind_step(&pickle.steps[0], reg.all_stepdefs());
        assert!(matches!(binding, Binding::Undefined));
    }

    #[test]
    fn two_matches_is_ambiguous() {
        let mut reg = Registry::new();
        reg.register("^I have (\\d+) cukes$", 1, StepSource { file: "f".into(), line: 1 }, noop()).unwrap();
        reg.register("^I have (.+)$", 1, StepSource { file: "f".into(), line: 2 }, noop()).unwrap();
        let snapshot = reg.snapshot();

        let pickle = pickle_with_step("I have 12 cukes");
        let binding = bind_step(&pickle.steps[0], &snapshot);
        match binding {
            Binding::Ambiguous { alternatives } => assert_eq!(alternatives.len(), 2),
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn substring_match_is_not_accepted() {
        let mut reg = Registry::new();
        reg.register("I have (\\d+) cukes", 1, StepSource { file: "f".into(), line: 1 }, noop()).unwrap();
        let snapshot = reg.snapshot();

        let pickle = pickle_with_step("well, I have 12 cukes indeed");
        let binding = bind_step(&pickle.steps[0], &snapshot);
        assert!(matches!(binding, Binding::Undefined));
    }

    #[test]
    fn wrong_arity_is_reported() {
        let mut reg = Registry::new();
        reg.register("^I have (\\d+) cukes$", 3, StepSource { file: "f".into(), line: 1 }, noop()).unwrap();
        let snapshot = reg.snapshot();

        let pickle = pickle_with_step("I have 12 cukes");
        let binding = bind_step(&pickle.steps[0], &snapshot);
        match binding {
            Binding::ArityMismatch { expected_set, actual } => {
                assert_eq!(expected_set, vec![1, 2]);
                assert_eq!(actual, 3);
            }
            other => panic!("expected ArityMismatch, got {other:?}"),
        }
    }

    #[test]
    fn bind_suite_is_not_runnable_when_any_step_is_undefined() {
        let reg = Registry::new();
        let pickle = pickle_with_step("anything");
        let suite = bind_suite(&[pickle], reg.all_stepdefs());
        assert!(!suite.runnable);
        assert_eq!(suite.diagnostics.len(), 1);
    }
}
