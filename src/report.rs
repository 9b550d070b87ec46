//! A pure transformation from a run's raw results into the
//! machine-readable [`Summary`] record. Printing is the CLI layer's
//! job — this module only builds the value, so it stays testable
//! without capturing stdout and reusable by anything that wants the
//! counts without the text rendering.

use serde::Serialize;

use crate::binder::{Alternative, PlanningIssue, PlanningIssueKind};
use crate::context::StepError;
use crate::executor::{ScenarioResult, ScenarioStatus, StepStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Passed,
    Failed,
    PlanningFailed,
    Crashed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Counts {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
    pub scenarios: usize,
    pub steps: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub scenario_name: String,
    pub step_text: String,
    pub error: ErrorDetail,
    pub binding_source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArityExpectation {
    pub expected: Vec<usize>,
    pub actual: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanningIssueType {
    Undefined,
    Ambiguous,
    InvalidArity,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlternativeRecord {
    pub id: String,
    pub pattern_src: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanningIssueRecord {
    #[serde(rename = "type")]
    pub kind: PlanningIssueType,
    pub step_text: String,
    pub alternatives: Vec<AlternativeRecord>,
    pub arity: Option<ArityExpectation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Planning {
    pub issues: Vec<PlanningIssueRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub run_id: String,
    pub exit_code: i32,
    pub status: RunStatus,
    pub counts: Counts,
    pub failures: Option<Vec<Failure>>,
    pub planning: Option<Planning>,
    pub error: Option<ErrorDetail>,
}

/// Build a [`Summary`] from a completed run's scenario results.
/// `run_id` is caller-supplied (the CLI stamps a fresh one per
/// invocation — generating it is an ambient, not core, concern, so it
/// is taken as a parameter rather than produced here).
pub fn summarize(run_id: impl Into<String>, results: &[ScenarioResult]) -> Summary {
    let mut counts = Counts { passed: 0, failed: 0, pending: 0, skipped: 0, scenarios: results.len(), steps: 0 };
    let mut failures = Vec::new();

    for scenario in results {
        for step in &scenario.steps {
            counts.steps += 1;
            match step.status {
                StepStatus::Passed => counts.passed += 1,
                StepStatus::Failed => counts.failed += 1,
                StepStatus::Pending => counts.pending += 1,
                StepStatus::Skipped => counts.skipped += 1,
                StepStatus::Undefined | StepStatus::Ambiguous => {}
            }
            if step.status == StepStatus::Failed {
                failures.push(Failure {
                    scenario_name: scenario.scenario_name.clone(),
                    step_text: step.step_text.clone(),
                    error: step_error_detail(step.error.as_ref()),
                    binding_source: None,
                });
            }
        }
    }

    let any_failed = results.iter().any(|r| r.status == ScenarioStatus::Failed);
    let status = if any_failed { RunStatus::Failed } else { RunStatus::Passed };
    let exit_code = if any_failed { 1 } else { 0 };

    Summary {
        run_id: run_id.into(),
        exit_code,
        status,
        counts,
        failures: if failures.is_empty() { None } else { Some(failures) },
        planning: None,
        error: None,
    }
}

fn step_error_detail(error: Option<&StepError>) -> ErrorDetail {
    match error {
        Some(e) => ErrorDetail { kind: "step-exception".to_string(), message: e.message.clone() },
        None => ErrorDetail { kind: "step-exception".to_string(), message: String::new() },
    }
}

/// Build a [`Summary`] for a run that never reached execution because
/// binding failed ("planning failed", exit code 2).
pub fn summarize_planning_failure(run_id: impl Into<String>, issues: &[PlanningIssue]) -> Summary {
    let records = issues
        .iter()
        .map(|issue| PlanningIssueRecord {
            kind: match issue.kind {
                PlanningIssueKind::Undefined => PlanningIssueType::Undefined,
                PlanningIssueKind::Ambiguous => PlanningIssueType::Ambiguous,
                PlanningIssueKind::InvalidArity => PlanningIssueType::InvalidArity,
            },
            step_text: issue.step_text.clone(),
            alternatives: issue.alternatives.iter().map(alternative_record).collect(),
            arity: issue
                .arity_actual
                .map(|actual| ArityExpectation { expected: issue.arity_expected.clone(), actual }),
        })
        .collect();

    Summary {
        run_id: run_id.into(),
        exit_code: 2,
        status: RunStatus::PlanningFailed,
        counts: Counts { passed: 0, failed: 0, pending: 0, skipped: 0, scenarios: 0, steps: 0 },
        failures: None,
        planning: Some(Planning { issues: records }),
        error: None,
    }
}

fn alternative_record(alt: &Alternative) -> AlternativeRecord {
    AlternativeRecord { id: alt.id.clone(), pattern_src: alt.pattern_src.clone(), source: alt.source.clone() }
}

/// Build a [`Summary`] for a crash outside the normal run lifecycle
/// (exit code 3).
pub fn summarize_crash(run_id: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Summary {
    Summary {
        run_id: run_id.into(),
        exit_code: 3,
        status: RunStatus::Crashed,
        counts: Counts { passed: 0, failed: 0, pending: 0, skipped: 0, scenarios: 0, steps: 0 },
        failures: None,
        planning: None,
        error: Some(ErrorDetail { kind: kind.into(), message: message.into() }),
    }
}
