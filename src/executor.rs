//! Runs a bound [`Plan`] scenario by scenario, threading a fresh
//! [`Context`] through each step in order. A step function normally
//! reports failure by returning [`StepOutcome::Fail`], but a panic
//! inside one is caught too — an unexpected panic in a step shouldn't
//! take the whole run down with it, so it's treated the same as a
//! reported failure.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use crate::binder::{Binding, Plan};
use crate::context::{Context, StepError, StepOutcome};
use crate::pickle::PickleStep;
use crate::registry::StepDef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StepStatus {
    Passed,
    Pending,
    Failed,
    Undefined,
    Ambiguous,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct StepResult {
    pub step_text: String,
    pub status: StepStatus,
    pub error: Option<StepError>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScenarioStatus {
    Passed,
    Pending,
    Ambiguous,
    Undefined,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub status: ScenarioStatus,
    pub steps: Vec<StepResult>,
}

/// Execute one step given its resolved binding. An unresolved binding
/// (Undefined/Ambiguous/ArityMismatch) is translated directly into a
/// `StepResult` without invoking any step function.
pub fn run_bound_step(step: &PickleStep, binding: &Binding, stepdefs: &[StepDef], ctx: &mut Context) -> StepResult {
    let start = Instant::now();
    match binding {
        Binding::Undefined => StepResult {
            step_text: step.text.clone(),
            status: StepStatus::Undefined,
            error: None,
            duration: start.elapsed(),
        },
        Binding::Ambiguous { .. } => StepResult {
            step_text: step.text.clone(),
            status: StepStatus::Ambiguous,
            error: None,
            duration: start.elapsed(),
        },
        Binding::ArityMismatch { .. } => StepResult {
            step_text: step.text.clone(),
            status: StepStatus::Undefined,
            error: None,
            duration: start.elapsed(),
        },
        Binding::Bound { stepdef_id, captures } => {
            let def = stepdefs.iter().find(|d| &d.id == stepdef_id);
            let def = match def {
                Some(d) => d,
                None => {
                    return StepResult {
                        step_text: step.text.clone(),
                        status: StepStatus::Undefined,
                        error: None,
                        duration: start.elapsed(),
                    }
                }
            };

            let f = def.f.clone();
            let captures_owned = captures.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&captures_owned, &mut *ctx)));

            let (status, error, merge) = match outcome {
                Ok(StepOutcome::Continue(merge)) => (StepStatus::Passed, None, merge),
                Ok(StepOutcome::Pending) => (StepStatus::Pending, None, None),
                Ok(StepOutcome::Fail(e)) => (StepStatus::Failed, Some(e), None),
                Err(payload) => {
                    let message = panic_message(&payload);
                    log::error!("step panicked: {message}");
                    (StepStatus::Failed, Some(StepError::new(message)), None)
                }
            };

            if let Some(update) = merge {
                ctx.merge(update);
            }

            StepResult { step_text: step.text.clone(), status, error, duration: start.elapsed() }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "step panicked with a non-string payload".to_string()
    }
}

/// Run one scenario plan to completion, skipping remaining steps once
/// one fails to pass cleanly.
pub fn run_scenario(plan: &Plan, stepdefs: &[StepDef]) -> ScenarioResult {
    let mut ctx = Context::new();
    let mut results = Vec::with_capacity(plan.bindings.len());
    let mut halted = false;

    for (step, binding) in plan.pickle.steps.iter().zip(&plan.bindings) {
        if halted {
            results.push(StepResult {
                step_text: step.text.clone(),
                status: StepStatus::Skipped,
                error: None,
                duration: Duration::ZERO,
            });
            continue;
        }

        let result = run_bound_step(step, binding, stepdefs, &mut ctx);
        if matches!(result.status, StepStatus::Failed | StepStatus::Pending | StepStatus::Undefined | StepStatus::Ambiguous) {
            halted = true;
        }
        results.push(result);
    }

    ScenarioResult {
        scenario_name: plan.pickle.name.clone(),
        status: aggregate_status(&results),
        steps: results,
    }
}

/// Run every plan in a bind suite, in the order the pickles were
/// compiled.
pub fn run_suite(plans: &[Plan], stepdefs: &[StepDef]) -> Vec<ScenarioResult> {
    plans.iter().map(|p| run_scenario(p, stepdefs)).collect()
}

/// A scenario's status is its single worst step: `failed > undefined >
/// ambiguous > pending > passed`.
fn aggregate_status(steps: &[StepResult]) -> ScenarioStatus {
    let mut status = ScenarioStatus::Passed;
    for step in steps {
        let candidate = match step.status {
            StepStatus::Failed => ScenarioStatus::Failed,
            StepStatus::Undefined => ScenarioStatus::Undefined,
            StepStatus::Ambiguous => ScenarioStatus::Ambiguous,
            StepStatus::Pending => ScenarioStatus::Pending,
            StepStatus::Passed | StepStatus::Skipped => ScenarioStatus::Passed,
        };
        if candidate > status {
            status = candidate;
        }
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind_suite;
    use crate::diagnostics::SourceLocation;
    use crate::pickle::{AstNodeId, KeywordKind, Pickle};
    use crate::registry::{Registry, StepSource};
    use std::sync::Arc;

    fn pickle_with_steps(texts: &[&str]) -> Pickle {
        Pickle {
            id: "p1".into(),
            uri: "test.feature".into(),
            name: "S".into(),
            language: "en".into(),
            tags: vec![],
            steps: texts
                .iter()
                .enumerate()
                .map(|(i, text)| PickleStep {
                    id: format!("ps-{i}"),
                    text: text.to_string(),
                    keyword_kind: KeywordKind::Given,
                    argument: None,
                    ast_node_ids: vec![AstNodeId { location: SourceLocation::new("test.feature", i + 1, 1) }],
                })
                .collect(),
        }
    }

    #[test]
    fn passing_steps_merge_context_and_scenario_passes() {
        let mut reg = Registry::new();
        reg.register(
            "^I set (\\w+) to (\\d+)$",
            2,
            StepSource { file: "f".into(), line: 1 },
            Arc::new(|captures: &[String], _ctx: &mut Context| {
                let mut update = Context::new();
                update.set(captures[0].clone(), captures[1].parse::<i64>().unwrap());
                StepOutcome::Continue(Some(update))
            }),
        )
        .unwrap();
        let snapshot = reg.snapshot();

        let pickle = pickle_with_steps(&["I set x to 5"]);
        let suite = bind_suite(&[pickle], &snapshot);
        assert!(suite.runnable);

        let results = run_suite(&suite.plans, &snapshot);
        assert_eq!(results[0].status, ScenarioStatus::Passed);
        assert_eq!(results[0].steps[0].status, StepStatus::Passed);
    }

    #[test]
    fn failure_skips_remaining_steps() {
        let mut reg = Registry::new();
        reg.register(
            "^this fails$",
            0,
            StepSource { file: "f".into(), line: 1 },
            Arc::new(|_c: &[String], _ctx: &mut Context| StepOutcome::Fail(StepError::new("boom"))),
        )
        .unwrap();
        reg.register(
            "^this passes$",
            0,
            StepSource { file: "f".into(), line: 2 },
            Arc::new(|_c: &[String], _ctx: &mut Context| StepOutcome::Continue(None)),
        )
        .unwrap();
        let snapshot = reg.snapshot();

        let pickle = pickle_with_steps(&["this fails", "this passes"]);
        let suite = bind_suite(&[pickle], &snapshot);
        let results = run_suite(&suite.plans, &snapshot);

        assert_eq!(results[0].status, ScenarioStatus::Failed);
        assert_eq!(results[0].steps[0].status, StepStatus::Failed);
        assert_eq!(results[0].steps[1].status, StepStatus::Skipped);
    }

    #[test]
    fn panicking_step_is_caught_and_reported_as_failed() {
        let mut reg = Registry::new();
        reg.register(
            "^this panics$",
            0,
            StepSource { file: "f".into(), line: 1 },
            Arc::new(|_c: &[String], _ctx: &mut Context| panic!("kaboom")),
        )
        .unwrap();
        let snapshot = reg.snapshot();

        let pickle = pickle_with_steps(&["this panics"]);
        let suite = bind_suite(&[pickle], &snapshot);

        let prev_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let results = run_suite(&suite.plans, &snapshot);
        panic::set_hook(prev_hook);

        assert_eq!(results[0].status, ScenarioStatus::Failed);
        assert!(results[0].steps[0].error.as_ref().unwrap().message.contains("kaboom"));
    }

    #[test]
    fn undefined_step_marks_scenario_undefined() {
        let reg = Registry::new();
        let pickle = pickle_with_steps(&["nothing registered"]);
        let suite = bind_suite(&[pickle], reg.all_stepdefs());
        let results = run_suite(&suite.plans, reg.all_stepdefs());
        assert_eq!(results[0].status, ScenarioStatus::Undefined);
    }
}
