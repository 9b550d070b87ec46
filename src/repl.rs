//! Free-mode engine: resolve and execute ad-hoc step text against named
//! sessions, without a surrounding Feature/Scenario. It never tokenizes
//! or parses a `.feature` file — it just binds raw text against a
//! registry snapshot and executes it through the same per-step
//! machinery a scenario run uses.
//!
//! Sessions are named rather than one implicit global world, so a test
//! that needs to model more than one actor (two users in a chat,
//! client and server) can keep each actor's state separate without
//! juggling `Context` values by hand.

use std::collections::HashMap;

use crate::binder::{bind_step, Binding};
use crate::context::Context;
use crate::executor::{StepResult, StepStatus};
use crate::pickle::{AstNodeId, KeywordKind, PickleStep};
use crate::registry::StepDef;

const SESSION_LOCATION: &str = "<free-mode>";

fn ad_hoc_step(text: &str) -> PickleStep {
    PickleStep {
        id: format!("free-{text}"),
        text: text.to_string(),
        keyword_kind: KeywordKind::When,
        argument: None,
        ast_node_ids: vec![AstNodeId {
            location: crate::diagnostics::SourceLocation::new(SESSION_LOCATION, 0, 0),
        }],
    }
}

/// Owns every named session's [`Context`], keyed by session name. Not
/// internally synchronized — a caller driving this from multiple
/// threads must serialize access itself.
#[derive(Default)]
pub struct Repl {
    sessions: HashMap<String, Context>,
}

impl Repl {
    pub fn new() -> Self {
        Repl::default()
    }

    /// Resolve `text` against `stepdefs` and, on a unique match, run it
    /// against the default (unnamed) session's context.
    pub fn step(&mut self, text: &str, stepdefs: &[StepDef]) -> StepResult {
        self.free_step("", text, stepdefs)
    }

    /// Run `texts` in order against `session_name`'s context, halting at
    /// the first non-passing step.
    pub fn free(&mut self, session_name: &str, texts: &[&str], stepdefs: &[StepDef]) -> Vec<StepResult> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            let result = self.free_step(session_name, text, stepdefs);
            let halt = !matches!(result.status, StepStatus::Passed);
            results.push(result);
            if halt {
                break;
            }
        }
        results
    }

    fn free_step(&mut self, session_name: &str, text: &str, stepdefs: &[StepDef]) -> StepResult {
        let pickle_step = ad_hoc_step(text);
        let binding = bind_step(&pickle_step, stepdefs);

        match &binding {
            Binding::Undefined => StepResult {
                step_text: text.to_string(),
                status: StepStatus::Undefined,
                error: None,
                duration: std::time::Duration::ZERO,
            },
            Binding::Ambiguous { .. } => StepResult {
                step_text: text.to_string(),
                status: StepStatus::Ambiguous,
                error: None,
                duration: std::time::Duration::ZERO,
            },
            Binding::ArityMismatch { .. } => StepResult {
                step_text: text.to_string(),
                status: StepStatus::Undefined,
                error: None,
                duration: std::time::Duration::ZERO,
            },
            Binding::Bound { .. } => {
                let ctx = self.sessions.entry(session_name.to_string()).or_insert_with(Context::new);
                crate::executor::run_bound_step(&pickle_step, &binding, stepdefs, ctx)
            }
        }
    }

    pub fn reset_ctx(&mut self, session_name: &str) {
        self.sessions.insert(session_name.to_string(), Context::new());
    }

    pub fn reset_ctxs(&mut self) {
        self.sessions.clear();
    }

    pub fn ctx(&self, session_name: &str) -> Option<&Context> {
        self.sessions.get(session_name)
    }
}
