//! Step definition registry: a map from pattern signature to
//! [`StepDef`], rejecting duplicates and variadic functions at
//! registration time rather than letting them surface as a confusing
//! failure later. One process-wide instance is exposed via [`global`];
//! binders consume a [`Registry::snapshot`] rather than holding the
//! lock during binding/execution, so a long-running suite doesn't block
//! new registrations (or each other) for its whole duration.
//!
//! Step definitions are kept in one flat, signature-keyed map rather
//! than partitioned by keyword kind — And/But/`*` steps resolve to a
//! concrete Given/When/Then only at bind time, so partitioning the
//! registry itself by keyword would just mean re-deriving that mapping
//! on every lookup.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::context::{Context, StepOutcome};
use crate::error::{Result, ShiftlefterError};

pub type StepFn = Arc<dyn Fn(&[String], &mut Context) -> StepOutcome + Send + Sync>;

#[derive(Debug, Clone)]
pub struct StepSource {
    pub file: String,
    pub line: usize,
}

impl std::fmt::Display for StepSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Clone)]
pub struct StepDef {
    pub id: String,
    pub pattern: Regex,
    pub pattern_src: String,
    /// Declared arity: number of capture groups the step fn expects,
    /// *not* counting the implicit trailing `Context` argument — the
    /// binder treats a match as valid at either `n` or `n+1`, since a
    /// step fn may or may not want the context parameter.
    pub arity: usize,
    pub source: StepSource,
    pub f: StepFn,
}

impl std::fmt::Debug for StepDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDef")
            .field("id", &self.id)
            .field("pattern_src", &self.pattern_src)
            .field("arity", &self.arity)
            .field("source", &self.source)
            .finish()
    }
}

fn stepdef_id(pattern_src: &str) -> String {
    let digest = Sha256::digest(pattern_src.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    format!("sd-{}", &hex[..16])
}

fn signature(pattern_src: &str, flags: &str) -> String {
    format!("{pattern_src}|{flags}")
}

/// Insertion-order-stable store of registered step definitions.
#[derive(Default)]
pub struct Registry {
    by_signature: BTreeMap<String, usize>,
    defs: Vec<StepDef>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a step definition. `arity` is the number of positional
    /// captures the function expects, declared by the caller at
    /// registration time rather than inferred by reflection. A variadic
    /// arity (`usize::MAX`, the sentinel for "accepts any number of
    /// captures") is rejected outright.
    pub fn register(
        &mut self,
        pattern_src: &str,
        arity: usize,
        source: StepSource,
        f: StepFn,
    ) -> Result<&StepDef> {
        if arity == usize::MAX {
            return Err(ShiftlefterError::StepDefVariadic { pattern: pattern_src.to_string() });
        }

        let pattern = Regex::new(pattern_src).map_err(|source| ShiftlefterError::InvalidPattern {
            pattern: pattern_src.to_string(),
            source,
        })?;

        let sig = signature(pattern_src, pattern.as_str());
        if let Some(&existing_index) = self.by_signature.get(&sig) {
            let existing = &self.defs[existing_index];
            return Err(ShiftlefterError::StepDefDuplicate {
                pattern: pattern_src.to_string(),
                first: existing.source.to_string(),
                second: source.to_string(),
            });
        }

        let def = StepDef {
            id: stepdef_id(pattern_src),
            pattern,
            pattern_src: pattern_src.to_string(),
            arity,
            source,
            f,
        };
        log::debug!("registered step definition {} `{}`", def.id, def.pattern_src);

        let index = self.defs.len();
        self.by_signature.insert(sig, index);
        self.defs.push(def);
        Ok(&self.defs[index])
    }

    /// Iteration-order-stable (insertion order) snapshot, needed for
    /// deterministic "first match" / ambiguity reporting.
    pub fn all_stepdefs(&self) -> &[StepDef] {
        &self.defs
    }

    /// Test isolation: drop every registered step definition.
    pub fn clear(&mut self) {
        self.by_signature.clear();
        self.defs.clear();
    }

    pub fn snapshot(&self) -> Vec<StepDef> {
        self.defs.clone()
    }
}

static GLOBAL: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::new()));

/// The process-wide registry guarded by a single mutex.
pub fn global() -> &'static Mutex<Registry> {
    &GLOBAL
}
