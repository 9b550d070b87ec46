//! The parse tree. Every node carries a [`SourceLocation`] so diagnostics
//! and the roundtrip verifier ([`crate::roundtrip`]) can point back at
//! exact source positions; the roundtrip verifier masks these locations
//! when comparing two trees for structural equality.
//!
//! `Rule` and `ScenarioOutline` are distinct node kinds rather than
//! flavors of `Scenario`, and `DocString`/`DataTable` share a single
//! `StepArgument` enum, since a step carries at most one of either.

use crate::diagnostics::SourceLocation;
pub use crate::lexer::StepKeyword;

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub language: String,
    pub tags: Vec<String>,
    pub name: String,
    pub description: String,
    pub children: Vec<Child>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Rule(Rule),
    Background(Background),
    Scenario(Scenario),
    ScenarioOutline(ScenarioOutline),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub tags: Vec<String>,
    pub name: String,
    pub description: String,
    pub background: Option<Background>,
    pub scenarios: Vec<RuleChild>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleChild {
    Scenario(Scenario),
    ScenarioOutline(ScenarioOutline),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub tags: Vec<String>,
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioOutline {
    pub tags: Vec<String>,
    pub name: String,
    pub description: String,
    pub steps: Vec<Step>,
    pub examples: Vec<Examples>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Examples {
    pub tags: Vec<String>,
    pub name: String,
    pub description: String,
    pub header: Row,
    pub rows: Vec<Row>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub keyword: StepKeyword,
    pub keyword_text: String,
    pub text: String,
    pub argument: Option<StepArgument>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepArgument {
    DocString(DocString),
    DataTable(DataTable),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStringDelim {
    TripleQuote,
    TripleBacktick,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocString {
    pub delim: DocStringDelim,
    pub content_type: Option<String>,
    pub lines: Vec<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    pub rows: Vec<Row>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<String>,
    pub location: SourceLocation,
}

impl Feature {
    /// All scenarios and scenario outlines reachable from this feature,
    /// in document order, paired with the enclosing rule's tags (empty
    /// if the scenario sits directly under the feature).
    pub fn walk_scenarios(&self) -> Vec<ScenarioRef<'_>> {
        let mut out = Vec::new();
        for child in &self.children {
            match child {
                Child::Scenario(s) => out.push(ScenarioRef {
                    rule: None,
                    scenario: ScenarioOrOutline::Scenario(s),
                }),
                Child::ScenarioOutline(o) => out.push(ScenarioRef {
                    rule: None,
                    scenario: ScenarioOrOutline::Outline(o),
                }),
                Child::Rule(r) => {
                    for rc in &r.scenarios {
                        out.push(ScenarioRef {
                            rule: Some(r),
                            scenario: match rc {
                                RuleChild::Scenario(s) => ScenarioOrOutline::Scenario(s),
                                RuleChild::ScenarioOutline(o) => ScenarioOrOutline::Outline(o),
                            },
                        });
                    }
                }
                Child::Background(_) => {}
            }
        }
        out
    }

    /// The feature-level background, if any (must precede all rules).
    pub fn background(&self) -> Option<&Background> {
        self.children.iter().find_map(|c| match c {
            Child::Background(b) => Some(b),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ScenarioOrOutline<'a> {
    Scenario(&'a Scenario),
    Outline(&'a ScenarioOutline),
}

#[derive(Debug, Clone, Copy)]
pub struct ScenarioRef<'a> {
    pub rule: Option<&'a Rule>,
    pub scenario: ScenarioOrOutline<'a>,
}

impl<'a> ScenarioRef<'a> {
    pub fn tags(&self) -> Vec<String> {
        match self.scenario {
            ScenarioOrOutline::Scenario(s) => s.tags.clone(),
            ScenarioOrOutline::Outline(o) => o.tags.clone(),
        }
    }

    pub fn name(&self) -> &str {
        match self.scenario {
            ScenarioOrOutline::Scenario(s) => &s.name,
            ScenarioOrOutline::Outline(o) => &o.name,
        }
    }

    pub fn steps(&self) -> &[Step] {
        match self.scenario {
            ScenarioOrOutline::Scenario(s) => &s.steps,
            ScenarioOrOutline::Outline(o) => &o.steps,
        }
    }
}

/// Structural equality ignoring locations (used by the roundtrip
/// verifier). Walks a cloned tree and overwrites every location before
/// comparing, rather than deriving a second `PartialEq` that skips the
/// location fields — one walker is easier to keep in sync with the tree
/// shape than two equality definitions.
pub fn structurally_equal(a: &Feature, b: &Feature) -> bool {
    mask(a) == mask(b)
}

fn mask(f: &Feature) -> Feature {
    let mut f = f.clone();
    mask_location(&mut f.location);
    for child in &mut f.children {
        mask_child(child);
    }
    f
}

fn mask_location(loc: &mut SourceLocation) {
    *loc = SourceLocation::new("", 0, 0);
}

fn mask_child(child: &mut Child) {
    match child {
        Child::Rule(r) => {
            mask_location(&mut r.location);
            if let Some(bg) = &mut r.background {
                mask_background(bg);
            }
            for s in &mut r.scenarios {
                match s {
                    RuleChild::Scenario(s) => mask_scenario(s),
                    RuleChild::ScenarioOutline(o) => mask_outline(o),
                }
            }
        }
        Child::Background(b) => mask_background(b),
        Child::Scenario(s) => mask_scenario(s),
        Child::ScenarioOutline(o) => mask_outline(o),
    }
}

fn mask_background(b: &mut Background) {
    mask_location(&mut b.location);
    for s in &mut b.steps {
        mask_step(s);
    }
}

fn mask_scenario(s: &mut Scenario) {
    mask_location(&mut s.location);
    for step in &mut s.steps {
        mask_step(step);
    }
}

fn mask_outline(o: &mut ScenarioOutline) {
    mask_location(&mut o.location);
    for step in &mut o.steps {
        mask_step(step);
    }
    for ex in &mut o.examples {
        mask_location(&mut ex.location);
        mask_row(&mut ex.header);
        for row in &mut ex.rows {
            mask_row(row);
        }
    }
}

fn mask_step(s: &mut Step) {
    mask_location(&mut s.location);
    match &mut s.argument {
        Some(StepArgument::DocString(d)) => mask_location(&mut d.location),
        Some(StepArgument::DataTable(t)) => {
            mask_location(&mut t.location);
            for row in &mut t.rows {
                mask_row(row);
            }
        }
        None => {}
    }
}

fn mask_row(r: &mut Row) {
    mask_location(&mut r.location);
}
