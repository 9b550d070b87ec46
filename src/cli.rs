//! Command-line surface: `fmt` (validate/reformat `.feature` files) and
//! `run` (compile and execute them against whatever step definitions
//! have been registered). The library itself stays usable without this
//! module — discovering and loading step-source files is left to the
//! caller — this is just the binary's entry point into it.
//!
//! Argument parsing uses `clap`'s derive API; directory traversal uses
//! `globwalk` to collect `.feature` files recursively; diagnostics are
//! printed in color to stderr via `termcolor` so they stand out from a
//! machine-readable summary on stdout.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::diagnostics::Diagnostic;
use crate::error::{Result, ShiftlefterError};
use crate::formatter::format_feature;
use crate::parser::parse;
use crate::roundtrip::{self, CheckResult};

#[derive(Debug, Parser)]
#[command(name = "shiftlefter", about = "A Gherkin lexer, formatter and step-execution engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate or reformat `.feature` files.
    Fmt(FmtArgs),
    /// Parse, compile, bind and execute `.feature` files.
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct FmtArgs {
    /// Validate and roundtrip-check every file; report but don't write.
    #[arg(long, conflicts_with_all = ["write", "canonical"])]
    pub check: bool,
    /// Reformat files in place; files already canonical are untouched.
    #[arg(long, conflicts_with_all = ["check", "canonical"])]
    pub write: bool,
    /// Emit the canonical form of a single file to stdout.
    #[arg(long, conflicts_with_all = ["check", "write"])]
    pub canonical: bool,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    pub paths: Vec<PathBuf>,
}

/// Resolve a mix of file and directory paths into concrete `.feature`
/// files. A directory is walked recursively for `.feature` files; a
/// file path is taken as-is, letting a caller pass an exact file whose
/// name doesn't end in `.feature`.
pub fn discover_feature_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(ShiftlefterError::PathNotFound(path.clone()));
        }
        if path.is_dir() {
            let walker = globwalk::GlobWalkerBuilder::new(path, "**/*.feature")
                .case_insensitive(true)
                .build()
                .map_err(|_| ShiftlefterError::PathNotFound(path.clone()))?;
            for entry in walker.filter_map(Result::ok) {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    Ok(files)
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| ShiftlefterError::ReadFailed { path: path.to_path_buf(), source })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).map_err(|source| ShiftlefterError::WriteFailed { path: path.to_path_buf(), source })
}

fn print_diagnostics(stderr: &mut StandardStream, path: &Path, diagnostics: &[Diagnostic]) {
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Red)).set_bold(true);
    for d in diagnostics {
        let _ = stderr.set_color(&spec);
        let _ = write!(stderr, "{}", path.display());
        let _ = stderr.reset();
        let _ = writeln!(stderr, ": {d}");
    }
}

/// `fmt --check|--write|--canonical <paths>`. Returns the process exit
/// code: `0` everything was already canonical (or got rewritten), `1`
/// one or more files weren't canonical, `2` an I/O or parse error
/// stopped the run before it could finish.
pub fn run_fmt(args: &FmtArgs) -> i32 {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);

    let files = match discover_feature_files(&args.paths) {
        Ok(files) => files,
        Err(e) => {
            let _ = writeln!(stderr, "{e}");
            return 2;
        }
    };

    if args.canonical {
        let Some(path) = files.first() else {
            let _ = writeln!(stderr, "fmt --canonical requires exactly one file");
            return 2;
        };
        let source = match read_file(path) {
            Ok(s) => s,
            Err(e) => {
                let _ = writeln!(stderr, "{e}");
                return 2;
            }
        };
        let result = parse(&source, path);
        if !result.diagnostics.is_empty() {
            print_diagnostics(&mut stderr, path, &result.diagnostics);
            return 1;
        }
        print!("{}", format_feature(&result.feature.unwrap()));
        return 0;
    }

    let mut any_invalid = false;
    for path in &files {
        let source = match read_file(path) {
            Ok(s) => s,
            Err(e) => {
                let _ = writeln!(stderr, "{e}");
                return 2;
            }
        };

        match roundtrip::check(&source, path) {
            CheckResult::Ok => {
                if args.write {
                    log::debug!("{} already canonical", path.display());
                }
            }
            CheckResult::ParseErrors(diags) => {
                print_diagnostics(&mut stderr, path, &diags);
                any_invalid = true;
            }
            CheckResult::Mismatch { .. } => {
                if args.write {
                    let result = parse(&source, path);
                    let formatted = format_feature(&result.feature.unwrap());
                    if let Err(e) = write_file(path, &formatted) {
                        let _ = writeln!(stderr, "{e}");
                        return 2;
                    }
                    log::info!("reformatted {}", path.display());
                } else {
                    let _ = writeln!(stderr, "{}: not in canonical form", path.display());
                    any_invalid = true;
                }
            }
        }
    }

    if any_invalid {
        1
    } else {
        0
    }
}

/// `run <paths>`. Parses and compiles pickles for every discovered
/// file, then binds and executes them against whatever step
/// definitions are already registered in [`crate::registry::global`].
/// This binary never loads step-definition source itself — that's a
/// caller concern — so `run` only does anything useful once a
/// consumer has registered steps before invoking it.
pub fn run_run(args: &RunArgs) -> i32 {
    use crate::binder::bind_suite;
    use crate::executor::run_suite;
    use crate::pickle::compile;
    use crate::registry;
    use crate::report::{summarize, summarize_planning_failure};

    let mut stderr = StandardStream::stderr(ColorChoice::Auto);

    let files = match discover_feature_files(&args.paths) {
        Ok(files) => files,
        Err(e) => {
            let _ = writeln!(stderr, "{e}");
            return 2;
        }
    };

    let mut all_pickles = Vec::new();
    for path in &files {
        let source = match read_file(path) {
            Ok(s) => s,
            Err(e) => {
                let _ = writeln!(stderr, "{e}");
                return 2;
            }
        };
        let result = parse(&source, path);
        if !result.diagnostics.is_empty() {
            print_diagnostics(&mut stderr, path, &result.diagnostics);
            return 2;
        }
        let uri = path.display().to_string();
        let (pickles, pickle_diags) = compile(&result.feature.unwrap(), &uri);
        if !pickle_diags.is_empty() {
            print_diagnostics(&mut stderr, path, &pickle_diags);
        }
        all_pickles.extend(pickles);
    }

    let snapshot = registry::global().lock().expect("registry mutex poisoned").snapshot();
    let suite = bind_suite(&all_pickles, &snapshot);

    if !suite.runnable {
        let summary = summarize_planning_failure("run", &suite.diagnostics);
        print_summary(&summary);
        return 2;
    }

    let results = run_suite(&suite.plans, &snapshot);
    let summary = summarize("run", &results);
    print_summary(&summary);
    summary.exit_code
}

fn print_summary(summary: &crate::report::Summary) {
    match serde_json::to_string(summary) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize summary: {e}"),
    }
}

/// Entry point shared by `main.rs`: parse argv, dispatch, return exit code.
pub fn main(cli: Cli) -> i32 {
    match cli.command {
        Command::Fmt(args) => run_fmt(&args),
        Command::Run(args) => run_run(&args),
    }
}
