//! Command-line harness around the quarry engine.
//!
//! Test modules are linked Rust code registered at build time, so the
//! harness is embedded rather than shipped as a standalone binary: a test
//! binary builds its [`ModuleRegistry`] and hands it to [`run_cli`] from
//! `main`.
//!
//! ```no_run
//! use quarry_engine::ModuleRegistry;
//!
//! fn main() -> anyhow::Result<std::process::ExitCode> {
//!     let mut registry = ModuleRegistry::new();
//!     // registry.register("test_math", || ...);
//!     quarry_harness::run_cli(registry)
//! }
//! ```

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use quarry_engine::{
    discover, FilterSet, ModuleRegistry, TestReporter, TestRunner, Verbosity,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Run registered test modules discovered under a directory.
#[derive(Debug, Parser)]
#[command(name = "quarry", version)]
pub struct HarnessArgs {
    /// Directory to discover tests in
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Only run tests whose fully qualified name contains one of these
    /// substrings (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub include: Vec<String>,

    /// Drop tests whose fully qualified name contains one of these
    /// substrings; wins over --include (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Output detail (0 = quiet, 1 = normal, 2 = verbose)
    #[arg(short, long, default_value_t = 1)]
    pub verbosity: u8,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Emit a machine-readable JSON summary instead of the report
    #[arg(long)]
    pub json: bool,
}

impl Default for HarnessArgs {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            include: Vec::new(),
            exclude: Vec::new(),
            verbosity: 1,
            no_color: false,
            json: false,
        }
    }
}

/// Parses the process command line and runs the harness against `registry`.
pub fn run_cli(registry: ModuleRegistry) -> Result<ExitCode> {
    let args = HarnessArgs::parse();
    let code = run(&registry, &args)?;
    Ok(ExitCode::from(code as u8))
}

/// Discover, execute and report; returns the process exit signal.
///
/// 0 when every runnable test passed and every candidate module loaded;
/// 1 on any failure, error, or collection error.
pub fn run(registry: &ModuleRegistry, args: &HarnessArgs) -> Result<i32> {
    if args.no_color {
        colored::control::set_override(false);
    }

    let filter = FilterSet::new(args.include.clone(), args.exclude.clone());
    let plan = discover(&args.dir, registry, &filter)?;

    if !plan.collection_errors.is_empty() && !args.json {
        eprintln!("{}", "Collection errors:".yellow().bold());
        for collection in &plan.collection_errors {
            eprintln!("  {} {}", "●".yellow(), collection.path.display());
            eprintln!("    {}", collection.reason.dimmed());
        }
        eprintln!();
    }

    if plan.is_empty() {
        if args.json {
            println!(
                "{}",
                serde_json::json!({
                    "total": 0,
                    "success": plan.collection_errors.is_empty(),
                    "collection_errors": collection_errors_json(&plan),
                    "message": "No tests found",
                })
            );
        } else {
            println!("{}", "No tests found.".yellow());
        }
        return Ok(i32::from(!plan.collection_errors.is_empty()));
    }

    let verbosity = match args.verbosity {
        0 => Verbosity::Quiet,
        1 => Verbosity::Normal,
        _ => Verbosity::Verbose,
    };

    if !args.json {
        println!(
            "Found {} test{}",
            plan.len().to_string().bold(),
            if plan.len() == 1 { "" } else { "s" }
        );
    }

    let runner = TestRunner::new()
        .with_verbosity(if args.json { Verbosity::Quiet } else { verbosity })
        .with_progress(!args.json && verbosity != Verbosity::Quiet);
    let result = runner.run(&plan);

    if args.json {
        println!(
            "{}",
            serde_json::json!({
                "total": result.total,
                "passed": result.success,
                "failures": result.failures.iter().map(|(target, message)| {
                    serde_json::json!({ "name": target.to_string(), "message": message })
                }).collect::<Vec<_>>(),
                "errors": result.errors.iter().map(|entry| {
                    serde_json::json!({ "name": entry.qualified_name(), "trace": entry.trace })
                }).collect::<Vec<_>>(),
                "skipped": result.skipped.iter().map(|(target, reason)| {
                    serde_json::json!({ "name": target.to_string(), "reason": reason })
                }).collect::<Vec<_>>(),
                "collection_errors": collection_errors_json(&plan),
                "duration_ms": result.duration().as_millis() as u64,
                "success": result.was_successful() && plan.collection_errors.is_empty(),
            })
        );
    } else {
        TestReporter::new().with_no_color(args.no_color).report(&result);
    }

    let mut code = TestReporter::exit_code(&result);
    if !plan.collection_errors.is_empty() {
        code = 1;
    }
    Ok(code)
}

fn collection_errors_json(plan: &quarry_engine::TestPlan) -> Vec<serde_json::Value> {
    plan.collection_errors
        .iter()
        .map(|collection| {
            serde_json::json!({
                "module": collection.module,
                "reason": collection.reason,
            })
        })
        .collect()
}
