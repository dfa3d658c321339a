//! Test execution: drive each planned method through its lifecycle,
//! classify the outcome, and aggregate the run.

use crate::discovery::{MethodRef, TestPlan};
use crate::unit::{CaseFault, CaseResult};
use colored::Colorize;
use indicatif::ProgressBar;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Lifecycle phase qualifier attached to setUp/tearDown errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SetUp,
    TearDown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::SetUp => write!(f, "setUp"),
            Phase::TearDown => write!(f, "tearDown"),
        }
    }
}

/// Classification of one test body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
    Error(String),
    Skipped(String),
}

impl Outcome {
    fn from_body(result: CaseResult) -> Self {
        match result {
            Ok(()) => Outcome::Success,
            Err(CaseFault::ExpectationViolated(message)) => Outcome::Failure(message),
            Err(CaseFault::Skipped(reason)) => Outcome::Skipped(reason),
            Err(CaseFault::Fault(trace)) => Outcome::Error(trace),
        }
    }
}

/// One recorded error: the method it belongs to, the lifecycle phase that
/// produced it (none for body errors), and the trace.
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub target: MethodRef,
    pub phase: Option<Phase>,
    pub trace: String,
}

impl ErrorEntry {
    /// `module.Case.method`, with a ` (setUp)` / ` (tearDown)` qualifier
    /// for lifecycle errors.
    pub fn qualified_name(&self) -> String {
        match self.phase {
            Some(phase) => format!("{} ({})", self.target, phase),
            None => self.target.to_string(),
        }
    }
}

/// Aggregate of one run. Created empty when the run starts, mutated only by
/// the runner, and read-only once the run completes.
///
/// Each method contributes exactly one primary outcome to `total` and the
/// buckets; a tearDown fault appends a supplementary entry to `errors`
/// without touching `total`.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub total: usize,
    pub success: usize,
    pub failures: Vec<(MethodRef, String)>,
    pub errors: Vec<ErrorEntry>,
    pub skipped: Vec<(MethodRef, String)>,
    pub start_time: Instant,
    pub end_time: Instant,
}

impl RunResult {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            total: 0,
            success: 0,
            failures: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
            start_time: now,
            end_time: now,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time.duration_since(self.start_time)
    }

    pub fn was_successful(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty()
    }
}

impl Default for RunResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Live-output detail level, mirroring 0/1/2 verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
}

/// Sequential test runner: one method runs to completion, lifecycle
/// included, before the next begins. No retries, no timeouts.
pub struct TestRunner {
    verbosity: Verbosity,
    progress: bool,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            progress: false,
        }
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Show a progress indicator while running (cosmetic only).
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every planned method in discovery order and aggregates the
    /// outcomes.
    ///
    /// Per method: bind a fresh instance, run `set_up` (a fault records a
    /// `(setUp)` error and skips the body), otherwise run and classify the
    /// body, then run `tear_down` exactly once; a tearDown fault appends an
    /// independent `(tearDown)` error.
    pub fn run(&self, plan: &TestPlan) -> RunResult {
        let mut result = RunResult::new();
        let bar = if self.progress {
            ProgressBar::new(plan.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        for module in &plan.modules {
            for case in &module.cases {
                for method in &case.methods {
                    let target = MethodRef::new(&module.id, &case.name, &method.name);
                    bar.set_message(target.to_string());
                    result.total += 1;

                    let mut instance = (method.bind)();

                    match catch_fault(|| instance.set_up()) {
                        Err(fault) => {
                            self.record_error(&bar, &mut result, &target, Some(Phase::SetUp), fault);
                        }
                        Ok(()) => {
                            match Outcome::from_body(catch_fault(|| instance.invoke())) {
                                Outcome::Success => {
                                    result.success += 1;
                                    if self.verbosity >= Verbosity::Verbose {
                                        self.emit(&bar, format!("{} {target}", "✓".green()));
                                    }
                                }
                                Outcome::Failure(message) => {
                                    if self.verbosity >= Verbosity::Normal {
                                        self.emit(
                                            &bar,
                                            format!("{} {target} - {message}", "✗".red()),
                                        );
                                    }
                                    result.failures.push((target.clone(), message));
                                }
                                Outcome::Skipped(reason) => {
                                    if self.verbosity >= Verbosity::Verbose {
                                        self.emit(
                                            &bar,
                                            format!("{} {target} - {reason}", "s".yellow()),
                                        );
                                    }
                                    result.skipped.push((target.clone(), reason));
                                }
                                Outcome::Error(trace) => {
                                    self.record_error(
                                        &bar,
                                        &mut result,
                                        &target,
                                        None,
                                        CaseFault::Fault(trace),
                                    );
                                }
                            }
                        }
                    }

                    if let Err(fault) = catch_fault(|| instance.tear_down()) {
                        self.record_error(&bar, &mut result, &target, Some(Phase::TearDown), fault);
                    }

                    bar.inc(1);
                }
            }
        }

        bar.finish_and_clear();
        result.end_time = Instant::now();
        result
    }

    fn record_error(
        &self,
        bar: &ProgressBar,
        result: &mut RunResult,
        target: &MethodRef,
        phase: Option<Phase>,
        fault: CaseFault,
    ) {
        let entry = ErrorEntry {
            target: target.clone(),
            phase,
            trace: fault.to_string(),
        };
        if self.verbosity >= Verbosity::Normal {
            let first_line = entry.trace.lines().next().unwrap_or_default();
            self.emit(
                bar,
                format!("{} {} - {first_line}", "!".red().bold(), entry.qualified_name()),
            );
        }
        result.errors.push(entry);
    }

    fn emit(&self, bar: &ProgressBar, line: String) {
        if self.progress {
            bar.println(line);
        } else {
            println!("{line}");
        }
    }
}

/// Runs a lifecycle phase or body, converting panics into faults so a
/// misbehaving test can never take the run down.
fn catch_fault<F: FnOnce() -> CaseResult>(f: F) -> CaseResult {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CaseFault::Fault(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic: opaque payload".to_string()
    }
}
