//! Result reporting: render a completed run and derive the exit signal.

use crate::runner::RunResult;
use colored::Colorize;
use std::fmt::Write as _;

/// Renders a [`RunResult`] to a human-readable summary. A pure projection:
/// never mutates the result.
pub struct TestReporter {
    no_color: bool,
}

impl Default for TestReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TestReporter {
    pub fn new() -> Self {
        Self { no_color: false }
    }

    pub fn with_no_color(mut self, no_color: bool) -> Self {
        self.no_color = no_color;
        self
    }

    /// Summary table followed by an itemized listing of every failure and
    /// error with its fully qualified (phase-qualified) name.
    pub fn render(&self, result: &RunResult) -> String {
        if self.no_color {
            colored::control::set_override(false);
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", "─".repeat(50));

        let status = if result.was_successful() {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };
        let _ = writeln!(out, "Test result: {status}");
        let _ = writeln!(out, "  total:     {}", result.total);
        let _ = writeln!(out, "  passed:    {}", result.success);
        let _ = writeln!(out, "  failures:  {}", result.failures.len());
        let _ = writeln!(out, "  errors:    {}", result.errors.len());
        let _ = writeln!(out, "  skipped:   {}", result.skipped.len());
        let _ = writeln!(out, "  time:      {:.2?}", result.duration());

        if !result.failures.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "Failures:".red().bold());
            for (i, (target, message)) in result.failures.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", i + 1, target.to_string().red());
                for line in message.lines() {
                    let _ = writeln!(out, "     {}", line.dimmed());
                }
            }
        }

        if !result.errors.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "Errors:".red().bold());
            for (i, entry) in result.errors.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", i + 1, entry.qualified_name().red());
                for line in entry.trace.lines() {
                    let _ = writeln!(out, "     {}", line.dimmed());
                }
            }
        }

        if !result.skipped.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", "Skipped:".yellow().bold());
            for (i, (target, reason)) in result.skipped.iter().enumerate() {
                let _ = writeln!(out, "  {}. {} - {}", i + 1, target, reason.dimmed());
            }
        }

        if self.no_color {
            colored::control::unset_override();
        }

        out
    }

    /// Prints the rendering to stdout.
    pub fn report(&self, result: &RunResult) {
        print!("{}", self.render(result));
    }

    /// Process exit signal for a completed run: 0 when successful, else 1.
    pub fn exit_code(result: &RunResult) -> i32 {
        if result.was_successful() {
            0
        } else {
            1
        }
    }
}
