//! Boundary with external test dispatchers.
//!
//! A dispatcher runs whatever tests live under a directory and summarizes
//! the outcome as a success flag plus captured output and errors. The
//! engine implements the same interface, so callers can swap between this
//! engine and an out-of-process framework runner without caring which one
//! they hold.

use crate::discovery::{discover, FilterSet};
use crate::registry::ModuleRegistry;
use crate::reporter::TestReporter;
use crate::runner::{RunResult, TestRunner, Verbosity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level summary every dispatcher produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub success: bool,
    pub output: String,
    pub errors: String,
}

impl RunSummary {
    /// Projects a completed [`RunResult`] onto the dispatcher shape.
    pub fn from_result(result: &RunResult) -> Self {
        let output = TestReporter::new().with_no_color(true).render(result);
        let errors = result
            .errors
            .iter()
            .map(|entry| format!("{}: {}", entry.qualified_name(), entry.trace))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            success: result.was_successful(),
            output,
            errors,
        }
    }
}

/// Anything that can run the tests under a directory.
pub trait TestDispatch {
    fn run_tests(&self, test_dir: &Path) -> RunSummary;
}

/// The engine behind the dispatcher interface: discover against a
/// registry, run quietly, summarize.
pub struct EngineDispatch<'a> {
    registry: &'a ModuleRegistry,
    filter: FilterSet,
}

impl<'a> EngineDispatch<'a> {
    pub fn new(registry: &'a ModuleRegistry) -> Self {
        Self {
            registry,
            filter: FilterSet::default(),
        }
    }

    pub fn with_filter(mut self, filter: FilterSet) -> Self {
        self.filter = filter;
        self
    }
}

impl TestDispatch for EngineDispatch<'_> {
    fn run_tests(&self, test_dir: &Path) -> RunSummary {
        let plan = match discover(test_dir, self.registry, &self.filter) {
            Ok(plan) => plan,
            Err(err) => {
                return RunSummary {
                    success: false,
                    output: String::new(),
                    errors: err.to_string(),
                }
            }
        };

        let result = TestRunner::new()
            .with_verbosity(Verbosity::Quiet)
            .run(&plan);
        let mut summary = RunSummary::from_result(&result);

        // Unloadable modules fail the dispatch even when every runnable
        // test passed.
        if !plan.collection_errors.is_empty() {
            summary.success = false;
            for collection in &plan.collection_errors {
                if !summary.errors.is_empty() {
                    summary.errors.push('\n');
                }
                summary
                    .errors
                    .push_str(&format!("{}: {}", collection.module, collection.reason));
            }
        }

        summary
    }
}
