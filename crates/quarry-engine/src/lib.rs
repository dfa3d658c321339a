//! Quarry test engine
//!
//! Framework-free test discovery and execution: walk a directory tree for
//! `test_*` modules, resolve each one against a caller-owned registry, run
//! every test method through an isolated setUp/tearDown lifecycle, and
//! aggregate the outcomes into a reportable result.
//!
//! Data flows strictly discovery -> execution -> aggregation -> reporting:
//!
//! ```no_run
//! use quarry_engine::{discover, FilterSet, ModuleRegistry, TestReporter, TestRunner};
//!
//! # fn registered() -> ModuleRegistry { ModuleRegistry::new() }
//! # fn main() -> quarry_engine::Result<()> {
//! let registry = registered();
//! let plan = discover("tests".as_ref(), &registry, &FilterSet::default())?;
//! let result = TestRunner::new().run(&plan);
//! TestReporter::new().report(&result);
//! std::process::exit(TestReporter::exit_code(&result));
//! # }
//! ```

pub mod discovery;
pub mod dispatch;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod unit;

pub use discovery::{discover, CollectionError, FilterSet, MethodRef, TestPlan};
pub use dispatch::{EngineDispatch, RunSummary, TestDispatch};
pub use registry::{CaseBuilder, CaseDef, MethodDef, ModuleDef, ModuleRegistry};
pub use reporter::TestReporter;
pub use runner::{ErrorEntry, Outcome, Phase, RunResult, TestRunner, Verbosity};
pub use unit::{CaseFault, CaseResult, TestUnit};

/// Engine-level errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("test root {} does not exist or is not a directory", .0.display())]
    RootNotFound(std::path::PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
