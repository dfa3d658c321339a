//! Test discovery: walk a directory tree, load candidate modules from the
//! registry, filter, and produce an ordered plan for the runner.

use crate::registry::{BindFn, ModuleRegistry};
use crate::{EngineError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Candidate test files are named `test_*` with the source suffix.
pub const TEST_FILE_PREFIX: &str = "test_";
pub const SOURCE_SUFFIX: &str = ".rs";

/// Fully qualified reference to one runnable test method.
///
/// Immutable once discovered; displayed as `module.Case.method`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub module: String,
    pub case: String,
    pub method: String,
}

impl MethodRef {
    pub fn new(
        module: impl Into<String>,
        case: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            case: case.into(),
            method: method.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.module, self.case, self.method)
    }
}

/// Optional include/exclude substring patterns over fully qualified names.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl FilterSet {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// A name survives when it matches at least one include pattern (if any
    /// are given) and no exclude pattern. Exclude wins over include.
    pub fn retains(&self, name: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|p| name.contains(p.as_str())) {
            return false;
        }
        if self.exclude.iter().any(|p| name.contains(p.as_str())) {
            return false;
        }
        true
    }
}

/// A method that survived filtering, ready to be bound by the runner.
pub struct PlannedMethod {
    pub name: String,
    pub(crate) bind: BindFn,
}

pub struct PlannedCase {
    pub name: String,
    pub methods: Vec<PlannedMethod>,
}

pub struct PlannedModule {
    /// Path-qualified module id (`sub.test_math` for `sub/test_math.rs`).
    pub id: String,
    pub path: PathBuf,
    pub cases: Vec<PlannedCase>,
}

/// A candidate module that could not be loaded.
#[derive(Debug, Clone)]
pub struct CollectionError {
    pub module: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Ordered output of one discovery pass: modules in id order, cases and
/// methods in registration order, plus any collection errors.
#[derive(Default)]
pub struct TestPlan {
    pub modules: Vec<PlannedModule>,
    pub collection_errors: Vec<CollectionError>,
}

impl TestPlan {
    /// Projects the plan onto the grouping contract:
    /// module id -> case name -> surviving method names.
    pub fn manifest(&self) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        self.modules
            .iter()
            .map(|module| {
                let cases = module
                    .cases
                    .iter()
                    .map(|case| {
                        let methods = case.methods.iter().map(|m| m.name.clone()).collect();
                        (case.name.clone(), methods)
                    })
                    .collect();
                (module.id.clone(), cases)
            })
            .collect()
    }

    /// Total number of planned test methods.
    pub fn len(&self) -> usize {
        self.modules
            .iter()
            .flat_map(|m| &m.cases)
            .map(|c| c.methods.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Discovers every registered test method under `root`.
///
/// Walks the tree in sorted order, loads each candidate module once via the
/// registry (path-qualified id first, bare stem second), and keeps only the
/// methods whose fully qualified names survive `filter`. Cases without
/// surviving methods and modules without surviving cases are omitted. A
/// candidate that cannot be loaded becomes a [`CollectionError`] entry and
/// discovery continues with the remaining modules.
pub fn discover(root: &Path, registry: &ModuleRegistry, filter: &FilterSet) -> Result<TestPlan> {
    let metadata = match fs::metadata(root) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(EngineError::RootNotFound(root.to_path_buf()));
        }
        Err(err) => return Err(err.into()),
    };
    if !metadata.is_dir() {
        return Err(EngineError::RootNotFound(root.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(TEST_FILE_PREFIX) && name.ends_with(SOURCE_SUFFIX) {
            candidates.push((module_id(root, path), path.to_path_buf()));
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let mut plan = TestPlan::default();
    for (id, path) in candidates {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let loaded = match registry.resolve(&id, stem) {
            Some(loader) => loader(),
            None => Err(format!("no test module registered for '{stem}'")),
        };
        let module = match loaded {
            Ok(module) => module,
            Err(reason) => {
                plan.collection_errors.push(CollectionError {
                    module: id,
                    path,
                    reason,
                });
                continue;
            }
        };

        let mut planned = PlannedModule {
            id: id.clone(),
            path,
            cases: Vec::new(),
        };
        for case in module.cases {
            let case_name = case.name;
            let mut kept = Vec::new();
            for method in case.methods {
                let fq_name = format!("{id}.{case_name}.{}", method.name);
                if filter.retains(&fq_name) {
                    kept.push(PlannedMethod {
                        name: method.name,
                        bind: method.bind,
                    });
                }
            }
            if !kept.is_empty() {
                planned.cases.push(PlannedCase {
                    name: case_name,
                    methods: kept,
                });
            }
        }
        if !planned.cases.is_empty() {
            plan.modules.push(planned);
        }
    }

    Ok(plan)
}

/// Path-qualified module id: root-relative path with separators replaced by
/// `.` and the source suffix stripped. Keeps same-named files in different
/// directories from colliding.
fn module_id(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let joined = rel
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join(".");
    joined
        .strip_suffix(SOURCE_SUFFIX)
        .map(str::to_string)
        .unwrap_or(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleDef;
    use crate::unit::{CaseResult, TestUnit};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Fixture;

    impl TestUnit for Fixture {}

    fn ok_body(_: &mut Fixture) -> CaseResult {
        Ok(())
    }

    fn math_registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register("test_math", || {
            Ok(ModuleDef::new("test_math").with_case::<Fixture, _>("MathCase", |case| {
                case.method("test_add", ok_body).method("test_sub", ok_body)
            }))
        });
        registry
    }

    fn filter_registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry.register("test_filters", || {
            Ok(
                ModuleDef::new("test_filters").with_case::<Fixture, _>("Filters", |case| {
                    case.method("test_one", ok_body)
                        .method("test_two", ok_body)
                        .method("test_three", ok_body)
                }),
            )
        });
        registry
    }

    #[test]
    fn empty_directory_yields_empty_plan() {
        let dir = tempdir().unwrap();
        let plan = discover(dir.path(), &ModuleRegistry::new(), &FilterSet::default()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.manifest().is_empty());
        assert!(plan.collection_errors.is_empty());
    }

    #[test]
    fn missing_root_is_an_error() {
        let Err(err) = discover(
            Path::new("/nonexistent/quarry-root"),
            &ModuleRegistry::new(),
            &FilterSet::default(),
        ) else {
            panic!("discovery should refuse a missing root");
        };
        assert!(matches!(err, EngineError::RootNotFound(_)));
    }

    #[test]
    fn groups_methods_by_module_and_case() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test_math.rs"), "").unwrap();
        fs::write(dir.path().join("helpers.rs"), "").unwrap();

        let plan = discover(dir.path(), &math_registry(), &FilterSet::default()).unwrap();
        let manifest = plan.manifest();

        assert_eq!(manifest.len(), 1);
        let cases = &manifest["test_math"];
        assert_eq!(cases.len(), 1);
        assert_eq!(
            cases["MathCase"],
            vec!["test_add".to_string(), "test_sub".to_string()]
        );
    }

    #[rstest]
    #[case(&["one", "three"], &[], &["test_one", "test_three"])]
    #[case(&[], &["three"], &["test_one", "test_two"])]
    #[case(&["three"], &["three"], &[])]
    #[case(&[], &[], &["test_one", "test_two", "test_three"])]
    fn filtering_respects_precedence(
        #[case] include: &[&str],
        #[case] exclude: &[&str],
        #[case] expected: &[&str],
    ) {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test_filters.rs"), "").unwrap();

        let filter = FilterSet::new(
            include.iter().map(|s| s.to_string()).collect(),
            exclude.iter().map(|s| s.to_string()).collect(),
        );
        let plan = discover(dir.path(), &filter_registry(), &filter).unwrap();

        let surviving: Vec<String> = plan
            .modules
            .iter()
            .flat_map(|m| &m.cases)
            .flat_map(|c| &c.methods)
            .map(|m| m.name.clone())
            .collect();
        assert_eq!(surviving, expected);

        // Fully filtered cases and modules disappear from the manifest.
        if expected.is_empty() {
            assert!(plan.manifest().is_empty());
        }
    }

    #[test]
    fn same_named_files_get_distinct_qualified_ids() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("alpha")).unwrap();
        fs::create_dir(dir.path().join("beta")).unwrap();
        fs::write(dir.path().join("alpha/test_math.rs"), "").unwrap();
        fs::write(dir.path().join("beta/test_math.rs"), "").unwrap();

        let plan = discover(dir.path(), &math_registry(), &FilterSet::default()).unwrap();
        let ids: Vec<_> = plan.modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha.test_math", "beta.test_math"]);
        assert_eq!(plan.len(), 4);
    }

    #[test]
    fn unregistered_candidate_becomes_collection_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test_math.rs"), "").unwrap();
        fs::write(dir.path().join("test_unknown.rs"), "").unwrap();

        let plan = discover(dir.path(), &math_registry(), &FilterSet::default()).unwrap();

        // The loadable module still runs; the stray one is reported.
        assert_eq!(plan.manifest().len(), 1);
        assert_eq!(plan.collection_errors.len(), 1);
        assert_eq!(plan.collection_errors[0].module, "test_unknown");
        assert!(plan.collection_errors[0]
            .reason
            .contains("no test module registered"));
    }

    #[test]
    fn failing_loader_becomes_collection_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("test_broken.rs"), "").unwrap();

        let mut registry = ModuleRegistry::new();
        registry.register("test_broken", || Err("malformed module".to_string()));

        let plan = discover(dir.path(), &registry, &FilterSet::default()).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.collection_errors.len(), 1);
        assert_eq!(plan.collection_errors[0].reason, "malformed module");
    }

    #[test]
    fn method_ref_displays_fully_qualified_name() {
        let target = MethodRef::new("sub.test_math", "MathCase", "test_add");
        assert_eq!(target.to_string(), "sub.test_math.MathCase.test_add");
    }
}
