//! Caller-owned registry of test modules.
//!
//! Discovery never introspects compiled code; instead every test module is
//! registered up front as a named loader that builds its [`ModuleDef`] on
//! demand. The registry is a plain local table, so two discovery passes
//! over overlapping trees cannot clobber each other's loaded modules.

use crate::unit::{CaseResult, TestUnit};
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// One live, bound test: a fresh unit instance plus the body to invoke on it.
///
/// Erases the concrete case type so the runner can drive the lifecycle
/// without knowing it.
pub(crate) trait CaseInstance {
    fn set_up(&mut self) -> CaseResult;
    fn invoke(&mut self) -> CaseResult;
    fn tear_down(&mut self) -> CaseResult;
}

struct BoundMethod<T: TestUnit> {
    unit: T,
    body: fn(&mut T) -> CaseResult,
}

impl<T: TestUnit> CaseInstance for BoundMethod<T> {
    fn set_up(&mut self) -> CaseResult {
        self.unit.set_up()
    }

    fn invoke(&mut self) -> CaseResult {
        (self.body)(&mut self.unit)
    }

    fn tear_down(&mut self) -> CaseResult {
        self.unit.tear_down()
    }
}

/// Produces a fresh [`CaseInstance`] per invocation; no state is ever
/// shared between two bindings of the same method.
pub(crate) type BindFn = Box<dyn Fn() -> Box<dyn CaseInstance>>;

type LoaderFn = Box<dyn Fn() -> Result<ModuleDef, String>>;

/// One registered test method.
pub struct MethodDef {
    pub name: String,
    pub(crate) bind: BindFn,
}

/// One test-case type with its registered methods.
pub struct CaseDef {
    pub name: String,
    pub methods: Vec<MethodDef>,
}

/// A loaded test module: the cases its top-level declarations register.
pub struct ModuleDef {
    pub name: String,
    pub cases: Vec<CaseDef>,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Declares a case backed by `T`; each bound method gets its own
    /// `T::default()` instance.
    pub fn with_case<T, F>(mut self, name: impl Into<String>, build: F) -> Self
    where
        T: TestUnit + Default + 'static,
        F: FnOnce(CaseBuilder<T>) -> CaseBuilder<T>,
    {
        self.cases.push(build(CaseBuilder::new(name)).finish());
        self
    }
}

/// Accumulates the methods of one case during module construction.
pub struct CaseBuilder<T> {
    name: String,
    methods: Vec<MethodDef>,
    _unit: PhantomData<T>,
}

impl<T: TestUnit + Default + 'static> CaseBuilder<T> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            _unit: PhantomData,
        }
    }

    /// Registers a test body under `name` (convention: `test_` prefixed).
    pub fn method(mut self, name: impl Into<String>, body: fn(&mut T) -> CaseResult) -> Self {
        self.methods.push(MethodDef {
            name: name.into(),
            bind: Box::new(move || {
                Box::new(BoundMethod {
                    unit: T::default(),
                    body,
                }) as Box<dyn CaseInstance>
            }),
        });
        self
    }

    fn finish(self) -> CaseDef {
        CaseDef {
            name: self.name,
            methods: self.methods,
        }
    }
}

/// Table of module loaders, keyed by module name.
///
/// Loaders are looked up by a candidate file's path-qualified id first and
/// its bare stem second, and run once per candidate per discovery pass.
#[derive(Default)]
pub struct ModuleRegistry {
    loaders: BTreeMap<String, LoaderFn>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `loader` under `name`. Invoking the loader is the module's
    /// "load": it executes the module's top-level declarations and yields
    /// its cases, or a reason the module cannot be loaded.
    pub fn register<F>(&mut self, name: impl Into<String>, loader: F)
    where
        F: Fn() -> Result<ModuleDef, String> + 'static,
    {
        self.loaders.insert(name.into(), Box::new(loader));
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub(crate) fn resolve(&self, module_id: &str, stem: &str) -> Option<&LoaderFn> {
        self.loaders
            .get(module_id)
            .or_else(|| self.loaders.get(stem))
    }
}
