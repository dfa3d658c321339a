//! The test-case convention: lifecycle trait and body outcomes.

use std::fmt;

/// How a test body (or lifecycle phase) terminated abnormally.
///
/// Bodies report the distinction between a violated expectation and any
/// other fault as an explicit value rather than through a panic hierarchy;
/// the runner classifies `ExpectationViolated` as a failure and `Fault` as
/// an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseFault {
    /// An expectation inside a test body was not met.
    ExpectationViolated(String),
    /// The test asked to be skipped.
    Skipped(String),
    /// Any other abnormal termination.
    Fault(String),
}

impl fmt::Display for CaseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseFault::ExpectationViolated(message) => write!(f, "{message}"),
            CaseFault::Skipped(reason) => write!(f, "skipped: {reason}"),
            CaseFault::Fault(trace) => write!(f, "{trace}"),
        }
    }
}

// Lets bodies use `?` on ordinary errors; they land in the `Fault` bucket.
// `CaseFault` itself deliberately does not implement `std::error::Error`,
// which is what keeps this blanket impl coherent.
impl<E: std::error::Error> From<E> for CaseFault {
    fn from(err: E) -> Self {
        CaseFault::Fault(err.to_string())
    }
}

/// Result of one test body or lifecycle phase.
pub type CaseResult = Result<(), CaseFault>;

/// Lifecycle capability every test-case type implements.
///
/// Both phases default to no-ops; a type only overrides what it needs.
/// Test bodies are separate functions registered per case, so the trait
/// stays object-safe and trivially derivable via `Default`.
pub trait TestUnit {
    /// Runs before each test body of the case.
    fn set_up(&mut self) -> CaseResult {
        Ok(())
    }

    /// Runs after each test body, exactly once, even when `set_up` faulted.
    fn tear_down(&mut self) -> CaseResult {
        Ok(())
    }
}

/// Fails the test with [`CaseFault::ExpectationViolated`] when the condition
/// is false. An optional format message overrides the stringified condition.
#[macro_export]
macro_rules! expect {
    ($cond:expr $(,)?) => {
        if !($cond) {
            return Err($crate::unit::CaseFault::ExpectationViolated(format!(
                "expectation violated: {}",
                stringify!($cond)
            )));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !($cond) {
            return Err($crate::unit::CaseFault::ExpectationViolated(format!($($arg)+)));
        }
    };
}

/// Fails the test with [`CaseFault::ExpectationViolated`] when the two
/// values differ.
#[macro_export]
macro_rules! expect_eq {
    ($left:expr, $right:expr $(,)?) => {{
        let left = &$left;
        let right = &$right;
        if left != right {
            return Err($crate::unit::CaseFault::ExpectationViolated(format!(
                "expected {left:?} == {right:?}"
            )));
        }
    }};
}

/// Marks the test as skipped with the given reason.
#[macro_export]
macro_rules! skip {
    ($($arg:tt)+) => {
        return Err($crate::unit::CaseFault::Skipped(format!($($arg)+)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passes(_: &mut ()) -> CaseResult {
        expect!(1 + 1 == 2);
        Ok(())
    }

    fn fails(_: &mut ()) -> CaseResult {
        expect!(false, "wanted {}", 42);
        Ok(())
    }

    fn unequal(_: &mut ()) -> CaseResult {
        expect_eq!(2 + 2, 5);
        Ok(())
    }

    fn skips(_: &mut ()) -> CaseResult {
        skip!("not on this platform");
    }

    impl TestUnit for () {}

    #[test]
    fn expect_passes_on_true_condition() {
        assert_eq!(passes(&mut ()), Ok(()));
    }

    #[test]
    fn expect_reports_custom_message() {
        assert_eq!(
            fails(&mut ()),
            Err(CaseFault::ExpectationViolated("wanted 42".to_string()))
        );
    }

    #[test]
    fn expect_eq_reports_both_values() {
        assert_eq!(
            unequal(&mut ()),
            Err(CaseFault::ExpectationViolated("expected 4 == 5".to_string()))
        );
    }

    #[test]
    fn skip_carries_the_reason() {
        assert_eq!(
            skips(&mut ()),
            Err(CaseFault::Skipped("not on this platform".to_string()))
        );
    }

    #[test]
    fn question_mark_converts_errors_to_faults() {
        fn body(_: &mut ()) -> CaseResult {
            "nope".parse::<u32>()?;
            Ok(())
        }

        match body(&mut ()) {
            Err(CaseFault::Fault(trace)) => assert!(trace.contains("invalid digit")),
            other => panic!("expected a fault, got {other:?}"),
        }
    }

    #[test]
    fn default_lifecycle_is_noop() {
        let mut unit = ();
        assert_eq!(unit.set_up(), Ok(()));
        assert_eq!(unit.tear_down(), Ok(()));
    }
}
