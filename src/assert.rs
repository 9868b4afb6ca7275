//! The assertion library.
//!
//! Assertions never fail the run by themselves: a failed predicate is printed
//! through the console, recorded as an error-level event, and counted. Only
//! when the interrupt flag is set (always, for [`MustBe`]) does the failure
//! also request an interrupt from the host and surface as
//! [`ScriptError::Interrupted`].

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use crate::{
    console::Console,
    error::{ScriptError, ScriptResult},
    events::{Event, EventSink},
    format::render_console_arg,
    host::{Host, DEFAULT_INTERRUPT_REASON},
    value::Value,
};

/// The result of one assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionOutcome {
    pub passed: bool,
    pub message: String,
    /// Rendered operands of a failed assertion.
    pub error: Option<String>,
    pub interrupt: bool,
}

impl AssertionOutcome {
    fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
            error: None,
            interrupt: false,
        }
    }
}

/// `empty` classification.
///
/// Falsy primitives are empty; arrays, plain objects, sets and maps are empty
/// when they hold nothing; a date is empty when its time value is `NaN`.
/// Every other value (functions, symbols, promises, errors) is never empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => *n == 0.0 || n.is_nan(),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(object) => object.is_empty(),
        Value::Set(set) => set.size() == 0,
        Value::Map(map) => map.size() == 0,
        Value::Date(date) => !date.is_valid(),
        Value::Symbol(_) | Value::Function(_) | Value::Promise(_) | Value::Error(_) => false,
    }
}

/// `contains` membership: substring search in strings (the needle in its
/// string form), identity search in arrays, `false` for anything else.
pub fn contains(needle: &Value, container: &Value) -> bool {
    match container {
        Value::String(haystack) => haystack.contains(&needle.to_string()),
        Value::Array(items) => items.includes(needle),
        _ => false,
    }
}

// ============================================================================
// REPORTER: shared failure path
// ============================================================================

/// Run-wide assertion state: where failures go and whether an interrupt was
/// requested.
pub struct Reporter {
    host: Rc<dyn Host>,
    console: Console,
    events: EventSink,
    failures: Cell<usize>,
    interrupt_reason: RefCell<Option<String>>,
}

impl Reporter {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            console: Console::new(Rc::clone(&host)),
            events: EventSink::new(Rc::clone(&host)),
            host,
            failures: Cell::new(0),
            interrupt_reason: RefCell::new(None),
        }
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn failures(&self) -> usize {
        self.failures.get()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt_reason.borrow().is_some()
    }

    pub fn interrupt_reason(&self) -> Option<String> {
        self.interrupt_reason.borrow().clone()
    }

    /// The interrupt that stops the run: one requested here, else one the
    /// host has pending.
    pub fn pending_interrupt(&self) -> Option<String> {
        self.interrupt_reason()
            .or_else(|| self.host.interrupt_requested())
    }

    /// Requests an interrupt from the host and returns the error that
    /// unwinds the current callback. Only the first reason is kept, and the
    /// host is asked at most once.
    pub fn interrupt(&self, reason: &str) -> ScriptError {
        let reason = if reason.is_empty() {
            DEFAULT_INTERRUPT_REASON
        } else {
            reason
        };
        if self.pending_interrupt().is_none() {
            self.host.interrupt(reason);
        }
        self.interrupt_reason
            .borrow_mut()
            .get_or_insert_with(|| reason.to_string());
        ScriptError::interrupted(reason)
    }

    fn check<F>(
        &self,
        passed: bool,
        message: Option<&str>,
        default: F,
        operands: &[&Value],
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome>
    where
        F: FnOnce() -> String,
    {
        if passed {
            return Ok(AssertionOutcome::pass());
        }

        let message = match message {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => default(),
        };

        let mut line = Vec::with_capacity(operands.len() + 1);
        line.push(Value::from(message.as_str()));
        line.extend(operands.iter().map(|v| (*v).clone()));
        self.console.error(&line);
        self.events.push(Event::error(message.as_str()));
        self.failures.set(self.failures.get() + 1);
        tracing::debug!(%message, interrupt, "assertion failed");

        if interrupt {
            return Err(self.interrupt(&message));
        }

        let rendered = operands
            .iter()
            .map(|v| render_console_arg(v))
            .collect::<Vec<_>>()
            .join(" ");
        Ok(AssertionOutcome {
            passed: false,
            message,
            error: Some(rendered),
            interrupt: false,
        })
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("failures", &self.failures.get())
            .field("interrupt_reason", &self.interrupt_reason.borrow())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ASSERT / MUSTBE
// ============================================================================

/// Assertions that report and continue unless `interrupt` is set.
#[derive(Clone, Debug)]
pub struct Assert {
    reporter: Rc<Reporter>,
}

impl Assert {
    pub fn new(reporter: Rc<Reporter>) -> Self {
        Self { reporter }
    }

    /// Passes only for the boolean `true`.
    pub fn is_true(
        &self,
        value: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            matches!(value, Value::Bool(true)),
            message,
            || format!("Expected true but got {value}"),
            &[value],
            interrupt,
        )
    }

    /// Passes only for the boolean `false`.
    pub fn is_false(
        &self,
        value: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            matches!(value, Value::Bool(false)),
            message,
            || format!("Expected false but got {value}"),
            &[value],
            interrupt,
        )
    }

    pub fn equals(
        &self,
        actual: &Value,
        expected: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            actual.strict_equals(expected),
            message,
            || format!("{actual} and {expected} are not the same"),
            &[actual, expected],
            interrupt,
        )
    }

    pub fn not_equals(
        &self,
        actual: &Value,
        expected: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            !actual.strict_equals(expected),
            message,
            || format!("{actual} and {expected} are the same"),
            &[actual, expected],
            interrupt,
        )
    }

    pub fn empty(
        &self,
        value: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            is_empty(value),
            message,
            || format!("{value} is not empty"),
            &[value],
            interrupt,
        )
    }

    pub fn not_empty(
        &self,
        value: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            !is_empty(value),
            message,
            || format!("{value} is empty"),
            &[value],
            interrupt,
        )
    }

    pub fn contains(
        &self,
        needle: &Value,
        container: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            contains(needle, container),
            message,
            || format!("{container} does not contain {needle}"),
            &[needle, container],
            interrupt,
        )
    }

    pub fn not_contains(
        &self,
        needle: &Value,
        container: &Value,
        message: Option<&str>,
        interrupt: bool,
    ) -> ScriptResult<AssertionOutcome> {
        self.reporter.check(
            !contains(needle, container),
            message,
            || format!("{container} contains {needle}"),
            &[needle, container],
            interrupt,
        )
    }
}

/// Fail-fast assertions (`mustBe`, also exposed as `require`): every failure
/// interrupts the run.
#[derive(Clone, Debug)]
pub struct MustBe {
    inner: Assert,
}

impl MustBe {
    pub fn new(reporter: Rc<Reporter>) -> Self {
        Self {
            inner: Assert::new(reporter),
        }
    }

    pub fn is_true(&self, value: &Value, message: Option<&str>) -> ScriptResult<AssertionOutcome> {
        self.inner.is_true(value, message, true)
    }

    pub fn is_false(&self, value: &Value, message: Option<&str>) -> ScriptResult<AssertionOutcome> {
        self.inner.is_false(value, message, true)
    }

    pub fn equals(
        &self,
        actual: &Value,
        expected: &Value,
        message: Option<&str>,
    ) -> ScriptResult<AssertionOutcome> {
        self.inner.equals(actual, expected, message, true)
    }

    pub fn not_equals(
        &self,
        actual: &Value,
        expected: &Value,
        message: Option<&str>,
    ) -> ScriptResult<AssertionOutcome> {
        self.inner.not_equals(actual, expected, message, true)
    }

    pub fn empty(&self, value: &Value, message: Option<&str>) -> ScriptResult<AssertionOutcome> {
        self.inner.empty(value, message, true)
    }

    pub fn not_empty(&self, value: &Value, message: Option<&str>) -> ScriptResult<AssertionOutcome> {
        self.inner.not_empty(value, message, true)
    }

    pub fn contains(
        &self,
        needle: &Value,
        container: &Value,
        message: Option<&str>,
    ) -> ScriptResult<AssertionOutcome> {
        self.inner.contains(needle, container, message, true)
    }

    pub fn not_contains(
        &self,
        needle: &Value,
        container: &Value,
        message: Option<&str>,
    ) -> ScriptResult<AssertionOutcome> {
        self.inner.not_contains(needle, container, message, true)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        log::LogLevel,
        value::{Date, Function, MapValue, Promise, SetValue, Symbol},
    };

    #[derive(Default)]
    struct Recorder {
        stderr: RefCell<String>,
        events: RefCell<Vec<Event>>,
        interrupts: RefCell<Vec<String>>,
    }

    impl Host for Recorder {
        fn write_stdout(&self, _: &str) {}
        fn write_stderr(&self, text: &str) {
            self.stderr.borrow_mut().push_str(text);
        }
        fn log_level(&self) -> LogLevel {
            LogLevel::Debug
        }
        fn delay(&self, _: Duration) {}
        fn interrupt(&self, reason: &str) {
            self.interrupts.borrow_mut().push(reason.to_string());
        }
        fn yield_now(&self) {}
        fn env_var(&self, _: &str) -> Option<String> {
            None
        }
        fn report(&self, events: &[Event]) {
            self.events.borrow_mut().extend_from_slice(events);
        }
    }

    fn setup() -> (Rc<Recorder>, Rc<Reporter>) {
        let host = Rc::new(Recorder::default());
        let reporter = Rc::new(Reporter::new(host.clone()));
        (host, reporter)
    }

    #[test]
    fn empty_classification() {
        for value in [
            Value::array([]),
            Value::object::<&str, _>([]),
            Value::from(""),
            Value::from(false),
            Value::from(0),
            Value::from(-0.0),
            Value::from(f64::NAN),
            Value::Null,
            Value::Undefined,
            Value::Set(SetValue::new([])),
            Value::Map(MapValue::new([])),
            Value::Date(Date::invalid()),
            Value::Date(Date::from_millis(8.64e15 + 1.0)),
            Value::Date(Date::from_millis(f64::INFINITY)),
        ] {
            assert!(is_empty(&value), "{value:?} should be empty");
        }
        for value in [
            Value::array([Value::from(1)]),
            Value::array([Value::Undefined]),
            Value::object([("foo", Value::from("bar"))]),
            Value::from("string"),
            Value::from(true),
            Value::from(1),
            Value::Date(Date::from_millis(0.0)),
            Value::Symbol(Symbol::new(None)),
            Value::Function(Function::new("f", |_| Ok(Value::Undefined))),
            Value::Promise(Promise::pending()),
        ] {
            assert!(!is_empty(&value), "{value:?} should not be empty");
        }
    }

    #[test]
    fn contains_by_substring_and_identity() {
        let foo = Value::from("foo");
        assert!(contains(&foo, &Value::from("foobar")));
        assert!(!contains(&foo, &Value::from("bazbar")));
        assert!(contains(&Value::from(1), &Value::from("a1")));
        assert!(contains(
            &foo,
            &Value::array([Value::from("baz"), Value::from("foo")])
        ));

        let inner = Value::array([]);
        assert!(contains(&inner, &Value::array([inner.clone()])));
        assert!(!contains(&Value::array([]), &Value::array([Value::array([])])));
        assert!(!contains(&foo, &Value::object([("foo", Value::Null)])));
    }

    #[test]
    fn soft_failure_reports_and_continues() {
        let (host, reporter) = setup();
        let assert = Assert::new(reporter.clone());

        let outcome = assert.equals(&Value::from(1), &Value::from("1"), None, false);
        let outcome = outcome.unwrap_or_else(|e| panic!("unexpected error: {e}"));
        assert!(!outcome.passed);
        assert_eq!(outcome.message, "1 and 1 are not the same");
        assert_eq!(outcome.error.as_deref(), Some("1 \"1\""));

        assert_eq!(reporter.failures(), 1);
        assert!(!reporter.is_interrupted());
        assert!(host.interrupts.borrow().is_empty());
        assert_eq!(*host.events.borrow(), vec![Event::error("1 and 1 are not the same")]);
        assert_eq!(*host.stderr.borrow(), "1 and 1 are not the same 1 \"1\"\n");
    }

    #[test]
    fn passing_assertion_is_silent() {
        let (host, reporter) = setup();
        let assert = Assert::new(reporter.clone());
        let outcome = assert.equals(&Value::from(1), &Value::from(1), None, true);
        assert!(outcome.is_ok_and(|o| o.passed));
        assert_eq!(reporter.failures(), 0);
        assert!(host.events.borrow().is_empty());
        assert!(host.stderr.borrow().is_empty());
    }

    #[test]
    fn default_messages() {
        let (host, reporter) = setup();
        let assert = Assert::new(reporter);
        let arr = Value::array([Value::from(1), Value::from(2)]);
        let _ = assert.is_true(&Value::from(0), None, false);
        let _ = assert.is_false(&Value::Null, Some("  "), false);
        let _ = assert.not_equals(&Value::from("a"), &Value::from("a"), None, false);
        let _ = assert.empty(&arr, None, false);
        let _ = assert.not_empty(&Value::from(""), None, false);
        let _ = assert.contains(&Value::from(3), &arr, None, false);
        let _ = assert.not_contains(&Value::from("o"), &Value::from("foo"), None, false);
        let _ = assert.is_true(&Value::from(false), Some("custom"), false);

        let messages: Vec<String> = host.events.borrow().iter().map(|e| e.message.clone()).collect();
        assert_eq!(
            messages,
            vec![
                "Expected true but got 0",
                "Expected false but got null",
                "a and a are the same",
                "1,2 is not empty",
                " is empty",
                "1,2 does not contain 3",
                "foo contains o",
                "custom",
            ]
        );
    }

    #[test]
    fn must_be_interrupts_once() {
        let (host, reporter) = setup();
        let must_be = MustBe::new(reporter.clone());

        assert!(must_be.is_true(&Value::from(true), None).is_ok());
        let err = must_be.is_true(&Value::object::<&str, _>([]), None).unwrap_err();
        assert!(err.is_interrupt());
        assert_eq!(err.to_string(), "interrupted: Expected true but got [object Object]");
        assert_eq!(host.interrupts.borrow().len(), 1);
        assert!(reporter.is_interrupted());
        assert_eq!(reporter.failures(), 1);
    }

    #[test]
    fn later_failures_do_not_ask_the_host_again() {
        let (host, reporter) = setup();
        let must_be = MustBe::new(reporter.clone());

        let first = must_be.is_true(&Value::from(false), Some("first")).unwrap_err();
        let second = must_be.is_true(&Value::from(false), Some("second")).unwrap_err();
        assert_eq!(first.to_string(), "interrupted: first");
        assert_eq!(second.to_string(), "interrupted: second");
        assert_eq!(*host.interrupts.borrow(), vec!["first".to_string()]);
        assert_eq!(reporter.interrupt_reason().as_deref(), Some("first"));
        assert_eq!(reporter.failures(), 2);
    }

    #[test]
    fn flagged_assert_interrupts() {
        let (host, reporter) = setup();
        let assert = Assert::new(reporter);
        let result = assert.not_contains(&Value::from("foo"), &Value::from("foobar"), None, true);
        assert!(result.is_err_and(|e| e.is_interrupt()));
        assert_eq!(*host.interrupts.borrow(), vec!["foobar contains foo".to_string()]);
    }
}
