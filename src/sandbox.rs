//! One script execution: declarations, assertions and the final run.
//!
//! A [`Sandbox`] is created when a script starts. Script code declares hooks,
//! tests and groups through its [`Scope`]; the host then calls
//! [`Sandbox::run`] once, which consumes the sandbox. Nothing survives the run.

use std::{
    cell::RefCell,
    fmt,
    ops::Deref,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{
    assert::{Assert, MustBe, Reporter},
    bridge,
    console::Console,
    error::{ScriptError, ScriptResult},
    events::{Event, EventSink},
    host::Host,
    suite::{Engine, HookPhase, Registry, RunSummary},
    value::Value,
};

struct ScopeInner {
    host: Rc<dyn Host>,
    registry: RefCell<Registry>,
    reporter: Rc<Reporter>,
    assert: Assert,
    must_be: MustBe,
}

/// The script-facing surface of a sandbox, handed to every callback.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    fn new(host: Rc<dyn Host>) -> Self {
        let reporter = Rc::new(Reporter::new(Rc::clone(&host)));
        Self(Rc::new(ScopeInner {
            host,
            registry: RefCell::new(Registry::new()),
            assert: Assert::new(Rc::clone(&reporter)),
            must_be: MustBe::new(Rc::clone(&reporter)),
            reporter,
        }))
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    /// Runs `hook` once before the first test of the run.
    pub fn before_all<F>(&self, hook: F)
    where
        F: Fn(&Scope, Option<&str>) -> ScriptResult<()> + 'static,
    {
        self.hook(HookPhase::BeforeAll, hook);
    }

    /// Runs `hook` before every test, with the test name.
    pub fn before_each<F>(&self, hook: F)
    where
        F: Fn(&Scope, Option<&str>) -> ScriptResult<()> + 'static,
    {
        self.hook(HookPhase::BeforeEach, hook);
    }

    /// Runs `hook` after every test, with the test name.
    pub fn after_each<F>(&self, hook: F)
    where
        F: Fn(&Scope, Option<&str>) -> ScriptResult<()> + 'static,
    {
        self.hook(HookPhase::AfterEach, hook);
    }

    /// Runs `hook` once after the last test of the run.
    pub fn after_all<F>(&self, hook: F)
    where
        F: Fn(&Scope, Option<&str>) -> ScriptResult<()> + 'static,
    {
        self.hook(HookPhase::AfterAll, hook);
    }

    fn hook<F>(&self, phase: HookPhase, hook: F)
    where
        F: Fn(&Scope, Option<&str>) -> ScriptResult<()> + 'static,
    {
        self.0
            .registry
            .borrow_mut()
            .register_hook(phase, Rc::new(hook));
    }

    /// Queues a test. A queued test with the same name is replaced.
    pub fn test<F>(&self, name: impl Into<String>, body: F)
    where
        F: FnOnce(&Scope) -> ScriptResult<()> + 'static,
    {
        let name = name.into();
        if self
            .0
            .registry
            .borrow_mut()
            .register_test(name.as_str(), Box::new(body))
        {
            tracing::debug!(test = %name, "test re-registered, replacing the queued body");
        }
    }

    /// Alias of [`Scope::test`].
    pub fn it<F>(&self, name: impl Into<String>, body: F)
    where
        F: FnOnce(&Scope) -> ScriptResult<()> + 'static,
    {
        self.test(name, body);
    }

    /// Queues a group. Its callback runs when the engine drains groups and
    /// registers into the same queues as top-level code.
    pub fn describe<F>(&self, name: impl Into<String>, callback: F)
    where
        F: FnOnce(&Scope) -> ScriptResult<()> + 'static,
    {
        let name = name.into();
        if self
            .0
            .registry
            .borrow_mut()
            .register_group(name.as_str(), Box::new(callback))
        {
            tracing::debug!(group = %name, "group re-registered, replacing the queued callback");
        }
    }

    // ------------------------------------------------------------------------
    // Script globals
    // ------------------------------------------------------------------------

    pub fn assert(&self) -> &Assert {
        &self.0.assert
    }

    pub fn must_be(&self) -> &MustBe {
        &self.0.must_be
    }

    /// Alias of [`Scope::must_be`].
    pub fn require(&self) -> &MustBe {
        &self.0.must_be
    }

    pub fn console(&self) -> &Console {
        self.0.reporter.console()
    }

    pub fn events(&self) -> &EventSink {
        self.0.reporter.events()
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.0.host
    }

    /// `await(...)` with script arity rules.
    pub fn await_args(&self, args: &[Value]) -> ScriptResult<Value> {
        bridge::await_value(self.0.host.as_ref(), args)
    }

    /// Waits for a single value.
    pub fn await_value(&self, value: &Value) -> ScriptResult<Value> {
        self.await_args(std::slice::from_ref(value))
    }

    /// `process.interrupt(reason)`: returns the error to propagate.
    pub fn interrupt(&self, reason: &str) -> ScriptError {
        self.0.reporter.interrupt(reason)
    }

    /// `process.delay(ms)`. Non-positive durations return immediately.
    pub fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            self.0.host.delay(duration);
        }
    }

    /// `process.env[name]`.
    pub fn env(&self, name: &str) -> Option<String> {
        self.0.host.env_var(name)
    }

    /// `io.stdOut(...)`: writes the string form of every argument, unseparated.
    pub fn write_stdout(&self, args: &[Value]) {
        let text: String = args.iter().map(ToString::to_string).collect();
        self.0.host.write_stdout(&text);
    }

    /// `io.stdErr(...)`.
    pub fn write_stderr(&self, args: &[Value]) {
        let text: String = args.iter().map(ToString::to_string).collect();
        self.0.host.write_stderr(&text);
    }

    pub(crate) fn registry(&self) -> &RefCell<Registry> {
        &self.0.registry
    }

    pub(crate) fn reporter(&self) -> &Reporter {
        &self.0.reporter
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("registry", &self.0.registry.borrow())
            .field("reporter", &self.0.reporter)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SANDBOX
// ============================================================================

/// Owner of one run's state.
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use sandcheck::{host::StdioHost, log::{Logger, LogLevel, MemoryWriter}, Sandbox, Value};
///
/// let logger = Logger::with_writers(LogLevel::Info, MemoryWriter::new(), MemoryWriter::new());
/// let sandbox = Sandbox::new(Rc::new(StdioHost::with_logger(logger)));
/// sandbox.test("adds", |s| {
///     s.assert().equals(&Value::from(2), &Value::from(2), None, false)?;
///     Ok(())
/// });
/// let summary = sandbox.run().unwrap();
/// assert_eq!(summary.tests, 1);
/// assert_eq!(summary.assertion_failures, 0);
/// ```
pub struct Sandbox {
    scope: Scope,
}

impl Sandbox {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self {
            scope: Scope::new(host),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Drains and runs everything declared so far. Called once, after the
    /// script's top-level code.
    pub fn run(self) -> ScriptResult<RunSummary> {
        tracing::debug!("running declared tests");
        Engine::new(&self.scope).run()
    }

    /// Like [`Sandbox::run`], but folds the outcome into a [`RunReport`].
    pub fn run_reported(self) -> RunReport {
        let started = Instant::now();
        let result = Engine::new(&self.scope).run();
        let duration = started.elapsed();
        let events = self.scope.events().history();
        match result {
            Ok(summary) => RunReport {
                events,
                duration,
                summary: Some(summary),
                error: None,
            },
            Err(error) => RunReport {
                events,
                duration,
                summary: None,
                error: Some(error),
            },
        }
    }
}

impl Deref for Sandbox {
    type Target = Scope;

    fn deref(&self) -> &Scope {
        &self.scope
    }
}

impl fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sandbox").field("scope", &self.scope).finish()
    }
}

/// Outcome of [`Sandbox::run_reported`].
#[derive(Debug)]
pub struct RunReport {
    pub events: Vec<Event>,
    pub duration: Duration,
    pub summary: Option<RunSummary>,
    pub error: Option<ScriptError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// A short human-readable summary.
    pub fn to_console(&self) -> String {
        let success = match &self.error {
            None => "yes".to_string(),
            Some(err) => err.to_string(),
        };
        let mut out = format!(
            "Events count: {}\nSuccess: {success}\nDuration: {}ms\n",
            self.events.len(),
            self.duration.as_millis()
        );
        if let Some(summary) = &self.summary {
            out.push_str(&format!(
                "Tests: {} (groups: {}, hooks: {}, failed assertions: {})\n",
                summary.tests, summary.groups, summary.hooks, summary.assertion_failures
            ));
        }
        out
    }
}
