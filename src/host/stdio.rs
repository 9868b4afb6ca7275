//! A reference host over the process streams.
//!
//! Raw output goes through an optional [`PrefixPrinter`]; leveled console
//! output goes through the [`Logger`]. Pending host work is modelled as a
//! FIFO of jobs, one of which runs per cooperative yield.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    fmt,
    time::Duration,
};

use crate::{
    config::SandboxConfig,
    events::Event,
    log::{LogLevel, Logger, PrefixPrinter},
};

use super::{Host, DEFAULT_INTERRUPT_REASON};

pub const ERROR_EVENT_REASON: &str = "error event received";

type Job = Box<dyn FnOnce()>;

pub struct StdioHost {
    logger: Logger,
    printer: Option<PrefixPrinter>,
    env: HashMap<String, String>,
    jobs: RefCell<VecDeque<Job>>,
    interrupts: RefCell<Vec<String>>,
    events: RefCell<Vec<Event>>,
    yields: Cell<usize>,
    fail_on_error_event: bool,
}

impl StdioHost {
    /// Builds a host writing to stdout/stderr, configured from `config`.
    pub fn new(config: &SandboxConfig) -> Self {
        let mut logger = Logger::new(config.log_level, config.color.resolve());
        if config.without_prefix {
            logger = logger.without_prefix();
        }
        let mut host = Self::with_logger(logger);
        host.printer = config.output_prefix.as_deref().map(PrefixPrinter::new);
        host.fail_on_error_event = config.fail_on_error_event;
        host
    }

    /// Builds a host over an existing logger. The environment is snapshotted now.
    pub fn with_logger(logger: Logger) -> Self {
        Self {
            logger,
            printer: None,
            env: std::env::vars().collect(),
            jobs: RefCell::new(VecDeque::new()),
            interrupts: RefCell::new(Vec::new()),
            events: RefCell::new(Vec::new()),
            yields: Cell::new(0),
            fail_on_error_event: false,
        }
    }

    /// Replaces the environment snapshot.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.printer = Some(PrefixPrinter::new(prefix));
        self
    }

    pub fn fail_on_error_event(mut self, enabled: bool) -> Self {
        self.fail_on_error_event = enabled;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Queues host work, e.g. settling a promise once an operation completes.
    pub fn schedule<F>(&self, job: F)
    where
        F: FnOnce() + 'static,
    {
        self.jobs.borrow_mut().push_back(Box::new(job));
    }

    pub fn pending_jobs(&self) -> usize {
        self.jobs.borrow().len()
    }

    pub fn yields(&self) -> usize {
        self.yields.get()
    }

    /// The first interrupt reason, if an interrupt was requested.
    pub fn interrupted(&self) -> Option<String> {
        self.interrupts.borrow().first().cloned()
    }

    pub fn interrupt_reasons(&self) -> Vec<String> {
        self.interrupts.borrow().clone()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn take_events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    fn decorate(&self, text: &str) -> String {
        match &self.printer {
            Some(printer) => printer.apply(text),
            None => text.to_string(),
        }
    }
}

impl Host for StdioHost {
    fn write_stdout(&self, text: &str) {
        self.logger.raw_out(&self.decorate(text));
    }

    fn write_stderr(&self, text: &str) {
        self.logger.raw_err(&self.decorate(text));
    }

    fn log(&self, level: LogLevel, line: &str) {
        match level {
            LogLevel::Debug => self.logger.debug(line),
            LogLevel::Info => self.logger.info(line),
            LogLevel::Warn => self.logger.warn(line),
            LogLevel::Error => self.logger.error(line),
        }
    }

    fn log_level(&self) -> LogLevel {
        self.logger.level()
    }

    fn delay(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    fn interrupt(&self, reason: &str) {
        let reason = if reason.is_empty() {
            DEFAULT_INTERRUPT_REASON
        } else {
            reason
        };
        tracing::debug!(reason, "interrupt requested");
        self.interrupts.borrow_mut().push(reason.to_string());
    }

    fn interrupt_requested(&self) -> Option<String> {
        self.interrupted()
    }

    fn yield_now(&self) {
        self.yields.set(self.yields.get() + 1);
        let job = self.jobs.borrow_mut().pop_front();
        if let Some(job) = job {
            job();
        }
    }

    fn env_var(&self, name: &str) -> Option<String> {
        self.env.get(name).cloned()
    }

    fn report(&self, events: &[Event]) {
        self.events.borrow_mut().extend_from_slice(events);
        if self.fail_on_error_event && events.iter().any(Event::is_error) {
            self.interrupt(ERROR_EVENT_REASON);
        }
    }
}

impl fmt::Debug for StdioHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdioHost")
            .field("logger", &self.logger)
            .field("pending_jobs", &self.pending_jobs())
            .field("yields", &self.yields.get())
            .field("fail_on_error_event", &self.fail_on_error_event)
            .finish_non_exhaustive()
    }
}
