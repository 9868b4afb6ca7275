//! Shared fixtures: a recording host and an ordering trace.
#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    rc::Rc,
    time::Duration,
};

use sandcheck::{events::Event, host::Host, log::LogLevel, Sandbox};

/// A host that records everything and settles work on demand.
pub struct RecordingHost {
    pub level: LogLevel,
    pub stdout: RefCell<String>,
    pub stderr: RefCell<String>,
    pub events: RefCell<Vec<Event>>,
    pub interrupts: RefCell<Vec<String>>,
    pub delays: RefCell<Vec<Duration>>,
    pub env: HashMap<String, String>,
    yields: Cell<usize>,
    jobs: RefCell<VecDeque<Box<dyn FnOnce()>>>,
}

impl RecordingHost {
    pub fn new(level: LogLevel) -> Rc<Self> {
        Rc::new(Self {
            level,
            stdout: RefCell::default(),
            stderr: RefCell::default(),
            events: RefCell::default(),
            interrupts: RefCell::default(),
            delays: RefCell::default(),
            env: HashMap::from([("SANDCHECK_TARGET".to_string(), "local".to_string())]),
            yields: Cell::new(0),
            jobs: RefCell::default(),
        })
    }

    pub fn yields(&self) -> usize {
        self.yields.get()
    }

    /// Queues work that runs on a later yield, one job per yield.
    pub fn schedule(&self, job: impl FnOnce() + 'static) {
        self.jobs.borrow_mut().push_back(Box::new(job));
    }

    /// Queues `idle` no-op yields followed by `job`.
    pub fn schedule_after(&self, idle: usize, job: impl FnOnce() + 'static) {
        for _ in 0..idle {
            self.schedule(|| {});
        }
        self.schedule(job);
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.is_error())
            .map(|e| e.message.clone())
            .collect()
    }
}

impl Host for RecordingHost {
    fn write_stdout(&self, text: &str) {
        self.stdout.borrow_mut().push_str(text);
    }

    fn write_stderr(&self, text: &str) {
        self.stderr.borrow_mut().push_str(text);
    }

    fn log_level(&self) -> LogLevel {
        self.level
    }

    fn delay(&self, duration: Duration) {
        self.delays.borrow_mut().push(duration);
    }

    fn interrupt(&self, reason: &str) {
        self.interrupts.borrow_mut().push(reason.to_string());
    }

    fn interrupt_requested(&self) -> Option<String> {
        self.interrupts.borrow().first().cloned()
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
    }
}

/// An append-only log of what ran, shared with callbacks.
#[derive(Clone, Default)]
pub struct Trace(Rc<RefCell<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.borrow().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }
}

pub fn sandbox(level: LogLevel) -> (Sandbox, Rc<RecordingHost>) {
    let host = RecordingHost::new(level);
    (Sandbox::new(host.clone()), host)
}
