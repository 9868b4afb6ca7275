//! The drain-and-run loop.
//!
//! Each pass first drains every queued group, so all declarations are in
//! place before any test body runs. Then, if tests are queued, `beforeAll`
//! hooks run once, every test runs between its `beforeEach` and `afterEach`
//! hooks, and `afterAll` hooks run once. Passes repeat while test bodies keep
//! registering new groups.
//!
//! Any error returned by a callback aborts the whole run. An interrupt
//! requested through the reporter, or one the host has pending, stops the
//! run before the next step even when the callback that triggered it
//! swallowed the error.

use std::cell::RefCell;

use serde::Serialize;

use crate::{
    assert::Reporter,
    error::{ScriptError, ScriptResult},
    sandbox::Scope,
};

use super::registry::{HookPhase, Registry};

/// Counters for a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    pub groups: usize,
    pub tests: usize,
    pub hooks: usize,
    pub assertion_failures: usize,
}

pub struct Engine<'a> {
    scope: &'a Scope,
    registry: &'a RefCell<Registry>,
    reporter: &'a Reporter,
    summary: RunSummary,
}

impl<'a> Engine<'a> {
    pub fn new(scope: &'a Scope) -> Self {
        Self {
            scope,
            registry: scope.registry(),
            reporter: scope.reporter(),
            summary: RunSummary::default(),
        }
    }

    pub fn run(mut self) -> ScriptResult<RunSummary> {
        loop {
            self.drain_groups()?;

            if self.registry.borrow().has_tests() {
                self.drain_hooks(HookPhase::BeforeAll)?;
                self.drain_tests()?;
                self.drain_hooks(HookPhase::AfterAll)?;
            }

            if !self.registry.borrow().has_groups() {
                break;
            }
            tracing::debug!("test bodies registered new groups, running another pass");
        }

        self.summary.assertion_failures = self.reporter.failures();
        Ok(self.summary)
    }

    fn ensure_running(&self) -> ScriptResult<()> {
        match self.reporter.pending_interrupt() {
            Some(reason) => Err(ScriptError::interrupted(reason)),
            None => Ok(()),
        }
    }

    fn drain_groups(&mut self) -> ScriptResult<()> {
        loop {
            self.ensure_running()?;
            // the borrow ends before the callback runs: groups register into the registry
            let next = self.registry.borrow_mut().pop_group();
            let Some((name, callback)) = next else {
                return Ok(());
            };
            tracing::debug!(group = %name, "running group");
            callback(self.scope)?;
            self.summary.groups += 1;
        }
    }

    fn drain_hooks(&mut self, phase: HookPhase) -> ScriptResult<()> {
        loop {
            self.ensure_running()?;
            let next = self.registry.borrow_mut().pop_hook(phase);
            let Some(hook) = next else {
                return Ok(());
            };
            tracing::debug!(%phase, id = ?hook.id, "running hook");
            (hook.callback)(self.scope, None)?;
            self.summary.hooks += 1;
        }
    }

    fn run_kept_hooks(&mut self, phase: HookPhase, test: &str) -> ScriptResult<()> {
        let hooks = self.registry.borrow().hooks(phase);
        for hook in hooks {
            self.ensure_running()?;
            (hook.callback)(self.scope, Some(test))?;
            self.summary.hooks += 1;
        }
        Ok(())
    }

    fn drain_tests(&mut self) -> ScriptResult<()> {
        loop {
            self.ensure_running()?;
            let next = self.registry.borrow_mut().pop_test();
            let Some((name, body)) = next else {
                return Ok(());
            };
            let _span = tracing::debug_span!("test", name = %name).entered();

            self.run_kept_hooks(HookPhase::BeforeEach, &name)?;
            self.ensure_running()?;
            body(self.scope)?;
            self.summary.tests += 1;
            self.run_kept_hooks(HookPhase::AfterEach, &name)?;
        }
    }
}
