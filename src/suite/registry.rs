//! Registration queues for hooks, tests and groups.
//!
//! ## Ordering
//! Every queue is FIFO. Hooks are kept per [`HookPhase`] in insertion order and
//! identified by an opaque [`HookId`]; the id only lets an entry be consumed,
//! it carries no meaning. Tests and groups are keyed by name: registering a
//! name that is still queued replaces the queued callback in place, keeping
//! the original position.
//!
//! ## Nesting
//! Groups do not open a scope of their own. A group callback registers into
//! the same queues as top-level code, so hooks declared inside a group apply
//! to every test of the run.

use std::{collections::VecDeque, fmt, rc::Rc};

use crate::{error::ScriptResult, sandbox::Scope};

/// A hook callback. Receives the current test name for the `*Each` phases.
pub type HookFn = Rc<dyn Fn(&Scope, Option<&str>) -> ScriptResult<()>>;

/// A test body or group callback. Runs at most once.
pub type BodyFn = Box<dyn FnOnce(&Scope) -> ScriptResult<()>>;

/// Lifecycle phase a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    BeforeAll,
    BeforeEach,
    AfterEach,
    AfterAll,
}

impl HookPhase {
    pub const ALL: [HookPhase; 4] = [
        HookPhase::BeforeAll,
        HookPhase::BeforeEach,
        HookPhase::AfterEach,
        HookPhase::AfterAll,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HookPhase::BeforeAll => "beforeAll",
            HookPhase::BeforeEach => "beforeEach",
            HookPhase::AfterEach => "afterEach",
            HookPhase::AfterAll => "afterAll",
        }
    }

    fn index(self) -> usize {
        match self {
            HookPhase::BeforeAll => 0,
            HookPhase::BeforeEach => 1,
            HookPhase::AfterEach => 2,
            HookPhase::AfterAll => 3,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, monotonically assigned hook identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

#[derive(Clone)]
pub struct HookEntry {
    pub id: HookId,
    pub callback: HookFn,
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry").field("id", &self.id).finish()
    }
}

/// An insertion-ordered queue keyed by name.
pub struct NamedQueue<F> {
    entries: VecDeque<(String, F)>,
}

impl<F> Default for NamedQueue<F> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<F> NamedQueue<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `callback` under `name`.
    ///
    /// # Returns
    /// `true` if a queued entry with the same name was replaced. The replaced
    /// callback is dropped without running and the entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, callback: F) -> bool {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => {
                slot.1 = callback;
                true
            }
            None => {
                self.entries.push_back((name, callback));
                false
            }
        }
    }

    /// Removes and returns the oldest entry.
    pub fn pop_front(&mut self) -> Option<(String, F)> {
        self.entries.pop_front()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F> fmt::Debug for NamedQueue<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// All queued registrations of one run.
#[derive(Default)]
pub struct Registry {
    next_hook_id: u64,
    hooks: [VecDeque<HookEntry>; 4],
    tests: NamedQueue<BodyFn>,
    groups: NamedQueue<BodyFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook to `phase`.
    ///
    /// # Example
    /// ```rust
    /// use std::rc::Rc;
    /// use sandcheck::suite::{HookPhase, Registry};
    /// let mut registry = Registry::new();
    /// let a = registry.register_hook(HookPhase::BeforeEach, Rc::new(|_, _| Ok(())));
    /// let b = registry.register_hook(HookPhase::BeforeEach, Rc::new(|_, _| Ok(())));
    /// assert!(a < b);
    /// assert_eq!(registry.hook_count(HookPhase::BeforeEach), 2);
    /// ```
    pub fn register_hook(&mut self, phase: HookPhase, callback: HookFn) -> HookId {
        let id = HookId(self.next_hook_id);
        self.next_hook_id += 1;
        self.hooks[phase.index()].push_back(HookEntry { id, callback });
        id
    }

    /// Queues a test. Returns `true` if a queued test with the same name was
    /// replaced.
    pub fn register_test(&mut self, name: impl Into<String>, body: BodyFn) -> bool {
        self.tests.insert(name, body)
    }

    /// Queues a group. Returns `true` if a queued group with the same name
    /// was replaced.
    pub fn register_group(&mut self, name: impl Into<String>, callback: BodyFn) -> bool {
        self.groups.insert(name, callback)
    }

    /// Removes the oldest hook of `phase`.
    pub fn pop_hook(&mut self, phase: HookPhase) -> Option<HookEntry> {
        self.hooks[phase.index()].pop_front()
    }

    /// Snapshot of the hooks of `phase`, in order, without consuming them.
    pub fn hooks(&self, phase: HookPhase) -> Vec<HookEntry> {
        self.hooks[phase.index()].iter().cloned().collect()
    }

    pub fn hook_count(&self, phase: HookPhase) -> usize {
        self.hooks[phase.index()].len()
    }

    pub fn pop_test(&mut self) -> Option<(String, BodyFn)> {
        self.tests.pop_front()
    }

    pub fn pop_group(&mut self) -> Option<(String, BodyFn)> {
        self.groups.pop_front()
    }

    pub fn tests(&self) -> &NamedQueue<BodyFn> {
        &self.tests
    }

    pub fn groups(&self) -> &NamedQueue<BodyFn> {
        &self.groups
    }

    pub fn has_tests(&self) -> bool {
        !self.tests.is_empty()
    }

    pub fn has_groups(&self) -> bool {
        !self.groups.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Registry");
        for phase in HookPhase::ALL {
            s.field(phase.as_str(), &self.hook_count(phase));
        }
        s.field("tests", &self.tests)
            .field("groups", &self.groups)
            .finish()
    }
}
