//! Pending host results.
//!
//! A [`Promise`] is settled by the host (usually while the script is parked in
//! a cooperative yield); a [`Thenable`] is anything the bridge can wait on:
//! either a promise or a plain object exposing callable `then` and `catch`.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::error::ScriptResult;

use super::{Function, Object, Value};

/// The three-state lifecycle of a promise. Settled states are final.
#[derive(Debug, Clone, Default)]
pub enum PromiseState {
    #[default]
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

impl PromiseState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for PromiseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Fulfilled(_) => f.write_str("fulfilled"),
            Self::Rejected(_) => f.write_str("rejected"),
        }
    }
}

type Reaction = Box<dyn FnOnce(Value)>;

#[derive(Default)]
struct PromiseInner {
    state: PromiseState,
    on_fulfilled: Vec<Reaction>,
    on_rejected: Vec<Reaction>,
}

/// A host-settled promise with identity semantics.
#[derive(Clone, Default)]
pub struct Promise(Rc<RefCell<PromiseInner>>);

impl Promise {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn resolved(value: Value) -> Self {
        let promise = Self::pending();
        promise.resolve(value);
        promise
    }

    pub fn rejected(reason: Value) -> Self {
        let promise = Self::pending();
        promise.reject(reason);
        promise
    }

    pub fn state(&self) -> PromiseState {
        self.0.borrow().state.clone()
    }

    pub fn is_settled(&self) -> bool {
        self.0.borrow().state.is_settled()
    }

    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Fulfils the promise. Returns `false` if it was already settled.
    pub fn resolve(&self, value: Value) -> bool {
        self.settle(PromiseState::Fulfilled(value))
    }

    /// Rejects the promise. Returns `false` if it was already settled.
    pub fn reject(&self, reason: Value) -> bool {
        self.settle(PromiseState::Rejected(reason))
    }

    /// Registers a fulfilment reaction. Runs immediately if already fulfilled.
    pub fn then<F>(&self, reaction: F)
    where
        F: FnOnce(Value) + 'static,
    {
        let ready = {
            let mut inner = self.0.borrow_mut();
            match &inner.state {
                PromiseState::Pending => {
                    inner.on_fulfilled.push(Box::new(reaction));
                    return;
                }
                PromiseState::Fulfilled(value) => Some(value.clone()),
                PromiseState::Rejected(_) => None,
            }
        };
        if let Some(value) = ready {
            reaction(value);
        }
    }

    /// Registers a rejection reaction. Runs immediately if already rejected.
    pub fn catch<F>(&self, reaction: F)
    where
        F: FnOnce(Value) + 'static,
    {
        let ready = {
            let mut inner = self.0.borrow_mut();
            match &inner.state {
                PromiseState::Pending => {
                    inner.on_rejected.push(Box::new(reaction));
                    return;
                }
                PromiseState::Rejected(reason) => Some(reason.clone()),
                PromiseState::Fulfilled(_) => None,
            }
        };
        if let Some(reason) = ready {
            reaction(reason);
        }
    }

    fn settle(&self, next: PromiseState) -> bool {
        // Reactions run after the borrow is released: they may touch this promise.
        let (reactions, payload) = {
            let mut inner = self.0.borrow_mut();
            if inner.state.is_settled() {
                return false;
            }
            let (payload, fulfilled) = match &next {
                PromiseState::Fulfilled(value) => (value.clone(), true),
                PromiseState::Rejected(reason) => (reason.clone(), false),
                PromiseState::Pending => return false,
            };
            let on_fulfilled = std::mem::take(&mut inner.on_fulfilled);
            let on_rejected = std::mem::take(&mut inner.on_rejected);
            let reactions = if fulfilled { on_fulfilled } else { on_rejected };
            inner.state = next;
            (reactions, payload)
        };
        for reaction in reactions {
            reaction(payload.clone());
        }
        true
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Promise({})", self.0.borrow().state)
    }
}

/// Anything exposing callable `then` and `catch`.
#[derive(Clone, Debug)]
pub enum Thenable {
    Promise(Promise),
    Object(ThenableObject),
}

/// A plain object whose `then` and `catch` properties are functions.
#[derive(Clone, Debug)]
pub struct ThenableObject {
    then: Function,
    catch: Function,
}

impl Thenable {
    /// Detects the thenable capability; `None` means "return the value unchanged".
    pub fn from_value(value: &Value) -> Option<Thenable> {
        match value {
            Value::Promise(promise) => Some(Thenable::Promise(promise.clone())),
            Value::Object(object) => ThenableObject::from_object(object).map(Thenable::Object),
            _ => None,
        }
    }

    pub fn then<F>(&self, reaction: F) -> ScriptResult<()>
    where
        F: FnOnce(Value) + 'static,
    {
        match self {
            Thenable::Promise(promise) => {
                promise.then(reaction);
                Ok(())
            }
            Thenable::Object(object) => object.attach(&object.then, "onFulfilled", reaction),
        }
    }

    pub fn catch<F>(&self, reaction: F) -> ScriptResult<()>
    where
        F: FnOnce(Value) + 'static,
    {
        match self {
            Thenable::Promise(promise) => {
                promise.catch(reaction);
                Ok(())
            }
            Thenable::Object(object) => object.attach(&object.catch, "onRejected", reaction),
        }
    }
}

impl ThenableObject {
    fn from_object(object: &Object) -> Option<Self> {
        let then = object.get("then")?.as_function()?.clone();
        let catch = object.get("catch")?.as_function()?.clone();
        Some(Self { then, catch })
    }

    fn attach<F>(&self, method: &Function, name: &str, reaction: F) -> ScriptResult<()>
    where
        F: FnOnce(Value) + 'static,
    {
        let handler = Function::once(name, move |args| {
            reaction(args.first().cloned().unwrap_or_default());
            Ok(Value::Undefined)
        });
        method.call(&[Value::Function(handler)]).map(|_| ())
    }
}
