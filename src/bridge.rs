//! The synchronous bridge: `await` for single-threaded script code.
//!
//! A thenable is waited on by polling: a fulfilment handler records the
//! payload into a local slot and the bridge yields to the host until the slot
//! is filled. The host's cooperative yield is the only suspension point; there
//! is no timeout, so a thenable that never settles keeps the loop running.

use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{ScriptError, ScriptResult},
    host::Host,
    value::Value,
};

pub const ARITY_MESSAGE: &str = "await must be called with exactly 1 argument";

/// `await(value)`.
///
/// Non-thenables are returned unchanged without yielding. For a thenable the
/// host is yielded to at least once, and the number of yields equals the
/// number of polls until the payload arrives. A rejection settles the slot
/// with `undefined`.
pub fn await_value(host: &dyn Host, args: &[Value]) -> ScriptResult<Value> {
    let [value] = args else {
        return Err(ScriptError::argument(ARITY_MESSAGE));
    };
    let Some(thenable) = value.as_thenable() else {
        return Ok(value.clone());
    };

    let slot: Rc<RefCell<Option<Value>>> = Rc::default();

    let fulfilled = Rc::clone(&slot);
    thenable.then(move |payload| {
        fulfilled.borrow_mut().get_or_insert(payload);
    })?;

    let rejected = Rc::clone(&slot);
    thenable.catch(move |reason| {
        tracing::warn!(%reason, "awaited value was rejected, resolving to undefined");
        rejected.borrow_mut().get_or_insert(Value::Undefined);
    })?;

    let mut polls: u64 = 0;
    loop {
        host.yield_now();
        polls += 1;
        let ready = slot.borrow_mut().take();
        if let Some(payload) = ready {
            tracing::trace!(polls, "await settled");
            return Ok(payload);
        }
    }
}
