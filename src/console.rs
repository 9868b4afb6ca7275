//! The script-facing `console`.

use std::{fmt, rc::Rc};

use crate::{
    format::{render_console_args, should_emit},
    host::Host,
    log::LogLevel,
    value::Value,
};

/// Leveled console output, gated by the host's log level.
#[derive(Clone)]
pub struct Console {
    host: Rc<dyn Host>,
}

impl Console {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self { host }
    }

    pub fn debug(&self, args: &[Value]) {
        self.emit(LogLevel::Debug, args);
    }

    /// Alias of [`Console::info`].
    pub fn log(&self, args: &[Value]) {
        self.emit(LogLevel::Info, args);
    }

    pub fn info(&self, args: &[Value]) {
        self.emit(LogLevel::Info, args);
    }

    pub fn warn(&self, args: &[Value]) {
        self.emit(LogLevel::Warn, args);
    }

    pub fn error(&self, args: &[Value]) {
        self.emit(LogLevel::Error, args);
    }

    fn emit(&self, level: LogLevel, args: &[Value]) {
        if !should_emit(level, self.host.log_level()) {
            return;
        }
        if let Some(line) = render_console_args(args) {
            self.host.log(level, &line);
        }
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, time::Duration};

    use super::*;
    use crate::events::Event;

    struct Capture {
        level: LogLevel,
        out: RefCell<String>,
        err: RefCell<String>,
    }

    impl Host for Capture {
        fn write_stdout(&self, text: &str) {
            self.out.borrow_mut().push_str(text);
        }
        fn write_stderr(&self, text: &str) {
            self.err.borrow_mut().push_str(text);
        }
        fn log_level(&self) -> LogLevel {
            self.level
        }
        fn delay(&self, _: Duration) {}
        fn interrupt(&self, _: &str) {}
        fn yield_now(&self) {}
        fn env_var(&self, _: &str) -> Option<String> {
            None
        }
        fn report(&self, _: &[Event]) {}
    }

    fn capture(level: LogLevel) -> Rc<Capture> {
        Rc::new(Capture {
            level,
            out: RefCell::default(),
            err: RefCell::default(),
        })
    }

    #[test]
    fn routes_errors_to_stderr() {
        let host = capture(LogLevel::Debug);
        let console = Console::new(host.clone());
        console.log(&[Value::from("hello"), Value::array([Value::from(1), Value::from("a")])]);
        console.error(&[Value::from("bad"), Value::Null]);
        assert_eq!(*host.out.borrow(), "hello [1, \"a\"]\n");
        assert_eq!(*host.err.borrow(), "bad null\n");
    }

    #[test]
    fn gates_below_threshold() {
        let host = capture(LogLevel::Warn);
        let console = Console::new(host.clone());
        console.debug(&[Value::from("d")]);
        console.info(&[Value::from("i")]);
        console.warn(&[Value::from("w")]);
        assert_eq!(*host.out.borrow(), "w\n");
    }

    #[test]
    fn empty_call_prints_nothing() {
        let host = capture(LogLevel::Debug);
        Console::new(host.clone()).log(&[]);
        assert!(host.out.borrow().is_empty());
    }
}
