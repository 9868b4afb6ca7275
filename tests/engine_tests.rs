//! Declaration ordering, hook lifecycle and failure semantics of a run.

mod common;

use common::{sandbox, Trace};
use sandcheck::{log::LogLevel, ErrorType, ScriptError, Value};

#[test]
fn tests_run_in_registration_order() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();
    for name in ["c", "a", "b", "z"] {
        let t = trace.clone();
        sandbox.test(name, move |_| {
            t.push(name);
            Ok(())
        });
    }

    let summary = sandbox.run().unwrap();
    assert_eq!(trace.entries(), vec!["c", "a", "b", "z"]);
    assert_eq!(summary.tests, 4);
}

#[test]
fn all_groups_run_before_any_test_body() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    let t = trace.clone();
    sandbox.describe("first group", move |s| {
        t.push("group 1");
        let t = t.clone();
        s.test("test 1", move |_| {
            t.push("test 1");
            Ok(())
        });
        Ok(())
    });
    let t = trace.clone();
    sandbox.describe("second group", move |s| {
        t.push("group 2");
        let t = t.clone();
        s.test("test 2", move |_| {
            t.push("test 2");
            Ok(())
        });
        Ok(())
    });

    let summary = sandbox.run().unwrap();
    assert_eq!(
        trace.entries(),
        vec!["group 1", "group 2", "test 1", "test 2"]
    );
    assert_eq!(summary.groups, 2);
}

#[test]
fn nested_groups_are_drained_before_tests() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    let t = trace.clone();
    sandbox.describe("outer", move |s| {
        t.push("outer");
        let inner = t.clone();
        s.describe("inner", move |s| {
            inner.push("inner");
            let body = inner.clone();
            s.test("deep", move |_| {
                body.push("deep");
                Ok(())
            });
            Ok(())
        });
        let body = t.clone();
        s.test("shallow", move |_| {
            body.push("shallow");
            Ok(())
        });
        Ok(())
    });

    sandbox.run().unwrap();
    assert_eq!(trace.entries(), vec!["outer", "inner", "shallow", "deep"]);
}

#[test]
fn hook_lifecycle_across_groups() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    let t = trace.clone();
    sandbox.before_all(move |_, name| {
        assert!(name.is_none());
        t.push("beforeAll");
        Ok(())
    });
    let t = trace.clone();
    sandbox.before_each(move |_, name| {
        t.push(format!("beforeEach {}", name.unwrap_or("?")));
        Ok(())
    });
    let t = trace.clone();
    sandbox.after_each(move |_, name| {
        t.push(format!("afterEach {}", name.unwrap_or("?")));
        Ok(())
    });
    let t = trace.clone();
    sandbox.after_all(move |_, _| {
        t.push("afterAll");
        Ok(())
    });

    for group in ["g1", "g2"] {
        let t = trace.clone();
        sandbox.describe(group, move |s| {
            let t = t.clone();
            s.test(format!("{group} test"), move |_| {
                t.push(format!("{group} test"));
                Ok(())
            });
            Ok(())
        });
    }

    let summary = sandbox.run().unwrap();
    assert_eq!(
        trace.entries(),
        vec![
            "beforeAll",
            "beforeEach g1 test",
            "g1 test",
            "afterEach g1 test",
            "beforeEach g2 test",
            "g2 test",
            "afterEach g2 test",
            "afterAll",
        ]
    );
    assert_eq!(trace.count("beforeAll"), 1);
    assert_eq!(trace.count("afterAll"), 1);
    assert_eq!(summary.hooks, 6);
}

#[test]
fn all_hooks_are_skipped_without_tests() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();
    let t = trace.clone();
    sandbox.before_all(move |_, _| {
        t.push("beforeAll");
        Ok(())
    });
    sandbox.describe("empty", |_| Ok(()));

    let summary = sandbox.run().unwrap();
    assert!(trace.entries().is_empty());
    assert_eq!(summary.groups, 1);
    assert_eq!(summary.tests, 0);
}

#[test]
fn groups_registered_by_tests_run_in_a_later_pass() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    let t = trace.clone();
    sandbox.after_all(move |_, _| {
        t.push("afterAll");
        Ok(())
    });
    let t = trace.clone();
    sandbox.test("first", move |s| {
        t.push("first");
        let t = t.clone();
        s.describe("late", move |s| {
            t.push("late group");
            let t = t.clone();
            s.test("late test", move |_| {
                t.push("late test");
                Ok(())
            });
            Ok(())
        });
        Ok(())
    });

    let summary = sandbox.run().unwrap();
    assert_eq!(
        trace.entries(),
        vec!["first", "afterAll", "late group", "late test"]
    );
    assert_eq!(summary.tests, 2);
}

#[test]
fn same_name_overwrites_silently() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    let t = trace.clone();
    sandbox.test("dup", move |_| {
        t.push("first body");
        Ok(())
    });
    let t = trace.clone();
    sandbox.it("other", move |_| {
        t.push("other");
        Ok(())
    });
    let t = trace.clone();
    sandbox.test("dup", move |_| {
        t.push("second body");
        Ok(())
    });

    let summary = sandbox.run().unwrap();
    assert_eq!(trace.entries(), vec!["second body", "other"]);
    assert_eq!(summary.tests, 2);
}

#[test]
fn must_be_failure_interrupts_once_and_stops_the_run() {
    let (sandbox, host) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    let t = trace.clone();
    sandbox.test("passes", move |_| {
        t.push("passes");
        Ok(())
    });
    let t = trace.clone();
    sandbox.test("fails", move |s| {
        t.push("fails");
        s.must_be().equals(&Value::from(1), &Value::from(2), None)?;
        t.push("after failure");
        Ok(())
    });
    let t = trace.clone();
    sandbox.test("never", move |_| {
        t.push("never");
        Ok(())
    });
    let t = trace.clone();
    sandbox.after_all(move |_, _| {
        t.push("afterAll");
        Ok(())
    });

    let err = sandbox.run().unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Interrupt);
    assert_eq!(trace.entries(), vec!["passes", "fails"]);
    assert_eq!(*host.interrupts.borrow(), vec!["1 and 2 are not the same".to_string()]);
    assert_eq!(host.error_messages(), vec!["1 and 2 are not the same"]);
}

#[test]
fn swallowed_interrupt_still_stops_the_run() {
    let (sandbox, host) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    sandbox.test("swallows", |s| {
        let _ = s.require().is_true(&Value::from(false), Some("must hold"));
        Ok(())
    });
    let t = trace.clone();
    sandbox.test("never", move |_| {
        t.push("never");
        Ok(())
    });

    let err = sandbox.run().unwrap_err();
    assert!(err.is_interrupt());
    assert_eq!(err.to_string(), "interrupted: must hold");
    assert!(trace.entries().is_empty());
    assert_eq!(host.interrupts.borrow().len(), 1);
}

#[test]
fn soft_failures_continue_and_are_counted() {
    let (sandbox, host) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    sandbox.test("soft", |s| {
        s.assert().is_true(&Value::from(false), None, false)?;
        s.assert().equals(&Value::from(1), &Value::from("1"), None, false)?;
        Ok(())
    });
    let t = trace.clone();
    sandbox.test("next", move |_| {
        t.push("next");
        Ok(())
    });

    let summary = sandbox.run().unwrap();
    assert_eq!(trace.entries(), vec!["next"]);
    assert_eq!(summary.assertion_failures, 2);
    assert!(host.interrupts.borrow().is_empty());
    assert_eq!(
        host.error_messages(),
        vec!["Expected true but got false", "1 and 1 are not the same"]
    );
    assert_eq!(
        *host.stderr.borrow(),
        "Expected true but got false false\n1 and 1 are not the same 1 \"1\"\n"
    );
}

#[test]
fn uncaught_errors_abort_everything() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    let t = trace.clone();
    sandbox.after_each(move |_, _| {
        t.push("afterEach");
        Ok(())
    });
    sandbox.test("throws", |_| Err(ScriptError::uncaught("boom")));
    let t = trace.clone();
    sandbox.test("never", move |_| {
        t.push("never");
        Ok(())
    });

    let err = sandbox.run().unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Uncaught);
    assert!(trace.entries().is_empty());

    let report = format!("{:?}", miette::Report::new(err));
    assert!(report.contains("sandcheck::uncaught"));
}

#[test]
fn failing_hook_aborts_before_the_body() {
    let (sandbox, _) = sandbox(LogLevel::Error);
    let trace = Trace::default();

    sandbox.before_each(|_, _| Err(ScriptError::uncaught("setup failed")));
    let t = trace.clone();
    sandbox.test("body", move |_| {
        t.push("body");
        Ok(())
    });

    assert!(sandbox.run().is_err());
    assert!(trace.position("body").is_none());
}
