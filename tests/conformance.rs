//! Promise/A+ style behaviour, driven through the public API only.
use std::{cell::RefCell, rc::Rc};

use anyhow::Result;
use pledge::{
    identity, rethrow, task::Executor, Deferred, Error, Future, Hook, Object, Runtime, State, Value,
};

struct Adapter {
    exec: Executor,
    rt: Runtime,
}

impl Adapter {
    fn new() -> Self {
        let exec = Executor::new();
        let rt = exec.runtime();
        Self { exec, rt }
    }

    fn deferred(&self) -> Deferred {
        self.rt.deferred()
    }

    fn resolved(&self, value: impl Into<Value>) -> Future {
        self.rt.resolve(value)
    }

    fn rejected(&self, reason: impl Into<Value>) -> Future {
        self.rt.reject(reason)
    }

    fn outcome(&self, future: Future) -> Result<Result<Value, Value>> {
        Ok(self.exec.block_on(future)?)
    }
}

type Log = Rc<RefCell<Vec<String>>>;

fn record(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

#[test]
fn fulfilled_value_reaches_every_reaction() -> Result<()> {
    let t = Adapter::new();
    let d = t.deferred();
    let log: Log = Rc::default();

    for name in ["a", "b", "c"] {
        let log = log.clone();
        d.future.then(
            move |v| {
                record(&log, format!("{name}:{v}"));
                Ok(v)
            },
            rethrow,
        );
    }

    d.resolve.call("x");
    t.exec.run();

    assert_eq!(*log.borrow(), vec!["a:x", "b:x", "c:x"]);
    Ok(())
}

#[test]
fn only_matching_reaction_runs() -> Result<()> {
    let t = Adapter::new();
    let log: Log = Rc::default();

    let (l1, l2) = (log.clone(), log.clone());
    t.rejected("r").then(
        move |_| {
            record(&l1, "fulfilled");
            Ok(Value::Null)
        },
        move |_| {
            record(&l2, "rejected");
            Ok(Value::Null)
        },
    );
    t.exec.run();

    assert_eq!(*log.borrow(), vec!["rejected"]);
    Ok(())
}

#[test]
fn reactions_run_after_current_code() -> Result<()> {
    let t = Adapter::new();
    let log: Log = Rc::default();

    let inner = log.clone();
    t.resolved(1).then(
        move |v| {
            record(&inner, "reaction");
            Ok(v)
        },
        rethrow,
    );
    record(&log, "after then");

    t.exec.run();
    assert_eq!(*log.borrow(), vec!["after then", "reaction"]);
    Ok(())
}

#[test]
fn recovery_fulfills_next() -> Result<()> {
    let t = Adapter::new();

    let fut = t
        .rejected("bad")
        .catch(|reason| Ok(Value::from(format!("handled {reason}"))));

    assert_eq!(t.outcome(fut)?, Ok("handled bad".into()));
    Ok(())
}

#[test]
fn then_returning_rejected_future_rejects_next() -> Result<()> {
    let t = Adapter::new();
    let failure = t.rejected("inner");

    let fut = t.resolved(1).then(move |_| Ok(failure.into()), rethrow);

    assert_eq!(t.outcome(fut)?, Err("inner".into()));
    Ok(())
}

#[test]
fn chain_of_then_calls() -> Result<()> {
    let t = Adapter::new();

    let mut fut = t.resolved(0);
    for _ in 0..10 {
        fut = fut.then(
            |v| Ok(Value::from(v.as_number().unwrap_or_default() + 1.0)),
            rethrow,
        );
    }

    assert_eq!(t.outcome(fut)?, Ok(10.into()));
    Ok(())
}

#[test]
fn thenable_returned_from_reaction_is_adopted() -> Result<()> {
    let t = Adapter::new();

    let fut = t.resolved(1).then(
        |_| {
            Ok(Value::thenable(|resolve, _| {
                resolve.call("from thenable");
                Ok(())
            }))
        },
        rethrow,
    );

    assert_eq!(t.outcome(fut)?, Ok("from thenable".into()));
    Ok(())
}

#[test]
fn faulting_then_accessor_in_reaction_result_rejects() -> Result<()> {
    #[derive(Debug)]
    struct Trap;

    impl Object for Trap {
        fn then(&self) -> std::result::Result<Option<Hook>, Value> {
            Err("trap".into())
        }
    }

    let t = Adapter::new();
    let fut = t
        .resolved(1)
        .then(|_| Ok(Value::Object(Rc::new(Trap))), rethrow);

    assert_eq!(t.outcome(fut)?, Err("trap".into()));
    Ok(())
}

#[test]
fn cycle_is_reported_not_hung() -> Result<()> {
    let t = Adapter::new();
    let me: Rc<RefCell<Option<Future>>> = Rc::default();

    let slot = me.clone();
    let fut = t.resolved(1).then(
        move |_| {
            Ok(slot
                .borrow()
                .clone()
                .map(Value::Future)
                .unwrap_or(Value::Undefined))
        },
        rethrow,
    );
    *me.borrow_mut() = Some(fut.clone());

    assert_eq!(t.outcome(fut)?, Err(Error::ChainingCycle.into()));
    Ok(())
}

#[test]
fn unhandled_rejection_is_only_visible_through_state() -> Result<()> {
    let t = Adapter::new();

    let fut = t.resolved(1).then(|_| Err("lost".into()), rethrow);
    t.exec.run();

    assert_eq!(fut.state(), State::Rejected("lost".into()));
    Ok(())
}

#[test]
fn combinators_compose() -> Result<()> {
    let t = Adapter::new();
    let a = t.deferred();
    let b = t.deferred();

    let both = t.rt.all(Value::List(vec![
        a.future.clone().into(),
        b.future.clone().into(),
    ]));
    let first = t.rt.race(Value::List(vec![
        both.clone().into(),
        t.deferred().future.into(),
    ]));
    let summed = first.then(
        |v| {
            let total: f64 = v
                .as_list()
                .unwrap_or_default()
                .iter()
                .filter_map(Value::as_number)
                .sum();
            Ok(total.into())
        },
        rethrow,
    );

    b.resolve.call(2);
    a.resolve.call(t.resolved(40));

    assert_eq!(t.outcome(summed.then(identity, rethrow))?, Ok(42.into()));
    Ok(())
}
