//! Thenable classification and the resolution procedure.
//!
//! Resolution is what lets foreign future-like objects interoperate with
//! [Future]s: any [Object](crate::Object) exposing a resolution hook is turned
//! into a future of our own that follows the hook. Looking the hook up may
//! fault; such a fault is returned as data and never propagated.
use log::trace;

use crate::{
    runtime::Runtime,
    value::{Hook, Value},
};

use super::Future;

/// What a value looks like to the resolution procedure.
pub enum Kind {
    /// One of our own futures.
    Future(Future),
    /// A foreign object with a resolution hook.
    Thenable(Hook),
    /// Looking up the resolution hook faulted with this reason.
    Fault(Value),
    /// Anything else.
    Plain,
}

/// Outcome of [resolve].
pub(crate) enum Resolution {
    Future(Future),
    Fault(Value),
    NotThenable(Value),
}

pub fn classify(value: &Value) -> Kind {
    match value {
        Value::Future(future) => Kind::Future(future.clone()),
        Value::Object(object) => match object.then() {
            Ok(Some(hook)) => Kind::Thenable(hook),
            Ok(None) => Kind::Plain,
            Err(fault) => Kind::Fault(fault),
        },
        _ => Kind::Plain,
    }
}

/// Whether `value` is a future created by this crate.
pub fn is_future(value: &Value) -> bool {
    matches!(value, Value::Future(_))
}

/// Whether `value` exposes a resolution hook. Our own futures do.
///
/// A value whose hook lookup faults is not a thenable.
pub fn is_thenable(value: &Value) -> bool {
    matches!(classify(value), Kind::Future(_) | Kind::Thenable(_))
}

/// Unify `value` with the future model.
///
/// Our own futures are returned as they are. A thenable is wrapped in a new
/// future whose resolver hands the new future's callbacks to the thenable's
/// hook; with `synchronous` the hook is called right away, otherwise on a
/// later turn. Either way a fault raised by the hook rejects the wrapper,
/// unless the hook settled it first.
pub(crate) fn resolve(runtime: &Runtime, value: Value, synchronous: bool) -> Resolution {
    match classify(&value) {
        Kind::Future(future) => Resolution::Future(future),
        Kind::Thenable(hook) => Resolution::Future(wrap(runtime, hook, synchronous)),
        Kind::Fault(fault) => Resolution::Fault(fault),
        Kind::Plain => Resolution::NotThenable(value),
    }
}

fn wrap(runtime: &Runtime, hook: Hook, synchronous: bool) -> Future {
    if synchronous {
        trace!("Calling resolution hook inline");
        return runtime.future(move |resolve, reject| hook(resolve, reject));
    }

    let rt = runtime.clone();
    runtime.future(move |resolve, reject| {
        rt.schedule(Box::new(move || {
            trace!("Calling deferred resolution hook");
            if let Err(fault) = hook(resolve, reject.clone()) {
                reject.call(fault);
            }
        }));
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::{classify, is_future, is_thenable, Kind};
    use crate::{
        future::{rethrow, State},
        task::Executor,
        value::{Hook, Object, Value},
    };

    #[derive(Debug)]
    struct FaultingAccessor;

    impl Object for FaultingAccessor {
        fn then(&self) -> Result<Option<Hook>, Value> {
            Err("getter threw".into())
        }
    }

    #[derive(Debug)]
    struct NoHook;

    impl Object for NoHook {
        fn then(&self) -> Result<Option<Hook>, Value> {
            Ok(None)
        }
    }

    #[test]
    fn classification() {
        let exec = Executor::new();
        let rt = exec.runtime();

        let fut = Value::from(rt.resolve(1));
        assert!(is_future(&fut));
        assert!(is_thenable(&fut));

        let thenable = Value::thenable(|_, _| Ok(()));
        assert!(!is_future(&thenable));
        assert!(is_thenable(&thenable));

        let faulty = Value::Object(Rc::new(FaultingAccessor));
        assert!(!is_thenable(&faulty));
        assert!(matches!(classify(&faulty), Kind::Fault(reason) if reason == Value::from("getter threw")));

        let plain_object = Value::Object(Rc::new(NoHook));
        assert!(matches!(classify(&plain_object), Kind::Plain));

        for plain in [Value::Null, 3.into(), "s".into(), Value::List(vec![])] {
            assert!(matches!(classify(&plain), Kind::Plain));
        }
    }

    #[test]
    fn faulting_accessor_rejects() {
        let exec = Executor::new();
        let rt = exec.runtime();
        let d = rt.deferred();

        d.resolve.call(Value::Object(Rc::new(FaultingAccessor)));
        assert_eq!(d.future.state(), State::Rejected("getter threw".into()));
    }

    #[test]
    fn object_without_hook_is_a_plain_value() {
        let exec = Executor::new();
        let rt = exec.runtime();
        let object = Value::Object(Rc::new(NoHook));

        let fut = rt.resolve(object.clone());
        assert_eq!(fut.state(), State::Fulfilled(object));
    }

    #[test]
    fn synchronous_hook_settles_once() {
        let exec = Executor::new();
        let rt = exec.runtime();
        let d = rt.deferred();

        d.resolve.call(Value::thenable(|resolve, reject| {
            resolve.call("first");
            reject.call("second");
            resolve.call("third");
            Err("fourth".into())
        }));

        assert_eq!(exec.block_on(d.future).unwrap(), Ok("first".into()));
    }

    #[test]
    fn hook_fault_rejects() {
        let exec = Executor::new();
        let rt = exec.runtime();
        let d = rt.deferred();

        d.resolve.call(Value::thenable(|_, _| Err("hook threw".into())));
        assert_eq!(exec.block_on(d.future).unwrap(), Err("hook threw".into()));
    }

    #[test]
    fn deferred_hook_fault_rejects() {
        let exec = Executor::new();
        let rt = exec.runtime();

        let fut = rt.resolve(Value::thenable(|_, _| Err("hook threw".into())));
        assert_eq!(fut.state(), State::Pending);
        assert_eq!(exec.block_on(fut).unwrap(), Err("hook threw".into()));
    }

    #[test]
    fn deferred_hook_fault_after_settling_is_ignored() {
        let exec = Executor::new();
        let rt = exec.runtime();

        let fut = rt.resolve(Value::thenable(|resolve, _| {
            resolve.call("kept");
            Err("ignored".into())
        }));
        assert_eq!(exec.block_on(fut).unwrap(), Ok("kept".into()));
    }

    #[test]
    fn reaction_returning_a_faulting_thenable_rejects() {
        let exec = Executor::new();
        let rt = exec.runtime();

        let fut = rt.resolve(1).then(
            |_| Ok(Value::thenable(|_, _| Err("hook threw".into()))),
            rethrow,
        );
        assert_eq!(exec.block_on(fut).unwrap(), Err("hook threw".into()));
    }

    #[test]
    fn hook_may_settle_later() {
        let exec = Executor::new();
        let rt = exec.runtime();
        let d = rt.deferred();
        let stash = Rc::new(std::cell::RefCell::new(None));

        let keep = stash.clone();
        d.resolve.call(Value::thenable(move |resolve, _| {
            *keep.borrow_mut() = Some(resolve);
            Ok(())
        }));

        exec.run();
        assert_eq!(d.future.state(), State::Pending);

        let resolve = stash.borrow_mut().take().unwrap();
        resolve.call(42);
        assert_eq!(exec.block_on(d.future).unwrap(), Ok(42.into()));
    }

    #[test]
    fn deferred_hook_runs_on_a_later_turn() {
        let exec = Executor::new();
        let rt = exec.runtime();
        let calls = Rc::new(Cell::new(0));

        let counter = calls.clone();
        let fut = rt.resolve(Value::thenable(move |resolve, _| {
            counter.set(counter.get() + 1);
            resolve.call("via hook");
            Ok(())
        }));

        assert_eq!(calls.get(), 0);
        assert_eq!(exec.block_on(fut).unwrap(), Ok("via hook".into()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn hook_resolving_with_a_thenable_is_followed() {
        let exec = Executor::new();
        let rt = exec.runtime();

        let inner = Value::thenable(|_, reject| {
            reject.call("deep");
            Ok(())
        });
        let outer = Value::thenable(move |resolve, _| {
            resolve.call(inner.clone());
            Ok(())
        });

        assert_eq!(exec.block_on(rt.resolve(outer)).unwrap(), Err("deep".into()));
    }
}
