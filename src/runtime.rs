use std::{fmt, rc::Rc};

use crate::{
    future::{Deferred, Future, Reject, Resolve},
    task::{Job, Scheduler},
    value::Value,
};

/// The context futures are created in.
///
/// A runtime carries the [Scheduler] that every future created through it,
/// and every future derived from those, uses to defer its reactions. It is a
/// cheap handle; clone it freely.
///
/// The static constructors [resolve](Runtime::resolve),
/// [reject](Runtime::reject), [race](Runtime::race) and [all](Runtime::all)
/// live here as well.
#[derive(Clone)]
pub struct Runtime {
    scheduler: Rc<dyn Scheduler>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new<S>(scheduler: S) -> Self
    where
        S: Scheduler + 'static,
    {
        Self {
            scheduler: Rc::new(scheduler),
        }
    }

    pub(crate) fn schedule(&self, job: Job) {
        self.scheduler.schedule(job);
    }

    /// Create a future from a resolver.
    ///
    /// `resolver` is called immediately with the new future's resolve and
    /// reject callbacks. If it returns `Err`, the future is rejected with the
    /// error, unless one of the callbacks already settled it.
    ///
    /// ```
    /// use pledge::{task::Executor, Value};
    /// let exec = Executor::new();
    /// let rt = exec.runtime();
    ///
    /// let fut = rt.future(|resolve, _reject| {
    ///     resolve.call("ok");
    ///     Err(Value::from("ignored"))
    /// });
    ///
    /// assert_eq!(exec.block_on(fut).unwrap(), Ok(Value::from("ok")));
    /// ```
    pub fn future<F>(&self, resolver: F) -> Future
    where
        F: FnOnce(Resolve, Reject) -> Result<(), Value>,
    {
        Future::new(self.clone(), resolver)
    }

    /// Create a pending future along with its resolve and reject callbacks.
    pub fn deferred(&self) -> Deferred {
        let future = Future::pending(self.clone());

        Deferred {
            resolve: Resolve::new(future.clone()),
            reject: Reject::new(future.clone()),
            future,
        }
    }
}
