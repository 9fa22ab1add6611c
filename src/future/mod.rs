//! The future state machine.
//!
//! A [Future] starts out pending and settles exactly once, either fulfilled
//! with a value or rejected with a reason. Code interested in the outcome
//! registers reactions with [Future::then] or [Future::catch]; each call
//! returns a new future for the reaction's own result, so reactions chain.
//!
//! Reactions always run on a later turn, through the runtime's
//! [Scheduler](crate::task::Scheduler), even when the future had already
//! settled by the time they were registered. Reactions registered on the same
//! future run in the order they were registered.
//!
//! # Resolution
//!
//! Fulfilling a future with another future, or with a thenable
//! [Object](crate::Object), does not fulfill it with that value. Instead the
//! future *adopts* it and settles however the adopted value eventually does.
//! Adoption chains of any length are followed one scheduled hop at a time, so
//! they never grow the call stack.
//!
//! Rejection reasons are never unwrapped.
//!
//! # Example
//!
//! ```
//! use pledge::{identity, task::Executor, Value};
//! let exec = Executor::new();
//! let rt = exec.runtime();
//!
//! let fut = rt
//!     .reject("boom")
//!     .then(|_| Ok(Value::from("unreachable")), |reason| Err(reason))
//!     .catch(|reason| Ok(Value::from(format!("recovered from {reason}"))))
//!     .then(identity, |_| Ok(Value::Null));
//!
//! assert_eq!(
//!     exec.block_on(fut).unwrap(),
//!     Ok(Value::from("recovered from boom"))
//! );
//! ```
use std::{cell::RefCell, fmt, mem, rc::Rc};

use log::{debug, trace};

use crate::{error::Error, runtime::Runtime, value::Value};

use self::resolution::Resolution;

pub mod combinators;
pub mod resolution;
pub mod settled;

pub use settled::Settled;

type Callback = Box<dyn FnOnce(Value) -> Result<Value, Value>>;

/// What to do with a future's payload once it settles.
///
/// Reactions that settle another future keep that future in the open, so a
/// chain of pending futures can be taken apart without recursing.
pub(crate) enum Reaction {
    /// Fulfill an adopting future with the payload.
    Fulfill(Future),
    /// Reject an adopting future with the payload.
    Reject(Future),
    /// Run a [Future::then] callback and settle `next` with its result.
    Then { next: Future, callback: Callback },
    Call(Box<dyn FnOnce(Value)>),
}

impl Reaction {
    fn run(self, payload: Value) {
        match self {
            Reaction::Fulfill(target) => {
                target.release();
                target.fulfill(payload);
            }
            Reaction::Reject(target) => {
                target.release();
                target.reject(payload);
            }
            Reaction::Then { next, callback } => next.settle_with(callback(payload)),
            Reaction::Call(f) => f(payload),
        }
    }

    /// The future this reaction would settle, if any.
    fn into_dependent(self) -> Option<Future> {
        match self {
            Reaction::Fulfill(future)
            | Reaction::Reject(future)
            | Reaction::Then { next: future, .. } => Some(future),
            Reaction::Call(_) => None,
        }
    }
}

/// Internal status of a future. The payload is stored in the terminal
/// variants.
enum Status {
    Pending,
    /// Waiting on an adopted future. Looks like [Status::Pending] from the
    /// outside but refuses further fulfill/reject calls.
    Adopting,
    Fulfilled(Value),
    Rejected(Value),
}

struct Slot {
    status: Status,
    on_fulfilled: Vec<Reaction>,
    on_rejected: Vec<Reaction>,
}

impl Slot {
    fn take_dependents(&mut self) -> Vec<Future> {
        mem::take(&mut self.on_fulfilled)
            .into_iter()
            .chain(mem::take(&mut self.on_rejected))
            .filter_map(Reaction::into_dependent)
            .collect()
    }
}

struct Inner {
    runtime: Runtime,
    slot: RefCell<Slot>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Unlink dependents one at a time; a pending chain must not be
        // dropped recursively, one stack frame per link.
        let mut dependents = self.slot.get_mut().take_dependents();

        while let Some(future) = dependents.pop() {
            if let Ok(mut inner) = Rc::try_unwrap(future.inner) {
                dependents.extend(inner.slot.get_mut().take_dependents());
            }
        }
    }
}

/// A deferred value.
///
/// See the [module-level documentation](self) for more information.
#[derive(Clone)]
pub struct Future {
    inner: Rc<Inner>,
}

/// The observable state of a [Future].
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

/// The resolve callback of a future: fulfills it, or makes it adopt the
/// given future or thenable.
#[derive(Clone, Debug)]
pub struct Resolve(Future);

/// The reject callback of a future.
#[derive(Clone, Debug)]
pub struct Reject(Future);

/// A pending future together with the callbacks that settle it.
///
/// Obtained from [Runtime::deferred](crate::Runtime::deferred).
#[derive(Clone, Debug)]
pub struct Deferred {
    pub future: Future,
    pub resolve: Resolve,
    pub reject: Reject,
}

/// The default fulfillment reaction: passes the value through.
pub fn identity(value: Value) -> Result<Value, Value> {
    Ok(value)
}

/// The default rejection reaction: passes the reason through.
pub fn rethrow(reason: Value) -> Result<Value, Value> {
    Err(reason)
}

impl Resolve {
    pub(crate) fn new(future: Future) -> Self {
        Self(future)
    }

    /// Fulfill the future with `value`, or make it adopt `value` if that is a
    /// future or thenable. Ignored unless the future is still pending.
    pub fn call(&self, value: impl Into<Value>) {
        self.0.fulfill(value.into());
    }
}

impl Reject {
    pub(crate) fn new(future: Future) -> Self {
        Self(future)
    }

    /// Reject the future with `reason`.
    ///
    /// Ignored once the future has settled, and also once it has adopted
    /// another future or thenable: from then on only the adopted outcome
    /// settles it.
    pub fn call(&self, reason: impl Into<Value>) {
        self.0.reject(reason.into());
    }
}

impl Future {
    pub(crate) fn pending(runtime: Runtime) -> Self {
        Self::with_status(runtime, Status::Pending)
    }

    pub(crate) fn fulfilled(runtime: Runtime, value: Value) -> Self {
        Self::with_status(runtime, Status::Fulfilled(value))
    }

    pub(crate) fn rejected(runtime: Runtime, reason: Value) -> Self {
        Self::with_status(runtime, Status::Rejected(reason))
    }

    fn with_status(runtime: Runtime, status: Status) -> Self {
        Self {
            inner: Rc::new(Inner {
                runtime,
                slot: RefCell::new(Slot {
                    status,
                    on_fulfilled: Vec::new(),
                    on_rejected: Vec::new(),
                }),
            }),
        }
    }

    pub(crate) fn new<F>(runtime: Runtime, resolver: F) -> Self
    where
        F: FnOnce(Resolve, Reject) -> Result<(), Value>,
    {
        let future = Self::pending(runtime);

        if let Err(fault) = resolver(Resolve::new(future.clone()), Reject::new(future.clone())) {
            // A no-op if the resolver settled the future before faulting.
            future.reject(fault);
        }

        future
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Whether `self` and `other` are handles to the same future.
    pub fn ptr_eq(&self, other: &Future) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn state(&self) -> State {
        match &self.inner.slot.borrow().status {
            Status::Pending | Status::Adopting => State::Pending,
            Status::Fulfilled(value) => State::Fulfilled(value.clone()),
            Status::Rejected(reason) => State::Rejected(reason.clone()),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(
            self.inner.slot.borrow().status,
            Status::Fulfilled(_) | Status::Rejected(_)
        )
    }

    /// `Ok(value)` if fulfilled, `Err(reason)` if rejected, `None` otherwise.
    pub(crate) fn outcome(&self) -> Option<Result<Value, Value>> {
        match &self.inner.slot.borrow().status {
            Status::Pending | Status::Adopting => None,
            Status::Fulfilled(value) => Some(Ok(value.clone())),
            Status::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    fn is_open(&self) -> bool {
        matches!(self.inner.slot.borrow().status, Status::Pending)
    }

    /// Fulfill this future, or adopt `value` if it is a future or thenable.
    pub(crate) fn fulfill(&self, value: Value) {
        if !self.is_open() {
            debug!("Ignoring fulfill of a future that is no longer pending");
            return;
        }

        match resolution::resolve(self.runtime(), value, true) {
            Resolution::Future(adopted) if adopted.ptr_eq(self) => {
                debug!("Future resolved with itself");
                self.reject(Error::ChainingCycle.into());
            }
            Resolution::Future(adopted) => self.adopt(&adopted),
            Resolution::Fault(fault) => self.reject(fault),
            Resolution::NotThenable(value) => self.settle(Status::Fulfilled(value)),
        }
    }

    pub(crate) fn reject(&self, reason: Value) {
        if !self.is_open() {
            debug!("Ignoring reject of a future that is no longer pending");
            return;
        }

        self.settle(Status::Rejected(reason));
    }

    fn adopt(&self, adopted: &Future) {
        {
            let mut slot = self.inner.slot.borrow_mut();
            if !matches!(slot.status, Status::Pending) {
                return;
            }
            slot.status = Status::Adopting;
        }

        trace!("Future adopting another future");

        adopted.subscribe(
            Reaction::Fulfill(self.clone()),
            Reaction::Reject(self.clone()),
        );
    }

    /// Drop back from [Status::Adopting] to [Status::Pending] so the adopted
    /// outcome can be applied.
    fn release(&self) {
        let mut slot = self.inner.slot.borrow_mut();
        if matches!(slot.status, Status::Adopting) {
            slot.status = Status::Pending;
        }
    }

    fn settle(&self, status: Status) {
        let (payload, fulfilled) = match &status {
            Status::Fulfilled(value) => (value.clone(), true),
            Status::Rejected(reason) => (reason.clone(), false),
            Status::Pending | Status::Adopting => return,
        };

        let reactions = {
            let mut slot = self.inner.slot.borrow_mut();

            // A synchronous resolution hook may have settled us already.
            if !matches!(slot.status, Status::Pending) {
                debug!("Ignoring settlement of a future that is no longer pending");
                return;
            }

            let on_fulfilled = mem::take(&mut slot.on_fulfilled);
            let on_rejected = mem::take(&mut slot.on_rejected);
            slot.status = status;

            if fulfilled {
                on_fulfilled
            } else {
                on_rejected
            }
        };

        trace!(
            "Future {}, notifying {} reaction(s)",
            if fulfilled { "fulfilled" } else { "rejected" },
            reactions.len()
        );

        for reaction in reactions {
            self.schedule(reaction, payload.clone());
        }
    }

    fn schedule(&self, reaction: Reaction, payload: Value) {
        self.runtime().schedule(Box::new(move || reaction.run(payload)));
    }

    /// Register a pair of raw reactions. Whichever matches the eventual
    /// outcome is scheduled to run with the payload; the other is dropped.
    pub(crate) fn subscribe(&self, on_fulfilled: Reaction, on_rejected: Reaction) {
        match self.outcome() {
            None => {
                let mut slot = self.inner.slot.borrow_mut();
                slot.on_fulfilled.push(on_fulfilled);
                slot.on_rejected.push(on_rejected);
            }
            Some(Ok(value)) => self.schedule(on_fulfilled, value),
            Some(Err(reason)) => self.schedule(on_rejected, reason),
        }
    }

    /// Register reactions and return a future for their result.
    ///
    /// Once this future settles, the matching reaction is called with the
    /// value or reason on a later turn. The returned future is then:
    ///
    /// - rejected with `e` if the reaction returned `Err(e)`,
    /// - rejected with [Error::ChainingCycle] if the reaction returned the
    ///   returned future itself,
    /// - otherwise resolved with the reaction's value, adopting it if it is a
    ///   future or thenable.
    ///
    /// Pass [identity] or [rethrow] to let either outcome through unchanged.
    pub fn then<F, R>(&self, on_fulfilled: F, on_rejected: R) -> Future
    where
        F: FnOnce(Value) -> Result<Value, Value> + 'static,
        R: FnOnce(Value) -> Result<Value, Value> + 'static,
    {
        let next = Future::pending(self.runtime().clone());

        self.subscribe(
            Reaction::Then {
                next: next.clone(),
                callback: Box::new(on_fulfilled),
            },
            Reaction::Then {
                next: next.clone(),
                callback: Box::new(on_rejected),
            },
        );

        next
    }

    /// Register a rejection reaction. Fulfillment passes through.
    pub fn catch<R>(&self, on_rejected: R) -> Future
    where
        R: FnOnce(Value) -> Result<Value, Value> + 'static,
    {
        self.then(identity, on_rejected)
    }

    /// Settle a future returned by [Future::then] with its reaction's result.
    fn settle_with(&self, outcome: Result<Value, Value>) {
        let value = match outcome {
            Ok(value) => value,
            Err(fault) => return self.reject(fault),
        };

        if let Value::Future(returned) = &value {
            if returned.ptr_eq(self) {
                debug!("Reaction returned its own future");
                return self.reject(Error::ChainingCycle.into());
            }
        }

        match resolution::resolve(self.runtime(), value, false) {
            Resolution::Future(returned) => self.adopt(&returned),
            Resolution::Fault(fault) => self.reject(fault),
            Resolution::NotThenable(value) => self.settle(Status::Fulfilled(value)),
        }
    }
}

impl PartialEq for Future {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match &self.inner.slot.borrow().status {
            Status::Pending => "pending",
            Status::Adopting => "adopting",
            Status::Fulfilled(_) => "fulfilled",
            Status::Rejected(_) => "rejected",
        };

        f.debug_struct("Future").field("status", &status).finish()
    }
}
