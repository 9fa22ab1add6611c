//! # `pledge`: deferred values with pluggable scheduling
//!
//! This crate implements a promise-style deferred value, called [Future]
//! here: something that starts out pending and later settles, exactly once,
//! as either fulfilled with a value or rejected with a reason. Interested code
//! chains reactions onto it with [Future::then] and [Future::catch], and
//! collections of futures are combined with [Runtime::race] and
//! [Runtime::all].
//!
//! Futures are not tied to any particular event loop. Every reaction is
//! handed to a [Scheduler](task::Scheduler) that runs it on a later turn; the
//! scheduler is supplied when creating a [Runtime]. A small single-threaded
//! executor, [Executor](task::Executor), is provided and is what the examples
//! below use.
//!
//! Values are dynamic ([Value]), and anything implementing [Object] with a
//! resolution hook is treated as a *thenable*: resolving a future with it
//! makes the future follow the thenable. This is how foreign future-like
//! types interoperate.
//!
//! For the state machine itself see the [future] module. To see how work is
//! scheduled, see the [task] module.
//!
//! ## Example
//!
//! ```
//! use pledge::{rethrow, task::Executor, Value};
//!
//! let exec = Executor::new();
//! let rt = exec.runtime();
//!
//! let d = rt.deferred();
//! let doubled = d
//!     .future
//!     .then(|v| Ok(Value::from(v.as_number().unwrap_or_default() * 2.0)), rethrow);
//! let first = rt.race(Value::List(vec![doubled.into(), rt.deferred().future.into()]));
//!
//! d.resolve.call(21);
//!
//! assert_eq!(exec.block_on(first).unwrap(), Ok(Value::from(42)));
//! ```
pub mod error;
pub mod future;
pub mod runtime;
pub mod task;
pub mod value;

pub use error::Error;
pub use future::{
    identity,
    resolution::{classify, is_future, is_thenable, Kind},
    rethrow, Deferred, Future, Reject, Resolve, Settled, State,
};
pub use runtime::Runtime;
pub use value::{Hook, Object, Value};
