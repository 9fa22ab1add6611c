//! Awaiting futures from Rust `async` code.
//!
//! A [Future] can be `.await`ed inside any task driven by an executor that
//! also runs the future's scheduler, such as
//! [Executor](crate::task::Executor). The output is `Ok(value)` if the future
//! was fulfilled and `Err(reason)` if it was rejected.
//!
//! ```
//! use pledge::{task::Executor, Value};
//! let exec = Executor::new();
//! let rt = exec.runtime();
//!
//! let d = rt.deferred();
//! let fut = d.future.clone();
//!
//! exec.spawn(async move {
//!     assert_eq!(fut.await, Err(Value::from("nope")));
//! });
//!
//! d.reject.call("nope");
//! exec.run();
//! ```
use std::{
    cell::RefCell,
    future::IntoFuture,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

use crate::value::Value;

use super::{Future, Reaction};

/// The [std::future::Future] returned by `.await`ing a [Future].
pub struct Settled {
    future: Future,
    waker: Rc<RefCell<Option<Waker>>>,
    registered: bool,
}

impl IntoFuture for Future {
    type Output = Result<Value, Value>;
    type IntoFuture = Settled;

    fn into_future(self) -> Self::IntoFuture {
        Settled {
            future: self,
            waker: Rc::new(RefCell::new(None)),
            registered: false,
        }
    }
}

fn wake(slot: &RefCell<Option<Waker>>) {
    if let Some(waker) = slot.borrow_mut().take() {
        waker.wake();
    }
}

impl std::future::Future for Settled {
    type Output = Result<Value, Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.future.outcome() {
            return Poll::Ready(outcome);
        }

        *self.waker.borrow_mut() = Some(cx.waker().clone());

        if !self.registered {
            self.registered = true;

            let (on_fulfilled, on_rejected) = (self.waker.clone(), self.waker.clone());
            self.future.subscribe(
                Reaction::Call(Box::new(move |_| wake(&on_fulfilled))),
                Reaction::Call(Box::new(move |_| wake(&on_rejected))),
            );
        }

        Poll::Pending
    }
}
