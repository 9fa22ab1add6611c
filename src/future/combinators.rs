//! Constructing futures from values and from collections of values.
//!
//! # Example
//!
//! ```
//! use pledge::{task::Executor, Value};
//! let exec = Executor::new();
//! let rt = exec.runtime();
//!
//! let slow = rt.deferred();
//! let all = rt.all(Value::List(vec![
//!     Value::from(1),
//!     slow.future.clone().into(),
//!     rt.resolve(3).into(),
//! ]));
//!
//! slow.resolve.call(2);
//!
//! assert_eq!(
//!     exec.block_on(all).unwrap(),
//!     Ok(Value::List(vec![1.into(), 2.into(), 3.into()]))
//! );
//! ```
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{error::Error, runtime::Runtime, value::Value};

use super::{
    resolution::{self, Resolution},
    Future, Reaction,
};

impl Runtime {
    /// A future for `value`.
    ///
    /// If `value` is already a future it is returned as is. A thenable is
    /// wrapped in a future that follows it; its hook is called on a later
    /// turn. Anything else gives a future already fulfilled with `value`.
    pub fn resolve(&self, value: impl Into<Value>) -> Future {
        match resolution::resolve(self, value.into(), false) {
            Resolution::Future(future) => future,
            Resolution::Fault(fault) => Future::rejected(self.clone(), fault),
            Resolution::NotThenable(value) => Future::fulfilled(self.clone(), value),
        }
    }

    /// A future already rejected with `reason`. The reason is never
    /// unwrapped, even if it is itself a future.
    pub fn reject(&self, reason: impl Into<Value>) -> Future {
        Future::rejected(self.clone(), reason.into())
    }

    /// A future that settles like the first element of `values` to settle.
    ///
    /// `values` must be a [Value::List]; anything else gives a future
    /// rejected with [Error::NotSequence]. Elements are resolved in order with
    /// [Runtime::resolve], so plain values count as already fulfilled. An
    /// empty list gives a future that never settles.
    pub fn race(&self, values: impl Into<Value>) -> Future {
        let values = values.into();
        let runtime = self.clone();

        self.future(move |resolve, reject| {
            let items = match values {
                Value::List(items) => items,
                other => return Err(Error::NotSequence(other.type_name()).into()),
            };

            for item in items {
                let (resolve, reject) = (resolve.clone(), reject.clone());
                runtime.resolve(item).subscribe(
                    Reaction::Call(Box::new(move |value| resolve.call(value))),
                    Reaction::Call(Box::new(move |reason| reject.call(reason))),
                );
            }

            Ok(())
        })
    }

    /// A future for the values of every element of `values`.
    ///
    /// `values` must be a [Value::List]; anything else gives a future
    /// rejected with [Error::NotSequence]. The result is fulfilled with a list
    /// of the same length, in the same order, once every future or thenable
    /// element has fulfilled; plain elements are copied as they are. The first
    /// element to reject rejects the result. With no futures or thenables at
    /// all, the result is fulfilled right away.
    pub fn all(&self, values: impl Into<Value>) -> Future {
        let values = values.into();
        let runtime = self.clone();

        self.future(move |resolve, reject| {
            let items = match values {
                Value::List(items) => items,
                other => return Err(Error::NotSequence(other.type_name()).into()),
            };

            // Slots are filled in on a copy; the caller's list is never touched.
            let results = Rc::new(RefCell::new(items.clone()));
            let remaining = Rc::new(Cell::new(0usize));

            for (index, item) in items.into_iter().enumerate() {
                let future = match resolution::resolve(&runtime, item, false) {
                    Resolution::Future(future) => future,
                    Resolution::Fault(fault) => {
                        reject.call(fault);
                        continue;
                    }
                    Resolution::NotThenable(_) => continue,
                };

                remaining.set(remaining.get() + 1);

                let (results, remaining, resolve) =
                    (results.clone(), remaining.clone(), resolve.clone());
                let reject = reject.clone();

                // Reactions are deferred, so every element is counted before
                // the first one can finish.
                future.subscribe(
                    Reaction::Call(Box::new(move |value| {
                        results.borrow_mut()[index] = value;
                        remaining.set(remaining.get() - 1);

                        if remaining.get() == 0 {
                            let values = results.take();
                            resolve.call(values);
                        }
                    })),
                    Reaction::Call(Box::new(move |reason| reject.call(reason))),
                );
            }

            if remaining.get() == 0 {
                resolve.call(results.take());
            }

            Ok(())
        })
    }
}
