//! Dynamic values.
//!
//! Everything a future can be fulfilled or rejected with is a [Value]. Most
//! variants are plain data. Two of them take part in resolution:
//!
//! - [Value::Future] holds one of this crate's own futures.
//! - [Value::Object] holds a foreign object. If the object exposes a
//!   resolution hook through [Object::then] it is a *thenable*, and resolving a
//!   future with it makes the future follow whatever the hook reports.
//!
//! # Example
//!
//! A thenable that fulfills as soon as it is asked to:
//!
//! ```
//! use pledge::{task::Executor, Value};
//! let exec = Executor::new();
//! let rt = exec.runtime();
//!
//! let thenable = Value::thenable(|resolve, _reject| {
//!     resolve.call(7);
//!     Ok(())
//! });
//!
//! let fut = rt.resolve(thenable);
//! assert_eq!(exec.block_on(fut).unwrap(), Ok(Value::from(7)));
//! ```
use std::{fmt, rc::Rc};

use crate::{
    error::Error,
    future::{Future, Reject, Resolve},
};

/// A resolution hook: registers a pair of callbacks that the owner of the hook
/// will call (at most once, in principle) when its value is known.
///
/// Returning `Err` models the hook throwing.
pub type Hook = Rc<dyn Fn(Resolve, Reject) -> Result<(), Value>>;

/// A foreign, object-like value.
pub trait Object: fmt::Debug {
    /// Looks up this object's `then` member.
    ///
    /// Return `Ok(None)` if there is no callable member, and `Err(fault)` if
    /// looking the member up faults. A fault is not propagated; it becomes the
    /// rejection reason of whatever future was being resolved with this
    /// object.
    fn then(&self) -> Result<Option<Hook>, Value>;
}

/// A value in the model.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// An ordered sequence. The only input [race](crate::Runtime::race) and
    /// [all](crate::Runtime::all) accept.
    List(Vec<Value>),
    Error(Error),
    Future(Future),
    Object(Rc<dyn Object>),
}

struct ClosureThenable(Hook);

impl fmt::Debug for ClosureThenable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Thenable")
    }
}

impl Object for ClosureThenable {
    fn then(&self) -> Result<Option<Hook>, Value> {
        Ok(Some(self.0.clone()))
    }
}

impl Value {
    /// Build a thenable object whose resolution hook is `hook`.
    pub fn thenable<F>(hook: F) -> Self
    where
        F: Fn(Resolve, Reject) -> Result<(), Value> + 'static,
    {
        Value::Object(Rc::new(ClosureThenable(Rc::new(hook))))
    }

    /// Short name of the variant, used in type error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Error(_) => "error",
            Value::Future(_) => "future",
            Value::Object(_) => "object",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Data compares structurally; futures and objects compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Future(a), Value::Future(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Error> for Value {
    fn from(value: Error) -> Self {
        Value::Error(value)
    }
}

impl From<Future> for Value {
    fn from(value: Future) -> Self {
        Value::Future(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Error(e) => write!(f, "TypeError: {e}"),
            Value::Future(_) => f.write_str("[future]"),
            Value::Object(_) => f.write_str("[object]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use crate::error::Error;

    #[test]
    fn equality() {
        assert_eq!(Value::from(1), Value::Number(1.0));
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_eq!(
            Value::List(vec![1.into(), "x".into()]),
            Value::List(vec![Value::Number(1.0), Value::Str("x".into())])
        );
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::thenable(|_, _| Ok(()));
        let b = Value::thenable(|_, _| Ok(()));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn display() {
        let v = Value::from(vec![1.into(), "two".into(), Value::Null]);
        assert_eq!(v.to_string(), "[1, two, null]");
        assert_eq!(
            Value::from(Error::NotSequence("number")).to_string(),
            "TypeError: number is not a sequence"
        );
    }
}
