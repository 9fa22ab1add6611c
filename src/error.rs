use thiserror::Error;

/// Errors produced by the crate itself.
///
/// [Error::ChainingCycle] and [Error::NotSequence] never escape as Rust
/// errors; they become rejection reasons, wrapped in
/// [Value::Error](crate::Value::Error). [Error::Stalled] is returned by
/// [Executor::block_on](crate::task::Executor::block_on).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A future was asked to take on its own eventual state.
    #[error("chaining cycle detected for future")]
    ChainingCycle,

    /// `race` or `all` was given something other than a list.
    #[error("{0} is not a sequence")]
    NotSequence(&'static str),

    /// The executor ran out of work before the task it was blocking on
    /// completed.
    #[error("executor went idle before the task completed")]
    Stalled,
}
