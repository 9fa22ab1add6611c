//! Scheduling and execution
//!
//! Futures never run their reactions inline. Every reaction is handed to a
//! [Scheduler] as a [Job] and runs on a later turn, after the code that
//! registered or settled it has returned. Which scheduler is used is up to the
//! caller: it is passed to [Runtime::new](crate::Runtime::new) and nothing in
//! the crate looks one up globally.
//!
//! The crate ships one scheduler, [Executor], a single-threaded run loop. It
//! executes jobs in the order they were scheduled and can also drive ordinary
//! Rust `async` tasks, which is how futures are most conveniently awaited.
//!
//! # Example
//!
//! Here is a reaction chained onto a future, run to completion with
//! [Executor::run]:
//!
//! ```
//! use pledge::{rethrow, task::Executor, Value};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let exec = Executor::new();
//! let rt = exec.runtime();
//! let seen = Rc::new(Cell::new(0.0));
//!
//! let out = seen.clone();
//! rt.resolve(20).then(
//!     move |v| {
//!         out.set(v.as_number().unwrap_or_default() + 1.0);
//!         Ok(Value::Undefined)
//!     },
//!     rethrow,
//! );
//!
//! // Nothing has run yet.
//! assert_eq!(seen.get(), 0.0);
//! exec.run();
//! assert_eq!(seen.get(), 21.0);
//! ```
//!
//! Use [Executor::block_on] to get the outcome of a future directly:
//!
//! ```
//! use pledge::{task::Executor, Value};
//! let exec = Executor::new();
//! let rt = exec.runtime();
//! let x = exec.block_on(rt.resolve(2)).unwrap();
//! assert_eq!(x, Ok(Value::from(2)));
//! ```
//!
//! # Threading Model
//!
//! An executor and everything scheduled on it belong to the thread that
//! created it. Futures are `!Send`; only the wakers handed to `async` tasks may
//! cross threads.
use std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
    future::{Future, IntoFuture},
    pin::Pin,
    rc::Rc,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll, Wake, Waker},
};

use log::{debug, trace};
use slab::Slab;

use crate::{error::Error, runtime::Runtime};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce()>;

/// Defers work to a later turn.
///
/// Implementations must run every job after the call to
/// [schedule](Scheduler::schedule) that queued it has returned, and must run
/// jobs in the order they were scheduled.
pub trait Scheduler {
    fn schedule(&self, job: Job);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule(&self, job: Job) {
        (**self).schedule(job)
    }
}

/// Keys of tasks that have been woken and are waiting to be polled.
type ReadyQueue = Arc<Mutex<VecDeque<usize>>>;

struct TaskId {
    key: usize,
    ready: ReadyQueue,
}

impl Wake for TaskId {
    fn wake(self: Arc<TaskId>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<TaskId>) {
        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(self.key);
    }
}

struct Task {
    waker: Waker,
    // `None` while the task is being polled.
    future: Option<Pin<Box<dyn Future<Output = ()>>>>,
}

struct Inner {
    jobs: VecDeque<Job>,
    tasks: Slab<Task>,
}

/// The single-threaded executor.
///
/// A cheap, cloneable handle to one run loop. Clones share the same queues.
/// Work queued through the handle does not execute until [Executor::run] or
/// [Executor::block_on] is called.
#[derive(Clone)]
pub struct Executor {
    inner: Rc<RefCell<Inner>>,
    ready: ReadyQueue,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Executor")
            .field("jobs", &inner.jobs.len())
            .field("tasks", &inner.tasks.len())
            .finish()
    }
}

impl Scheduler for Executor {
    fn schedule(&self, job: Job) {
        self.inner.borrow_mut().jobs.push_back(job);
    }
}

impl Executor {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an executor with room for `capacity` queued jobs and tasks
    /// before it needs to reallocate.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                jobs: VecDeque::with_capacity(capacity),
                tasks: Slab::with_capacity(capacity),
            })),
            ready: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
        }
    }

    /// A runtime whose futures schedule their reactions on this executor.
    pub fn runtime(&self) -> Runtime {
        Runtime::new(self.clone())
    }

    /// Queue an `async` task. It is first polled once the executor runs.
    pub fn spawn<Fut>(&self, f: Fut)
    where
        Fut: Future<Output = ()> + 'static,
    {
        self.spawn_task(f);
    }

    fn spawn_task<Fut>(&self, f: Fut) -> usize
    where
        Fut: Future<Output = ()> + 'static,
    {
        let key = {
            let mut inner = self.inner.borrow_mut();
            let slot = inner.tasks.vacant_entry();
            let key = slot.key();

            let id = Arc::new(TaskId {
                key,
                ready: self.ready.clone(),
            });

            slot.insert(Task {
                waker: Waker::from(id),
                future: Some(Box::pin(f)),
            });

            key
        };

        debug!("Spawned task {key}");

        self.ready
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(key);

        key
    }

    /// Run `f` to completion and return its output.
    ///
    /// Everything else queued on the executor runs too. If the executor runs
    /// out of work while `f` is still waiting, for example on a future that
    /// never settles, the task is discarded and [Error::Stalled] is returned.
    pub fn block_on<F>(&self, f: F) -> Result<F::Output, Error>
    where
        F: IntoFuture,
        F::IntoFuture: 'static,
        F::Output: 'static,
    {
        let slot = Rc::new(RefCell::new(None));
        let out = slot.clone();
        let f = f.into_future();

        let key = self.spawn_task(async move {
            let value = f.await;
            *out.borrow_mut() = Some(value);
        });

        self.run();

        let value = slot.borrow_mut().take();
        if value.is_none() {
            debug!("Task {key} stalled, discarding it");
            let task = self.inner.borrow_mut().tasks.try_remove(key);
            drop(task);
        }

        value.ok_or(Error::Stalled)
    }

    /// Run jobs and tasks until there is nothing left to do.
    ///
    /// All queued jobs run before each task is polled. Tasks waiting on a
    /// future that never settles do not keep the executor busy; they are
    /// simply left waiting.
    pub fn run(&self) {
        loop {
            let job = self.inner.borrow_mut().jobs.pop_front();

            if let Some(job) = job {
                trace!("Running job");
                job();
                continue;
            }

            let key = self
                .ready
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();

            match key {
                Some(key) => self.poll_task(key),
                None => return,
            }
        }
    }

    fn poll_task(&self, key: usize) {
        let (waker, future) = {
            let mut inner = self.inner.borrow_mut();
            match inner.tasks.get_mut(key) {
                Some(task) => (task.waker.clone(), task.future.take()),
                None => return,
            }
        };

        // A stale wakeup for a task that is already being polled.
        let Some(mut future) = future else {
            return;
        };

        trace!("Polling task {key}");

        let mut cx = Context::from_waker(&waker);

        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                debug!("Task {key} finished");
                self.inner.borrow_mut().tasks.remove(key);
            }
            Poll::Pending => {
                if let Some(task) = self.inner.borrow_mut().tasks.get_mut(key) {
                    task.future = Some(future);
                }
            }
        }
    }
}
