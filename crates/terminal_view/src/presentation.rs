//! Presentation-thread state and the hand-off primitive for reaching it.
//!
//! [`PresentationContext`] owns state that only the presentation thread may
//! touch. Other threads hold a [`PresentationHandle`] and submit jobs; the
//! owner drains them with [`PresentationContext::run_pending`], typically
//! once per frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

type Job<T> = Box<dyn FnOnce(&mut T) + Send>;
type Waker = Arc<dyn Fn() + Send + Sync>;

struct Shared<T> {
    owner: ThreadId,
    queue: Mutex<VecDeque<Job<T>>>,
    pending: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

impl<T> Shared<T> {
    fn enqueue(&self, job: Job<T>) {
        self.queue.lock().push_back(job);
        if !self.pending.swap(true, Ordering::AcqRel) {
            let waker = self.waker.lock().clone();
            if let Some(waker) = waker {
                waker();
            }
        }
    }
}

/// State owned by the presentation thread.
pub struct PresentationContext<T> {
    state: RefCell<T>,
    shared: Arc<Shared<T>>,
}

/// Cloneable, thread-safe way to schedule work on a [`PresentationContext`].
pub struct PresentationHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for PresentationHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> PresentationContext<T> {
    /// Create a context owned by the calling thread.
    pub fn new(state: T) -> Self {
        Self {
            state: RefCell::new(state),
            shared: Arc::new(Shared {
                owner: thread::current().id(),
                queue: Mutex::new(VecDeque::new()),
                pending: AtomicBool::new(false),
                waker: Mutex::new(None),
            }),
        }
    }

    pub fn handle(&self) -> PresentationHandle<T> {
        PresentationHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.shared.owner
    }

    /// Called whenever the queue goes from empty to non-empty.
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.shared.waker.lock() = Some(Arc::new(waker));
    }

    /// Run `job` against the state now if possible, otherwise queue it.
    ///
    /// Jobs submitted from inside another job are queued and run by the
    /// next [`run_pending`](Self::run_pending).
    pub fn run<F>(&self, job: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        if self.is_owner_thread() {
            if let Ok(mut state) = self.state.try_borrow_mut() {
                job(&mut state);
                return;
            }
        }
        self.shared.enqueue(Box::new(job));
    }

    /// Drain queued jobs in submission order. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        if !self.is_owner_thread() {
            util::debug_panic!("run_pending called off the presentation thread");
            return 0;
        }
        let Ok(mut state) = self.state.try_borrow_mut() else {
            tracing::debug!("run_pending called from inside a job, deferring");
            return 0;
        };

        let mut ran = 0;
        loop {
            self.shared.pending.store(false, Ordering::Release);
            let jobs = std::mem::take(&mut *self.shared.queue.lock());
            if jobs.is_empty() {
                break;
            }
            for job in jobs {
                job(&mut state);
                ran += 1;
            }
        }
        ran
    }

    pub fn has_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Borrow the state on the owning thread.
    ///
    /// Panics if called re-entrantly from a job or `with` closure.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        if !self.is_owner_thread() {
            util::debug_panic!("presentation state accessed off its thread");
        }
        f(&mut self.state.borrow_mut())
    }
}

impl<T> PresentationHandle<T> {
    /// Queue `job` for the presentation thread.
    pub fn run<F>(&self, job: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.shared.enqueue(Box::new(job));
    }

    pub fn has_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }
}
