//! Time and display-refresh collaborators
//!
//! The engine needs two things from its host: a monotonic clock in seconds
//! ([`Clock`]) and a way to run a callback before the next display refresh
//! ([`RefreshSignal`]). Real hosts wrap `requestAnimationFrame`, a display
//! link or a vsync event; [`ManualClock`] and [`ManualRefresh`] let a headless
//! host or a test drive frames explicitly.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock {
    fn now(&self) -> f64;
}

/// Seconds elapsed since the clock was created
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same time, so a host can keep one handle and give
/// another to the [`Context`](crate::Context).
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, seconds: f64) {
        self.time.set(seconds);
    }

    pub fn advance(&self, seconds: f64) {
        self.time.set(self.time.get() + seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

/// Callback run before the next display refresh
pub type FrameCallback = Box<dyn FnOnce()>;

/// Handle to an outstanding frame request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u64);

/// "Run this before the next display refresh"
pub trait RefreshSignal {
    /// Schedule `callback` for the next refresh
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId;

    /// Drop a request that has not run yet
    fn cancel_frame(&self, id: FrameRequestId);
}

/// A refresh signal pumped by hand
///
/// Requests queue up until [`fire`](Self::fire) is called. Clones share the
/// same queue.
#[derive(Clone, Default)]
pub struct ManualRefresh {
    inner: Rc<ManualRefreshInner>,
}

#[derive(Default)]
struct ManualRefreshInner {
    next_id: Cell<u64>,
    pending: RefCell<Vec<(FrameRequestId, FrameCallback)>>,
}

impl ManualRefresh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback requested before this call
    ///
    /// Callbacks requested while firing wait for the next call. Returns the
    /// number of callbacks run.
    pub fn fire(&self) -> usize {
        let due = std::mem::take(&mut *self.inner.pending.borrow_mut());
        let count = due.len();
        for (_, callback) in due {
            callback();
        }
        count
    }

    /// Number of requests waiting for the next refresh
    pub fn pending(&self) -> usize {
        self.inner.pending.borrow().len()
    }
}

impl RefreshSignal for ManualRefresh {
    fn request_frame(&self, callback: FrameCallback) -> FrameRequestId {
        let id = FrameRequestId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.pending.borrow_mut().push((id, callback));
        id
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.inner
            .pending
            .borrow_mut()
            .retain(|(pending, _)| *pending != id);
    }
}

impl fmt::Debug for ManualRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualRefresh")
            .field("pending", &self.pending())
            .finish()
    }
}
