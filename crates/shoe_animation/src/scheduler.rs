//! Frame scheduler and transaction context
//!
//! A [`Context`] owns the transaction stack and the set of layers that
//! currently have animations ("targets"). While it has targets it keeps
//! exactly one frame request outstanding with its [`RefreshSignal`]. Each
//! tick renders every target from a fresh presentation and then commits the
//! implicit transaction, so the next frame observes a new time.
//!
//! Layers register themselves implicitly when their first animation is
//! added. They drop out lazily: a layer whose animation list is empty is
//! deregistered at the start of its next tick and still renders that tick,
//! so the resting value is painted.
//!
//! # Example
//!
//! ```ignore
//! use shoe_animation::{Context, ManualClock, ManualRefresh};
//!
//! let clock = ManualClock::new(0.0);
//! let refresh = ManualRefresh::new();
//! let context = Context::new(clock.clone(), refresh.clone());
//!
//! // ... create layers and write properties ...
//!
//! clock.advance(1.0 / 60.0);
//! refresh.fire(); // runs one tick
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use crate::frame::{Clock, FrameRequestId, ManualRefresh, RefreshSignal, SystemClock};
use crate::layer::{Layer, LayerShared};
use crate::transaction::{Transaction, TransactionStack};

new_key_type! {
    /// Handle to a layer created in a context
    pub struct LayerId;
}

/// Internal state of the context
struct ContextInner {
    clock: Box<dyn Clock>,
    refresh: Box<dyn RefreshSignal>,
    transactions: RefCell<TransactionStack>,
    /// Every live layer, held weakly
    layers: RefCell<SlotMap<LayerId, Weak<LayerShared>>>,
    /// Layers that render on the next tick
    targets: RefCell<IndexSet<LayerId, FxBuildHasher>>,
    /// The one outstanding frame request, if any
    frame: Cell<Option<FrameRequestId>>,
    /// Set while a tick runs; the tick commits any root opened meanwhile
    in_tick: Cell<bool>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.refresh.cancel_frame(frame);
        }
    }
}

/// Transaction stack and frame scheduler shared by a set of layers
///
/// Cheap to clone; clones refer to the same context. Construct one per
/// application (or per test) and hand it to every [`Layer`].
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Context {
    pub fn new<C, R>(clock: C, refresh: R) -> Self
    where
        C: Clock + 'static,
        R: RefreshSignal + 'static,
    {
        Self::from_parts(Box::new(clock), Box::new(refresh))
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    fn from_parts(clock: Box<dyn Clock>, refresh: Box<dyn RefreshSignal>) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                clock,
                refresh,
                transactions: RefCell::new(TransactionStack::default()),
                layers: RefCell::new(SlotMap::with_key()),
                targets: RefCell::new(IndexSet::default()),
                frame: Cell::new(None),
                in_tick: Cell::new(false),
            }),
        }
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Open a nested transaction that freezes the current time
    pub fn begin_transaction(&self) {
        let depth = {
            let mut transactions = self.inner.transactions.borrow_mut();
            transactions.push(|| self.inner.clock.now(), false);
            transactions.depth()
        };
        tracing::debug!(depth, "begin transaction");
    }

    /// Pop the top transaction
    pub fn commit_transaction(&self) -> Option<Transaction> {
        let transaction = self.inner.transactions.borrow_mut().pop();
        match transaction {
            Some(transaction) => tracing::debug!(time = transaction.time, "commit transaction"),
            None => tracing::warn!("commit_transaction called with no open transaction"),
        }
        transaction
    }

    /// Run `f` inside its own transaction
    pub fn with_transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        self.begin_transaction();
        let result = f();
        self.commit_transaction();
        result
    }

    /// Cancel the pending frame and tick right now
    pub fn flush_transaction(&self) {
        if let Some(frame) = self.inner.frame.take() {
            tracing::debug!(?frame, "cancel frame request");
            self.inner.refresh.cancel_frame(frame);
        }
        self.tick();
    }

    /// Turn implicit animation off (or back on) for the current transaction
    ///
    /// Only the top transaction is affected. Always schedules a tick so the
    /// unanimated values get rendered.
    pub fn disable_animation(&self, disable: bool) {
        self.with_current(|transaction| transaction.disable_animation = disable);
        self.start_ticking();
    }

    /// The current transaction, opening an auto-committing one if needed
    ///
    /// Opening the root schedules a tick, so the root is committed on the
    /// next frame and time moves on.
    pub fn current_transaction(&self) -> Transaction {
        self.with_current(|transaction| *transaction)
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut Transaction) -> R) -> R {
        let (result, opened) = {
            let mut transactions = self.inner.transactions.borrow_mut();
            let opened = transactions.depth() == 0;
            let result = f(transactions.current(|| self.inner.clock.now()));
            (result, opened)
        };
        if opened && !self.inner.in_tick.get() {
            tracing::debug!("open implicit transaction");
            self.start_ticking();
        }
        result
    }

    /// Frozen time of the current transaction in seconds
    pub fn current_time(&self) -> f64 {
        self.current_transaction().time
    }

    pub fn is_animation_disabled(&self) -> bool {
        self.current_transaction().disable_animation
    }

    /// Number of open transactions
    pub fn transaction_depth(&self) -> usize {
        self.inner.transactions.borrow().depth()
    }

    // =========================================================================
    // Targets
    // =========================================================================

    pub(crate) fn register_layer(&self, layer: Weak<LayerShared>) -> LayerId {
        self.inner.layers.borrow_mut().insert(layer)
    }

    pub(crate) fn forget_layer(&self, id: LayerId) {
        self.inner.layers.borrow_mut().remove(id);
        self.inner.targets.borrow_mut().shift_remove(&id);
    }

    fn layer(&self, id: LayerId) -> Option<Layer> {
        let shared = self.inner.layers.borrow().get(id).and_then(Weak::upgrade);
        shared.map(Layer::from_shared)
    }

    pub(crate) fn register_target(&self, id: LayerId) {
        self.start_ticking();
        if self.inner.targets.borrow_mut().insert(id) {
            tracing::debug!(layer = ?id, "register animation target");
        }
    }

    pub(crate) fn deregister_target(&self, id: LayerId) {
        if self.inner.targets.borrow_mut().shift_remove(&id) {
            tracing::debug!(layer = ?id, "deregister animation target");
        }
    }

    pub fn is_target(&self, id: LayerId) -> bool {
        self.inner.targets.borrow().contains(&id)
    }

    pub fn target_count(&self) -> usize {
        self.inner.targets.borrow().len()
    }

    /// True while a frame request is outstanding
    pub fn is_ticking(&self) -> bool {
        self.inner.frame.get().is_some()
    }

    // =========================================================================
    // Ticking
    // =========================================================================

    fn start_ticking(&self) {
        if self.inner.frame.get().is_some() {
            return;
        }
        let context = Rc::downgrade(&self.inner);
        let frame = self.inner.refresh.request_frame(Box::new(move || {
            if let Some(inner) = context.upgrade() {
                Context { inner }.tick();
            }
        }));
        self.inner.frame.set(Some(frame));
    }

    /// Render every target once, then commit the implicit transaction
    ///
    /// Normally driven by the refresh signal. A failing layer is logged and
    /// skipped; it does not stop the other targets from rendering.
    pub fn tick(&self) {
        self.inner.frame.set(None);
        let nested = self.inner.in_tick.replace(true);

        // Snapshot: layers registered by render hooks wait for the next tick
        let targets: SmallVec<[LayerId; 8]> =
            self.inner.targets.borrow().iter().copied().collect();
        tracing::trace!(targets = targets.len(), "tick");

        for id in targets {
            let Some(layer) = self.layer(id) else {
                self.deregister_target(id);
                continue;
            };
            // Deregistering before rendering guarantees one more frame after
            // the last animation is removed
            if !layer.has_animations() {
                self.deregister_target(id);
            }
            if let Err(error) = layer.render() {
                tracing::error!(layer = ?id, %error, "layer failed to render");
            }
        }

        let automatically_commit = self
            .inner
            .transactions
            .borrow()
            .top()
            .is_some_and(|transaction| transaction.automatically_commit);
        if automatically_commit {
            self.commit_transaction();
        }
        self.inner.in_tick.set(nested);

        if !self.inner.targets.borrow().is_empty() {
            self.start_ticking();
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("transaction_depth", &self.transaction_depth())
            .field("targets", &self.target_count())
            .field("ticking", &self.is_ticking())
            .finish()
    }
}

/// Builder for a [`Context`]
///
/// Defaults to a [`SystemClock`] and a private [`ManualRefresh`]. Nothing
/// fires that queue, so a context built without
/// [`refresh_signal`](Self::refresh_signal) only advances when the host calls
/// [`Context::tick`] or [`Context::flush_transaction`] itself, for example
/// from its own render loop.
#[derive(Default)]
pub struct ContextBuilder {
    clock: Option<Box<dyn Clock>>,
    refresh: Option<Box<dyn RefreshSignal>>,
}

impl ContextBuilder {
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn refresh_signal<R: RefreshSignal + 'static>(mut self, refresh: R) -> Self {
        self.refresh = Some(Box::new(refresh));
        self
    }

    pub fn build(self) -> Context {
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(SystemClock::new()));
        let refresh = self
            .refresh
            .unwrap_or_else(|| Box::new(ManualRefresh::new()));
        Context::from_parts(clock, refresh)
    }
}
