//! Shoe Animation
//!
//! Implicit animation for layers of animatable properties.
//!
//! # Features
//!
//! - **Model / Presentation**: writes update the model at once while the
//!   presentation glides from the old value to the new one
//! - **Implicit Animations**: a per-property default plus a delegate hook
//!   that can replace or patch it for each write
//! - **Additive Compositing**: overlapping animations on one property sum
//!   their decaying offsets, so interrupted motion never jumps
//! - **Transactions**: frozen time scopes shared by every layer
//! - **Frame Scheduling**: one outstanding refresh request for all animating
//!   layers, driven by a host [`RefreshSignal`]
//!
//! # Example
//!
//! ```rust
//! use shoe_animation::{Animation, Context, Easing, Layer, ManualClock, ManualRefresh};
//!
//! let clock = ManualClock::new(0.0);
//! let refresh = ManualRefresh::new();
//! let context = Context::new(clock.clone(), refresh.clone());
//!
//! let layer = Layer::new(&context);
//! layer
//!     .register_animatable_property(
//!         "x",
//!         0.0,
//!         Some(Animation::number_type().duration(1.0).easing(Easing::Linear)),
//!     )
//!     .unwrap();
//!
//! layer.set("x", 10.0).unwrap();
//! refresh.fire();
//!
//! clock.set(0.5);
//! refresh.fire();
//! assert_eq!(layer.presentation().unwrap().number("x"), Some(5.0));
//! ```

pub mod animation;
pub mod easing;
pub mod frame;
pub mod layer;
pub mod presentation;
pub mod scheduler;
mod transaction;

pub use animation::{
    Animation, AnimationPatch, AnimationSpec, BlendMode, Completion, Compositor, FillMode,
};
pub use easing::{Easing, EasingFn};
pub use frame::{
    Clock, FrameCallback, FrameRequestId, ManualClock, ManualRefresh, RefreshSignal, SystemClock,
};
pub use layer::{Layer, LayerDelegate};
pub use presentation::Presentation;
pub use scheduler::{Context, ContextBuilder, LayerId};
pub use transaction::Transaction;

pub use shoe_core::{Animatable, Discrete, Result, SetComparator, SetOrder, ShoeError, Value, ValueType};
