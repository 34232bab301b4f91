//! Layers: model values, implicit animations and compositing
//!
//! A [`Layer`] keeps two views of each animatable property:
//!
//! - the **model** value, which [`Layer::set`] updates immediately
//! - the **presentation** value, recomputed on every
//!   [`Layer::presentation`] call by compositing all live animations over the
//!   model at the current transaction time
//!
//! Writing a registered property asks the layer's [`LayerDelegate`] for an
//! animation description. Whatever it resolves to is started from the old
//! value towards the new one, so the presentation glides while the model
//! jumps.
//!
//! # Example
//!
//! ```ignore
//! use shoe_animation::{Animation, Context, Easing, Layer};
//!
//! let layer = Layer::new(&context);
//! layer.register_animatable_property(
//!     "x",
//!     0.0,
//!     Some(Animation::number_type().duration(1.0).easing(Easing::Linear)),
//! )?;
//!
//! layer.set("x", 10.0)?;
//! assert_eq!(layer.get("x"), Some(Value::Number(10.0)));   // model
//! assert_eq!(layer.presentation()?.number("x"), Some(0.0)); // still at the start
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use shoe_core::{Result, ShoeError, Value};
use smallvec::SmallVec;

use crate::animation::{Animation, AnimationSpec, BlendMode, Completion, Compositor};
use crate::presentation::Presentation;
use crate::scheduler::{Context, LayerId};

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Consumer hooks for a layer
///
/// Both methods have no-op defaults, so a delegate only overrides what it
/// needs.
pub trait LayerDelegate {
    /// Describe the implicit animation for writing `value` to `property`
    ///
    /// Returning [`AnimationSpec::None`] falls back to the property's default
    /// animation, if it has one.
    fn animation_for_key(&self, _property: &str, _value: &Value, _layer: &Layer) -> AnimationSpec {
        AnimationSpec::None
    }

    /// Draw the layer from its presentation values
    ///
    /// Called once per tick while the layer is animating, and immediately
    /// after any property write that did not start an animation.
    fn render(&self, _presentation: &Presentation) -> anyhow::Result<()> {
        Ok(())
    }
}

struct NoopDelegate;

impl LayerDelegate for NoopDelegate {}

struct PropertyRecord {
    /// Authoritative model value
    value: Value,
    default_animation: Option<Animation>,
}

/// Animation bookkeeping for one composite pass, handled after the pass
struct FinishedAnimation {
    number: u64,
    name: Option<String>,
    retained: bool,
    completion: Option<Completion>,
}

#[derive(Default)]
struct LayerState {
    /// Registered properties in registration order
    properties: FxIndexMap<String, PropertyRecord>,
    animations: Vec<Animation>,
    /// Animation name → insertion number
    named: FxIndexMap<String, u64>,
    needs_sort: bool,
    next_number: u64,
}

impl LayerState {
    fn remove_instance(&mut self, number: u64) {
        if let Some(position) = self.animations.iter().position(|a| a.number() == number) {
            self.animations.remove(position);
        }
    }

    fn sort_animations(&mut self) {
        if !self.needs_sort {
            return;
        }
        // Insertion number breaks the remaining ties, so the order is total
        self.animations.sort_by(|a, b| {
            let start_a = a.start_time.unwrap_or(f64::NEG_INFINITY);
            let start_b = b.start_time.unwrap_or(f64::NEG_INFINITY);
            a.index
                .total_cmp(&b.index)
                .then_with(|| start_a.total_cmp(&start_b))
                .then_with(|| a.number().cmp(&b.number()))
        });
        self.needs_sort = false;
    }

    fn composite(
        &mut self,
        now: f64,
        finished: &mut SmallVec<[FinishedAnimation; 4]>,
    ) -> Result<Compositor> {
        self.sort_animations();

        let mut compositor =
            Compositor::with_capacity_and_hasher(self.properties.len(), FxBuildHasher);
        for (property, record) in &self.properties {
            let base = match &record.default_animation {
                Some(template) if template.blend == BlendMode::Zero => {
                    template.value_type.zero()?
                }
                _ => record.value.clone(),
            };
            compositor.insert(property.clone(), base);
        }

        for animation in &mut self.animations {
            if animation.composite(&mut compositor, now)? {
                finished.push(FinishedAnimation {
                    number: animation.number(),
                    name: animation.name().map(str::to_string),
                    retained: animation.fill_mode.retains(),
                    completion: animation.completion.clone(),
                });
            }
        }
        tracing::trace!(animations = self.animations.len(), now, "composite pass");
        Ok(compositor)
    }
}

pub(crate) struct LayerShared {
    id: LayerId,
    context: Context,
    delegate: Rc<dyn LayerDelegate>,
    state: RefCell<LayerState>,
}

impl Drop for LayerShared {
    fn drop(&mut self) {
        self.context.forget_layer(self.id);
    }
}

/// A set of animatable properties with a model and a presentation view
///
/// Cheap to clone; clones refer to the same layer.
#[derive(Clone)]
pub struct Layer {
    shared: Rc<LayerShared>,
}

impl Layer {
    /// Layer without hooks: no implicit animation beyond property defaults,
    /// no rendering
    pub fn new(context: &Context) -> Self {
        Self::with_delegate(context, NoopDelegate)
    }

    pub fn with_delegate<D: LayerDelegate + 'static>(context: &Context, delegate: D) -> Self {
        let shared = Rc::new_cyclic(|weak| LayerShared {
            id: context.register_layer(weak.clone()),
            context: context.clone(),
            delegate: Rc::new(delegate),
            state: RefCell::new(LayerState::default()),
        });
        Self { shared }
    }

    pub(crate) fn from_shared(shared: Rc<LayerShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> LayerId {
        self.shared.id
    }

    pub fn context(&self) -> &Context {
        &self.shared.context
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Make `property` animatable, starting from `initial`
    ///
    /// `default_animation` is the template used for implicit animations of
    /// this property. A property can only be registered once per layer; a
    /// second attempt is logged and rejected without changing anything.
    pub fn register_animatable_property(
        &self,
        property: &str,
        initial: impl Into<Value>,
        default_animation: Option<Animation>,
    ) -> Result<()> {
        let mut state = self.shared.state.borrow_mut();
        if state.properties.contains_key(property) {
            tracing::warn!(layer = ?self.id(), property, "animatable property already registered");
            return Err(ShoeError::AlreadyRegistered(property.to_string()));
        }
        state.properties.insert(
            property.to_string(),
            PropertyRecord {
                value: initial.into(),
                default_animation,
            },
        );
        Ok(())
    }

    /// Like [`register_animatable_property`](Self::register_animatable_property)
    /// with a default animation built once by `factory`
    pub fn register_animatable_property_with<F>(
        &self,
        property: &str,
        initial: impl Into<Value>,
        factory: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Animation,
    {
        if self.shared.state.borrow().properties.contains_key(property) {
            tracing::warn!(layer = ?self.id(), property, "animatable property already registered");
            return Err(ShoeError::AlreadyRegistered(property.to_string()));
        }
        self.register_animatable_property(property, initial, Some(factory()))
    }

    /// Registered property names in registration order
    pub fn registered_properties(&self) -> Vec<String> {
        self.shared.state.borrow().properties.keys().cloned().collect()
    }

    /// Model value of `property`
    pub fn get(&self, property: &str) -> Option<Value> {
        self.shared
            .state
            .borrow()
            .properties
            .get(property)
            .map(|record| record.value.clone())
    }

    /// Model value of `property` as a number
    pub fn number(&self, property: &str) -> Option<f64> {
        self.get(property).and_then(|value| value.as_number())
    }

    /// Write the model value of `property`, animating the change if an
    /// animation resolves for it
    ///
    /// The model always takes the new value. When no animation starts, the
    /// render hook runs immediately so the change is drawn.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let default_animation = {
            let state = self.shared.state.borrow();
            let record = state
                .properties
                .get(property)
                .ok_or_else(|| ShoeError::UnknownProperty(property.to_string()))?;
            record.default_animation.clone()
        };

        let transaction = self.shared.context.current_transaction();
        let mut animated = false;
        if !transaction.disable_animation {
            let spec = self
                .shared
                .delegate
                .animation_for_key(property, &value, self);
            if let Some(mut animation) = spec.resolve(default_animation.as_ref()) {
                if animation.property.is_none() {
                    animation.property = Some(property.to_string());
                }
                if animation.from.is_none() {
                    animation.from = if animation.blend == BlendMode::Absolute {
                        self.presentation()?.get(property).cloned()
                    } else {
                        self.get(property)
                    };
                }
                if animation.to.is_none() {
                    animation.to = Some(value.clone());
                }
                self.add_animation(animation, None)?;
                animated = true;
            }
        }

        if let Some(record) = self.shared.state.borrow_mut().properties.get_mut(property) {
            record.value = value;
        }

        if !animated {
            self.render()?;
        }
        Ok(())
    }

    // =========================================================================
    // Animations
    // =========================================================================

    /// Start `animation` on this layer, optionally under `name`
    ///
    /// The layer keeps its own copy. A named animation replaces any earlier
    /// animation with the same name.
    pub fn add_animation(&self, mut animation: Animation, name: Option<&str>) -> Result<()> {
        let now = self.shared.context.current_time();
        animation.run(now, name.map(str::to_string))?;

        let was_idle = {
            let mut state = self.shared.state.borrow_mut();
            let was_idle = state.animations.is_empty();

            let number = state.next_number;
            state.next_number += 1;
            animation.set_number(number);
            state.animations.push(animation);

            // Replaced after pushing, so the list never goes empty in between
            if let Some(name) = name {
                if let Some(previous) = state.named.insert(name.to_string(), number) {
                    state.remove_instance(previous);
                }
            }
            state.needs_sort = true;
            was_idle
        };

        if was_idle {
            self.shared.context.register_target(self.id());
        }
        Ok(())
    }

    /// Remove the animation added under `name`
    ///
    /// The layer stays registered with the scheduler until its next tick.
    pub fn remove_animation(&self, name: &str) {
        let mut state = self.shared.state.borrow_mut();
        if let Some(number) = state.named.shift_remove(name) {
            state.remove_instance(number);
        }
    }

    pub fn remove_all_animations(&self) {
        let mut state = self.shared.state.borrow_mut();
        state.animations.clear();
        state.named.clear();
    }

    /// Copy of the animation added under `name`
    pub fn animation_named(&self, name: &str) -> Option<Animation> {
        let state = self.shared.state.borrow();
        let number = *state.named.get(name)?;
        state
            .animations
            .iter()
            .find(|animation| animation.number() == number)
            .cloned()
    }

    /// Copies of every live animation
    pub fn animations(&self) -> Vec<Animation> {
        self.shared.state.borrow().animations.clone()
    }

    /// Names of the named animations, in the order they were added
    pub fn animation_keys(&self) -> Vec<String> {
        self.shared.state.borrow().named.keys().cloned().collect()
    }

    pub fn has_animations(&self) -> bool {
        !self.shared.state.borrow().animations.is_empty()
    }

    // =========================================================================
    // Compositing
    // =========================================================================

    /// Composite every live animation over the model at the current
    /// transaction time
    ///
    /// Animations that finish during the pass are removed (unless their fill
    /// mode keeps them) and their completions fire, all after the whole pass
    /// has been composited. Never cached: every call recomputes.
    pub fn presentation(&self) -> Result<Presentation> {
        let now = self.shared.context.current_time();
        let mut finished = SmallVec::new();
        let composited = self
            .shared
            .state
            .borrow_mut()
            .composite(now, &mut finished);

        for animation in finished {
            self.finish(animation);
        }

        let values = composited?;
        Ok(Presentation::new(self.clone(), values, now))
    }

    fn finish(&self, animation: FinishedAnimation) {
        if !animation.retained {
            let mut state = self.shared.state.borrow_mut();
            if let Some(name) = &animation.name {
                if state.named.get(name) == Some(&animation.number) {
                    state.named.shift_remove(name);
                }
            }
            state.remove_instance(animation.number);
        }
        if let Some(completion) = animation.completion {
            completion();
        }
    }

    /// Run the render hook with a fresh presentation
    pub fn render(&self) -> Result<()> {
        let presentation = self.presentation()?;
        self.shared.delegate.render(&presentation)?;
        Ok(())
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Layer")
            .field("id", &self.shared.id)
            .field("properties", &state.properties.len())
            .field("animations", &state.animations.len())
            .finish()
    }
}
