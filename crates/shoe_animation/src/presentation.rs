//! Presentation snapshots
//!
//! A [`Presentation`] is the read-only result of one composite pass: every
//! registered property with all live animations applied, at one transaction
//! time. It has no setters. Writes go through the model via [`Layer::set`].

use std::fmt;

use shoe_core::Value;

use crate::animation::Compositor;
use crate::layer::Layer;

/// Composited property values of a layer at one instant
pub struct Presentation {
    layer: Layer,
    values: Compositor,
    time: f64,
}

impl Presentation {
    pub(crate) fn new(layer: Layer, values: Compositor, time: f64) -> Self {
        Self {
            layer,
            values,
            time,
        }
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    /// Composited value of `property` as a number
    pub fn number(&self, property: &str) -> Option<f64> {
        self.get(property).and_then(Value::as_number)
    }

    /// Properties and their composited values, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, property: &str) -> bool {
        self.values.contains_key(property)
    }

    /// Transaction time the snapshot was composited at
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The layer this snapshot was taken from, for reading model values
    pub fn model(&self) -> &Layer {
        &self.layer
    }
}

impl fmt::Debug for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presentation")
            .field("layer", &self.layer.id())
            .field("time", &self.time)
            .field("values", &self.values)
            .finish()
    }
}
