//! Shoe Core
//!
//! Foundational types for the Shoe animation engine:
//!
//! - **Values**: the animatable datum ([`Value`]) and its discrete set elements
//! - **Value Types**: the algebra (`zero`, `add`, `subtract`, `interpolate`)
//!   the compositor uses to blend animations ([`ValueType`])
//! - **Custom Types**: plug-in algebras through the [`Animatable`] trait
//! - **Errors**: the shared [`ShoeError`] taxonomy
//!
//! # Example
//!
//! ```rust
//! use shoe_core::{Value, ValueType};
//!
//! let position = ValueType::array(ValueType::Number, 2);
//! let from = Value::from(vec![0.0, 0.0]);
//! let to = Value::from(vec![100.0, 50.0]);
//!
//! let halfway = position.interpolate(&from, &to, 0.5).unwrap();
//! assert_eq!(halfway, Value::from(vec![50.0, 25.0]));
//! ```

pub mod error;
pub mod value;

pub use error::{Result, ShoeError};
pub use value::{Animatable, Discrete, SetComparator, SetOrder, Value, ValueType};
