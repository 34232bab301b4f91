//! Animatable values and the value type algebra
//!
//! A [`Value`] is one animatable datum. A [`ValueType`] describes how values
//! of one kind combine during compositing:
//!
//! - `zero()` - the identity for `add`
//! - `add(a, b)` - combine two values
//! - `subtract(a, b)` - remove `b` from `a`
//! - `interpolate(a, b, t)` - blend from `a` (t = 0) to `b` (t = 1)
//!
//! The built-in types are [`ValueType::Number`], [`ValueType::Scale`],
//! [`ValueType::Array`] and [`ValueType::Set`]. Anything else plugs in through
//! the [`Animatable`] trait.
//!
//! ```rust
//! use shoe_core::{Value, ValueType};
//!
//! let number = ValueType::Number;
//! let mid = number.interpolate(&Value::from(0.0), &Value::from(10.0), 0.5).unwrap();
//! assert_eq!(mid, Value::Number(5.0));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use crate::error::{Result, ShoeError};

// ============================================================================
// Values
// ============================================================================

/// A discrete element of a [`Value::Set`]
///
/// Discrete elements are never blended, only added or removed.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Discrete {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<bool> for Discrete {
    fn from(value: bool) -> Self {
        Discrete::Bool(value)
    }
}

impl From<i64> for Discrete {
    fn from(value: i64) -> Self {
        Discrete::Int(value)
    }
}

impl From<i32> for Discrete {
    fn from(value: i32) -> Self {
        Discrete::Int(value as i64)
    }
}

impl From<&str> for Discrete {
    fn from(value: &str) -> Self {
        Discrete::Text(value.to_string())
    }
}

impl From<String> for Discrete {
    fn from(value: String) -> Self {
        Discrete::Text(value)
    }
}

/// One animatable datum
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A scalar, used by `Number` and `Scale`
    Number(f64),
    /// A fixed-length sequence, used by `Array`
    Array(Vec<Value>),
    /// A collection of discrete elements, used by `Set`
    Set(Vec<Discrete>),
}

impl Value {
    /// Build a set value from anything convertible to [`Discrete`]
    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Discrete>,
    {
        Value::Set(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Array(_) => "array",
            Value::Set(_) => "set",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Discrete]> {
        match self {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Array(values.into_iter().map(Value::Number).collect())
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

// ============================================================================
// Custom value types
// ============================================================================

/// Algebra for a value type that is not built in
///
/// Every method has a default that fails with [`ShoeError::NotImplemented`],
/// so a partially implemented type reports exactly which operation is missing
/// the first time the compositor needs it.
pub trait Animatable {
    /// Name used when the type is printed
    fn name(&self) -> &'static str {
        "custom"
    }

    fn zero(&self) -> Result<Value> {
        Err(ShoeError::NotImplemented { method: "zero()" })
    }

    fn add(&self, _a: &Value, _b: &Value) -> Result<Value> {
        Err(ShoeError::NotImplemented {
            method: "add(a, b)",
        })
    }

    /// Subtract `b` from `a`
    fn subtract(&self, _a: &Value, _b: &Value) -> Result<Value> {
        Err(ShoeError::NotImplemented {
            method: "subtract(a, b) in the form subtract b from a",
        })
    }

    fn interpolate(&self, _a: &Value, _b: &Value, _progress: f64) -> Result<Value> {
        Err(ShoeError::NotImplemented {
            method: "interpolate(a, b, progress)",
        })
    }
}

// ============================================================================
// Value types
// ============================================================================

/// Comparator used to order set elements after a union
pub type SetComparator = Rc<dyn Fn(&Discrete, &Discrete) -> Ordering>;

/// Ordering applied to the result of a set union
#[derive(Clone, Default)]
pub enum SetOrder {
    /// Keep `a`'s order, then `b`'s additions in `b`'s order
    #[default]
    Insertion,
    /// Sort by the natural ordering of [`Discrete`]
    Natural,
    /// Sort with a custom comparator
    By(SetComparator),
}

impl SetOrder {
    fn apply(&self, items: &mut [Discrete]) {
        match self {
            SetOrder::Insertion => {}
            SetOrder::Natural => items.sort(),
            SetOrder::By(compare) => items.sort_by(|a, b| compare(a, b)),
        }
    }
}

impl fmt::Debug for SetOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOrder::Insertion => f.write_str("Insertion"),
            SetOrder::Natural => f.write_str("Natural"),
            SetOrder::By(_) => f.write_str("By(<comparator>)"),
        }
    }
}

/// How values of one kind are composited
#[derive(Clone)]
pub enum ValueType {
    /// `zero = 0`, `add = a + b`, `subtract = a - b`, linear interpolation
    Number,
    /// Multiplicative: `zero = 1`, `add = a * b`, `subtract = a / b`
    /// (0 when `b == 0`), linear interpolation in value space
    Scale,
    /// Element-wise application of `element` across `length` entries
    Array {
        element: Box<ValueType>,
        length: usize,
    },
    /// Discrete union/difference with a step interpolation
    Set(SetOrder),
    /// A consumer-supplied algebra
    Custom(Rc<dyn Animatable>),
}

impl ValueType {
    /// Fixed-length array of `element`
    pub fn array(element: ValueType, length: usize) -> Self {
        ValueType::Array {
            element: Box::new(element),
            length,
        }
    }

    /// Set that keeps insertion order
    pub fn set() -> Self {
        ValueType::Set(SetOrder::Insertion)
    }

    /// Set sorted by the natural element ordering after every union
    pub fn sorted_set() -> Self {
        ValueType::Set(SetOrder::Natural)
    }

    /// Set sorted by `compare` after every union
    pub fn set_sorted_by<F>(compare: F) -> Self
    where
        F: Fn(&Discrete, &Discrete) -> Ordering + 'static,
    {
        ValueType::Set(SetOrder::By(Rc::new(compare)))
    }

    pub fn custom<A: Animatable + 'static>(algebra: A) -> Self {
        ValueType::Custom(Rc::new(algebra))
    }

    /// Identity element for `add`
    pub fn zero(&self) -> Result<Value> {
        match self {
            ValueType::Number => Ok(Value::Number(0.0)),
            ValueType::Scale => Ok(Value::Number(1.0)),
            ValueType::Array { element, length } => (0..*length)
                .map(|_| element.zero())
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            ValueType::Set(_) => Ok(Value::Set(Vec::new())),
            ValueType::Custom(algebra) => algebra.zero(),
        }
    }

    pub fn add(&self, a: &Value, b: &Value) -> Result<Value> {
        match self {
            ValueType::Number => Ok(Value::Number(number("add", a)? + number("add", b)?)),
            ValueType::Scale => Ok(Value::Number(number("add", a)? * number("add", b)?)),
            ValueType::Array { element, length } => {
                let a = elements("add", a, *length)?;
                let b = elements("add", b, *length)?;
                a.iter()
                    .zip(b)
                    .map(|(a, b)| element.add(a, b))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            ValueType::Set(order) => {
                let a = discrete("add", a)?;
                let b = discrete("add", b)?;
                let mut union = a.to_vec();
                for item in b {
                    if !union.contains(item) {
                        union.push(item.clone());
                    }
                }
                order.apply(&mut union);
                Ok(Value::Set(union))
            }
            ValueType::Custom(algebra) => algebra.add(a, b),
        }
    }

    /// Subtract `b` from `a`
    pub fn subtract(&self, a: &Value, b: &Value) -> Result<Value> {
        match self {
            ValueType::Number => Ok(Value::Number(
                number("subtract", a)? - number("subtract", b)?,
            )),
            ValueType::Scale => {
                let a = number("subtract", a)?;
                let b = number("subtract", b)?;
                if b == 0.0 {
                    return Ok(Value::Number(0.0));
                }
                Ok(Value::Number(a / b))
            }
            ValueType::Array { element, length } => {
                let a = elements("subtract", a, *length)?;
                let b = elements("subtract", b, *length)?;
                a.iter()
                    .zip(b)
                    .map(|(a, b)| element.subtract(a, b))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            ValueType::Set(_) => {
                let a = discrete("subtract", a)?;
                let b = discrete("subtract", b)?;
                let difference = a.iter().filter(|item| !b.contains(item)).cloned().collect();
                Ok(Value::Set(difference))
            }
            ValueType::Custom(algebra) => algebra.subtract(a, b),
        }
    }

    /// Blend from `a` at `progress == 0` to `b` at `progress == 1`
    ///
    /// Sets never blend: they return `a` until `progress` reaches 1.
    pub fn interpolate(&self, a: &Value, b: &Value, progress: f64) -> Result<Value> {
        match self {
            ValueType::Number | ValueType::Scale => {
                let a = number("interpolate", a)?;
                let b = number("interpolate", b)?;
                Ok(Value::Number(a + (b - a) * progress))
            }
            ValueType::Array { element, length } => {
                let a = elements("interpolate", a, *length)?;
                let b = elements("interpolate", b, *length)?;
                a.iter()
                    .zip(b)
                    .map(|(a, b)| element.interpolate(a, b, progress))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            ValueType::Set(_) => {
                discrete("interpolate", a)?;
                discrete("interpolate", b)?;
                if progress >= 1.0 {
                    Ok(b.clone())
                } else {
                    Ok(a.clone())
                }
            }
            ValueType::Custom(algebra) => algebra.interpolate(a, b, progress),
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Number => f.write_str("Number"),
            ValueType::Scale => f.write_str("Scale"),
            ValueType::Array { element, length } => f
                .debug_struct("Array")
                .field("element", element)
                .field("length", length)
                .finish(),
            ValueType::Set(order) => f.debug_tuple("Set").field(order).finish(),
            ValueType::Custom(algebra) => write!(f, "Custom({})", algebra.name()),
        }
    }
}

fn number(operation: &'static str, value: &Value) -> Result<f64> {
    value.as_number().ok_or(ShoeError::TypeMismatch {
        operation,
        expected: "number",
        found: value.kind(),
    })
}

fn elements<'a>(operation: &'static str, value: &'a Value, length: usize) -> Result<&'a [Value]> {
    let items = value.as_array().ok_or(ShoeError::TypeMismatch {
        operation,
        expected: "array",
        found: value.kind(),
    })?;
    if items.len() != length {
        return Err(ShoeError::LengthMismatch {
            expected: length,
            found: items.len(),
        });
    }
    Ok(items)
}

fn discrete<'a>(operation: &'static str, value: &'a Value) -> Result<&'a [Discrete]> {
    value.as_set().ok_or(ShoeError::TypeMismatch {
        operation,
        expected: "set",
        found: value.kind(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(value: &Value, expected: f64) -> bool {
        (value.as_number().unwrap() - expected).abs() < 1e-9
    }

    #[test]
    fn test_number_algebra() {
        let t = ValueType::Number;
        let a = Value::from(3.0);
        let b = Value::from(7.0);

        assert_eq!(t.zero().unwrap(), Value::Number(0.0));
        assert_eq!(t.add(&a, &t.zero().unwrap()).unwrap(), a);
        assert_eq!(t.subtract(&a, &t.zero().unwrap()).unwrap(), a);
        assert_eq!(t.subtract(&a, &b).unwrap(), Value::Number(-4.0));
        assert_eq!(t.interpolate(&a, &b, 0.0).unwrap(), a);
        assert_eq!(t.interpolate(&a, &b, 1.0).unwrap(), b);
        assert!(approx(&t.interpolate(&a, &b, 0.25).unwrap(), 4.0));
    }

    #[test]
    fn test_scale_algebra() {
        let t = ValueType::Scale;
        let a = Value::from(2.0);
        let b = Value::from(8.0);

        assert_eq!(t.zero().unwrap(), Value::Number(1.0));
        assert_eq!(t.add(&a, &t.zero().unwrap()).unwrap(), a);
        assert_eq!(t.subtract(&a, &t.zero().unwrap()).unwrap(), a);
        assert_eq!(t.add(&a, &b).unwrap(), Value::Number(16.0));
        assert_eq!(t.subtract(&b, &a).unwrap(), Value::Number(4.0));
        assert_eq!(t.interpolate(&a, &b, 0.0).unwrap(), a);
        assert_eq!(t.interpolate(&a, &b, 1.0).unwrap(), b);
        // Linear in value space, not in the exponent
        assert!(approx(&t.interpolate(&a, &b, 0.5).unwrap(), 5.0));
    }

    #[test]
    fn test_scale_subtract_by_zero() {
        let t = ValueType::Scale;
        let result = t.subtract(&Value::from(5.0), &Value::from(0.0)).unwrap();
        assert_eq!(result, Value::Number(0.0));
    }

    #[test]
    fn test_array_algebra() {
        let t = ValueType::array(ValueType::Number, 3);
        let a = Value::from(vec![1.0, 2.0, 3.0]);
        let b = Value::from(vec![3.0, 6.0, 9.0]);
        let zero = t.zero().unwrap();

        assert_eq!(zero, Value::from(vec![0.0, 0.0, 0.0]));
        assert_eq!(t.add(&a, &zero).unwrap(), a);
        assert_eq!(t.subtract(&a, &zero).unwrap(), a);
        assert_eq!(t.interpolate(&a, &b, 0.0).unwrap(), a);
        assert_eq!(t.interpolate(&a, &b, 1.0).unwrap(), b);
        assert_eq!(
            t.interpolate(&a, &b, 0.5).unwrap(),
            Value::from(vec![2.0, 4.0, 6.0])
        );
    }

    #[test]
    fn test_array_of_scale_zero() {
        let t = ValueType::array(ValueType::Scale, 2);
        assert_eq!(t.zero().unwrap(), Value::from(vec![1.0, 1.0]));
    }

    #[test]
    fn test_array_length_mismatch() {
        let t = ValueType::array(ValueType::Number, 3);
        let short = Value::from(vec![1.0, 2.0]);
        let full = Value::from(vec![1.0, 2.0, 3.0]);

        let err = t.add(&short, &full).unwrap_err();
        assert!(matches!(
            err,
            ShoeError::LengthMismatch {
                expected: 3,
                found: 2
            }
        ));

        // Extra elements are rejected, not dropped
        let long = Value::from(vec![1.0, 2.0, 3.0, 4.0]);
        let err = t.interpolate(&full, &long, 0.5).unwrap_err();
        assert!(matches!(
            err,
            ShoeError::LengthMismatch {
                expected: 3,
                found: 4
            }
        ));
    }

    #[test]
    fn test_set_union_and_difference() {
        let t = ValueType::set();
        let a = Value::set(["a", "b"]);
        let b = Value::set(["b", "c"]);

        assert_eq!(t.add(&a, &b).unwrap(), Value::set(["a", "b", "c"]));
        assert_eq!(t.subtract(&a, &b).unwrap(), Value::set(["a"]));
        assert_eq!(t.add(&a, &t.zero().unwrap()).unwrap(), a);
        assert_eq!(t.subtract(&a, &t.zero().unwrap()).unwrap(), a);
    }

    #[test]
    fn test_set_sorted_union() {
        let natural = ValueType::sorted_set();
        let a = Value::set([3, 1]);
        let b = Value::set([2]);
        assert_eq!(natural.add(&a, &b).unwrap(), Value::set([1, 2, 3]));

        let reversed = ValueType::set_sorted_by(|a, b| b.cmp(a));
        assert_eq!(reversed.add(&a, &b).unwrap(), Value::set([3, 2, 1]));
    }

    #[test]
    fn test_set_interpolation_is_a_step() {
        let t = ValueType::set();
        let a = Value::set(["open"]);
        let b = Value::set(["closed"]);

        for progress in [0.0, 0.25, 0.5, 0.999] {
            assert_eq!(t.interpolate(&a, &b, progress).unwrap(), a);
        }
        assert_eq!(t.interpolate(&a, &b, 1.0).unwrap(), b);
    }

    #[test]
    fn test_type_mismatch() {
        let err = ValueType::Number
            .add(&Value::from(1.0), &Value::set(["x"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ShoeError::TypeMismatch {
                operation: "add",
                expected: "number",
                found: "set"
            }
        ));
    }

    #[test]
    fn test_abstract_value_type_fails() {
        struct Unfinished;
        impl Animatable for Unfinished {}

        let t = ValueType::custom(Unfinished);
        let v = Value::from(1.0);

        assert!(matches!(
            t.zero(),
            Err(ShoeError::NotImplemented { method: "zero()" })
        ));
        assert!(matches!(
            t.add(&v, &v),
            Err(ShoeError::NotImplemented { .. })
        ));
        assert!(matches!(
            t.subtract(&v, &v),
            Err(ShoeError::NotImplemented { .. })
        ));
        assert!(matches!(
            t.interpolate(&v, &v, 0.5),
            Err(ShoeError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_custom_value_type() {
        /// Angle in degrees that always takes the short way round
        struct Degrees;
        impl Animatable for Degrees {
            fn name(&self) -> &'static str {
                "degrees"
            }
            fn zero(&self) -> Result<Value> {
                Ok(Value::Number(0.0))
            }
            fn add(&self, a: &Value, b: &Value) -> Result<Value> {
                ValueType::Number.add(a, b)
            }
            fn subtract(&self, a: &Value, b: &Value) -> Result<Value> {
                let d = ValueType::Number.subtract(a, b)?.as_number().unwrap_or(0.0);
                Ok(Value::Number((d + 540.0).rem_euclid(360.0) - 180.0))
            }
            fn interpolate(&self, a: &Value, b: &Value, progress: f64) -> Result<Value> {
                ValueType::Number.interpolate(a, b, progress)
            }
        }

        let t = ValueType::custom(Degrees);
        assert_eq!(format!("{:?}", t), "Custom(degrees)");
        let delta = t.subtract(&Value::from(350.0), &Value::from(10.0)).unwrap();
        assert!(approx(&delta, -20.0));
    }
}
