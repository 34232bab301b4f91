//! Easing curves
//!
//! Only two curves are built in. Anything else is injected as a function.

use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

/// An easing function mapping progress in `[0, 1]` to eased progress
pub type EasingFn = Rc<dyn Fn(f64) -> f64>;

/// Easing applied to an animation's iteration progress
#[derive(Clone, Default)]
pub enum Easing {
    /// Identity
    Linear,
    /// `0.5 - cos(progress * PI) / 2`
    #[default]
    EaseInOut,
    /// Consumer-supplied curve
    Custom(EasingFn),
}

impl Easing {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + 'static,
    {
        Easing::Custom(Rc::new(f))
    }

    /// Apply the curve to `progress`
    ///
    /// The edges are fixed: progress at or below 0 yields 0 and progress at or
    /// above 1 yields 1 regardless of the curve.
    pub fn apply(&self, progress: f64) -> f64 {
        if progress <= 0.0 {
            return 0.0;
        }
        if progress >= 1.0 {
            return 1.0;
        }
        match self {
            Easing::Linear => progress,
            Easing::EaseInOut => 0.5 - (progress * PI).cos() / 2.0,
            Easing::Custom(f) => f(progress),
        }
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("Linear"),
            Easing::EaseInOut => f.write_str("EaseInOut"),
            Easing::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear() {
        assert_eq!(Easing::Linear.apply(0.3), 0.3);
    }

    #[test]
    fn test_ease_in_out() {
        let easing = Easing::default();
        assert!((easing.apply(0.5) - 0.5).abs() < 1e-12);
        assert!(easing.apply(0.25) < 0.25);
        assert!(easing.apply(0.75) > 0.75);
    }

    #[test]
    fn test_edges_bypass_curve() {
        let overshoot = Easing::custom(|t| t * 1.5);
        assert_eq!(overshoot.apply(0.0), 0.0);
        assert_eq!(overshoot.apply(1.0), 1.0);
        assert_eq!(overshoot.apply(2.0), 1.0);
        assert!((overshoot.apply(0.5) - 0.75).abs() < 1e-12);
    }
}
