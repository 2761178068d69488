//! Easing curves.
//!
//! Each curve maps normalized progress `t` in `[0, 1]` to eased progress with
//! `f(0) = 0` and `f(1) = 1`. The formulas are the classic polynomial forms,
//! evaluated exactly as written so results are reproducible bit for bit.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `t`
#[inline]
pub fn linear(t: f64) -> f64 {
    t
}

/// `t²`
#[inline]
pub fn ease_in_quad(t: f64) -> f64 {
    t * t
}

/// `t(2 - t)`
#[inline]
pub fn ease_out_quad(t: f64) -> f64 {
    t * (2.0 - t)
}

#[inline]
pub fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        -1.0 + (4.0 - 2.0 * t) * t
    }
}

/// `t³`
#[inline]
pub fn ease_in_cubic(t: f64) -> f64 {
    t * t * t
}

/// `(t - 1)³ + 1`
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    let u = t - 1.0;
    u * u * u + 1.0
}

#[inline]
pub fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
    }
}

/// `t⁴`
#[inline]
pub fn ease_in_quart(t: f64) -> f64 {
    t * t * t * t
}

/// `1 - (t - 1)⁴`
#[inline]
pub fn ease_out_quart(t: f64) -> f64 {
    let u = t - 1.0;
    1.0 - u * u * u * u
}

#[inline]
pub fn ease_in_out_quart(t: f64) -> f64 {
    if t < 0.5 {
        8.0 * t * t * t * t
    } else {
        let u = t - 1.0;
        1.0 - 8.0 * u * u * u * u
    }
}

/// Named easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    #[default]
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
}

impl Easing {
    /// Every curve, in declaration order.
    pub const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuart,
        Easing::EaseOutQuart,
        Easing::EaseInOutQuart,
    ];

    /// Evaluate the curve. `t` is clamped to `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => linear(t),
            Easing::EaseInQuad => ease_in_quad(t),
            Easing::EaseOutQuad => ease_out_quad(t),
            Easing::EaseInOutQuad => ease_in_out_quad(t),
            Easing::EaseInCubic => ease_in_cubic(t),
            Easing::EaseOutCubic => ease_out_cubic(t),
            Easing::EaseInOutCubic => ease_in_out_cubic(t),
            Easing::EaseInQuart => ease_in_quart(t),
            Easing::EaseOutQuart => ease_out_quart(t),
            Easing::EaseInOutQuart => ease_in_out_quart(t),
        }
    }

    /// camelCase identifier, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseInQuad => "easeInQuad",
            Easing::EaseOutQuad => "easeOutQuad",
            Easing::EaseInOutQuad => "easeInOutQuad",
            Easing::EaseInCubic => "easeInCubic",
            Easing::EaseOutCubic => "easeOutCubic",
            Easing::EaseInOutCubic => "easeInOutCubic",
            Easing::EaseInQuart => "easeInQuart",
            Easing::EaseOutQuart => "easeOutQuart",
            Easing::EaseInOutQuart => "easeInOutQuart",
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown easing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown easing '{0}' (expected one of: linear, easeInQuad, ..., easeInOutQuart)")]
pub struct EasingParseError(pub String);

impl FromStr for Easing {
    type Err = EasingParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Easing::ALL
            .into_iter()
            .find(|easing| easing.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| EasingParseError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_ease_out_quad_midpoint_is_exact() {
        assert_eq!(ease_out_quad(0.5), 0.75);
        assert_eq!(Easing::EaseOutQuad.apply(0.5), 0.75);
    }

    #[test]
    fn test_known_values() {
        assert_eq!(ease_in_quad(0.5), 0.25);
        assert_eq!(ease_in_out_quad(0.25), 0.125);
        assert_eq!(ease_in_out_quad(0.75), 0.875);
        assert_eq!(ease_in_cubic(0.5), 0.125);
        assert_eq!(ease_out_cubic(0.5), 0.875);
        assert_eq!(ease_in_out_cubic(0.5), 0.5);
        assert_eq!(ease_in_quart(0.5), 0.0625);
        assert_eq!(ease_out_quart(0.5), 0.9375);
        assert_eq!(ease_in_out_quart(0.25), 0.03125);
    }

    #[test]
    fn test_endpoints_are_exact() {
        for easing in Easing::ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{easing} at 0");
            assert_eq!(easing.apply(1.0), 1.0, "{easing} at 1");
        }
    }

    #[test]
    fn test_input_is_clamped() {
        assert_eq!(Easing::EaseOutQuad.apply(-0.5), 0.0);
        assert_eq!(Easing::EaseOutQuad.apply(1.5), 1.0);
        assert_eq!(Easing::Linear.apply(f64::NAN), 0.0);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("easeOutQuad".parse::<Easing>(), Ok(Easing::EaseOutQuad));
        assert_eq!("linear".parse::<Easing>(), Ok(Easing::Linear));
        assert_eq!("EASEINOUTCUBIC".parse::<Easing>(), Ok(Easing::EaseInOutCubic));
        assert!("bounce".parse::<Easing>().is_err());

        for easing in Easing::ALL {
            assert_eq!(easing.to_string().parse::<Easing>(), Ok(easing));
        }
    }

    #[test]
    fn test_serde_uses_camel_case() {
        let json = serde_json::to_string(&Easing::EaseInOutQuart).unwrap();
        assert_eq!(json, "\"easeInOutQuart\"");
    }

    proptest! {
        #[test]
        fn prop_output_stays_in_unit_range(t in 0.0f64..=1.0, index in 0usize..10) {
            let value = Easing::ALL[index].apply(t);
            prop_assert!((0.0..=1.0).contains(&value), "{} -> {}", t, value);
        }

        #[test]
        fn prop_curves_are_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0, index in 0usize..10) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let easing = Easing::ALL[index];
            prop_assert!(easing.apply(lo) <= easing.apply(hi) + 1e-12);
        }
    }
}
