use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::AutomationError;

/// Smallest magnitude an exponential endpoint may have. Anything below this
/// is treated as zero, which an exponential curve can never reach.
pub const MIN_EXPONENTIAL_VALUE: f64 = 1.4e-45;

/// Interpolation rule describing how the timeline approaches an event's
/// value from the event before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    /// Jump to the value at the event time.
    Step,
    /// Straight line from the previous event, arriving at the event time.
    Linear,
    /// Geometric curve from the previous event, arriving at the event time.
    Exponential,
    /// Asymptotic decay towards the value starting at the event time, with
    /// the event duration as time constant.
    #[serde(alias = "decay")]
    Target,
}

impl CurveKind {
    pub fn all() -> &'static [CurveKind] {
        &[Self::Step, Self::Linear, Self::Exponential, Self::Target]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::Target => "target",
        }
    }

    /// Linear and exponential events describe a ramp that ends at their time.
    pub fn is_ramp(&self) -> bool {
        matches!(self, Self::Linear | Self::Exponential)
    }
}

impl fmt::Display for CurveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for CurveKind {
    type Err = AutomationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "step" => Ok(Self::Step),
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            "target" | "decay" => Ok(Self::Target),
            _ => Err(AutomationError::InvalidCurve(s.to_string())),
        }
    }
}

/// True when no exponential curve can join `from` and `to`: either endpoint
/// is (effectively) zero or the two lie on opposite sides of zero.
pub fn exponential_is_degenerate(from: f64, to: f64) -> bool {
    from.abs() < MIN_EXPONENTIAL_VALUE
        || to.abs() < MIN_EXPONENTIAL_VALUE
        || from.is_sign_negative() != to.is_sign_negative()
}

/// `v1 + (v2 - v1) * (t - t1) / (t2 - t1)`
#[inline]
pub fn linear(v1: f64, v2: f64, t1: f64, t2: f64, t: f64) -> f64 {
    v1 + (v2 - v1) * ((t - t1) / (t2 - t1))
}

/// `v1 * (v2 / v1) ^ ((t - t1) / (t2 - t1))`
///
/// Holds `v1` when the endpoints cannot be joined geometrically, so a
/// degenerate pair never evaluates to NaN.
#[inline]
pub fn exponential(v1: f64, v2: f64, t1: f64, t2: f64, t: f64) -> f64 {
    if exponential_is_degenerate(v1, v2) {
        return v1;
    }

    v1 * (v2 / v1).powf((t - t1) / (t2 - t1))
}

/// `end + (start - end) * e^(-(t - t0) / time_constant)`
///
/// A zero time constant reaches `end` immediately.
#[inline]
pub fn decay(start: f64, end: f64, t0: f64, time_constant: f64, t: f64) -> f64 {
    if time_constant <= 0.0 {
        return end;
    }

    end + (start - end) * (-(t - t0) / time_constant).exp()
}
