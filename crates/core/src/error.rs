/// Result alias that carries the custom [`AutomationError`] type.
pub type Result<T> = std::result::Result<T, AutomationError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    /// A curve name that does not match any [`crate::CurveKind`].
    #[error("invalid curve `{0}`: expected step, linear, exponential or target")]
    InvalidCurve(String),
    /// A property was declared with neither a native parameter nor a
    /// manual setter, so there is nothing to drive.
    #[error("property `{0}` requires a native parameter or a setter function")]
    InvalidParameter(String),
    /// `automate` was called for a property that was never declared.
    #[error("property `{0}` is not automatable")]
    NotAutomatable(String),
    /// Times and durations must be finite and non-negative.
    #[error("invalid time {0}: expected a finite, non-negative number of seconds")]
    InvalidTime(f64),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration or automation script.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl AutomationError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for AutomationError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for AutomationError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Rejects negative, NaN and infinite times.
pub(crate) fn check_time(time: f64) -> Result<f64> {
    if time.is_finite() && time >= 0.0 {
        Ok(time)
    } else {
        Err(AutomationError::InvalidTime(time))
    }
}
