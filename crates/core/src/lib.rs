//! Core library for parameter automation.
//!
//! A [`Timeline`] holds the scheduled changes of one scalar parameter and can
//! be evaluated at any time, including between events. [`AutomatedParam`]
//! pairs a timeline with the [`Sink`] that actually renders the parameter and
//! keeps the two in step; [`AudioObject`] groups declared properties and
//! dispatches automation requests to them by name.
//!
//! Nothing here reads a clock or spawns work: every time is passed in by the
//! caller, and the polling loop that mirrors values for observers is driven
//! one frame at a time.

pub mod clock;
pub mod config;
pub mod curve;
pub mod error;
pub mod object;
pub mod observe;
pub mod param;
pub mod script;
pub mod sink;
pub mod timeline;

pub use clock::PlaybackClock;
pub use config::{AppConfig, AutomationConfig};
pub use curve::{CurveKind, MIN_EXPONENTIAL_VALUE};
pub use error::{AutomationError, Result};
pub use object::AudioObject;
pub use observe::{ChangeRecord, Observers, SubscriptionId};
pub use param::{AutomatedParam, FrameOutcome, ParamBacking, ParamOptions};
pub use script::{Rendering, Sample, Script, ScriptCommand};
pub use sink::{NullSink, RecordingSink, SetterSink, Sink, SinkCall};
pub use timeline::{Event, Timeline};
