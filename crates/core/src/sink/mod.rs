//! Receivers for committed automation events.
//!
//! A sink is whatever actually renders a parameter: a native audio
//! parameter, a user supplied setter, or nothing at all. The timeline never
//! asks a sink for history; it only reads the pre-automation value and
//! pushes events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    timeline::{self, Event},
    CurveKind,
};

pub trait Sink {
    /// Schedules the native equivalent of `event`.
    fn apply_event(&mut self, event: &Event);

    /// Drops every native event at or after `time`.
    fn cancel_from(&mut self, time: f64);

    /// Value the sink currently holds, used to seed a new timeline.
    fn current_value(&self) -> f64;
}

/// Stand-in for parameters without native backing; the timeline is the only
/// source of truth.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NullSink {
    value: f64,
}

impl NullSink {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Sink for NullSink {
    fn apply_event(&mut self, _event: &Event) {}

    fn cancel_from(&mut self, _time: f64) {}

    fn current_value(&self) -> f64 {
        self.value
    }
}

/// One call received by a [`RecordingSink`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum SinkCall {
    Apply {
        value: f64,
        time: f64,
        duration: f64,
        curve: CurveKind,
    },
    Cancel {
        time: f64,
    },
}

/// In-memory native parameter. Keeps its own pending schedule the way a
/// playback engine would and logs every call it receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSink {
    value: f64,
    pending: Vec<Event>,
    calls: Vec<SinkCall>,
}

impl RecordingSink {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            pending: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    pub fn pending(&self) -> &[Event] {
        &self.pending
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// What the native side would output at `time` given its pending
    /// schedule.
    pub fn rendered_value_at(&self, time: f64) -> f64 {
        if self.pending.is_empty() {
            return self.value;
        }

        let mut events = Vec::with_capacity(self.pending.len() + 1);
        events.push(Event::step(0.0, self.value));
        events.extend_from_slice(&self.pending);
        timeline::value_in(&events, time)
    }
}

impl Sink for RecordingSink {
    fn apply_event(&mut self, event: &Event) {
        self.calls.push(SinkCall::Apply {
            value: event.value,
            time: event.time,
            duration: event.duration,
            curve: event.curve,
        });
        let index = self
            .pending
            .partition_point(|pending| pending.time <= event.time);
        self.pending.insert(index, *event);
    }

    fn cancel_from(&mut self, time: f64) {
        self.calls.push(SinkCall::Cancel { time });
        self.pending.retain(|pending| pending.time < time);
    }

    fn current_value(&self) -> f64 {
        self.value
    }
}

/// Receives every committed event.
pub type Setter = Box<dyn FnMut(&Event)>;
/// Reads the property's current value.
pub type Getter = Box<dyn Fn() -> f64>;

/// Drives a property through a manual setter instead of a native parameter.
/// Without a getter, the last value handed to the setter is reported.
pub struct SetterSink {
    setter: Setter,
    getter: Option<Getter>,
    last_value: f64,
}

impl SetterSink {
    pub fn new(setter: Setter, getter: Option<Getter>, initial_value: f64) -> Self {
        Self {
            setter,
            getter,
            last_value: initial_value,
        }
    }
}

impl Sink for SetterSink {
    fn apply_event(&mut self, event: &Event) {
        self.last_value = event.value;
        (self.setter)(event);
    }

    fn cancel_from(&mut self, _time: f64) {}

    fn current_value(&self) -> f64 {
        self.getter
            .as_ref()
            .map_or(self.last_value, |getter| getter())
    }
}

impl fmt::Debug for SetterSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetterSink")
            .field("has_getter", &self.getter.is_some())
            .field("last_value", &self.last_value)
            .finish()
    }
}
