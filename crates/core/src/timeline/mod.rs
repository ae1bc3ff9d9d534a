use serde::{Deserialize, Serialize};

use crate::{
    curve::{self, CurveKind},
    error::check_time,
    AutomationError, Result,
};

/// A single scheduled change: the value held as of `time`, approached from
/// the previous event along `curve`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub time: f64,
    pub value: f64,
    pub curve: CurveKind,
    /// Ramp length for linear and exponential events, time constant for
    /// target events, always zero for steps.
    pub duration: f64,
}

impl Event {
    pub fn new(time: f64, value: f64, curve: CurveKind, duration: f64) -> Self {
        let duration = if curve == CurveKind::Step { 0.0 } else { duration };
        Self {
            time,
            value,
            curve,
            duration,
        }
    }

    pub fn step(time: f64, value: f64) -> Self {
        Self::new(time, value, CurveKind::Step, 0.0)
    }
}

/// Ordered automation events for one parameter.
///
/// Events are non-decreasing in time and the list is never empty: it is
/// seeded with a step at `t = 0` holding the parameter's initial value.
/// Several events may share a timestamp as long as their curve kinds
/// differ, e.g. a step reset followed by the start of a decay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    events: Vec<Event>,
}

impl Timeline {
    pub fn new(initial_value: f64) -> Self {
        Self {
            events: vec![Event::step(0.0, initial_value)],
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Always false; present for symmetry with [`Timeline::len`].
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last_event(&self) -> &Event {
        &self.events[self.events.len() - 1]
    }

    /// Events at or after `time`, i.e. everything a sink has to hold once
    /// its schedule has been cancelled from `time`.
    pub fn events_from(&self, time: f64) -> &[Event] {
        let index = self.events.partition_point(|event| event.time < time);
        &self.events[index..]
    }

    /// Inserts an event meaning "`value` reached by `time` via `curve`".
    ///
    /// An exponential towards (or away from) zero, or across zero, cannot
    /// be rendered and is replaced by a step at the previous event's time.
    /// An event landing on an existing timestamp supersedes the event of the
    /// same curve kind there, or stacks after the others.
    pub fn schedule(
        &mut self,
        time: f64,
        value: f64,
        curve: CurveKind,
        duration: f64,
    ) -> Result<Event> {
        check_time(time)?;
        check_time(duration)?;
        if !value.is_finite() {
            return Err(AutomationError::msg(format!(
                "cannot schedule non-finite value {value}"
            )));
        }

        let mut event = Event::new(time, value, curve, duration);

        if curve == CurveKind::Exponential {
            let index = self.events.partition_point(|existing| existing.time < time);
            let previous = index.checked_sub(1).map(|n| self.events[n]);
            let from = previous.map_or(value, |previous| previous.value);

            if curve::exponential_is_degenerate(from, value) {
                let step_time = previous.map_or(time, |previous| previous.time);
                tracing::debug!(
                    time,
                    value,
                    from,
                    step_time,
                    "exponential curve cannot reach target, substituting step"
                );
                event = Event::step(step_time, value);
            }
        }

        let index = self.insert(event);
        tracing::debug!(
            time = event.time,
            value = event.value,
            curve = %event.curve,
            duration = event.duration,
            index,
            "scheduled automation event"
        );
        Ok(event)
    }

    /// Interpolated value at `time`. Pure function of the event list.
    pub fn value_at(&self, time: f64) -> f64 {
        value_in(&self.events, time)
    }

    /// Value the timeline settles on once every event has played.
    pub fn terminal_value(&self) -> f64 {
        self.last_event().value
    }

    /// True once `now` is past the last event and the value has come to
    /// rest on it. A trailing decay settles only when it is numerically
    /// indistinguishable from its target.
    pub fn is_settled_at(&self, now: f64) -> bool {
        now >= self.last_event().time && self.value_at(now) == self.terminal_value()
    }

    /// Discards everything scheduled after `time`, keeping the value the
    /// timeline would have had there.
    ///
    /// A ramp cut mid-way is shortened to end at `time` on its own curve, so
    /// the value never jumps. Any other interrupted segment, including a
    /// running decay, is frozen with a step. Events sitting exactly on
    /// `time` already define the value there and are kept.
    pub fn truncate_at(&mut self, time: f64) -> Result<()> {
        check_time(time)?;

        let index = self.events.partition_point(|event| event.time < time);

        if index == self.events.len() {
            self.freeze_at(time);
            return Ok(());
        }

        if self.events[index].time == time {
            let end = self.events.partition_point(|event| event.time <= time);
            let dropped = self.events.len() - end;
            self.events.truncate(end);
            self.freeze_at(time);
            tracing::debug!(time, dropped, "truncated automation at existing event");
            return Ok(());
        }

        let value = self.value_at(time);
        let interrupted = self.events[index];
        let anchor = index.checked_sub(1).map(|n| self.events[n]);
        let dropped = self.events.len() - index;
        self.events.truncate(index);

        let event = match anchor {
            Some(anchor) if interrupted.curve.is_ramp() => {
                Event::new(time, value, interrupted.curve, time - anchor.time)
            }
            _ => Event::step(time, value),
        };
        self.events.push(event);

        tracing::debug!(
            time,
            value,
            curve = %event.curve,
            dropped,
            "truncated automation mid-segment"
        );
        Ok(())
    }

    /// Stops a decay that would otherwise keep moving past `time`.
    fn freeze_at(&mut self, time: f64) {
        // A decay starting exactly at the cut has not moved yet.
        while self.events.len() > 1 {
            let last = self.last_event();
            if last.curve == CurveKind::Target && last.time == time {
                self.events.pop();
            } else {
                break;
            }
        }

        if self.last_event().curve == CurveKind::Target {
            let value = self.value_at(time);
            self.events.push(Event::step(time, value));
        }
    }

    fn insert(&mut self, event: Event) -> usize {
        let index = self
            .events
            .partition_point(|existing| existing.time < event.time);

        let mut slot = index;
        while slot < self.events.len() && self.events[slot].time == event.time {
            if self.events[slot].curve == event.curve {
                self.events[slot] = event;
                return slot;
            }
            slot += 1;
        }

        self.events.insert(slot, event);
        slot
    }
}

pub(crate) fn value_in(events: &[Event], time: f64) -> f64 {
    let index = events.partition_point(|event| event.time <= time);
    let Some(anchor_index) = index.checked_sub(1) else {
        return events[0].value;
    };
    let anchor = &events[anchor_index];
    let ramp = events
        .get(index)
        .filter(|next| anchor.time < time && next.curve.is_ramp());

    let Some(next) = ramp else {
        if anchor.curve == CurveKind::Target {
            let start = decay_start(events, anchor_index);
            return curve::decay(start, anchor.value, anchor.time, anchor.duration, time);
        }
        return anchor.value;
    };

    // A ramp following a decay replaces it, starting where the decay would.
    let from = if anchor.curve == CurveKind::Target {
        decay_start(events, anchor_index)
    } else {
        anchor.value
    };

    match next.curve {
        CurveKind::Exponential => {
            curve::exponential(from, next.value, anchor.time, next.time, time)
        }
        _ => curve::linear(from, next.value, anchor.time, next.time, time),
    }
}

/// Value the decay at `events[index]` starts from: what the timeline held
/// just before it, with any decays chained in front of it played forward.
fn decay_start(events: &[Event], index: usize) -> f64 {
    let base = events[..index]
        .iter()
        .rposition(|event| event.curve != CurveKind::Target)
        .unwrap_or(0);

    let mut value = events[base].value;
    for position in base + 1..index {
        let target = &events[position];
        let until = events[position + 1].time;
        value = curve::decay(value, target.value, target.time, target.duration, until);
    }
    value
}
