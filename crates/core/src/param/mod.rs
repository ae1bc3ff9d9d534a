//! A single automatable property: its sink, its lazily created timeline and
//! the mirrored value observers see.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::check_time,
    sink::{Getter, Setter, SetterSink, Sink},
    AutomationConfig, AutomationError, ChangeRecord, CurveKind, Event, Result, Timeline,
};

/// How a property reaches the outside world. At least one of `native` or
/// `setter` must be present.
#[derive(Default)]
pub struct ParamBacking {
    pub native: Option<Box<dyn Sink>>,
    pub setter: Option<Setter>,
    pub getter: Option<Getter>,
}

impl ParamBacking {
    pub fn native(sink: impl Sink + 'static) -> Self {
        Self {
            native: Some(Box::new(sink)),
            ..Self::default()
        }
    }

    pub fn setter(setter: impl FnMut(&Event) + 'static) -> Self {
        Self {
            setter: Some(Box::new(setter)),
            ..Self::default()
        }
    }

    pub fn with_getter(mut self, getter: impl Fn() -> f64 + 'static) -> Self {
        self.getter = Some(Box::new(getter));
        self
    }

    fn into_sink(self, name: &str) -> Result<Box<dyn Sink>> {
        match (self.native, self.setter) {
            (Some(native), _) => Ok(native),
            (None, Some(setter)) => {
                let initial = self.getter.as_ref().map_or(0.0, |getter| getter());
                Ok(Box::new(SetterSink::new(setter, self.getter, initial)))
            }
            (None, None) => Err(AutomationError::InvalidParameter(name.to_string())),
        }
    }
}

impl fmt::Debug for ParamBacking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamBacking")
            .field("native", &self.native.is_some())
            .field("setter", &self.setter.is_some())
            .field("getter", &self.getter.is_some())
            .finish()
    }
}

/// Per-property overrides of the configured automation defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamOptions {
    pub duration: Option<f64>,
    pub curve: Option<CurveKind>,
}

/// Result of one polling frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub change: Option<ChangeRecord>,
    /// False once the value has settled and polling can stop.
    pub active: bool,
}

pub struct AutomatedParam {
    name: String,
    sink: Box<dyn Sink>,
    timeline: Option<Timeline>,
    value: f64,
    options: ParamOptions,
    defaults: AutomationConfig,
    polling: bool,
}

impl AutomatedParam {
    pub fn new(
        name: impl Into<String>,
        backing: ParamBacking,
        options: ParamOptions,
        defaults: &AutomationConfig,
    ) -> Result<Self> {
        let name = name.into();
        let sink = backing.into_sink(&name)?;
        let value = sink.current_value();

        Ok(Self {
            name,
            sink,
            timeline: None,
            value,
            options,
            defaults: *defaults,
            polling: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mirrored value: the last value set, or the last value written by the
    /// polling loop.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn options(&self) -> ParamOptions {
        self.options
    }

    /// `None` until the property is first automated.
    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    pub fn sink(&self) -> &dyn Sink {
        self.sink.as_ref()
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Interpolated value at `time`; the sink's value before any automation.
    pub fn value_at(&self, time: f64) -> f64 {
        self.timeline
            .as_ref()
            .map_or_else(|| self.sink.current_value(), |timeline| timeline.value_at(time))
    }

    /// Schedules an event on the timeline and mirrors it to the sink. Any
    /// change to the timeline restarts polling.
    pub fn schedule(
        &mut self,
        time: f64,
        value: f64,
        curve: CurveKind,
        duration: f64,
    ) -> Result<Event> {
        let event = self.timeline_mut().schedule(time, value, curve, duration)?;
        self.sync_sink(event.time.min(time));
        self.polling = true;
        Ok(event)
    }

    /// Cuts the timeline at `time` and mirrors the cut to the sink.
    pub fn truncate_at(&mut self, time: f64) -> Result<()> {
        self.timeline_mut().truncate_at(time)?;
        self.sync_sink(time);
        self.polling = true;
        Ok(())
    }

    /// Moves the property towards `value`, starting at `now`.
    ///
    /// Missing durations and curves fall back to the property's options, then
    /// to the configured defaults; a zero duration always steps. Ramps start
    /// from the value held at `now` and end at `now + duration`, while a
    /// target curve starts decaying at `now` with `duration` as its time
    /// constant. Anything scheduled at or after `now` is discarded first.
    pub fn automate(
        &mut self,
        value: f64,
        now: f64,
        duration: Option<f64>,
        curve: Option<CurveKind>,
    ) -> Result<()> {
        check_time(now)?;
        let duration = check_time(
            duration
                .or(self.options.duration)
                .unwrap_or(self.defaults.default_duration),
        )?;
        let curve = if duration == 0.0 {
            CurveKind::Step
        } else {
            curve
                .or(self.options.curve)
                .unwrap_or(self.defaults.default_curve)
        };

        tracing::debug!(
            name = %self.name,
            value,
            now,
            duration,
            %curve,
            "automating property"
        );

        self.truncate_at(now)?;
        match curve {
            CurveKind::Step => {
                self.schedule(now, value, CurveKind::Step, 0.0)?;
            }
            CurveKind::Linear | CurveKind::Exponential => {
                let current = self.value_at(now);
                self.schedule(now, current, CurveKind::Step, 0.0)?;
                self.schedule(now + duration, value, curve, duration)?;
            }
            CurveKind::Target => {
                self.schedule(now, value, CurveKind::Target, duration)?;
            }
        }
        Ok(())
    }

    /// Public setter: the value reads back immediately and the property is
    /// automated towards it.
    pub fn set(&mut self, value: f64, now: f64) -> Result<ChangeRecord> {
        self.automate(value, now, None, None)?;
        Ok(self.write_value(value))
    }

    /// One polling step: mirrors `value_at(now)` without scheduling anything
    /// and reports whether the property is still moving.
    pub fn frame(&mut self, now: f64) -> FrameOutcome {
        if !self.polling {
            return FrameOutcome {
                change: None,
                active: false,
            };
        }

        let current = self.value_at(now);
        let change = (current != self.value).then(|| self.write_value(current));

        let settled = self
            .timeline
            .as_ref()
            .map_or(true, |timeline| timeline.is_settled_at(now));
        if settled {
            self.polling = false;
            tracing::trace!(name = %self.name, now, value = current, "property settled");
        }

        FrameOutcome {
            change,
            active: self.polling,
        }
    }

    /// Internal write path for the mirrored value. Never schedules.
    fn write_value(&mut self, value: f64) -> ChangeRecord {
        let old_value = std::mem::replace(&mut self.value, value);
        ChangeRecord {
            property_name: self.name.clone(),
            old_value,
            new_value: value,
        }
    }

    fn timeline_mut(&mut self) -> &mut Timeline {
        let sink = &self.sink;
        self.timeline
            .get_or_insert_with(|| Timeline::new(sink.current_value()))
    }

    /// Cancels the sink from `from` and replays the modeled events there, so
    /// the two never disagree about anything at or after `from`.
    fn sync_sink(&mut self, from: f64) {
        let Some(timeline) = self.timeline.as_ref() else {
            return;
        };

        self.sink.cancel_from(from);
        for event in timeline.events_from(from) {
            self.sink.apply_event(event);
        }
    }
}

impl fmt::Debug for AutomatedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomatedParam")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("timeline", &self.timeline)
            .field("options", &self.options)
            .field("polling", &self.polling)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::sink::{NullSink, RecordingSink, SinkCall};

    struct Shared(Rc<RefCell<RecordingSink>>);

    impl Sink for Shared {
        fn apply_event(&mut self, event: &Event) {
            self.0.borrow_mut().apply_event(event);
        }

        fn cancel_from(&mut self, time: f64) {
            self.0.borrow_mut().cancel_from(time);
        }

        fn current_value(&self) -> f64 {
            self.0.borrow().current_value()
        }
    }

    fn shared(recorder: &Rc<RefCell<RecordingSink>>) -> AutomatedParam {
        AutomatedParam::new(
            "gain",
            ParamBacking::native(Shared(Rc::clone(recorder))),
            ParamOptions::default(),
            &AutomationConfig::default(),
        )
        .unwrap()
    }

    fn native(initial: f64) -> AutomatedParam {
        AutomatedParam::new(
            "gain",
            ParamBacking::native(RecordingSink::new(initial)),
            ParamOptions::default(),
            &AutomationConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn requires_native_or_setter() {
        let err = AutomatedParam::new(
            "gain",
            ParamBacking::default(),
            ParamOptions::default(),
            &AutomationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AutomationError::InvalidParameter(ref name) if name == "gain"));
    }

    #[test]
    fn timeline_is_created_lazily_from_sink_value() {
        let mut param = native(0.5);
        assert!(param.timeline().is_none());
        assert_eq!(param.value_at(3.0), 0.5);
        assert_eq!(param.sink().current_value(), 0.5);

        param.schedule(1.0, 1.0, CurveKind::Linear, 1.0).unwrap();
        let timeline = param.timeline().unwrap();
        assert_eq!(timeline.events()[0], Event::step(0.0, 0.5));
        assert_eq!(param.value_at(0.5), 0.75);
    }

    #[test]
    fn schedule_cancels_and_replays_the_sink() {
        let recorder = Rc::new(RefCell::new(RecordingSink::new(0.0)));
        let mut param = shared(&recorder);

        param.schedule(2.0, 4.0, CurveKind::Linear, 2.0).unwrap();
        param.schedule(1.0, 1.0, CurveKind::Step, 0.0).unwrap();

        let ramp = SinkCall::Apply {
            value: 4.0,
            time: 2.0,
            duration: 2.0,
            curve: CurveKind::Linear,
        };
        let step = SinkCall::Apply {
            value: 1.0,
            time: 1.0,
            duration: 0.0,
            curve: CurveKind::Step,
        };
        assert_eq!(
            recorder.borrow().calls(),
            &[
                SinkCall::Cancel { time: 2.0 },
                ramp,
                SinkCall::Cancel { time: 1.0 },
                step,
                ramp,
            ]
        );
    }

    #[test]
    fn sink_renders_what_the_timeline_models() {
        let recorder = Rc::new(RefCell::new(RecordingSink::new(0.0)));
        let mut param = shared(&recorder);

        param.schedule(2.0, 10.0, CurveKind::Linear, 2.0).unwrap();
        param.schedule(3.0, 1.0, CurveKind::Target, 0.5).unwrap();
        param
            .automate(4.0, 1.0, Some(0.5), Some(CurveKind::Exponential))
            .unwrap();
        param.truncate_at(1.25).unwrap();

        let recorder = recorder.borrow();
        for step in 0..40 {
            let time = f64::from(step) * 0.1;
            assert_eq!(
                recorder.rendered_value_at(time),
                param.value_at(time),
                "t = {time}"
            );
        }
    }

    #[test]
    fn automate_ramps_from_current_value() {
        let mut param = native(0.0);
        param
            .automate(1.0, 2.0, Some(1.0), Some(CurveKind::Linear))
            .unwrap();

        assert_eq!(param.value_at(1.0), 0.0);
        assert_eq!(param.value_at(2.0), 0.0);
        assert_eq!(param.value_at(2.5), 0.5);
        assert_eq!(param.value_at(3.0), 1.0);
        assert!(param.is_polling());
    }

    #[test]
    fn automate_defaults_to_short_linear_ramp() {
        let mut param = native(0.0);
        param.automate(1.0, 1.0, None, None).unwrap();

        let last = *param.timeline().unwrap().last_event();
        assert_eq!(last.curve, CurveKind::Linear);
        assert!((last.time - 1.008).abs() < 1e-12);
        assert_eq!(last.duration, 0.008);
    }

    #[test]
    fn property_options_override_defaults() {
        let mut param = AutomatedParam::new(
            "cutoff",
            ParamBacking::native(NullSink::new(100.0)),
            ParamOptions {
                duration: Some(0.5),
                curve: Some(CurveKind::Exponential),
            },
            &AutomationConfig::default(),
        )
        .unwrap();
        param.automate(400.0, 0.0, None, None).unwrap();

        let last = *param.timeline().unwrap().last_event();
        assert_eq!(last.curve, CurveKind::Exponential);
        assert_eq!(last.time, 0.5);
        assert!((param.value_at(0.25) - 200.0).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_steps() {
        let mut param = native(0.0);
        param
            .automate(3.0, 1.0, Some(0.0), Some(CurveKind::Linear))
            .unwrap();

        assert_eq!(param.timeline().unwrap().last_event(), &Event::step(1.0, 3.0));
        assert_eq!(param.value_at(1.0), 3.0);
    }

    #[test]
    fn automate_mid_ramp_continues_from_interpolated_value() {
        let mut param = native(0.0);
        param
            .automate(10.0, 0.0, Some(2.0), Some(CurveKind::Linear))
            .unwrap();
        param
            .automate(0.0, 1.0, Some(1.0), Some(CurveKind::Linear))
            .unwrap();

        assert_eq!(param.value_at(1.0), 5.0);
        assert_eq!(param.value_at(1.5), 2.5);
        assert_eq!(param.value_at(5.0), 0.0);
    }

    #[test]
    fn target_decays_from_now() {
        let mut param = native(1.0);
        param
            .automate(0.0, 2.0, Some(0.5), Some(CurveKind::Target))
            .unwrap();

        assert_eq!(param.value_at(2.0), 1.0);
        assert!((param.value_at(2.5) - (-1.0_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn rejects_negative_durations() {
        let mut param = native(0.0);
        let err = param.automate(1.0, 0.0, Some(-1.0), None).unwrap_err();
        assert!(matches!(err, AutomationError::InvalidTime(_)));
        assert!(param.timeline().is_none());
    }

    #[test]
    fn set_reads_back_immediately() {
        let mut param = native(0.0);
        let record = param.set(0.8, 0.0).unwrap();

        assert_eq!(record.old_value, 0.0);
        assert_eq!(record.new_value, 0.8);
        assert_eq!(param.value(), 0.8);
    }

    #[test]
    fn frames_mirror_the_timeline_until_settled() {
        let mut param = native(0.0);
        param
            .automate(1.0, 0.0, Some(1.0), Some(CurveKind::Linear))
            .unwrap();

        let first = param.frame(0.5);
        assert!(first.active);
        assert_eq!(first.change.unwrap().new_value, 0.5);
        assert_eq!(param.value(), 0.5);

        let again = param.frame(0.5);
        assert!(again.active);
        assert!(again.change.is_none());

        let last = param.frame(1.0);
        assert!(!last.active);
        assert_eq!(last.change.unwrap().new_value, 1.0);
        assert!(!param.is_polling());

        assert_eq!(param.frame(2.0), FrameOutcome {
            change: None,
            active: false,
        });
    }

    #[test]
    fn direct_scheduling_is_mirrored_by_frames() {
        let mut param = native(0.0);
        param.schedule(1.0, 1.0, CurveKind::Linear, 1.0).unwrap();
        assert!(param.is_polling());

        let outcome = param.frame(0.5);
        assert!(outcome.active);
        assert_eq!(param.value(), 0.5);
        assert!(!param.frame(1.0).active);
        assert_eq!(param.value(), 1.0);

        param.truncate_at(2.0).unwrap();
        assert!(param.is_polling());
        assert!(!param.frame(2.0).active);
    }

    #[test]
    fn polling_never_reschedules() {
        let mut param = native(0.0);
        param
            .automate(1.0, 0.0, Some(1.0), Some(CurveKind::Linear))
            .unwrap();
        let before = param.timeline().unwrap().clone();

        param.frame(0.25);
        param.frame(0.75);

        assert_eq!(param.timeline().unwrap(), &before);
    }

    #[test]
    fn setter_backed_property_receives_events() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&received);
        let mut param = AutomatedParam::new(
            "frequency",
            ParamBacking::setter(move |event: &Event| log.borrow_mut().push(*event))
                .with_getter(|| 440.0),
            ParamOptions::default(),
            &AutomationConfig::default(),
        )
        .unwrap();

        assert_eq!(param.value(), 440.0);
        param
            .automate(880.0, 0.0, Some(1.0), Some(CurveKind::Exponential))
            .unwrap();

        let received = received.borrow();
        assert_eq!(received.last().unwrap().value, 880.0);
        assert_eq!(received.last().unwrap().curve, CurveKind::Exponential);
    }
}
