use std::collections::BTreeMap;

use crate::{
    observe::SubscriptionId, AutomatedParam, AutomationConfig, AutomationError, ChangeRecord,
    CurveKind, Observers, ParamBacking, ParamOptions, PlaybackClock, Result,
};

/// Owner of a set of automatable properties.
///
/// Each declared property gets its own [`AutomatedParam`]; only declared
/// properties can be automated. Observers subscribed here receive change
/// records from every property.
#[derive(Debug, Default)]
pub struct AudioObject {
    config: AutomationConfig,
    params: BTreeMap<String, AutomatedParam>,
    observers: Observers,
}

impl AudioObject {
    pub fn new(config: AutomationConfig) -> Self {
        Self {
            config,
            params: BTreeMap::new(),
            observers: Observers::new(),
        }
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Declares `name` as automatable. Redeclaring a property replaces it,
    /// including its timeline.
    pub fn define_property(
        &mut self,
        name: impl Into<String>,
        backing: ParamBacking,
        options: ParamOptions,
    ) -> Result<()> {
        let name = name.into();
        let param = AutomatedParam::new(name.clone(), backing, options, &self.config)?;
        if self.params.insert(name.clone(), param).is_some() {
            tracing::debug!(%name, "redefined automatable property");
        }
        Ok(())
    }

    pub fn define_properties<I, S>(&mut self, properties: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, ParamBacking, ParamOptions)>,
        S: Into<String>,
    {
        for (name, backing, options) in properties {
            self.define_property(name, backing, options)?;
        }
        Ok(())
    }

    pub fn is_automatable(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&AutomatedParam> {
        self.params.get(name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut AutomatedParam> {
        self.params.get_mut(name)
    }

    /// Mirrored value of a declared property.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.params.get(name).map(AutomatedParam::value)
    }

    /// Automates a declared property; see [`AutomatedParam::automate`].
    pub fn automate(
        &mut self,
        name: &str,
        value: f64,
        time: f64,
        curve: Option<CurveKind>,
        duration: Option<f64>,
    ) -> Result<()> {
        self.lookup(name)?.automate(value, time, duration, curve)
    }

    /// Like [`AudioObject::automate`] with the curve given by name.
    pub fn automate_named_curve(
        &mut self,
        name: &str,
        value: f64,
        time: f64,
        curve: &str,
        duration: Option<f64>,
    ) -> Result<()> {
        let param = self.lookup(name)?;
        let curve = curve.parse::<CurveKind>()?;
        param.automate(value, time, duration, Some(curve))
    }

    /// Sets a property the way an assignment would: the new value is
    /// observable right away and the property ramps towards it.
    pub fn set(&mut self, name: &str, value: f64, now: f64) -> Result<()> {
        let record = self.lookup(name)?.set(value, now)?;
        self.observers.emit(&record);
        Ok(())
    }

    /// Runs one polling frame over every property, forwarding changes to
    /// observers. Returns true while any property is still moving.
    pub fn frame(&mut self, now: f64) -> bool {
        let mut active = false;
        for param in self.params.values_mut() {
            let outcome = param.frame(now);
            if let Some(record) = outcome.change {
                self.observers.emit(&record);
            }
            active |= outcome.active;
        }
        active
    }

    /// Polls on `clock` until every property settles or `max_frames` have
    /// run, advancing the clock by `frame_interval` between frames. Returns
    /// the number of frames run.
    pub fn run_until_settled(
        &mut self,
        clock: &mut PlaybackClock,
        frame_interval: f64,
        max_frames: usize,
    ) -> usize {
        let mut frames = 0;
        while frames < max_frames {
            frames += 1;
            if !self.frame(clock.now()) {
                break;
            }
            clock.advance(frame_interval);
        }

        tracing::trace!(frames, now = clock.now(), "polling stopped");
        frames
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ChangeRecord) + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn lookup(&mut self, name: &str) -> Result<&mut AutomatedParam> {
        self.params
            .get_mut(name)
            .ok_or_else(|| AutomationError::NotAutomatable(name.to_string()))
    }
}
