//! JSON automation scripts: a starting value and a list of commands replayed
//! against one property, used by the command line front end.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    sink::RecordingSink, AutomatedParam, AutomationConfig, AutomationError, CurveKind, Event,
    ParamBacking, ParamOptions, Result,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub initial_value: f64,
    pub commands: Vec<ScriptCommand>,
}

/// Curves are plain strings so that misspelled names surface as
/// [`AutomationError::InvalidCurve`] rather than a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptCommand {
    Schedule {
        time: f64,
        value: f64,
        curve: String,
        #[serde(default)]
        duration: f64,
    },
    Truncate {
        time: f64,
    },
    Automate {
        time: f64,
        value: f64,
        #[serde(default)]
        curve: Option<String>,
        #[serde(default)]
        duration: Option<f64>,
    },
}

/// Upper bound on the rows a single [`sample`] call may produce.
pub const MAX_SAMPLES: usize = 1_000_000;

/// One row of sampled output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

/// Sampled values plus the event list they were computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendering {
    pub samples: Vec<Sample>,
    pub events: Vec<Event>,
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Replays every command against `param`, stopping at the first error.
    pub fn apply(&self, param: &mut AutomatedParam) -> Result<()> {
        for (index, command) in self.commands.iter().enumerate() {
            tracing::trace!(index, ?command, "applying script command");
            match command {
                ScriptCommand::Schedule {
                    time,
                    value,
                    curve,
                    duration,
                } => {
                    let curve = curve.parse::<CurveKind>()?;
                    param.schedule(*time, *value, curve, *duration)?;
                }
                ScriptCommand::Truncate { time } => param.truncate_at(*time)?,
                ScriptCommand::Automate {
                    time,
                    value,
                    curve,
                    duration,
                } => {
                    let curve = curve.as_deref().map(str::parse::<CurveKind>).transpose()?;
                    param.automate(*value, *time, *duration, curve)?;
                }
            }
        }
        Ok(())
    }

    /// Builds a property backed by a [`RecordingSink`] holding the script's
    /// initial value and replays the script on it.
    pub fn build(&self, config: &AutomationConfig) -> Result<AutomatedParam> {
        let mut param = AutomatedParam::new(
            "script",
            ParamBacking::native(RecordingSink::new(self.initial_value)),
            ParamOptions::default(),
            config,
        )?;
        self.apply(&mut param)?;
        Ok(param)
    }

    /// Time of the last scheduled command, a sensible end for sampling.
    pub fn end_time(&self) -> f64 {
        self.commands
            .iter()
            .map(|command| match command {
                ScriptCommand::Schedule { time, .. } | ScriptCommand::Truncate { time } => *time,
                ScriptCommand::Automate { time, duration, .. } => time + duration.unwrap_or(0.0),
            })
            .fold(0.0, f64::max)
    }
}

/// Samples `param` every `step` seconds over `[from, to]`, both ends
/// included when they fall on the grid.
pub fn sample(param: &AutomatedParam, from: f64, to: f64, step: f64) -> Result<Vec<Sample>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(AutomationError::msg(format!(
            "sampling step must be positive, got {step}"
        )));
    }
    if !(from.is_finite() && to.is_finite()) || to < from {
        return Err(AutomationError::msg(format!(
            "invalid sampling range {from}..{to}"
        )));
    }

    let intervals = ((to - from) / step + 1e-9).floor();
    if intervals >= MAX_SAMPLES as f64 {
        return Err(AutomationError::msg(format!(
            "sampling {from}..{to} every {step} exceeds {MAX_SAMPLES} samples"
        )));
    }

    let count = intervals as usize + 1;
    Ok((0..count)
        .map(|index| {
            let time = from + index as f64 * step;
            Sample {
                time,
                value: param.value_at(time),
            }
        })
        .collect())
}

/// Samples `param` and pairs the result with its event list.
pub fn render(param: &AutomatedParam, from: f64, to: f64, step: f64) -> Result<Rendering> {
    Ok(Rendering {
        samples: sample(param, from, to, step)?,
        events: param
            .timeline()
            .map(|timeline| timeline.events().to_vec())
            .unwrap_or_default(),
    })
}
