//! Track conditions derived from the weather: surface temperatures, rain and grip.

pub mod clock;
pub mod grip;
pub mod rain;
pub mod snapshot;

pub use clock::SessionClock;
pub use grip::{GripParams, GripState};
pub use rain::{DelayLine, RainParams, RainSnapshot, RainState};
pub use snapshot::WeatherCommandSnapshot;

use crate::weather::{DaylightWindow, TransitionSample, WeatherType};

/// Air temperature assumed before any weather has been applied.
pub const DEFAULT_AMBIENT_TEMPERATURE: f64 = 25.0;

/// Where the reported air temperature comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmbientTemperature {
    /// Interpolated weather temperature plus an offset.
    FromWeather { offset: f64 },
    Fixed(f64),
}

impl Default for AmbientTemperature {
    fn default() -> Self {
        AmbientTemperature::FromWeather { offset: 0.0 }
    }
}

impl AmbientTemperature {
    pub fn resolve(&self, interpolated: f64) -> f64 {
        match *self {
            AmbientTemperature::FromWeather { offset } => interpolated + offset,
            AmbientTemperature::Fixed(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperatures {
    pub ambient: f64,
    pub road: f64,
}

/// Fixed parameters of the conditions model.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConditionsParams {
    pub ambient: AmbientTemperature,
    pub daylight: DaylightWindow,
    pub rain: RainParams,
    pub grip: GripParams,
}

impl ConditionsParams {
    /// Air and road temperature at `seconds_of_day`.
    ///
    /// Without weather the air sits at the default and the sky counts as clear.
    pub fn temperatures(&self, sample: Option<&TransitionSample>, seconds_of_day: f64) -> Temperatures {
        let (ambient, coefficient) = match sample {
            Some(s) => (self.ambient.resolve(s.temperature), s.road_coefficient),
            None => (
                DEFAULT_AMBIENT_TEMPERATURE,
                WeatherType::Clear.road_temperature_coefficient(),
            ),
        };
        Temperatures {
            ambient,
            road: self.daylight.road_temperature(seconds_of_day, ambient, coefficient),
        }
    }
}
