use std::time::Duration;

use tokio::time::Instant;

use super::types::{WeatherDescription, WeatherType};
use crate::math::{lerp, saturate, smooth_step};

/// Shortest transition accepted; shorter requests are stretched to this.
pub const MIN_TRANSITION: Duration = Duration::from_secs(1);

/// One end of a transition: the weather and the rain intensity drawn for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherEndpoint {
    pub description: WeatherDescription,
    pub rain_intensity: f64,
}

/// Continuous quantities that can be read mid-transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherField {
    Temperature,
    WindSpeed,
    WindDirection,
    Humidity,
    Pressure,
    RainIntensity,
    RoadCoefficient,
}

impl WeatherEndpoint {
    fn field(&self, field: WeatherField) -> f64 {
        let d = &self.description;
        match field {
            WeatherField::Temperature => d.temperature,
            WeatherField::WindSpeed => d.wind_speed,
            WeatherField::WindDirection => d.wind_direction,
            WeatherField::Humidity => d.humidity,
            WeatherField::Pressure => d.pressure,
            WeatherField::RainIntensity => self.rain_intensity,
            WeatherField::RoadCoefficient => d.weather_type.road_temperature_coefficient(),
        }
    }
}

/// A consistent read of the transition at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionSample {
    pub current_type: WeatherType,
    pub next_type: WeatherType,
    /// Shaped progress, 0–1.
    pub progress: f64,
    pub temperature: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub rain_intensity: f64,
    pub road_coefficient: f64,
}

/// Current and next weather plus the clock blending between them.
///
/// `current` and `next` are either both set or both unset.
#[derive(Debug, Clone)]
pub struct TransitionState {
    current: Option<WeatherEndpoint>,
    next: Option<WeatherEndpoint>,
    /// `None` while settled (before any weather, or after the very first one).
    started_at: Option<Instant>,
    duration: Duration,
}

impl Default for TransitionState {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionState {
    pub fn new() -> Self {
        TransitionState {
            current: None,
            next: None,
            started_at: None,
            duration: MIN_TRANSITION,
        }
    }

    pub fn current(&self) -> Option<&WeatherEndpoint> {
        self.current.as_ref()
    }

    pub fn next(&self) -> Option<&WeatherEndpoint> {
        self.next.as_ref()
    }

    pub fn has_weather(&self) -> bool {
        self.current.is_some() && self.next.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start blending towards `description`.
    ///
    /// The previous target becomes the new start point so values never jump.
    /// The very first weather is applied as-is, with no transition.
    pub fn apply_weather(
        &mut self,
        description: WeatherDescription,
        rain_intensity: f64,
        duration: Duration,
        now: Instant,
    ) {
        let endpoint = WeatherEndpoint {
            description,
            rain_intensity,
        };
        self.duration = duration.max(MIN_TRANSITION);
        match self.next.take() {
            Some(previous) => {
                self.current = Some(previous);
                self.started_at = Some(now);
            }
            None => {
                self.current = Some(endpoint);
                self.started_at = None;
            }
        }
        self.next = Some(endpoint);
    }

    /// Smooth-stepped progress of the running transition, 0–1.
    pub fn transition_progress(&self, now: Instant) -> f64 {
        match self.started_at {
            Some(started_at) => {
                let elapsed = now.saturating_duration_since(started_at);
                smooth_step(saturate(elapsed.as_secs_f64() / self.duration.as_secs_f64()))
            }
            None => 1.0,
        }
    }

    /// Interpolated value of `field`, `None` before any weather was applied.
    pub fn interpolate(&self, field: WeatherField, now: Instant) -> Option<f64> {
        let (current, next) = (self.current.as_ref()?, self.next.as_ref()?);
        let t = self.transition_progress(now);
        Some(lerp(t, current.field(field), next.field(field)))
    }

    pub fn sample(&self, now: Instant) -> Option<TransitionSample> {
        let (current, next) = (self.current.as_ref()?, self.next.as_ref()?);
        let t = self.transition_progress(now);
        let blend = |field| lerp(t, current.field(field), next.field(field));
        Some(TransitionSample {
            current_type: current.description.weather_type,
            next_type: next.description.weather_type,
            progress: t,
            temperature: blend(WeatherField::Temperature),
            wind_speed: blend(WeatherField::WindSpeed),
            wind_direction: blend(WeatherField::WindDirection),
            humidity: blend(WeatherField::Humidity),
            pressure: blend(WeatherField::Pressure),
            rain_intensity: blend(WeatherField::RainIntensity),
            road_coefficient: blend(WeatherField::RoadCoefficient),
        })
    }
}
