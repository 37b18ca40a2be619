use std::time::Duration;

use crate::math::{lerp, lerp_inv_sat};

/// Number of high-frequency ticks between a water change and its broadcast.
pub const DELAY_SLOTS: usize = 120;

/// Road temperature range (°C) over which evaporation goes from slowest to fastest.
const EVAPORATION_COLD: f64 = 10.0;
const EVAPORATION_HOT: f64 = 35.0;

/// Time constants of the rain model. Each is the time a full 0→1 (or 1→0)
/// change takes at nominal rate, before `time_multiplier`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainParams {
    pub time_multiplier: f64,
    pub wetness_increase: Duration,
    pub wetness_decrease: Duration,
    pub water_increase: Duration,
    pub water_decrease: Duration,
}

impl Default for RainParams {
    fn default() -> Self {
        RainParams {
            time_multiplier: 1.0,
            wetness_increase: Duration::from_secs(3 * 60),
            wetness_decrease: Duration::from_secs(15 * 60),
            water_increase: Duration::from_secs(30 * 60),
            water_decrease: Duration::from_secs(120 * 60),
        }
    }
}

impl RainParams {
    /// Scaled time constant in seconds, never below one second.
    fn seconds(&self, constant: Duration) -> f64 {
        (constant.as_secs_f64() * self.time_multiplier).max(1.0)
    }
}

/// Fixed-size ring of past samples; reads return the oldest one.
#[derive(Debug, Clone)]
pub struct DelayLine {
    slots: Box<[f64]>,
    cursor: usize,
}

impl DelayLine {
    pub fn new(len: usize) -> Self {
        DelayLine {
            slots: vec![0.0; len.max(1)].into_boxed_slice(),
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Overwrite the oldest slot and advance.
    pub fn push(&mut self, value: f64) {
        self.slots[self.cursor] = value;
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// The value pushed `len()` pushes ago.
    pub fn delayed(&self) -> f64 {
        self.slots[self.cursor]
    }
}

/// What drivers are told about the rain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainSnapshot {
    pub intensity: f64,
    pub wetness: f64,
    /// Delayed water depth.
    pub water: f64,
}

/// Rain on the track: surface wetness and standing water.
#[derive(Debug, Clone)]
pub struct RainState {
    intensity: f64,
    wetness: f64,
    water_depth: f64,
    delay: DelayLine,
}

impl Default for RainState {
    fn default() -> Self {
        Self::new()
    }
}

impl RainState {
    pub fn new() -> Self {
        RainState {
            intensity: 0.0,
            wetness: 0.0,
            water_depth: 0.0,
            delay: DelayLine::new(DELAY_SLOTS),
        }
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    pub fn wetness(&self) -> f64 {
        self.wetness
    }

    /// Instantaneous water depth, before the delay line.
    pub fn water_depth(&self) -> f64 {
        self.water_depth
    }

    /// Water depth as seen by drivers: one full delay line behind.
    pub fn delayed_water(&self) -> f64 {
        self.delay.delayed()
    }

    pub fn snapshot(&self) -> RainSnapshot {
        RainSnapshot {
            intensity: self.intensity,
            wetness: self.wetness,
            water: self.delayed_water(),
        }
    }

    /// Advance one step of length `dt` with the given rain intensity and road temperature.
    pub fn tick(&mut self, intensity: f64, road_temperature: f64, dt: Duration, params: &RainParams) {
        let intensity = intensity.clamp(0.0, 1.0);
        let dt = dt.as_secs_f64();
        let wet_rate = lerp(intensity, 0.3, 1.7);
        let dry_rate = lerp(
            lerp_inv_sat(road_temperature, EVAPORATION_COLD, EVAPORATION_HOT),
            0.3,
            1.7,
        );

        self.wetness = if intensity > 0.0 {
            self.wetness + wet_rate * dt / params.seconds(params.wetness_increase)
        } else {
            self.wetness - dry_rate * dt / params.seconds(params.wetness_decrease)
        }
        .clamp(0.0, 1.0);

        self.water_depth = if self.water_depth < intensity {
            (self.water_depth + wet_rate * dt / params.seconds(params.water_increase)).min(intensity)
        } else {
            (self.water_depth - dry_rate * dt / params.seconds(params.water_decrease)).max(intensity)
        }
        .clamp(0.0, 1.0);

        self.intensity = intensity;
        self.delay.push(self.water_depth);
    }
}
