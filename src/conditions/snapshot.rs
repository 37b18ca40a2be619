use std::time::Duration;

use crate::protocol::{CspCommand, WeatherSetV1, WeatherSetV2};
use crate::weather::{TransitionSample, WeatherType};

use super::rain::RainSnapshot;
use super::Temperatures;

/// Everything one weather command carries, gathered at a single instant.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherCommandSnapshot {
    pub timestamp: u64,
    pub current_type: WeatherType,
    pub next_type: WeatherType,
    pub progress: f64,
    pub ambient_temperature: f64,
    pub road_temperature: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub grip: f64,
    pub rain: RainSnapshot,
}

impl WeatherCommandSnapshot {
    pub fn new(
        timestamp: u64,
        sample: &TransitionSample,
        temperatures: Temperatures,
        rain: RainSnapshot,
        grip: f64,
    ) -> Self {
        WeatherCommandSnapshot {
            timestamp,
            current_type: sample.current_type,
            next_type: sample.next_type,
            progress: sample.progress,
            ambient_temperature: temperatures.ambient,
            road_temperature: temperatures.road,
            wind_speed_kmh: sample.wind_speed * 3.6,
            wind_direction: sample.wind_direction,
            humidity: sample.humidity,
            pressure: sample.pressure,
            grip,
            rain,
        }
    }

    /// Encode as the rich command when `use_v2`, else as the float32 one.
    pub fn to_command(&self, use_v2: bool, time_to_apply: Duration) -> CspCommand {
        let time_to_apply = time_to_apply.as_secs_f32();
        if use_v2 {
            CspCommand::WeatherSetV2(WeatherSetV2 {
                timestamp: self.timestamp,
                current: self.current_type,
                next: self.next_type,
                transition: self.progress,
                time_to_apply,
                temperature_ambient: self.ambient_temperature as f32,
                temperature_road: self.road_temperature as f32,
                grip: self.grip,
                humidity: self.humidity,
                wind_direction_deg: self.wind_direction as f32,
                wind_speed_kmh: self.wind_speed_kmh as f32,
                pressure: self.pressure as f32,
                rain_intensity: self.rain.intensity as f32,
                rain_wetness: self.rain.wetness as f32,
                rain_water: self.rain.water as f32,
            })
        } else {
            CspCommand::WeatherSetV1(WeatherSetV1 {
                timestamp: self.timestamp,
                time_to_apply,
                current: self.current_type,
                next: self.next_type,
                transition: self.progress as f32,
            })
        }
    }
}
