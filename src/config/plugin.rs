use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

use crate::conditions::{AmbientTemperature, ConditionsParams, GripParams, RainParams, SessionClock};
use crate::weather::{DaylightWindow, RandomWeatherPolicy};

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;
/// One real second is at most a simulated day.
const MAX_TIME_MULTIPLIER: f64 = SECONDS_PER_DAY as f64;

/// Weather source poll period in real-conditions mode; also the transition length.
pub const REAL_CONDITIONS_PERIOD: Duration = Duration::from_secs(10 * 60);
const REAL_CONDITIONS_BROADCAST: Duration = Duration::from_secs(60);
const MIN_BROADCAST: Duration = Duration::from_secs(6);
const MAX_BROADCAST: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub plugin: PluginSection,
    #[serde(default)]
    pub weather: WeatherSection,
}

/// Connection to the host server and process-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginSection {
    #[serde(default = "default_listening_port")]
    pub listening_port: u16,
    #[serde(default = "default_remote_host")]
    pub remote_host: String,
    #[serde(default = "default_remote_port")]
    pub remote_port: u16,
    #[serde(default = "default_realtime_update_interval_ms")]
    pub realtime_update_interval_ms: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSection {
    #[serde(default = "default_true")]
    pub use_v2: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub track_latitude: f64,
    #[serde(default)]
    pub track_longitude: f64,
    #[serde(default = "default_track_length_km")]
    pub track_length_km: f64,
    #[serde(default)]
    pub track_utc_offset_hours: f64,
    #[serde(default)]
    pub use_real_conditions: bool,
    #[serde(default)]
    pub weather_source_path: Option<PathBuf>,
    #[serde(default)]
    pub time_offset_secs: i64,
    #[serde(default)]
    pub use_fixed_starting_time: bool,
    #[serde(default = "default_fixed_starting_time_secs")]
    pub fixed_starting_time_secs: u32,
    #[serde(default)]
    pub fixed_starting_date: Option<NaiveDate>,
    #[serde(default = "default_one")]
    pub time_multiplier: f64,
    #[serde(default)]
    pub temperature_offset: f64,
    #[serde(default)]
    pub use_fixed_air_temperature: bool,
    #[serde(default = "default_fixed_air_temperature")]
    pub fixed_air_temperature: f64,
    #[serde(default = "default_weather_type_change_period_secs")]
    pub weather_type_change_period_secs: u64,
    #[serde(default = "default_true")]
    pub weather_type_change_to_neighbours_only: bool,
    #[serde(default = "default_weather_rain_chance")]
    pub weather_rain_chance: f64,
    #[serde(default = "default_weather_thunder_chance")]
    pub weather_thunder_chance: f64,
    #[serde(default = "default_track_grip_starting_value")]
    pub track_grip_starting_value: f64,
    #[serde(default = "default_track_grip_increase_per_lap")]
    pub track_grip_increase_per_lap: f64,
    #[serde(default = "default_track_grip_transfer")]
    pub track_grip_transfer: f64,
    #[serde(default = "default_one")]
    pub rain_time_multiplier: f64,
    #[serde(default = "default_rain_wetness_increase_secs")]
    pub rain_wetness_increase_secs: u64,
    #[serde(default = "default_rain_wetness_decrease_secs")]
    pub rain_wetness_decrease_secs: u64,
    #[serde(default = "default_rain_water_increase_secs")]
    pub rain_water_increase_secs: u64,
    #[serde(default = "default_rain_water_decrease_secs")]
    pub rain_water_decrease_secs: u64,
    /// Randomizer seed, 0 draws one from the OS.
    #[serde(default)]
    pub seed: u64,
}

fn default_listening_port() -> u16 {
    12001
}
fn default_remote_host() -> String {
    "127.0.0.1".to_string()
}
fn default_remote_port() -> u16 {
    11001
}
fn default_realtime_update_interval_ms() -> u16 {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_one() -> f64 {
    1.0
}
fn default_track_length_km() -> f64 {
    5.0
}
fn default_fixed_starting_time_secs() -> u32 {
    12 * 60 * 60
}
fn default_fixed_air_temperature() -> f64 {
    25.0
}
fn default_weather_type_change_period_secs() -> u64 {
    5 * 60
}
fn default_weather_rain_chance() -> f64 {
    0.05
}
fn default_weather_thunder_chance() -> f64 {
    0.005
}
fn default_track_grip_starting_value() -> f64 {
    99.0
}
fn default_track_grip_increase_per_lap() -> f64 {
    0.05
}
fn default_track_grip_transfer() -> f64 {
    80.0
}
fn default_rain_wetness_increase_secs() -> u64 {
    3 * 60
}
fn default_rain_wetness_decrease_secs() -> u64 {
    15 * 60
}
fn default_rain_water_increase_secs() -> u64 {
    30 * 60
}
fn default_rain_water_decrease_secs() -> u64 {
    120 * 60
}

impl Default for PluginSection {
    fn default() -> Self {
        PluginSection {
            listening_port: default_listening_port(),
            remote_host: default_remote_host(),
            remote_port: default_remote_port(),
            realtime_update_interval_ms: default_realtime_update_interval_ms(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Default for WeatherSection {
    fn default() -> Self {
        WeatherSection {
            use_v2: true,
            api_key: String::new(),
            track_latitude: 0.0,
            track_longitude: 0.0,
            track_length_km: default_track_length_km(),
            track_utc_offset_hours: 0.0,
            use_real_conditions: false,
            weather_source_path: None,
            time_offset_secs: 0,
            use_fixed_starting_time: false,
            fixed_starting_time_secs: default_fixed_starting_time_secs(),
            fixed_starting_date: None,
            time_multiplier: 1.0,
            temperature_offset: 0.0,
            use_fixed_air_temperature: false,
            fixed_air_temperature: default_fixed_air_temperature(),
            weather_type_change_period_secs: default_weather_type_change_period_secs(),
            weather_type_change_to_neighbours_only: true,
            weather_rain_chance: default_weather_rain_chance(),
            weather_thunder_chance: default_weather_thunder_chance(),
            track_grip_starting_value: default_track_grip_starting_value(),
            track_grip_increase_per_lap: default_track_grip_increase_per_lap(),
            track_grip_transfer: default_track_grip_transfer(),
            rain_time_multiplier: 1.0,
            rain_wetness_increase_secs: default_rain_wetness_increase_secs(),
            rain_wetness_decrease_secs: default_rain_wetness_decrease_secs(),
            rain_water_increase_secs: default_rain_water_increase_secs(),
            rain_water_decrease_secs: default_rain_water_decrease_secs(),
            seed: 0,
        }
    }
}

impl PluginConfig {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, source_path: &Path) -> Result<Self, String> {
        let config: PluginConfig =
            toml::from_str(content).map_err(|e| format!("{}: {}", source_path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        let p = &self.plugin;
        let w = &self.weather;

        if p.listening_port < 1024 {
            errors.push(format!(
                "plugin.listening_port must be 1024-65535, got {}. Example: listening_port = 12001",
                p.listening_port
            ));
        }

        if p.remote_port == 0 {
            errors.push("plugin.remote_port must be > 0. Example: remote_port = 11001".to_string());
        }

        if p.remote_host.trim().is_empty() {
            errors.push(
                "plugin.remote_host must not be empty. Example: remote_host = \"127.0.0.1\""
                    .to_string(),
            );
        }

        if p.realtime_update_interval_ms == 0 {
            errors.push(
                "plugin.realtime_update_interval_ms must be > 0. Example: realtime_update_interval_ms = 100"
                    .to_string(),
            );
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&p.log_level.as_str()) {
            errors.push(format!(
                "plugin.log_level must be one of {:?}, got '{}'. Example: log_level = \"info\"",
                valid_levels, p.log_level
            ));
        }

        if !(w.track_length_km > 0.0) {
            errors.push(format!(
                "weather.track_length_km must be > 0, got {}. Example: track_length_km = 5.8",
                w.track_length_km
            ));
        }

        if !(-90.0..=90.0).contains(&w.track_latitude) {
            errors.push(format!(
                "weather.track_latitude must be -90 to 90, got {}. Example: track_latitude = 45.62",
                w.track_latitude
            ));
        }

        if !(-180.0..=180.0).contains(&w.track_longitude) {
            errors.push(format!(
                "weather.track_longitude must be -180 to 180, got {}. Example: track_longitude = 9.28",
                w.track_longitude
            ));
        }

        if !(-14.0..=14.0).contains(&w.track_utc_offset_hours) {
            errors.push(format!(
                "weather.track_utc_offset_hours must be -14 to 14, got {}. Example: track_utc_offset_hours = 2",
                w.track_utc_offset_hours
            ));
        }

        if w.use_real_conditions && w.weather_source_path.is_none() {
            errors.push(
                "weather.weather_source_path is required when use_real_conditions = true. Example: weather_source_path = \"weather.json\""
                    .to_string(),
            );
        }

        if w.fixed_starting_time_secs >= SECONDS_PER_DAY {
            errors.push(format!(
                "weather.fixed_starting_time_secs must be < 86400, got {}. Example: fixed_starting_time_secs = 43200",
                w.fixed_starting_time_secs
            ));
        }

        if !(0.0..=MAX_TIME_MULTIPLIER).contains(&w.time_multiplier) {
            errors.push(format!(
                "weather.time_multiplier must be 0-{}, got {}. Example: time_multiplier = 1.0",
                MAX_TIME_MULTIPLIER, w.time_multiplier
            ));
        }

        if w.weather_type_change_period_secs == 0 {
            errors.push(
                "weather.weather_type_change_period_secs must be > 0. Example: weather_type_change_period_secs = 300"
                    .to_string(),
            );
        }

        for (name, value) in [
            ("weather_rain_chance", w.weather_rain_chance),
            ("weather_thunder_chance", w.weather_thunder_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(format!(
                    "weather.{} must be 0.0-1.0, got {}. Example: {} = 0.05",
                    name, value, name
                ));
            }
        }

        if !(0.0..=100.0).contains(&w.track_grip_transfer) {
            errors.push(format!(
                "weather.track_grip_transfer must be 0-100, got {}. Example: track_grip_transfer = 80",
                w.track_grip_transfer
            ));
        }

        if !(w.rain_time_multiplier >= 0.0 && w.rain_time_multiplier.is_finite()) {
            errors.push(format!(
                "weather.rain_time_multiplier must be a finite value >= 0, got {}. Example: rain_time_multiplier = 1.0",
                w.rain_time_multiplier
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("\n"))
        }
    }
}

impl WeatherSection {
    pub fn change_period(&self) -> Duration {
        Duration::from_secs(self.weather_type_change_period_secs)
    }

    /// How often the full conditions are broadcast to everyone.
    pub fn broadcast_period(&self) -> Duration {
        if self.use_real_conditions {
            REAL_CONDITIONS_BROADCAST
        } else {
            self.change_period()
                .mul_f64(0.2)
                .clamp(MIN_BROADCAST, MAX_BROADCAST)
        }
    }

    pub fn random_policy(&self) -> RandomWeatherPolicy {
        RandomWeatherPolicy {
            neighbours_only: self.weather_type_change_to_neighbours_only,
            rain_chance: self.weather_rain_chance,
            thunder_chance: self.weather_thunder_chance,
        }
    }

    pub fn rain_params(&self) -> RainParams {
        RainParams {
            time_multiplier: self.rain_time_multiplier,
            wetness_increase: Duration::from_secs(self.rain_wetness_increase_secs),
            wetness_decrease: Duration::from_secs(self.rain_wetness_decrease_secs),
            water_increase: Duration::from_secs(self.rain_water_increase_secs),
            water_decrease: Duration::from_secs(self.rain_water_decrease_secs),
        }
    }

    pub fn grip_params(&self) -> GripParams {
        GripParams {
            starting_value: self.track_grip_starting_value,
            increase_per_lap: self.track_grip_increase_per_lap,
            transfer: self.track_grip_transfer,
        }
    }

    pub fn ambient(&self) -> AmbientTemperature {
        if self.use_fixed_air_temperature {
            AmbientTemperature::Fixed(self.fixed_air_temperature)
        } else {
            AmbientTemperature::FromWeather {
                offset: self.temperature_offset,
            }
        }
    }

    pub fn conditions_params(&self) -> ConditionsParams {
        ConditionsParams {
            ambient: self.ambient(),
            daylight: DaylightWindow::default(),
            rain: self.rain_params(),
            grip: self.grip_params(),
        }
    }

    pub fn session_clock(&self, now: Instant) -> SessionClock {
        if self.use_fixed_starting_time {
            SessionClock::fixed(
                self.fixed_starting_date,
                self.fixed_starting_time_secs,
                self.track_utc_offset_hours,
                self.time_multiplier,
                now,
            )
        } else {
            SessionClock::live(
                self.time_offset_secs,
                self.track_utc_offset_hours,
                self.time_multiplier,
                now,
            )
        }
    }
}
