use serde::{Deserialize, Serialize};

// === Enums ===

/// Discrete weather type. Discriminants are the values used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WeatherType {
    LightThunderstorm = 0,
    Thunderstorm = 1,
    HeavyThunderstorm = 2,
    LightDrizzle = 3,
    Drizzle = 4,
    HeavyDrizzle = 5,
    LightRain = 6,
    Rain = 7,
    HeavyRain = 8,
    LightSnow = 9,
    Snow = 10,
    HeavySnow = 11,
    LightSleet = 12,
    Sleet = 13,
    HeavySleet = 14,
    Clear = 15,
    FewClouds = 16,
    ScatteredClouds = 17,
    BrokenClouds = 18,
    OvercastClouds = 19,
    Fog = 20,
    Mist = 21,
    Smoke = 22,
    Haze = 23,
    Sand = 24,
    Dust = 25,
    Squalls = 26,
    Tornado = 27,
    Hurricane = 28,
    Cold = 29,
    Hot = 30,
    Windy = 31,
    Hail = 32,
}

impl WeatherType {
    pub const ALL: [WeatherType; 33] = [
        WeatherType::LightThunderstorm,
        WeatherType::Thunderstorm,
        WeatherType::HeavyThunderstorm,
        WeatherType::LightDrizzle,
        WeatherType::Drizzle,
        WeatherType::HeavyDrizzle,
        WeatherType::LightRain,
        WeatherType::Rain,
        WeatherType::HeavyRain,
        WeatherType::LightSnow,
        WeatherType::Snow,
        WeatherType::HeavySnow,
        WeatherType::LightSleet,
        WeatherType::Sleet,
        WeatherType::HeavySleet,
        WeatherType::Clear,
        WeatherType::FewClouds,
        WeatherType::ScatteredClouds,
        WeatherType::BrokenClouds,
        WeatherType::OvercastClouds,
        WeatherType::Fog,
        WeatherType::Mist,
        WeatherType::Smoke,
        WeatherType::Haze,
        WeatherType::Sand,
        WeatherType::Dust,
        WeatherType::Squalls,
        WeatherType::Tornado,
        WeatherType::Hurricane,
        WeatherType::Cold,
        WeatherType::Hot,
        WeatherType::Windy,
        WeatherType::Hail,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Base rain intensity for this type, before jitter.
    pub fn rain_intensity(self) -> f64 {
        match self {
            WeatherType::LightThunderstorm => 0.5,
            WeatherType::Thunderstorm => 0.6,
            WeatherType::HeavyThunderstorm => 0.7,
            WeatherType::LightDrizzle => 0.1,
            WeatherType::Drizzle => 0.2,
            WeatherType::HeavyDrizzle => 0.3,
            WeatherType::LightRain => 0.3,
            WeatherType::Rain => 0.4,
            WeatherType::HeavyRain => 0.5,
            WeatherType::LightSnow => 0.2,
            WeatherType::Snow => 0.3,
            WeatherType::HeavySnow => 0.4,
            WeatherType::LightSleet => 0.3,
            WeatherType::Sleet => 0.4,
            WeatherType::HeavySleet => 0.5,
            WeatherType::Squalls => 0.6,
            WeatherType::Tornado => 0.5,
            WeatherType::Hurricane => 0.6,
            _ => 0.0,
        }
    }

    /// How strongly the sun heats the road under this sky, roughly -1 to 1.
    pub fn road_temperature_coefficient(self) -> f64 {
        match self {
            WeatherType::LightThunderstorm => 0.7,
            WeatherType::Thunderstorm => 0.2,
            WeatherType::HeavyThunderstorm => -0.2,
            WeatherType::LightDrizzle => 0.1,
            WeatherType::Drizzle => -0.1,
            WeatherType::HeavyDrizzle => -0.3,
            WeatherType::LightRain => 0.01,
            WeatherType::Rain => -0.2,
            WeatherType::HeavyRain => -0.5,
            WeatherType::LightSnow => -0.7,
            WeatherType::Snow => -0.8,
            WeatherType::HeavySnow => -0.9,
            WeatherType::LightSleet | WeatherType::Sleet | WeatherType::HeavySleet => -1.0,
            WeatherType::Squalls => -0.5,
            WeatherType::Tornado => -0.3,
            WeatherType::Hurricane => -0.6,
            WeatherType::Clear | WeatherType::FewClouds => 1.0,
            WeatherType::ScatteredClouds => 0.8,
            WeatherType::BrokenClouds => 0.1,
            WeatherType::OvercastClouds => 0.01,
            WeatherType::Fog => -0.3,
            WeatherType::Mist | WeatherType::Smoke => -0.2,
            WeatherType::Haze => 0.9,
            WeatherType::Sand | WeatherType::Dust | WeatherType::Hot => 1.0,
            WeatherType::Cold => -0.8,
            WeatherType::Windy => 0.3,
            WeatherType::Hail => -1.0,
        }
    }

    /// Typical conditions for synthetic weather of this type.
    pub fn baseline(self) -> Baseline {
        let (temperature, wind_speed, humidity) = match self {
            WeatherType::Clear => (26.0, 1.0, 0.6),
            WeatherType::FewClouds => (25.0, 2.0, 0.6),
            WeatherType::ScatteredClouds => (25.0, 3.0, 0.6),
            WeatherType::BrokenClouds => (25.0, 4.0, 0.6),
            WeatherType::OvercastClouds => (24.0, 5.0, 0.6),
            WeatherType::Fog => (24.0, 0.0, 0.9),
            WeatherType::Mist => (24.0, 0.0, 0.8),
            WeatherType::Windy => (24.0, 10.0, 0.4),
            WeatherType::LightDrizzle => (25.0, 2.0, 0.7),
            WeatherType::Drizzle => (24.0, 3.0, 0.7),
            WeatherType::HeavyDrizzle => (23.0, 4.0, 0.7),
            WeatherType::LightRain => (24.0, 4.0, 0.8),
            WeatherType::Rain => (23.0, 6.0, 0.8),
            WeatherType::HeavyRain => (23.0, 10.0, 0.8),
            WeatherType::LightThunderstorm => (23.0, 12.0, 0.9),
            WeatherType::Thunderstorm => (22.0, 13.0, 0.9),
            WeatherType::HeavyThunderstorm => (22.0, 14.0, 0.9),
            _ => (24.0, 1.0, 0.6),
        };
        Baseline {
            temperature,
            wind_speed,
            humidity,
        }
    }
}

impl std::fmt::Display for WeatherType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

// === Values ===

/// Baseline temperature (°C), wind speed (m/s) and humidity (0–1) of a type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub temperature: f64,
    pub wind_speed: f64,
    pub humidity: f64,
}

/// One complete weather observation or synthetic sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherDescription {
    pub weather_type: WeatherType,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Metres per second.
    pub wind_speed: f64,
    /// Degrees, 0–360.
    pub wind_direction: f64,
    /// Relative humidity, 0–1.
    pub humidity: f64,
    /// hPa.
    pub pressure: f64,
}

impl WeatherDescription {
    /// Baseline description of a type: no jitter, calm wind from the north, 1030 hPa.
    pub fn baseline(weather_type: WeatherType) -> Self {
        let baseline = weather_type.baseline();
        WeatherDescription {
            weather_type,
            temperature: baseline.temperature,
            wind_speed: baseline.wind_speed,
            wind_direction: 0.0,
            humidity: baseline.humidity,
            pressure: 1030.0,
        }
    }
}
