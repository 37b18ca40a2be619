//! External weather observations.

use std::future::Future;
use std::io;
use std::path::PathBuf;

use serde::Deserialize;

use super::types::{WeatherDescription, WeatherType};

/// Errors from fetching or decoding an observation.
#[derive(Debug)]
pub enum FetchError {
    Io(io::Error),
    Parse(String),
    MissingField(&'static str),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Io(e) => write!(f, "I/O error: {}", e),
            FetchError::Parse(e) => write!(f, "Invalid weather document: {}", e),
            FetchError::MissingField(name) => write!(f, "Weather document has no {}", name),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<io::Error> for FetchError {
    fn from(e: io::Error) -> Self {
        FetchError::Io(e)
    }
}

/// Provider of real-world conditions at the track location.
pub trait WeatherSource: Send + Sync {
    fn fetch_current_weather(
        &self,
        api_key: &str,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<WeatherDescription, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct OwmDocument {
    #[serde(default)]
    weather: Vec<OwmCondition>,
    main: Option<OwmMain>,
    wind: Option<OwmWind>,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    #[serde(default = "default_pressure")]
    pressure: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

fn default_pressure() -> f64 {
    1013.25
}

/// Reads an OpenWeather "current weather" response (metric units) from disk.
///
/// The document is re-read on every fetch, so an external job can keep it fresh.
#[derive(Debug, Clone)]
pub struct OpenWeatherFileSource {
    path: PathBuf,
}

impl OpenWeatherFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OpenWeatherFileSource { path: path.into() }
    }
}

impl WeatherSource for OpenWeatherFileSource {
    async fn fetch_current_weather(
        &self,
        _api_key: &str,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<WeatherDescription, FetchError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        parse_openweather(&content)
    }
}

/// Decode an OpenWeather current-weather JSON document.
pub fn parse_openweather(content: &str) -> Result<WeatherDescription, FetchError> {
    let doc: OwmDocument =
        serde_json::from_str(content).map_err(|e| FetchError::Parse(e.to_string()))?;
    let condition = doc.weather.first().ok_or(FetchError::MissingField("weather"))?;
    let weather_type =
        weather_type_from_condition(condition.id).ok_or(FetchError::Parse(format!(
            "unknown condition id {}",
            condition.id
        )))?;
    let main = doc.main.ok_or(FetchError::MissingField("main"))?;
    let wind = doc.wind.unwrap_or_default();

    Ok(WeatherDescription {
        weather_type,
        temperature: main.temp,
        wind_speed: wind.speed,
        wind_direction: wind.deg.rem_euclid(360.0),
        humidity: (main.humidity / 100.0).clamp(0.0, 1.0),
        pressure: main.pressure,
    })
}

/// Map an OpenWeather condition code to a weather type.
pub fn weather_type_from_condition(id: u32) -> Option<WeatherType> {
    use crate::weather::types::WeatherType::*;
    let t = match id {
        200 | 210 | 230 => LightThunderstorm,
        201 | 211 | 231 => Thunderstorm,
        202 | 212 | 221 | 232 => HeavyThunderstorm,
        300 | 310 => LightDrizzle,
        301 | 311 | 313 | 321 => Drizzle,
        302 | 312 | 314 => HeavyDrizzle,
        500 | 520 => LightRain,
        501 | 521 | 531 => Rain,
        502..=504 | 522 => HeavyRain,
        511 => LightSleet,
        600 | 620 => LightSnow,
        601 | 621 => Snow,
        602 | 622 => HeavySnow,
        611 | 615 => LightSleet,
        612 | 616 => Sleet,
        613 => HeavySleet,
        701 => Mist,
        711 => Smoke,
        721 => Haze,
        731 | 751 => Sand,
        741 => Fog,
        761 | 762 => Dust,
        771 => Squalls,
        781 | 900 => Tornado,
        800 => Clear,
        801 => FewClouds,
        802 => ScatteredClouds,
        803 => BrokenClouds,
        804 => OvercastClouds,
        901 | 902 => Hurricane,
        903 => Cold,
        904 => Hot,
        905 => Windy,
        906 => Hail,
        _ => return None,
    };
    Some(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "coord": {"lon": 9.28, "lat": 45.62},
        "weather": [{"id": 501, "main": "Rain", "description": "moderate rain"}],
        "main": {"temp": 18.4, "pressure": 1008, "humidity": 87},
        "wind": {"speed": 4.6, "deg": 370}
    }"#;

    #[test]
    fn parses_current_weather() {
        let d = parse_openweather(SAMPLE).unwrap();
        assert_eq!(d.weather_type, WeatherType::Rain);
        assert_eq!(d.temperature, 18.4);
        assert_eq!(d.pressure, 1008.0);
        assert!((d.humidity - 0.87).abs() < 1e-9);
        assert_eq!(d.wind_speed, 4.6);
        assert!((d.wind_direction - 10.0).abs() < 1e-9);
    }

    #[test]
    fn missing_conditions_rejected() {
        let err = parse_openweather(r#"{"weather": [], "main": {"temp": 10}}"#).unwrap_err();
        assert!(err.to_string().contains("weather"));
    }

    #[test]
    fn unknown_condition_rejected() {
        let err =
            parse_openweather(r#"{"weather": [{"id": 999}], "main": {"temp": 10}}"#).unwrap_err();
        assert!(err.to_string().contains("999"));
    }

    #[test]
    fn malformed_json_rejected() {
        let err = parse_openweather("{ not json").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn condition_codes_cover_the_sky() {
        assert_eq!(weather_type_from_condition(800), Some(WeatherType::Clear));
        assert_eq!(weather_type_from_condition(804), Some(WeatherType::OvercastClouds));
        assert_eq!(weather_type_from_condition(741), Some(WeatherType::Fog));
        assert_eq!(weather_type_from_condition(202), Some(WeatherType::HeavyThunderstorm));
        assert_eq!(weather_type_from_condition(100), None);
    }

    #[tokio::test]
    async fn file_source_reads_document() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "{}", SAMPLE).unwrap();
        let source = OpenWeatherFileSource::new(tmp.path());
        let d = source.fetch_current_weather("key", 45.62, 9.28).await.unwrap();
        assert_eq!(d.weather_type, WeatherType::Rain);
    }

    #[tokio::test]
    async fn file_source_missing_file_is_io_error() {
        let source = OpenWeatherFileSource::new("/nonexistent/weather.json");
        let err = source.fetch_current_weather("key", 0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }
}
