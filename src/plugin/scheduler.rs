//! The three update cadences: weather changes, the numeric model and broadcasts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{DriverRoster, LiveConditions, Transport};
use crate::config::WeatherSection;
use crate::config::plugin::REAL_CONDITIONS_PERIOD;
use crate::weather::{
    OpenWeatherFileSource, WeatherDescription, WeatherGraph, WeatherRandomizer, WeatherSource,
    WeatherType,
};

/// Period of the rain and grip model.
pub const NUMERIC_TICK: Duration = Duration::from_millis(500);

/// Jitter applied to a type's base rain intensity.
const RAIN_JITTER: (f64, f64) = (0.8, 1.2);
/// Jitter applied to the synthetic change period.
const PERIOD_JITTER: (f64, f64) = (0.5, 1.5);

/// Where new weather comes from.
pub enum WeatherFeed<S> {
    Synthetic { change_period: Duration },
    Real {
        source: S,
        api_key: String,
        latitude: f64,
        longitude: f64,
    },
}

/// A weather to apply and the time until the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherStep {
    pub weather: Option<(WeatherDescription, f64)>,
    pub period: Duration,
}

/// Produces successive weathers from the configured feed.
pub struct WeatherDriver<S> {
    feed: WeatherFeed<S>,
    randomizer: WeatherRandomizer<'static>,
    last_type: Option<WeatherType>,
}

impl WeatherDriver<OpenWeatherFileSource> {
    pub fn from_config(weather: &WeatherSection) -> Self {
        let feed = match (&weather.weather_source_path, weather.use_real_conditions) {
            (Some(path), true) => WeatherFeed::Real {
                source: OpenWeatherFileSource::new(path),
                api_key: weather.api_key.clone(),
                latitude: weather.track_latitude,
                longitude: weather.track_longitude,
            },
            _ => WeatherFeed::Synthetic {
                change_period: weather.change_period(),
            },
        };
        let randomizer =
            WeatherRandomizer::new(WeatherGraph::standard(), weather.random_policy(), weather.seed);
        WeatherDriver::new(feed, randomizer)
    }
}

impl<S: WeatherSource> WeatherDriver<S> {
    pub fn new(feed: WeatherFeed<S>, randomizer: WeatherRandomizer<'static>) -> Self {
        WeatherDriver {
            feed,
            randomizer,
            last_type: None,
        }
    }

    pub async fn next_step(&mut self) -> WeatherStep {
        let step = match &self.feed {
            WeatherFeed::Synthetic { change_period } => {
                let period = change_period
                    .mul_f64(self.randomizer.uniform(PERIOD_JITTER.0, PERIOD_JITTER.1));
                let description = self.randomizer.generate_random_description(self.last_type);
                WeatherStep {
                    weather: Some((description, 0.0)),
                    period,
                }
            }
            WeatherFeed::Real {
                source,
                api_key,
                latitude,
                longitude,
            } => {
                let weather = match source
                    .fetch_current_weather(api_key, *latitude, *longitude)
                    .await
                {
                    Ok(description) => Some((description, 0.0)),
                    Err(e) => {
                        warn!("Failed to fetch weather: {}", e);
                        None
                    }
                };
                WeatherStep {
                    weather,
                    period: REAL_CONDITIONS_PERIOD,
                }
            }
        };
        self.finish(step)
    }

    fn finish(&mut self, mut step: WeatherStep) -> WeatherStep {
        if let Some((description, rain)) = step.weather.as_mut() {
            *rain = description.weather_type.rain_intensity()
                * self.randomizer.uniform(RAIN_JITTER.0, RAIN_JITTER.1);
            self.last_type = Some(description.weather_type);
        }
        step
    }
}

/// Apply a new weather every period until shutdown.
pub async fn weather_loop<T, R, S>(conditions: Arc<LiveConditions<T, R>>, mut driver: WeatherDriver<S>)
where
    T: Transport,
    R: DriverRoster,
    S: WeatherSource,
{
    while !conditions.is_shutting_down() {
        let step = driver.next_step().await;
        if let Some((description, rain)) = step.weather {
            conditions.apply_weather(description, rain, step.period).await;
        }
        debug!(next_in_secs = step.period.as_secs(), "Weather scheduled");
        time::sleep(step.period).await;
    }
    info!("Weather loop stopped");
}

/// Advance rain and grip at a fixed rate until shutdown.
pub async fn numeric_loop<T: Transport, R: DriverRoster>(conditions: Arc<LiveConditions<T, R>>) {
    let mut interval = time::interval(NUMERIC_TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if conditions.is_shutting_down() {
            break;
        }
        conditions.tick(NUMERIC_TICK).await;
    }
    info!("Conditions loop stopped");
}

/// Broadcast the conditions every broadcast period until shutdown.
pub async fn broadcast_loop<T: Transport, R: DriverRoster>(conditions: Arc<LiveConditions<T, R>>) {
    let period = conditions.broadcast_period();
    while !conditions.is_shutting_down() {
        conditions.broadcast_conditions().await;
        time::sleep(period).await;
    }
    info!("Broadcast loop stopped");
}

/// Start the weather and numeric loops. Broadcasting starts with `on_init`.
pub fn spawn_model<T, R, S>(
    conditions: &Arc<LiveConditions<T, R>>,
    driver: WeatherDriver<S>,
) -> Vec<JoinHandle<()>>
where
    T: Transport,
    R: DriverRoster,
    S: WeatherSource + 'static,
{
    vec![
        tokio::spawn(weather_loop(Arc::clone(conditions), driver)),
        tokio::spawn(numeric_loop(Arc::clone(conditions))),
    ]
}
