pub mod graph;
pub mod randomizer;
pub mod road;
pub mod source;
pub mod transition;
pub mod types;

pub use graph::WeatherGraph;
pub use randomizer::{RandomWeatherPolicy, WeatherRandomizer, pick_weather_type};
pub use road::DaylightWindow;
pub use source::{FetchError, OpenWeatherFileSource, WeatherSource};
pub use transition::{TransitionSample, TransitionState, WeatherField};
pub use types::{WeatherDescription, WeatherType};
