pub mod plugin;

pub use plugin::{PluginConfig, PluginSection, WeatherSection};
