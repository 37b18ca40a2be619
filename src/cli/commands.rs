use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{info, warn};

use crate::conditions::{GripState, RainSnapshot, WeatherCommandSnapshot};
use crate::config::PluginConfig;
use crate::plugin::LiveConditions;
use crate::plugin::scheduler::{self, WeatherDriver, WeatherFeed};
use crate::plugin::udp::UdpPluginLink;
use crate::weather::{OpenWeatherFileSource, TransitionState, WeatherGraph, WeatherRandomizer};

/// How long stopped loops get to notice the shutdown flag before being aborted.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Run the plugin: bind the server link, start the model and serve until Ctrl-C.
pub async fn run_plugin(config: &PluginConfig) -> Result<(), String> {
    let link = Arc::new(
        UdpPluginLink::bind(&config.plugin)
            .await
            .map_err(|e| format!("Failed to bind plugin socket: {}", e))?,
    );
    let conditions = Arc::new(LiveConditions::new(
        &config.weather,
        Arc::clone(&link),
        Arc::clone(&link),
        Instant::now(),
    ));

    let mut handles = scheduler::spawn_model(&conditions, WeatherDriver::from_config(&config.weather));
    handles.push(conditions.on_init());

    let signal_conditions = Arc::clone(&conditions);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_conditions.shutdown();
        }
    });

    let result = link.run(&conditions).await;
    conditions.shutdown();
    stop_tasks(handles).await;

    result.map_err(|e| format!("Plugin link failed: {}", e))
}

async fn stop_tasks(handles: Vec<JoinHandle<()>>) {
    for mut handle in handles {
        if time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
            handle.abort();
        }
    }
}

/// Print the next `count` synthetic weathers and the command each would produce.
pub async fn preview(config: &PluginConfig, count: usize, seed: Option<u64>, json: bool) -> Result<(), String> {
    if count == 0 {
        return Err("Count must be at least 1".to_string());
    }
    let weather = &config.weather;
    let seed = seed.unwrap_or(weather.seed);
    let randomizer = WeatherRandomizer::new(WeatherGraph::standard(), weather.random_policy(), seed);
    let mut driver: WeatherDriver<OpenWeatherFileSource> = WeatherDriver::new(
        WeatherFeed::Synthetic {
            change_period: weather.change_period(),
        },
        randomizer,
    );

    let params = weather.conditions_params();
    let now = Instant::now();
    let clock = weather.session_clock(now);
    let grip = GripState::new(weather.track_length_km).grip(&params.grip);
    let mut elapsed = Duration::ZERO;

    for index in 0..count {
        let step = driver.next_step().await;
        let Some((description, rain)) = step.weather else {
            warn!(index, "No weather produced");
            continue;
        };

        if json {
            let line = serde_json::to_string(&description)
                .map_err(|e| format!("Failed to serialise weather: {}", e))?;
            println!("{}", line);
        } else {
            let mut state = TransitionState::new();
            state.apply_weather(description, rain, step.period, now);
            let Some(sample) = state.sample(now) else {
                continue;
            };
            let temperatures = params.temperatures(Some(&sample), clock.seconds_of_day(now));
            let snapshot = WeatherCommandSnapshot::new(
                clock.unix_timestamp(now),
                &sample,
                temperatures,
                RainSnapshot {
                    intensity: rain,
                    wetness: 0.0,
                    water: 0.0,
                },
                grip,
            );
            let framed = snapshot
                .to_command(weather.use_v2, weather.broadcast_period())
                .to_framed();

            println!(
                "#{:<3} +{:>6}s {:<20} {:>5.1}°C wind {:>4.1} m/s @ {:>3.0}° hum {:>3.0}% rain {:.2}",
                index,
                elapsed.as_secs(),
                description.weather_type.to_string(),
                description.temperature,
                description.wind_speed,
                description.wind_direction,
                description.humidity * 100.0,
                rain,
            );
            println!("     {}", hex(&framed));
        }
        elapsed += step.period;
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

/// Load and validate a config file, then summarise what it selects.
pub fn check(config_path: &Path) -> Result<(), String> {
    let config = PluginConfig::from_file(config_path)?;
    let weather = &config.weather;
    println!("Config OK: {}", config_path.display());
    println!(
        "  Server: {}:{} (listening on {})",
        config.plugin.remote_host, config.plugin.remote_port, config.plugin.listening_port
    );
    let feed = match (&weather.weather_source_path, weather.use_real_conditions) {
        (Some(path), true) => format!("real ({})", path.display()),
        _ => format!("synthetic every ~{}s", weather.change_period().as_secs()),
    };
    println!("  Weather: {}", feed);
    println!(
        "  Command: {} every {}s",
        if weather.use_v2 { "v2" } else { "v1" },
        weather.broadcast_period().as_secs()
    );
    println!("  Track: {:.2} km", weather.track_length_km);
    Ok(())
}
