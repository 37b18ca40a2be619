//! The live conditions plugin: shared state, host hooks and the update loops.

pub mod scheduler;
pub mod udp;

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::conditions::{
    ConditionsParams, GripState, RainState, SessionClock, WeatherCommandSnapshot,
};
use crate::config::WeatherSection;
use crate::weather::{TransitionState, WeatherDescription};

/// Outbound channel to the clients, carrying framed CSP commands.
pub trait Transport: Send + Sync + 'static {
    fn send_to(&self, car_id: u8, payload: &[u8]) -> io::Result<()>;
    fn broadcast(&self, payload: &[u8]) -> io::Result<()>;
    fn is_connected(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverInfo {
    pub is_connected: bool,
    pub speed_kmh: f64,
}

/// Read access to the cars currently on the server.
pub trait DriverRoster: Send + Sync + 'static {
    fn driver_infos(&self) -> impl Future<Output = Vec<DriverInfo>> + Send;
}

/// Shared plugin state. Each structure has its own lock; no two are held at once.
pub struct LiveConditions<T, R> {
    params: ConditionsParams,
    use_v2: bool,
    broadcast_period: Duration,
    clock: SessionClock,
    transition: RwLock<TransitionState>,
    rain: RwLock<RainState>,
    grip: RwLock<GripState>,
    transport: Arc<T>,
    roster: Arc<R>,
    shutdown: Arc<AtomicBool>,
}

impl<T: Transport, R: DriverRoster> LiveConditions<T, R> {
    pub fn new(weather: &WeatherSection, transport: Arc<T>, roster: Arc<R>, now: Instant) -> Self {
        LiveConditions {
            params: weather.conditions_params(),
            use_v2: weather.use_v2,
            broadcast_period: weather.broadcast_period(),
            clock: weather.session_clock(now),
            transition: RwLock::new(TransitionState::new()),
            rain: RwLock::new(RainState::new()),
            grip: RwLock::new(GripState::new(weather.track_length_km)),
            transport,
            roster,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn broadcast_period(&self) -> Duration {
        self.broadcast_period
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Start blending towards `description` over `duration`.
    pub async fn apply_weather(
        &self,
        description: WeatherDescription,
        rain_intensity: f64,
        duration: Duration,
    ) {
        info!(
            weather = %description.weather_type,
            temperature = description.temperature,
            rain = rain_intensity,
            duration_secs = duration.as_secs(),
            "New weather"
        );
        let now = Instant::now();
        self.transition
            .write()
            .await
            .apply_weather(description, rain_intensity, duration, now);
    }

    /// One step of the rain and grip model.
    pub async fn tick(&self, dt: Duration) {
        let now = Instant::now();
        let sample = self.transition.read().await.sample(now);
        let temperatures = self
            .params
            .temperatures(sample.as_ref(), self.clock.seconds_of_day(now));
        let intensity = sample.map_or(0.0, |s| s.rain_intensity);

        self.rain
            .write()
            .await
            .tick(intensity, temperatures.road, dt, &self.params.rain);

        let speeds: Vec<f64> = self
            .roster
            .driver_infos()
            .await
            .into_iter()
            .filter(|d| d.is_connected)
            .map(|d| d.speed_kmh)
            .collect();
        self.grip.write().await.accumulate(speeds, dt);
    }

    /// Current conditions, `None` until the first weather arrives.
    pub async fn snapshot(&self) -> Option<WeatherCommandSnapshot> {
        let now = Instant::now();
        let sample = self.transition.read().await.sample(now)?;
        let temperatures = self
            .params
            .temperatures(Some(&sample), self.clock.seconds_of_day(now));
        let rain = self.rain.read().await.snapshot();
        let grip = self.grip.read().await.grip(&self.params.grip);
        Some(WeatherCommandSnapshot::new(
            self.clock.unix_timestamp(now),
            &sample,
            temperatures,
            rain,
            grip,
        ))
    }

    /// Framed weather command for the current conditions.
    pub async fn encoded_command(&self) -> Option<Vec<u8>> {
        let snapshot = self.snapshot().await?;
        Some(
            snapshot
                .to_command(self.use_v2, self.broadcast_period)
                .to_framed(),
        )
    }

    /// Send the conditions to everyone. Returns whether anything was sent.
    pub async fn broadcast_conditions(&self) -> bool {
        if !self.transport.is_connected() {
            return false;
        }
        let Some(payload) = self.encoded_command().await else {
            return false;
        };
        match self.transport.broadcast(&payload) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to broadcast conditions: {}", e);
                false
            }
        }
    }

    pub async fn laps_driven(&self) -> f64 {
        self.grip.read().await.laps()
    }

    /// The host finished its handshake: start broadcasting.
    pub fn on_init(self: &Arc<Self>) -> JoinHandle<()> {
        info!(
            period_secs = self.broadcast_period.as_secs_f64(),
            v2 = self.use_v2,
            "Plugin initialised"
        );
        tokio::spawn(scheduler::broadcast_loop(Arc::clone(self)))
    }

    pub async fn on_new_session(&self) {
        let mut grip = self.grip.write().await;
        grip.carry_over(&self.params.grip);
        info!(laps = grip.laps(), "New session, rubber carried over");
    }

    /// Bring a freshly loaded client up to date without waiting for the next broadcast.
    pub async fn on_client_loaded(&self, car_id: u8) {
        let Some(payload) = self.encoded_command().await else {
            debug!(car_id, "Client loaded before any weather");
            return;
        };
        if let Err(e) = self.transport.send_to(car_id, &payload) {
            error!(car_id, "Failed to send conditions: {}", e);
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records everything sent through it.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub connected: AtomicBool,
        pub unicast: Mutex<Vec<(u8, Vec<u8>)>>,
        pub broadcasts: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingTransport {
        pub fn connected() -> Self {
            let t = Self::default();
            t.connected.store(true, Ordering::Relaxed);
            t
        }

        pub fn broadcast_count(&self) -> usize {
            self.broadcasts.lock().unwrap().len()
        }
    }

    impl Transport for RecordingTransport {
        fn send_to(&self, car_id: u8, payload: &[u8]) -> io::Result<()> {
            self.unicast.lock().unwrap().push((car_id, payload.to_vec()));
            Ok(())
        }

        fn broadcast(&self, payload: &[u8]) -> io::Result<()> {
            self.broadcasts.lock().unwrap().push(payload.to_vec());
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::Relaxed)
        }
    }

    /// A fixed set of drivers.
    #[derive(Default)]
    pub struct StaticRoster(pub Vec<DriverInfo>);

    impl DriverRoster for StaticRoster {
        async fn driver_infos(&self) -> Vec<DriverInfo> {
            self.0.clone()
        }
    }

    pub fn fixed_noon() -> WeatherSection {
        WeatherSection {
            use_fixed_starting_time: true,
            fixed_starting_time_secs: 12 * 3600,
            fixed_starting_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 15),
            ..WeatherSection::default()
        }
    }

    pub fn conditions(
        weather: &WeatherSection,
        transport: RecordingTransport,
        roster: StaticRoster,
    ) -> Arc<LiveConditions<RecordingTransport, StaticRoster>> {
        Arc::new(LiveConditions::new(
            weather,
            Arc::new(transport),
            Arc::new(roster),
            Instant::now(),
        ))
    }
}
