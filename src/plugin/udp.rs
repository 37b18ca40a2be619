//! The UDP link to the host server: decode its events, forward hooks, tunnel CSP commands through chat.

use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::RwLock;
use tokio::time;
use tracing::{debug, info, warn};

use super::{DriverInfo, DriverRoster, LiveConditions, Transport};
use crate::config::PluginSection;
use crate::protocol::PluginMessage;

/// Prefix the client recognises as a CSP command inside a chat message.
pub const CSP_CHAT_PREFIX: &str = "\t\t\t\t$CSP0:";

const RECV_BUFFER: usize = 2048;
const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Standard base64 without padding.
fn base64_unpadded(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let b = [
            chunk[0],
            chunk.get(1).copied().unwrap_or(0),
            chunk.get(2).copied().unwrap_or(0),
        ];
        let n = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
        let chars = chunk.len() + 1;
        for i in 0..chars {
            let index = (n >> (18 - 6 * i)) & 0x3f;
            out.push(char::from(BASE64_ALPHABET[index as usize]));
        }
    }
    out
}

/// Wrap a framed CSP command so it can travel as a chat message.
pub fn csp_chat_message(payload: &[u8]) -> String {
    format!("{}{}", CSP_CHAT_PREFIX, base64_unpadded(payload))
}

#[derive(Debug, Clone, Copy, Default)]
struct CarState {
    connected: bool,
    speed_kmh: f64,
}

/// Receive errors never stop the link; they are logged and the datagram skipped.
fn received(result: io::Result<(usize, SocketAddr)>) -> Option<(usize, SocketAddr)> {
    match result {
        Ok(received) => Some(received),
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
            debug!("Server not reachable yet");
            None
        }
        Err(e) => {
            warn!("Failed to receive datagram: {}", e);
            None
        }
    }
}

/// Socket plus the car table built from the server's events.
pub struct UdpPluginLink {
    socket: UdpSocket,
    remote: SocketAddr,
    realtime_interval_ms: u16,
    connected: AtomicBool,
    cars: RwLock<HashMap<u8, CarState>>,
}

impl UdpPluginLink {
    /// Bind the configured listening port and resolve the server's address.
    pub async fn bind(section: &PluginSection) -> io::Result<Self> {
        let remote = lookup_host((section.remote_host.as_str(), section.remote_port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("cannot resolve {}", section.remote_host),
                )
            })?;
        let local = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), section.listening_port);
        Self::connect(local, remote, section.realtime_update_interval_ms).await
    }

    pub async fn connect(
        local: SocketAddr,
        remote: SocketAddr,
        realtime_interval_ms: u16,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        info!(local = %socket.local_addr()?, %remote, "Plugin link bound");
        Ok(UdpPluginLink {
            socket,
            remote,
            realtime_interval_ms,
            connected: AtomicBool::new(false),
            cars: RwLock::new(HashMap::new()),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn send_message(&self, message: &PluginMessage) -> io::Result<()> {
        self.socket
            .try_send_to(&message.to_datagram(), self.remote)
            .map(|_| ())
    }

    fn request_realtime_updates(&self) {
        let message = PluginMessage::RealtimePosInterval {
            interval_ms: self.realtime_interval_ms,
        };
        if let Err(e) = self.send_message(&message) {
            warn!("Failed to request car updates: {}", e);
        }
    }

    /// Decode one datagram and react to it.
    pub async fn handle_datagram<T: Transport, R: DriverRoster>(
        &self,
        datagram: &[u8],
        conditions: &LiveConditions<T, R>,
    ) {
        let message = match PluginMessage::from_datagram(datagram) {
            Ok(m) => m,
            Err(e) => {
                warn!(len = datagram.len(), "Dropping datagram: {}", e);
                return;
            }
        };
        if !self.connected.swap(true, Ordering::Relaxed) {
            info!("Server connected");
        }

        match message {
            PluginMessage::NewSession(session) => {
                info!(
                    track = %session.track,
                    session = %session.name,
                    kind = ?session.session_type,
                    "New session"
                );
                conditions.on_new_session().await;
                self.request_realtime_updates();
            }
            PluginMessage::SessionInfo(session) => {
                debug!(track = %session.track, session = %session.name, "Session info");
            }
            PluginMessage::NewConnection(connection) => {
                info!(car_id = connection.car_id, driver = %connection.driver_name, "Driver joined");
                self.cars.write().await.insert(
                    connection.car_id,
                    CarState {
                        connected: true,
                        speed_kmh: 0.0,
                    },
                );
            }
            PluginMessage::ConnectionClosed(connection) => {
                info!(car_id = connection.car_id, driver = %connection.driver_name, "Driver left");
                self.cars.write().await.remove(&connection.car_id);
            }
            PluginMessage::CarInfo(car) => {
                let mut cars = self.cars.write().await;
                let state = cars.entry(car.car_id).or_default();
                state.connected = car.is_connected;
                if !car.is_connected {
                    state.speed_kmh = 0.0;
                }
            }
            PluginMessage::CarUpdate(update) => {
                let mut cars = self.cars.write().await;
                let state = cars.entry(update.car_id).or_insert(CarState {
                    connected: true,
                    speed_kmh: 0.0,
                });
                state.speed_kmh = update.speed_kmh();
            }
            PluginMessage::ClientLoaded { car_id } => {
                debug!(car_id, "Client loaded");
                conditions.on_client_loaded(car_id).await;
            }
            PluginMessage::Version { version } => info!(version, "Server protocol version"),
            PluginMessage::Error { message } => warn!("Server error: {}", message),
            PluginMessage::EndSession { report_file } => info!(%report_file, "Session ended"),
            PluginMessage::Chat { car_id, message } => debug!(car_id, %message, "Chat"),
            other => debug!(kind = ?other.message_type(), "Ignoring outbound message type"),
        }
    }

    /// Receive and dispatch datagrams until shutdown.
    pub async fn run<T: Transport, R: DriverRoster>(
        &self,
        conditions: &LiveConditions<T, R>,
    ) -> io::Result<()> {
        self.request_realtime_updates();
        if let Err(e) = self.send_message(&PluginMessage::GetSessionInfo { session_index: -1 }) {
            warn!("Failed to request session info: {}", e);
        }

        let mut buf = [0u8; RECV_BUFFER];
        while !conditions.is_shutting_down() {
            let Ok(result) = time::timeout(SHUTDOWN_POLL, self.socket.recv_from(&mut buf)).await else {
                continue;
            };
            let Some((len, from)) = received(result) else {
                continue;
            };
            if from.ip() != self.remote.ip() {
                debug!(%from, "Datagram from unexpected peer");
            }
            self.handle_datagram(&buf[..len], conditions).await;
        }
        info!("Plugin link stopped");
        Ok(())
    }
}

impl Transport for UdpPluginLink {
    fn send_to(&self, car_id: u8, payload: &[u8]) -> io::Result<()> {
        self.send_message(&PluginMessage::SendChat {
            car_id,
            message: csp_chat_message(payload),
        })
    }

    fn broadcast(&self, payload: &[u8]) -> io::Result<()> {
        self.send_message(&PluginMessage::BroadcastChat {
            message: csp_chat_message(payload),
        })
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

impl DriverRoster for UdpPluginLink {
    async fn driver_infos(&self) -> Vec<DriverInfo> {
        self.cars
            .read()
            .await
            .values()
            .map(|car| DriverInfo {
                is_connected: car.connected,
                speed_kmh: car.speed_kmh,
            })
            .collect()
    }
}
