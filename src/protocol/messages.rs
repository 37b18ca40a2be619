//! Messages exchanged with the host server over its UDP plugin interface.

use super::codec::{DecodeError, Reader, Writer};

/// One-byte tag that prefixes every datagram.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    NewSession = 50,
    NewConnection = 51,
    ConnectionClosed = 52,
    CarUpdate = 53,
    CarInfo = 54,
    EndSession = 55,
    Version = 56,
    Chat = 57,
    ClientLoaded = 58,
    SessionInfo = 59,
    Error = 60,
    RealtimePosInterval = 200,
    GetCarInfo = 201,
    SendChat = 202,
    BroadcastChat = 203,
    GetSessionInfo = 204,
    KickUser = 206,
    NextSession = 207,
    RestartSession = 208,
    AdminCommand = 209,
}

impl MessageType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        use MessageType as M;
        let t = match tag {
            50 => M::NewSession,
            51 => M::NewConnection,
            52 => M::ConnectionClosed,
            53 => M::CarUpdate,
            54 => M::CarInfo,
            55 => M::EndSession,
            56 => M::Version,
            57 => M::Chat,
            58 => M::ClientLoaded,
            59 => M::SessionInfo,
            60 => M::Error,
            200 => M::RealtimePosInterval,
            201 => M::GetCarInfo,
            202 => M::SendChat,
            203 => M::BroadcastChat,
            204 => M::GetSessionInfo,
            206 => M::KickUser,
            207 => M::NextSession,
            208 => M::RestartSession,
            209 => M::AdminCommand,
            _ => return None,
        };
        Some(t)
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionType {
    Booking = 0,
    Practice = 1,
    Qualifying = 2,
    Race = 3,
    Hotlap = 4,
    TimeAttack = 5,
    Drift = 6,
    Drag = 7,
}

impl SessionType {
    pub fn from_u8(value: u8) -> Option<Self> {
        use SessionType as S;
        [
            S::Booking,
            S::Practice,
            S::Qualifying,
            S::Race,
            S::Hotlap,
            S::TimeAttack,
            S::Drift,
            S::Drag,
        ]
        .get(value as usize)
        .copied()
    }
}

/// Body of NewSession and SessionInfo.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub version: u8,
    pub session_index: u8,
    pub current_session_index: u8,
    pub session_count: u8,
    pub server_name: String,
    pub track: String,
    pub track_config: String,
    pub name: String,
    pub session_type: SessionType,
    pub time_minutes: u16,
    pub laps: u16,
    pub wait_time: u16,
    pub ambient_temp: u8,
    pub road_temp: u8,
    pub weather_graphics: String,
    pub elapsed_ms: i32,
}

/// Body of NewConnection and ConnectionClosed.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionInfo {
    pub driver_name: String,
    pub driver_guid: String,
    pub car_id: u8,
    pub car_model: String,
    pub car_skin: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarUpdate {
    pub car_id: u8,
    pub position: [f32; 3],
    /// Metres per second.
    pub velocity: [f32; 3],
    pub gear: u8,
    pub engine_rpm: u16,
    pub normalized_spline_pos: f32,
}

impl CarUpdate {
    pub fn speed_kmh(&self) -> f64 {
        let [x, y, z] = self.velocity.map(f64::from);
        (x * x + y * y + z * z).sqrt() * 3.6
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarInfo {
    pub car_id: u8,
    pub is_connected: bool,
    pub car_model: String,
    pub car_skin: String,
    pub driver_name: String,
    pub driver_team: String,
    pub driver_guid: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PluginMessage {
    NewSession(SessionInfo),
    NewConnection(ConnectionInfo),
    ConnectionClosed(ConnectionInfo),
    CarUpdate(CarUpdate),
    CarInfo(CarInfo),
    EndSession { report_file: String },
    Version { version: u8 },
    Chat { car_id: u8, message: String },
    ClientLoaded { car_id: u8 },
    SessionInfo(SessionInfo),
    Error { message: String },
    RealtimePosInterval { interval_ms: u16 },
    GetCarInfo { car_id: u8 },
    SendChat { car_id: u8, message: String },
    BroadcastChat { message: String },
    /// `-1` asks for the current session.
    GetSessionInfo { session_index: i16 },
    KickUser { car_id: u8 },
    NextSession,
    RestartSession,
    AdminCommand { command: String },
}

impl PluginMessage {
    pub fn message_type(&self) -> MessageType {
        use PluginMessage as P;
        match self {
            P::NewSession(_) => MessageType::NewSession,
            P::NewConnection(_) => MessageType::NewConnection,
            P::ConnectionClosed(_) => MessageType::ConnectionClosed,
            P::CarUpdate(_) => MessageType::CarUpdate,
            P::CarInfo(_) => MessageType::CarInfo,
            P::EndSession { .. } => MessageType::EndSession,
            P::Version { .. } => MessageType::Version,
            P::Chat { .. } => MessageType::Chat,
            P::ClientLoaded { .. } => MessageType::ClientLoaded,
            P::SessionInfo(_) => MessageType::SessionInfo,
            P::Error { .. } => MessageType::Error,
            P::RealtimePosInterval { .. } => MessageType::RealtimePosInterval,
            P::GetCarInfo { .. } => MessageType::GetCarInfo,
            P::SendChat { .. } => MessageType::SendChat,
            P::BroadcastChat { .. } => MessageType::BroadcastChat,
            P::GetSessionInfo { .. } => MessageType::GetSessionInfo,
            P::KickUser { .. } => MessageType::KickUser,
            P::NextSession => MessageType::NextSession,
            P::RestartSession => MessageType::RestartSession,
            P::AdminCommand { .. } => MessageType::AdminCommand,
        }
    }

    /// Decode a body whose tag was already read.
    pub fn decode(tag: u8, body: &[u8]) -> Result<Self, DecodeError> {
        let message_type =
            MessageType::from_u8(tag).ok_or(DecodeError::UnknownType(u16::from(tag)))?;
        let mut r = Reader::new(body);
        let r = &mut r;
        use PluginMessage as P;
        let message = match message_type {
            MessageType::NewSession => P::NewSession(read_session_info(r)?),
            MessageType::SessionInfo => P::SessionInfo(read_session_info(r)?),
            MessageType::NewConnection => P::NewConnection(read_connection_info(r)?),
            MessageType::ConnectionClosed => P::ConnectionClosed(read_connection_info(r)?),
            MessageType::CarUpdate => P::CarUpdate(CarUpdate {
                car_id: r.u8()?,
                position: r.vec3()?,
                velocity: r.vec3()?,
                gear: r.u8()?,
                engine_rpm: r.u16()?,
                normalized_spline_pos: r.f32()?,
            }),
            MessageType::CarInfo => P::CarInfo(CarInfo {
                car_id: r.u8()?,
                is_connected: r.bool()?,
                car_model: r.wide_string()?,
                car_skin: r.wide_string()?,
                driver_name: r.wide_string()?,
                driver_team: r.wide_string()?,
                driver_guid: r.wide_string()?,
            }),
            MessageType::EndSession => P::EndSession {
                report_file: r.wide_string()?,
            },
            MessageType::Version => P::Version { version: r.u8()? },
            MessageType::Chat => P::Chat {
                car_id: r.u8()?,
                message: r.wide_string()?,
            },
            MessageType::ClientLoaded => P::ClientLoaded { car_id: r.u8()? },
            MessageType::Error => P::Error {
                message: r.wide_string()?,
            },
            MessageType::RealtimePosInterval => P::RealtimePosInterval {
                interval_ms: r.u16()?,
            },
            MessageType::GetCarInfo => P::GetCarInfo { car_id: r.u8()? },
            MessageType::SendChat => P::SendChat {
                car_id: r.u8()?,
                message: r.wide_string()?,
            },
            MessageType::BroadcastChat => P::BroadcastChat {
                message: r.wide_string()?,
            },
            MessageType::GetSessionInfo => P::GetSessionInfo {
                session_index: r.i16()?,
            },
            MessageType::KickUser => P::KickUser { car_id: r.u8()? },
            MessageType::NextSession => P::NextSession,
            MessageType::RestartSession => P::RestartSession,
            MessageType::AdminCommand => P::AdminCommand {
                command: r.wide_string()?,
            },
        };
        Ok(message)
    }

    /// Serialize the body only, without the tag.
    pub fn encode_body(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.write_body(&mut w);
        w.into_bytes()
    }

    /// Tag followed by body, as sent on the wire.
    pub fn to_datagram(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(64);
        w.u8(self.message_type() as u8);
        self.write_body(&mut w);
        w.into_bytes()
    }

    pub fn from_datagram(datagram: &[u8]) -> Result<Self, DecodeError> {
        match datagram.split_first() {
            Some((&tag, body)) => Self::decode(tag, body),
            None => Err(DecodeError::Truncated {
                needed: 1,
                remaining: 0,
            }),
        }
    }

    fn write_body(&self, w: &mut Writer) {
        use PluginMessage as P;
        match self {
            P::NewSession(info) | P::SessionInfo(info) => write_session_info(w, info),
            P::NewConnection(info) | P::ConnectionClosed(info) => {
                w.wide_string(&info.driver_name)
                    .wide_string(&info.driver_guid)
                    .u8(info.car_id)
                    .narrow_string(&info.car_model)
                    .narrow_string(&info.car_skin);
            }
            P::CarUpdate(u) => {
                w.u8(u.car_id)
                    .vec3(u.position)
                    .vec3(u.velocity)
                    .u8(u.gear)
                    .u16(u.engine_rpm)
                    .f32(u.normalized_spline_pos);
            }
            P::CarInfo(c) => {
                w.u8(c.car_id)
                    .bool(c.is_connected)
                    .wide_string(&c.car_model)
                    .wide_string(&c.car_skin)
                    .wide_string(&c.driver_name)
                    .wide_string(&c.driver_team)
                    .wide_string(&c.driver_guid);
            }
            P::EndSession { report_file } => {
                w.wide_string(report_file);
            }
            P::Version { version } => {
                w.u8(*version);
            }
            P::Chat { car_id, message } | P::SendChat { car_id, message } => {
                w.u8(*car_id).wide_string(message);
            }
            P::ClientLoaded { car_id } | P::GetCarInfo { car_id } | P::KickUser { car_id } => {
                w.u8(*car_id);
            }
            P::Error { message } | P::BroadcastChat { message } => {
                w.wide_string(message);
            }
            P::RealtimePosInterval { interval_ms } => {
                w.u16(*interval_ms);
            }
            P::GetSessionInfo { session_index } => {
                w.i16(*session_index);
            }
            P::NextSession | P::RestartSession => {}
            P::AdminCommand { command } => {
                w.wide_string(command);
            }
        }
    }
}

fn read_session_info(r: &mut Reader<'_>) -> Result<SessionInfo, DecodeError> {
    let version = r.u8()?;
    let session_index = r.u8()?;
    let current_session_index = r.u8()?;
    let session_count = r.u8()?;
    let server_name = r.wide_string()?;
    let track = r.narrow_string()?;
    let track_config = r.narrow_string()?;
    let name = r.narrow_string()?;
    let raw_type = r.u8()?;
    let session_type = SessionType::from_u8(raw_type).ok_or(DecodeError::InvalidEnumValue {
        field: "session_type",
        value: raw_type,
    })?;
    Ok(SessionInfo {
        version,
        session_index,
        current_session_index,
        session_count,
        server_name,
        track,
        track_config,
        name,
        session_type,
        time_minutes: r.u16()?,
        laps: r.u16()?,
        wait_time: r.u16()?,
        ambient_temp: r.u8()?,
        road_temp: r.u8()?,
        weather_graphics: r.narrow_string()?,
        elapsed_ms: r.i32()?,
    })
}

fn write_session_info(w: &mut Writer, s: &SessionInfo) {
    w.u8(s.version)
        .u8(s.session_index)
        .u8(s.current_session_index)
        .u8(s.session_count)
        .wide_string(&s.server_name)
        .narrow_string(&s.track)
        .narrow_string(&s.track_config)
        .narrow_string(&s.name)
        .u8(s.session_type as u8)
        .u16(s.time_minutes)
        .u16(s.laps)
        .u16(s.wait_time)
        .u8(s.ambient_temp)
        .u8(s.road_temp)
        .narrow_string(&s.weather_graphics)
        .i32(s.elapsed_ms);
}

fn read_connection_info(r: &mut Reader<'_>) -> Result<ConnectionInfo, DecodeError> {
    Ok(ConnectionInfo {
        driver_name: r.wide_string()?,
        driver_guid: r.wide_string()?,
        car_id: r.u8()?,
        car_model: r.narrow_string()?,
        car_skin: r.narrow_string()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionInfo {
        SessionInfo {
            version: 4,
            session_index: 1,
            current_session_index: 1,
            session_count: 3,
            server_name: "Sunday League ☀".into(),
            track: "ks_nordschleife".into(),
            track_config: "endurance".into(),
            name: "Qualify".into(),
            session_type: SessionType::Qualifying,
            time_minutes: 20,
            laps: 0,
            wait_time: 60,
            ambient_temp: 22,
            road_temp: 31,
            weather_graphics: "3_clear".into(),
            elapsed_ms: -15_000,
        }
    }

    fn connection() -> ConnectionInfo {
        ConnectionInfo {
            driver_name: "Mika".into(),
            driver_guid: "76561198000000000".into(),
            car_id: 7,
            car_model: "ks_porsche_911_gt3_r_2016".into(),
            car_skin: "00_official".into(),
        }
    }

    fn all_messages() -> Vec<PluginMessage> {
        use PluginMessage as P;
        vec![
            P::NewSession(session()),
            P::SessionInfo(session()),
            P::NewConnection(connection()),
            P::ConnectionClosed(connection()),
            P::CarUpdate(CarUpdate {
                car_id: 3,
                position: [10.5, -2.0, 300.25],
                velocity: [20.0, 0.0, -15.0],
                gear: 4,
                engine_rpm: 7250,
                normalized_spline_pos: 0.42,
            }),
            P::CarInfo(CarInfo {
                car_id: 3,
                is_connected: true,
                car_model: "bmw_m3_e30".into(),
                car_skin: "red".into(),
                driver_name: "Ana".into(),
                driver_team: "Équipe".into(),
                driver_guid: "123".into(),
            }),
            P::EndSession {
                report_file: "results/2024_race.json".into(),
            },
            P::Version { version: 4 },
            P::Chat {
                car_id: 2,
                message: "gg".into(),
            },
            P::ClientLoaded { car_id: 9 },
            P::Error {
                message: "bad request".into(),
            },
            P::RealtimePosInterval { interval_ms: 100 },
            P::GetCarInfo { car_id: 1 },
            P::SendChat {
                car_id: 1,
                message: "hello".into(),
            },
            P::BroadcastChat {
                message: "rain expected".into(),
            },
            P::GetSessionInfo { session_index: -1 },
            P::KickUser { car_id: 5 },
            P::NextSession,
            P::RestartSession,
            P::AdminCommand {
                command: "/next_session".into(),
            },
        ]
    }

    #[test]
    fn every_message_survives_the_wire() {
        for message in all_messages() {
            let datagram = message.to_datagram();
            assert_eq!(datagram[0], message.message_type() as u8);
            let decoded = PluginMessage::from_datagram(&datagram).unwrap();
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn realtime_interval_layout() {
        let bytes = PluginMessage::RealtimePosInterval { interval_ms: 1000 }.to_datagram();
        assert_eq!(bytes, vec![200, 0xe8, 0x03]);
    }

    #[test]
    fn broadcast_chat_layout() {
        let bytes = PluginMessage::BroadcastChat { message: "hi".into() }.to_datagram();
        assert_eq!(bytes, vec![203, 2, b'h', 0, b'i', 0]);
    }

    #[test]
    fn car_update_layout_size() {
        let body = all_messages()[4].encode_body();
        assert_eq!(body.len(), 1 + 12 + 12 + 1 + 2 + 4);
    }

    #[test]
    fn every_truncation_is_reported() {
        for message in all_messages() {
            let body = message.encode_body();
            let tag = message.message_type() as u8;
            for len in 0..body.len() {
                let err = PluginMessage::decode(tag, &body[..len]).unwrap_err();
                assert!(
                    matches!(err, DecodeError::Truncated { .. }),
                    "{:?} cut at {len}",
                    message.message_type()
                );
            }
        }
    }

    #[test]
    fn unknown_tag_rejected() {
        assert_eq!(
            PluginMessage::decode(205, &[]),
            Err(DecodeError::UnknownType(205))
        );
        assert_eq!(
            PluginMessage::from_datagram(&[]),
            Err(DecodeError::Truncated {
                needed: 1,
                remaining: 0
            })
        );
    }

    #[test]
    fn invalid_session_type_rejected() {
        let mut body = PluginMessage::NewSession(session()).encode_body();
        // Fixed header plus the three text fields precede the session type.
        let offset = 4
            + 1 + 2 * "Sunday League ☀".encode_utf16().count()
            + 1 + "ks_nordschleife".len()
            + 1 + "endurance".len()
            + 1 + "Qualify".len();
        assert_eq!(body[offset], SessionType::Qualifying as u8);
        body[offset] = 8;
        assert_eq!(
            PluginMessage::decode(MessageType::NewSession as u8, &body),
            Err(DecodeError::InvalidEnumValue {
                field: "session_type",
                value: 8
            })
        );
    }

    #[test]
    fn speed_from_velocity() {
        let update = CarUpdate {
            car_id: 0,
            position: [0.0; 3],
            velocity: [3.0, 0.0, 4.0],
            gear: 3,
            engine_rpm: 5000,
            normalized_spline_pos: 0.0,
        };
        assert!((update.speed_kmh() - 18.0).abs() < 1e-9);
    }
}
