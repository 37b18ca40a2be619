//! Client-side extension commands: handshake and weather updates.

use super::codec::{DecodeError, Reader, Writer};
use crate::math::saturate;
use crate::weather::WeatherType;

pub const HANDSHAKE_IN: u16 = 0;
pub const HANDSHAKE_OUT: u16 = 1;
pub const WEATHER_SET_V1: u16 = 1000;
pub const WEATHER_SET_V2: u16 = 1001;

/// Lowest grip value the one-byte grip field can express.
const GRIP_FLOOR: f64 = 0.6;
const GRIP_SPAN: f64 = 0.4;

pub fn encode_humidity(humidity: f64) -> u8 {
    (saturate(humidity) * 255.0).round() as u8
}

pub fn decode_humidity(raw: u8) -> f64 {
    f64::from(raw) / 255.0
}

pub fn encode_grip(grip: f64) -> u8 {
    (saturate((grip - GRIP_FLOOR) / GRIP_SPAN) * 255.0).round() as u8
}

pub fn decode_grip(raw: u8) -> f64 {
    GRIP_FLOOR + f64::from(raw) / 255.0 * GRIP_SPAN
}

pub fn encode_transition(progress: f64) -> u16 {
    (saturate(progress) * 65535.0).round() as u16
}

pub fn decode_transition(raw: u16) -> f64 {
    f64::from(raw) / 65535.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSetV1 {
    /// Simulated unix time, seconds.
    pub timestamp: u64,
    pub time_to_apply: f32,
    pub current: WeatherType,
    pub next: WeatherType,
    pub transition: f32,
}

/// Weather command with the full set of conditions.
///
/// Values are kept in natural units; quantization happens on encode, so a
/// decoded command only matches the original to the precision of its field.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSetV2 {
    pub timestamp: u64,
    pub current: WeatherType,
    pub next: WeatherType,
    pub transition: f64,
    pub time_to_apply: f32,
    pub temperature_ambient: f32,
    pub temperature_road: f32,
    pub grip: f64,
    pub humidity: f64,
    pub wind_direction_deg: f32,
    pub wind_speed_kmh: f32,
    pub pressure: f32,
    pub rain_intensity: f32,
    pub rain_wetness: f32,
    pub rain_water: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CspCommand {
    HandshakeIn {
        min_version: u32,
        requires_weather_fx: bool,
    },
    HandshakeOut {
        version: u32,
        is_weather_fx_active: bool,
    },
    WeatherSetV1(WeatherSetV1),
    WeatherSetV2(WeatherSetV2),
}

impl CspCommand {
    pub fn tag(&self) -> u16 {
        match self {
            CspCommand::HandshakeIn { .. } => HANDSHAKE_IN,
            CspCommand::HandshakeOut { .. } => HANDSHAKE_OUT,
            CspCommand::WeatherSetV1(_) => WEATHER_SET_V1,
            CspCommand::WeatherSetV2(_) => WEATHER_SET_V2,
        }
    }

    pub fn encode_body(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(36);
        self.write_body(&mut w);
        w.into_bytes()
    }

    /// Sixteen-bit tag followed by the body.
    pub fn to_framed(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(36);
        w.u16(self.tag());
        self.write_body(&mut w);
        w.into_bytes()
    }

    pub fn from_framed(framed: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(framed);
        let tag = r.u16()?;
        Self::decode(tag, &framed[2..])
    }

    pub fn decode(tag: u16, body: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(body);
        let command = match tag {
            HANDSHAKE_IN => CspCommand::HandshakeIn {
                min_version: r.u32()?,
                requires_weather_fx: r.bool()?,
            },
            HANDSHAKE_OUT => CspCommand::HandshakeOut {
                version: r.u32()?,
                is_weather_fx_active: r.bool()?,
            },
            WEATHER_SET_V1 => CspCommand::WeatherSetV1(WeatherSetV1 {
                timestamp: r.u64()?,
                time_to_apply: r.f32()?,
                current: read_weather_type(&mut r, "current")?,
                next: read_weather_type(&mut r, "next")?,
                transition: r.f32()?,
            }),
            WEATHER_SET_V2 => CspCommand::WeatherSetV2(WeatherSetV2 {
                timestamp: r.u64()?,
                current: read_weather_type(&mut r, "current")?,
                next: read_weather_type(&mut r, "next")?,
                transition: decode_transition(r.u16()?),
                time_to_apply: r.f16()?,
                temperature_ambient: r.f16()?,
                temperature_road: r.f16()?,
                grip: decode_grip(r.u8()?),
                humidity: decode_humidity(r.u8()?),
                wind_direction_deg: r.f16()?,
                wind_speed_kmh: r.f16()?,
                pressure: r.f16()?,
                rain_intensity: r.f16()?,
                rain_wetness: r.f16()?,
                rain_water: r.f16()?,
            }),
            other => return Err(DecodeError::UnknownType(other)),
        };
        Ok(command)
    }

    fn write_body(&self, w: &mut Writer) {
        match self {
            CspCommand::HandshakeIn {
                min_version,
                requires_weather_fx,
            } => {
                w.u32(*min_version).bool(*requires_weather_fx);
            }
            CspCommand::HandshakeOut {
                version,
                is_weather_fx_active,
            } => {
                w.u32(*version).bool(*is_weather_fx_active);
            }
            CspCommand::WeatherSetV1(c) => {
                w.u64(c.timestamp)
                    .f32(c.time_to_apply)
                    .u8(c.current.as_u8())
                    .u8(c.next.as_u8())
                    .f32(c.transition);
            }
            CspCommand::WeatherSetV2(c) => {
                w.u64(c.timestamp)
                    .u8(c.current.as_u8())
                    .u8(c.next.as_u8())
                    .u16(encode_transition(c.transition))
                    .f16(c.time_to_apply)
                    .f16(c.temperature_ambient)
                    .f16(c.temperature_road)
                    .u8(encode_grip(c.grip))
                    .u8(encode_humidity(c.humidity))
                    .f16(c.wind_direction_deg)
                    .f16(c.wind_speed_kmh)
                    .f16(c.pressure)
                    .f16(c.rain_intensity)
                    .f16(c.rain_wetness)
                    .f16(c.rain_water);
            }
        }
    }
}

fn read_weather_type(r: &mut Reader<'_>, field: &'static str) -> Result<WeatherType, DecodeError> {
    let value = r.u8()?;
    WeatherType::from_u8(value).ok_or(DecodeError::InvalidEnumValue { field, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v1() -> WeatherSetV1 {
        WeatherSetV1 {
            timestamp: 1_700_000_000,
            time_to_apply: 0.5,
            current: WeatherType::Clear,
            next: WeatherType::LightRain,
            transition: 0.25,
        }
    }

    fn v2() -> WeatherSetV2 {
        WeatherSetV2 {
            timestamp: 1_700_000_000,
            current: WeatherType::Rain,
            next: WeatherType::HeavyThunderstorm,
            transition: decode_transition(32768),
            time_to_apply: 0.5,
            temperature_ambient: 18.5,
            temperature_road: 21.25,
            grip: decode_grip(200),
            humidity: decode_humidity(230),
            wind_direction_deg: 270.0,
            wind_speed_kmh: 14.5,
            pressure: 1008.0,
            rain_intensity: 0.5,
            rain_wetness: 0.75,
            rain_water: 0.125,
        }
    }

    #[test]
    fn quantization_endpoints() {
        assert_eq!(encode_humidity(0.0), 0);
        assert_eq!(encode_humidity(1.0), 255);
        assert_eq!(encode_humidity(-0.5), 0);
        assert_eq!(encode_humidity(1.5), 255);
        assert_eq!(encode_humidity(0.5), 128);

        assert_eq!(encode_grip(0.6), 0);
        assert_eq!(encode_grip(1.0), 255);
        assert_eq!(encode_grip(0.5), 0);
        assert_eq!(encode_grip(1.2), 255);
        assert_eq!(encode_grip(0.8), 128);

        assert_eq!(encode_transition(0.0), 0);
        assert_eq!(encode_transition(1.0), 65535);
        assert_eq!(encode_transition(2.0), 65535);
        assert_eq!(encode_transition(f64::NAN), 0);
    }

    #[test]
    fn v1_layout() {
        let body = CspCommand::WeatherSetV1(v1()).encode_body();
        assert_eq!(body.len(), 18);
        assert_eq!(&body[0..8], &1_700_000_000u64.to_le_bytes());
        assert_eq!(&body[8..12], &0.5f32.to_le_bytes());
        assert_eq!(body[12], WeatherType::Clear as u8);
        assert_eq!(body[13], WeatherType::LightRain as u8);
        assert_eq!(&body[14..18], &0.25f32.to_le_bytes());
    }

    #[test]
    fn v2_layout() {
        let body = CspCommand::WeatherSetV2(v2()).encode_body();
        assert_eq!(body.len(), 32);
        assert_eq!(body[8], 7);
        assert_eq!(body[9], 2);
        assert_eq!(u16::from_le_bytes([body[10], body[11]]), 32768);
        // time_to_apply 0.5 as binary16
        assert_eq!(u16::from_le_bytes([body[12], body[13]]), 0x3800);
        assert_eq!(body[18], 200);
        assert_eq!(body[19], 230);
    }

    #[test]
    fn commands_survive_framing() {
        let commands = [
            CspCommand::HandshakeIn {
                min_version: 2144,
                requires_weather_fx: true,
            },
            CspCommand::HandshakeOut {
                version: 1,
                is_weather_fx_active: false,
            },
            CspCommand::WeatherSetV1(v1()),
            CspCommand::WeatherSetV2(v2()),
        ];
        for command in commands {
            let framed = command.to_framed();
            assert_eq!(u16::from_le_bytes([framed[0], framed[1]]), command.tag());
            let decoded = CspCommand::from_framed(&framed).unwrap();
            assert_eq!(decoded, command);
            assert_eq!(decoded.to_framed(), framed);
        }
    }

    #[test]
    fn handshake_layout() {
        let framed = CspCommand::HandshakeOut {
            version: 1,
            is_weather_fx_active: true,
        }
        .to_framed();
        assert_eq!(framed, vec![1, 0, 1, 0, 0, 0, 1]);
    }

    #[test]
    fn truncated_commands_rejected() {
        let body = CspCommand::WeatherSetV2(v2()).encode_body();
        for len in 0..body.len() {
            assert!(matches!(
                CspCommand::decode(WEATHER_SET_V2, &body[..len]),
                Err(DecodeError::Truncated { .. })
            ));
        }
        assert!(CspCommand::from_framed(&[0xe8]).is_err());
    }

    #[test]
    fn unknown_and_invalid_rejected() {
        assert_eq!(CspCommand::decode(7, &[]), Err(DecodeError::UnknownType(7)));
        let mut body = CspCommand::WeatherSetV1(v1()).encode_body();
        body[13] = 33;
        assert_eq!(
            CspCommand::decode(WEATHER_SET_V1, &body),
            Err(DecodeError::InvalidEnumValue {
                field: "next",
                value: 33
            })
        );
    }
}
