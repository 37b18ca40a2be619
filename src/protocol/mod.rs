//! Binary wire formats: the host server's UDP plugin messages and the
//! client-side extension commands tunnelled through chat.

pub mod codec;
pub mod csp;
pub mod half;
pub mod messages;

pub use codec::DecodeError;
pub use csp::{CspCommand, WeatherSetV1, WeatherSetV2};
pub use messages::{CarInfo, CarUpdate, ConnectionInfo, MessageType, PluginMessage, SessionInfo, SessionType};
