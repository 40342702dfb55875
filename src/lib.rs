#![warn(rust_2018_idioms)]

pub mod api;
pub mod error;
pub mod external;
pub mod ice_transport;
pub mod instrumentation;
pub mod peer_connection;
pub mod rtp_transceiver;
pub mod stats;
pub mod track;

pub use error::Error;

pub(crate) const UNSPECIFIED_STR: &str = "Unspecified";

/// Event names with built-in side effects on the proxy.
pub const EVENT_CONNECTION_STATE_CHANGE: &str = "connectionstatechange";
pub const EVENT_ICE_CONNECTION_STATE_CHANGE: &str = "iceconnectionstatechange";
pub const EVENT_TRACK: &str = "track";
