use thiserror::Error;

use crate::types::StationId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SensorFault {
    #[error("station {0} measurement failed: {1}")]
    Measurement(StationId, String),
    #[error("station {0} is not fitted")]
    Missing(StationId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFault {
    #[error("not connected to broker")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(String),
    #[error("receive failed: {0}")]
    Receive(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFault {
    #[error("unrecognized token `{0}`")]
    UnknownToken(String),
    #[error("invalid value `{value}` for {param}")]
    InvalidValue { param: String, value: String },
    #[error("empty message")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigFault {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Anything a remote threshold message can be rejected for.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteFault {
    #[error(transparent)]
    Parse(#[from] ParseFault),
    #[error(transparent)]
    Config(#[from] ConfigFault),
}
