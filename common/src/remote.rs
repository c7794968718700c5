//! Grammar of the two remote channels: actuator commands and threshold sets.

use std::str::FromStr;

use crate::{
    error::{ParseFault, RemoteFault},
    thresholds::ThresholdParam,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteChannel {
    Control,
    Threshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCommand {
    TapOn,
    TapOff,
    BuzzerOn,
    BuzzerOff,
}

impl RemoteCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TapOn => "tapon",
            Self::TapOff => "tapoff",
            Self::BuzzerOn => "buzzeron",
            Self::BuzzerOff => "buzzeroff",
        }
    }
}

impl FromStr for RemoteCommand {
    type Err = ParseFault;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let token = message.trim().to_ascii_lowercase();
        match token.as_str() {
            "" => Err(ParseFault::Empty),
            "tapon" => Ok(Self::TapOn),
            "tapoff" => Ok(Self::TapOff),
            "buzzeron" => Ok(Self::BuzzerOn),
            "buzzeroff" => Ok(Self::BuzzerOff),
            _ => Err(ParseFault::UnknownToken(token)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdMessage {
    Set(ThresholdParam, f32),
    Restore,
}

impl FromStr for ThresholdMessage {
    type Err = RemoteFault;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ParseFault::Empty.into());
        }
        if message == "RESTORE" {
            return Ok(Self::Restore);
        }

        let Some((name, raw_value)) = message.split_once('=') else {
            return Err(ParseFault::UnknownToken(message.to_string()).into());
        };
        let param = ThresholdParam::from_remote_name(name.trim())?;
        let value = raw_value
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ParseFault::InvalidValue {
                param: name.trim().to_string(),
                value: raw_value.to_string(),
            })?;

        Ok(Self::Set(param, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigFault;

    #[test]
    fn parses_commands_loosely() {
        assert_eq!("tapon".parse::<RemoteCommand>(), Ok(RemoteCommand::TapOn));
        assert_eq!("TapOff".parse::<RemoteCommand>(), Ok(RemoteCommand::TapOff));
        assert_eq!("buzzeron".parse(), Ok(RemoteCommand::BuzzerOn));
        assert_eq!("BUZZEROFF".parse(), Ok(RemoteCommand::BuzzerOff));
        assert_eq!(" tapoff\r\n".parse(), Ok(RemoteCommand::TapOff));
    }

    #[test]
    fn rejects_unknown_command() {
        assert_eq!(
            "open".parse::<RemoteCommand>(),
            Err(ParseFault::UnknownToken("open".to_string()))
        );
        assert_eq!("  ".parse::<RemoteCommand>(), Err(ParseFault::Empty));
    }

    #[test]
    fn parses_threshold_set() {
        assert_eq!(
            "SETTEMPUPPER=10".parse::<ThresholdMessage>(),
            Ok(ThresholdMessage::Set(ThresholdParam::TempUpper, 10.0))
        );
        assert_eq!(
            "SETLIGHTLOWER= 250.5 ".parse::<ThresholdMessage>(),
            Ok(ThresholdMessage::Set(ThresholdParam::LuxLower, 250.5))
        );
        assert_eq!("RESTORE".parse(), Ok(ThresholdMessage::Restore));
    }

    #[test]
    fn malformed_value_is_a_parse_fault() {
        assert_eq!(
            "SETHUMIDUPPER=wet".parse::<ThresholdMessage>(),
            Err(RemoteFault::Parse(ParseFault::InvalidValue {
                param: "SETHUMIDUPPER".to_string(),
                value: "wet".to_string(),
            }))
        );
        assert!(matches!(
            "SETHUMIDUPPER=NaN".parse::<ThresholdMessage>(),
            Err(RemoteFault::Parse(ParseFault::InvalidValue { .. }))
        ));
    }

    #[test]
    fn unknown_parameter_is_a_config_fault() {
        assert_eq!(
            "SETPRESSURE=1000".parse::<ThresholdMessage>(),
            Err(RemoteFault::Config(ConfigFault::UnknownParameter(
                "SETPRESSURE".to_string()
            )))
        );
    }

    #[test]
    fn telemetry_echo_is_rejected() {
        assert!("#30.0#15.0#70.0#30.0#10000#100#".parse::<ThresholdMessage>().is_err());
    }
}
