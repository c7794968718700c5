use crate::types::StationId;

pub const TOPIC_STATION_ONE: &str = "envrig/station/1";
pub const TOPIC_STATION_TWO: &str = "envrig/station/2";
pub const TOPIC_THRESHOLDS: &str = "envrig/thresholds";
pub const TOPIC_ALARM: &str = "envrig/alarm";

pub const TOPIC_CMD_CONTROL: &str = "envrig/cmnd/control";
pub const TOPIC_CMD_THRESHOLD: &str = "envrig/cmnd/threshold";

/// Retained `online` / `offline`, the latter set as last will.
pub const TOPIC_STATUS: &str = "envrig/status";

pub fn station_topic(station: StationId) -> Option<&'static str> {
    match station {
        StationId::ONE => Some(TOPIC_STATION_ONE),
        StationId::TWO => Some(TOPIC_STATION_TWO),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fitted_stations_have_topics() {
        assert_eq!(station_topic(StationId::ONE), Some(TOPIC_STATION_ONE));
        assert_eq!(station_topic(StationId::TWO), Some(TOPIC_STATION_TWO));
        assert_eq!(station_topic(StationId::PANEL), None);
    }
}
