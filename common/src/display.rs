//! Text pages for the 128x64 panel.

use serde::Serialize;

use crate::{
    evaluator::out_of_band,
    telemetry::NOT_AVAILABLE,
    thresholds::Thresholds,
    types::{StationId, StationStatus},
};

pub const BANNER_SHUTDOWN: &str = "System stopped";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Readings,
    Thresholds,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Readings => Self::Thresholds,
            Self::Thresholds => Self::Readings,
        }
    }
}

fn marked(text: String, flagged: bool) -> String {
    if flagged {
        format!("{text} !")
    } else {
        text
    }
}

pub fn station_lines(
    station: StationId,
    status: &StationStatus,
    thresholds: &Thresholds,
) -> Vec<String> {
    let Some(reading) = status.reading() else {
        let mut lines = vec![
            format!("S#{station} L:{NOT_AVAILABLE}"),
            format!("Temp: {NOT_AVAILABLE}"),
            format!("Humid: {NOT_AVAILABLE}"),
        ];
        if let StationStatus::Fault(_) = status {
            lines.push("Sensor error".to_string());
        }
        return lines;
    };

    let flags = out_of_band(reading, thresholds);
    let temp = reading
        .temperature_c
        .map(|t| format!("{t:.1} C"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let humidity = reading
        .humidity
        .map(|h| format!("{h:.1} %"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let lux = reading.lux.trunc() as i64;

    let mut lines = vec![
        marked(format!("S#{station} L:{lux}"), flags.lux),
        marked(format!("Temp: {temp}"), flags.temperature),
        marked(format!("Humid: {humidity}"), flags.humidity),
    ];
    if let Some(pressure) = reading.pressure_hpa {
        lines.push(format!("P: {pressure:.1} hPa"));
    }
    if let Some(altitude) = reading.altitude_m {
        lines.push(format!("Alt: {altitude:.1} m"));
    }
    lines
}

pub fn threshold_lines(thresholds: &Thresholds) -> Vec<String> {
    let Thresholds {
        temp_upper,
        temp_lower,
        humidity_upper,
        humidity_lower,
        lux_upper,
        lux_lower,
    } = *thresholds;
    vec![
        "Thresholds".to_string(),
        format!("T: {temp_lower:.1}-{temp_upper:.1} C"),
        format!("H: {humidity_lower:.1}-{humidity_upper:.1} %"),
        format!(
            "L: {}-{} lx",
            lux_lower.trunc() as i64,
            lux_upper.trunc() as i64
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SensorFault, types::StationReading};
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_fields_render_not_available() {
        let status = StationStatus::Ok(StationReading {
            temperature_c: None,
            humidity: Some(55.0),
            lux: 734.4,
            ..StationReading::default()
        });

        let lines = station_lines(StationId::ONE, &status, &Thresholds::default());

        assert_eq!(lines, vec!["S#1 L:734", "Temp: N/A", "Humid: 55.0 %"]);
    }

    #[test]
    fn lux_line_truncates_fraction() {
        let status = StationStatus::Ok(StationReading {
            lux: 99.7,
            ..StationReading::default()
        });

        let lines = station_lines(StationId::ONE, &status, &Thresholds::default());

        assert_eq!(lines[0], "S#1 L:99 !");
    }

    #[test]
    fn out_of_band_fields_are_marked() {
        let status = StationStatus::Ok(StationReading {
            temperature_c: Some(31.0),
            humidity: Some(50.0),
            lux: 50.0,
            pressure_hpa: Some(989.0),
            altitude_m: Some(203.7),
        });

        let lines = station_lines(StationId::TWO, &status, &Thresholds::default());

        assert_eq!(
            lines,
            vec![
                "S#2 L:50 !",
                "Temp: 31.0 C !",
                "Humid: 50.0 %",
                "P: 989.0 hPa",
                "Alt: 203.7 m",
            ]
        );
    }

    #[test]
    fn faulted_station_shows_error_line() {
        let status = StationStatus::Fault(SensorFault::Measurement(StationId::ONE, "crc".into()));
        let lines = station_lines(StationId::ONE, &status, &Thresholds::default());
        assert_eq!(lines.last().map(String::as_str), Some("Sensor error"));
        assert_eq!(lines[1], "Temp: N/A");
    }

    #[test]
    fn threshold_page_lists_all_bounds() {
        assert_eq!(
            threshold_lines(&Thresholds::default()),
            vec![
                "Thresholds",
                "T: 15.0-30.0 C",
                "H: 30.0-70.0 %",
                "L: 100-10000 lx",
            ]
        );
    }

    #[test]
    fn print_key_flips_mode() {
        assert_eq!(DisplayMode::default().toggled(), DisplayMode::Thresholds);
        assert_eq!(DisplayMode::Thresholds.toggled(), DisplayMode::Readings);
    }
}
