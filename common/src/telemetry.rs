use tracing::{debug, warn};

use crate::{
    error::TransportFault,
    ports::{self, Publisher},
    thresholds::Thresholds,
    topics::{station_topic, TOPIC_THRESHOLDS},
    types::{StationStatus, Switch, STATIONS},
};

pub const NOT_AVAILABLE: &str = "N/A";

fn one_decimal(value: Option<f32>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `[temp, humidity, lux, tap, (pressure, altitude)?]`
pub fn station_values(status: &StationStatus, tap: Switch) -> Vec<String> {
    let Some(reading) = status.reading() else {
        return vec![
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
            tap.as_str().to_string(),
        ];
    };

    let mut values = vec![
        one_decimal(reading.temperature_c),
        one_decimal(reading.humidity),
        format!("{}", reading.lux.trunc() as i64),
        tap.as_str().to_string(),
    ];
    if let (Some(pressure), Some(altitude)) = (reading.pressure_hpa, reading.altitude_m) {
        values.push(format!("{pressure:.1}"));
        values.push(format!("{altitude:.1}"));
    }
    values
}

pub fn threshold_values(thresholds: &Thresholds) -> Vec<String> {
    vec![
        format!("{:.1}", thresholds.temp_upper),
        format!("{:.1}", thresholds.temp_lower),
        format!("{:.1}", thresholds.humidity_upper),
        format!("{:.1}", thresholds.humidity_lower),
        format!("{}", thresholds.lux_upper.trunc() as i64),
        format!("{}", thresholds.lux_lower.trunc() as i64),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySummary {
    pub results: Vec<(&'static str, Result<(), TransportFault>)>,
}

impl TelemetrySummary {
    pub fn delivered(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, result)| result.is_ok())
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = (&'static str, &TransportFault)> {
        self.results
            .iter()
            .filter_map(|(topic, result)| result.as_ref().err().map(|err| (*topic, err)))
    }
}

/// Periodic station and threshold reports.
#[derive(Debug, Clone)]
pub struct TelemetryReporter {
    interval_ms: u64,
    last_delivered_ms: Option<u64>,
}

impl TelemetryReporter {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_delivered_ms: None,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        self.last_delivered_ms
            .map(|last| now_ms.saturating_sub(last) >= self.interval_ms)
            .unwrap_or(true)
    }

    /// Sends all three reports when due; `None` when the interval has not elapsed.
    ///
    /// A tick where nothing is delivered leaves the interval open, so the next
    /// loop retries.
    pub fn publish(
        &mut self,
        stations: &[StationStatus; 2],
        thresholds: &Thresholds,
        tap: Switch,
        publisher: &mut dyn Publisher,
        now_ms: u64,
    ) -> Option<TelemetrySummary> {
        if !self.is_due(now_ms) {
            return None;
        }

        let mut reports = Vec::with_capacity(STATIONS.len() + 1);
        for (station, status) in STATIONS.into_iter().zip(stations) {
            if let Some(topic) = station_topic(station) {
                reports.push((topic, station_values(status, tap)));
            }
        }
        reports.push((TOPIC_THRESHOLDS, threshold_values(thresholds)));

        let results = reports
            .into_iter()
            .map(|(topic, values)| {
                let result = ports::send(publisher, topic, &values);
                if let Err(err) = &result {
                    warn!("telemetry to {topic} failed: {err}");
                }
                (topic, result)
            })
            .collect();

        let summary = TelemetrySummary { results };
        if summary.delivered() > 0 {
            self.last_delivered_ms = Some(now_ms);
        }
        debug!(
            "telemetry delivered {}/{}",
            summary.delivered(),
            summary.results.len()
        );
        Some(summary)
    }
}
