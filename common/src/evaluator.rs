use std::{collections::BTreeSet, fmt};

use serde::Serialize;

use crate::{
    thresholds::Thresholds,
    types::{StationId, StationReading, StationStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmKind {
    TempHigh,
    TempLow,
    HumidityHigh,
    HumidityLow,
    LightLow,
    LightHigh,
    SensorError,
    ManualTrigger,
}

impl AlarmKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TempHigh => "TEMP_HIGH",
            Self::TempLow => "TEMP_LOW",
            Self::HumidityHigh => "HUMIDITY_HIGH",
            Self::HumidityLow => "HUMIDITY_LOW",
            Self::LightLow => "LIGHT_LOW",
            Self::LightHigh => "LIGHT_HIGH",
            Self::SensorError => "SENSOR_ERROR",
            Self::ManualTrigger => "MANUAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AlarmCondition {
    pub station: StationId,
    pub kind: AlarmKind,
}

impl AlarmCondition {
    pub fn new(station: StationId, kind: AlarmKind) -> Self {
        Self { station, kind }
    }
}

impl fmt::Display for AlarmCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.station, self.kind.as_str())
    }
}

/// Which fields of a reading sit outside their band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutOfBand {
    pub temperature: bool,
    pub humidity: bool,
    pub lux: bool,
}

pub fn out_of_band(reading: &StationReading, thresholds: &Thresholds) -> OutOfBand {
    let outside = |value: f32, lower: f32, upper: f32| band_kind(value, lower, upper).is_some();
    OutOfBand {
        temperature: reading
            .temperature_c
            .is_some_and(|v| outside(v, thresholds.temp_lower, thresholds.temp_upper)),
        humidity: reading
            .humidity
            .is_some_and(|v| outside(v, thresholds.humidity_lower, thresholds.humidity_upper)),
        lux: outside(reading.lux, thresholds.lux_lower, thresholds.lux_upper),
    }
}

/// Alarm conditions raised by one station for this cycle.
///
/// A faulted read yields only `SensorError`; stale or partial data must not
/// raise threshold alarms. Unknown optional fields are skipped.
pub fn evaluate(
    status: &StationStatus,
    thresholds: &Thresholds,
    station: StationId,
) -> BTreeSet<AlarmCondition> {
    let mut conditions = BTreeSet::new();
    let reading = match status {
        StationStatus::Pending => return conditions,
        StationStatus::Fault(_) => {
            conditions.insert(AlarmCondition::new(station, AlarmKind::SensorError));
            return conditions;
        }
        StationStatus::Ok(reading) => reading,
    };

    let mut raise = |band: Option<Band>, high: AlarmKind, low: AlarmKind| {
        let kind = match band {
            Some(Band::High) => high,
            Some(Band::Low) => low,
            None => return,
        };
        conditions.insert(AlarmCondition::new(station, kind));
    };

    if let Some(temp) = reading.temperature_c {
        let band = band_kind(temp, thresholds.temp_lower, thresholds.temp_upper);
        raise(band, AlarmKind::TempHigh, AlarmKind::TempLow);
    }
    if let Some(humidity) = reading.humidity {
        let (lower, upper) = (thresholds.humidity_lower, thresholds.humidity_upper);
        let band = band_kind(humidity, lower, upper);
        raise(band, AlarmKind::HumidityHigh, AlarmKind::HumidityLow);
    }
    let band = band_kind(reading.lux, thresholds.lux_lower, thresholds.lux_upper);
    raise(band, AlarmKind::LightHigh, AlarmKind::LightLow);

    conditions
}

enum Band {
    High,
    Low,
}

fn band_kind(value: f32, lower: f32, upper: f32) -> Option<Band> {
    if value > upper {
        Some(Band::High)
    } else if value < lower {
        Some(Band::Low)
    } else {
        None
    }
}
