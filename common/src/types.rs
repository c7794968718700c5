use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::SensorFault, lux::LuxModel};

const SEA_LEVEL_HPA: f32 = 1013.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub u8);

impl StationId {
    /// The keypad/display panel; used for conditions no station produced.
    pub const PANEL: Self = Self(0);
    pub const ONE: Self = Self(1);
    pub const TWO: Self = Self(2);
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const STATIONS: [StationId; 2] = [StationId::ONE, StationId::TWO];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    Off,
    On,
}

impl Switch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub tap: Switch,
    pub buzzer: Switch,
}

impl ActuatorState {
    pub const SAFE: Self = Self {
        tap: Switch::Off,
        buzzer: Switch::Off,
    };
}

impl Default for ActuatorState {
    fn default() -> Self {
        Self::SAFE
    }
}

/// Raw values handed over by a station's drivers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StationSample {
    pub temperature_c: Option<f32>,
    pub humidity: Option<f32>,
    pub light_raw: u32,
    pub pressure_hpa: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StationReading {
    #[serde(rename = "temperatureC")]
    pub temperature_c: Option<f32>,
    pub humidity: Option<f32>,
    pub lux: f32,
    #[serde(rename = "pressureHpa")]
    pub pressure_hpa: Option<f32>,
    #[serde(rename = "altitudeM")]
    pub altitude_m: Option<f32>,
}

impl StationReading {
    pub fn from_sample(sample: &StationSample, lux: &LuxModel) -> Self {
        let pressure_hpa = sample
            .pressure_hpa
            .filter(|pressure| pressure.is_finite() && *pressure > 0.0);
        Self {
            temperature_c: sample.temperature_c.filter(|t| t.is_finite()),
            humidity: sample.humidity.filter(|h| h.is_finite()),
            lux: lux.estimate(sample.light_raw),
            pressure_hpa,
            altitude_m: pressure_hpa.map(altitude_from_pressure),
        }
    }
}

/// Outcome of the latest read of one station.
#[derive(Debug, Clone, PartialEq)]
pub enum StationStatus {
    Pending,
    Ok(StationReading),
    Fault(SensorFault),
}

impl StationStatus {
    pub fn reading(&self) -> Option<&StationReading> {
        match self {
            Self::Ok(reading) => Some(reading),
            _ => None,
        }
    }

    pub fn temperature_c(&self) -> Option<f32> {
        self.reading().and_then(|reading| reading.temperature_c)
    }

    /// Temperature and humidity both known.
    pub fn is_complete(&self) -> bool {
        self.reading()
            .map(|reading| reading.temperature_c.is_some() && reading.humidity.is_some())
            .unwrap_or(false)
    }
}

/// International barometric formula, standard atmosphere.
pub fn altitude_from_pressure(pressure_hpa: f32) -> f32 {
    44_330.0 * (1.0 - (pressure_hpa / SEA_LEVEL_HPA).powf(1.0 / 5.255))
}
