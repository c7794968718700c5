use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::error::ConfigFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdParam {
    TempUpper,
    TempLower,
    HumidityUpper,
    HumidityLower,
    LuxUpper,
    LuxLower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Clamp range, step and default of one bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl ThresholdParam {
    pub const ALL: [Self; 6] = [
        Self::TempUpper,
        Self::TempLower,
        Self::HumidityUpper,
        Self::HumidityLower,
        Self::LuxUpper,
        Self::LuxLower,
    ];

    pub fn limits(self) -> Limits {
        let (min, max, step, default) = match self {
            Self::TempUpper => (10.0, 50.0, 1.0, 30.0),
            Self::TempLower => (5.0, 30.0, 1.0, 15.0),
            Self::HumidityUpper => (20.0, 95.0, 5.0, 70.0),
            Self::HumidityLower => (10.0, 80.0, 5.0, 30.0),
            Self::LuxUpper => (500.0, 20_000.0, 1_000.0, 10_000.0),
            Self::LuxLower => (100.0, 5_000.0, 100.0, 100.0),
        };
        Limits {
            min,
            max,
            step,
            default,
        }
    }

    /// The other bound of the same band.
    pub fn paired(self) -> Self {
        match self {
            Self::TempUpper => Self::TempLower,
            Self::TempLower => Self::TempUpper,
            Self::HumidityUpper => Self::HumidityLower,
            Self::HumidityLower => Self::HumidityUpper,
            Self::LuxUpper => Self::LuxLower,
            Self::LuxLower => Self::LuxUpper,
        }
    }

    pub fn is_upper(self) -> bool {
        matches!(self, Self::TempUpper | Self::HumidityUpper | Self::LuxUpper)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TempUpper => "TEMP_UPPER",
            Self::TempLower => "TEMP_LOWER",
            Self::HumidityUpper => "HUMIDITY_UPPER",
            Self::HumidityLower => "HUMIDITY_LOWER",
            Self::LuxUpper => "LUX_UPPER",
            Self::LuxLower => "LUX_LOWER",
        }
    }

    /// Name used by the remote threshold channel.
    pub fn remote_name(self) -> &'static str {
        match self {
            Self::TempUpper => "SETTEMPUPPER",
            Self::TempLower => "SETTEMPLOWER",
            Self::HumidityUpper => "SETHUMIDUPPER",
            Self::HumidityLower => "SETHUMIDLOWER",
            Self::LuxUpper => "SETLIGHTUPPER",
            Self::LuxLower => "SETLIGHTLOWER",
        }
    }

    pub fn from_remote_name(name: &str) -> Result<Self, ConfigFault> {
        Self::ALL
            .into_iter()
            .find(|param| param.remote_name() == name)
            .ok_or_else(|| ConfigFault::UnknownParameter(name.to_string()))
    }
}

impl FromStr for ThresholdParam {
    type Err = ConfigFault;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|param| param.as_str() == name)
            .ok_or_else(|| ConfigFault::UnknownParameter(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    #[serde(rename = "tempUpper")]
    pub temp_upper: f32,
    #[serde(rename = "tempLower")]
    pub temp_lower: f32,
    #[serde(rename = "humidityUpper")]
    pub humidity_upper: f32,
    #[serde(rename = "humidityLower")]
    pub humidity_lower: f32,
    #[serde(rename = "luxUpper")]
    pub lux_upper: f32,
    #[serde(rename = "luxLower")]
    pub lux_lower: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temp_upper: ThresholdParam::TempUpper.limits().default,
            temp_lower: ThresholdParam::TempLower.limits().default,
            humidity_upper: ThresholdParam::HumidityUpper.limits().default,
            humidity_lower: ThresholdParam::HumidityLower.limits().default,
            lux_upper: ThresholdParam::LuxUpper.limits().default,
            lux_lower: ThresholdParam::LuxLower.limits().default,
        }
    }
}

impl Thresholds {
    pub fn get(&self, param: ThresholdParam) -> f32 {
        match param {
            ThresholdParam::TempUpper => self.temp_upper,
            ThresholdParam::TempLower => self.temp_lower,
            ThresholdParam::HumidityUpper => self.humidity_upper,
            ThresholdParam::HumidityLower => self.humidity_lower,
            ThresholdParam::LuxUpper => self.lux_upper,
            ThresholdParam::LuxLower => self.lux_lower,
        }
    }

    fn slot(&mut self, param: ThresholdParam) -> &mut f32 {
        match param {
            ThresholdParam::TempUpper => &mut self.temp_upper,
            ThresholdParam::TempLower => &mut self.temp_lower,
            ThresholdParam::HumidityUpper => &mut self.humidity_upper,
            ThresholdParam::HumidityLower => &mut self.humidity_lower,
            ThresholdParam::LuxUpper => &mut self.lux_upper,
            ThresholdParam::LuxLower => &mut self.lux_lower,
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.temp_upper >= self.temp_lower
            && self.humidity_upper >= self.humidity_lower
            && self.lux_upper >= self.lux_lower
    }
}

/// Mutable bounds; every write keeps `upper >= lower` for each band.
#[derive(Debug, Clone, Default)]
pub struct ThresholdStore {
    values: Thresholds,
}

impl ThresholdStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Thresholds {
        self.values
    }

    pub fn get(&self, param: ThresholdParam) -> f32 {
        self.values.get(param)
    }

    pub fn adjust(&mut self, param: ThresholdParam, direction: Direction) -> bool {
        let step = param.limits().step;
        let target = match direction {
            Direction::Up => self.get(param) + step,
            Direction::Down => self.get(param) - step,
        };
        self.write(param, target)
    }

    pub fn adjust_named(&mut self, name: &str, direction: Direction) -> Result<bool, ConfigFault> {
        let param = name.parse::<ThresholdParam>()?;
        Ok(self.adjust(param, direction))
    }

    pub fn set_absolute(&mut self, param: ThresholdParam, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.write(param, value)
    }

    pub fn reset(&mut self) -> bool {
        let defaults = Thresholds::default();
        let changed = self.values != defaults;
        self.values = defaults;
        info!("thresholds restored to defaults");
        changed
    }

    fn write(&mut self, param: ThresholdParam, value: f32) -> bool {
        let before = self.values;
        let limits = param.limits();
        let written = value.clamp(limits.min, limits.max);
        *self.values.slot(param) = written;

        let paired = param.paired();
        if !self.band_ordered(param) {
            let paired_limits = paired.limits();
            *self.values.slot(paired) = written.clamp(paired_limits.min, paired_limits.max);
            if !self.band_ordered(param) {
                // Paired range cannot follow; pin the written bound instead.
                *self.values.slot(param) = self.get(paired);
            }
        }

        let changed = self.values != before;
        if changed {
            info!(
                "{} = {}, {} = {}",
                param.as_str(),
                self.get(param),
                paired.as_str(),
                self.get(paired)
            );
        }
        changed
    }

    fn band_ordered(&self, param: ThresholdParam) -> bool {
        let (upper, lower) = if param.is_upper() {
            (param, param.paired())
        } else {
            (param.paired(), param)
        };
        self.get(upper) >= self.get(lower)
    }
}
