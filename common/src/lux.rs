//! Photoresistor (LDR) illuminance estimate from a voltage-divider ADC read.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigFault;

pub const MAX_LUX: f32 = 100_000.0;

/// Readings this close to the supply rail are treated as a saturated sensor.
const SATURATION_MARGIN_V: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LuxModel {
    pub vcc: f32,
    pub adc_max: u32,
    pub gamma: f32,
    /// LDR resistance at 10 lux, in kΩ.
    pub rl10: f32,
    pub load_resistor_ohms: f32,
}

impl Default for LuxModel {
    fn default() -> Self {
        Self {
            vcc: 3.3,
            adc_max: 4095,
            gamma: 0.7,
            rl10: 50.0,
            load_resistor_ohms: 10_000.0,
        }
    }
}

impl LuxModel {
    pub fn estimate(&self, raw_adc: u32) -> f32 {
        estimate_lux(
            raw_adc,
            self.vcc,
            self.adc_max,
            self.gamma,
            self.rl10,
            self.load_resistor_ohms,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigFault> {
        let positive = [
            ("lux.vcc", self.vcc),
            ("lux.gamma", self.gamma),
            ("lux.rl10", self.rl10),
            ("lux.load_resistor_ohms", self.load_resistor_ohms),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigFault::Invalid {
                    name,
                    reason: format!("must be a positive number, got {value}"),
                });
            }
        }
        if self.adc_max == 0 {
            return Err(ConfigFault::Invalid {
                name: "lux.adc_max",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

pub fn estimate_lux(
    raw_adc: u32,
    vcc: f32,
    adc_max: u32,
    gamma: f32,
    rl10: f32,
    load_resistor_ohms: f32,
) -> f32 {
    if raw_adc == 0 || adc_max == 0 {
        return 0.0;
    }

    let voltage = raw_adc as f32 / adc_max as f32 * vcc;
    if voltage >= vcc - SATURATION_MARGIN_V {
        return 0.0;
    }

    let resistance = load_resistor_ohms * voltage / (vcc - voltage);
    if !resistance.is_finite() || resistance <= 0.0 {
        warn!("lux estimate failed for raw={raw_adc} (R={resistance:.1} ohm)");
        return 0.0;
    }

    let lux = (rl10 * 1000.0 * 10f32.powf(gamma) / resistance).powf(1.0 / gamma);
    if lux.is_nan() || lux < 0.0 {
        warn!("lux estimate failed for raw={raw_adc} (R={resistance:.1} ohm, gamma={gamma})");
        return 0.0;
    }

    lux.min(MAX_LUX)
}
