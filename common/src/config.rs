use serde::{Deserialize, Serialize};

use crate::{error::ConfigFault, lux::LuxModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub loop_interval_ms: u64,
    pub keypad_debounce_ms: u64,
    pub keypad_override_ms: u64,
    pub remote_override_ms: u64,
    pub telemetry_interval_ms: u64,
    pub alarm_min_interval_ms: u64,
    pub alarm_repeat_interval_ms: u64,
    /// Grace period at shutdown for the offline status and disconnect to reach the broker.
    pub shutdown_flush_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: 1_000,
            keypad_debounce_ms: 50,
            keypad_override_ms: 60_000,
            remote_override_ms: 60_000,
            telemetry_interval_ms: 5_000,
            alarm_min_interval_ms: 10_000,
            alarm_repeat_interval_ms: 60_000,
            shutdown_flush_ms: 500,
        }
    }
}

impl ControlConfig {
    pub fn sanitize(&mut self) {
        self.loop_interval_ms = self.loop_interval_ms.clamp(50, 60_000);
        self.shutdown_flush_ms = self.shutdown_flush_ms.clamp(10, 10_000);
        let floor = self.alarm_min_interval_ms;
        self.alarm_repeat_interval_ms = self.alarm_repeat_interval_ms.max(floor);
    }

    pub fn validate(&self) -> Result<(), ConfigFault> {
        if self.keypad_debounce_ms >= self.loop_interval_ms {
            return Err(ConfigFault::Invalid {
                name: "control.keypad_debounce_ms",
                reason: format!(
                    "{} ms must be shorter than the loop interval ({} ms)",
                    self.keypad_debounce_ms, self.loop_interval_ms
                ),
            });
        }
        if self.keypad_override_ms == 0 || self.remote_override_ms == 0 {
            return Err(ConfigFault::Invalid {
                name: "control.*_override_ms",
                reason: "override leases must be non-zero".to_string(),
            });
        }
        if self.telemetry_interval_ms == 0 || self.alarm_min_interval_ms == 0 {
            return Err(ConfigFault::Invalid {
                name: "control.*_interval_ms",
                reason: "report intervals must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub client_id: String,
    pub http_port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            client_id: "envrig-controller".to_string(),
            http_port: 8080,
        }
    }
}

/// Knobs for the host build's simulated stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub base_temp_c: [f32; 2],
    pub base_humidity: [f32; 2],
    pub base_light_raw: [u32; 2],
    /// Station two carries a barometer; station one does not.
    pub base_pressure_hpa: f32,
    /// Every Nth read of a station fails; 0 disables fault injection.
    pub fault_every: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_temp_c: [24.5, 25.0],
            base_humidity: [62.0, 58.0],
            base_light_raw: [2_000, 1_900],
            base_pressure_hpa: 989.0,
            fault_every: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub control: ControlConfig,
    pub lux: LuxModel,
    pub network: NetworkConfig,
    pub simulation: SimulationConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.control.sanitize();
    }

    pub fn validate(&self) -> Result<(), ConfigFault> {
        self.control.validate()?;
        self.lux.validate()?;
        if self.network.mqtt_host.trim().is_empty() {
            return Err(ConfigFault::Invalid {
                name: "network.mqtt_host",
                reason: "cannot be empty".to_string(),
            });
        }
        if self.network.mqtt_port == 0 {
            return Err(ConfigFault::Invalid {
                name: "network.mqtt_port",
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        Ok(())
    }
}
