//! Host stand-ins for the rig's hardware: two simulated stations, a keypad fed
//! from stdin, and display/actuator outputs that log instead of drive pins.

use std::{collections::HashMap, io::BufRead, thread};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use envrig_common::{
    config::SimulationConfig,
    ports::{Actuators, Display, Keypad, StationSensor},
    ActuatorState, SensorFault, StationId, StationSample, Thresholds,
};

/// Slow sinusoidal drift around the configured baselines.
///
/// Station two carries the barometer. Every `fault_every`th read of a station
/// fails so the error path can be exercised without hardware.
#[derive(Debug, Clone)]
pub struct SimulatedStations {
    config: SimulationConfig,
    reads: [u64; 2],
}

impl SimulatedStations {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            reads: [0; 2],
        }
    }
}

impl StationSensor for SimulatedStations {
    fn read_station(&mut self, station: StationId) -> Result<StationSample, SensorFault> {
        let index = match station {
            StationId::ONE => 0,
            StationId::TWO => 1,
            other => return Err(SensorFault::Missing(other)),
        };
        self.reads[index] += 1;
        let count = self.reads[index];

        if self.config.fault_every > 0 && count % self.config.fault_every == 0 {
            return Err(SensorFault::Measurement(
                station,
                "no response from sensor".to_string(),
            ));
        }

        let phase = count as f32 / 30.0 + index as f32;
        let base_light = self.config.base_light_raw[index] as f32;
        let light_raw = (base_light + 150.0 * phase.cos()).max(0.0);
        let temperature = self.config.base_temp_c[index] + 1.5 * phase.sin();
        let humidity = self.config.base_humidity[index] + 4.0 * phase.cos();
        Ok(StationSample {
            temperature_c: Some(temperature),
            humidity: Some(humidity.clamp(0.0, 100.0)),
            light_raw: light_raw as u32,
            pressure_hpa: (station == StationId::TWO)
                .then(|| self.config.base_pressure_hpa + 0.5 * phase.sin()),
        })
    }
}

/// Keypad symbols typed on stdin, one per scan.
///
/// Reads on a plain thread so a pending read never holds up runtime shutdown.
pub struct StdinKeypad {
    keys: mpsc::Receiver<char>,
}

impl StdinKeypad {
    pub fn spawn() -> Self {
        let (tx, keys) = mpsc::channel(16);
        let spawned = thread::Builder::new()
            .name("keypad".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(err) => {
                            warn!("keypad read failed: {err}");
                            return;
                        }
                    };
                    for symbol in line.chars().filter(|c| !c.is_whitespace()) {
                        if tx.try_send(symbol.to_ascii_uppercase()).is_err() {
                            debug!("keypad buffer full; dropping {symbol:?}");
                        }
                    }
                }
                debug!("stdin closed; keypad idle");
            });
        if let Err(err) = spawned {
            warn!("keypad unavailable: {err}");
        }
        Self { keys }
    }
}

impl Keypad for StdinKeypad {
    fn scan(&mut self) -> Option<char> {
        self.keys.try_recv().ok()
    }
}

/// Logs each page once, when its contents change.
#[derive(Debug, Default)]
pub struct LogDisplay {
    pages: HashMap<StationId, Vec<String>>,
    thresholds: Option<Vec<String>>,
}

impl Display for LogDisplay {
    fn render_station(&mut self, station: StationId, lines: &[String]) {
        if self.pages.get(&station).map(Vec::as_slice) != Some(lines) {
            info!(station = %station, "display: {}", lines.join(" | "));
            self.pages.insert(station, lines.to_vec());
        }
        self.thresholds = None;
    }

    fn render_thresholds(&mut self, _thresholds: &Thresholds, lines: &[String]) {
        if self.thresholds.as_deref() != Some(lines) {
            info!("display: {}", lines.join(" | "));
            self.thresholds = Some(lines.to_vec());
        }
        self.pages.clear();
    }

    fn clear(&mut self, banner: &str) {
        self.pages.clear();
        self.thresholds = None;
        info!("display: {banner}");
    }
}

#[derive(Debug, Default)]
pub struct LogActuators {
    last: Option<ActuatorState>,
}

impl Actuators for LogActuators {
    fn apply(&mut self, state: ActuatorState) {
        if self.last != Some(state) {
            let (tap, buzzer) = (state.tap.as_str(), state.buzzer.as_str());
            info!("outputs: tap {tap} buzzer {buzzer}");
            self.last = Some(state);
        }
    }

    fn tone(&mut self, frequency_hz: u32) {
        debug!("buzzer tone {frequency_hz} Hz");
    }

    fn silence(&mut self) {
        debug!("buzzer silent");
    }
}
