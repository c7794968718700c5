//! One control-loop iteration over the rig's ports.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    alarm::{AlarmSignaler, ReportOutcome, SignalStep},
    arbiter::{
        Actuator, AutoOutcome, CommandArbiter, CommandSource, KeypadOutcome, LeaseView,
        RemoteOutcome,
    },
    config::RuntimeConfig,
    display::{self, DisplayMode, BANNER_SHUTDOWN},
    evaluator::{self, AlarmCondition, AlarmKind},
    keypad::{key_action, KeyAction},
    lux::LuxModel,
    ports::{Actuators, Display, Keypad, Publisher, RemoteInbox, StationSensor},
    remote::{RemoteChannel, RemoteCommand, ThresholdMessage},
    telemetry::{TelemetryReporter, TelemetrySummary},
    thresholds::{ThresholdStore, Thresholds},
    types::{ActuatorState, StationId, StationReading, StationStatus, Switch, STATIONS},
};

/// Borrowed handles to everything the loop touches in one iteration.
pub struct Peripherals<'a> {
    pub sensors: &'a mut dyn StationSensor,
    pub keypad: &'a mut dyn Keypad,
    pub inbox: &'a mut dyn RemoteInbox,
    pub publisher: &'a mut dyn Publisher,
    pub display: &'a mut dyn Display,
    pub actuators: &'a mut dyn Actuators,
}

#[derive(Debug, Clone)]
pub struct ControllerState {
    pub thresholds: ThresholdStore,
    pub arbiter: CommandArbiter,
    pub display_mode: DisplayMode,
    pub stations: [StationStatus; 2],
    pub signaler: AlarmSignaler,
    pub telemetry: TelemetryReporter,
    pub conditions: BTreeSet<AlarmCondition>,
    pub link_up: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationView {
    pub id: StationId,
    pub reading: Option<StationReading>,
    pub fault: Option<String>,
}

/// Point-in-time view for concurrent readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub stations: Vec<StationView>,
    pub thresholds: Thresholds,
    pub actuators: ActuatorState,
    pub lock_holder: Option<CommandSource>,
    pub leases: LeaseView,
    pub display_mode: DisplayMode,
    pub alarms: Vec<AlarmCondition>,
    pub last_alarm_report: Option<String>,
    pub link_up: bool,
}

#[derive(Debug, Clone)]
pub struct Controller {
    lux: LuxModel,
    state: ControllerState,
}

impl Controller {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            lux: config.lux,
            state: ControllerState {
                thresholds: ThresholdStore::new(),
                arbiter: CommandArbiter::new(&config.control),
                display_mode: DisplayMode::default(),
                stations: [StationStatus::Pending, StationStatus::Pending],
                signaler: AlarmSignaler::new(&config.control),
                telemetry: TelemetryReporter::new(config.control.telemetry_interval_ms),
                conditions: BTreeSet::new(),
                link_up: false,
            },
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Runs one iteration and returns the alarm signal to play before the next.
    pub fn step(&mut self, io: &mut Peripherals<'_>, now_ms: u64) -> Vec<SignalStep> {
        self.track_link(&*io.publisher);

        let mut manual = self.poll_keypad(&mut *io.keypad, now_ms);
        manual |= self.poll_remote_control(&mut *io.inbox, now_ms);
        self.poll_remote_thresholds(&mut *io.inbox);

        self.read_stations(&mut *io.sensors);
        let thresholds = self.state.thresholds.snapshot();

        let mut conditions: BTreeSet<AlarmCondition> = STATIONS
            .iter()
            .zip(&self.state.stations)
            .flat_map(|(station, status)| evaluator::evaluate(status, &thresholds, *station))
            .collect();
        if manual {
            let trigger = AlarmCondition::new(StationId::PANEL, AlarmKind::ManualTrigger);
            conditions.insert(trigger);
        }

        let temperatures = [
            self.state.stations[0].temperature_c(),
            self.state.stations[1].temperature_c(),
        ];
        let arbiter = &mut self.state.arbiter;
        if arbiter.evaluate(temperatures, &thresholds, now_ms) == AutoOutcome::Interlock {
            debug!("over-temperature interlock active");
        }
        let actuators = arbiter.state();
        io.actuators.apply(actuators);

        let complete = self.state.stations.iter().all(StationStatus::is_complete);
        let signaler = &mut self.state.signaler;
        match signaler.report(&conditions, complete, &mut *io.publisher, now_ms) {
            ReportOutcome::Sent(message) => info!("alarm report: {message}"),
            ReportOutcome::Failed(_) => self.track_link(&*io.publisher),
            _ => {}
        }

        self.render(&mut *io.display, &thresholds);

        let steps = self.state.signaler.signal(&conditions, actuators.buzzer);
        self.state.conditions = conditions;
        steps
    }

    /// Second half of an iteration, run after the alarm signal has played.
    pub fn publish_telemetry(
        &mut self,
        publisher: &mut dyn Publisher,
        now_ms: u64,
    ) -> Option<TelemetrySummary> {
        let thresholds = self.state.thresholds.snapshot();
        let tap = self.state.arbiter.state().tap;
        let summary = self
            .state
            .telemetry
            .publish(&self.state.stations, &thresholds, tap, publisher, now_ms);
        self.track_link(publisher);
        summary
    }

    pub fn status(&self, now_ms: u64) -> StatusSnapshot {
        let stations = STATIONS
            .iter()
            .zip(&self.state.stations)
            .map(|(id, status)| StationView {
                id: *id,
                reading: status.reading().copied(),
                fault: match status {
                    StationStatus::Fault(fault) => Some(fault.to_string()),
                    _ => None,
                },
            })
            .collect();

        StatusSnapshot {
            stations,
            thresholds: self.state.thresholds.snapshot(),
            actuators: self.state.arbiter.state(),
            lock_holder: self.state.arbiter.lock_holder(now_ms),
            leases: self.state.arbiter.leases(now_ms),
            display_mode: self.state.display_mode,
            alarms: self.state.conditions.iter().copied().collect(),
            last_alarm_report: self.state.signaler.last_message().map(str::to_string),
            link_up: self.state.link_up,
        }
    }

    /// Quiet the buzzer, drive outputs safe and blank the panel.
    pub fn shutdown(&mut self, actuators: &mut dyn Actuators, panel: &mut dyn Display) {
        actuators.silence();
        actuators.apply(self.state.arbiter.shutdown());
        panel.clear(BANNER_SHUTDOWN);
        info!("outputs driven to safe state");
    }

    fn track_link(&mut self, publisher: &dyn Publisher) {
        let up = publisher.is_connected();
        if up != self.state.link_up {
            self.state.link_up = up;
            if up {
                info!("broker link up");
            } else {
                warn!("broker link down; reports paused until reconnect");
            }
        }
    }

    /// Returns true when the buzzer was switched on from the panel.
    fn poll_keypad(&mut self, keypad: &mut dyn Keypad, now_ms: u64) -> bool {
        let Some(symbol) = keypad.scan() else {
            return false;
        };
        let Some(action) = key_action(symbol) else {
            warn!("ignoring unmapped key {symbol:?}");
            return false;
        };

        match action {
            KeyAction::Adjust(param, direction) => {
                self.state.thresholds.adjust(param, direction);
            }
            KeyAction::Print => {
                self.state.display_mode = self.state.display_mode.toggled();
                debug!("display mode {:?}", self.state.display_mode);
            }
            KeyAction::Reset => {
                self.state.thresholds.reset();
            }
            KeyAction::Toggle(actuator) => {
                match self.state.arbiter.keypad_toggle(actuator, now_ms) {
                    KeypadOutcome::Toggled(Actuator::Buzzer, Switch::On) => return true,
                    KeypadOutcome::Toggled(..) => {}
                    KeypadOutcome::Debounced => debug!("keypad {symbol:?} debounced"),
                }
            }
        }
        false
    }

    fn poll_remote_control(&mut self, inbox: &mut dyn RemoteInbox, now_ms: u64) -> bool {
        let message = match inbox.fetch(RemoteChannel::Control) {
            Ok(Some(message)) => message,
            Ok(None) => return false,
            Err(err) => {
                debug!("control fetch skipped: {err}");
                return false;
            }
        };
        let command = match message.parse::<RemoteCommand>() {
            Ok(command) => command,
            Err(err) => {
                warn!("ignoring control message: {err}");
                return false;
            }
        };

        match self.state.arbiter.remote_command(command, now_ms) {
            RemoteOutcome::Applied(Actuator::Buzzer, Switch::On) => true,
            RemoteOutcome::Applied(..) | RemoteOutcome::Unchanged => false,
            RemoteOutcome::Blocked { remaining_ms } => {
                info!(
                    "remote {} blocked by keypad override ({remaining_ms} ms left)",
                    command.as_str()
                );
                false
            }
        }
    }

    fn poll_remote_thresholds(&mut self, inbox: &mut dyn RemoteInbox) {
        let message = match inbox.fetch(RemoteChannel::Threshold) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(err) => {
                debug!("threshold fetch skipped: {err}");
                return;
            }
        };

        match message.parse::<ThresholdMessage>() {
            Ok(ThresholdMessage::Set(param, value)) => {
                self.state.thresholds.set_absolute(param, value);
            }
            Ok(ThresholdMessage::Restore) => {
                self.state.thresholds.reset();
            }
            Err(err) => warn!("ignoring threshold message {message:?}: {err}"),
        }
    }

    fn read_stations(&mut self, sensors: &mut dyn StationSensor) {
        for (station, slot) in STATIONS.iter().zip(self.state.stations.iter_mut()) {
            *slot = match sensors.read_station(*station) {
                Ok(sample) => StationStatus::Ok(StationReading::from_sample(&sample, &self.lux)),
                Err(fault) => {
                    warn!(station = %station, "{fault}");
                    StationStatus::Fault(fault)
                }
            };
        }
    }

    fn render(&self, panel: &mut dyn Display, thresholds: &Thresholds) {
        match self.state.display_mode {
            DisplayMode::Readings => {
                for (station, status) in STATIONS.iter().zip(&self.state.stations) {
                    let lines = display::station_lines(*station, status, thresholds);
                    panel.render_station(*station, &lines);
                }
            }
            DisplayMode::Thresholds => {
                let lines = display::threshold_lines(thresholds);
                panel.render_thresholds(thresholds, &lines);
            }
        }
    }
}
