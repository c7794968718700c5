use serde::Serialize;
use tracing::info;

use crate::{
    config::ControlConfig,
    remote::RemoteCommand,
    thresholds::Thresholds,
    types::{ActuatorState, Switch},
};

/// Command sources, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandSource {
    Keypad,
    Remote,
    Automatic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Tap,
    Buzzer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypadOutcome {
    Toggled(Actuator, Switch),
    Debounced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    Applied(Actuator, Switch),
    Unchanged,
    Blocked { remaining_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOutcome {
    Interlock,
    Automatic,
    Held(CommandSource),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Lease {
    locked: bool,
    expires_ms: u64,
}

impl Lease {
    fn grant(&mut self, now_ms: u64, duration_ms: u64) {
        self.locked = true;
        self.expires_ms = now_ms.saturating_add(duration_ms);
    }

    fn holds(&self, now_ms: u64) -> bool {
        self.locked && now_ms < self.expires_ms
    }

    fn remaining_ms(&self, now_ms: u64) -> u64 {
        if self.locked {
            self.expires_ms.saturating_sub(now_ms)
        } else {
            0
        }
    }

    fn release(&mut self) {
        self.locked = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaseView {
    pub keypad_remaining_ms: u64,
    pub remote_remaining_ms: u64,
}

/// Merges keypad, remote and automatic control of the tap and buzzer.
///
/// Priority: over-temperature interlock, then a live keypad lease, then a
/// live remote lease, then automatic evaluation. Leases lapse on their own.
#[derive(Debug, Clone)]
pub struct CommandArbiter {
    keypad_debounce_ms: u64,
    keypad_override_ms: u64,
    remote_override_ms: u64,

    state: ActuatorState,
    keypad: Lease,
    remote: Lease,
    last_keypad_ms: Option<u64>,
}

impl CommandArbiter {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            keypad_debounce_ms: config.keypad_debounce_ms,
            keypad_override_ms: config.keypad_override_ms,
            remote_override_ms: config.remote_override_ms,
            state: ActuatorState::SAFE,
            keypad: Lease::default(),
            remote: Lease::default(),
            last_keypad_ms: None,
        }
    }

    pub fn state(&self) -> ActuatorState {
        self.state
    }

    /// Highest-priority source holding a live lease.
    pub fn lock_holder(&self, now_ms: u64) -> Option<CommandSource> {
        if self.keypad.holds(now_ms) {
            Some(CommandSource::Keypad)
        } else if self.remote.holds(now_ms) {
            Some(CommandSource::Remote)
        } else {
            None
        }
    }

    pub fn leases(&self, now_ms: u64) -> LeaseView {
        LeaseView {
            keypad_remaining_ms: self.keypad.remaining_ms(now_ms),
            remote_remaining_ms: self.remote.remaining_ms(now_ms),
        }
    }

    pub fn keypad_toggle(&mut self, actuator: Actuator, now_ms: u64) -> KeypadOutcome {
        if let Some(last) = self.last_keypad_ms {
            if now_ms.saturating_sub(last) < self.keypad_debounce_ms {
                return KeypadOutcome::Debounced;
            }
        }
        self.last_keypad_ms = Some(now_ms);

        let next = self.get(actuator).toggled();
        self.set(actuator, next, CommandSource::Keypad);
        self.keypad.grant(now_ms, self.keypad_override_ms);
        KeypadOutcome::Toggled(actuator, next)
    }

    pub fn remote_command(&mut self, command: RemoteCommand, now_ms: u64) -> RemoteOutcome {
        let (actuator, wanted) = match command {
            RemoteCommand::TapOn => (Actuator::Tap, Switch::On),
            RemoteCommand::TapOff => (Actuator::Tap, Switch::Off),
            RemoteCommand::BuzzerOn => (Actuator::Buzzer, Switch::On),
            RemoteCommand::BuzzerOff => (Actuator::Buzzer, Switch::Off),
        };

        if self.get(actuator) == wanted {
            return RemoteOutcome::Unchanged;
        }
        if self.keypad.holds(now_ms) {
            return RemoteOutcome::Blocked {
                remaining_ms: self.keypad.remaining_ms(now_ms),
            };
        }

        self.set(actuator, wanted, CommandSource::Remote);
        self.remote.grant(now_ms, self.remote_override_ms);
        RemoteOutcome::Applied(actuator, wanted)
    }

    /// Automatic control from both stations' temperatures; `None` is unknown.
    pub fn evaluate(
        &mut self,
        temperatures: [Option<f32>; 2],
        thresholds: &Thresholds,
        now_ms: u64,
    ) -> AutoOutcome {
        let over_temperature = temperatures
            .iter()
            .flatten()
            .any(|temp| *temp > thresholds.temp_upper);
        if over_temperature {
            self.set(Actuator::Tap, Switch::On, CommandSource::Automatic);
            self.set(Actuator::Buzzer, Switch::On, CommandSource::Automatic);
            return AutoOutcome::Interlock;
        }

        self.expire_leases(now_ms);
        if let Some(holder) = self.lock_holder(now_ms) {
            return AutoOutcome::Held(holder);
        }

        let band = thresholds.temp_lower..=thresholds.temp_upper;
        let all_in_band = temperatures
            .iter()
            .all(|temp| temp.is_some_and(|t| band.contains(&t)));
        let tap = if all_in_band { Switch::Off } else { Switch::On };
        self.set(Actuator::Tap, tap, CommandSource::Automatic);
        AutoOutcome::Automatic
    }

    pub fn shutdown(&mut self) -> ActuatorState {
        self.keypad.release();
        self.remote.release();
        self.state = ActuatorState::SAFE;
        self.state
    }

    fn expire_leases(&mut self, now_ms: u64) {
        for (lease, source) in [
            (&mut self.keypad, CommandSource::Keypad),
            (&mut self.remote, CommandSource::Remote),
        ] {
            if lease.locked && !lease.holds(now_ms) {
                lease.release();
                info!("{source:?} override expired; automatic control resumes");
            }
        }
    }

    fn get(&self, actuator: Actuator) -> Switch {
        match actuator {
            Actuator::Tap => self.state.tap,
            Actuator::Buzzer => self.state.buzzer,
        }
    }

    fn set(&mut self, actuator: Actuator, value: Switch, source: CommandSource) {
        let slot = match actuator {
            Actuator::Tap => &mut self.state.tap,
            Actuator::Buzzer => &mut self.state.buzzer,
        };
        if *slot != value {
            *slot = value;
            info!("{actuator:?} -> {} ({source:?})", value.as_str());
        }
    }
}
