//! Boundary traits between the control core and the rig's I/O.

use crate::{
    error::{SensorFault, TransportFault},
    remote::RemoteChannel,
    thresholds::Thresholds,
    types::{ActuatorState, StationId, StationSample},
};

pub const VALUE_DELIMITER: char = '#';

pub trait StationSensor {
    fn read_station(&mut self, station: StationId) -> Result<StationSample, SensorFault>;
}

pub trait Keypad {
    /// At most one key symbol per scan pass.
    fn scan(&mut self) -> Option<char>;
}

pub trait RemoteInbox {
    /// Latest undelivered message on `channel`, if any.
    fn fetch(&mut self, channel: RemoteChannel) -> Result<Option<String>, TransportFault>;
}

pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), TransportFault>;
    fn is_connected(&self) -> bool;
    /// Drop the current connection handle and start a fresh session.
    fn request_reconnect(&mut self);
    /// Close the session for good at teardown.
    fn disconnect(&mut self) {}
}

pub trait Display {
    fn render_station(&mut self, station: StationId, lines: &[String]);
    fn render_thresholds(&mut self, thresholds: &Thresholds, lines: &[String]);
    fn clear(&mut self, banner: &str);
}

pub trait Actuators {
    fn apply(&mut self, state: ActuatorState);
    fn tone(&mut self, frequency_hz: u32);
    fn silence(&mut self);
}

/// `#v1#v2#...#`
pub fn encode_values<S: AsRef<str>>(values: &[S]) -> String {
    let mut payload = String::from(VALUE_DELIMITER);
    for value in values {
        payload.push_str(value.as_ref());
        payload.push(VALUE_DELIMITER);
    }
    payload
}

pub fn send<S: AsRef<str>>(
    publisher: &mut dyn Publisher,
    topic: &str,
    values: &[S],
) -> Result<(), TransportFault> {
    if !publisher.is_connected() {
        return Err(TransportFault::NotConnected);
    }
    let result = publisher.publish(topic, encode_values(values));
    if result.is_err() {
        publisher.request_reconnect();
    }
    result
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::{HashMap, VecDeque};

    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingPublisher {
        pub sent: Vec<(String, String)>,
        pub offline: bool,
        pub fail_topics: Vec<&'static str>,
        pub reconnects: usize,
    }

    impl Publisher for RecordingPublisher {
        fn publish(&mut self, topic: &str, payload: String) -> Result<(), TransportFault> {
            if self.fail_topics.contains(&topic) {
                return Err(TransportFault::Send(format!("{topic} refused")));
            }
            self.sent.push((topic.to_string(), payload));
            Ok(())
        }

        fn is_connected(&self) -> bool {
            !self.offline
        }

        fn request_reconnect(&mut self) {
            self.reconnects += 1;
        }
    }

    impl RecordingPublisher {
        pub fn payloads(&self, topic: &str) -> Vec<String> {
            self.sent
                .iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, payload)| payload.clone())
                .collect()
        }
    }

    #[derive(Debug, Default)]
    pub struct ScriptedSensors {
        pub samples: HashMap<StationId, Result<StationSample, SensorFault>>,
    }

    impl StationSensor for ScriptedSensors {
        fn read_station(&mut self, station: StationId) -> Result<StationSample, SensorFault> {
            self.samples
                .get(&station)
                .cloned()
                .unwrap_or(Err(SensorFault::Missing(station)))
        }
    }

    #[derive(Debug, Default)]
    pub struct ScriptedKeypad {
        pub keys: VecDeque<char>,
    }

    impl Keypad for ScriptedKeypad {
        fn scan(&mut self) -> Option<char> {
            self.keys.pop_front()
        }
    }

    #[derive(Debug, Default)]
    pub struct ScriptedInbox {
        pub control: VecDeque<String>,
        pub threshold: VecDeque<String>,
        pub offline: bool,
    }

    impl RemoteInbox for ScriptedInbox {
        fn fetch(&mut self, channel: RemoteChannel) -> Result<Option<String>, TransportFault> {
            if self.offline {
                return Err(TransportFault::NotConnected);
            }
            Ok(match channel {
                RemoteChannel::Control => self.control.pop_front(),
                RemoteChannel::Threshold => self.threshold.pop_front(),
            })
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingDisplay {
        pub station_pages: Vec<(StationId, Vec<String>)>,
        pub threshold_pages: usize,
        pub banners: Vec<String>,
    }

    impl Display for RecordingDisplay {
        fn render_station(&mut self, station: StationId, lines: &[String]) {
            self.station_pages.push((station, lines.to_vec()));
        }

        fn render_thresholds(&mut self, _thresholds: &Thresholds, _lines: &[String]) {
            self.threshold_pages += 1;
        }

        fn clear(&mut self, banner: &str) {
            self.banners.push(banner.to_string());
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingActuators {
        pub applied: Vec<ActuatorState>,
        pub tones: Vec<u32>,
        pub silenced: usize,
    }

    impl Actuators for RecordingActuators {
        fn apply(&mut self, state: ActuatorState) {
            self.applied.push(state);
        }

        fn tone(&mut self, frequency_hz: u32) {
            self.tones.push(frequency_hz);
        }

        fn silence(&mut self) {
            self.silenced += 1;
        }
    }
}
