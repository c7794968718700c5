pub mod alarm;
pub mod arbiter;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod evaluator;
pub mod keypad;
pub mod lux;
pub mod ports;
pub mod remote;
pub mod telemetry;
pub mod thresholds;
pub mod topics;
pub mod types;

pub use alarm::{AlarmSignaler, Pattern, ReportOutcome, SignalStep};
pub use arbiter::{Actuator, CommandArbiter, CommandSource};
pub use config::{ControlConfig, NetworkConfig, RuntimeConfig, SimulationConfig};
pub use controller::{Controller, ControllerState, Peripherals, StatusSnapshot};
pub use display::DisplayMode;
pub use error::{ConfigFault, ParseFault, RemoteFault, SensorFault, TransportFault};
pub use evaluator::{AlarmCondition, AlarmKind};
pub use lux::LuxModel;
pub use remote::{RemoteChannel, RemoteCommand, ThresholdMessage};
pub use thresholds::{Direction, ThresholdParam, ThresholdStore, Thresholds};
pub use topics::*;
pub use types::{ActuatorState, StationId, StationReading, StationSample, StationStatus, Switch};
