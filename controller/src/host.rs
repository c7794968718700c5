use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{net::TcpListener, sync::watch, time::MissedTickBehavior};
use tracing::{info, warn};

use envrig_common::{
    config::NetworkConfig,
    ports::{Actuators, Display, Keypad, Publisher, RemoteInbox, StationSensor},
    Controller, Peripherals, RuntimeConfig, SignalStep, StatusSnapshot,
};

use crate::{
    mqtt,
    sim::{LogActuators, LogDisplay, SimulatedStations, StdinKeypad},
};

const DEFAULT_CONFIG_PATH: &str = "./envrig.json";

#[derive(Clone)]
struct AppState {
    status: watch::Receiver<StatusSnapshot>,
    started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    #[serde(rename = "generatedAt")]
    generated_at: String,
    #[serde(rename = "uptimeSeconds")]
    uptime_seconds: i64,
    #[serde(flatten)]
    snapshot: StatusSnapshot,
}

/// Everything the control loop drives. Dropping it leaves the rig safe.
struct Rig {
    controller: Controller,
    sensors: Box<dyn StationSensor>,
    keypad: Box<dyn Keypad>,
    inbox: Box<dyn RemoteInbox>,
    publisher: Box<dyn Publisher>,
    display: Box<dyn Display>,
    actuators: Box<dyn Actuators>,
}

impl Rig {
    fn step(&mut self, now_ms: u64) -> Vec<SignalStep> {
        let mut io = Peripherals {
            sensors: &mut *self.sensors,
            keypad: &mut *self.keypad,
            inbox: &mut *self.inbox,
            publisher: &mut *self.publisher,
            display: &mut *self.display,
            actuators: &mut *self.actuators,
        };
        self.controller.step(&mut io, now_ms)
    }
}

impl Drop for Rig {
    fn drop(&mut self) {
        self.controller
            .shutdown(&mut *self.actuators, &mut *self.display);
        self.publisher.disconnect();
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config().await?;
    let (publisher, inbox) = mqtt::connect(&config.network);

    let mut rig = Rig {
        controller: Controller::new(&config),
        sensors: Box::new(SimulatedStations::new(config.simulation.clone())),
        keypad: Box::new(StdinKeypad::spawn()),
        inbox: Box::new(inbox),
        publisher: Box::new(publisher),
        display: Box::new(LogDisplay::default()),
        actuators: Box::new(LogActuators::default()),
    };

    let (status_tx, status_rx) = watch::channel(rig.controller.status(monotonic_ms()));
    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/thresholds", get(handle_get_thresholds))
        .with_state(AppState {
            status: status_rx,
            started_at: Utc::now(),
        });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.network.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status server at {addr}"))?;
    info!("status api listening on http://{addr}");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!("status api stopped: {err}");
        }
    });

    tokio::select! {
        _ = control_loop(&mut rig, &status_tx, config.control.loop_interval_ms) => {}
        _ = shutdown_signal() => info!("shutdown requested"),
    }

    drop(rig);
    // Let the event loop flush the offline status and disconnect.
    let flush = Duration::from_millis(config.control.shutdown_flush_ms);
    tokio::time::sleep(flush).await;
    Ok(())
}

async fn control_loop(rig: &mut Rig, status: &watch::Sender<StatusSnapshot>, interval_ms: u64) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let now_ms = monotonic_ms();

        let steps = rig.step(now_ms);
        if !steps.is_empty() {
            play_signal(&mut *rig.actuators, steps).await;
        }

        let now_ms = monotonic_ms();
        let publisher = &mut *rig.publisher;
        if let Some(summary) = rig.controller.publish_telemetry(publisher, now_ms) {
            for (topic, err) in summary.failed() {
                info!("telemetry to {topic} will retry: {err}");
            }
        }
        status.send_replace(rig.controller.status(now_ms));
    }
}

async fn play_signal(actuators: &mut dyn Actuators, steps: Vec<SignalStep>) {
    for step in steps {
        match step {
            SignalStep::Tone {
                frequency_hz,
                duration_ms,
            } => {
                actuators.tone(frequency_hz);
                tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                actuators.silence();
            }
            SignalStep::Pause(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler unavailable: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("SIGTERM handler unavailable: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();
    Json(StatusResponse {
        generated_at: now.to_rfc3339(),
        uptime_seconds: (now - state.started_at).num_seconds(),
        snapshot: state.status.borrow().clone(),
    })
}

async fn handle_get_thresholds(State(state): State<AppState>) -> impl IntoResponse {
    let thresholds = state.status.borrow().thresholds;
    Json(thresholds)
}

async fn load_config() -> anyhow::Result<RuntimeConfig> {
    let path = std::env::var("ENVRIG_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = read_config_file(&path).await?;
    apply_env_overrides(&mut config.network, |name| std::env::var(name).ok());
    config.sanitize();
    config
        .validate()
        .with_context(|| format!("rejected configuration from {}", path.display()))?;
    Ok(config)
}

async fn read_config_file(path: &Path) -> anyhow::Result<RuntimeConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("no config at {}; using defaults", path.display());
            Ok(RuntimeConfig::default())
        }
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn apply_env_overrides(network: &mut NetworkConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("MQTT_HOST") {
        network.mqtt_host = host;
    }
    if let Some(port) = var("MQTT_PORT").and_then(|value| value.parse::<u16>().ok()) {
        network.mqtt_port = port;
    }
    if let Some(user) = var("MQTT_USER") {
        network.mqtt_user = user;
    }
    if let Some(pass) = var("MQTT_PASS") {
        network.mqtt_pass = pass;
    }
    if let Some(port) = var("ENVRIG_HTTP_PORT").and_then(|value| value.parse::<u16>().ok()) {
        network.http_port = port;
    }
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        panic::{self, AssertUnwindSafe},
        sync::{Arc, Mutex},
    };

    use super::*;
    use envrig_common::{
        ActuatorState, RemoteChannel, SensorFault, StationId, StationSample, Thresholds,
        TransportFault,
    };
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct Journal {
        applied: Vec<ActuatorState>,
        silenced: usize,
        banners: Vec<String>,
        disconnected: bool,
    }

    /// Inert inputs plus recording outputs, shared through one journal.
    #[derive(Clone, Default)]
    struct Bench {
        journal: Arc<Mutex<Journal>>,
    }

    impl Bench {
        fn rig(&self) -> Rig {
            Rig {
                controller: Controller::new(&RuntimeConfig::default()),
                sensors: Box::new(self.clone()),
                keypad: Box::new(self.clone()),
                inbox: Box::new(self.clone()),
                publisher: Box::new(self.clone()),
                display: Box::new(self.clone()),
                actuators: Box::new(self.clone()),
            }
        }
    }

    impl StationSensor for Bench {
        fn read_station(&mut self, station: StationId) -> Result<StationSample, SensorFault> {
            Err(SensorFault::Missing(station))
        }
    }

    impl Keypad for Bench {
        fn scan(&mut self) -> Option<char> {
            None
        }
    }

    impl RemoteInbox for Bench {
        fn fetch(&mut self, _channel: RemoteChannel) -> Result<Option<String>, TransportFault> {
            Ok(None)
        }
    }

    impl Publisher for Bench {
        fn publish(&mut self, _topic: &str, _payload: String) -> Result<(), TransportFault> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn request_reconnect(&mut self) {}

        fn disconnect(&mut self) {
            self.journal.lock().unwrap().disconnected = true;
        }
    }

    impl Display for Bench {
        fn render_station(&mut self, _station: StationId, _lines: &[String]) {}

        fn render_thresholds(&mut self, _thresholds: &Thresholds, _lines: &[String]) {}

        fn clear(&mut self, banner: &str) {
            let mut journal = self.journal.lock().unwrap();
            journal.banners.push(banner.to_string());
        }
    }

    impl Actuators for Bench {
        fn apply(&mut self, state: ActuatorState) {
            self.journal.lock().unwrap().applied.push(state);
        }

        fn tone(&mut self, _frequency_hz: u32) {}

        fn silence(&mut self) {
            self.journal.lock().unwrap().silenced += 1;
        }
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("MQTT_HOST", "broker.local"),
            ("MQTT_PORT", "8883"),
            ("ENVRIG_HTTP_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();
        let mut network = NetworkConfig::default();

        apply_env_overrides(&mut network, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(network.mqtt_host, "broker.local");
        assert_eq!(network.mqtt_port, 8883);
        assert_eq!(network.http_port, 8080);
        assert_eq!(network.mqtt_user, "");
    }

    #[tokio::test]
    async fn missing_config_file_yields_defaults() {
        let path = std::env::temp_dir().join("envrig-missing-config-test.json");
        let config = read_config_file(&path).await.unwrap();
        assert_eq!(config.control.loop_interval_ms, 1_000);
    }

    #[tokio::test]
    async fn config_file_is_parsed_with_defaults() {
        let name = format!("envrig-config-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        let raw = br#"{"control":{"telemetry_interval_ms":2000},"network":{"http_port":9000}}"#;
        tokio::fs::write(&path, raw).await.unwrap();

        let config = read_config_file(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(config.control.telemetry_interval_ms, 2_000);
        assert_eq!(config.network.http_port, 9_000);
        assert_eq!(config.network.mqtt_port, 1883);
    }

    #[tokio::test]
    async fn malformed_config_file_is_an_error() {
        let name = format!("envrig-bad-config-{}.json", std::process::id());
        let path = std::env::temp_dir().join(name);
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let result = read_config_file(&path).await;
        tokio::fs::remove_file(&path).await.unwrap();

        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn signal_plays_every_step() {
        #[derive(Default)]
        struct Recorder {
            events: Vec<String>,
        }
        impl Actuators for Recorder {
            fn apply(&mut self, _state: ActuatorState) {}
            fn tone(&mut self, frequency_hz: u32) {
                self.events.push(format!("tone {frequency_hz}"));
            }
            fn silence(&mut self) {
                self.events.push("silence".to_string());
            }
        }

        let mut recorder = Recorder::default();
        let tone = SignalStep::Tone {
            frequency_hz: 600,
            duration_ms: 800,
        };
        let started = tokio::time::Instant::now();
        play_signal(&mut recorder, vec![tone, SignalStep::Pause(200), tone]).await;

        let expected = ["tone 600", "silence", "tone 600", "silence"];
        assert_eq!(recorder.events, expected);
        assert_eq!(started.elapsed(), Duration::from_millis(1_800));
    }

    #[tokio::test]
    async fn panicking_loop_still_leaves_rig_safe() {
        let bench = Bench::default();
        let mut rig = bench.rig();
        rig.step(0);
        assert_ne!(
            bench.journal.lock().unwrap().applied.last(),
            Some(&ActuatorState::SAFE)
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
            let _rig = rig;
            panic!("control loop fault");
        }));

        assert!(outcome.is_err());
        let journal = bench.journal.lock().unwrap();
        assert_eq!(journal.silenced, 1);
        assert_eq!(journal.applied.last(), Some(&ActuatorState::SAFE));
        assert_eq!(journal.banners.len(), 1);
        assert!(journal.disconnected);
    }

    #[test]
    fn monotonic_clock_never_goes_back() {
        let first = monotonic_ms();
        let second = monotonic_ms();
        assert!(second >= first);
    }
}
