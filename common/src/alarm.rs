use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::{
    config::ControlConfig,
    error::TransportFault,
    evaluator::{AlarmCondition, AlarmKind},
    ports::{self, Publisher},
    topics::TOPIC_ALARM,
    types::Switch,
};

pub const ALL_NORMAL: &str = "all normal";

const REPEAT_GAP_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub frequency_hz: u32,
    pub duration_ms: u64,
    pub repeat: u8,
}

impl Pattern {
    const fn new(frequency_hz: u32, duration_ms: u64, repeat: u8) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            repeat,
        }
    }

    pub fn steps(&self) -> Vec<SignalStep> {
        let mut steps = Vec::with_capacity(self.repeat as usize * 2);
        for index in 0..self.repeat {
            steps.push(SignalStep::Tone {
                frequency_hz: self.frequency_hz,
                duration_ms: self.duration_ms,
            });
            if self.repeat > 1 && index + 1 < self.repeat {
                steps.push(SignalStep::Pause(REPEAT_GAP_MS));
            }
        }
        steps
    }

    pub fn total_ms(&self) -> u64 {
        self.steps().iter().map(SignalStep::duration_ms).sum()
    }
}

/// Played instead of concatenating patterns when several alarms are active.
pub const MULTIPLE_ALARMS: Pattern = Pattern::new(1_500, 150, 5);

pub fn pattern_for(kind: AlarmKind) -> Pattern {
    match kind {
        AlarmKind::TempHigh | AlarmKind::TempLow => Pattern::new(2_000, 300, 3),
        AlarmKind::HumidityHigh | AlarmKind::HumidityLow => Pattern::new(1_000, 500, 2),
        AlarmKind::LightLow => Pattern::new(600, 800, 2),
        AlarmKind::LightHigh => Pattern::new(1_200, 300, 4),
        AlarmKind::SensorError => Pattern::new(500, 1_000, 1),
        AlarmKind::ManualTrigger => Pattern::new(1_000, 300, 1),
    }
}

pub fn select_pattern(conditions: &BTreeSet<AlarmCondition>) -> Option<Pattern> {
    let mut iter = conditions.iter();
    match (iter.next(), iter.next()) {
        (None, _) => None,
        (Some(only), None) => Some(pattern_for(only.kind)),
        (Some(_), Some(_)) => Some(MULTIPLE_ALARMS),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStep {
    Tone { frequency_hz: u32, duration_ms: u64 },
    Pause(u64),
}

impl SignalStep {
    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::Tone { duration_ms, .. } => *duration_ms,
            Self::Pause(ms) => *ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Sent(String),
    /// Inside the minimum interval since the last report.
    Throttled,
    /// Same text as the last report, repeat interval not yet elapsed.
    Duplicate,
    /// Quiet cycle with incomplete readings; nothing worth saying.
    Skipped,
    Failed(TransportFault),
}

/// Audible patterns plus the rate-limited alarm report.
#[derive(Debug, Clone)]
pub struct AlarmSignaler {
    min_interval_ms: u64,
    repeat_interval_ms: u64,
    last_sent_ms: Option<u64>,
    last_message: Option<String>,
}

impl AlarmSignaler {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            min_interval_ms: config.alarm_min_interval_ms,
            repeat_interval_ms: config
                .alarm_repeat_interval_ms
                .max(config.alarm_min_interval_ms),
            last_sent_ms: None,
            last_message: None,
        }
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Steps to play this cycle; muted while the buzzer is switched off.
    pub fn signal(&self, conditions: &BTreeSet<AlarmCondition>, buzzer: Switch) -> Vec<SignalStep> {
        if !buzzer.is_on() {
            return Vec::new();
        }
        select_pattern(conditions)
            .map(|pattern| pattern.steps())
            .unwrap_or_default()
    }

    /// Report lines for this cycle, or `None` when nothing should be said.
    pub fn compose(
        conditions: &BTreeSet<AlarmCondition>,
        readings_complete: bool,
    ) -> Option<Vec<String>> {
        if conditions.is_empty() {
            return readings_complete.then(|| vec![ALL_NORMAL.to_string()]);
        }
        Some(conditions.iter().map(ToString::to_string).collect())
    }

    pub fn report(
        &mut self,
        conditions: &BTreeSet<AlarmCondition>,
        readings_complete: bool,
        publisher: &mut dyn Publisher,
        now_ms: u64,
    ) -> ReportOutcome {
        let Some(lines) = Self::compose(conditions, readings_complete) else {
            return ReportOutcome::Skipped;
        };
        let message = lines.join(", ");

        if let Some(last) = self.last_sent_ms {
            let elapsed = now_ms.saturating_sub(last);
            if elapsed < self.min_interval_ms {
                return ReportOutcome::Throttled;
            }
            if self.last_message.as_deref() == Some(message.as_str())
                && elapsed < self.repeat_interval_ms
            {
                return ReportOutcome::Duplicate;
            }
        }

        match ports::send(publisher, TOPIC_ALARM, &lines) {
            Ok(()) => {
                debug!("alarm report sent: {message}");
                self.last_sent_ms = Some(now_ms);
                self.last_message = Some(message.clone());
                ReportOutcome::Sent(message)
            }
            Err(err) => {
                warn!("alarm report failed: {err}");
                ReportOutcome::Failed(err)
            }
        }
    }
}
