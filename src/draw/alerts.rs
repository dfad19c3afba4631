//! Operator alert sink used by the orchestrator.

use crate::draw::game::Game;
use crate::utils::clock::now_ms;
use crate::utils::telemetry::{TelemetryEvent, TelemetryLevel, TelemetryWorker};
use serde_json::Value;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    PhaseFailed,
    DrawCancelled,
    PlausibilityWarning,
    TicketCountMismatch,
    Recovery,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::PhaseFailed => "phase_failed",
            AlertKind::DrawCancelled => "draw_cancelled",
            AlertKind::PlausibilityWarning => "plausibility_warning",
            AlertKind::TicketCountMismatch => "ticket_count_mismatch",
            AlertKind::Recovery => "recovery",
        }
    }

    fn level(self) -> TelemetryLevel {
        match self {
            AlertKind::PhaseFailed
            | AlertKind::DrawCancelled
            | AlertKind::TicketCountMismatch => TelemetryLevel::Critical,
            AlertKind::PlausibilityWarning => TelemetryLevel::Warning,
            AlertKind::Recovery => TelemetryLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub game: Game,
    /// `None` when the failure happened before the current draw was known.
    pub draw_id: Option<u64>,
    pub kind: AlertKind,
    pub message: String,
    pub details: Option<Value>,
}

impl Alert {
    pub fn subject(&self) -> String {
        match self.draw_id {
            Some(draw_id) => format!("{} draw {}", self.game, draw_id),
            None => self.game.to_string(),
        }
    }
}

pub trait AlertSink: Send + Sync {
    fn send(&self, alert: Alert);
}

/// Forwards alerts to the webhook worker and mirrors them into the log.
pub struct WebhookAlertSink {
    worker: TelemetryWorker,
}

impl WebhookAlertSink {
    pub fn new(worker: TelemetryWorker) -> Self {
        Self { worker }
    }
}

impl AlertSink for WebhookAlertSink {
    fn send(&self, alert: Alert) {
        let subject = alert.subject();
        tracing::warn!("[OPS] alert {} {}: {}", alert.kind.as_str(), subject, alert.message);
        let queued = self.worker.emit(TelemetryEvent {
            ts_ms: now_ms(),
            level: alert.kind.level(),
            kind: alert.kind.as_str().to_string(),
            message: format!("{}: {}", subject, alert.message),
            details: alert.details,
        });
        if !queued && self.worker.is_enabled() {
            tracing::debug!("[OPS] alert queue full; dropped {}", alert.kind.as_str());
        }
    }
}

/// Keeps every alert in memory. Used by tests and dry runs.
#[derive(Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        match self.alerts.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, kind: AlertKind) -> usize {
        self.alerts().iter().filter(|a| a.kind == kind).count()
    }
}

impl AlertSink for RecordingAlertSink {
    fn send(&self, alert: Alert) {
        match self.alerts.lock() {
            Ok(mut guard) => guard.push(alert),
            Err(poisoned) => poisoned.into_inner().push(alert),
        }
    }
}
