//! Background webhook forwarder for operator alerts (Discord / Telegram).
//!
//! Delivery is best effort: a bounded queue feeds one blocking worker thread, and alerts
//! are dropped when the queue is full or no webhook is configured.

use serde_json::Value;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::time::Duration;

const DEFAULT_TELEMETRY_QUEUE_CAPACITY: usize = 256;
const DEFAULT_TELEMETRY_HTTP_TIMEOUT_MS: u64 = 2_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryLevel {
    Info,
    Warning,
    Critical,
}

impl TelemetryLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TelemetryLevel::Info => "INFO",
            TelemetryLevel::Warning => "WARNING",
            TelemetryLevel::Critical => "CRITICAL",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryEvent {
    pub ts_ms: u64,
    pub level: TelemetryLevel,
    pub kind: String,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub discord_webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub queue_capacity: usize,
    pub timeout_ms: u64,
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TelemetryConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            discord_webhook_url: non_empty(lookup("DISCORD_WEBHOOK_URL")),
            telegram_bot_token: non_empty(lookup("TELEGRAM_BOT_TOKEN")),
            telegram_chat_id: non_empty(lookup("TELEGRAM_CHAT_ID")),
            queue_capacity: lookup("TELEMETRY_QUEUE_CAPACITY")
                .and_then(|raw| raw.trim().parse::<usize>().ok())
                .map(|v| v.clamp(16, 4_096))
                .unwrap_or(DEFAULT_TELEMETRY_QUEUE_CAPACITY),
            timeout_ms: lookup("TELEMETRY_HTTP_TIMEOUT_MS")
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .map(|v| v.clamp(250, 15_000))
                .unwrap_or(DEFAULT_TELEMETRY_HTTP_TIMEOUT_MS),
        }
    }

    pub fn enabled(&self) -> bool {
        self.discord_webhook_url.is_some()
            || (self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some())
    }
}

pub fn render_message(event: &TelemetryEvent) -> String {
    let mut msg = format!(
        "[{}][ts_ms={}] {}: {}",
        event.level.as_str(),
        event.ts_ms,
        event.kind,
        event.message
    );
    if let Some(details) = &event.details {
        msg.push_str(" | details=");
        msg.push_str(&details.to_string());
    }
    msg
}

fn send_discord(client: &reqwest::blocking::Client, webhook_url: &str, text: &str) {
    let payload = serde_json::json!({ "content": text });
    if let Err(err) = client.post(webhook_url).json(&payload).send() {
        tracing::debug!("[OPS] discord delivery failed: {}", err);
    }
}

fn send_telegram(client: &reqwest::blocking::Client, bot_token: &str, chat_id: &str, text: &str) {
    let url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
    let payload = serde_json::json!({
        "chat_id": chat_id,
        "text": text,
        "disable_web_page_preview": true,
    });
    if let Err(err) = client.post(url).json(&payload).send() {
        tracing::debug!("[OPS] telegram delivery failed: {}", err);
    }
}

fn run_worker(cfg: TelemetryConfig, rx: Receiver<TelemetryEvent>) {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_millis(cfg.timeout_ms))
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new());
    while let Ok(event) = rx.recv() {
        let text = render_message(&event);
        if let Some(url) = cfg.discord_webhook_url.as_deref() {
            send_discord(&client, url, &text);
        }
        if let (Some(token), Some(chat_id)) = (
            cfg.telegram_bot_token.as_deref(),
            cfg.telegram_chat_id.as_deref(),
        ) {
            send_telegram(&client, token, chat_id, &text);
        }
    }
}

/// Handle to the forwarding thread. Dropping every handle stops the worker.
#[derive(Clone, Debug)]
pub struct TelemetryWorker {
    sender: Option<SyncSender<TelemetryEvent>>,
}

impl TelemetryWorker {
    /// Spawns the worker when a webhook is configured; otherwise returns a no-op handle.
    pub fn spawn(cfg: TelemetryConfig) -> Self {
        if !cfg.enabled() {
            return Self::disabled();
        }
        let (tx, rx) = sync_channel::<TelemetryEvent>(cfg.queue_capacity.max(1));
        let spawned = std::thread::Builder::new()
            .name("alert-telemetry".to_string())
            .spawn(move || run_worker(cfg, rx));
        match spawned {
            Ok(_) => Self { sender: Some(tx) },
            Err(err) => {
                tracing::warn!("[OPS] alert worker failed to start: {}", err);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues `event`. Returns false when it was dropped.
    pub fn emit(&self, event: TelemetryEvent) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            return false;
        };
        match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
