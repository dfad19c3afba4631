//! SQLite side-channel for operators: pause/trigger switches and per-game run statistics.
//!
//! Advisory only. The keeper reads `paused` and `trigger_requested` before a tick and writes
//! a summary after it; protocol decisions always come from the chain.

use crate::draw::game::Game;
use crate::draw::orchestrator::{TickOutcome, TickReport};
use crate::utils::clock::now_ms;
use anyhow::Context;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const KEY_PAUSED: &str = "paused";
const KEY_TRIGGER: &str = "trigger_requested";
const RUN_LOG_RETENTION: i64 = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GameStats {
    pub game: String,
    pub last_known_phase: String,
    pub last_draw_id: Option<u64>,
    pub last_outcome: String,
    pub runs: u64,
    pub finalized: u64,
    pub cancelled: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    pub last_run_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLogEntry {
    pub game: String,
    pub draw_id: Option<u64>,
    pub outcome: String,
    pub phase: String,
    pub ts_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpsStatus {
    pub paused: bool,
    pub trigger_requested: bool,
    pub games: Vec<GameStats>,
    pub recent_runs: Vec<RunLogEntry>,
}

fn outcome_str(outcome: TickOutcome) -> &'static str {
    match outcome {
        TickOutcome::Idle => "idle",
        TickOutcome::Finalized => "finalized",
        TickOutcome::Cancelled => "cancelled",
        TickOutcome::AlreadyFinalized => "already_finalized",
        TickOutcome::Planned => "planned",
        TickOutcome::Failed => "failed",
    }
}

#[derive(Debug, Clone)]
pub struct OpsStore {
    path: PathBuf,
}

impl OpsStore {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> anyhow::Result<()> {
        self.with_connection("ensure_schema", |conn| {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS control (
                    key TEXT PRIMARY KEY,
                    value INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS game_stats (
                    game TEXT PRIMARY KEY,
                    last_known_phase TEXT NOT NULL,
                    last_draw_id INTEGER,
                    last_outcome TEXT NOT NULL,
                    runs INTEGER NOT NULL DEFAULT 0,
                    finalized INTEGER NOT NULL DEFAULT 0,
                    cancelled INTEGER NOT NULL DEFAULT 0,
                    errors INTEGER NOT NULL DEFAULT 0,
                    last_error TEXT,
                    last_run_ms INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS run_log (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    game TEXT NOT NULL,
                    draw_id INTEGER,
                    outcome TEXT NOT NULL,
                    phase TEXT NOT NULL,
                    report_json TEXT NOT NULL,
                    ts_ms INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_run_log_game ON run_log(game, id);
                "#,
            )?;
            let _ = conn.execute_batch(
                r#"
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                "#,
            );
            Ok(())
        })
    }

    fn get_flag(&self, key: &'static str) -> anyhow::Result<bool> {
        self.with_connection("get_flag", |conn| {
            conn.query_row("SELECT value FROM control WHERE key = ?1", [key], |row| {
                row.get::<_, i64>(0)
            })
            .optional()
            .map(|v| v.unwrap_or(0) != 0)
        })
    }

    fn set_flag(&self, key: &'static str, value: bool) -> anyhow::Result<()> {
        self.with_connection("set_flag", |conn| {
            conn.execute(
                "INSERT INTO control(key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, i64::from(value)],
            )
            .map(|_| ())
        })
    }

    pub fn is_paused(&self) -> anyhow::Result<bool> {
        self.get_flag(KEY_PAUSED)
    }

    pub fn set_paused(&self, paused: bool) -> anyhow::Result<()> {
        self.set_flag(KEY_PAUSED, paused)
    }

    pub fn request_trigger(&self) -> anyhow::Result<()> {
        self.set_flag(KEY_TRIGGER, true)
    }

    pub fn trigger_requested(&self) -> anyhow::Result<bool> {
        self.get_flag(KEY_TRIGGER)
    }

    /// Clears a pending trigger. Returns whether one was pending.
    pub fn take_trigger(&self) -> anyhow::Result<bool> {
        self.with_connection("take_trigger", |conn| {
            conn.execute(
                "UPDATE control SET value = 0 WHERE key = ?1 AND value != 0",
                [KEY_TRIGGER],
            )
            .map(|changed| changed > 0)
        })
    }

    pub fn record_tick(&self, report: &TickReport) -> anyhow::Result<()> {
        let game = report.game.as_str();
        let draw_id = report.draw_id().map(|id| id as i64);
        let outcome = outcome_str(report.outcome);
        let phase = report.phase().as_str();
        let finalized = i64::from(report.outcome == TickOutcome::Finalized);
        let cancelled = i64::from(report.outcome == TickOutcome::Cancelled);
        let failed = i64::from(report.outcome == TickOutcome::Failed);
        let report_json =
            serde_json::to_string(report).context("failed to serialize tick report")?;
        let ts_ms = now_ms() as i64;

        self.with_connection("record_tick", |conn| {
            conn.execute(
                r#"
                INSERT INTO game_stats(game, last_known_phase, last_draw_id, last_outcome,
                                       runs, finalized, cancelled, errors, last_error, last_run_ms)
                VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(game) DO UPDATE SET
                    last_known_phase = excluded.last_known_phase,
                    last_draw_id = COALESCE(excluded.last_draw_id, game_stats.last_draw_id),
                    last_outcome = excluded.last_outcome,
                    runs = game_stats.runs + 1,
                    finalized = game_stats.finalized + excluded.finalized,
                    cancelled = game_stats.cancelled + excluded.cancelled,
                    errors = game_stats.errors + excluded.errors,
                    last_error = CASE WHEN excluded.errors > 0 THEN excluded.last_error ELSE NULL END,
                    last_run_ms = excluded.last_run_ms
                "#,
                params![
                    game,
                    phase,
                    draw_id,
                    outcome,
                    finalized,
                    cancelled,
                    failed,
                    report.error.as_deref(),
                    ts_ms
                ],
            )?;
            conn.execute(
                "INSERT INTO run_log(game, draw_id, outcome, phase, report_json, ts_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![game, draw_id, outcome, phase, report_json, ts_ms],
            )?;
            conn.execute(
                "DELETE FROM run_log WHERE game = ?1 AND id NOT IN (
                     SELECT id FROM run_log WHERE game = ?1 ORDER BY id DESC LIMIT ?2)",
                params![game, RUN_LOG_RETENTION],
            )?;
            Ok(())
        })
    }

    pub fn game_stats(&self, game: Game) -> anyhow::Result<Option<GameStats>> {
        self.with_connection("game_stats", |conn| {
            conn.query_row(
                "SELECT game, last_known_phase, last_draw_id, last_outcome, runs, finalized,
                        cancelled, errors, last_error, last_run_ms
                 FROM game_stats WHERE game = ?1",
                [game.as_str()],
                row_to_stats,
            )
            .optional()
        })
    }

    pub fn recent_runs(&self, limit: usize) -> anyhow::Result<Vec<RunLogEntry>> {
        self.with_connection("recent_runs", |conn| {
            let mut stmt = conn.prepare(
                "SELECT game, draw_id, outcome, phase, ts_ms FROM run_log ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map([limit as i64], |row| {
                Ok(RunLogEntry {
                    game: row.get(0)?,
                    draw_id: row.get::<_, Option<i64>>(1)?.map(|v| v as u64),
                    outcome: row.get(2)?,
                    phase: row.get(3)?,
                    ts_ms: row.get::<_, i64>(4)? as u64,
                })
            })?;
            rows.collect()
        })
    }

    pub fn status(&self) -> anyhow::Result<OpsStatus> {
        let mut games = Vec::new();
        for game in Game::ALL {
            if let Some(stats) = self.game_stats(game)? {
                games.push(stats);
            }
        }
        Ok(OpsStatus {
            paused: self.is_paused()?,
            trigger_requested: self.trigger_requested()?,
            games,
            recent_runs: self.recent_runs(10)?,
        })
    }

    fn with_connection<T, F>(&self, context: &str, op: F) -> anyhow::Result<T>
    where
        F: Fn(&Connection) -> rusqlite::Result<T>,
    {
        let max_attempts = 6u32;
        let mut last_err = String::new();

        for attempt in 1..=max_attempts {
            let conn = Connection::open(&self.path).with_context(|| {
                format!("failed to open sqlite database {}", self.path.display())
            })?;
            conn.busy_timeout(Duration::from_millis(5_000))
                .context("failed to configure sqlite busy timeout")?;

            match op(&conn) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_err = err.to_string();
                    if is_sqlite_locked_error(&err) && attempt < max_attempts {
                        continue;
                    }
                    return Err(anyhow::anyhow!(
                        "{} failed for {}: {}",
                        context,
                        self.path.display(),
                        last_err
                    ));
                }
            }
        }

        Err(anyhow::anyhow!(
            "{} failed for {} after {} attempt(s): {}",
            context,
            self.path.display(),
            max_attempts,
            last_err
        ))
    }
}

fn row_to_stats(row: &rusqlite::Row<'_>) -> rusqlite::Result<GameStats> {
    Ok(GameStats {
        game: row.get(0)?,
        last_known_phase: row.get(1)?,
        last_draw_id: row.get::<_, Option<i64>>(2)?.map(|v| v as u64),
        last_outcome: row.get(3)?,
        runs: row.get::<_, i64>(4)? as u64,
        finalized: row.get::<_, i64>(5)? as u64,
        cancelled: row.get::<_, i64>(6)? as u64,
        errors: row.get::<_, i64>(7)? as u64,
        last_error: row.get(8)?,
        last_run_ms: row.get::<_, i64>(9)? as u64,
    })
}

fn is_sqlite_locked_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, _) => {
            matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        }
        _ => {
            let msg = err.to_string().to_ascii_lowercase();
            msg.contains("database is locked") || msg.contains("database is busy")
        }
    }
}
