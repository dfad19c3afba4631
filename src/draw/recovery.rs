//! Resume-or-abort decision for a draw that is already in flight.
//!
//! Decided purely from chain facts: whether a DrawResult exists, whether it is finalized,
//! and how long ago the randomness was committed.

use crate::chain::{DrawResult, ProgramState};
use crate::draw::game::GameRules;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryPlan {
    /// Finalize already landed; the chain clears the flag on its own.
    AlreadyFinalized { draw_id: u64 },
    /// Execute landed but Finalize did not. Re-index and finalize, whatever the age.
    ResumeFinalize { draw_id: u64, elapsed_secs: i64 },
    /// Commit landed, Execute did not, and the oracle has had long enough.
    Cancel { draw_id: u64, elapsed_secs: i64 },
    /// Commit landed recently; try Execute and continue the pipeline.
    ResumeExecute { draw_id: u64, elapsed_secs: i64 },
}


pub fn cancel_reason(elapsed_secs: i64, timeout_secs: i64) -> String {
    format!("commit timed out: no draw result {elapsed_secs}s after commit (limit {timeout_secs}s)")
}

pub fn plan_recovery(
    state: &ProgramState,
    result: Option<&DrawResult>,
    rules: &GameRules,
    now_unix: i64,
) -> RecoveryPlan {
    let draw_id = state.current_draw_id;
    let elapsed_secs = now_unix.saturating_sub(state.commit_timestamp);
    match result {
        Some(result) if result.is_explicitly_finalized => RecoveryPlan::AlreadyFinalized { draw_id },
        Some(_) => RecoveryPlan::ResumeFinalize {
            draw_id,
            elapsed_secs,
        },
        None if elapsed_secs > rules.commit_timeout_secs => RecoveryPlan::Cancel {
            draw_id,
            elapsed_secs,
        },
        None => RecoveryPlan::ResumeExecute {
            draw_id,
            elapsed_secs,
        },
    }
}
