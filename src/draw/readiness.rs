//! Pure decision: should this tick start a draw, recover one, or do nothing?

use crate::chain::ProgramState;
use crate::draw::game::GameRules;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Readiness {
    NotReady(NotReadyReason),
    ReadyToStart(u64),
    /// A draw is already in flight; the recovery path decides what happens next.
    InProgress(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotReadyReason {
    Paused,
    NotFunded,
    /// Ticket sales are still open; carries seconds until the cutoff.
    SalesOpen { opens_in_secs: i64 },
}

pub fn evaluate_readiness(state: &ProgramState, rules: &GameRules, now_unix: i64) -> Readiness {
    if state.is_draw_in_progress {
        return Readiness::InProgress(state.current_draw_id);
    }
    if state.is_paused {
        return Readiness::NotReady(NotReadyReason::Paused);
    }
    if !state.is_funded {
        return Readiness::NotReady(NotReadyReason::NotFunded);
    }
    let start_at = state
        .next_draw_timestamp
        .saturating_sub(rules.ticket_sale_cutoff_secs);
    if now_unix < start_at {
        return Readiness::NotReady(NotReadyReason::SalesOpen {
            opens_in_secs: start_at - now_unix,
        });
    }
    Readiness::ReadyToStart(state.current_draw_id)
}
