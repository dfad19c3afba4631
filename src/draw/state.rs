use crate::draw::game::Game;
use crate::draw::indexer::IndexResult;
use crate::error::{ProtocolError, Result};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawPhase {
    Idle,
    AwaitingCommit,
    Committed,
    Executed,
    Indexed,
    Finalized,
    Error,
}

impl DrawPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            DrawPhase::Idle => "idle",
            DrawPhase::AwaitingCommit => "awaiting_commit",
            DrawPhase::Committed => "committed",
            DrawPhase::Executed => "executed",
            DrawPhase::Indexed => "indexed",
            DrawPhase::Finalized => "finalized",
            DrawPhase::Error => "error",
        }
    }

    /// The only phase reachable from `self` on the happy path.
    fn successor(self) -> Option<DrawPhase> {
        match self {
            DrawPhase::Idle => Some(DrawPhase::AwaitingCommit),
            DrawPhase::AwaitingCommit => Some(DrawPhase::Committed),
            DrawPhase::Committed => Some(DrawPhase::Executed),
            DrawPhase::Executed => Some(DrawPhase::Indexed),
            DrawPhase::Indexed => Some(DrawPhase::Finalized),
            DrawPhase::Finalized | DrawPhase::Error => None,
        }
    }
}

impl fmt::Display for DrawPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-invocation view of one draw. Rebuilt from chain facts on every run.
#[derive(Debug, Clone, Serialize)]
pub struct DrawState {
    pub game: Game,
    pub draw_id: u64,
    pub phase: DrawPhase,
    pub commit_slot: Option<u64>,
    #[serde(serialize_with = "serialize_opt_pubkey")]
    pub randomness_account: Option<Pubkey>,
    pub winning_numbers: Option<Vec<u8>>,
    pub index_result: Option<IndexResult>,
    pub nonce: Option<u64>,
    pub error_count: u32,
    pub last_error: Option<String>,
}

fn serialize_opt_pubkey<S: serde::Serializer>(
    key: &Option<Pubkey>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match key {
        Some(key) => s.serialize_str(&key.to_string()),
        None => s.serialize_none(),
    }
}

impl DrawState {
    pub fn new(game: Game, draw_id: u64) -> Self {
        Self {
            game,
            draw_id,
            phase: DrawPhase::Idle,
            commit_slot: None,
            randomness_account: None,
            winning_numbers: None,
            index_result: None,
            nonce: None,
            error_count: 0,
            last_error: None,
        }
    }

    /// Starts from a phase already recorded on chain (resume path).
    pub fn resumed(game: Game, draw_id: u64, phase: DrawPhase) -> Self {
        Self {
            phase,
            ..Self::new(game, draw_id)
        }
    }

    /// Moves to `to`, rejecting any transition that skips a phase.
    pub fn advance(&mut self, to: DrawPhase) -> Result<()> {
        if to == DrawPhase::Error || self.phase.successor() == Some(to) {
            self.phase = to;
            return Ok(());
        }
        Err(ProtocolError::IllegalTransition {
            draw_id: self.draw_id,
            from: self.phase.as_str(),
            to: to.as_str(),
        }
        .into())
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.error_count += 1;
        self.last_error = Some(message.into());
        self.phase = DrawPhase::Error;
    }
}
