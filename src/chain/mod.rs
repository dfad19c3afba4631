//! Capability interface to one on-chain lottery program.
//!
//! The orchestrator only ever talks to a game through [`LotteryProgram`]; the Solana RPC
//! adapter and the in-memory ledger are the two implementations.

pub mod accounts;
pub mod instructions;
pub mod memory;
pub mod oracle;
pub mod solana;

use crate::draw::game::Game;
use crate::draw::indexer::WinnerCounts;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// Authoritative per-game program state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramState {
    pub authority: Pubkey,
    pub current_draw_id: u64,
    pub jackpot_balance: u64,
    pub next_draw_timestamp: i64,
    pub commit_slot: u64,
    pub commit_timestamp: i64,
    pub current_randomness_account: Pubkey,
    pub is_draw_in_progress: bool,
    pub is_paused: bool,
    pub is_funded: bool,
}

impl ProgramState {
    pub fn has_commit(&self) -> bool {
        self.commit_slot != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawResult {
    pub draw_id: u64,
    pub winning_numbers: Vec<u8>,
    pub total_tickets: u64,
    pub was_rolldown: bool,
    pub is_explicitly_finalized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub owner: Pubkey,
    pub draw_id: u64,
    pub numbers: Vec<u8>,
    pub is_claimed: bool,
    pub match_count: u8,
    pub prize_amount: u64,
}

/// One page of a ticket scan. `next_cursor` is `None` once the scan is complete.
#[derive(Debug, Clone, Default)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub next_cursor: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub signature: String,
    pub randomness_account: Pubkey,
    /// Slot the program recorded for the commit.
    pub commit_slot: u64,
}

/// Everything `finalize_draw` binds the program to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeClaim {
    pub draw_id: u64,
    pub winner_counts: WinnerCounts,
    pub verification_hash: [u8; 32],
    pub nonce: u64,
}

#[async_trait]
pub trait LotteryProgram: Send + Sync {
    fn game(&self) -> Game;

    async fn fetch_state(&self) -> Result<ProgramState>;

    /// `Ok(None)` when `execute_draw` has not yet succeeded for `draw_id`.
    async fn fetch_draw_result(&self, draw_id: u64) -> Result<Option<DrawResult>>;

    async fn fetch_ticket_page(&self, draw_id: u64, cursor: u64, limit: usize)
        -> Result<TicketPage>;

    async fn commit_randomness(&self) -> Result<CommitReceipt>;

    async fn execute_draw(&self, draw_id: u64) -> Result<String>;

    async fn finalize_draw(&self, claim: &FinalizeClaim) -> Result<String>;

    async fn cancel_draw(&self, draw_id: u64, reason: &str) -> Result<String>;

    /// Zero-winner finalize for a draw that can no longer be settled normally.
    async fn force_finalize_draw(&self, draw_id: u64, reason: &str) -> Result<String>;
}
