//! In-memory lottery program.
//!
//! Mirrors the on-chain rules the keeper relies on (single in-flight draw, result created by
//! execute, flag cleared by finalize) and records every call so tests can assert ordering.
//! Faults can be injected per operation, including "landed but confirmation lost".

use crate::chain::{
    CommitReceipt, DrawResult, FinalizeClaim, LotteryProgram, ProgramState, Ticket, TicketPage,
};
use crate::draw::game::Game;
use crate::error::{ChainError, KeeperError, Result};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

const DRAW_INTERVAL_SECS: i64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerOp {
    FetchState,
    FetchDrawResult,
    FetchTicketPage,
    CommitRandomness,
    ExecuteDraw,
    FinalizeDraw,
    CancelDraw,
    ForceFinalizeDraw,
}

impl LedgerOp {
    pub fn is_submission(self) -> bool {
        !matches!(
            self,
            LedgerOp::FetchState | LedgerOp::FetchDrawResult | LedgerOp::FetchTicketPage
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCall {
    pub op: LedgerOp,
    pub draw_id: Option<u64>,
    pub succeeded: bool,
}

#[derive(Debug, Clone)]
pub enum Fault {
    /// Fail before touching state.
    Transport(String),
    /// Fail with a program-level rejection before touching state.
    Rejected(String),
    /// Apply the effect, then report a transport error.
    LostConfirmation,
    /// Ticket page comes back empty with the cursor it was asked for.
    StalledCursor,
}

#[derive(Debug)]
struct LedgerInner {
    state: ProgramState,
    results: BTreeMap<u64, DrawResult>,
    tickets: Vec<Ticket>,
    finalize_claims: Vec<FinalizeClaim>,
    calls: Vec<LedgerCall>,
    faults: HashMap<LedgerOp, VecDeque<Fault>>,
    now: i64,
    slot: u64,
    oracle_revealed: bool,
    next_winning_numbers: Vec<u8>,
    next_was_rolldown: bool,
}

pub struct MemoryLedger {
    game: Game,
    inner: Mutex<LedgerInner>,
}

impl MemoryLedger {
    pub fn new(game: Game, state: ProgramState) -> Self {
        Self {
            game,
            inner: Mutex::new(LedgerInner {
                state,
                results: BTreeMap::new(),
                tickets: Vec::new(),
                finalize_claims: Vec::new(),
                calls: Vec::new(),
                faults: HashMap::new(),
                now: 0,
                slot: 1_000,
                oracle_revealed: true,
                next_winning_numbers: Vec::new(),
                next_was_rolldown: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_now(&self, now: i64) {
        self.lock().now = now;
    }

    pub fn set_oracle_revealed(&self, revealed: bool) {
        self.lock().oracle_revealed = revealed;
    }

    pub fn set_next_winning_numbers(&self, numbers: Vec<u8>, was_rolldown: bool) {
        let mut inner = self.lock();
        inner.next_winning_numbers = numbers;
        inner.next_was_rolldown = was_rolldown;
    }

    pub fn update_state(&self, f: impl FnOnce(&mut ProgramState)) {
        f(&mut self.lock().state);
    }

    pub fn insert_result(&self, result: DrawResult) {
        self.lock().results.insert(result.draw_id, result);
    }

    pub fn add_ticket(&self, ticket: Ticket) {
        self.lock().tickets.push(ticket);
    }

    pub fn add_tickets(&self, tickets: impl IntoIterator<Item = Ticket>) {
        self.lock().tickets.extend(tickets);
    }

    /// Queue a fault for the next call of `op`. Faults are consumed in order.
    pub fn inject_fault(&self, op: LedgerOp, fault: Fault) {
        self.lock().faults.entry(op).or_default().push_back(fault);
    }

    pub fn state(&self) -> ProgramState {
        self.lock().state.clone()
    }

    pub fn result(&self, draw_id: u64) -> Option<DrawResult> {
        self.lock().results.get(&draw_id).cloned()
    }

    pub fn finalize_claims(&self) -> Vec<FinalizeClaim> {
        self.lock().finalize_claims.clone()
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.lock().calls.clone()
    }

    /// Successful calls of `op`.
    pub fn count(&self, op: LedgerOp) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.op == op && call.succeeded)
            .count()
    }

    /// Every call of `op`, including failed ones.
    pub fn attempts(&self, op: LedgerOp) -> usize {
        self.lock().calls.iter().filter(|call| call.op == op).count()
    }

    /// Submissions in the order they landed.
    pub fn landed_submissions(&self) -> Vec<LedgerOp> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.op.is_submission() && call.succeeded)
            .map(|call| call.op)
            .collect()
    }

    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }

    fn signature(op: LedgerOp, draw_id: u64) -> String {
        format!("mem-{op:?}-{draw_id}")
    }
}

fn rejected(instruction: &'static str, message: impl Into<String>) -> KeeperError {
    ChainError::Rejected {
        instruction,
        message: message.into(),
    }
    .into()
}

impl LedgerInner {
    fn take_fault(&mut self, op: LedgerOp) -> Option<Fault> {
        self.faults.get_mut(&op).and_then(|queue| queue.pop_front())
    }

    fn record(&mut self, op: LedgerOp, draw_id: Option<u64>, succeeded: bool) {
        self.calls.push(LedgerCall {
            op,
            draw_id,
            succeeded,
        });
    }

    /// Runs `apply` under the queued fault policy for `op`.
    fn submit<T>(
        &mut self,
        op: LedgerOp,
        draw_id: Option<u64>,
        apply: impl FnOnce(&mut LedgerInner) -> Result<T>,
    ) -> Result<T> {
        match self.take_fault(op) {
            Some(Fault::Transport(message)) => {
                self.record(op, draw_id, false);
                Err(ChainError::Transport(message).into())
            }
            Some(Fault::Rejected(message)) => {
                self.record(op, draw_id, false);
                Err(rejected("injected", message))
            }
            Some(Fault::LostConfirmation) => {
                let outcome = apply(self);
                self.record(op, draw_id, outcome.is_ok());
                outcome.and(Err(ChainError::Transport(
                    "confirmation timed out".to_string(),
                )
                .into()))
            }
            Some(Fault::StalledCursor) | None => {
                let outcome = apply(self);
                self.record(op, draw_id, outcome.is_ok());
                outcome
            }
        }
    }
}

#[async_trait]
impl LotteryProgram for MemoryLedger {
    fn game(&self) -> Game {
        self.game
    }

    async fn fetch_state(&self) -> Result<ProgramState> {
        let mut inner = self.lock();
        if let Some(Fault::Transport(message)) = inner.take_fault(LedgerOp::FetchState) {
            inner.record(LedgerOp::FetchState, None, false);
            return Err(ChainError::Transport(message).into());
        }
        inner.record(LedgerOp::FetchState, None, true);
        Ok(inner.state.clone())
    }

    async fn fetch_draw_result(&self, draw_id: u64) -> Result<Option<DrawResult>> {
        let mut inner = self.lock();
        if let Some(Fault::Transport(message)) = inner.take_fault(LedgerOp::FetchDrawResult) {
            inner.record(LedgerOp::FetchDrawResult, Some(draw_id), false);
            return Err(ChainError::Transport(message).into());
        }
        inner.record(LedgerOp::FetchDrawResult, Some(draw_id), true);
        Ok(inner.results.get(&draw_id).cloned())
    }

    async fn fetch_ticket_page(&self, draw_id: u64, cursor: u64, limit: usize) -> Result<TicketPage> {
        let mut inner = self.lock();
        match inner.take_fault(LedgerOp::FetchTicketPage) {
            Some(Fault::Transport(message)) => {
                inner.record(LedgerOp::FetchTicketPage, Some(draw_id), false);
                return Err(ChainError::Transport(message).into());
            }
            Some(Fault::StalledCursor) => {
                inner.record(LedgerOp::FetchTicketPage, Some(draw_id), true);
                return Ok(TicketPage {
                    tickets: Vec::new(),
                    next_cursor: Some(cursor),
                });
            }
            _ => {}
        }
        inner.record(LedgerOp::FetchTicketPage, Some(draw_id), true);
        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        let matching: Vec<&Ticket> = inner.tickets.iter().filter(|t| t.draw_id == draw_id).collect();
        let end = start.saturating_add(limit.max(1)).min(matching.len());
        let tickets = matching
            .get(start..end)
            .map(|page| page.iter().map(|t| (*t).clone()).collect())
            .unwrap_or_default();
        let next_cursor = (end < matching.len()).then_some(end as u64);
        Ok(TicketPage {
            tickets,
            next_cursor,
        })
    }

    async fn commit_randomness(&self) -> Result<CommitReceipt> {
        let mut inner = self.lock();
        let draw_id = inner.state.current_draw_id;
        inner.submit(LedgerOp::CommitRandomness, Some(draw_id), |ledger| {
            let state = &ledger.state;
            if state.is_draw_in_progress {
                return Err(rejected("commit_randomness", "DrawAlreadyInProgress"));
            }
            if state.is_paused {
                return Err(rejected("commit_randomness", "LotteryPaused"));
            }
            if !state.is_funded {
                return Err(rejected("commit_randomness", "InsufficientFunding"));
            }
            ledger.slot += 1;
            let randomness = Pubkey::new_unique();
            ledger.state.is_draw_in_progress = true;
            ledger.state.commit_slot = ledger.slot;
            ledger.state.commit_timestamp = ledger.now;
            ledger.state.current_randomness_account = randomness;
            Ok(CommitReceipt {
                signature: MemoryLedger::signature(LedgerOp::CommitRandomness, draw_id),
                randomness_account: randomness,
                commit_slot: ledger.slot,
            })
        })
    }

    async fn execute_draw(&self, draw_id: u64) -> Result<String> {
        let mut inner = self.lock();
        inner.submit(LedgerOp::ExecuteDraw, Some(draw_id), |ledger| {
            if !ledger.state.is_draw_in_progress || ledger.state.current_draw_id != draw_id {
                return Err(rejected("execute_draw", "NoDrawInProgress"));
            }
            if ledger.results.contains_key(&draw_id) {
                return Err(rejected("execute_draw", "DrawAlreadyExecuted"));
            }
            if !ledger.oracle_revealed {
                return Err(ChainError::OracleNotRevealed("RandomnessNotResolved".to_string()).into());
            }
            let total_tickets = ledger.tickets.iter().filter(|t| t.draw_id == draw_id).count() as u64;
            let result = DrawResult {
                draw_id,
                winning_numbers: ledger.next_winning_numbers.clone(),
                total_tickets,
                was_rolldown: ledger.next_was_rolldown,
                is_explicitly_finalized: false,
            };
            ledger.results.insert(draw_id, result);
            Ok(MemoryLedger::signature(LedgerOp::ExecuteDraw, draw_id))
        })
    }

    async fn finalize_draw(&self, claim: &FinalizeClaim) -> Result<String> {
        let mut inner = self.lock();
        let draw_id = claim.draw_id;
        inner.submit(LedgerOp::FinalizeDraw, Some(draw_id), |ledger| {
            if ledger.state.current_draw_id != draw_id {
                return Err(rejected("finalize_draw", "DrawIdMismatch"));
            }
            match ledger.results.get_mut(&draw_id) {
                None => return Err(rejected("finalize_draw", "DrawNotExecuted")),
                Some(result) if result.is_explicitly_finalized => {
                    return Err(rejected("finalize_draw", "DrawAlreadyFinalized"))
                }
                Some(result) => result.is_explicitly_finalized = true,
            }
            ledger.finalize_claims.push(claim.clone());
            ledger.close_draw();
            Ok(MemoryLedger::signature(LedgerOp::FinalizeDraw, draw_id))
        })
    }

    async fn cancel_draw(&self, draw_id: u64, _reason: &str) -> Result<String> {
        let mut inner = self.lock();
        inner.submit(LedgerOp::CancelDraw, Some(draw_id), |ledger| {
            if !ledger.state.is_draw_in_progress || ledger.state.current_draw_id != draw_id {
                return Err(rejected("cancel_draw", "NoDrawInProgress"));
            }
            if ledger.results.contains_key(&draw_id) {
                return Err(rejected("cancel_draw", "DrawAlreadyExecuted"));
            }
            ledger.state.is_draw_in_progress = false;
            ledger.state.commit_slot = 0;
            ledger.state.commit_timestamp = 0;
            ledger.state.current_randomness_account = Pubkey::default();
            Ok(MemoryLedger::signature(LedgerOp::CancelDraw, draw_id))
        })
    }

    async fn force_finalize_draw(&self, draw_id: u64, _reason: &str) -> Result<String> {
        let mut inner = self.lock();
        inner.submit(LedgerOp::ForceFinalizeDraw, Some(draw_id), |ledger| {
            if ledger.state.current_draw_id != draw_id || !ledger.state.is_draw_in_progress {
                return Err(rejected("force_finalize_draw", "NoDrawInProgress"));
            }
            match ledger.results.get_mut(&draw_id) {
                Some(result) if !result.is_explicitly_finalized => {
                    result.is_explicitly_finalized = true;
                }
                _ => return Err(rejected("force_finalize_draw", "DrawNotExecuted")),
            }
            ledger.close_draw();
            Ok(MemoryLedger::signature(LedgerOp::ForceFinalizeDraw, draw_id))
        })
    }
}

impl LedgerInner {
    fn close_draw(&mut self) {
        self.state.is_draw_in_progress = false;
        self.state.commit_slot = 0;
        self.state.commit_timestamp = 0;
        self.state.current_draw_id += 1;
        self.state.next_draw_timestamp += DRAW_INTERVAL_SECS;
    }
}
