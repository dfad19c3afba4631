//! Per-game draw lifecycle: readiness, then either the normal pipeline
//! (Commit, wait, Execute, Index, Finalize) or the recovery path for an in-flight draw.
//!
//! Nothing here survives the tick. Every decision is re-derived from chain state, and every
//! resubmission is preceded by a re-read that checks whether the previous attempt landed.

use crate::chain::{DrawResult, FinalizeClaim, LotteryProgram, ProgramState};
use crate::draw::alerts::{Alert, AlertKind, AlertSink};
use crate::draw::game::{Game, GameRules};
use crate::draw::indexer::{index_draw, IndexResult, DEFAULT_PAGE_SIZE};
use crate::draw::plausibility::{check_plausibility, PlausibilityConfig, TierAnomaly};
use crate::draw::readiness::{evaluate_readiness, Readiness};
use crate::draw::recovery::{cancel_reason, plan_recovery, RecoveryPlan};
use crate::draw::state::{DrawPhase, DrawState};
use crate::error::{ProtocolError, Result};
use crate::utils::error::compact_error;
use crate::utils::retry::{run_with_retry, RetryPolicy};
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_REVEAL_WAIT: Duration = Duration::from_secs(10);

/// Everything one invocation needs, passed explicitly instead of kept between runs.
#[derive(Debug, Clone)]
pub struct TickContext {
    pub now_unix: i64,
    pub dry_run: bool,
    pub retry: RetryPolicy,
    pub reveal_wait: Duration,
    pub page_size: usize,
    pub plausibility: PlausibilityConfig,
    /// Fixed verification nonce. `None` draws a fresh random one per run.
    pub nonce: Option<u64>,
}

impl TickContext {
    pub fn new(now_unix: i64) -> Self {
        Self {
            now_unix,
            dry_run: false,
            retry: RetryPolicy::default(),
            reveal_wait: DEFAULT_REVEAL_WAIT,
            page_size: DEFAULT_PAGE_SIZE,
            plausibility: PlausibilityConfig::default(),
            nonce: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Nothing to do this tick.
    Idle,
    Finalized,
    Cancelled,
    /// A finalized result exists but the chain still reports the draw in progress.
    AlreadyFinalized,
    /// Dry run: the planned action was reported, nothing was submitted.
    Planned,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub game: Game,
    pub readiness: Option<Readiness>,
    pub recovery: Option<RecoveryPlan>,
    pub outcome: TickOutcome,
    pub draw: Option<DrawState>,
    pub anomalies: Vec<TierAnomaly>,
    pub signatures: Vec<String>,
    pub error: Option<String>,
}

impl TickReport {
    fn new(game: Game) -> Self {
        Self {
            game,
            readiness: None,
            recovery: None,
            outcome: TickOutcome::Idle,
            draw: None,
            anomalies: Vec::new(),
            signatures: Vec::new(),
            error: None,
        }
    }

    pub fn draw_id(&self) -> Option<u64> {
        self.draw.as_ref().map(|d| d.draw_id).or_else(|| match self.readiness {
            Some(Readiness::ReadyToStart(id)) | Some(Readiness::InProgress(id)) => Some(id),
            _ => None,
        })
    }

    pub fn phase(&self) -> DrawPhase {
        self.draw.as_ref().map_or(DrawPhase::Idle, |d| d.phase)
    }
}

pub struct DrawOrchestrator<P: LotteryProgram + ?Sized> {
    program: Arc<P>,
    rules: GameRules,
    alerts: Arc<dyn AlertSink>,
}

impl<P: LotteryProgram + ?Sized> DrawOrchestrator<P> {
    pub fn new(program: Arc<P>, rules: GameRules, alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            program,
            rules,
            alerts,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    fn game(&self) -> Game {
        self.rules.game
    }

    fn alert(&self, draw_id: Option<u64>, kind: AlertKind, message: String, details: Option<serde_json::Value>) {
        self.alerts.send(Alert {
            game: self.game(),
            draw_id,
            kind,
            message,
            details,
        });
    }

    /// One scheduled invocation for this game.
    pub async fn run_tick(&self, ctx: &TickContext) -> TickReport {
        let mut report = TickReport::new(self.game());
        let state = match self.read_state(ctx).await {
            Ok(state) => state,
            Err(err) => {
                let message = compact_error(&err);
                tracing::error!("[DRAW] {} could not read program state: {}", self.game(), message);
                self.alert(None, AlertKind::PhaseFailed, format!("state read failed: {message}"), None);
                report.outcome = TickOutcome::Failed;
                report.error = Some(message);
                return report;
            }
        };

        let readiness = evaluate_readiness(&state, &self.rules, ctx.now_unix);
        report.readiness = Some(readiness.clone());
        match readiness {
            Readiness::NotReady(reason) => {
                tracing::info!("[DRAW] {} draw {} not ready: {:?}", self.game(), state.current_draw_id, reason);
            }
            Readiness::ReadyToStart(draw_id) => {
                if ctx.dry_run {
                    tracing::info!("[DRAW] {} dry run: would commit draw {}", self.game(), draw_id);
                    report.outcome = TickOutcome::Planned;
                    report.draw = Some(DrawState::new(self.game(), draw_id));
                } else {
                    self.run_pipeline(ctx, draw_id, &mut report).await;
                }
            }
            Readiness::InProgress(draw_id) => {
                self.run_recovery(ctx, &state, draw_id, &mut report).await;
            }
        }
        report
    }

    async fn read_state(&self, ctx: &TickContext) -> Result<ProgramState> {
        let program = self.program.as_ref();
        run_with_retry(ctx.retry, &format!("{} fetch_state", self.game()), move |_| {
            program.fetch_state()
        })
        .await
    }

    async fn read_result(&self, ctx: &TickContext, draw_id: u64) -> Result<Option<DrawResult>> {
        let program = self.program.as_ref();
        run_with_retry(
            ctx.retry,
            &format!("{} fetch_draw_result {}", self.game(), draw_id),
            move |_| program.fetch_draw_result(draw_id),
        )
        .await
    }

    async fn run_pipeline(&self, ctx: &TickContext, draw_id: u64, report: &mut TickReport) {
        let mut draw = DrawState::new(self.game(), draw_id);
        tracing::info!("[DRAW] {} draw {} starting", self.game(), draw_id);
        let outcome = self.drive_from_idle(ctx, &mut draw, report).await;
        self.settle(draw, outcome, report);
    }

    async fn drive_from_idle(
        &self,
        ctx: &TickContext,
        draw: &mut DrawState,
        report: &mut TickReport,
    ) -> Result<TickOutcome> {
        draw.advance(DrawPhase::AwaitingCommit)?;
        self.commit(ctx, draw, report).await?;
        if !ctx.reveal_wait.is_zero() {
            tracing::info!(
                "[DRAW] {} draw {} waiting {:?} for the oracle reveal",
                self.game(),
                draw.draw_id,
                ctx.reveal_wait
            );
            tokio::time::sleep(ctx.reveal_wait).await;
        }
        self.drive_from_committed(ctx, draw, report).await
    }

    async fn drive_from_committed(
        &self,
        ctx: &TickContext,
        draw: &mut DrawState,
        report: &mut TickReport,
    ) -> Result<TickOutcome> {
        let result = self.execute(ctx, draw, report).await?;
        self.drive_from_executed(ctx, draw, &result, report).await
    }

    async fn drive_from_executed(
        &self,
        ctx: &TickContext,
        draw: &mut DrawState,
        result: &DrawResult,
        report: &mut TickReport,
    ) -> Result<TickOutcome> {
        let index = self.index(ctx, draw, result, report).await?;
        if ctx.dry_run {
            tracing::info!(
                "[DRAW] {} dry run: would finalize draw {} with {} winners",
                self.game(),
                draw.draw_id,
                index.winner_counts.total_winners()
            );
            return Ok(TickOutcome::Planned);
        }
        self.finalize(ctx, draw, &index, report).await?;
        Ok(TickOutcome::Finalized)
    }

    async fn commit(&self, ctx: &TickContext, draw: &mut DrawState, report: &mut TickReport) -> Result<()> {
        let program = self.program.as_ref();
        let draw_id = draw.draw_id;
        let receipt = run_with_retry(
            ctx.retry,
            &format!("{} commit draw {}", self.game(), draw_id),
            move |attempt| commit_attempt(program, draw_id, attempt),
        )
        .await?;
        let (signature, randomness, slot) = receipt;
        report.signatures.extend(signature);
        draw.randomness_account = Some(randomness);
        draw.commit_slot = Some(slot);
        draw.advance(DrawPhase::Committed)?;
        tracing::info!(
            "[DRAW] {} draw {} committed at slot {} (randomness {})",
            self.game(),
            draw_id,
            slot,
            randomness
        );
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &TickContext,
        draw: &mut DrawState,
        report: &mut TickReport,
    ) -> Result<DrawResult> {
        let program = self.program.as_ref();
        let draw_id = draw.draw_id;
        let (signature, result) = run_with_retry(
            ctx.retry,
            &format!("{} execute draw {}", self.game(), draw_id),
            move |attempt| execute_attempt(program, draw_id, attempt),
        )
        .await?;
        report.signatures.extend(signature);
        draw.winning_numbers = Some(result.winning_numbers.clone());
        draw.advance(DrawPhase::Executed)?;
        tracing::info!(
            "[DRAW] {} draw {} executed: numbers={:?} tickets={} rolldown={}",
            self.game(),
            draw_id,
            result.winning_numbers,
            result.total_tickets,
            result.was_rolldown
        );
        Ok(result)
    }

    async fn index(
        &self,
        ctx: &TickContext,
        draw: &mut DrawState,
        result: &DrawResult,
        report: &mut TickReport,
    ) -> Result<IndexResult> {
        let nonce = ctx.nonce.unwrap_or_else(rand::random::<u64>);
        draw.nonce = Some(nonce);
        let program = self.program.as_ref();
        let rules = &self.rules;
        let index = run_with_retry(
            ctx.retry,
            &format!("{} index draw {}", self.game(), draw.draw_id),
            move |_| index_draw(program, rules, result, nonce, ctx.page_size),
        )
        .await?;

        if !index.is_complete() {
            let message = format!(
                "scanned {} tickets but the draw result records {}",
                index.tickets_scanned, index.expected_tickets
            );
            tracing::warn!("[INDEX] {} draw {} {}", self.game(), draw.draw_id, message);
            self.alert(
                Some(draw.draw_id),
                AlertKind::TicketCountMismatch,
                message,
                Some(serde_json::json!({
                    "tickets_scanned": index.tickets_scanned,
                    "expected_tickets": index.expected_tickets,
                })),
            );
        }

        let anomalies = check_plausibility(
            &self.rules,
            &index.winner_counts,
            index.tickets_scanned,
            &ctx.plausibility,
        );
        if !anomalies.is_empty() {
            let summary = anomalies
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(
                "[INDEX] {} draw {} implausible winner counts: {}",
                self.game(),
                draw.draw_id,
                summary
            );
            self.alert(
                Some(draw.draw_id),
                AlertKind::PlausibilityWarning,
                summary,
                serde_json::to_value(&anomalies).ok(),
            );
        }
        report.anomalies = anomalies;
        draw.index_result = Some(index.clone());
        draw.advance(DrawPhase::Indexed)?;
        Ok(index)
    }

    async fn finalize(
        &self,
        ctx: &TickContext,
        draw: &mut DrawState,
        index: &IndexResult,
        report: &mut TickReport,
    ) -> Result<()> {
        let claim = FinalizeClaim {
            draw_id: index.draw_id,
            winner_counts: index.winner_counts.clone(),
            verification_hash: index.verification_hash,
            nonce: index.nonce,
        };
        let program = self.program.as_ref();
        let claim = &claim;
        let signature = run_with_retry(
            ctx.retry,
            &format!("{} finalize draw {}", self.game(), claim.draw_id),
            move |attempt| finalize_attempt(program, claim, attempt),
        )
        .await?;
        report.signatures.extend(signature);
        draw.advance(DrawPhase::Finalized)?;
        tracing::info!(
            "[DRAW] {} draw {} finalized: {} winners, hash={}",
            self.game(),
            claim.draw_id,
            claim.winner_counts.total_winners(),
            hex::encode(claim.verification_hash)
        );
        Ok(())
    }

    async fn cancel(&self, ctx: &TickContext, draw_id: u64, reason: &str, report: &mut TickReport) -> Result<()> {
        let program = self.program.as_ref();
        let signature = run_with_retry(
            ctx.retry,
            &format!("{} cancel draw {}", self.game(), draw_id),
            move |attempt| cancel_attempt(program, draw_id, reason, attempt),
        )
        .await?;
        report.signatures.extend(signature);
        Ok(())
    }

    async fn run_recovery(
        &self,
        ctx: &TickContext,
        state: &ProgramState,
        draw_id: u64,
        report: &mut TickReport,
    ) {
        let result = match self.read_result(ctx, draw_id).await {
            Ok(result) => result,
            Err(err) => {
                let draw = DrawState::resumed(self.game(), draw_id, DrawPhase::Committed);
                self.settle(draw, Err(err), report);
                return;
            }
        };
        let plan = plan_recovery(state, result.as_ref(), &self.rules, ctx.now_unix);
        tracing::info!("[RECOVERY] {} draw {}: {:?}", self.game(), draw_id, plan);
        report.recovery = Some(plan.clone());

        match (plan, result) {
            (RecoveryPlan::AlreadyFinalized { .. }, _) => {
                tracing::warn!(
                    "[RECOVERY] {} draw {} is finalized but still flagged in progress",
                    self.game(),
                    draw_id
                );
                report.outcome = TickOutcome::AlreadyFinalized;
                report.draw = Some(DrawState::resumed(self.game(), draw_id, DrawPhase::Finalized));
            }
            (RecoveryPlan::ResumeFinalize { elapsed_secs, .. }, Some(result)) => {
                let mut draw = DrawState::resumed(self.game(), draw_id, DrawPhase::Executed);
                draw.winning_numbers = Some(result.winning_numbers.clone());
                draw.commit_slot = state.has_commit().then_some(state.commit_slot);
                draw.randomness_account = Some(state.current_randomness_account);
                if !ctx.dry_run {
                    self.alert(
                        Some(draw_id),
                        AlertKind::Recovery,
                        format!("resuming index/finalize {elapsed_secs}s after commit"),
                        None,
                    );
                }
                let outcome = self.drive_from_executed(ctx, &mut draw, &result, report).await;
                self.settle(draw, outcome, report);
            }
            (RecoveryPlan::Cancel { elapsed_secs, .. }, _) => {
                let reason = cancel_reason(elapsed_secs, self.rules.commit_timeout_secs);
                let mut draw = DrawState::resumed(self.game(), draw_id, DrawPhase::Committed);
                draw.commit_slot = state.has_commit().then_some(state.commit_slot);
                draw.randomness_account = Some(state.current_randomness_account);
                if ctx.dry_run {
                    tracing::info!("[RECOVERY] {} dry run: would cancel draw {}: {}", self.game(), draw_id, reason);
                    report.outcome = TickOutcome::Planned;
                    report.draw = Some(draw);
                    return;
                }
                match self.cancel(ctx, draw_id, &reason, report).await {
                    Ok(()) => {
                        tracing::warn!("[RECOVERY] {} draw {} cancelled: {}", self.game(), draw_id, reason);
                        self.alert(Some(draw_id), AlertKind::DrawCancelled, reason, None);
                        report.outcome = TickOutcome::Cancelled;
                        report.draw = Some(draw);
                    }
                    Err(err) => self.settle(draw, Err(err), report),
                }
            }
            (RecoveryPlan::ResumeExecute { elapsed_secs, .. }, _) => {
                let mut draw = DrawState::resumed(self.game(), draw_id, DrawPhase::Committed);
                draw.commit_slot = state.has_commit().then_some(state.commit_slot);
                draw.randomness_account = Some(state.current_randomness_account);
                if ctx.dry_run {
                    tracing::info!(
                        "[RECOVERY] {} dry run: would execute draw {} ({}s after commit)",
                        self.game(),
                        draw_id,
                        elapsed_secs
                    );
                    report.outcome = TickOutcome::Planned;
                    report.draw = Some(draw);
                    return;
                }
                let outcome = self.drive_from_committed(ctx, &mut draw, report).await;
                if outcome.is_err() {
                    tracing::warn!(
                        "[RECOVERY] {} draw {} left in progress for the next tick",
                        self.game(),
                        draw_id
                    );
                }
                self.settle(draw, outcome, report);
            }
            (RecoveryPlan::ResumeFinalize { .. }, None) => {
                // plan_recovery only resumes finalize when a result was read.
                let err = ProtocolError::DrawResultMissing(draw_id).into();
                self.settle(DrawState::new(self.game(), draw_id), Err(err), report);
            }
        }
    }

    /// Records the end state of a run and escalates failures.
    fn settle(&self, mut draw: DrawState, outcome: Result<TickOutcome>, report: &mut TickReport) {
        match outcome {
            Ok(outcome) => report.outcome = outcome,
            Err(err) => {
                let failed_in = draw.phase;
                let message = compact_error(&err);
                draw.fail(message.clone());
                tracing::error!(
                    "[DRAW] {} draw {} failed after phase {}: {}",
                    self.game(),
                    draw.draw_id,
                    failed_in,
                    message
                );
                self.alert(
                    Some(draw.draw_id),
                    AlertKind::PhaseFailed,
                    format!("failed after phase {failed_in}: {message}"),
                    None,
                );
                report.outcome = TickOutcome::Failed;
                report.error = Some(message);
            }
        }
        report.draw = Some(draw);
    }
}

// Each attempt after the first re-reads the chain and skips the submission when the
// previous attempt turns out to have landed.

async fn commit_attempt<P: LotteryProgram + ?Sized>(
    program: &P,
    draw_id: u64,
    attempt: u32,
) -> Result<(Option<String>, Pubkey, u64)> {
    if attempt > 0 {
        let state = program.fetch_state().await?;
        if state.current_draw_id != draw_id {
            return Err(ProtocolError::DrawMoved {
                draw_id,
                observed: state.current_draw_id,
            }
            .into());
        }
        if state.is_draw_in_progress {
            tracing::info!(
                "[DRAW] {} draw {} commit already landed; not resubmitting",
                program.game(),
                draw_id
            );
            return Ok((None, state.current_randomness_account, state.commit_slot));
        }
    }
    let receipt = program.commit_randomness().await?;
    Ok((
        Some(receipt.signature),
        receipt.randomness_account,
        receipt.commit_slot,
    ))
}

async fn execute_attempt<P: LotteryProgram + ?Sized>(
    program: &P,
    draw_id: u64,
    attempt: u32,
) -> Result<(Option<String>, DrawResult)> {
    if attempt > 0 {
        if let Some(result) = program.fetch_draw_result(draw_id).await? {
            tracing::info!(
                "[DRAW] {} draw {} execute already landed; not resubmitting",
                program.game(),
                draw_id
            );
            return Ok((None, result));
        }
    }
    let signature = program.execute_draw(draw_id).await?;
    let result = program
        .fetch_draw_result(draw_id)
        .await?
        .ok_or(ProtocolError::DrawResultMissing(draw_id))?;
    Ok((Some(signature), result))
}

async fn finalize_attempt<P: LotteryProgram + ?Sized>(
    program: &P,
    claim: &FinalizeClaim,
    attempt: u32,
) -> Result<Option<String>> {
    if attempt > 0 {
        let landed = program
            .fetch_draw_result(claim.draw_id)
            .await?
            .is_some_and(|r| r.is_explicitly_finalized);
        if landed {
            tracing::info!(
                "[DRAW] {} draw {} finalize already landed; not resubmitting",
                program.game(),
                claim.draw_id
            );
            return Ok(None);
        }
    }
    program.finalize_draw(claim).await.map(Some)
}

async fn cancel_attempt<P: LotteryProgram + ?Sized>(
    program: &P,
    draw_id: u64,
    reason: &str,
    attempt: u32,
) -> Result<Option<String>> {
    if attempt > 0 {
        let state = program.fetch_state().await?;
        if !state.is_draw_in_progress || state.current_draw_id != draw_id {
            return Ok(None);
        }
        // A late Execute turns the draw into one that must not be discarded.
        if program.fetch_draw_result(draw_id).await?.is_some() {
            return Err(ProtocolError::IllegalTransition {
                draw_id,
                from: DrawPhase::Executed.as_str(),
                to: "cancelled",
            }
            .into());
        }
    }
    program.cancel_draw(draw_id, reason).await.map(Some)
}
