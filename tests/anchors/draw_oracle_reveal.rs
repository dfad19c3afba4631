use crate::anchor_utils::*;
use draw_keeper::chain::memory::LedgerOp;
use draw_keeper::draw::alerts::AlertKind;
use draw_keeper::draw::recovery::RecoveryPlan;
use draw_keeper::draw::state::DrawPhase;
use draw_keeper::draw::TickOutcome;
use draw_keeper::utils::retry::RetryPolicy;
use std::time::Duration;

#[tokio::test]
async fn unrevealed_oracle_leaves_the_draw_in_progress() {
    let ledger = main_ledger();
    ledger.set_oracle_revealed(false);
    let (orchestrator, alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Failed);
    assert_eq!(report.phase(), DrawPhase::Error);
    assert!(report.error.as_deref().is_some_and(|e| e.contains("not been revealed")));
    assert_eq!(ledger.attempts(LedgerOp::ExecuteDraw), 4);
    assert_eq!(ledger.count(LedgerOp::ExecuteDraw), 0);
    assert_eq!(alerts.count(AlertKind::PhaseFailed), 1);
    assert!(ledger.state().is_draw_in_progress);
    assert!(ledger.finalize_claims().is_empty());
}

#[tokio::test]
async fn next_tick_resumes_execute_without_recommitting() {
    let ledger = main_ledger();
    ledger.set_oracle_revealed(false);
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let first = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;
    assert_eq!(first.outcome, TickOutcome::Failed);

    ledger.set_oracle_revealed(true);
    let second = orchestrator.run_tick(&fast_ctx(DRAW_AT + 60)).await;

    assert!(matches!(second.recovery, Some(RecoveryPlan::ResumeExecute { elapsed_secs: 60, .. })));
    assert_eq!(second.outcome, TickOutcome::Finalized, "error: {:?}", second.error);
    assert_eq!(ledger.count(LedgerOp::CommitRandomness), 1);
    assert_eq!(ledger.count(LedgerOp::ExecuteDraw), 1);
    assert_eq!(ledger.count(LedgerOp::FinalizeDraw), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_waits_one_two_four_seconds() {
    let ledger = main_ledger();
    ledger.set_oracle_revealed(false);
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let mut ctx = fast_ctx(DRAW_AT);
    ctx.retry = RetryPolicy::default();

    let started = tokio::time::Instant::now();
    let report = orchestrator.run_tick(&ctx).await;

    assert_eq!(report.outcome, TickOutcome::Failed);
    assert_eq!(started.elapsed(), Duration::from_millis(1_000 + 2_000 + 4_000));
}

#[tokio::test(start_paused = true)]
async fn reveal_wait_runs_between_commit_and_execute() {
    let ledger = main_ledger();
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let mut ctx = fast_ctx(DRAW_AT);
    ctx.reveal_wait = Duration::from_secs(10);

    let started = tokio::time::Instant::now();
    let report = orchestrator.run_tick(&ctx).await;

    assert_eq!(report.outcome, TickOutcome::Finalized);
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}
