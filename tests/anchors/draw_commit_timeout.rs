use crate::anchor_utils::*;
use draw_keeper::chain::memory::LedgerOp;
use draw_keeper::draw::alerts::AlertKind;
use draw_keeper::draw::recovery::RecoveryPlan;
use draw_keeper::draw::TickOutcome;
use draw_keeper::draw::{GameRules, TickContext};
use draw_keeper::utils::retry::RetryPolicy;

const COMMIT_AT: i64 = DRAW_AT - 600;

fn no_retry_ctx(now: i64) -> TickContext {
    let mut ctx = fast_ctx(now);
    ctx.retry = RetryPolicy::no_retry();
    ctx
}

#[tokio::test]
async fn draw_at_exactly_the_timeout_is_not_cancelled() {
    let ledger = main_ledger();
    commit_in_place(&ledger, COMMIT_AT);
    ledger.set_oracle_revealed(false);
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let timeout = GameRules::main().commit_timeout_secs;

    let report = orchestrator.run_tick(&no_retry_ctx(COMMIT_AT + timeout)).await;

    assert!(matches!(report.recovery, Some(RecoveryPlan::ResumeExecute { .. })));
    assert_eq!(report.outcome, TickOutcome::Failed);
    assert_eq!(ledger.attempts(LedgerOp::CancelDraw), 0);
    assert!(ledger.state().is_draw_in_progress);
}

#[tokio::test]
async fn draw_one_second_past_the_timeout_is_cancelled() {
    let ledger = main_ledger();
    commit_in_place(&ledger, COMMIT_AT);
    ledger.set_oracle_revealed(false);
    let (orchestrator, alerts) = orchestrator(&ledger);
    let timeout = GameRules::main().commit_timeout_secs;

    let report = orchestrator.run_tick(&no_retry_ctx(COMMIT_AT + timeout + 1)).await;

    assert_eq!(report.outcome, TickOutcome::Cancelled, "error: {:?}", report.error);
    assert_eq!(ledger.landed_submissions(), vec![LedgerOp::CancelDraw]);
    assert_eq!(ledger.attempts(LedgerOp::ExecuteDraw), 0);
    assert_eq!(alerts.count(AlertKind::DrawCancelled), 1);
    let state = ledger.state();
    assert!(!state.is_draw_in_progress);
    assert_eq!(state.current_draw_id, DRAW_ID);
}

#[tokio::test]
async fn quick_pick_uses_its_own_shorter_timeout() {
    let ledger = quick_pick_ledger();
    commit_in_place(&ledger, COMMIT_AT);
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let timeout = GameRules::quick_pick().commit_timeout_secs;
    assert!(timeout < GameRules::main().commit_timeout_secs);

    let report = orchestrator.run_tick(&no_retry_ctx(COMMIT_AT + timeout + 1)).await;

    assert_eq!(report.outcome, TickOutcome::Cancelled);
}

#[tokio::test]
async fn result_landing_after_the_timeout_is_finalized_not_cancelled() {
    use draw_keeper::chain::LotteryProgram;

    let ledger = main_ledger();
    commit_in_place(&ledger, COMMIT_AT);
    ledger.execute_draw(DRAW_ID).await.expect("late execute");
    ledger.reset_calls();
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let timeout = GameRules::main().commit_timeout_secs;

    let report = orchestrator.run_tick(&fast_ctx(COMMIT_AT + timeout + 1)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized);
    assert_eq!(ledger.attempts(LedgerOp::CancelDraw), 0);
}
