use crate::anchor_utils::*;
use draw_keeper::chain::memory::LedgerOp;
use draw_keeper::chain::DrawResult;
use draw_keeper::draw::alerts::AlertKind;
use draw_keeper::draw::{GameRules, TickOutcome};

#[tokio::test]
async fn dry_run_reports_the_commit_without_submitting() {
    let ledger = main_ledger();
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let mut ctx = fast_ctx(DRAW_AT);
    ctx.dry_run = true;

    let report = orchestrator.run_tick(&ctx).await;

    assert_eq!(report.outcome, TickOutcome::Planned);
    assert_eq!(report.draw_id(), Some(DRAW_ID));
    assert_eq!(ledger.attempts(LedgerOp::CommitRandomness), 0);
    assert!(ledger.landed_submissions().is_empty());
}

#[tokio::test]
async fn dry_run_indexes_but_does_not_finalize() {
    let ledger = main_ledger();
    commit_in_place(&ledger, DRAW_AT - 30);
    ledger.insert_result(DrawResult {
        draw_id: DRAW_ID,
        winning_numbers: MAIN_WINNING.to_vec(),
        total_tickets: LOSER_TICKETS + 3,
        was_rolldown: true,
        is_explicitly_finalized: false,
    });
    let (orchestrator, alerts) = orchestrator(&ledger);
    let mut ctx = fast_ctx(DRAW_AT);
    ctx.dry_run = true;

    let report = orchestrator.run_tick(&ctx).await;

    assert_eq!(report.outcome, TickOutcome::Planned);
    assert!(report.draw.as_ref().is_some_and(|d| d.index_result.is_some()));
    assert_eq!(ledger.attempts(LedgerOp::FinalizeDraw), 0);
    assert_eq!(alerts.count(AlertKind::Recovery), 0);
}

#[tokio::test]
async fn dry_run_does_not_cancel_a_stuck_draw() {
    let ledger = main_ledger();
    let timeout = GameRules::main().commit_timeout_secs;
    commit_in_place(&ledger, DRAW_AT - timeout - 100);
    let (orchestrator, alerts) = orchestrator(&ledger);
    let mut ctx = fast_ctx(DRAW_AT);
    ctx.dry_run = true;

    let report = orchestrator.run_tick(&ctx).await;

    assert_eq!(report.outcome, TickOutcome::Planned);
    assert_eq!(ledger.attempts(LedgerOp::CancelDraw), 0);
    assert_eq!(alerts.count(AlertKind::DrawCancelled), 0);
    assert!(ledger.state().is_draw_in_progress);
}
