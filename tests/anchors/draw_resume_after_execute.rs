use crate::anchor_utils::*;
use draw_keeper::chain::memory::LedgerOp;
use draw_keeper::chain::DrawResult;
use draw_keeper::draw::alerts::AlertKind;
use draw_keeper::draw::recovery::RecoveryPlan;
use draw_keeper::draw::TickOutcome;

fn executed_ledger(commit_at: i64) -> std::sync::Arc<draw_keeper::chain::memory::MemoryLedger> {
    let ledger = main_ledger();
    commit_in_place(&ledger, commit_at);
    ledger.insert_result(DrawResult {
        draw_id: DRAW_ID,
        winning_numbers: MAIN_WINNING.to_vec(),
        total_tickets: LOSER_TICKETS + 3,
        was_rolldown: false,
        is_explicitly_finalized: false,
    });
    ledger
}

#[tokio::test]
async fn executed_draw_is_indexed_once_and_finalized_once() {
    let ledger = executed_ledger(DRAW_AT - 30);
    let (orchestrator, alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    assert!(matches!(report.recovery, Some(RecoveryPlan::ResumeFinalize { elapsed_secs: 30, .. })));
    assert_eq!(ledger.attempts(LedgerOp::CommitRandomness), 0);
    assert_eq!(ledger.attempts(LedgerOp::ExecuteDraw), 0);
    assert_eq!(ledger.count(LedgerOp::FinalizeDraw), 1);
    // 51 tickets at page size 10 is exactly one pass of six pages.
    assert_eq!(ledger.count(LedgerOp::FetchTicketPage), 6);
    assert_eq!(alerts.count(AlertKind::Recovery), 1);
    assert_eq!(ledger.finalize_claims()[0].winner_counts.get(6), 1);
}

#[tokio::test]
async fn executed_draw_is_finalized_even_long_after_the_commit_timeout() {
    let ledger = executed_ledger(DRAW_AT - 10 * 86_400);
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized);
    assert_eq!(ledger.attempts(LedgerOp::CancelDraw), 0);
    assert!(ledger.result(DRAW_ID).is_some_and(|r| r.is_explicitly_finalized));
}

#[tokio::test]
async fn finalized_result_with_stale_flag_is_not_touched() {
    let ledger = executed_ledger(DRAW_AT - 30);
    ledger.insert_result(DrawResult {
        draw_id: DRAW_ID,
        winning_numbers: MAIN_WINNING.to_vec(),
        total_tickets: LOSER_TICKETS + 3,
        was_rolldown: false,
        is_explicitly_finalized: true,
    });
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::AlreadyFinalized);
    assert!(ledger.landed_submissions().is_empty());
    assert_eq!(ledger.attempts(LedgerOp::FetchTicketPage), 0);
}
