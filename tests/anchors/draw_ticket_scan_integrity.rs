use crate::anchor_utils::*;
use draw_keeper::chain::memory::{Fault, LedgerOp, MemoryLedger};
use draw_keeper::chain::DrawResult;
use draw_keeper::draw::alerts::AlertKind;
use draw_keeper::draw::state::DrawPhase;
use draw_keeper::draw::TickOutcome;
use draw_keeper::utils::retry::RetryPolicy;
use std::sync::Arc;

fn executed_with_total(total_tickets: u64) -> Arc<MemoryLedger> {
    let ledger = main_ledger();
    commit_in_place(&ledger, DRAW_AT - 30);
    ledger.insert_result(DrawResult {
        draw_id: DRAW_ID,
        winning_numbers: MAIN_WINNING.to_vec(),
        total_tickets,
        was_rolldown: false,
        is_explicitly_finalized: false,
    });
    ledger
}

#[tokio::test]
async fn stalled_cursor_fails_the_tick_instead_of_finalizing() {
    let ledger = executed_with_total(LOSER_TICKETS + 3);
    ledger.inject_fault(LedgerOp::FetchTicketPage, Fault::StalledCursor);
    let (orchestrator, alerts) = orchestrator(&ledger);
    let mut ctx = fast_ctx(DRAW_AT);
    ctx.retry = RetryPolicy::no_retry();

    let report = orchestrator.run_tick(&ctx).await;

    assert_eq!(report.outcome, TickOutcome::Failed);
    assert_eq!(report.phase(), DrawPhase::Error);
    assert!(
        report.error.as_deref().is_some_and(|e| e.contains("stalled at cursor 0")),
        "error: {:?}",
        report.error
    );
    assert_eq!(ledger.attempts(LedgerOp::FinalizeDraw), 0);
    assert!(ledger.finalize_claims().is_empty());
    assert_eq!(alerts.count(AlertKind::PhaseFailed), 1);
}

#[tokio::test]
async fn stalled_cursor_is_rescanned_from_the_start_on_retry() {
    let ledger = executed_with_total(LOSER_TICKETS + 3);
    ledger.inject_fault(LedgerOp::FetchTicketPage, Fault::StalledCursor);
    let (orchestrator, alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    // One stalled page, then a clean six-page pass.
    assert_eq!(ledger.count(LedgerOp::FetchTicketPage), 7);
    let claims = ledger.finalize_claims();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0].winner_counts.total_winners(), 3);
    assert_eq!(alerts.count(AlertKind::PhaseFailed), 0);
    assert_eq!(alerts.count(AlertKind::TicketCountMismatch), 0);
}

#[tokio::test]
async fn ticket_count_mismatch_is_escalated_to_the_operator() {
    let ledger = executed_with_total(5_000);
    let (orchestrator, alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    let index = report
        .draw
        .as_ref()
        .and_then(|d| d.index_result.as_ref())
        .expect("index result recorded");
    assert_eq!(index.tickets_scanned, LOSER_TICKETS + 3);
    assert_eq!(index.expected_tickets, 5_000);
    assert!(!index.is_complete());

    let mismatches: Vec<_> = alerts
        .alerts()
        .into_iter()
        .filter(|a| a.kind == AlertKind::TicketCountMismatch)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].draw_id, Some(DRAW_ID));
    assert!(mismatches[0].message.contains("scanned 51 tickets"));
    assert!(mismatches[0].message.contains("records 5000"));
}
