use crate::anchor_utils::*;
use draw_keeper::chain::memory::{Fault, LedgerOp};
use draw_keeper::draw::TickOutcome;

#[tokio::test]
async fn lost_commit_confirmation_is_not_resubmitted() {
    let ledger = main_ledger();
    ledger.inject_fault(LedgerOp::CommitRandomness, Fault::LostConfirmation);
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    assert_eq!(ledger.attempts(LedgerOp::CommitRandomness), 1);
    assert_eq!(
        ledger.landed_submissions(),
        vec![LedgerOp::CommitRandomness, LedgerOp::ExecuteDraw, LedgerOp::FinalizeDraw]
    );
    // The commit signature was never observed.
    assert_eq!(report.signatures.len(), 2);
    // Slot and randomness come from the reconciled program state.
    let draw = report.draw.as_ref().expect("draw state recorded");
    assert_eq!(draw.commit_slot, Some(1_001));
    assert!(draw.randomness_account.is_some());
}

#[tokio::test]
async fn lost_execute_confirmation_reuses_the_landed_result() {
    let ledger = main_ledger();
    ledger.inject_fault(LedgerOp::ExecuteDraw, Fault::LostConfirmation);
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    assert_eq!(ledger.attempts(LedgerOp::ExecuteDraw), 1);
    assert_eq!(ledger.count(LedgerOp::FinalizeDraw), 1);
}

#[tokio::test]
async fn lost_finalize_confirmation_is_not_resubmitted() {
    let ledger = main_ledger();
    ledger.inject_fault(LedgerOp::FinalizeDraw, Fault::LostConfirmation);
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    assert_eq!(ledger.attempts(LedgerOp::FinalizeDraw), 1);
    assert_eq!(ledger.finalize_claims().len(), 1);
    assert_eq!(ledger.state().current_draw_id, DRAW_ID + 1);
}

#[tokio::test]
async fn transient_transport_faults_are_retried() {
    let ledger = main_ledger();
    ledger.inject_fault(LedgerOp::FetchState, Fault::Transport("connection reset".into()));
    ledger.inject_fault(LedgerOp::FetchTicketPage, Fault::Transport("429".into()));
    ledger.inject_fault(LedgerOp::FinalizeDraw, Fault::Rejected("BlockhashNotFound".into()));
    let (orchestrator, alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    assert_eq!(ledger.attempts(LedgerOp::FinalizeDraw), 2);
    assert_eq!(ledger.count(LedgerOp::FinalizeDraw), 1);
    assert!(alerts.alerts().is_empty());
}
