use crate::anchor_utils::*;
use draw_keeper::chain::memory::LedgerOp;
use draw_keeper::draw::readiness::{NotReadyReason, Readiness};
use draw_keeper::draw::state::DrawPhase;
use draw_keeper::draw::TickOutcome;

#[tokio::test]
async fn main_draw_runs_commit_execute_finalize_in_order() {
    let ledger = main_ledger();
    let (orchestrator, alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    assert_eq!(report.readiness, Some(Readiness::ReadyToStart(DRAW_ID)));
    assert_eq!(report.phase(), DrawPhase::Finalized);
    assert_eq!(
        ledger.landed_submissions(),
        vec![LedgerOp::CommitRandomness, LedgerOp::ExecuteDraw, LedgerOp::FinalizeDraw]
    );
    assert_eq!(report.signatures.len(), 3);
    assert!(alerts.alerts().is_empty());
    let draw = report.draw.as_ref().expect("draw state recorded");
    assert_eq!(draw.commit_slot, Some(1_001));
    assert!(draw.randomness_account.is_some());

    let claims = ledger.finalize_claims();
    assert_eq!(claims.len(), 1);
    let claim = &claims[0];
    assert_eq!(claim.draw_id, DRAW_ID);
    assert_eq!(claim.nonce, 0x5eed);
    assert_eq!(claim.winner_counts.get(6), 1);
    assert_eq!(claim.winner_counts.get(3), 2);
    assert_eq!(claim.winner_counts.total_winners(), 3);

    let index = report
        .draw
        .as_ref()
        .and_then(|d| d.index_result.as_ref())
        .expect("index result recorded");
    assert_eq!(index.tickets_scanned, LOSER_TICKETS + 3);
    assert_eq!(index.verification_hash, claim.verification_hash);

    let state = ledger.state();
    assert_eq!(state.current_draw_id, DRAW_ID + 1);
    assert!(!state.is_draw_in_progress);
}

#[tokio::test]
async fn quick_pick_draw_counts_from_match_three() {
    let ledger = quick_pick_ledger();
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    let claims = ledger.finalize_claims();
    assert_eq!(claims[0].winner_counts.get(3), 1);
    assert_eq!(claims[0].winner_counts.total_winners(), 1);
}

#[tokio::test]
async fn repeated_ticks_do_not_start_a_second_draw() {
    let ledger = main_ledger();
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let first = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;
    assert_eq!(first.outcome, TickOutcome::Finalized);
    ledger.reset_calls();

    let second = orchestrator.run_tick(&fast_ctx(DRAW_AT + 5)).await;
    assert_eq!(second.outcome, TickOutcome::Idle);
    assert!(matches!(
        second.readiness,
        Some(Readiness::NotReady(NotReadyReason::SalesOpen { .. }))
    ));
    assert!(ledger.landed_submissions().is_empty());
}

#[tokio::test]
async fn nothing_is_submitted_before_the_sales_cutoff() {
    let ledger = main_ledger();
    let (orchestrator, _alerts) = orchestrator(&ledger);
    let cutoff = orchestrator.rules().ticket_sale_cutoff_secs;

    let early = orchestrator.run_tick(&fast_ctx(DRAW_AT - cutoff - 1)).await;
    assert_eq!(early.outcome, TickOutcome::Idle);
    assert_eq!(
        early.readiness,
        Some(Readiness::NotReady(NotReadyReason::SalesOpen { opens_in_secs: 1 }))
    );

    let at_cutoff = orchestrator.run_tick(&fast_ctx(DRAW_AT - cutoff)).await;
    assert_eq!(at_cutoff.outcome, TickOutcome::Finalized);
}

#[tokio::test]
async fn paused_or_unfunded_program_is_left_alone() {
    let ledger = main_ledger();
    ledger.update_state(|state| state.is_paused = true);
    let (orchestrator, _alerts) = orchestrator(&ledger);

    let paused = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;
    assert_eq!(paused.readiness, Some(Readiness::NotReady(NotReadyReason::Paused)));

    ledger.update_state(|state| {
        state.is_paused = false;
        state.is_funded = false;
    });
    let unfunded = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;
    assert_eq!(unfunded.readiness, Some(Readiness::NotReady(NotReadyReason::NotFunded)));
    assert!(ledger.landed_submissions().is_empty());
}
