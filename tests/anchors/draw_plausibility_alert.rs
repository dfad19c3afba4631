use crate::anchor_utils::*;
use draw_keeper::chain::memory::LedgerOp;
use draw_keeper::draw::alerts::AlertKind;
use draw_keeper::draw::TickOutcome;

#[tokio::test]
async fn implausible_match3_count_alerts_but_still_finalizes() {
    let ledger = main_ledger();
    // 300 match-3 tickets on top of the fixture is far above the ~2% expectation.
    ledger.add_tickets((0..300).map(|_| ticket(DRAW_ID, &[3, 11, 17, 40, 41, 42])));
    let (orchestrator, alerts) = orchestrator(&ledger);
    let mut ctx = fast_ctx(DRAW_AT);
    ctx.page_size = 100;

    let report = orchestrator.run_tick(&ctx).await;

    assert_eq!(report.outcome, TickOutcome::Finalized, "error: {:?}", report.error);
    assert_eq!(ledger.count(LedgerOp::FinalizeDraw), 1);
    assert!(report.anomalies.iter().any(|a| a.tier == 3 && a.observed == 302));
    let warnings = alerts
        .alerts()
        .into_iter()
        .filter(|a| a.kind == AlertKind::PlausibilityWarning)
        .collect::<Vec<_>>();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].draw_id, Some(DRAW_ID));
    assert!(warnings[0].message.contains("match3"));
    assert!(warnings[0].details.is_some());
}

#[tokio::test]
async fn ordinary_counts_raise_no_warning() {
    let ledger = main_ledger();
    let (orchestrator, alerts) = orchestrator(&ledger);

    let report = orchestrator.run_tick(&fast_ctx(DRAW_AT)).await;

    assert!(report.anomalies.is_empty());
    assert_eq!(alerts.count(AlertKind::PlausibilityWarning), 0);
}
