use crate::anchor_utils::*;
use draw_keeper::chain::memory::{LedgerOp, MemoryLedger};
use draw_keeper::chain::DrawResult;
use draw_keeper::draw::alerts::RecordingAlertSink;
use draw_keeper::draw::{Game, GameRules};
use draw_keeper::runtime::keeper::force_finalize;
use draw_keeper::runtime::{render_ops_status, CycleOutcome, Keeper};
use draw_keeper::storage::OpsStore;
use std::sync::Arc;
use std::time::Duration;

fn keeper_with_both_games(tag: &str) -> (Keeper, Arc<MemoryLedger>, Arc<MemoryLedger>) {
    let ops = OpsStore::open(temp_db_path(tag)).expect("open ops store");
    let mut keeper = Keeper::new(ops, fast_ctx(0));
    let alerts = Arc::new(RecordingAlertSink::new());
    let main = main_ledger();
    let quick_pick = quick_pick_ledger();
    keeper.add_game(main.clone(), GameRules::main(), alerts.clone());
    keeper.add_game(quick_pick.clone(), GameRules::quick_pick(), alerts);
    (keeper, main, quick_pick)
}

#[tokio::test]
async fn paused_keeper_touches_no_chain() {
    let (keeper, main, quick_pick) = keeper_with_both_games("paused");
    keeper.ops().set_paused(true).expect("pause");

    let outcome = keeper.run_cycle(DRAW_AT).await.expect("cycle");

    assert!(matches!(outcome, CycleOutcome::Paused));
    assert!(main.calls().is_empty());
    assert!(quick_pick.calls().is_empty());
}

#[tokio::test]
async fn cycle_runs_each_game_and_records_stats() {
    let (keeper, main, quick_pick) = keeper_with_both_games("cycle");
    keeper.ops().request_trigger().expect("trigger");

    let outcome = keeper.run_cycle(DRAW_AT).await.expect("cycle");

    let CycleOutcome::Ran(reports) = outcome else {
        panic!("keeper was not paused");
    };
    assert_eq!(reports.len(), 2);
    assert_eq!(main.count(LedgerOp::FinalizeDraw), 1);
    assert_eq!(quick_pick.count(LedgerOp::FinalizeDraw), 1);

    let ops = keeper.ops();
    assert!(!ops.trigger_requested().expect("trigger flag"));
    let stats = ops
        .game_stats(Game::Main)
        .expect("stats")
        .expect("main stats recorded");
    assert_eq!(stats.runs, 1);
    assert_eq!(stats.finalized, 1);
    assert_eq!(stats.last_draw_id, Some(DRAW_ID));
    assert_eq!(stats.last_known_phase, "finalized");

    let status = ops.status().expect("status");
    assert_eq!(status.games.len(), 2);
    assert_eq!(status.recent_runs.len(), 2);
}

#[tokio::test]
async fn failure_in_one_game_does_not_stop_the_other() {
    let (keeper, main, quick_pick) = keeper_with_both_games("isolation");
    main.set_oracle_revealed(false);

    let outcome = keeper.run_cycle(DRAW_AT).await.expect("cycle");

    assert!(matches!(outcome, CycleOutcome::Ran(_)));
    assert_eq!(main.count(LedgerOp::FinalizeDraw), 0);
    assert_eq!(quick_pick.count(LedgerOp::FinalizeDraw), 1);
    let stats = keeper
        .ops()
        .game_stats(Game::Main)
        .expect("stats")
        .expect("main stats recorded");
    assert_eq!(stats.errors, 1);
    assert!(stats.last_error.is_some());
}

#[tokio::test]
async fn recovered_game_clears_its_last_error() {
    let (keeper, main, _quick_pick) = keeper_with_both_games("last_error");
    main.set_oracle_revealed(false);
    keeper.run_cycle(DRAW_AT).await.expect("failing cycle");
    let failed = keeper
        .ops()
        .game_stats(Game::Main)
        .expect("stats")
        .expect("main stats recorded");
    assert_eq!(failed.last_outcome, "failed");
    assert!(failed.last_error.is_some());

    main.set_oracle_revealed(true);
    keeper.run_cycle(DRAW_AT + 60).await.expect("recovering cycle");
    let recovered = keeper
        .ops()
        .game_stats(Game::Main)
        .expect("stats")
        .expect("main stats recorded");
    assert_eq!(recovered.last_outcome, "finalized");
    assert_eq!(recovered.last_error, None);
    assert_eq!(recovered.errors, 1);
    assert_eq!(recovered.runs, 2);
    let rendered = render_ops_status(&keeper.ops().status().expect("status"));
    assert!(!rendered.contains("last error"), "{rendered}");
}

#[tokio::test(start_paused = true)]
async fn loop_outlives_an_unreachable_ops_store() {
    let dir = temp_db_dir("loop_store_gone");
    let ops = OpsStore::open(dir.join("ops.db")).expect("open ops store");
    let mut keeper = Keeper::new(ops, fast_ctx(0));
    let alerts = Arc::new(RecordingAlertSink::new());
    let main = main_ledger();
    keeper.add_game(main.clone(), GameRules::main(), alerts);
    std::fs::remove_dir_all(&dir).expect("remove ops dir");

    let still_running =
        tokio::time::timeout(Duration::from_millis(2_500), keeper.run_loop(Duration::from_secs(1))).await;

    assert!(still_running.is_err(), "loop returned early");
    // Without a readable pause flag no cycle reaches the chain.
    assert!(main.calls().is_empty());
}

#[tokio::test]
async fn force_finalize_requires_an_unfinalized_result() {
    let ledger = main_ledger();
    commit_in_place(&ledger, DRAW_AT - 30);

    let refused = force_finalize(ledger.as_ref(), DRAW_ID, "oracle outage").await;
    assert!(refused.is_err());
    assert_eq!(ledger.attempts(LedgerOp::ForceFinalizeDraw), 0);

    ledger.insert_result(DrawResult {
        draw_id: DRAW_ID,
        winning_numbers: MAIN_WINNING.to_vec(),
        total_tickets: LOSER_TICKETS + 3,
        was_rolldown: false,
        is_explicitly_finalized: false,
    });
    force_finalize(ledger.as_ref(), DRAW_ID, "indexer cannot complete")
        .await
        .expect("force finalize");
    assert_eq!(ledger.count(LedgerOp::ForceFinalizeDraw), 1);
    assert_eq!(ledger.state().current_draw_id, DRAW_ID + 1);
    assert!(force_finalize(ledger.as_ref(), DRAW_ID, "again").await.is_err());
}
