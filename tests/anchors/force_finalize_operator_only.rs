use std::fs;

#[test]
fn force_finalize_is_only_reachable_from_keeper_ctl() {
    let orchestrator_source = fs::read_to_string("src/draw/orchestrator.rs")
        .expect("src/draw/orchestrator.rs must be readable for anchor");
    let main_source =
        fs::read_to_string("src/main.rs").expect("src/main.rs must be readable for anchor");
    let ctl_source = fs::read_to_string("src/bin/keeper_ctl.rs")
        .expect("src/bin/keeper_ctl.rs must be readable for anchor");

    assert!(
        !orchestrator_source.contains("force_finalize"),
        "the scheduled pipeline must never force-finalize a draw"
    );
    assert!(
        !main_source.contains("force_finalize"),
        "the keeper binary must never force-finalize a draw"
    );
    assert!(
        ctl_source.contains("CtlCommand::ForceFinalize") && ctl_source.contains("force_finalize("),
        "keeper_ctl must expose force-finalize as an explicit operator command"
    );
}

#[test]
fn pipeline_waits_for_reveal_instead_of_polling() {
    let orchestrator_source = fs::read_to_string("src/draw/orchestrator.rs")
        .expect("src/draw/orchestrator.rs must be readable for anchor");
    assert!(
        orchestrator_source.contains("tokio::time::sleep(ctx.reveal_wait)"),
        "execute must follow a fixed reveal wait"
    );
    assert!(
        !orchestrator_source.contains("loop {"),
        "the orchestrator must not poll the oracle in a loop"
    );
}
