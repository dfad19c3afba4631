use draw_keeper::draw::alerts::{AlertSink, WebhookAlertSink};
use draw_keeper::runtime::{
    connect, emit_startup_status, emit_tick_summary, reject_cli_args, solana_program,
    CycleOutcome, Keeper,
};
use draw_keeper::storage::OpsStore;
use draw_keeper::utils::clock::now_unix_secs;
use draw_keeper::utils::config::Config;
use draw_keeper::utils::telemetry::TelemetryWorker;
use solana_sdk::signer::Signer;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    reject_cli_args(std::env::args().skip(1))?;
    draw_keeper::utils::env_guard::harden_env_setup();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        eprintln!("[STARTUP] RUST_LOG invalid or unset; defaulting to 'info'");
        tracing_subscriber::EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;
    let (rpc, authority) = connect(&config)?;
    emit_startup_status(&config, &authority.pubkey());

    let ops = OpsStore::open(&config.state_db)?;
    let alerts: Arc<dyn AlertSink> = Arc::new(WebhookAlertSink::new(TelemetryWorker::spawn(
        config.telemetry.clone(),
    )));

    let mut keeper = Keeper::from_config(&config, ops);
    for game in &config.games {
        let program = solana_program(&config, *game, rpc.clone(), authority.clone());
        keeper.add_game(program, config.rules(*game), alerts.clone());
    }

    if config.loop_mode {
        tracing::info!(
            "[OPS] loop mode; cycling every {}s",
            config.tick_interval.as_secs()
        );
        keeper.run_loop(config.tick_interval).await;
        return Ok(());
    }

    match keeper.run_cycle(now_unix_secs()).await? {
        CycleOutcome::Paused => {}
        CycleOutcome::Ran(reports) => emit_tick_summary(&reports),
    }
    Ok(())
}
