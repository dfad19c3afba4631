use draw_keeper::runtime::{
    connect, keeper::force_finalize, parse_ctl_args, render_ops_status, solana_program,
    CtlCommand,
};
use draw_keeper::storage::OpsStore;
use draw_keeper::utils::config::{state_db_path, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    draw_keeper::utils::env_guard::harden_env_setup();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let command = parse_ctl_args(std::env::args().skip(1))?;
    let ops = OpsStore::open(state_db_path())?;

    match command {
        CtlCommand::Status { json } => {
            let status = ops.status()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", render_ops_status(&status));
            }
        }
        CtlCommand::Pause => {
            ops.set_paused(true)?;
            println!("keeper paused");
        }
        CtlCommand::Resume => {
            ops.set_paused(false)?;
            println!("keeper resumed");
        }
        CtlCommand::Trigger => {
            ops.request_trigger()?;
            println!("trigger queued; the next cycle starts immediately");
        }
        CtlCommand::ForceFinalize {
            game,
            draw_id,
            reason,
        } => {
            let config = Config::load()?;
            let (rpc, authority) = connect(&config)?;
            let program = solana_program(&config, game, rpc, authority);
            let signature = force_finalize(program.as_ref(), draw_id, &reason).await?;
            println!("{game} draw {draw_id} force-finalized: {signature}");
        }
    }
    Ok(())
}
