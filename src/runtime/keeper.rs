use crate::chain::oracle::SwitchboardOnDemand;
use crate::chain::solana::SolanaLotteryClient;
use crate::chain::LotteryProgram;
use crate::draw::alerts::AlertSink;
use crate::draw::game::{Game, GameRules};
use crate::draw::orchestrator::{DrawOrchestrator, TickContext, TickReport};
use crate::storage::ops_store::OpsStore;
use crate::utils::clock::now_unix_secs;
use crate::utils::config::Config;
use crate::utils::error::compact_error;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use std::time::Duration;

const TRIGGER_POLL: Duration = Duration::from_secs(1);

/// Opens the RPC connection and loads the authority keypair.
pub fn connect(config: &Config) -> anyhow::Result<(Arc<RpcClient>, Arc<Keypair>)> {
    let authority = config.keypair.load()?;
    let rpc = RpcClient::new_with_commitment(config.rpc_url.clone(), CommitmentConfig::confirmed());
    Ok((Arc::new(rpc), Arc::new(authority)))
}

pub fn solana_program(
    config: &Config,
    game: Game,
    rpc: Arc<RpcClient>,
    authority: Arc<Keypair>,
) -> Arc<dyn LotteryProgram> {
    Arc::new(SolanaLotteryClient::new(
        rpc,
        authority,
        game,
        config.program_id(game),
        SwitchboardOnDemand::new(config.oracle),
    ))
}

#[derive(Debug)]
pub enum CycleOutcome {
    Paused,
    Ran(Vec<TickReport>),
}

/// Runs every configured game once per cycle and records the result for `keeper_ctl`.
pub struct Keeper {
    games: Vec<DrawOrchestrator<dyn LotteryProgram>>,
    ops: OpsStore,
    template: TickContext,
}

impl Keeper {
    /// `template` supplies everything except the timestamp, which is taken per cycle.
    pub fn new(ops: OpsStore, template: TickContext) -> Self {
        Self {
            games: Vec::new(),
            ops,
            template,
        }
    }

    pub fn from_config(config: &Config, ops: OpsStore) -> Self {
        let mut template = TickContext::new(0);
        template.dry_run = config.dry_run;
        template.retry = config.retry;
        template.reveal_wait = config.reveal_wait;
        template.page_size = config.page_size;
        template.plausibility = config.plausibility;
        Self::new(ops, template)
    }

    pub fn add_game(&mut self, program: Arc<dyn LotteryProgram>, rules: GameRules, alerts: Arc<dyn AlertSink>) {
        self.games.push(DrawOrchestrator::new(program, rules, alerts));
    }

    pub fn ops(&self) -> &OpsStore {
        &self.ops
    }

    /// One pass over all games. Games run in sequence; a failure in one never stops the next.
    pub async fn run_cycle(&self, now_unix: i64) -> anyhow::Result<CycleOutcome> {
        if self.ops.is_paused()? {
            tracing::info!("[OPS] keeper paused; skipping cycle");
            return Ok(CycleOutcome::Paused);
        }
        if self.ops.take_trigger()? {
            tracing::info!("[OPS] manual trigger consumed");
        }

        let mut ctx = self.template.clone();
        ctx.now_unix = now_unix;
        let mut reports = Vec::with_capacity(self.games.len());
        for orchestrator in &self.games {
            let report = orchestrator.run_tick(&ctx).await;
            if let Err(err) = self.ops.record_tick(&report) {
                tracing::warn!(
                    "[OPS] could not record {} tick: {}",
                    orchestrator.rules().game,
                    compact_error(&err)
                );
            }
            reports.push(report);
        }
        Ok(CycleOutcome::Ran(reports))
    }

    /// Runs cycles forever, `interval` apart. A pending manual trigger cuts the wait short.
    /// An unreadable ops store skips that cycle only.
    pub async fn run_loop(&self, interval: Duration) {
        loop {
            match self.run_cycle(now_unix_secs()).await {
                Ok(CycleOutcome::Ran(reports)) => super::status::emit_tick_summary(&reports),
                Ok(CycleOutcome::Paused) => {}
                Err(err) => tracing::warn!(
                    "[OPS] skipping cycle, ops store unavailable: {}",
                    compact_error(&err)
                ),
            }
            self.wait_for_next_cycle(interval).await;
        }
    }

    async fn wait_for_next_cycle(&self, interval: Duration) {
        let mut waited = Duration::ZERO;
        while waited < interval {
            let step = TRIGGER_POLL.min(interval - waited);
            tokio::time::sleep(step).await;
            waited += step;
            match self.ops.trigger_requested() {
                Ok(true) => {
                    tracing::info!("[OPS] manual trigger received");
                    return;
                }
                Ok(false) => {}
                Err(err) => tracing::warn!("[OPS] trigger poll failed: {}", compact_error(&err)),
            }
        }
    }
}

/// Operator-issued zero-winner finalize. Refuses unless `draw_id` is the in-progress draw and
/// already has an unfinalized result.
pub async fn force_finalize(
    program: &dyn LotteryProgram,
    draw_id: u64,
    reason: &str,
) -> anyhow::Result<String> {
    let game = program.game();
    let state = program.fetch_state().await?;
    if !state.is_draw_in_progress || state.current_draw_id != draw_id {
        anyhow::bail!(
            "{game} draw {draw_id} is not in progress (current draw {}, in progress: {})",
            state.current_draw_id,
            state.is_draw_in_progress
        );
    }
    let Some(result) = program.fetch_draw_result(draw_id).await? else {
        anyhow::bail!("{game} draw {draw_id} has no result yet; cancel it instead");
    };
    if result.is_explicitly_finalized {
        anyhow::bail!("{game} draw {draw_id} is already finalized");
    }
    tracing::warn!("[OPS] force-finalizing {} draw {}: {}", game, draw_id, reason);
    Ok(program.force_finalize_draw(draw_id, reason).await?)
}
