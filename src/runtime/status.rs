use crate::draw::orchestrator::{TickOutcome, TickReport};
use crate::storage::ops_store::OpsStatus;
use crate::utils::config::Config;
use solana_sdk::pubkey::Pubkey;

pub fn emit_startup_status(config: &Config, authority: &Pubkey) {
    let games = config
        .games
        .iter()
        .map(|g| g.as_str())
        .collect::<Vec<_>>()
        .join(",");
    tracing::info!(
        "[STARTUP] draw_keeper authority={} games={} dry_run={} loop={} tick_interval={}s",
        authority,
        games,
        config.dry_run,
        config.loop_mode,
        config.tick_interval.as_secs()
    );
    for game in &config.games {
        let rules = config.rules(*game);
        tracing::info!(
            "[STARTUP] {} program={} pick {}/{} cutoff={}s commit_timeout={}s",
            game,
            config.program_id(*game),
            rules.pick_count,
            rules.pool_size,
            rules.ticket_sale_cutoff_secs,
            rules.commit_timeout_secs
        );
    }
    tracing::info!(
        "[STARTUP] retry max_retries={} base_delay={}ms reveal_wait={}ms page_size={} z={} alerts={}",
        config.retry.max_retries,
        config.retry.base_delay.as_millis(),
        config.reveal_wait.as_millis(),
        config.page_size,
        config.plausibility.z_score,
        if config.telemetry.enabled() { "webhook" } else { "log-only" }
    );
}

pub fn emit_tick_summary(reports: &[TickReport]) {
    for report in reports {
        let draw = report
            .draw_id()
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        match report.outcome {
            TickOutcome::Failed => tracing::error!(
                "[OPS] {} draw {} outcome=failed phase={} error={}",
                report.game,
                draw,
                report.phase(),
                report.error.as_deref().unwrap_or("unknown")
            ),
            outcome => tracing::info!(
                "[OPS] {} draw {} outcome={:?} phase={} txs={}",
                report.game,
                draw,
                outcome,
                report.phase(),
                report.signatures.len()
            ),
        }
    }
}

/// Human-readable `keeper_ctl status` output.
pub fn render_ops_status(status: &OpsStatus) -> String {
    let mut out = format!(
        "paused: {}\ntrigger pending: {}\n",
        status.paused, status.trigger_requested
    );
    if status.games.is_empty() {
        out.push_str("no runs recorded\n");
    }
    for stats in &status.games {
        out.push_str(&format!(
            "{}: draw={} phase={} last={} runs={} finalized={} cancelled={} errors={}\n",
            stats.game,
            stats
                .last_draw_id
                .map_or_else(|| "-".to_string(), |id| id.to_string()),
            stats.last_known_phase,
            stats.last_outcome,
            stats.runs,
            stats.finalized,
            stats.cancelled,
            stats.errors
        ));
        if let Some(err) = &stats.last_error {
            out.push_str(&format!("  last error: {err}\n"));
        }
    }
    out
}
