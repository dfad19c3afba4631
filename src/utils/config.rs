use crate::chain::oracle::{OracleConfig, SWITCHBOARD_ON_DEMAND_MAINNET};
use crate::draw::game::{
    Game, GameRules, MAIN_COMMIT_TIMEOUT_SECS, MAIN_TICKET_SALE_CUTOFF_SECS,
    QUICK_PICK_COMMIT_TIMEOUT_SECS, QUICK_PICK_TICKET_SALE_CUTOFF_SECS,
};
use crate::draw::indexer::DEFAULT_PAGE_SIZE;
use crate::draw::orchestrator::DEFAULT_REVEAL_WAIT;
use crate::draw::plausibility::{PlausibilityConfig, DEFAULT_Z_SCORE};
use crate::error::{ChainError, ConfigError, Result};
use crate::utils::retry::RetryPolicy;
use crate::utils::telemetry::TelemetryConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_STATE_DB: &str = "draw_keeper.db";
const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone, PartialEq, Eq)]
pub enum KeypairSource {
    File(PathBuf),
    Base58(String),
}

impl fmt::Debug for KeypairSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeypairSource::File(path) => f.debug_tuple("File").field(path).finish(),
            KeypairSource::Base58(_) => f.write_str("Base58(<redacted>)"),
        }
    }
}

impl KeypairSource {
    pub fn load(&self) -> Result<Keypair> {
        match self {
            KeypairSource::File(path) => read_keypair_file(path).map_err(|err| {
                ChainError::Signing(format!("cannot read keypair {}: {err}", path.display())).into()
            }),
            KeypairSource::Base58(secret) => {
                let bytes = bs58::decode(secret.trim())
                    .into_vec()
                    .map_err(|err| ConfigError::InvalidConfig(format!("KEEPER_KEYPAIR_B58 is not base58: {err}")))?;
                Keypair::from_bytes(&bytes).map_err(|err| {
                    ConfigError::InvalidConfig(format!("KEEPER_KEYPAIR_B58 is not a keypair: {err}")).into()
                })
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub keypair: KeypairSource,
    pub main_program_id: Pubkey,
    pub quick_pick_program_id: Pubkey,
    pub oracle: OracleConfig,
    pub retry: RetryPolicy,
    pub reveal_wait: Duration,
    pub main_rules: GameRules,
    pub quick_pick_rules: GameRules,
    pub page_size: usize,
    pub plausibility: PlausibilityConfig,
    pub dry_run: bool,
    pub games: Vec<Game>,
    pub state_db: PathBuf,
    pub loop_mode: bool,
    pub tick_interval: Duration,
    pub telemetry: TelemetryConfig,
}

fn missing(name: &str) -> ConfigError {
    ConfigError::MissingConfig(format!("{name} must be set"))
}

fn invalid(name: &str, raw: &str, why: impl fmt::Display) -> ConfigError {
    ConfigError::InvalidConfig(format!("{name}=`{raw}`: {why}"))
}

fn validate_http_url(name: &str, raw: &str) -> Result<()> {
    let parsed = raw
        .parse::<reqwest::Url>()
        .map_err(|e| invalid(name, raw, format!("not a valid URL: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(name, raw, format!("must use http(s), got `{other}`")).into()),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Parses the comma-separated `KEEPER_GAMES` list, keeping first-seen order.
pub fn parse_games(raw: &str) -> std::result::Result<Vec<Game>, String> {
    let mut games = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let game = Game::parse(item).ok_or_else(|| format!("unknown game `{item}`"))?;
        if !games.contains(&game) {
            games.push(game);
        }
    }
    if games.is_empty() {
        return Err("no games selected".to_string());
    }
    Ok(games)
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.get(name).ok_or_else(|| missing(name).into())
    }

    fn pubkey(&self, name: &str) -> Result<Pubkey> {
        let raw = self.required(name)?;
        Pubkey::from_str(&raw).map_err(|e| invalid(name, &raw, e).into())
    }

    fn parsed<T: FromStr>(&self, name: &str, default: T) -> Result<T>
    where
        T::Err: fmt::Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw.parse::<T>().map_err(|e| invalid(name, &raw, e).into()),
        }
    }

    fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            None => Ok(false),
            Some(raw) => parse_bool(&raw).ok_or_else(|| invalid(name, &raw, "expected true/false").into()),
        }
    }
}

/// Path of the operator state database; the only setting `keeper_ctl` needs for local commands.
pub fn state_db_path() -> PathBuf {
    env::var("KEEPER_STATE_DB")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DB))
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env { lookup: &lookup };

        let rpc_url = env.required("SOLANA_RPC_URL")?;
        validate_http_url("SOLANA_RPC_URL", &rpc_url)?;

        let keypair = match (env.get("KEEPER_KEYPAIR_PATH"), env.get("KEEPER_KEYPAIR_B58")) {
            (Some(path), None) => KeypairSource::File(PathBuf::from(path)),
            (None, Some(secret)) => KeypairSource::Base58(secret),
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidConfig(
                    "set only one of KEEPER_KEYPAIR_PATH and KEEPER_KEYPAIR_B58".to_string(),
                )
                .into())
            }
            (None, None) => return Err(missing("KEEPER_KEYPAIR_PATH or KEEPER_KEYPAIR_B58").into()),
        };

        let main_program_id = env.pubkey("MAIN_PROGRAM_ID")?;
        let quick_pick_program_id = env.pubkey("QUICK_PICK_PROGRAM_ID")?;
        if main_program_id == quick_pick_program_id {
            return Err(ConfigError::InvalidConfig(
                "MAIN_PROGRAM_ID and QUICK_PICK_PROGRAM_ID must differ".to_string(),
            )
            .into());
        }

        let oracle = OracleConfig {
            program_id: match env.get("SWITCHBOARD_PROGRAM_ID") {
                Some(_) => env.pubkey("SWITCHBOARD_PROGRAM_ID")?,
                None => SWITCHBOARD_ON_DEMAND_MAINNET,
            },
            queue: env.pubkey("SWITCHBOARD_QUEUE")?,
            oracle: env.pubkey("SWITCHBOARD_ORACLE")?,
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            env.parsed("RETRY_MAX_RETRIES", defaults.max_retries)?,
            Duration::from_millis(env.parsed("RETRY_BASE_DELAY_MS", defaults.base_delay.as_millis() as u64)?),
        );
        if retry.max_retries > 10 {
            return Err(invalid("RETRY_MAX_RETRIES", &retry.max_retries.to_string(), "at most 10").into());
        }
        let reveal_wait =
            Duration::from_millis(env.parsed("REVEAL_WAIT_MS", DEFAULT_REVEAL_WAIT.as_millis() as u64)?);

        let main_rules = GameRules::main().with_timing(
            env.parsed("MAIN_TICKET_SALE_CUTOFF_SECS", MAIN_TICKET_SALE_CUTOFF_SECS)?,
            env.parsed("MAIN_COMMIT_TIMEOUT_SECS", MAIN_COMMIT_TIMEOUT_SECS)?,
        );
        let quick_pick_rules = GameRules::quick_pick().with_timing(
            env.parsed("QUICK_PICK_TICKET_SALE_CUTOFF_SECS", QUICK_PICK_TICKET_SALE_CUTOFF_SECS)?,
            env.parsed("QUICK_PICK_COMMIT_TIMEOUT_SECS", QUICK_PICK_COMMIT_TIMEOUT_SECS)?,
        );
        for rules in [&main_rules, &quick_pick_rules] {
            if rules.ticket_sale_cutoff_secs < 0 || rules.commit_timeout_secs <= 0 {
                return Err(ConfigError::InvalidConfig(format!(
                    "{} timing must be non-negative cutoff and positive timeout",
                    rules.game
                ))
                .into());
            }
        }

        let page_size = env.parsed("TICKET_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(invalid("TICKET_PAGE_SIZE", &page_size.to_string(), format!("must be 1..={MAX_PAGE_SIZE}")).into());
        }

        let z_score: f64 = env.parsed("PLAUSIBILITY_Z_SCORE", DEFAULT_Z_SCORE)?;
        if !z_score.is_finite() || z_score <= 0.0 {
            return Err(invalid("PLAUSIBILITY_Z_SCORE", &z_score.to_string(), "must be positive").into());
        }
        let plausibility = PlausibilityConfig {
            z_score,
            ..PlausibilityConfig::default()
        };

        let games = match env.get("KEEPER_GAMES") {
            None => Game::ALL.to_vec(),
            Some(raw) => parse_games(&raw).map_err(|why| invalid("KEEPER_GAMES", &raw, why))?,
        };

        let tick_secs: u64 = env.parsed("KEEPER_TICK_INTERVAL_SECS", DEFAULT_TICK_INTERVAL_SECS)?;
        if tick_secs == 0 {
            return Err(invalid("KEEPER_TICK_INTERVAL_SECS", "0", "must be positive").into());
        }

        Ok(Self {
            rpc_url,
            keypair,
            main_program_id,
            quick_pick_program_id,
            oracle,
            retry,
            reveal_wait,
            main_rules,
            quick_pick_rules,
            page_size,
            plausibility,
            dry_run: env.flag("KEEPER_DRY_RUN")?,
            games,
            state_db: env
                .get("KEEPER_STATE_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DB)),
            loop_mode: env.flag("KEEPER_LOOP")?,
            tick_interval: Duration::from_secs(tick_secs),
            telemetry: TelemetryConfig::from_lookup(&lookup),
        })
    }

    pub fn rules(&self, game: Game) -> GameRules {
        match game {
            Game::Main => self.main_rules,
            Game::QuickPick => self.quick_pick_rules,
        }
    }

    pub fn program_id(&self, game: Game) -> Pubkey {
        match game {
            Game::Main => self.main_program_id,
            Game::QuickPick => self.quick_pick_program_id,
        }
    }
}
