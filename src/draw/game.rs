use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Game {
    Main,
    QuickPick,
}

impl Game {
    pub const ALL: [Game; 2] = [Game::Main, Game::QuickPick];

    pub fn as_str(self) -> &'static str {
        match self {
            Game::Main => "main",
            Game::QuickPick => "quick_pick",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "main" | "lotto" | "6/46" => Some(Game::Main),
            "quick_pick" | "quickpick" | "qp" | "5/35" => Some(Game::QuickPick),
            _ => None,
        }
    }

    /// Seed of the program's singleton state PDA.
    pub fn state_seed(self) -> &'static [u8] {
        match self {
            Game::Main => b"lottery_state",
            Game::QuickPick => b"quick_pick_state",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Game-specific constants that parameterize the shared draw pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    pub game: Game,
    /// Numbers picked per ticket and drawn per result.
    pub pick_count: u8,
    /// Numbers are drawn from `1..=pool_size`.
    pub pool_size: u8,
    /// Lowest match count that wins a prize.
    pub min_prize_tier: u8,
    /// Sales close this many seconds before `next_draw_timestamp`.
    pub ticket_sale_cutoff_secs: i64,
    /// A committed draw with no result after this long is cancelled.
    pub commit_timeout_secs: i64,
}

pub const MAIN_TICKET_SALE_CUTOFF_SECS: i64 = 3_600;
pub const MAIN_COMMIT_TIMEOUT_SECS: i64 = 3_600;
pub const QUICK_PICK_TICKET_SALE_CUTOFF_SECS: i64 = 300;
pub const QUICK_PICK_COMMIT_TIMEOUT_SECS: i64 = 600;

impl GameRules {
    pub const fn main() -> Self {
        Self {
            game: Game::Main,
            pick_count: 6,
            pool_size: 46,
            min_prize_tier: 2,
            ticket_sale_cutoff_secs: MAIN_TICKET_SALE_CUTOFF_SECS,
            commit_timeout_secs: MAIN_COMMIT_TIMEOUT_SECS,
        }
    }

    pub const fn quick_pick() -> Self {
        Self {
            game: Game::QuickPick,
            pick_count: 5,
            pool_size: 35,
            min_prize_tier: 3,
            ticket_sale_cutoff_secs: QUICK_PICK_TICKET_SALE_CUTOFF_SECS,
            commit_timeout_secs: QUICK_PICK_COMMIT_TIMEOUT_SECS,
        }
    }

    pub const fn for_game(game: Game) -> Self {
        match game {
            Game::Main => Self::main(),
            Game::QuickPick => Self::quick_pick(),
        }
    }

    pub fn with_timing(mut self, ticket_sale_cutoff_secs: i64, commit_timeout_secs: i64) -> Self {
        self.ticket_sale_cutoff_secs = ticket_sale_cutoff_secs;
        self.commit_timeout_secs = commit_timeout_secs;
        self
    }

    /// Prize tiers from the jackpot tier down to the lowest paying tier.
    pub fn tier_count(&self) -> usize {
        usize::from(self.pick_count - self.min_prize_tier) + 1
    }

    pub fn is_valid_number(&self, n: u8) -> bool {
        (1..=self.pool_size).contains(&n)
    }
}
