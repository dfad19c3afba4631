//! Draw lifecycle: game rules, the pure decision functions, and the orchestrator that
//! drives one game per tick.

pub mod alerts;
pub mod game;
pub mod indexer;
pub mod orchestrator;
pub mod plausibility;
pub mod readiness;
pub mod recovery;
pub mod state;

pub use game::{Game, GameRules};
pub use orchestrator::{DrawOrchestrator, TickContext, TickOutcome, TickReport};
