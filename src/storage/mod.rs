pub mod ops_store;

pub use ops_store::{GameStats, OpsStatus, OpsStore};
