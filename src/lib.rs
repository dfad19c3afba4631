//! Draw-lifecycle keeper for the Main (6/46) and Quick Pick (5/35) on-chain lottery games.
//!
//! Each invocation reads the program state, decides whether a draw is due or stuck, and drives
//! it through commit, execute, index and finalize. Nothing is remembered between invocations
//! except operator flags and run history in the ops store.

pub mod chain;
pub mod draw;
pub mod error;
pub mod runtime;
pub mod storage;
pub mod utils;
