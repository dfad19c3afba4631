pub mod args;
pub mod keeper;
pub mod status;

pub use args::{parse_ctl_args, reject_cli_args, CtlCommand, CTL_USAGE};
pub use keeper::{connect, solana_program, CycleOutcome, Keeper};
pub use status::{emit_startup_status, emit_tick_summary, render_ops_status};
