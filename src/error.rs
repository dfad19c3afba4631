use thiserror::Error;

pub type Result<T> = std::result::Result<T, KeeperError>;

#[derive(Debug, Error)]
pub enum KeeperError {
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl KeeperError {
    /// Whether the retry executor may attempt the failing operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            KeeperError::Chain(err) => err.is_retryable(),
            KeeperError::Config(_) => false,
            KeeperError::Protocol(err) => matches!(
                err,
                ProtocolError::DrawResultMissing(_) | ProtocolError::ScanIncomplete { .. }
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("transaction `{instruction}` rejected: {message}")]
    Rejected {
        instruction: &'static str,
        message: String,
    },
    #[error("randomness has not been revealed yet: {0}")]
    OracleNotRevealed(String),
    #[error("account `{account}` could not be decoded: {reason}")]
    AccountDecode { account: String, reason: String },
    #[error("account `{0}` does not exist")]
    AccountMissing(String),
    #[error("transaction signing failed: {0}")]
    Signing(String),
}

impl ChainError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChainError::Transport(_) | ChainError::Rejected { .. } | ChainError::OracleNotRevealed(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    MissingConfig(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("illegal phase transition for draw {draw_id}: {from} -> {to}")]
    IllegalTransition {
        draw_id: u64,
        from: &'static str,
        to: &'static str,
    },
    #[error("draw result for draw {0} is not available yet")]
    DrawResultMissing(u64),
    #[error("draw {draw_id} changed underneath the keeper (chain now reports draw {observed})")]
    DrawMoved { draw_id: u64, observed: u64 },
    #[error("winning numbers for draw {draw_id} are malformed: {reason}")]
    MalformedWinningNumbers { draw_id: u64, reason: String },
    #[error("ticket scan for draw {draw_id} stalled at cursor {cursor} after {scanned} tickets")]
    ScanIncomplete { draw_id: u64, cursor: u64, scanned: u64 },
}
