use ethers::types::U256;
use std::time::Duration;
use thiserror::Error;

/// Classification of a remote RPC failure. Transient failures are worth
/// retrying; Permanent failures will not resolve by resubmitting unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    Transient,
    Permanent,
}

#[derive(Error, Debug)]
pub enum SniperError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("rpc {kind:?} failure during {context}: {message}")]
    Rpc {
        kind: RpcErrorKind,
        context: &'static str,
        message: String,
    },

    #[error("insufficient funds: required {required} wei, available {available} wei")]
    InsufficientFunds { required: U256, available: U256 },

    #[error("slippage exceeded: price deviates {deviation_bps} bps from reference, max {max_bps} bps")]
    SlippageExceeded { deviation_bps: u64, max_bps: u64 },

    #[error("no remaining allocation: raised {total_raised} of {hard_cap} wei hard cap")]
    AllocationExhausted { total_raised: U256, hard_cap: U256 },

    #[error("stale quote: {0}")]
    StaleQuote(String),

    #[error("transaction unconfirmed after {0:?}")]
    ConfirmationTimeout(Duration),

    #[error("notification delivery failed: {0}")]
    Notification(String),

    #[error("transaction signing failed: {0}")]
    Signing(String),
}

impl SniperError {
    pub fn transient_rpc(context: &'static str, message: impl Into<String>) -> Self {
        SniperError::Rpc {
            kind: RpcErrorKind::Transient,
            context,
            message: message.into(),
        }
    }

    pub fn permanent_rpc(context: &'static str, message: impl Into<String>) -> Self {
        SniperError::Rpc {
            kind: RpcErrorKind::Permanent,
            context,
            message: message.into(),
        }
    }

    /// Failures worth a bounded retry with a fresh (escalated) quote.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SniperError::Rpc {
                kind: RpcErrorKind::Transient,
                ..
            } | SniperError::StaleQuote(_)
        )
    }

    /// Failures that end the run immediately without consuming a retry.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SniperError::Config(_)
                | SniperError::Rpc {
                    kind: RpcErrorKind::Permanent,
                    ..
                }
                | SniperError::InsufficientFunds { .. }
                | SniperError::SlippageExceeded { .. }
                | SniperError::AllocationExhausted { .. }
                | SniperError::Signing(_)
        )
    }
}

impl From<ethers::signers::WalletError> for SniperError {
    fn from(err: ethers::signers::WalletError) -> Self {
        SniperError::Signing(err.to_string())
    }
}
