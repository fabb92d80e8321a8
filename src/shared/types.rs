use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256, U256};

/// Presale lifecycle as observed on chain. Never derived from the local
/// clock alone; Open and Closed carry the reads that backed the decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresaleState {
    Unknown,
    NotStarted,
    Open(PresaleSnapshot),
    Closed(PresaleSnapshot),
}

impl PresaleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresaleState::Unknown => "unknown",
            PresaleState::NotStarted => "not_started",
            PresaleState::Open(_) => "open",
            PresaleState::Closed(_) => "closed",
        }
    }
}

/// On-chain reads backing a presale state classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresaleSnapshot {
    pub is_active: bool,
    pub total_raised: U256,
    pub hard_cap: U256,
    pub token_price: U256,
    pub start_time: u64,
    pub end_time: u64,
    /// Timestamp of the chain head at read time.
    pub chain_time: u64,
}

/// Resolution of a single buy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Underpriced,
    Rejected,
    Included,
    Failed,
}

/// One signed buy transaction. Owned exclusively by the controller; at most
/// one attempt is in flight at any time and nonces never repeat.
#[derive(Debug, Clone)]
pub struct TransactionAttempt {
    pub index: u32,
    pub nonce: u64,
    /// Wei actually spent on the buy, after clamping to the remaining
    /// presale allocation.
    pub value: U256,
    pub max_fee_per_gas: U256,
    pub priority_fee: U256,
    pub raw_transaction: Bytes,
    pub tx_hash: H256,
    pub status: AttemptStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub confirmations: u64,
}

impl TransactionAttempt {
    pub fn mark_submitted(&mut self, tx_hash: H256) {
        self.tx_hash = tx_hash;
        self.status = AttemptStatus::Pending;
        self.submitted_at = Some(Utc::now());
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.status, AttemptStatus::Pending)
    }
}

/// Cached wallet view, refreshed before each build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletSnapshot {
    pub address: Address,
    pub balance: U256,
    pub nonce: u64,
}
