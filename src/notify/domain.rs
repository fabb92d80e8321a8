use async_trait::async_trait;
use ethers::types::{Address, H256, U256};
use tracing::debug;

/// Operator-facing events, one per controller transition worth reporting.
/// Payloads stay small; key material never appears here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    Startup {
        wallet: Address,
        contract: Address,
        token_amount: U256,
        max_gas_price: U256,
    },
    PresaleDetected {
        total_raised: U256,
        hard_cap: U256,
        token_price: U256,
    },
    BuyAttempt {
        /// 1-based attempt ordinal.
        attempt: u32,
        nonce: u64,
        max_fee_per_gas: U256,
    },
    BuySuccess {
        tx_hash: H256,
        attempts: u32,
        gas_used: u64,
        /// Tokens the spend should yield at the quoted price; zero when the
        /// contract exposes no price.
        tokens_received: U256,
    },
    BuyFailure {
        reason: String,
    },
    GasWarning {
        network_gas_price: U256,
        max_gas_price: U256,
    },
    BalanceWarning {
        balance: U256,
        required: U256,
    },
    PresaleEnd {
        total_raised: U256,
        hard_cap: U256,
    },
    Error {
        context: String,
        message: String,
    },
    Shutdown,
}

impl NotificationEvent {
    /// Terminal and warning events that must survive queue pressure; the
    /// dispatcher evicts non-critical chatter first.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            NotificationEvent::BuySuccess { .. }
                | NotificationEvent::BuyFailure { .. }
                | NotificationEvent::BalanceWarning { .. }
                | NotificationEvent::PresaleEnd { .. }
                | NotificationEvent::Error { .. }
                | NotificationEvent::Shutdown
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::Startup { .. } => "startup",
            NotificationEvent::PresaleDetected { .. } => "presale_detected",
            NotificationEvent::BuyAttempt { .. } => "buy_attempt",
            NotificationEvent::BuySuccess { .. } => "buy_success",
            NotificationEvent::BuyFailure { .. } => "buy_failure",
            NotificationEvent::GasWarning { .. } => "gas_warning",
            NotificationEvent::BalanceWarning { .. } => "balance_warning",
            NotificationEvent::PresaleEnd { .. } => "presale_end",
            NotificationEvent::Error { .. } => "error",
            NotificationEvent::Shutdown => "shutdown",
        }
    }
}

/// Best-effort delivery sink. Implementations swallow transport failures;
/// nothing here may stall the submission path.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: &NotificationEvent);
}

/// Sink used when no notification channel is configured.
pub struct NoopSink;

#[async_trait]
impl NotificationSink for NoopSink {
    async fn notify(&self, event: &NotificationEvent) {
        debug!(kind = event.kind(), "notification channel disabled, dropping event");
    }
}
