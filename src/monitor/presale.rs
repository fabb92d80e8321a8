use crate::chain::client::ChainClient;
use crate::chain::codec;
use crate::infrastructure::config::{Config, OpenPolicy};
use crate::monitor::domain::Monitor;
use crate::shared::constants::{execution, presale};
use crate::shared::types::{PresaleSnapshot, PresaleState};
use crate::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Polls the presale contract and classifies its phase. Open is only ever
/// reported after a successful chain read; elapsed wall-clock time is never
/// consulted.
pub struct PresaleMonitor {
    client: Arc<dyn ChainClient>,
    contract: Address,
    policy: OpenPolicy,
    min_liquidity: U256,
    consecutive_failures: u32,
}

impl PresaleMonitor {
    pub fn new(config: &Config, client: Arc<dyn ChainClient>) -> Result<Self> {
        Ok(Self {
            client,
            contract: config.contract_address()?,
            policy: config.presale.open_policy,
            min_liquidity: config.min_liquidity(),
            consecutive_failures: 0,
        })
    }

    async fn read_uint(&self, signature: &str) -> Result<U256> {
        let data = self
            .client
            .call_view(self.contract, codec::selector(signature))
            .await?;
        codec::decode_uint(data.as_ref())
    }

    async fn read_bool(&self, signature: &str) -> Result<bool> {
        let data = self
            .client
            .call_view(self.contract, codec::selector(signature))
            .await?;
        codec::decode_bool(data.as_ref())
    }

    async fn read_snapshot(&self) -> Result<PresaleSnapshot> {
        Ok(PresaleSnapshot {
            is_active: self.read_bool(presale::IS_ACTIVE).await?,
            total_raised: self.read_uint(presale::TOTAL_RAISED).await?,
            hard_cap: self.read_uint(presale::HARD_CAP).await?,
            token_price: self.read_uint(presale::TOKEN_PRICE).await?,
            start_time: self.read_uint(presale::START_TIME).await?.as_u64(),
            end_time: self.read_uint(presale::END_TIME).await?.as_u64(),
            chain_time: self.client.latest_block_timestamp().await?,
        })
    }
}

#[async_trait]
impl Monitor for PresaleMonitor {
    async fn observe(&mut self) -> Result<PresaleState> {
        match self.read_snapshot().await {
            Ok(snapshot) => {
                self.consecutive_failures = 0;
                let state = classify(self.policy, self.min_liquidity, snapshot);
                debug!(state = state.as_str(), "presale observation");
                Ok(state)
            }
            Err(e) if e.is_retryable() => {
                self.consecutive_failures += 1;
                warn!(
                    failures = self.consecutive_failures,
                    "transient presale read failure: {}", e
                );
                Ok(PresaleState::Unknown)
            }
            Err(e) => Err(e),
        }
    }

    fn backoff(&self) -> Duration {
        if self.consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let shift = (self.consecutive_failures - 1).min(16);
        let delay_ms = execution::MONITOR_BACKOFF_BASE_MS
            .saturating_mul(1u64 << shift)
            .min(execution::MONITOR_BACKOFF_CAP_MS);
        Duration::from_millis(delay_ms)
    }
}

/// Phase classification from a consistent set of chain reads.
///
/// Closed wins over everything: a past end time or a reached hard cap means
/// the sale cannot be entered regardless of the active flag. A future start
/// time (against chain time) is NotStarted. Otherwise the configured open
/// policy decides, and a not-yet-open sale reads as NotStarted.
pub fn classify(policy: OpenPolicy, min_liquidity: U256, snapshot: PresaleSnapshot) -> PresaleState {
    if snapshot.end_time > 0 && snapshot.chain_time > snapshot.end_time {
        return PresaleState::Closed(snapshot);
    }
    if !snapshot.hard_cap.is_zero() && snapshot.total_raised >= snapshot.hard_cap {
        return PresaleState::Closed(snapshot);
    }
    if snapshot.start_time > 0 && snapshot.chain_time < snapshot.start_time {
        return PresaleState::NotStarted;
    }

    let open = match policy {
        OpenPolicy::ActiveFlag => snapshot.is_active,
        OpenPolicy::LiquidityThreshold => snapshot.total_raised >= min_liquidity,
    };

    if open {
        PresaleState::Open(snapshot)
    } else {
        PresaleState::NotStarted
    }
}
