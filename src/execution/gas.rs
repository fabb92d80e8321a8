use crate::infrastructure::config::GasConfig;
use crate::shared::constants::execution;
use ethers::types::U256;

/// Gas pricing bounds from configuration plus the per-retry escalation step.
#[derive(Debug, Clone)]
pub struct GasPolicy {
    max_fee: U256,
    priority_fee: U256,
}

/// One priced quote for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasQuote {
    pub max_fee: U256,
    pub priority_fee: U256,
}

impl GasPolicy {
    pub fn new(config: &GasConfig) -> Self {
        Self {
            max_fee: U256::from(config.max_gas_price_wei),
            priority_fee: U256::from(config.priority_fee_wei),
        }
    }

    /// Price an attempt from the current network quote. Each retry escalates
    /// the quote multiplicatively so repeated underpriced rejections converge
    /// instead of looping unchanged; the configured cap always wins.
    pub fn quote(&self, network_price: U256, attempt_index: u32) -> GasQuote {
        let mut price = network_price;
        for _ in 0..attempt_index {
            price = price * U256::from(execution::GAS_ESCALATION_NUM)
                / U256::from(execution::GAS_ESCALATION_DEN);
            if price >= self.max_fee {
                break;
            }
        }
        let max_fee = price.min(self.max_fee);
        GasQuote {
            max_fee,
            priority_fee: self.priority_fee.min(max_fee),
        }
    }

    /// Worst-case wei spent on gas for one attempt.
    pub fn cost_ceiling(&self, gas_limit: u64, quote: &GasQuote) -> U256 {
        quote.max_fee * U256::from(gas_limit)
    }

    pub fn max_fee(&self) -> U256 {
        self.max_fee
    }
}
