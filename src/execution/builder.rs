use crate::chain::client::ChainClient;
use crate::chain::codec;
use crate::execution::gas::GasPolicy;
use crate::infrastructure::config::Config;
use crate::shared::constants::presale;
use crate::shared::types::{AttemptStatus, PresaleSnapshot, TransactionAttempt, WalletSnapshot};
use crate::shared::utils::deviation_bps;
use crate::{Result, SniperError};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::transaction::eip1559::Eip1559TransactionRequest;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// A signed attempt plus the raw network gas quote the pricing started from,
/// so the controller can warn when the network is above the configured cap,
/// and the token projection for the success report.
#[derive(Debug, Clone)]
pub struct BuiltAttempt {
    pub attempt: TransactionAttempt,
    pub network_gas_price: U256,
    /// Tokens the spend should yield at the current quote; zero when the
    /// contract exposes no price.
    pub expected_tokens: U256,
}

/// Builds and signs one buy transaction per call, enforcing the balance and
/// slippage bounds. The signing key lives only here; it is never logged,
/// never serialized, and never leaves this component.
pub struct TransactionBuilder {
    client: Arc<dyn ChainClient>,
    wallet: LocalWallet,
    contract: Address,
    chain_id: u64,
    token_amount: U256,
    gas_limit: u64,
    max_slippage_bps: u64,
    gas_policy: GasPolicy,
}

impl TransactionBuilder {
    pub fn new(config: &Config, client: Arc<dyn ChainClient>) -> Result<Self> {
        let wallet = config
            .wallet
            .private_key
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| SniperError::Config(format!("invalid private key: {}", e)))?
            .with_chain_id(config.ethereum.chain_id);

        Ok(Self {
            client,
            wallet,
            contract: config.contract_address()?,
            chain_id: config.ethereum.chain_id,
            token_amount: config.token_amount(),
            gas_limit: config.gas.gas_limit,
            max_slippage_bps: (config.execution.max_slippage * 10_000.0) as u64,
            gas_policy: GasPolicy::new(&config.gas),
        })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Price, validate and sign attempt `attempt_index`. Pure over its inputs
    /// apart from chain reads through the client; returns a new value, never
    /// mutates shared state.
    pub async fn build(
        &self,
        attempt_index: u32,
        wallet: &WalletSnapshot,
        presale: &PresaleSnapshot,
    ) -> Result<BuiltAttempt> {
        let network_gas_price = self.client.estimate_gas_price().await?;
        let quote = self.gas_policy.quote(network_gas_price, attempt_index);

        let value = self.buy_value(presale)?;

        let gas_budget = self.gas_policy.cost_ceiling(self.gas_limit, &quote);
        let required = value + gas_budget;
        if wallet.balance < required {
            return Err(SniperError::InsufficientFunds {
                required,
                available: wallet.balance,
            });
        }

        let current_price = self.verify_price(presale.token_price).await?;
        let expected_tokens = match current_price {
            Some(price) if !price.is_zero() => value * U256::exp10(18) / price,
            _ => U256::zero(),
        };

        // Nonces are allocated off the refreshed snapshot and offset by the
        // attempt index, so no attempt ever reuses an earlier nonce.
        let nonce = wallet.nonce + u64::from(attempt_index);

        let request = Eip1559TransactionRequest::new()
            .to(self.contract)
            .value(value)
            .gas(self.gas_limit)
            .max_fee_per_gas(quote.max_fee)
            .max_priority_fee_per_gas(quote.priority_fee)
            .nonce(nonce)
            .data(codec::buy_calldata())
            .chain_id(self.chain_id);

        let typed = TypedTransaction::Eip1559(request);
        let signature = self.wallet.sign_transaction(&typed).await?;
        let raw = typed.rlp_signed(&signature);
        let tx_hash = typed.hash(&signature);

        debug!(
            attempt = attempt_index,
            nonce,
            max_fee = %quote.max_fee,
            "signed buy attempt"
        );

        Ok(BuiltAttempt {
            attempt: TransactionAttempt {
                index: attempt_index,
                nonce,
                value,
                max_fee_per_gas: quote.max_fee,
                priority_fee: quote.priority_fee,
                raw_transaction: raw,
                tx_hash,
                status: AttemptStatus::Pending,
                submitted_at: None,
                confirmations: 0,
            },
            network_gas_price,
            expected_tokens,
        })
    }

    /// Wei to spend on this attempt: the configured amount, clamped to the
    /// remaining allocation under the hard cap. An exhausted allocation is
    /// unenterable; spending the full amount there would only revert on
    /// chain.
    fn buy_value(&self, presale: &PresaleSnapshot) -> Result<U256> {
        if presale.hard_cap.is_zero() {
            return Ok(self.token_amount);
        }
        let remaining = presale.hard_cap.saturating_sub(presale.total_raised);
        if remaining.is_zero() {
            return Err(SniperError::AllocationExhausted {
                total_raised: presale.total_raised,
                hard_cap: presale.hard_cap,
            });
        }
        Ok(self.token_amount.min(remaining))
    }

    /// Re-read the token price and compare against the reference captured at
    /// presale detection. A zero reference disables the check (the contract
    /// does not expose a price); a zero current quote is a stale read worth
    /// retrying. Returns the fresh quote for the token projection.
    async fn verify_price(&self, reference_price: U256) -> Result<Option<U256>> {
        if reference_price.is_zero() {
            return Ok(None);
        }

        let data = self
            .client
            .call_view(self.contract, codec::selector(presale::TOKEN_PRICE))
            .await?;
        let current_price = codec::decode_uint(data.as_ref())?;

        if current_price.is_zero() {
            return Err(SniperError::StaleQuote(
                "token price quote is zero".to_string(),
            ));
        }

        let deviation = deviation_bps(reference_price, current_price);
        if deviation > self.max_slippage_bps {
            return Err(SniperError::SlippageExceeded {
                deviation_bps: deviation,
                max_bps: self.max_slippage_bps,
            });
        }

        Ok(Some(current_price))
    }
}
