use crate::shared::constants::{ethereum, execution};
use crate::SniperError;
use config::{Config as ConfigSource, Environment, File};
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Immutable run configuration. Loaded once at startup, validated fail-fast,
/// then shared read-only by every component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ethereum: EthereumConfig,
    pub wallet: WalletConfig,
    pub presale: PresaleConfig,
    pub gas: GasConfig,
    pub execution: ExecutionConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Hex-encoded signing key. Read once by the transaction builder and
    /// never logged or serialized into notifications.
    pub private_key: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresaleConfig {
    pub contract_address: String,
    /// ETH spent on the buy call, in wei.
    pub token_amount_wei: u128,
    /// Raised-liquidity floor for the threshold open policy, in wei.
    pub min_liquidity_wei: u128,
    pub open_policy: OpenPolicy,
}

/// How an open presale is recognized on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OpenPolicy {
    /// The contract's `isPresaleActive()` flag.
    #[default]
    ActiveFlag,
    /// `totalRaised()` at or above the configured minimum liquidity.
    LiquidityThreshold,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GasConfig {
    pub max_gas_price_wei: u128,
    pub gas_limit: u64,
    pub priority_fee_wei: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub monitor_interval_ms: u64,
    /// Maximum tolerated relative price deviation, as a fraction in [0, 1].
    pub max_slippage: f64,
    pub min_confirmations: u64,
    pub confirmation_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    pub fn load() -> Result<Self, SniperError> {
        let config_path =
            std::env::var("SNIPER_CONFIG").unwrap_or_else(|_| "sniper.toml".to_string());

        let source = ConfigSource::builder()
            .add_source(File::from(Path::new(&config_path)).required(false))
            .add_source(
                Environment::default()
                    .prefix("SNIPER")
                    .separator("__")
                    .ignore_empty(true),
            )
            .build()
            .map_err(|e| SniperError::Config(e.to_string()))?;

        let config: Config = source
            .try_deserialize()
            .map_err(|e| SniperError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Fail-fast validation of every required field and numeric bound.
    /// Reports all violations at once so the operator fixes them in one pass.
    pub fn validate(&self) -> Result<(), SniperError> {
        let mut violations = Vec::new();

        if self.ethereum.rpc_url.is_empty() {
            violations.push("ethereum.rpc_url must not be empty".to_string());
        } else if !self.ethereum.rpc_url.starts_with("http") {
            violations.push("ethereum.rpc_url must be an http(s) endpoint".to_string());
        }
        if self.ethereum.chain_id == 0 {
            violations.push("ethereum.chain_id must be greater than 0".to_string());
        }
        if self.ethereum.request_timeout_ms == 0 {
            violations.push("ethereum.request_timeout_ms must be greater than 0".to_string());
        }

        if self.wallet.private_key.is_empty() {
            violations.push("wallet.private_key is required".to_string());
        } else {
            let key = self.wallet.private_key.trim_start_matches("0x");
            if key.len() != 64 || hex::decode(key).is_err() {
                violations.push("wallet.private_key must be 32 bytes of hex".to_string());
            }
        }
        if self.wallet.address.is_empty() {
            violations.push("wallet.address is required".to_string());
        } else if self.wallet.address.parse::<Address>().is_err() {
            violations.push("wallet.address is not a valid address".to_string());
        }

        if self.presale.contract_address.is_empty() {
            violations.push("presale.contract_address is required".to_string());
        } else if self.presale.contract_address.parse::<Address>().is_err() {
            violations.push("presale.contract_address is not a valid address".to_string());
        }
        if self.presale.token_amount_wei == 0 {
            violations.push("presale.token_amount_wei must be greater than 0".to_string());
        }

        if self.gas.max_gas_price_wei == 0 {
            violations.push("gas.max_gas_price_wei must be greater than 0".to_string());
        }
        if self.gas.gas_limit < ethereum::MIN_TRANSFER_GAS {
            violations.push(format!(
                "gas.gas_limit must be at least {}",
                ethereum::MIN_TRANSFER_GAS
            ));
        }
        if self.execution.max_retries == 0 {
            violations.push("execution.max_retries must be at least 1".to_string());
        }
        if self.execution.monitor_interval_ms == 0 {
            violations.push("execution.monitor_interval_ms must be greater than 0".to_string());
        }
        if self.execution.confirmation_timeout_ms == 0 {
            violations.push("execution.confirmation_timeout_ms must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.execution.max_slippage) {
            violations.push("execution.max_slippage must be within [0, 1]".to_string());
        }
        if self.execution.min_confirmations == 0 {
            violations.push("execution.min_confirmations must be at least 1".to_string());
        }

        match (&self.telegram.bot_token, &self.telegram.chat_id) {
            (Some(_), None) | (None, Some(_)) => violations
                .push("telegram.bot_token and telegram.chat_id must be set together".to_string()),
            _ => {}
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SniperError::Config(violations.join("; ")))
        }
    }

    pub fn wallet_address(&self) -> Result<Address, SniperError> {
        self.wallet
            .address
            .parse::<Address>()
            .map_err(|e| SniperError::Config(format!("invalid wallet address: {}", e)))
    }

    pub fn contract_address(&self) -> Result<Address, SniperError> {
        self.presale
            .contract_address
            .parse::<Address>()
            .map_err(|e| SniperError::Config(format!("invalid presale contract address: {}", e)))
    }

    pub fn token_amount(&self) -> U256 {
        U256::from(self.presale.token_amount_wei)
    }

    pub fn min_liquidity(&self) -> U256 {
        U256::from(self.presale.min_liquidity_wei)
    }

    pub fn max_gas_price(&self) -> U256 {
        U256::from(self.gas.max_gas_price_wei)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.execution.retry_delay_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.execution.monitor_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.execution.confirmation_timeout_ms)
    }
}

impl TelegramConfig {
    pub fn enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
            chain_id: ethereum::ARBITRUM_ONE_CHAIN_ID,
            request_timeout_ms: ethereum::DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl Default for PresaleConfig {
    fn default() -> Self {
        Self {
            contract_address: String::new(),
            token_amount_wei: 100_000_000_000_000_000, // 0.1 ETH
            min_liquidity_wei: 500_000_000_000_000_000, // 0.5 ETH
            open_policy: OpenPolicy::default(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            max_gas_price_wei: ethereum::DEFAULT_MAX_GAS_PRICE_WEI,
            gas_limit: ethereum::DEFAULT_GAS_LIMIT,
            priority_fee_wei: ethereum::DEFAULT_PRIORITY_FEE_WEI,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retries: execution::DEFAULT_MAX_RETRIES,
            retry_delay_ms: execution::DEFAULT_RETRY_DELAY_MS,
            monitor_interval_ms: execution::DEFAULT_MONITOR_INTERVAL_MS,
            max_slippage: execution::DEFAULT_MAX_SLIPPAGE,
            min_confirmations: execution::DEFAULT_MIN_CONFIRMATIONS,
            confirmation_timeout_ms: execution::DEFAULT_CONFIRMATION_TIMEOUT_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}
