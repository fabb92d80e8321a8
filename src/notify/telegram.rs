use crate::notify::domain::{NotificationEvent, NotificationSink};
use crate::shared::constants::notify;
use crate::shared::utils::fmt;
use crate::SniperError;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Telegram sink: one configured chat, HTML messages, strictly best-effort.
/// API failures are logged and swallowed, never surfaced to the controller.
pub struct TelegramNotifier {
    http_client: Client,
    api_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, SniperError> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(notify::DELIVERY_TIMEOUT_MS))
            .build()
            .map_err(|e| SniperError::Notification(format!("failed to create HTTP client: {}", e)))?;

        info!("telegram notifications enabled");
        Ok(Self {
            http_client,
            api_url: format!("{}/bot{}/sendMessage", notify::TELEGRAM_API_BASE, bot_token),
            chat_id: chat_id.to_string(),
        })
    }

    fn render(event: &NotificationEvent) -> String {
        let body = match event {
            NotificationEvent::Startup {
                wallet,
                contract,
                token_amount,
                max_gas_price,
            } => format!(
                "<b>Sniper started</b>\nWallet: <code>{}</code>\nPresale: <code>{}</code>\nInvestment: {} ETH\nMax gas: {} gwei",
                fmt::short_hex(wallet.as_bytes()),
                fmt::short_hex(contract.as_bytes()),
                fmt::eth(*token_amount),
                fmt::gwei(*max_gas_price),
            ),
            NotificationEvent::PresaleDetected {
                total_raised,
                hard_cap,
                token_price,
            } => format!(
                "<b>Presale open</b>\nRaised: {} ETH\nHard cap: {} ETH\nToken price: {} wei",
                fmt::eth(*total_raised),
                fmt::eth(*hard_cap),
                token_price,
            ),
            NotificationEvent::BuyAttempt {
                attempt,
                nonce,
                max_fee_per_gas,
            } => format!(
                "<b>Buy attempt #{}</b>\nNonce: {}\nMax fee: {} gwei",
                attempt,
                nonce,
                fmt::gwei(*max_fee_per_gas),
            ),
            NotificationEvent::BuySuccess {
                tx_hash,
                attempts,
                gas_used,
                tokens_received,
            } => format!(
                "<b>Buy confirmed</b>\nTx: <code>{}</code>\nAttempts: {}\nGas used: {}\nTokens: {}",
                fmt::short_hex(tx_hash.as_bytes()),
                attempts,
                gas_used,
                fmt::eth(*tokens_received),
            ),
            NotificationEvent::BuyFailure { reason } => {
                format!("<b>Buy failed</b>\nReason: {}", reason)
            }
            NotificationEvent::GasWarning {
                network_gas_price,
                max_gas_price,
            } => format!(
                "<b>Gas warning</b>\nNetwork: {} gwei\nCap: {} gwei\nSubmitting at the cap",
                fmt::gwei(*network_gas_price),
                fmt::gwei(*max_gas_price),
            ),
            NotificationEvent::BalanceWarning { balance, required } => format!(
                "<b>Low balance</b>\nAvailable: {} ETH\nRequired: {} ETH",
                fmt::eth(*balance),
                fmt::eth(*required),
            ),
            NotificationEvent::PresaleEnd {
                total_raised,
                hard_cap,
            } => format!(
                "<b>Presale ended</b>\nRaised: {} ETH\nHard cap: {} ETH",
                fmt::eth(*total_raised),
                fmt::eth(*hard_cap),
            ),
            NotificationEvent::Error { context, message } => {
                format!("<b>Error</b>\nContext: {}\n{}", context, message)
            }
            NotificationEvent::Shutdown => "<b>Sniper stopped</b>".to_string(),
        };

        format!("{}\n\n{}", body, Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn notify(&self, event: &NotificationEvent) {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": Self::render(event),
            "parse_mode": "HTML",
        });

        match self.http_client.post(&self.api_url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                warn!(
                    kind = event.kind(),
                    status = %response.status(),
                    "telegram api rejected notification"
                );
            }
            Err(e) => {
                warn!(kind = event.kind(), "telegram delivery failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::{Address, H256, U256};

    #[test]
    fn test_notifier_creation() {
        assert!(TelegramNotifier::new("123:abc", "42").is_ok());
    }

    #[test]
    fn test_render_success() {
        let text = TelegramNotifier::render(&NotificationEvent::BuySuccess {
            tx_hash: H256::from_low_u64_be(0xabcd),
            attempts: 2,
            gas_used: 150_000,
            tokens_received: U256::from(5_000_000_000_000_000_000u128),
        });
        assert!(text.contains("Buy confirmed"));
        assert!(text.contains("Attempts: 2"));
        assert!(text.contains("150000"));
        assert!(text.contains("Tokens: 5.0000"));
    }

    #[test]
    fn test_render_balance_warning_in_eth() {
        let text = TelegramNotifier::render(&NotificationEvent::BalanceWarning {
            balance: U256::from(100_000_000_000_000_000u128),
            required: U256::from(200_000_000_000_000_000u128),
        });
        assert!(text.contains("0.1000"));
        assert!(text.contains("0.2000"));
    }

    #[test]
    fn test_render_never_exposes_full_wallet() {
        let wallet = Address::from_low_u64_be(0xdeadbeef);
        let text = TelegramNotifier::render(&NotificationEvent::Startup {
            wallet,
            contract: Address::from_low_u64_be(1),
            token_amount: U256::from(1u64),
            max_gas_price: U256::from(1u64),
        });
        // Abbreviated address only; payloads carry no key material at all.
        assert!(!text.contains(&hex::encode(wallet.as_bytes())));
    }

    #[test]
    fn test_render_shutdown_has_timestamp() {
        let text = TelegramNotifier::render(&NotificationEvent::Shutdown);
        assert!(text.contains("Sniper stopped"));
        assert!(text.contains("UTC"));
    }
}
