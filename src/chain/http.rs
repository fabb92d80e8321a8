use crate::chain::client::{ChainClient, ReceiptInfo};
use crate::infrastructure::config::EthereumConfig;
use crate::{Result, SniperError};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// JSON-RPC chain client over plain HTTP. One endpoint, one deadline per
/// call, Transient/Permanent failure classification per the retry policy.
#[derive(Clone)]
pub struct HttpChainClient {
    endpoint: String,
    http_client: Client,
    timeout: Duration,
}

impl HttpChainClient {
    pub fn new(config: &EthereumConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SniperError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.rpc_url.clone(),
            http_client,
            timeout,
        })
    }

    async fn request(&self, method: &str, params: Value, context: &'static str) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        debug!(method, context, "issuing rpc request");

        let send = self.http_client.post(&self.endpoint).json(&body).send();
        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| {
                SniperError::transient_rpc(
                    context,
                    format!("request timed out after {:?}", self.timeout),
                )
            })?
            .map_err(|e| classify_transport(e, context))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SniperError::transient_rpc(
                context,
                format!("server returned {}", status),
            ));
        }
        if !status.is_success() {
            return Err(SniperError::permanent_rpc(
                context,
                format!("server returned {}", status),
            ));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| SniperError::permanent_rpc(context, format!("malformed response: {}", e)))?;

        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unspecified node error")
                .to_string();
            // Fee complaints resolve with an escalated re-quote, so they stay
            // on the retry path.
            if is_fee_complaint(&message) {
                return Err(SniperError::transient_rpc(context, message));
            }
            return Err(SniperError::permanent_rpc(context, message));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| SniperError::permanent_rpc(context, "response missing result field"))
    }

    async fn quantity(&self, method: &str, params: Value, context: &'static str) -> Result<U256> {
        let result = self.request(method, params, context).await?;
        parse_quantity(&result, context)
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn chain_id(&self) -> Result<u64> {
        let id = self.quantity("eth_chainId", json!([]), "chain id").await?;
        Ok(id.as_u64())
    }

    async fn block_number(&self) -> Result<u64> {
        let number = self
            .quantity("eth_blockNumber", json!([]), "block number")
            .await?;
        Ok(number.as_u64())
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        let block = self
            .request(
                "eth_getBlockByNumber",
                json!(["latest", false]),
                "head timestamp",
            )
            .await?;
        let timestamp = block
            .get("timestamp")
            .ok_or_else(|| SniperError::permanent_rpc("head timestamp", "block missing timestamp"))?;
        Ok(parse_quantity(timestamp, "head timestamp")?.as_u64())
    }

    async fn balance_of(&self, address: Address) -> Result<U256> {
        self.quantity(
            "eth_getBalance",
            json!([format!("{:?}", address), "latest"]),
            "balance",
        )
        .await
    }

    async fn nonce_of(&self, address: Address) -> Result<u64> {
        let nonce = self
            .quantity(
                "eth_getTransactionCount",
                json!([format!("{:?}", address), "pending"]),
                "nonce",
            )
            .await?;
        Ok(nonce.as_u64())
    }

    async fn estimate_gas_price(&self) -> Result<U256> {
        self.quantity("eth_gasPrice", json!([]), "gas price").await
    }

    async fn call_view(&self, contract: Address, calldata: Bytes) -> Result<Bytes> {
        let result = self
            .request(
                "eth_call",
                json!([
                    {
                        "to": format!("{:?}", contract),
                        "data": format!("0x{}", hex::encode(&calldata)),
                    },
                    "latest"
                ]),
                "contract read",
            )
            .await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| SniperError::permanent_rpc("contract read", "non-string call result"))?;
        let bytes = hex::decode(hex_str.strip_prefix("0x").unwrap_or(hex_str))
            .map_err(|e| SniperError::permanent_rpc("contract read", format!("invalid hex: {}", e)))?;
        Ok(Bytes::from(bytes))
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256> {
        let result = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(&raw))]),
                "submission",
            )
            .await?;
        let hash_str = result
            .as_str()
            .ok_or_else(|| SniperError::permanent_rpc("submission", "non-string tx hash"))?;
        hash_str
            .parse::<H256>()
            .map_err(|e| SniperError::permanent_rpc("submission", format!("invalid tx hash: {}", e)))
    }

    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<ReceiptInfo>> {
        let result = self
            .request(
                "eth_getTransactionReceipt",
                json!([format!("{:?}", tx_hash)]),
                "receipt",
            )
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        let status = result
            .get("status")
            .map(|s| parse_quantity(s, "receipt"))
            .transpose()?
            .unwrap_or_else(U256::zero);
        let block_number = result
            .get("blockNumber")
            .map(|b| parse_quantity(b, "receipt"))
            .transpose()?
            .ok_or_else(|| SniperError::permanent_rpc("receipt", "receipt missing block number"))?
            .as_u64();
        let gas_used = result
            .get("gasUsed")
            .map(|g| parse_quantity(g, "receipt"))
            .transpose()?
            .unwrap_or_else(U256::zero)
            .as_u64();

        let head = self.block_number().await?;
        let confirmations = head.saturating_sub(block_number) + 1;

        Ok(Some(ReceiptInfo {
            succeeded: status == U256::one(),
            block_number,
            gas_used,
            confirmations,
        }))
    }
}

fn classify_transport(err: reqwest::Error, context: &'static str) -> SniperError {
    if err.is_timeout() || err.is_connect() {
        SniperError::transient_rpc(context, err.to_string())
    } else {
        SniperError::permanent_rpc(context, err.to_string())
    }
}

/// Node complaints that an escalated gas re-quote can resolve.
fn is_fee_complaint(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("underpriced")
        || lower.contains("fee too low")
        || lower.contains("replacement transaction")
        || lower.contains("max fee per gas less than block base fee")
}

fn parse_quantity(value: &Value, context: &'static str) -> Result<U256> {
    let text = value
        .as_str()
        .ok_or_else(|| SniperError::permanent_rpc(context, "non-string quantity"))?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    U256::from_str_radix(digits, 16)
        .map_err(|e| SniperError::permanent_rpc(context, format!("invalid quantity {}: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        let value = json!("0x10");
        assert_eq!(parse_quantity(&value, "test").unwrap(), U256::from(16));

        let zero = json!("0x0");
        assert_eq!(parse_quantity(&zero, "test").unwrap(), U256::zero());
    }

    #[test]
    fn test_parse_quantity_rejects_non_strings() {
        let value = json!(16);
        assert!(parse_quantity(&value, "test").is_err());
    }

    #[test]
    fn test_fee_complaints_detected() {
        assert!(is_fee_complaint("transaction underpriced"));
        assert!(is_fee_complaint("max fee per gas less than block base fee"));
        assert!(is_fee_complaint("replacement transaction underpriced"));
        assert!(!is_fee_complaint("nonce too low"));
        assert!(!is_fee_complaint("insufficient funds for gas * price + value"));
    }

    #[test]
    fn test_client_creation() {
        let config = EthereumConfig::default();
        assert!(HttpChainClient::new(&config).is_ok());
    }
}
