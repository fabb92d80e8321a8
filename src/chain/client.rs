use crate::Result;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// Receipt summary for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptInfo {
    /// True when the transaction executed without reverting.
    pub succeeded: bool,
    pub block_number: u64,
    pub gas_used: u64,
    /// Blocks built on top of the inclusion block, counting the inclusion
    /// block itself.
    pub confirmations: u64,
}

/// Read and submit access to a single remote JSON-RPC endpoint.
///
/// Every call carries an explicit deadline; implementations must never block
/// indefinitely and classify failures as Transient or Permanent via
/// `SniperError::Rpc`.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn block_number(&self) -> Result<u64>;

    /// Timestamp of the chain head. Presale phase decisions compare contract
    /// times against this, never against the local clock.
    async fn latest_block_timestamp(&self) -> Result<u64>;

    async fn balance_of(&self, address: Address) -> Result<U256>;

    async fn nonce_of(&self, address: Address) -> Result<u64>;

    async fn estimate_gas_price(&self) -> Result<U256>;

    /// `eth_call` against a contract with raw calldata, returning the raw
    /// response words.
    async fn call_view(&self, contract: Address, calldata: Bytes) -> Result<Bytes>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<H256>;

    /// None until the transaction is mined.
    async fn get_receipt(&self, tx_hash: H256) -> Result<Option<ReceiptInfo>>;
}
