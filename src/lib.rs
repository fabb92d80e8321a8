pub mod chain;
pub mod execution;
pub mod infrastructure;
pub mod monitor;
pub mod notify;
pub mod shared;

// Re-export commonly used types
pub use chain::client::{ChainClient, ReceiptInfo};
pub use execution::controller::{ExecutionController, Outcome};
pub use shared::error::{RpcErrorKind, SniperError};
pub use shared::types::{PresaleState, TransactionAttempt, WalletSnapshot};

// Re-export result type carrying the sniper error taxonomy
pub type Result<T, E = SniperError> = std::result::Result<T, E>;
