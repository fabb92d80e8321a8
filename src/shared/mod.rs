pub mod constants;
pub mod error;
pub mod types;
pub mod utils;

pub use error::{RpcErrorKind, SniperError};
pub use types::{AttemptStatus, PresaleSnapshot, PresaleState, TransactionAttempt, WalletSnapshot};
