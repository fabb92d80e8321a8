pub mod client;
pub mod codec;
pub mod http;

pub use client::{ChainClient, ReceiptInfo};
pub use http::HttpChainClient;
