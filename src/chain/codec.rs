use crate::shared::constants::presale;
use crate::{Result, SniperError};
use ethers::types::{Bytes, U256};
use ethers::utils::id;

/// 4-byte selector for a function signature.
pub fn selector(signature: &str) -> Bytes {
    Bytes::from(id(signature).to_vec())
}

pub fn buy_calldata() -> Bytes {
    selector(presale::BUY)
}

/// Decode a single uint256 return word.
pub fn decode_uint(data: &[u8]) -> Result<U256> {
    if data.len() < 32 {
        return Err(SniperError::permanent_rpc(
            "abi decode",
            format!("expected a 32-byte word, got {} bytes", data.len()),
        ));
    }
    Ok(U256::from_big_endian(&data[..32]))
}

/// Decode a single bool return word (any non-zero word is true).
pub fn decode_bool(data: &[u8]) -> Result<bool> {
    decode_uint(data).map(|word| !word.is_zero())
}

/// Encode a uint256 as a single return word, used by tests scripting
/// `eth_call` responses.
pub fn encode_uint(value: U256) -> Bytes {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    Bytes::from(word.to_vec())
}

/// Encode a bool as a single return word.
pub fn encode_bool(value: bool) -> Bytes {
    encode_uint(U256::from(value as u64))
}
