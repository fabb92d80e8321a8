use ethers::types::U256;

/// Display helpers for logs and notifications. Amounts stay in wei inside
/// the engine; conversion to human units happens only at the edges.
pub mod fmt {
    use super::*;

    const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;
    const WEI_PER_GWEI: u128 = 1_000_000_000;

    /// Wei to an ETH string with 4 decimal places.
    pub fn eth(wei: U256) -> String {
        let whole = wei / U256::from(WEI_PER_ETH);
        let frac = (wei % U256::from(WEI_PER_ETH)) / U256::from(WEI_PER_ETH / 10_000);
        format!("{}.{:04}", whole, frac.as_u64())
    }

    /// Wei to a gwei string with 2 decimal places.
    pub fn gwei(wei: U256) -> String {
        let whole = wei / U256::from(WEI_PER_GWEI);
        let frac = (wei % U256::from(WEI_PER_GWEI)) / U256::from(WEI_PER_GWEI / 100);
        format!("{}.{:02}", whole, frac.as_u64())
    }

    /// Abbreviated 0x-hex for addresses and hashes: first and last 4 bytes.
    pub fn short_hex(bytes: &[u8]) -> String {
        if bytes.len() <= 8 {
            return format!("0x{}", hex::encode(bytes));
        }
        format!(
            "0x{}..{}",
            hex::encode(&bytes[..4]),
            hex::encode(&bytes[bytes.len() - 4..])
        )
    }
}

/// Relative price deviation in basis points. A zero reference yields zero
/// deviation (no reference to compare against).
pub fn deviation_bps(reference: U256, current: U256) -> u64 {
    if reference.is_zero() {
        return 0;
    }
    let diff = if current > reference {
        current - reference
    } else {
        reference - current
    };
    let bps = diff * U256::from(10_000u64) / reference;
    bps.min(U256::from(u64::MAX)).as_u64()
}
