// Domain constants for the presale sniper

pub mod ethereum {
    // Target network
    pub const ARBITRUM_ONE_CHAIN_ID: u64 = 42161;

    // Gas bounds
    pub const MIN_TRANSFER_GAS: u64 = 21_000;
    pub const DEFAULT_GAS_LIMIT: u64 = 500_000;
    pub const DEFAULT_MAX_GAS_PRICE_WEI: u128 = 100_000_000; // 0.1 gwei, rollup base
    pub const DEFAULT_PRIORITY_FEE_WEI: u128 = 1_000_000_000; // 1 gwei

    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
}

pub mod presale {
    // Function signatures of the common presale ABI (PinkSale/DxSale style)
    pub const BUY: &str = "buy()";
    pub const IS_ACTIVE: &str = "isPresaleActive()";
    pub const TOTAL_RAISED: &str = "totalRaised()";
    pub const HARD_CAP: &str = "hardCap()";
    pub const START_TIME: &str = "presaleStartTime()";
    pub const END_TIME: &str = "presaleEndTime()";
    pub const TOKEN_PRICE: &str = "getTokenPrice()";
}

pub mod execution {
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
    pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 5_000;
    pub const DEFAULT_CONFIRMATION_TIMEOUT_MS: u64 = 300_000;
    pub const DEFAULT_MAX_SLIPPAGE: f64 = 0.05;
    pub const DEFAULT_MIN_CONFIRMATIONS: u64 = 1;

    // Gas escalation per retry: price * NUM / DEN, +12.5% each step
    pub const GAS_ESCALATION_NUM: u64 = 9;
    pub const GAS_ESCALATION_DEN: u64 = 8;

    // Monitor backoff after transient read failures
    pub const MONITOR_BACKOFF_BASE_MS: u64 = 1_000;
    pub const MONITOR_BACKOFF_CAP_MS: u64 = 60_000;
}

pub mod notify {
    pub const QUEUE_CAPACITY: usize = 64;
    pub const DELIVERY_TIMEOUT_MS: u64 = 3_000;
    pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
}
