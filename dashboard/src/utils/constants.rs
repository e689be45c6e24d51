/// Assets shown when `ASSETS` is not configured
pub const DEFAULT_ASSETS: &str = "ETH,USDC,UNI";

pub const DEFAULT_CONNECTION_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_RECEIPT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_HEALTH_SERVER_PORT: u16 = 8080;

/// Comptroller liquidity and shortfall are USD mantissas with 18 decimals
pub const LIQUIDITY_DECIMALS: u8 = 18;

/// Oracle prices are scaled by `10^(36 - underlying decimals)`
pub const PRICE_MANTISSA_DECIMALS: u8 = 36;

/// Shown in place of values that could not be read or computed
pub const PLACEHOLDER: &str = "-";

pub const ENABLE_BUTTON_ID: &str = "enable-button";

pub const WALLET_NOT_DETECTED: &str = "Wallet provider not detected. Check RPC_URL.";
