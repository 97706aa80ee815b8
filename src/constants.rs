//! Constants for the market monitor
//!
//! Defaults for every tunable live here. `MonitorConfig::default()` is built
//! from these values and environment overrides are applied on top of them.

/// Auction service base URL
pub const DEFAULT_BASE_URL: &str = "https://api.tlp-auctions.com";

/// Server the auction data is scoped to
pub const DEFAULT_SERVER_NAME: &str = "Teek";

/// Exchange rate endpoint (plain-text body, e.g. `"4321.87"`)
pub const RATE_ENDPOINT: &str = "/KronoPrice";

/// Free-text price check endpoint
pub const PRICE_CHECK_ENDPOINT: &str = "/PriceCheck";

/// Exact-match sales log endpoint
pub const SALES_LOG_ENDPOINT: &str = "/SalesLog";

/// HTTP request timeout (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Pause between two items of one tracking pass (in milliseconds)
pub const ITEM_DELAY_MS: u64 = 1_000;

/// Pause after a full pass over the watch list (in seconds)
pub const PASS_DELAY_SECS: u64 = 10;

/// How long the log monitor waits when the tailed file has nothing new (in milliseconds)
pub const TAIL_POLL_INTERVAL_MS: u64 = 250;

/// Width of the `[Mon Oct 16 10:00:00 2026] ` header on game log lines
pub const LOG_PREFIX_WIDTH: usize = 27;

/// Chat token that starts a price check command
pub const COMMAND_MARKER: &str = "!pc";

/// Character that terminates a command argument (closing chat quote)
pub const COMMAND_DELIMITER: char = '\'';

/// Remainders at or below this many lower units are not spoken when at least
/// one higher unit is present
pub const REMAINDER_THRESHOLD: u64 = 100;

/// Name of the higher denomination
pub const HIGHER_UNIT: &str = "krono";

/// Name of the lower denomination
pub const LOWER_UNIT: &str = "platinum";

/// User agent for HTTP requests
pub const USER_AGENT: &str = "eq-market-monitor/0.1.0";
