//! CLI argument definitions for cointick.
//!
//! Every subcommand maps onto one served tool; `serve` answers many tool
//! calls over stdin/stdout with one shared client and cache.
//!
//! # Commands
//!
//! | Command | Tool |
//! |---------|------|
//! | `quote` | `get_cryptocurrency_price` |
//! | `info` | `get_cryptocurrency_info` |
//! | `listings` | `get_top_cryptocurrencies` |
//! | `global` | `get_global_metrics` |
//! | `historical` | `get_historical_data` |
//! | `ohlcv` | `get_ohlcv_data` |
//! | `search` | `search_cryptocurrencies` |
//! | `overview` | `get_market_statistics` |
//! | `cache-stats` | `get_cache_stats` |
//! | `serve` | all of the above, one JSON call per line |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--timeout-secs` | env / `30` | Per-attempt request timeout |
//! | `--max-retries` | env / `3` | Retries after the first attempt |
//! | `--retry-jitter` | env / `false` | Randomize backoff delays by +/- 50% |
//! | `--no-cache` | `false` | Neither read nor write the response cache |
//! | `--refresh` | `false` | Skip cached answers but store fresh ones |
//!
//! # Examples
//!
//! ```bash
//! export COINMARKETCAP_API_KEY=...
//!
//! cointick quote BTC ETH --convert EUR --pretty
//! cointick listings --limit 20 --sort percent_change_24h
//! cointick ohlcv BTC --period weekly --count 12
//!
//! # Long-running tool server
//! echo '{"tool":"get_global_metrics","arguments":{}}' | cointick serve
//! ```

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use cointick_core::{CacheMode, HistoryInterval, ListingSort, OhlcvPeriod, Settings, SortDirection};

/// cointick - CoinMarketCap market data with rate limiting, retries and caching.
#[derive(Debug, Parser)]
#[command(
    name = "cointick",
    author,
    version,
    about = "CoinMarketCap market data CLI and tool server",
    long_about = "cointick fetches cryptocurrency market data from the CoinMarketCap API.\n\
\n\
  • Client-side rate limiting against the plan quota\n\
  • Retries with exponential backoff for transient failures\n\
  • In-memory TTL/LRU response cache\n\
  • JSON output, and a line-delimited JSON tool server\n\
\n\
The API key is read from COINMARKETCAP_API_KEY."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-attempt request timeout in seconds (overrides REQUEST_TIMEOUT_SECONDS).
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Retries after the first attempt (overrides MAX_RETRIES).
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Randomize backoff delays by +/- 50% (overrides RETRY_JITTER).
    #[arg(long, global = true, default_value_t = false)]
    pub retry_jitter: bool,

    /// Neither read nor write the response cache.
    #[arg(long, global = true, default_value_t = false, conflicts_with = "refresh")]
    pub no_cache: bool,

    /// Ignore cached answers, but store the fresh ones.
    #[arg(long, global = true, default_value_t = false)]
    pub refresh: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn cache_mode(&self) -> CacheMode {
        if self.no_cache {
            CacheMode::Bypass
        } else if self.refresh {
            CacheMode::Refresh
        } else {
            CacheMode::Use
        }
    }

    /// Layer command-line overrides on top of environment settings.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(secs) = self.timeout_secs {
            settings.client = settings.client.with_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.max_retries {
            settings.client = settings.client.with_max_retries(retries);
        }
        if self.retry_jitter {
            settings.client = settings.client.with_retry_jitter(true);
        }
        settings
    }
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// 💰 Latest price and market data for one or more assets.
    ///
    /// # Examples
    ///
    ///   cointick quote BTC
    ///   cointick quote btc,eth --convert EUR
    ///   cointick quote --id 1 --id 1027
    Quote(QuoteArgs),

    /// ℹ️ Static metadata: description, logo, links, tags.
    ///
    /// # Examples
    ///
    ///   cointick info BTC ETH
    Info(SelectionArgs),

    /// 📊 Top of the market-cap listing.
    ///
    /// # Examples
    ///
    ///   cointick listings --limit 10
    ///   cointick listings --start 101 --limit 50 --sort volume_24h
    Listings(ListingsArgs),

    /// 🌐 Global market metrics and dominance.
    Global(ConvertArgs),

    /// 📈 Historical price series for one asset.
    ///
    /// # Examples
    ///
    ///   cointick historical BTC --time-start 2024-01-01 --interval daily
    Historical(HistoricalArgs),

    /// 🕯️ OHLCV candles for one asset.
    ///
    /// # Examples
    ///
    ///   cointick ohlcv ETH --period weekly --count 12
    Ohlcv(OhlcvArgs),

    /// 🔍 Search assets by name or symbol.
    ///
    /// # Examples
    ///
    ///   cointick search bit --limit 5
    Search(SearchArgs),

    /// 🧭 Global metrics with the top of the listing and derived ratios.
    Overview(OverviewArgs),

    /// 🗄️ Response cache counters of this process.
    CacheStats,

    /// 🔌 Serve tool calls as line-delimited JSON on stdin/stdout.
    ///
    /// Each input line is {"tool": "...", "arguments": {...}, "id": ...};
    /// each output line is the result envelope, echoing "id" when given.
    Serve,
}

#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Symbols, separately or comma-joined.
    pub symbols: Vec<String>,

    /// Numeric CoinMarketCap ids (used when no symbols are given).
    #[arg(long = "id", value_delimiter = ',')]
    pub ids: Vec<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct QuoteArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Quote currency.
    #[arg(long, default_value = "USD")]
    pub convert: String,
}

#[derive(Debug, Clone, Args)]
pub struct ConvertArgs {
    /// Quote currency.
    #[arg(long, default_value = "USD")]
    pub convert: String,
}

#[derive(Debug, Clone, Args)]
pub struct ListingsArgs {
    /// 1-based rank offset.
    #[arg(long, default_value_t = 1)]
    pub start: i64,

    /// Number of assets (1-5000).
    #[arg(long, default_value_t = 100)]
    pub limit: i64,

    /// Quote currency.
    #[arg(long, default_value = "USD")]
    pub convert: String,

    /// Sort field.
    #[arg(long, default_value_t = ListingSort::default())]
    pub sort: ListingSort,

    /// Sort direction (asc or desc).
    #[arg(long, default_value_t = SortDirection::default())]
    pub sort_dir: SortDirection,
}

#[derive(Debug, Clone, Args)]
pub struct HistoricalArgs {
    pub symbol: String,

    /// Start of the range (YYYY-MM-DD or RFC3339).
    #[arg(long)]
    pub time_start: Option<String>,

    /// End of the range (YYYY-MM-DD or RFC3339).
    #[arg(long)]
    pub time_end: Option<String>,

    /// Number of points (1-10000).
    #[arg(long, default_value_t = 10)]
    pub count: i64,

    #[arg(long, default_value_t = HistoryInterval::default())]
    pub interval: HistoryInterval,

    #[arg(long, default_value = "USD")]
    pub convert: String,
}

#[derive(Debug, Clone, Args)]
pub struct OhlcvArgs {
    pub symbol: String,

    /// Candle width.
    #[arg(long, default_value_t = OhlcvPeriod::default())]
    pub period: OhlcvPeriod,

    #[arg(long)]
    pub time_start: Option<String>,

    #[arg(long)]
    pub time_end: Option<String>,

    /// Number of candles (1-10000).
    #[arg(long, default_value_t = 10)]
    pub count: i64,

    #[arg(long, default_value = "USD")]
    pub convert: String,
}

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    pub query: String,

    /// Maximum results (1-100).
    #[arg(long, default_value_t = 10)]
    pub limit: i64,
}

#[derive(Debug, Clone, Args)]
pub struct OverviewArgs {
    /// Number of top assets to include (1-100).
    #[arg(long, default_value_t = 10)]
    pub top: i64,

    #[arg(long, default_value = "USD")]
    pub convert: String,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn quote_accepts_symbols_and_repeated_ids() {
        let cli = Cli::try_parse_from(["cointick", "quote", "BTC", "eth", "--id", "1,1027"])
            .expect("parses");

        match cli.command {
            Command::Quote(args) => {
                assert_eq!(args.selection.symbols, ["BTC", "eth"]);
                assert_eq!(args.selection.ids, [1, 1027]);
                assert_eq!(args.convert, "USD");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "cointick",
            "listings",
            "--limit",
            "5",
            "--sort",
            "volume_24h",
            "--no-cache",
            "--max-retries",
            "1",
        ])
        .expect("parses");

        assert_eq!(cli.cache_mode(), CacheMode::Bypass);
        assert_eq!(cli.max_retries, Some(1));
        match cli.command {
            Command::Listings(args) => {
                assert_eq!(args.limit, 5);
                assert_eq!(args.sort, ListingSort::Volume24h);
                assert_eq!(args.sort_dir, SortDirection::Desc);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn unknown_enumeration_values_are_rejected_by_the_parser() {
        let result = Cli::try_parse_from(["cointick", "ohlcv", "BTC", "--period", "fortnightly"]);

        assert!(result.is_err());
    }

    #[test]
    fn no_cache_and_refresh_conflict() {
        let result = Cli::try_parse_from(["cointick", "global", "--no-cache", "--refresh"]);

        assert!(result.is_err());
    }

    #[test]
    fn overrides_replace_environment_values() {
        let settings = Settings::from_lookup(|name: &str| {
            (name == "COINMARKETCAP_API_KEY").then(|| String::from("test-key"))
        })
        .expect("settings");
        let cli = Cli::try_parse_from(["cointick", "--timeout-secs", "5", "cache-stats"])
            .expect("parses");

        let settings = cli.apply(settings);

        assert_eq!(settings.client.timeout, Duration::from_secs(5));
        assert_eq!(settings.client.max_retries, 3);
        assert!(!settings.client.retry_jitter);
        assert_eq!(cli.cache_mode(), CacheMode::Use);
    }

    #[test]
    fn retry_jitter_flag_enables_jittered_backoff() {
        let settings = Settings::from_lookup(|name: &str| {
            (name == "COINMARKETCAP_API_KEY").then(|| String::from("test-key"))
        })
        .expect("settings");
        let cli = Cli::try_parse_from(["cointick", "global", "--retry-jitter"]).expect("parses");

        let settings = cli.apply(settings);

        assert!(settings.client.retry_config().backoff.jitter);
    }
}
