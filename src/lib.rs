#![allow(clippy::collapsible_if)]

// Core modules
pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod models;
pub mod utils;

// The engine
pub mod engine;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig, RangeDetectionConfig, VolumeProfileConfig};
pub use data::{ProfileStore, load_candles};
pub use domain::Candle;
pub use engine::RangeEngine;
pub use indicators::{Indicator, IndicatorOutput, RangeDetectionIndicator, VolumeProfileIndicator};
pub use models::{FixedRangeProfile, Range, RangeStatus, VolumeProfile};

// CLI argument parsing
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON file holding an array of candle objects or kline rows
    #[arg(long)]
    pub candles: PathBuf,

    /// Symbol the candles belong to
    #[arg(long, default_value = "BTCUSDT")]
    pub symbol: String,

    /// Optional engine config JSON; missing fields take their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Where to write the snapshot (defaults to range_profiles.json)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Only analyze candles at or after this timestamp (ms)
    #[arg(long, requires = "end")]
    pub start: Option<i64>,

    /// Only analyze candles at or before this timestamp (ms)
    #[arg(long, requires = "start")]
    pub end: Option<i64>,

    /// Also create profiles over the gaps between ranges
    #[arg(long, default_value_t = false)]
    pub trend_profiles: bool,
}
