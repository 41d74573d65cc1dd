use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use strum::IntoEnumIterator;

use range_profiler::data::ProfileStore;
use range_profiler::utils::time_utils::{epoch_ms_to_utc, infer_interval_ms};
use range_profiler::utils::TimeUtils;
use range_profiler::{
    Cli, EngineConfig, Indicator, IndicatorOutput, RangeEngine, RangeStatus, VolumeProfileIndicator,
    load_candles,
};

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = fs::read_to_string(path).context(format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&json)
                .context(format!("Failed to parse config file: {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if cli.trend_profiles {
        config.detection.create_trend_profiles = true;
    }
    Ok(config)
}

fn main() -> Result<()> {
    // A. Init Logging
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {:?}", panic_info);
    }));
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // B. Parse Args
    let args = Cli::parse();
    #[cfg(debug_assertions)]
    log::info!("Parsed arguments: {:?}", args);

    // C. Load config and candles
    let config = load_config(&args)?;
    let candles = load_candles(&args.candles)?;
    let timestamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    let interval = infer_interval_ms(&timestamps).map_or("unknown", TimeUtils::interval_to_string);

    // D. Run the engine
    let mut engine = RangeEngine::new(config)?;
    if let (Some(start), Some(end)) = (args.start, args.end) {
        engine.set_date_filter(&args.symbol, start, end);
    }
    let ranges = engine.analyze(&args.symbol, &candles).to_vec();

    println!(
        "{} ({}): {} candles, {} ranges",
        args.symbol,
        interval,
        candles.len(),
        ranges.len()
    );
    for status in RangeStatus::iter() {
        let matching: Vec<_> = ranges.iter().filter(|r| r.status == status).collect();
        println!("  {status}: {}", matching.len());
        for range in matching {
            println!(
                "    {}  {} -> {}  low {:.4} high {:.4} ({:.2}%)  {} candles",
                range.id,
                epoch_ms_to_utc(range.start_timestamp),
                epoch_ms_to_utc(range.end_timestamp),
                range.low,
                range.high,
                range.size_pct(),
                range.candle_count
            );
        }
    }

    let profile_ids: Vec<String> = engine.profiles(&args.symbol).iter().map(|p| p.id.clone()).collect();
    println!("  Profiles: {}", profile_ids.len());
    for id in &profile_ids {
        let label = engine
            .profiles(&args.symbol)
            .iter()
            .find(|p| &p.id == id)
            .and_then(|p| p.label.clone())
            .unwrap_or_else(|| "-".to_string());
        match engine.volume_profile(&args.symbol, id) {
            Some(profile) => println!(
                "    [{label}] {id}  POC {:.4}  VA {:.4} - {:.4} ({:.1}% of volume)  clusters {}",
                profile.poc.price,
                profile.value_area.val_price,
                profile.value_area.vah_price,
                100.0 * profile.value_area_volume() / profile.total_volume.max(f64::EPSILON),
                profile.cluster_count()
            ),
            None => println!("    [{label}] {id}  (no volume data)"),
        }
    }

    // E. Whole-window profile
    let mut window = VolumeProfileIndicator::default();
    window.fetch(&candles)?;
    if let Some(IndicatorOutput::Profile(profile)) = window.render() {
        println!(
            "  {}: POC {:.4}  VA {:.4} - {:.4}",
            window.name(),
            profile.poc.price,
            profile.value_area.val_price,
            profile.value_area.vah_price
        );
    }

    // F. Snapshot
    let output = args.output.clone().unwrap_or_else(ProfileStore::default_path);
    engine
        .snapshot()
        .save_to_path(&output)
        .context("Failed to write snapshot")?;
    log::info!("Snapshot written to {}", output.display());
    Ok(())
}
