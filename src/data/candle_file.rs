use std::convert::TryFrom;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::Candle;

/// A kline row as returned by exchange REST APIs:
/// `[open_time, "open", "high", "low", "close", "volume", close_time, ...]`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KlineError {
    #[error("kline row has {0} fields, expected at least 6")]
    InvalidLength(usize),
    #[error("kline field `{0}` is not a number")]
    InvalidType(&'static str),
}

// Prices arrive either as JSON numbers or as numeric strings.
fn field_to_f64(value: &Value, name: &'static str) -> Result<f64, KlineError> {
    match value {
        Value::Number(n) => n.as_f64().ok_or(KlineError::InvalidType(name)),
        Value::String(s) => s.parse::<f64>().map_err(|_| KlineError::InvalidType(name)),
        _ => Err(KlineError::InvalidType(name)),
    }
}

impl TryFrom<Vec<Value>> for Candle {
    type Error = KlineError;

    fn try_from(row: Vec<Value>) -> Result<Self, Self::Error> {
        if row.len() < 6 {
            return Err(KlineError::InvalidLength(row.len()));
        }
        let timestamp = row[0].as_i64().ok_or(KlineError::InvalidType("open_time"))?;
        Ok(Candle::new(
            timestamp,
            field_to_f64(&row[1], "open")?,
            field_to_f64(&row[2], "high")?,
            field_to_f64(&row[3], "low")?,
            field_to_f64(&row[4], "close")?,
            field_to_f64(&row[5], "volume")?,
        ))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandleRecord {
    Object(Candle),
    Kline(Vec<Value>),
}

/// Parse a JSON array of candles. Each element is either a candle object or a
/// kline row. The result is sorted by timestamp with duplicates removed (the
/// last occurrence wins, so a refreshed live bar replaces its stale copy).
pub fn parse_candles(json: &str) -> Result<Vec<Candle>> {
    let records: Vec<CandleRecord> = serde_json::from_str(json).context("Candle data is not a JSON array")?;
    let mut candles = Vec::with_capacity(records.len());
    for (i, record) in records.into_iter().enumerate() {
        let candle = match record {
            CandleRecord::Object(candle) => candle,
            CandleRecord::Kline(row) => Candle::try_from(row).context(format!("Bad kline at index {i}"))?,
        };
        candles.push(candle);
    }
    Ok(normalize(candles))
}

pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let file = File::open(path).context(format!("Failed to open candle file: {}", path.display()))?;
    let mut json = String::new();
    BufReader::new(file)
        .read_to_string(&mut json)
        .context(format!("Failed to read candle file: {}", path.display()))?;
    let candles = parse_candles(&json).context(format!("Failed to parse candles in {}", path.display()))?;
    log::info!("Loaded {} candles from {}", candles.len(), path.display());
    Ok(candles)
}

fn normalize(mut candles: Vec<Candle>) -> Vec<Candle> {
    // Stable sort keeps input order among equal timestamps.
    candles.sort_by_key(|c| c.timestamp);
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match out.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => *last = candle,
            _ => out.push(candle),
        }
    }
    out
}
