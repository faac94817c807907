//! Candle and config loading
//!
//! Reads candle series from `.json` (array of candles) or `.csv` files with
//! an `open,high,low,close,volume,time` header. CSV times may be unix seconds
//! or RFC 3339 strings.

use crate::structure::{Candle, EngineConfig};
use anyhow::{bail, Context, Result};
use chrono::DateTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize)]
struct CsvRow {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
    #[serde(alias = "timestamp", alias = "date")]
    time: String,
}

fn parse_time(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<i64>() {
        return Ok(seconds);
    }
    let parsed = DateTime::parse_from_rfc3339(raw).with_context(|| format!("invalid time '{}'", raw))?;
    Ok(parsed.timestamp())
}

/// Lowercased file extension
fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Load candles from a `.json` or `.csv` file
pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let candles = match extension(path).as_deref() {
        Some("json") => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<Vec<Candle>>(&data)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        Some("csv") => {
            let mut reader = csv::Reader::from_path(path)
                .with_context(|| format!("opening {}", path.display()))?;
            let mut candles = Vec::new();
            for (line, row) in reader.deserialize::<CsvRow>().enumerate() {
                let row = row.with_context(|| format!("{}: row {}", path.display(), line + 1))?;
                let time = parse_time(&row.time)
                    .with_context(|| format!("{}: row {}", path.display(), line + 1))?;
                candles.push(Candle::new(row.open, row.high, row.low, row.close, row.volume, time));
            }
            candles
        }
        _ => bail!("unsupported candle file {}, expected .json or .csv", path.display()),
    };

    info!("Loaded {} candles from {}", candles.len(), path.display());
    Ok(candles)
}

/// Load a config bag; absent keys keep their defaults
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = EngineConfig::from_json(&data)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Candle files directly under `dir`, sorted by name
pub fn candle_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        let supported = matches!(extension(&path).as_deref(), Some("json") | Some("csv"));
        if path.is_file() && supported {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("market-structure-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("1700000000").unwrap(), 1_700_000_000);
        assert_eq!(parse_time("2023-11-14T22:13:20Z").unwrap(), 1_700_000_000);
        assert!(parse_time("yesterday").is_err());
    }

    #[test]
    fn test_load_csv_and_json() {
        let dir = temp_dir("load");

        let csv_path = dir.join("bars.csv");
        std::fs::write(
            &csv_path,
            "open,high,low,close,volume,time\n\
             100.0,101.0,99.5,100.5,12,1700000000\n\
             100.5,102.0,100.0,101.5,8,2023-11-14T22:14:20Z\n",
        )
        .unwrap();
        let candles = load_candles(&csv_path).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].time, 1_700_000_060);
        assert_eq!(candles[1].high, 102.0);

        let json_path = dir.join("bars.json");
        std::fs::write(&json_path, serde_json::to_string(&candles).unwrap()).unwrap();
        assert_eq!(load_candles(&json_path).unwrap(), candles);

        let files = candle_files(&dir).unwrap();
        assert_eq!(files, vec![csv_path, json_path]);

        assert!(load_candles(&dir.join("bars.txt")).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_uppercase_extensions() {
        let dir = temp_dir("upper");
        let path = dir.join("BARS.JSON");
        let candles = vec![Candle::new(100.0, 101.0, 99.5, 100.5, 3.0, 1_700_000_000)];
        std::fs::write(&path, serde_json::to_string(&candles).unwrap()).unwrap();
        std::fs::write(dir.join("notes.txt"), "skip").unwrap();

        assert_eq!(candle_files(&dir).unwrap(), vec![path.clone()]);
        assert_eq!(load_candles(&path).unwrap(), candles);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config() {
        let dir = temp_dir("config");
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"byTrend": true}"#).unwrap();
        let config = load_config(&path).unwrap();
        assert!(config.by_trend);
        assert!(config.show_fake);
        std::fs::remove_dir_all(&dir).ok();
    }
}
