//! CSV price feed adapter.
//!
//! Replays a feed file with `timestamp,asset,price` rows. Consecutive rows
//! sharing a timestamp form one tick batch; rows must be in chronological
//! order.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::MoneybinError;
use crate::domain::market::PriceTick;
use crate::ports::feed_port::FeedPort;

pub struct CsvFeedAdapter {
    path: PathBuf,
}

impl CsvFeedAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl FeedPort for CsvFeedAdapter {
    fn load_ticks(&self) -> Result<Vec<PriceTick>, MoneybinError> {
        let content = fs::read_to_string(&self.path).map_err(|e| MoneybinError::Feed {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut ticks: Vec<PriceTick> = Vec::new();

        for (index, result) in rdr.records().enumerate() {
            // Header is line 1.
            let line = index + 2;
            let record = result.map_err(|e| MoneybinError::Feed {
                reason: format!("CSV parse error on line {}: {}", line, e),
            })?;

            let timestamp_str = record.get(0).ok_or_else(|| MoneybinError::Feed {
                reason: format!("missing timestamp column on line {}", line),
            })?;
            let timestamp = DateTime::parse_from_rfc3339(timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| MoneybinError::Feed {
                    reason: format!("invalid timestamp on line {}: {}", line, e),
                })?;

            let asset = record
                .get(1)
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| MoneybinError::Feed {
                    reason: format!("missing asset column on line {}", line),
                })?;

            let price: f64 = record
                .get(2)
                .ok_or_else(|| MoneybinError::Feed {
                    reason: format!("missing price column on line {}", line),
                })?
                .trim()
                .parse()
                .map_err(|e| MoneybinError::Feed {
                    reason: format!("invalid price on line {}: {}", line, e),
                })?;

            let extends_last = ticks.last().is_some_and(|t| t.timestamp == timestamp);
            if extends_last {
                let Some(tick) = ticks.last_mut() else {
                    unreachable!()
                };
                if tick.prices.insert(asset.clone(), price).is_some() {
                    return Err(MoneybinError::Feed {
                        reason: format!(
                            "duplicate asset {} in tick at {} (line {})",
                            asset, timestamp, line
                        ),
                    });
                }
            } else {
                if ticks.last().is_some_and(|t| t.timestamp > timestamp) {
                    return Err(MoneybinError::Feed {
                        reason: format!("feed not in chronological order at line {}", line),
                    });
                }
                let mut prices = HashMap::new();
                prices.insert(asset, price);
                ticks.push(PriceTick { timestamp, prices });
            }
        }

        Ok(ticks)
    }
}
