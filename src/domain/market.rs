//! Market price store and variation queries.
//!
//! Holds the current price per asset plus an ordered history of prior price
//! maps. Each snapshot is tagged with the timestamp at which that map *was*
//! current, so "variation over N hours" resolves to the most recent snapshot
//! taken at or before `last_updated - N hours`.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::domain::error::MoneybinError;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    pub prices: HashMap<String, f64>,
}

/// A batch of price updates from the market data feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub timestamp: DateTime<Utc>,
    pub prices: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct MarketState {
    prices: HashMap<String, f64>,
    history: Vec<Snapshot>,
    history_limit: Option<usize>,
    last_updated: DateTime<Utc>,
}

impl Default for MarketState {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketState {
    pub fn new() -> Self {
        MarketState {
            prices: HashMap::new(),
            history: Vec::new(),
            history_limit: None,
            last_updated: Utc::now(),
        }
    }

    /// Keep at most `limit` snapshots, evicting the oldest. `limit == 0`
    /// means unbounded.
    pub fn with_history_limit(limit: usize) -> Self {
        MarketState {
            history_limit: if limit == 0 { None } else { Some(limit) },
            ..Self::new()
        }
    }

    pub fn update_prices(&mut self, updates: &HashMap<String, f64>) -> Result<(), MoneybinError> {
        self.update_prices_at(updates, Utc::now())
    }

    /// Timestamped variant used when replaying a historical feed. Validates
    /// the whole batch before touching any state.
    pub fn update_prices_at(
        &mut self,
        updates: &HashMap<String, f64>,
        now: DateTime<Utc>,
    ) -> Result<(), MoneybinError> {
        if updates.is_empty() {
            return Err(MoneybinError::InvalidInput {
                reason: "price update batch is empty".to_string(),
            });
        }
        for (code, price) in updates {
            if *price <= 0.0 {
                return Err(MoneybinError::InvalidInput {
                    reason: format!("non-positive price {} for asset {}", price, code),
                });
            }
        }

        // The very first update has no prior prices worth remembering.
        if !self.prices.is_empty() {
            self.history.push(Snapshot {
                taken_at: self.last_updated,
                prices: self.prices.clone(),
            });
            if let Some(limit) = self.history_limit {
                while self.history.len() > limit {
                    self.history.remove(0);
                }
            }
        }

        for (code, price) in updates {
            self.prices.insert(code.clone(), *price);
        }
        self.last_updated = now;
        Ok(())
    }

    /// Current price, or `AssetNotFound` for an asset that has never been
    /// priced. Never signals absence through a sentinel value.
    pub fn current_price(&self, asset: &str) -> Result<f64, MoneybinError> {
        self.prices
            .get(asset)
            .copied()
            .ok_or_else(|| MoneybinError::AssetNotFound {
                asset: asset.to_string(),
            })
    }

    pub fn is_priced(&self, asset: &str) -> bool {
        self.prices.contains_key(asset)
    }

    pub fn asset_count(&self) -> usize {
        self.prices.len()
    }

    pub fn priced_assets(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn snapshot_count(&self) -> usize {
        self.history.len()
    }

    /// Percent change over the trailing `hours`. Missing data — an unpriced
    /// asset, no old-enough snapshot, or a zero prior price — yields 0.0, a
    /// defined neutral result rather than an error.
    pub fn variation(&self, asset: &str, hours: i64) -> f64 {
        let Some(&current) = self.prices.get(asset) else {
            return 0.0;
        };

        let target = self.last_updated - Duration::hours(hours);
        let Some(snapshot) = self.history.iter().rev().find(|s| s.taken_at <= target) else {
            return 0.0;
        };

        // A snapshot that predates the asset's first pricing carries no prior
        // price; treat it as unchanged.
        let prior = snapshot.prices.get(asset).copied().unwrap_or(current);
        if prior == 0.0 {
            return 0.0;
        }
        (current - prior) / prior * 100.0
    }

    /// Every priced asset whose absolute 24h variation meets the threshold.
    pub fn detect_sharp_moves(&self, threshold_pct: f64) -> HashMap<String, f64> {
        let mut moves = HashMap::new();
        for code in self.prices.keys() {
            let variation = self.variation(code, 24);
            if variation.abs() >= threshold_pct {
                moves.insert(code.clone(), variation);
            }
        }
        moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs
            .iter()
            .map(|(code, price)| (code.to_string(), *price))
            .collect()
    }

    /// BTC priced 100 at t-48h, 110 at t-24h, 121 now.
    fn market_with_history() -> MarketState {
        let mut market = MarketState::new();
        market
            .update_prices_at(&prices(&[("BTC", 100.0)]), at(1, 12))
            .unwrap();
        market
            .update_prices_at(&prices(&[("BTC", 110.0)]), at(2, 12))
            .unwrap();
        market
            .update_prices_at(&prices(&[("BTC", 121.0)]), at(3, 12))
            .unwrap();
        market
    }

    #[test]
    fn update_rejects_empty_batch() {
        let mut market = MarketState::new();
        let result = market.update_prices_at(&HashMap::new(), at(1, 12));
        assert!(matches!(result, Err(MoneybinError::InvalidInput { .. })));
    }

    #[test]
    fn update_rejects_non_positive_price_without_partial_state() {
        let mut market = MarketState::new();
        market
            .update_prices_at(&prices(&[("BTC", 100.0)]), at(1, 12))
            .unwrap();

        let bad = prices(&[("ETH", 10.0), ("BTC", -5.0)]);
        assert!(market.update_prices_at(&bad, at(2, 12)).is_err());

        // Nothing from the rejected batch is visible.
        assert!(!market.is_priced("ETH"));
        assert_eq!(market.current_price("BTC").unwrap(), 100.0);
        assert_eq!(market.last_updated(), at(1, 12));
        assert_eq!(market.snapshot_count(), 0);
    }

    #[test]
    fn current_price_unknown_asset_is_not_found() {
        let market = MarketState::new();
        assert!(matches!(
            market.current_price("DOGE"),
            Err(MoneybinError::AssetNotFound { .. })
        ));
    }

    #[test]
    fn update_merges_over_existing_prices() {
        let mut market = MarketState::new();
        market
            .update_prices_at(&prices(&[("BTC", 100.0), ("ETH", 10.0)]), at(1, 12))
            .unwrap();
        market
            .update_prices_at(&prices(&[("BTC", 105.0)]), at(1, 13))
            .unwrap();

        assert_eq!(market.current_price("BTC").unwrap(), 105.0);
        // ETH is untouched by the second batch.
        assert_eq!(market.current_price("ETH").unwrap(), 10.0);
        assert_eq!(market.asset_count(), 2);
    }

    #[test]
    fn first_update_records_no_snapshot() {
        let mut market = MarketState::new();
        market
            .update_prices_at(&prices(&[("BTC", 100.0)]), at(1, 12))
            .unwrap();
        assert_eq!(market.snapshot_count(), 0);

        market
            .update_prices_at(&prices(&[("BTC", 110.0)]), at(2, 12))
            .unwrap();
        assert_eq!(market.snapshot_count(), 1);
    }

    #[test]
    fn variation_over_24_and_48_hours() {
        let market = market_with_history();
        assert_relative_eq!(market.variation("BTC", 24), 10.0);
        assert_relative_eq!(market.variation("BTC", 48), 21.0);
    }

    #[test]
    fn variation_unknown_asset_is_zero() {
        let market = market_with_history();
        assert_eq!(market.variation("DOGE", 24), 0.0);
    }

    #[test]
    fn variation_without_old_enough_snapshot_is_zero() {
        let mut market = MarketState::new();
        market
            .update_prices_at(&prices(&[("BTC", 100.0)]), at(3, 11))
            .unwrap();
        market
            .update_prices_at(&prices(&[("BTC", 121.0)]), at(3, 12))
            .unwrap();

        // Only a 1h-old snapshot exists; nothing at or before t-24h.
        assert_eq!(market.variation("BTC", 24), 0.0);
    }

    #[test]
    fn variation_asset_missing_from_snapshot_is_zero() {
        let mut market = MarketState::new();
        market
            .update_prices_at(&prices(&[("BTC", 100.0)]), at(1, 12))
            .unwrap();
        market
            .update_prices_at(&prices(&[("BTC", 110.0), ("ETH", 10.0)]), at(2, 12))
            .unwrap();
        market
            .update_prices_at(&prices(&[("ETH", 12.0)]), at(3, 12))
            .unwrap();

        // The t-48h snapshot predates ETH's first pricing.
        assert_eq!(market.variation("ETH", 48), 0.0);
    }

    #[test]
    fn detect_sharp_moves_filters_by_threshold() {
        let mut market = MarketState::new();
        market
            .update_prices_at(&prices(&[("BTC", 100.0), ("ETH", 100.0)]), at(1, 12))
            .unwrap();
        market
            .update_prices_at(&prices(&[("BTC", 100.0), ("ETH", 100.0)]), at(2, 12))
            .unwrap();
        market
            .update_prices_at(&prices(&[("BTC", 103.0), ("ETH", 85.0)]), at(3, 12))
            .unwrap();

        let moves = market.detect_sharp_moves(10.0);
        assert_eq!(moves.len(), 1);
        assert_relative_eq!(moves["ETH"], -15.0);

        let moves = market.detect_sharp_moves(3.0);
        assert_eq!(moves.len(), 2);
        assert_relative_eq!(moves["BTC"], 3.0);
    }

    #[test]
    fn history_limit_evicts_oldest() {
        let mut market = MarketState::with_history_limit(2);
        for day in 1..=5 {
            market
                .update_prices_at(&prices(&[("BTC", 100.0 + day as f64)]), at(day, 12))
                .unwrap();
        }
        assert_eq!(market.snapshot_count(), 2);
    }

    #[test]
    fn history_limit_zero_means_unbounded() {
        let mut market = MarketState::with_history_limit(0);
        for day in 1..=5 {
            market
                .update_prices_at(&prices(&[("BTC", 100.0 + day as f64)]), at(day, 12))
                .unwrap();
        }
        assert_eq!(market.snapshot_count(), 4);
    }
}
