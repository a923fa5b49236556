//! Cryptoasset entity with price history.

use chrono::{DateTime, Utc};

use crate::domain::error::MoneybinError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// A tradeable cryptoasset. The price is strictly positive from construction
/// onwards; the history is append-only.
#[derive(Debug, Clone)]
pub struct Asset {
    pub code: String,
    pub name: String,
    current_price: f64,
    day_variation: f64,
    pub traded_volume: f64,
    pub circulating_supply: f64,
    history: Vec<PricePoint>,
    last_updated: DateTime<Utc>,
}

impl Asset {
    pub fn new(
        code: &str,
        name: &str,
        initial_price: f64,
        at: DateTime<Utc>,
    ) -> Result<Self, MoneybinError> {
        if initial_price <= 0.0 {
            return Err(MoneybinError::InvalidAmount {
                amount: initial_price,
            });
        }
        Ok(Asset {
            code: code.to_string(),
            name: name.to_string(),
            current_price: initial_price,
            day_variation: 0.0,
            traded_volume: 0.0,
            circulating_supply: 0.0,
            history: vec![PricePoint {
                timestamp: at,
                price: initial_price,
            }],
            last_updated: at,
        })
    }

    pub fn current_price(&self) -> f64 {
        self.current_price
    }

    /// Percent change recorded by the most recent price update.
    pub fn day_variation(&self) -> f64 {
        self.day_variation
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    pub fn history(&self) -> &[PricePoint] {
        &self.history
    }

    pub fn update_price(&mut self, new_price: f64) -> Result<(), MoneybinError> {
        self.update_price_at(new_price, Utc::now())
    }

    /// Timestamped variant used when replaying a historical feed.
    pub fn update_price_at(
        &mut self,
        new_price: f64,
        at: DateTime<Utc>,
    ) -> Result<(), MoneybinError> {
        if new_price <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: new_price });
        }
        let old_price = self.current_price;
        self.current_price = new_price;
        self.day_variation = (new_price - old_price) / old_price * 100.0;
        self.history.push(PricePoint {
            timestamp: at,
            price: new_price,
        });
        self.last_updated = at;
        Ok(())
    }

    pub fn update_price_with_volume(
        &mut self,
        new_price: f64,
        volume: f64,
    ) -> Result<(), MoneybinError> {
        self.update_price(new_price)?;
        self.traded_volume = volume;
        Ok(())
    }

    /// Price times circulating supply, or `None` when the supply is unknown.
    pub fn market_cap(&self) -> Option<f64> {
        if self.circulating_supply <= 0.0 {
            return None;
        }
        Some(self.current_price * self.circulating_supply)
    }

    /// Share of the total market this asset represents, as a percentage.
    pub fn dominance(&self, total_market_cap: f64) -> Option<f64> {
        if total_market_cap <= 0.0 {
            return None;
        }
        self.market_cap()
            .map(|cap| cap / total_market_cap * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn sample_asset() -> Asset {
        Asset::new("BTC", "Bitcoin", 50_000.0, at(9)).unwrap()
    }

    #[test]
    fn new_rejects_non_positive_price() {
        assert!(matches!(
            Asset::new("BTC", "Bitcoin", 0.0, at(9)),
            Err(MoneybinError::InvalidAmount { .. })
        ));
        assert!(matches!(
            Asset::new("BTC", "Bitcoin", -10.0, at(9)),
            Err(MoneybinError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn new_seeds_history() {
        let asset = sample_asset();
        assert_eq!(asset.history().len(), 1);
        assert_eq!(asset.history()[0].price, 50_000.0);
        assert_eq!(asset.day_variation(), 0.0);
    }

    #[test]
    fn update_price_recomputes_variation() {
        let mut asset = sample_asset();
        asset.update_price_at(55_000.0, at(10)).unwrap();

        assert_eq!(asset.current_price(), 55_000.0);
        assert_relative_eq!(asset.day_variation(), 10.0);
        assert_eq!(asset.history().len(), 2);
        assert_eq!(asset.last_updated(), at(10));
    }

    #[test]
    fn update_price_negative_variation() {
        let mut asset = sample_asset();
        asset.update_price_at(45_000.0, at(10)).unwrap();
        assert_relative_eq!(asset.day_variation(), -10.0);
    }

    #[test]
    fn update_price_rejects_non_positive() {
        let mut asset = sample_asset();
        let result = asset.update_price_at(-1.0, at(10));
        assert!(matches!(
            result,
            Err(MoneybinError::InvalidAmount { .. })
        ));
        // No mutation on failure.
        assert_eq!(asset.current_price(), 50_000.0);
        assert_eq!(asset.history().len(), 1);
    }

    #[test]
    fn update_price_with_volume() {
        let mut asset = sample_asset();
        asset.update_price_with_volume(51_000.0, 1_234.5).unwrap();
        assert_eq!(asset.current_price(), 51_000.0);
        assert_eq!(asset.traded_volume, 1_234.5);
    }

    #[test]
    fn market_cap_requires_supply() {
        let mut asset = sample_asset();
        assert!(asset.market_cap().is_none());

        asset.circulating_supply = 1_000.0;
        assert_relative_eq!(asset.market_cap().unwrap(), 50_000_000.0);
    }

    #[test]
    fn dominance() {
        let mut asset = sample_asset();
        asset.circulating_supply = 1_000.0;

        assert!(asset.dominance(0.0).is_none());
        assert_relative_eq!(asset.dominance(100_000_000.0).unwrap(), 50.0);
    }
}
