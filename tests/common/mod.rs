#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

use moneybin::domain::alert::Alert;
use moneybin::domain::error::MoneybinError;
use moneybin::domain::market::{MarketState, PriceTick};
use moneybin::domain::wallet::Wallet;
use moneybin::ports::feed_port::FeedPort;
use moneybin::ports::notification_port::NotificationPort;

/// Collects delivered alerts for assertions.
pub struct RecordingNotifier {
    pub alerts: Vec<Alert>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier { alerts: Vec::new() }
    }
}

impl NotificationPort for RecordingNotifier {
    fn deliver(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }
}

/// In-memory feed with canned ticks.
pub struct MockFeed {
    pub ticks: Vec<PriceTick>,
}

impl MockFeed {
    pub fn new(ticks: Vec<PriceTick>) -> Self {
        MockFeed { ticks }
    }
}

impl FeedPort for MockFeed {
    fn load_ticks(&self) -> Result<Vec<PriceTick>, MoneybinError> {
        Ok(self.ticks.clone())
    }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs
        .iter()
        .map(|(code, price)| (code.to_string(), *price))
        .collect()
}

pub fn tick(day: u32, pairs: &[(&str, f64)]) -> PriceTick {
    PriceTick {
        timestamp: at(day, 12),
        prices: prices(pairs),
    }
}

pub fn funded_wallet(id: u32, user_id: u32, balance: f64) -> Wallet {
    let mut wallet = Wallet::new(id, user_id);
    wallet.deposit(balance).unwrap();
    wallet
}

/// Market priced once at day 1, noon.
pub fn market_at(pairs: &[(&str, f64)]) -> MarketState {
    let mut market = MarketState::new();
    market.update_prices_at(&prices(pairs), at(1, 12)).unwrap();
    market
}
