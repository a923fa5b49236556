//! Paper-trading simulator.
//!
//! Mirrors the wallet's trading rules against a virtual balance. Simulated
//! trades never touch a real wallet and never enter a transaction log; the
//! simulator keeps its own history.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;

use crate::domain::error::MoneybinError;
use crate::domain::market::MarketState;
use crate::domain::strategy::TradeAction;

const QUANTITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SimulatedTrade {
    pub kind: TradeAction,
    pub asset: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Simulator {
    pub id: u32,
    pub user_id: u32,
    starting_balance: f64,
    virtual_balance: f64,
    positions: HashMap<String, f64>,
    history: Vec<SimulatedTrade>,
    pub started_at: DateTime<Utc>,
    active: bool,
}

impl Simulator {
    pub fn new(id: u32, user_id: u32, starting_balance: f64) -> Result<Self, MoneybinError> {
        if starting_balance <= 0.0 {
            return Err(MoneybinError::InvalidAmount {
                amount: starting_balance,
            });
        }
        Ok(Simulator {
            id,
            user_id,
            starting_balance,
            virtual_balance: starting_balance,
            positions: HashMap::new(),
            history: Vec::new(),
            started_at: Utc::now(),
            active: true,
        })
    }

    pub fn virtual_balance(&self) -> f64 {
        self.virtual_balance
    }

    pub fn position(&self, asset: &str) -> f64 {
        self.positions.get(asset).copied().unwrap_or(0.0)
    }

    pub fn history(&self) -> &[SimulatedTrade] {
        &self.history
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn simulate_buy(
        &mut self,
        asset: &str,
        quantity: f64,
        unit_price: f64,
    ) -> Result<(), MoneybinError> {
        self.check_trade_inputs(quantity, unit_price)?;
        let cost = quantity * unit_price;
        if cost > self.virtual_balance {
            return Err(MoneybinError::InsufficientFunds {
                required: cost,
                available: self.virtual_balance,
            });
        }

        self.virtual_balance -= cost;
        *self.positions.entry(asset.to_string()).or_insert(0.0) += quantity;
        self.record(TradeAction::Buy, asset, quantity, unit_price);
        Ok(())
    }

    pub fn simulate_sell(
        &mut self,
        asset: &str,
        quantity: f64,
        unit_price: f64,
    ) -> Result<(), MoneybinError> {
        self.check_trade_inputs(quantity, unit_price)?;
        let held = self.position(asset);
        if held < quantity {
            return Err(MoneybinError::InsufficientPosition {
                asset: asset.to_string(),
                requested: quantity,
                held,
            });
        }

        let remaining = held - quantity;
        if remaining <= QUANTITY_EPSILON {
            self.positions.remove(asset);
        } else {
            self.positions.insert(asset.to_string(), remaining);
        }
        self.virtual_balance += quantity * unit_price;
        self.record(TradeAction::Sell, asset, quantity, unit_price);
        Ok(())
    }

    pub fn total_value(&self, market: &MarketState) -> f64 {
        let position_value: f64 = self
            .positions
            .iter()
            .filter_map(|(asset, qty)| market.current_price(asset).ok().map(|price| qty * price))
            .sum();
        self.virtual_balance + position_value
    }

    /// Percent return against the starting balance, at current prices.
    pub fn performance(&self, market: &MarketState) -> f64 {
        (self.total_value(market) - self.starting_balance) / self.starting_balance * 100.0
    }

    fn check_trade_inputs(&self, quantity: f64, unit_price: f64) -> Result<(), MoneybinError> {
        if !self.active {
            return Err(MoneybinError::InvalidInput {
                reason: format!("simulator {} is not active", self.id),
            });
        }
        if quantity <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: quantity });
        }
        if unit_price <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: unit_price });
        }
        Ok(())
    }

    fn record(&mut self, kind: TradeAction, asset: &str, quantity: f64, unit_price: f64) {
        self.history.push(SimulatedTrade {
            kind,
            asset: asset.to_string(),
            quantity,
            unit_price,
            total: quantity * unit_price,
            timestamp: Utc::now(),
        });
    }
}

/// Random-walk price path: each step moves the price by a uniform factor in
/// `[-volatility, +volatility]`. Returns `steps + 1` prices, the initial one
/// included.
pub fn simulate_price_path<R: Rng>(
    initial_price: f64,
    volatility: f64,
    steps: usize,
    rng: &mut R,
) -> Result<Vec<f64>, MoneybinError> {
    if initial_price <= 0.0 {
        return Err(MoneybinError::InvalidAmount {
            amount: initial_price,
        });
    }
    if !(0.0..=1.0).contains(&volatility) {
        return Err(MoneybinError::InvalidInput {
            reason: format!("volatility {} outside [0, 1]", volatility),
        });
    }

    let mut prices = Vec::with_capacity(steps + 1);
    let mut price = initial_price;
    prices.push(price);
    for _ in 0..steps {
        let step = if volatility == 0.0 {
            0.0
        } else {
            rng.gen_range(-volatility..=volatility)
        };
        price *= 1.0 + step;
        prices.push(price);
    }
    Ok(prices)
}
