//! Automated strategy rules: a market condition plus a trade action, bound to
//! one asset and one wallet.
//!
//! # Evaluation semantics
//!
//! - An inactive rule never evaluates true and never executes.
//! - An asset without a current price cannot be evaluated; the rule stays
//!   quiet until the feed supplies one.
//! - Variation conditions always look at the trailing 24 hours.
//! - Execution against a wallet other than the bound one is a silent no-op,
//!   not an error; the driver may pair rules and wallets freely.

use chrono::{DateTime, Utc};

use crate::domain::alert::Alert;
use crate::domain::market::MarketState;
use crate::domain::wallet::Wallet;
use crate::ports::notification_port::NotificationPort;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    PriceAbove(f64),
    PriceBelow(f64),
    VariationAbove(f64),
    VariationBelow(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone)]
pub struct StrategyRule {
    pub id: u32,
    pub user_id: u32,
    pub asset: String,
    pub wallet_id: u32,
    pub condition: Condition,
    pub action: TradeAction,
    pub quantity: f64,
    active: bool,
    pub created_at: DateTime<Utc>,
    last_executed: Option<DateTime<Utc>>,
}

impl StrategyRule {
    pub fn new(
        id: u32,
        user_id: u32,
        asset: &str,
        wallet_id: u32,
        condition: Condition,
        action: TradeAction,
        quantity: f64,
    ) -> Self {
        StrategyRule {
            id,
            user_id,
            asset: asset.to_string(),
            wallet_id,
            condition,
            action,
            quantity,
            active: true,
            created_at: Utc::now(),
            last_executed: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn last_executed(&self) -> Option<DateTime<Utc>> {
        self.last_executed
    }

    /// Whether the rule's condition currently holds.
    pub fn evaluate(&self, market: &MarketState) -> bool {
        if !self.active {
            return false;
        }
        let Ok(price) = market.current_price(&self.asset) else {
            return false;
        };
        match self.condition {
            Condition::PriceAbove(reference) => price >= reference,
            Condition::PriceBelow(reference) => price <= reference,
            Condition::VariationAbove(reference) => market.variation(&self.asset, 24) >= reference,
            Condition::VariationBelow(reference) => market.variation(&self.asset, 24) <= reference,
        }
    }

    /// Place the rule's trade against its bound wallet at the live price.
    ///
    /// Returns `false` without touching anything when the rule is inactive,
    /// the wallet is not the bound one, the asset has no price, or the trade
    /// itself fails (insufficient funds or position). A failed cycle is simply
    /// retried by the driver on its next pass.
    pub fn execute(
        &mut self,
        wallet: &mut Wallet,
        market: &MarketState,
        notifier: &mut dyn NotificationPort,
    ) -> bool {
        if !self.active || wallet.id != self.wallet_id {
            return false;
        }
        let Ok(price) = market.current_price(&self.asset) else {
            return false;
        };

        let traded = match self.action {
            TradeAction::Buy => wallet.buy(&self.asset, self.quantity, price).is_ok(),
            TradeAction::Sell => wallet.sell(&self.asset, self.quantity, price).is_ok(),
        };
        if traded {
            self.last_executed = Some(Utc::now());
            notifier.deliver(Alert::strategy_execution(
                self.user_id,
                &self.asset,
                self.action,
                self.quantity,
            ));
        }
        traded
    }
}
