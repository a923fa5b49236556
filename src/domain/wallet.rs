//! Wallet ledger: cash balance, per-asset positions, transaction log.
//!
//! Invariants enforced here:
//! - balance never goes negative;
//! - every present position has a strictly positive quantity (an entry that
//!   reaches zero is removed, never retained);
//! - every successful buy/sell appends exactly one transaction, a transfer
//!   appends one on each side;
//! - all operations are atomic: on error, nothing changed.

use std::collections::HashMap;

use crate::domain::error::MoneybinError;
use crate::domain::market::MarketState;
use crate::domain::transaction::{Transaction, TransactionKind};

/// Residue below this is treated as an emptied position.
const QUANTITY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct Wallet {
    pub id: u32,
    pub user_id: u32,
    balance: f64,
    positions: HashMap<String, f64>,
    transactions: Vec<Transaction>,
    next_transaction_id: u64,
}

impl Wallet {
    pub fn new(id: u32, user_id: u32) -> Self {
        Wallet {
            id,
            user_id,
            balance: 0.0,
            positions: HashMap::new(),
            transactions: Vec::new(),
            next_transaction_id: 1,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Quantity held of one asset; zero when absent.
    pub fn position(&self, asset: &str) -> f64 {
        self.positions.get(asset).copied().unwrap_or(0.0)
    }

    pub fn has_position(&self, asset: &str) -> bool {
        self.positions.contains_key(asset)
    }

    pub fn positions(&self) -> &HashMap<String, f64> {
        &self.positions
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Add cash. Deposits do not create transaction entries; the log records
    /// asset movements only.
    pub fn deposit(&mut self, amount: f64) -> Result<f64, MoneybinError> {
        if amount <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount });
        }
        self.balance += amount;
        Ok(self.balance)
    }

    pub fn withdraw(&mut self, amount: f64) -> Result<f64, MoneybinError> {
        if amount <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount });
        }
        if amount > self.balance {
            return Err(MoneybinError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }

    pub fn buy(
        &mut self,
        asset: &str,
        quantity: f64,
        unit_price: f64,
    ) -> Result<&Transaction, MoneybinError> {
        if quantity <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: quantity });
        }
        if unit_price <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: unit_price });
        }
        let cost = quantity * unit_price;
        if cost > self.balance {
            return Err(MoneybinError::InsufficientFunds {
                required: cost,
                available: self.balance,
            });
        }

        self.balance -= cost;
        *self.positions.entry(asset.to_string()).or_insert(0.0) += quantity;
        Ok(self.append_transaction(asset, TransactionKind::Buy, quantity, unit_price))
    }

    pub fn sell(
        &mut self,
        asset: &str,
        quantity: f64,
        unit_price: f64,
    ) -> Result<&Transaction, MoneybinError> {
        if quantity <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: quantity });
        }
        if unit_price <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: unit_price });
        }
        self.remove_from_position(asset, quantity)?;
        self.balance += quantity * unit_price;
        Ok(self.append_transaction(asset, TransactionKind::Sell, quantity, unit_price))
    }

    /// Move an asset quantity to another wallet. Transfers move custody, not
    /// money, so both sides are recorded with a zero unit price.
    pub fn transfer(
        &mut self,
        asset: &str,
        quantity: f64,
        destination: &mut Wallet,
    ) -> Result<(), MoneybinError> {
        if quantity <= 0.0 {
            return Err(MoneybinError::InvalidAmount { amount: quantity });
        }
        self.remove_from_position(asset, quantity)?;
        *destination.positions.entry(asset.to_string()).or_insert(0.0) += quantity;

        self.append_transaction(asset, TransactionKind::TransferOut, quantity, 0.0);
        destination.append_transaction(asset, TransactionKind::TransferIn, quantity, 0.0);
        Ok(())
    }

    /// Balance plus the market value of every position. A held asset the
    /// market cannot price contributes nothing; reporting stays tolerant.
    pub fn total_value(&self, market: &MarketState) -> f64 {
        let position_value: f64 = self
            .positions
            .iter()
            .filter_map(|(asset, qty)| market.current_price(asset).ok().map(|price| qty * price))
            .sum();
        self.balance + position_value
    }

    pub fn confirm_transaction(&mut self, id: u64) -> bool {
        match self.transactions.iter_mut().find(|tx| tx.id == id) {
            Some(tx) => tx.confirm(),
            None => false,
        }
    }

    pub fn cancel_transaction(&mut self, id: u64) -> bool {
        match self.transactions.iter_mut().find(|tx| tx.id == id) {
            Some(tx) => tx.cancel(),
            None => false,
        }
    }

    fn remove_from_position(&mut self, asset: &str, quantity: f64) -> Result<(), MoneybinError> {
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
        Ok(())
    }

    fn append_transaction(
        &mut self,
        asset: &str,
        kind: TransactionKind,
        quantity: f64,
        unit_price: f64,
    ) -> &Transaction {
        let id = self.next_transaction_id;
        self.next_transaction_id += 1;
        self.transactions.push(Transaction::new(
            id,
            self.user_id,
            asset,
            kind,
            quantity,
            unit_price,
        ));
        match self.transactions.last() {
            Some(tx) => tx,
            None => unreachable!(),
        }
    }
}
