//! Ledger transaction records.
//!
//! A transaction is immutable once created except for its status, which moves
//! one way: `Pending` to either `Concluded` or `Cancelled`.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    Buy,
    Sell,
    TransferIn,
    TransferOut,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TransactionKind::Buy => "buy",
            TransactionKind::Sell => "sell",
            TransactionKind::TransferIn => "transfer-in",
            TransactionKind::TransferOut => "transfer-out",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Concluded,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: u64,
    pub user_id: u32,
    pub asset: String,
    pub kind: TransactionKind,
    pub quantity: f64,
    pub unit_price: f64,
    /// Quantity times unit price, fixed at creation time.
    pub total: f64,
    pub timestamp: DateTime<Utc>,
    status: TransactionStatus,
}

impl Transaction {
    pub fn new(
        id: u64,
        user_id: u32,
        asset: &str,
        kind: TransactionKind,
        quantity: f64,
        unit_price: f64,
    ) -> Self {
        Transaction {
            id,
            user_id,
            asset: asset.to_string(),
            kind,
            quantity,
            unit_price,
            total: quantity * unit_price,
            timestamp: Utc::now(),
            status: TransactionStatus::Pending,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn is_settled(&self) -> bool {
        self.status != TransactionStatus::Pending
    }

    /// Settle as concluded. Returns `false` when the entry is already settled;
    /// settled entries never change again.
    pub fn confirm(&mut self) -> bool {
        if self.status != TransactionStatus::Pending {
            return false;
        }
        self.status = TransactionStatus::Concluded;
        true
    }

    /// Settle as cancelled. Same one-way rule as [`Transaction::confirm`].
    pub fn cancel(&mut self) -> bool {
        if self.status != TransactionStatus::Pending {
            return false;
        }
        self.status = TransactionStatus::Cancelled;
        true
    }
}
