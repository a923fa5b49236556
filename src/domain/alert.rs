//! User-facing alert events.
//!
//! One flat shape for every alert; what used to vary by subtype lives in the
//! [`AlertKind`] payload. Priority derives from the kind.

use chrono::{DateTime, Utc};

use crate::domain::strategy::TradeAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AlertPriority {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AlertPriority::Low => "low",
            AlertPriority::Medium => "medium",
            AlertPriority::High => "high",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertKind {
    Volatility {
        asset: String,
        variation_pct: f64,
    },
    StrategyExecution {
        asset: String,
        action: TradeAction,
        quantity: f64,
    },
    Security {
        source_ip: Option<String>,
    },
    Informative,
}

impl AlertKind {
    pub fn priority(&self) -> AlertPriority {
        match self {
            AlertKind::Volatility { .. } | AlertKind::Security { .. } => AlertPriority::High,
            AlertKind::StrategyExecution { .. } => AlertPriority::Medium,
            AlertKind::Informative => AlertPriority::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Zero until the delivery collaborator assigns an identity.
    pub id: u64,
    pub user_id: u32,
    pub title: String,
    pub body: String,
    pub priority: AlertPriority,
    pub kind: AlertKind,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    fn new(user_id: u32, title: String, body: String, kind: AlertKind) -> Self {
        Alert {
            id: 0,
            user_id,
            priority: kind.priority(),
            title,
            body,
            kind,
            created_at: Utc::now(),
        }
    }

    pub fn volatility(user_id: u32, asset: &str, variation_pct: f64) -> Self {
        Alert::new(
            user_id,
            format!("Sharp move on {asset}"),
            format!("{asset} moved {variation_pct:.2}% over the last 24h."),
            AlertKind::Volatility {
                asset: asset.to_string(),
                variation_pct,
            },
        )
    }

    pub fn strategy_execution(user_id: u32, asset: &str, action: TradeAction, quantity: f64) -> Self {
        Alert::new(
            user_id,
            "Automated strategy executed".to_string(),
            format!("An automated strategy placed a {action} of {quantity} {asset}."),
            AlertKind::StrategyExecution {
                asset: asset.to_string(),
                action,
                quantity,
            },
        )
    }

    pub fn security(user_id: u32, body: &str, source_ip: Option<String>) -> Self {
        Alert::new(
            user_id,
            "Security notice".to_string(),
            body.to_string(),
            AlertKind::Security { source_ip },
        )
    }

    pub fn informative(user_id: u32, title: &str, body: &str) -> Self {
        Alert::new(
            user_id,
            title.to_string(),
            body.to_string(),
            AlertKind::Informative,
        )
    }
}
