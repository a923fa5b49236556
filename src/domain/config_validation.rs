//! Configuration validation and typed builders.
//!
//! Turns the raw INI sections into exchange settings, wallets, and strategy
//! rules, rejecting anything malformed before the engine ever runs.

use crate::domain::error::MoneybinError;
use crate::domain::strategy::{Condition, StrategyRule, TradeAction};
use crate::domain::wallet::Wallet;
use crate::ports::config_port::ConfigPort;
use std::collections::HashSet;

pub const DEFAULT_VOLATILITY_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeConfig {
    pub volatility_threshold: f64,
    /// Market snapshots kept; 0 means unbounded.
    pub history_limit: usize,
}

pub fn build_exchange_config(config: &dyn ConfigPort) -> Result<ExchangeConfig, MoneybinError> {
    let volatility_threshold = config.get_double(
        "exchange",
        "volatility_threshold",
        DEFAULT_VOLATILITY_THRESHOLD,
    );
    if volatility_threshold < 0.0 {
        return Err(MoneybinError::ConfigInvalid {
            section: "exchange".to_string(),
            key: "volatility_threshold".to_string(),
            reason: "volatility_threshold must be non-negative".to_string(),
        });
    }

    let history_limit = config.get_int("exchange", "history_limit", 0);
    if history_limit < 0 {
        return Err(MoneybinError::ConfigInvalid {
            section: "exchange".to_string(),
            key: "history_limit".to_string(),
            reason: "history_limit must be non-negative".to_string(),
        });
    }

    Ok(ExchangeConfig {
        volatility_threshold,
        history_limit: history_limit as usize,
    })
}

/// Asset display names from `[assets]`: a `codes` list plus optional
/// `name.<code>` keys. The whole section is optional; the feed may introduce
/// assets on its own.
pub fn build_asset_names(
    config: &dyn ConfigPort,
) -> Result<Vec<(String, String)>, MoneybinError> {
    let Some(codes_value) = config.get_string("assets", "codes") else {
        return Ok(Vec::new());
    };

    let mut names = Vec::new();
    let mut seen = HashSet::new();
    for token in codes_value.split(',') {
        let code = token.trim().to_uppercase();
        if code.is_empty() {
            return Err(MoneybinError::ConfigInvalid {
                section: "assets".to_string(),
                key: "codes".to_string(),
                reason: "empty token in code list".to_string(),
            });
        }
        if !seen.insert(code.clone()) {
            return Err(MoneybinError::ConfigInvalid {
                section: "assets".to_string(),
                key: "codes".to_string(),
                reason: format!("duplicate code: {}", code),
            });
        }
        let name = config
            .get_string("assets", &format!("name.{}", code))
            .unwrap_or_else(|| code.clone());
        names.push((code, name));
    }
    Ok(names)
}

/// Wallets from `[wallet.<id>]` sections, sorted by id.
pub fn build_wallets(config: &dyn ConfigPort) -> Result<Vec<Wallet>, MoneybinError> {
    let mut wallets = Vec::new();

    for section in sections_with_prefix(config, "wallet.") {
        let id = parse_section_id(&section, "wallet.")?;
        let user_id = require_u32(config, &section, "user")?;

        let balance = config.get_double(&section, "balance", 0.0);
        if balance < 0.0 {
            return Err(MoneybinError::ConfigInvalid {
                section: section.clone(),
                key: "balance".to_string(),
                reason: "balance must be non-negative".to_string(),
            });
        }

        let mut wallet = Wallet::new(id, user_id);
        if balance > 0.0 {
            wallet.deposit(balance)?;
        }
        wallets.push(wallet);
    }

    wallets.sort_by_key(|w| w.id);
    Ok(wallets)
}

/// Strategy rules from `[rule.<id>]` sections, sorted by id.
pub fn build_rules(config: &dyn ConfigPort) -> Result<Vec<StrategyRule>, MoneybinError> {
    let mut rules = Vec::new();

    for section in sections_with_prefix(config, "rule.") {
        let id = parse_section_id(&section, "rule.")?;
        let user_id = require_u32(config, &section, "user")?;
        let wallet_id = require_u32(config, &section, "wallet")?;

        let asset = match config.get_string(&section, "asset") {
            Some(s) if !s.trim().is_empty() => s.trim().to_uppercase(),
            _ => {
                return Err(MoneybinError::ConfigMissing {
                    section: section.clone(),
                    key: "asset".to_string(),
                })
            }
        };

        let reference = require_f64(config, &section, "reference")?;
        let condition = parse_condition(&section, config, reference)?;
        let action = parse_action(&section, config)?;

        let quantity = require_f64(config, &section, "quantity")?;
        if quantity <= 0.0 {
            return Err(MoneybinError::ConfigInvalid {
                section: section.clone(),
                key: "quantity".to_string(),
                reason: "quantity must be positive".to_string(),
            });
        }

        let mut rule = StrategyRule::new(id, user_id, &asset, wallet_id, condition, action, quantity);
        if !config.get_bool(&section, "active", true) {
            rule.set_active(false);
        }
        rules.push(rule);
    }

    rules.sort_by_key(|r| r.id);
    Ok(rules)
}

fn sections_with_prefix(config: &dyn ConfigPort, prefix: &str) -> Vec<String> {
    let mut sections: Vec<String> = config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with(prefix))
        .collect();
    sections.sort();
    sections
}

fn parse_section_id(section: &str, prefix: &str) -> Result<u32, MoneybinError> {
    section[prefix.len()..]
        .parse()
        .map_err(|_| MoneybinError::ConfigInvalid {
            section: section.to_string(),
            key: "id".to_string(),
            reason: format!("section suffix is not a numeric id: {}", section),
        })
}

fn require_u32(config: &dyn ConfigPort, section: &str, key: &str) -> Result<u32, MoneybinError> {
    match config.get_string(section, key) {
        None => Err(MoneybinError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        Some(s) => s.trim().parse().map_err(|_| MoneybinError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("expected a non-negative integer, got {}", s),
        }),
    }
}

fn require_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<f64, MoneybinError> {
    match config.get_string(section, key) {
        None => Err(MoneybinError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        Some(s) => s.trim().parse().map_err(|_| MoneybinError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("expected a number, got {}", s),
        }),
    }
}

fn parse_condition(
    section: &str,
    config: &dyn ConfigPort,
    reference: f64,
) -> Result<Condition, MoneybinError> {
    let value = config
        .get_string(section, "condition")
        .ok_or_else(|| MoneybinError::ConfigMissing {
            section: section.to_string(),
            key: "condition".to_string(),
        })?;

    match value.trim().to_lowercase().as_str() {
        "price_above" => Ok(Condition::PriceAbove(reference)),
        "price_below" => Ok(Condition::PriceBelow(reference)),
        "variation_above" => Ok(Condition::VariationAbove(reference)),
        "variation_below" => Ok(Condition::VariationBelow(reference)),
        other => Err(MoneybinError::ConfigInvalid {
            section: section.to_string(),
            key: "condition".to_string(),
            reason: format!("unknown condition kind: {}", other),
        }),
    }
}

fn parse_action(section: &str, config: &dyn ConfigPort) -> Result<TradeAction, MoneybinError> {
    let value = config
        .get_string(section, "action")
        .ok_or_else(|| MoneybinError::ConfigMissing {
            section: section.to_string(),
            key: "action".to_string(),
        })?;

    match value.trim().to_lowercase().as_str() {
        "buy" => Ok(TradeAction::Buy),
        "sell" => Ok(TradeAction::Sell),
        other => Err(MoneybinError::ConfigInvalid {
            section: section.to_string(),
            key: "action".to_string(),
            reason: format!("unknown action: {}", other),
        }),
    }
}
