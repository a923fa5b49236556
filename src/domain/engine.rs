//! Scheduler-pass engine.
//!
//! The external driver owns the cadence; this module owns what one cycle
//! does: apply a price tick (raising volatility alerts for affected holders
//! and rule owners), then walk every active rule against a single consistent
//! ledger view. A rule later in the pass observes mutations made by rules
//! before it.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::alert::Alert;
use crate::domain::error::MoneybinError;
use crate::domain::market::{MarketState, PriceTick};
use crate::domain::registry::{AssetRegistry, WalletRegistry};
use crate::domain::strategy::StrategyRule;
use crate::ports::notification_port::NotificationPort;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Active rules inspected.
    pub evaluated: usize,
    /// Rules whose condition held.
    pub triggered: usize,
    /// Rules whose trade went through.
    pub executed: usize,
    /// Triggered rules bound to a wallet the registry does not know.
    pub skipped: usize,
}

/// Apply one feed tick: update the market and the asset entities, then emit a
/// volatility alert to every interested user per sharp-moving asset. Returns
/// the number of alerts emitted.
pub fn apply_tick(
    market: &mut MarketState,
    assets: &mut AssetRegistry,
    tick: &PriceTick,
    volatility_threshold: f64,
    wallets: &WalletRegistry,
    rules: &[StrategyRule],
    notifier: &mut dyn NotificationPort,
) -> Result<usize, MoneybinError> {
    market.update_prices_at(&tick.prices, tick.timestamp)?;
    for (code, price) in &tick.prices {
        assets.observe_price(code, *price, tick.timestamp)?;
    }

    // BTreeMap keeps the fan-out order deterministic.
    let moves: BTreeMap<String, f64> = market
        .detect_sharp_moves(volatility_threshold)
        .into_iter()
        .collect();

    let mut emitted = 0;
    for (code, variation) in &moves {
        for user_id in interested_users(code, wallets, rules) {
            notifier.deliver(Alert::volatility(user_id, code, *variation));
            emitted += 1;
        }
    }
    Ok(emitted)
}

/// Users holding the asset in some wallet, plus owners of an active rule
/// bound to it. Sorted by the set's ordering so alert fan-out is
/// deterministic.
fn interested_users(asset: &str, wallets: &WalletRegistry, rules: &[StrategyRule]) -> BTreeSet<u32> {
    let mut users = BTreeSet::new();
    for wallet in wallets.iter() {
        if wallet.has_position(asset) {
            users.insert(wallet.user_id);
        }
    }
    for rule in rules {
        if rule.is_active() && rule.asset == asset {
            users.insert(rule.user_id);
        }
    }
    users
}

/// Evaluate every rule once and execute the ones that trigger.
pub fn run_pass(
    rules: &mut [StrategyRule],
    wallets: &mut WalletRegistry,
    market: &MarketState,
    notifier: &mut dyn NotificationPort,
) -> PassSummary {
    let mut summary = PassSummary::default();

    for rule in rules.iter_mut() {
        if !rule.is_active() {
            continue;
        }
        summary.evaluated += 1;
        if !rule.evaluate(market) {
            continue;
        }
        summary.triggered += 1;

        let Some(wallet) = wallets.get_mut(rule.wallet_id) else {
            summary.skipped += 1;
            continue;
        };
        if rule.execute(wallet, market, notifier) {
            summary.executed += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alert::AlertKind;
    use crate::domain::strategy::{Condition, TradeAction};
    use crate::domain::wallet::Wallet;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashMap;

    struct RecordingNotifier {
        alerts: Vec<Alert>,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            RecordingNotifier { alerts: Vec::new() }
        }
    }

    impl NotificationPort for RecordingNotifier {
        fn deliver(&mut self, alert: Alert) {
            self.alerts.push(alert);
        }
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn tick(day: u32, pairs: &[(&str, f64)]) -> PriceTick {
        PriceTick {
            timestamp: at(day),
            prices: pairs
                .iter()
                .map(|(code, price)| (code.to_string(), *price))
                .collect(),
        }
    }

    fn funded_wallet(id: u32, user_id: u32, balance: f64) -> Wallet {
        let mut wallet = Wallet::new(id, user_id);
        wallet.deposit(balance).unwrap();
        wallet
    }

    fn market_at(pairs: &[(&str, f64)]) -> MarketState {
        let mut market = MarketState::new();
        let prices: HashMap<String, f64> = pairs
            .iter()
            .map(|(code, price)| (code.to_string(), *price))
            .collect();
        market.update_prices_at(&prices, at(1)).unwrap();
        market
    }

    #[test]
    fn apply_tick_updates_market_and_assets() {
        let mut market = MarketState::new();
        let mut assets = AssetRegistry::new();
        let wallets = WalletRegistry::new();
        let mut notifier = RecordingNotifier::new();

        let emitted = apply_tick(
            &mut market,
            &mut assets,
            &tick(1, &[("BTC", 100.0), ("ETH", 10.0)]),
            10.0,
            &wallets,
            &[],
            &mut notifier,
        )
        .unwrap();

        assert_eq!(emitted, 0);
        assert_eq!(market.current_price("BTC").unwrap(), 100.0);
        assert_eq!(assets.len(), 2);
        assert_eq!(assets.get("ETH").unwrap().current_price(), 10.0);
    }

    #[test]
    fn apply_tick_alerts_holders_and_rule_owners_on_sharp_moves() {
        let mut market = MarketState::new();
        let mut assets = AssetRegistry::new();
        let mut notifier = RecordingNotifier::new();

        let mut wallets = WalletRegistry::new();
        let mut holder = funded_wallet(1, 7, 1000.0);
        holder.buy("BTC", 1.0, 100.0).unwrap();
        wallets.insert(holder);
        // User 8 has no BTC position, only an active rule on it.
        let rules = vec![StrategyRule::new(
            1,
            8,
            "BTC",
            2,
            Condition::PriceBelow(50.0),
            TradeAction::Buy,
            1.0,
        )];

        apply_tick(
            &mut market,
            &mut assets,
            &tick(1, &[("BTC", 100.0)]),
            10.0,
            &wallets,
            &rules,
            &mut notifier,
        )
        .unwrap();
        apply_tick(
            &mut market,
            &mut assets,
            &tick(2, &[("BTC", 100.0)]),
            10.0,
            &wallets,
            &rules,
            &mut notifier,
        )
        .unwrap();
        // 24h later BTC is down 20%.
        let emitted = apply_tick(
            &mut market,
            &mut assets,
            &tick(3, &[("BTC", 80.0)]),
            10.0,
            &wallets,
            &rules,
            &mut notifier,
        )
        .unwrap();

        assert_eq!(emitted, 2);
        let users: Vec<u32> = notifier.alerts.iter().map(|a| a.user_id).collect();
        assert_eq!(users, vec![7, 8]);
        assert!(notifier
            .alerts
            .iter()
            .all(|a| matches!(a.kind, AlertKind::Volatility { .. })));
    }

    #[test]
    fn apply_tick_rejects_bad_batch() {
        let mut market = MarketState::new();
        let mut assets = AssetRegistry::new();
        let wallets = WalletRegistry::new();
        let mut notifier = RecordingNotifier::new();

        let bad = PriceTick {
            timestamp: at(1),
            prices: HashMap::new(),
        };
        let result = apply_tick(
            &mut market,
            &mut assets,
            &bad,
            10.0,
            &wallets,
            &[],
            &mut notifier,
        );
        assert!(matches!(result, Err(MoneybinError::InvalidInput { .. })));
    }

    #[test]
    fn run_pass_executes_triggered_rules() {
        let market = market_at(&[("BTC", 105.0)]);
        let mut wallets = WalletRegistry::new();
        let mut holder = funded_wallet(1, 7, 1000.0);
        holder.buy("BTC", 2.0, 100.0).unwrap();
        wallets.insert(holder);
        let mut notifier = RecordingNotifier::new();

        let mut rules = vec![
            StrategyRule::new(
                1,
                7,
                "BTC",
                1,
                Condition::PriceAbove(100.0),
                TradeAction::Sell,
                1.0,
            ),
            StrategyRule::new(
                2,
                7,
                "BTC",
                1,
                Condition::PriceBelow(50.0),
                TradeAction::Buy,
                1.0,
            ),
        ];

        let summary = run_pass(&mut rules, &mut wallets, &market, &mut notifier);

        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.triggered, 1);
        assert_eq!(summary.executed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(wallets.get(1).unwrap().position("BTC"), 1.0);
        assert_eq!(notifier.alerts.len(), 1);
    }

    #[test]
    fn run_pass_skips_inactive_rules() {
        let market = market_at(&[("BTC", 105.0)]);
        let mut wallets = WalletRegistry::new();
        wallets.insert(funded_wallet(1, 7, 1000.0));
        let mut notifier = RecordingNotifier::new();

        let mut rules = vec![StrategyRule::new(
            1,
            7,
            "BTC",
            1,
            Condition::PriceAbove(100.0),
            TradeAction::Buy,
            1.0,
        )];
        rules[0].set_active(false);

        let summary = run_pass(&mut rules, &mut wallets, &market, &mut notifier);
        assert_eq!(summary, PassSummary::default());
    }

    #[test]
    fn run_pass_counts_missing_wallet_as_skipped() {
        let market = market_at(&[("BTC", 105.0)]);
        let mut wallets = WalletRegistry::new();
        let mut notifier = RecordingNotifier::new();

        let mut rules = vec![StrategyRule::new(
            1,
            7,
            "BTC",
            42,
            Condition::PriceAbove(100.0),
            TradeAction::Buy,
            1.0,
        )];

        let summary = run_pass(&mut rules, &mut wallets, &market, &mut notifier);
        assert_eq!(summary.triggered, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.executed, 0);
    }

    #[test]
    fn later_rule_observes_earlier_mutation_in_same_pass() {
        // Wallet can afford exactly one of the two buys.
        let market = market_at(&[("BTC", 100.0)]);
        let mut wallets = WalletRegistry::new();
        wallets.insert(funded_wallet(1, 7, 150.0));
        let mut notifier = RecordingNotifier::new();

        let mut rules = vec![
            StrategyRule::new(
                1,
                7,
                "BTC",
                1,
                Condition::PriceAbove(50.0),
                TradeAction::Buy,
                1.0,
            ),
            StrategyRule::new(
                2,
                7,
                "BTC",
                1,
                Condition::PriceAbove(50.0),
                TradeAction::Buy,
                1.0,
            ),
        ];

        let summary = run_pass(&mut rules, &mut wallets, &market, &mut notifier);

        assert_eq!(summary.triggered, 2);
        // The second buy saw the drained balance and failed.
        assert_eq!(summary.executed, 1);
        assert_eq!(wallets.get(1).unwrap().balance(), 50.0);
        assert_eq!(wallets.get(1).unwrap().position("BTC"), 1.0);
    }
}
