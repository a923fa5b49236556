//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::console_notifier::ConsoleNotifier;
use crate::adapters::csv_feed_adapter::CsvFeedAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    build_asset_names, build_exchange_config, build_rules, build_wallets, ExchangeConfig,
};
use crate::domain::engine::{apply_tick, run_pass, PassSummary};
use crate::domain::error::MoneybinError;
use crate::domain::market::MarketState;
use crate::domain::registry::{AssetRegistry, WalletRegistry};
use crate::domain::strategy::StrategyRule;
use crate::ports::feed_port::FeedPort;

#[derive(Parser, Debug)]
#[command(
    name = "moneybin",
    about = "Toy cryptoasset exchange ledger and strategy engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a price feed through the strategy engine
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        feed: PathBuf,
        /// Override the configured volatility alert threshold (percent)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Validate an exchange configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show a summary of a price feed file
    Info {
        #[arg(short, long)]
        feed: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            feed,
            threshold,
        } => run_replay(&config, &feed, threshold),
        Command::Validate { config } => run_validate(&config),
        Command::Info { feed } => run_info(&feed),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = MoneybinError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_replay(config_path: &PathBuf, feed_path: &PathBuf, threshold: Option<f64>) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Build exchange state from config
    let ExchangeState {
        config: exchange,
        mut market,
        mut assets,
        mut wallets,
        mut rules,
    } = match build_exchange_state(&adapter) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    let threshold = threshold.unwrap_or(exchange.volatility_threshold);
    eprintln!(
        "  {} wallets, {} rules, volatility threshold {}%",
        wallets.len(),
        rules.len(),
        threshold
    );

    // Stage 3: Load the price feed
    eprintln!("Loading feed from {}", feed_path.display());
    let feed = CsvFeedAdapter::new(feed_path.clone());
    let ticks = match feed.load_ticks() {
        Ok(ticks) => ticks,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };
    eprintln!("  {} ticks", ticks.len());

    // Stage 4: Replay, one engine pass per tick
    let mut notifier = ConsoleNotifier::new();
    let mut totals = PassSummary::default();
    for tick in &ticks {
        if let Err(e) = apply_tick(
            &mut market,
            &mut assets,
            tick,
            threshold,
            &wallets,
            &rules,
            &mut notifier,
        ) {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
        let summary = run_pass(&mut rules, &mut wallets, &market, &mut notifier);
        totals.evaluated += summary.evaluated;
        totals.triggered += summary.triggered;
        totals.executed += summary.executed;
        totals.skipped += summary.skipped;
    }

    // Stage 5: Report
    print_report(&market, &wallets, ticks.len(), &totals, &notifier);
    ExitCode::SUCCESS
}

struct ExchangeState {
    config: ExchangeConfig,
    market: MarketState,
    assets: AssetRegistry,
    wallets: WalletRegistry,
    rules: Vec<StrategyRule>,
}

fn build_exchange_state(adapter: &FileConfigAdapter) -> Result<ExchangeState, MoneybinError> {
    let config = build_exchange_config(adapter)?;
    let market = MarketState::with_history_limit(config.history_limit);

    let mut assets = AssetRegistry::new();
    for (code, name) in build_asset_names(adapter)? {
        assets.register_name(&code, &name);
    }

    let mut wallets = WalletRegistry::new();
    for wallet in build_wallets(adapter)? {
        wallets.insert(wallet);
    }

    let rules = build_rules(adapter)?;
    Ok(ExchangeState {
        config,
        market,
        assets,
        wallets,
        rules,
    })
}

fn print_report(
    market: &MarketState,
    wallets: &WalletRegistry,
    tick_count: usize,
    totals: &PassSummary,
    notifier: &ConsoleNotifier,
) {
    println!("=== replay summary ===");
    println!("ticks processed: {}", tick_count);
    println!("assets priced: {}", market.asset_count());
    println!(
        "rules: {} evaluations, {} triggers, {} executions",
        totals.evaluated, totals.triggered, totals.executed
    );
    if totals.skipped > 0 {
        println!("rules skipped (unknown wallet): {}", totals.skipped);
    }
    println!("alerts delivered: {}", notifier.delivered_count());

    for id in wallets.ids() {
        let Some(wallet) = wallets.get(id) else {
            continue;
        };
        println!();
        println!("wallet {} (user {})", wallet.id, wallet.user_id);
        println!("  balance: {:.2}", wallet.balance());
        println!("  total value: {:.2}", wallet.total_value(market));
        let mut positions: Vec<(&String, &f64)> = wallet.positions().iter().collect();
        positions.sort_by(|a, b| a.0.cmp(b.0));
        for (asset, quantity) in positions {
            println!("  position {}: {}", asset, quantity);
        }
        println!("  transactions: {}", wallet.transactions().len());
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match build_exchange_state(&adapter) {
        Ok(state) => {
            println!(
                "config ok: {} wallets, {} rules, volatility threshold {}%, history limit {}",
                state.wallets.len(),
                state.rules.len(),
                state.config.volatility_threshold,
                if state.config.history_limit == 0 {
                    "unbounded".to_string()
                } else {
                    state.config.history_limit.to_string()
                }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

fn run_info(feed_path: &PathBuf) -> ExitCode {
    let feed = CsvFeedAdapter::new(feed_path.clone());
    let ticks = match feed.load_ticks() {
        Ok(ticks) => ticks,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(&e);
        }
    };

    let assets: BTreeSet<&str> = ticks
        .iter()
        .flat_map(|t| t.prices.keys().map(String::as_str))
        .collect();

    println!("feed: {}", feed_path.display());
    println!("ticks: {}", ticks.len());
    match (ticks.first(), ticks.last()) {
        (Some(first), Some(last)) => {
            println!("range: {} to {}", first.timestamp, last.timestamp);
        }
        _ => println!("range: empty"),
    }
    println!(
        "assets: {}",
        assets.into_iter().collect::<Vec<_>>().join(", ")
    );
    ExitCode::SUCCESS
}
