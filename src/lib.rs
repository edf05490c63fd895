pub mod aggregator;
pub mod alerts;
pub mod cache;
pub mod config;
pub mod error;
pub mod ledger;
pub mod log;
pub mod model;
pub mod providers;
pub mod rate_provider;
pub mod store;
pub mod ui;
pub mod valuation;

use crate::aggregator::RateAggregator;
use crate::alerts::{AlertMonitor, AlertRule, LogAlertSink};
use crate::config::{AppConfig, ProviderKind};
use crate::ledger::Ledger;
use crate::model::{Side, Symbol, Transaction};
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::exchange_rate_api::ExchangeRateApiProvider;
use crate::providers::exchange_rate_host::ExchangeRateHostProvider;
use crate::providers::open_exchange_rates::OpenExchangeRatesProvider;
use crate::providers::yahoo_finance::YahooFinanceProvider;
use crate::rate_provider::RateProvider;
use crate::store::disk::DiskStore;
use crate::valuation::ValuationService;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    /// Valuate every open holding of a user.
    Summary { user: Option<String> },
    /// Aggregate the current rate for one configured symbol.
    Rate { symbol: String },
    /// Show the derived position for one (user, symbol).
    Position {
        user: Option<String>,
        symbol: String,
    },
    /// Append a buy/sell transaction to the ledger.
    Record {
        user: Option<String>,
        symbol: String,
        side: Side,
        quantity: f64,
        price: f64,
    },
}

/// Builds one provider client per configured entry.
pub fn build_providers(config: &AppConfig) -> Vec<Arc<dyn RateProvider>> {
    config
        .providers
        .iter()
        .map(|p| -> Arc<dyn RateProvider> {
            let base_url = p.base_url();
            let api_key = p.api_key.as_deref().unwrap_or_default();
            match p.kind {
                ProviderKind::Yahoo => Arc::new(YahooFinanceProvider::new(base_url, p.weight)),
                ProviderKind::Coingecko => Arc::new(CoinGeckoProvider::new(base_url, p.weight)),
                ProviderKind::ExchangeRateHost => {
                    Arc::new(ExchangeRateHostProvider::new(base_url, p.weight))
                }
                ProviderKind::ExchangeRateApi => {
                    Arc::new(ExchangeRateApiProvider::new(base_url, api_key, p.weight))
                }
                ProviderKind::OpenExchangeRates => {
                    Arc::new(OpenExchangeRatesProvider::new(base_url, api_key, p.weight))
                }
            }
        })
        .collect()
}

struct App {
    config: AppConfig,
    ledger: Arc<Ledger>,
    aggregator: Arc<RateAggregator>,
    valuation: ValuationService,
}

impl App {
    fn build(config: AppConfig) -> Result<Self> {
        let providers = build_providers(&config);
        let aggregator = Arc::new(RateAggregator::new(
            providers,
            Duration::from_millis(config.provider_timeout_ms),
        ));

        let data_path = config.default_data_path()?.join("ledger");
        let store = DiskStore::open(&data_path)
            .with_context(|| format!("Failed to open ledger store at {}", data_path.display()))?;
        let ledger = Arc::new(Ledger::new(Arc::new(store), config.allow_short));

        let rules: Vec<AlertRule> = config
            .alerts
            .iter()
            .map(|a| AlertRule {
                user: a.user.clone().unwrap_or_else(|| config.default_user.clone()),
                symbol: a.symbol.clone(),
                upper_threshold: a.upper_threshold,
                lower_threshold: a.lower_threshold,
                active: a.active,
            })
            .collect();
        let alerts = if rules.is_empty() {
            None
        } else {
            Some(Arc::new(AlertMonitor::new(rules, Arc::new(LogAlertSink))))
        };

        let symbols: Vec<Symbol> = config.symbols.iter().map(|s| s.to_symbol()).collect();
        let valuation = ValuationService::new(
            Arc::clone(&ledger),
            Arc::clone(&aggregator),
            symbols,
            alerts,
        );

        Ok(App {
            config,
            ledger,
            aggregator,
            valuation,
        })
    }

    fn resolve_user(&self, user: Option<String>) -> String {
        user.unwrap_or_else(|| self.config.default_user.clone())
    }

    fn resolve_symbol(&self, name: &str) -> Result<Symbol> {
        self.config
            .symbol(name)
            .with_context(|| format!("Symbol {name} is not configured"))
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("folio starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::build(config)?;

    match command {
        AppCommand::Summary { user } => {
            let user = app.resolve_user(user);
            let pb = ui::new_spinner("Aggregating rates...");
            let valuations = app.valuation.valuate(&user).await?;
            pb.finish_and_clear();

            if valuations.is_empty() {
                println!("No open holdings for {user}.");
            } else {
                println!("{}", ui::render_valuation_report(&user, &valuations));
            }
        }
        AppCommand::Rate { symbol } => {
            let symbol = app.resolve_symbol(&symbol)?;
            let pb = ui::new_spinner("Aggregating rates...");
            let result = app.aggregator.get_rate(&symbol).await;
            pb.finish_and_clear();

            let rate = result?;
            println!(
                "{}: {:.6} ({} provider{})",
                symbol.name,
                rate.rate,
                rate.quote_count,
                if rate.quote_count == 1 { "" } else { "s" }
            );
        }
        AppCommand::Position { user, symbol } => {
            let user = app.resolve_user(user);
            let position = app.ledger.position_of(&user, &symbol).await?;
            println!("{}", ui::render_position(&user, &position));
        }
        AppCommand::Record {
            user,
            symbol,
            side,
            quantity,
            price,
        } => {
            let user = app.resolve_user(user);
            // Only configured symbols enter the ledger; anything else
            // could never be valuated.
            if app.config.symbol(&symbol).is_none() {
                bail!("Symbol {symbol} is not configured");
            }

            app.ledger
                .record(Transaction::new(&user, &symbol, side, quantity, price))
                .await?;

            let position = app.ledger.position_of(&user, &symbol).await?;
            println!(
                "Recorded {side} of {quantity} {symbol} @ {price} for {user}. \
                 Net quantity: {:.4}, avg cost: {:.2}",
                position.net_quantity, position.avg_cost_basis
            );
        }
    }

    Ok(())
}
