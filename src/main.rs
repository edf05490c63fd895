use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use folio::log::init_logging;
use folio::model::Side;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TradeSide {
    Buy,
    Sell,
}

impl From<TradeSide> for Side {
    fn from(side: TradeSide) -> Side {
        match side {
            TradeSide::Buy => Side::Buy,
            TradeSide::Sell => Side::Sell,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display portfolio valuation summary
    Summary {
        /// Portfolio owner; defaults to the configured default user
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Display the aggregated rate for a symbol
    Rate {
        /// Configured symbol name, e.g. AAPL, bitcoin or USD_EUR
        symbol: String,
    },
    /// Display the derived position for a symbol
    Position {
        symbol: String,
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Record a buy or sell transaction
    Record {
        symbol: String,
        side: TradeSide,
        quantity: f64,
        price: f64,
        #[arg(short, long)]
        user: Option<String>,
    },
}

impl From<Commands> for folio::AppCommand {
    fn from(cmd: Commands) -> folio::AppCommand {
        match cmd {
            Commands::Summary { user } => folio::AppCommand::Summary { user },
            Commands::Rate { symbol } => folio::AppCommand::Rate { symbol },
            Commands::Position { symbol, user } => folio::AppCommand::Position { user, symbol },
            Commands::Record {
                symbol,
                side,
                quantity,
                price,
                user,
            } => folio::AppCommand::Record {
                user,
                symbol,
                side: side.into(),
                quantity,
                price,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => setup(),
        Some(cmd) => folio::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

fn setup() -> anyhow::Result<()> {
    use anyhow::Context;

    let path = folio::config::AppConfig::default_config_path()?;

    if path.exists() {
        anyhow::bail!("Configuration file already exists at {}", path.display());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let default_config = r#"---
symbols:
  - name: "AAPL"
    class: equity
  - name: "bitcoin"
    class: crypto
  - name: "USD_EUR"
    class: forex

providers:
  - kind: yahoo
  - kind: coingecko
  - kind: exchange_rate_host
    weight: 1.0

default_user: "default"
"#;

    std::fs::write(&path, default_config)
        .with_context(|| format!("Failed to write config file to {}", path.display()))?;

    tracing::info!("Created default configuration at {}", path.display());
    Ok(())
}
