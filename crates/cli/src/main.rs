use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ops-insight")]
#[command(about = "Daily e-commerce KPIs with rolling-baseline anomaly detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily pipeline for one day
    Run {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// Target day (YYYY-MM-DD); defaults to yesterday in the reporting timezone
        #[arg(long)]
        date: Option<String>,
    },
    /// Replay a date range, oldest day first
    Backfill {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        end: String,
    },
    /// Export the stored KPI history to a CSV file
    Export {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Output CSV file path
        #[arg(short, long)]
        output: String,
    },
    /// Start the HTTP trigger API
    Server {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
    /// Run scheduled daily pipelines (daemon mode)
    Schedule {
        /// Config file path
        #[arg(short, long, default_value = "config/Config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Run { config, date } => {
            commands::run_daily(&config, date.as_deref()).await?;
        }
        Commands::Backfill { config, start, end } => {
            commands::backfill(&config, &start, &end).await?;
        }
        Commands::Export { config, start, end, output } => {
            commands::export(&config, &start, &end, &output).await?;
        }
        Commands::Server { config } => {
            commands::server(&config).await?;
        }
        Commands::Schedule { config } => {
            commands::schedule(&config).await?;
        }
    }

    Ok(())
}
