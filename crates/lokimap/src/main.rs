mod dashboard;
mod output;
mod server;
mod telemetry;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lokimap_core::catalog::NameCatalog;
use lokimap_core::config::Config;
use lokimap_loki::LokiClient;

use crate::telemetry::{init_cli_tracing, init_run_tracing};

#[derive(Parser, Debug)]
#[command(name = "lokimap")]
#[command(about = "Loki-backed user movement map dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true)]
    loki_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Serve the dashboard HTTP API")]
    Run {
        #[arg(long)]
        http_addr: Option<String>,
    },
    #[command(about = "Print a user's movement map")]
    Movements {
        account_id: i64,
        #[arg(long, help = "Window in hours back from now")]
        hours: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = Config::load().context("load config")?;
    if let Some(v) = cli.loki_url {
        cfg.loki_url = v.trim_end_matches('/').to_string();
    }

    match cli.command {
        Commands::Run { http_addr } => {
            init_run_tracing();
            if let Some(v) = http_addr {
                cfg.http_addr = v;
            }
            server::run(cfg).await
        }
        Commands::Movements { account_id, hours } => {
            init_cli_tracing();
            let hours = hours.unwrap_or(cfg.default_window_hours);
            let catalog = match &cfg.catalog_path {
                Some(path) => NameCatalog::load(path).context("load name catalog")?,
                None => NameCatalog::builtin(),
            };
            let client = LokiClient::new(&cfg.loki_url, cfg.request_timeout)
                .context("build loki client")?;

            let entries =
                dashboard::get_user_movement_map(&client, &catalog, &cfg, account_id, hours)
                    .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                output::print_movements_human(&entries);
            }
            Ok(())
        }
    }
}
