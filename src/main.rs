//! Binary entrypoint for the Plaza world server CLI.
//!
//! Commands:
//! - `start [--port <n>]` - run the world server, optionally overriding the configured TCP port
//! - `init` - create a starter `config.toml` and seed the world store
//! - `status` - print store contents and a brief summary
//!
//! See the library crate docs for module-level details: `plaza::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use plaza::config::Config;
use plaza::server::WorldServer;
use plaza::world::storage::WorldStore;

#[derive(Parser)]
#[command(name = "plaza")]
#[command(about = "Authoritative world server for a small 2D multiplayer town")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the world server
    Start {
        /// TCP port to listen on (overrides the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize a new configuration and seed the world store
    Init,
    /// Show store contents and statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes it)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { port } => {
            let mut config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            if let Some(cli_port) = port {
                config.server.port = cli_port;
            }
            info!("Starting Plaza v{}", env!("CARGO_PKG_VERSION"));

            let server = WorldServer::new(config)?;
            server.run().await?;
        }
        Commands::Init => {
            info!("Initializing new world configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let config = Config::load(&cli.config).await?;
            let store = WorldStore::open(&config.storage.data_dir)?;
            info!(
                "World store seeded at {}: {} plots, {} catalog items",
                config.storage.data_dir,
                store.plot_count(),
                store.item_count()
            );
        }
        Commands::Status => {
            let config = pre_config.unwrap_or(Config::load(&cli.config).await?);
            let store = WorldStore::open(&config.storage.data_dir)?;
            println!("Plaza world store: {}", config.storage.data_dir);
            println!("  seeded:   {}", store.is_seeded()?);
            println!("  accounts: {}", store.account_count());
            println!("  plots:    {}", store.plot_count());
            println!("  items:    {}", store.item_count());
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    if let Some(file) = config.as_ref().and_then(|cfg| cfg.logging.file.clone()) {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // When stdout is a terminal, echo log lines there as well
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
            let _ = builder.try_init();
            return;
        }
    }

    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
