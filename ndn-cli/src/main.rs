use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

/// NDN command-line client
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Sets the level of verbosity
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send an Interest and print the Data response
    Interest {
        /// Name to request (NDN URI format)
        name: String,

        /// Timeout in milliseconds
        #[clap(short, long, default_value = "4000")]
        timeout: u64,

        /// Forwarder endpoint: host:port, a unix:/path, or a bare /path
        #[clap(short, long, default_value = "127.0.0.1:6363")]
        endpoint: String,

        /// Set MustBeFresh on the Interest
        #[clap(long)]
        must_be_fresh: bool,
    },

    /// Register a prefix and publish Data under it
    Publish {
        /// Name to publish under (NDN URI format)
        name: String,

        /// Content to publish (string)
        content: String,

        /// Freshness period in milliseconds
        #[clap(short, long, default_value = "60000")]
        ttl: u64,

        /// Forwarder endpoint: host:port, a unix:/path, or a bare /path
        #[clap(short, long, default_value = "127.0.0.1:6363")]
        endpoint: String,
    },

    /// Register a prefix with the forwarder without serving any Data
    Register {
        /// Prefix to register (NDN URI format)
        prefix: String,

        /// Forwarder endpoint: host:port, a unix:/path, or a bare /path
        #[clap(short, long, default_value = "127.0.0.1:6363")]
        endpoint: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Commands::Interest { name, timeout, endpoint, must_be_fresh } => {
            commands::interest::send_interest(name, timeout, endpoint, must_be_fresh).await?;
        }
        Commands::Publish { name, content, ttl, endpoint } => {
            commands::publish::publish_data(name, content, ttl, endpoint).await?;
        }
        Commands::Register { prefix, endpoint } => {
            commands::register::register_prefix(prefix, endpoint).await?;
        }
    }

    Ok(())
}
