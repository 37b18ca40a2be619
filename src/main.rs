use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use liveconditions::cli::commands;
use liveconditions::config::PluginConfig;

#[derive(Parser)]
#[command(name = "liveconditions")]
#[command(about = "Dynamic weather and track conditions for racing servers")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the server and run the plugin
    Run,

    /// Print a sequence of synthetic weathers without connecting
    Preview {
        /// Number of weathers to generate
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// Override the configured seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Print each weather as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file
    Check,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(path: &str) -> PluginConfig {
    match PluginConfig::from_file(Path::new(path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            let config = load_config(&cli.config);
            init_tracing(&config.plugin.log_level, config.plugin.log_json);

            if let Err(e) = commands::run_plugin(&config).await {
                eprintln!("Plugin error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Preview { count, seed, json } => {
            let config = load_config(&cli.config);
            init_tracing(&config.plugin.log_level, config.plugin.log_json);

            if let Err(e) = commands::preview(&config, count, seed, json).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Check => {
            if let Err(e) = commands::check(Path::new(&cli.config)) {
                eprintln!("Invalid config: {}", e);
                std::process::exit(1);
            }
        }
    }
}
