//! Podium CLI
//!
//! Predicts the finishing order of a Formula 1 Grand Prix from the preceding
//! rounds of the season.

use clap::{Parser, Subcommand};
use podium::report::OutputFormat;
use podium::{Config, ModelKind, Result};

#[derive(Parser)]
#[command(name = "podium")]
#[command(about = "F1 finishing-order prediction from qualifying and practice pace", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the finishing order of the target Grand Prix
    Predict {
        /// Override the target round
        #[arg(long)]
        target: Option<u8>,
        /// Use only cached sessions (no network requests)
        #[arg(long)]
        offline: bool,
        /// Override the model (trees or linear)
        #[arg(long)]
        model: Option<ModelKind>,
        /// Output format (table, json, csv)
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Session cache commands
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache contents
    Status,
    /// Delete every cached session
    Clear,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Predict {
            target,
            offline,
            model,
            format,
        } => commands::predict(config, target, offline, model, format),
        Commands::Cache { action } => match action {
            CacheCommands::Status => commands::cache_status(&config),
            CacheCommands::Clear => commands::cache_clear(&config),
        },
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use podium::data::{OpenF1Source, SessionCache};
    use podium::{pipeline, report};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        let cache_dir = std::path::Path::new(&config.data.cache_path).parent();
        if let Some(dir) = cache_dir.filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
            println!("Created cache directory {}", dir.display());
        }

        println!("\nNext steps:");
        println!("  1. Edit {} to set the season, rounds and team points", config_path);
        println!("  2. Run 'podium predict' to rank the target Grand Prix");
        println!("  3. Run 'podium predict --offline' to reuse cached sessions only");

        Ok(())
    }

    pub fn predict(
        mut config: Config,
        target: Option<u8>,
        offline: bool,
        model: Option<ModelKind>,
        format: OutputFormat,
    ) -> Result<()> {
        if let Some(round) = target {
            config.season.target_round = round;
        }
        if let Some(kind) = model {
            config.model.kind = kind;
        }
        if offline {
            config.data.offline = true;
        }
        config.validate()?;

        let source = OpenF1Source::from_config(&config.data)?;
        if config.data.offline {
            log::info!("Offline mode: using cached sessions only");
        }

        let prediction = pipeline::run(&config, &source)?;
        print!("{}", report::render(&prediction, format)?);
        Ok(())
    }

    pub fn cache_status(config: &Config) -> Result<()> {
        let cache = SessionCache::open(&config.data.cache_path)?;
        let stats = cache.stats()?;

        println!("Session Cache");
        println!("───────────────────────────────");
        println!("  Path:      {}", config.data.cache_path);
        println!("  Sessions:  {}", stats.session_count);
        println!("  Events:    {}", stats.event_count);
        if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
            println!("  Oldest:    {}", oldest.format("%Y-%m-%d %H:%M UTC"));
            println!("  Newest:    {}", newest.format("%Y-%m-%d %H:%M UTC"));
        }

        Ok(())
    }

    pub fn cache_clear(config: &Config) -> Result<()> {
        let cache = SessionCache::open(&config.data.cache_path)?;
        let removed = cache.clear()?;
        println!("Removed {} cached sessions", removed);
        Ok(())
    }
}
