//! netdispatch - multi-protocol network device task dispatcher
//!
//! This is the main entry point for the netdispatch CLI.

mod cli;

use cli::commands::{error_exit_code, CommandContext};
use cli::{Cli, Commands};
use netdispatch::config::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    if cli.verbosity() >= 2 && !cli.is_json() {
        eprintln!("netdispatch v{}", VERSION);
    }

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            error_exit_code(&e)
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = Config::load(cli.config.as_deref())?;
    let mut ctx = CommandContext::new(cli, config);

    match &cli.command {
        Commands::InterfaceSet(args) => args.execute(&mut ctx).await,
        Commands::Interfaces(args) => args.execute(&mut ctx).await,
        Commands::PushConfig(args) => args.execute(&mut ctx).await,
        Commands::EnableSnmp(args) => args.execute(&mut ctx).await,
        Commands::Command(args) => args.execute(&mut ctx).await,
        Commands::FetchConfig(args) => args.execute(&mut ctx).await,
        Commands::SnmpGet(args) => args.execute(&mut ctx).await,
        Commands::Ping(args) => args.execute(&mut ctx).await,
        Commands::CheckConnectivity(args) => args.execute(&mut ctx).await,
        Commands::ListDevices(args) => args.execute(&mut ctx).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 3),
        )
        .with(env_filter)
        .init();
}
