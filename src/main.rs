use clap::{Args, Parser, Subcommand};
use sitefx::cli::rates::RatesArgs;
use sitefx::core::log::init_logging;
use std::process::ExitCode;

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Print the conversion ratio of every site's default currency as JSON
    Rates(RatesCommand),
}

#[derive(Args, Default)]
struct RatesCommand {
    /// Currency to convert into, overrides the configured one
    #[arg(long)]
    currency: Option<String>,

    /// Resolve one site at a time
    #[arg(long)]
    sequential: bool,

    /// Also print a table of resolved and dropped sites to stderr
    #[arg(long)]
    report: bool,
}

impl From<RatesCommand> for RatesArgs {
    fn from(cmd: RatesCommand) -> RatesArgs {
        RatesArgs {
            currency: cmd.currency,
            sequential: cmd.sequential,
            report: cmd.report,
        }
    }
}

impl From<Commands> for sitefx::AppCommand {
    fn from(cmd: Commands) -> sitefx::AppCommand {
        match cmd {
            Commands::Setup => sitefx::AppCommand::Setup,
            Commands::Rates(args) => sitefx::AppCommand::Rates(args.into()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Rates(RatesCommand::default()));
    let result = sitefx::run_command(command.into(), cli.config_path.as_deref()).await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Application failed");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
