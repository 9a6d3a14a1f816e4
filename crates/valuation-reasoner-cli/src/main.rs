mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process;

use commands::sensitivity::SweepArgs;
use commands::valuation::ExitStatus;
use commands::AssumptionArgs;

/// Explainable DCF and EV/EBITDA valuation
#[derive(Parser)]
#[command(
    name = "valuation-reasoner",
    version,
    about = "Explainable DCF and EV/EBITDA valuation",
    long_about = "Values a company by discounted cash flow and by exit multiple, \
                  reconciles the two, sweeps WACC against terminal growth and writes \
                  a step-by-step explanation of every figure. With no subcommand a \
                  full run writes all artifacts to --out-dir."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    source: AssumptionArgs,

    #[command(flatten)]
    sweep: SweepArgs,

    /// Directory the full run writes its artifacts into
    #[arg(long, global = true, default_value = ".")]
    out_dir: PathBuf,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log more to stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every valuation and write all artifacts (default)
    Run,
    /// Discounted cash flow valuation only
    Dcf,
    /// Exit-multiple valuation reconciled against the DCF
    Multiples,
    /// WACC x terminal growth sensitivity grid
    Sensitivity,
    /// Print the step-by-step explanations
    Explain,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Run);
    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match command {
        Commands::Run => {
            let result = commands::valuation::run_all(&cli.source, &cli.sweep, &cli.out_dir);
            let status = ExitStatus::of_run(&result);
            match result {
                Ok(outcome) => {
                    output::format_output(&cli.output, &outcome.summary);
                    for failure in &outcome.failures {
                        eprintln!("{}: {}", "error".red().bold(), failure);
                    }
                }
                Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
            }
            process::exit(status.code());
        }
        Commands::Dcf => commands::valuation::run_dcf(&cli.source),
        Commands::Multiples => commands::valuation::run_multiples(&cli.source),
        Commands::Sensitivity => commands::sensitivity::run_sensitivity(&cli.source, &cli.sweep),
        Commands::Explain => commands::valuation::run_explain(&cli.source),
        Commands::Version => {
            println!("valuation-reasoner {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(ExitStatus::Success.code());
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(ExitStatus::Failed.code());
        }
    }
}
