//! runbook CLI - run tagged notebook cells from the command line.

mod colors;
mod inspect;
mod run;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "runbook")]
#[command(about = "Run tagged cells from Jupyter-format Lua notebooks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cells from a notebook
    Run(run::RunArgs),

    /// Print the heading structure with cell counts
    Summary {
        /// Path to the notebook (.ipynb file)
        notebook: String,
    },

    /// List every cell with its tags
    Tags {
        /// Path to the notebook (.ipynb file)
        notebook: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run::execute(args),
        Commands::Summary { notebook } => inspect::summary(&notebook),
        Commands::Tags { notebook } => inspect::tags(&notebook),
    }
}
