use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "syllabus-cli", version, about = "Syllabus planner CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview the tasks a syllabus would produce, without saving anything
    Preview(commands::preview::PreviewArgs),
    /// Extract tasks and write them out as JSON
    Parse(commands::parse::ParseArgs),
    /// Estimate reading time for a piece of work
    Estimate(commands::estimate::EstimateArgs),
    /// Learn per-course estimate scales from logged sessions
    Scale(commands::scale::ScaleArgs),
    /// Course name helpers
    Course {
        #[command(subcommand)]
        action: commands::course::CourseAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    // Logs go to stderr so JSON on stdout stays parseable.
    // Override with RUST_LOG=syllabus_core=debug.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Preview(args) => commands::preview::run(args),
        Commands::Parse(args) => commands::parse::run(args),
        Commands::Estimate(args) => commands::estimate::run(args),
        Commands::Scale(args) => commands::scale::run(args),
        Commands::Course { action } => commands::course::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
