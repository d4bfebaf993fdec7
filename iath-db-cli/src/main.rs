mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use error::exit_with_error;

fn init_tracing(cli: &Cli) {
    // --quiet   → off
    // --verbose → RUST_LOG if set, otherwise info
    // default   → off; RUST_LOG alone does not turn logs on
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("off")
    };

    let ansi = !(cli.no_color || std::env::var_os("NO_COLOR").is_some());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    init_tracing(&cli);

    if let Err(e) = run(cli) {
        exit_with_error(e);
    }
}

fn run(cli: Cli) -> error::CliResult<()> {
    let settings = config::Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            input_dir,
            output,
            domain,
            schemas,
        } => {
            let registry = settings.registry(schemas.as_deref())?;
            commands::build::run(&input_dir, &output, &domain, &registry, cli.quiet)
        }

        Commands::Info { file, format } => {
            commands::info::run(&file, settings.store_config(None, None)?, format)
        }

        Commands::Fetch {
            file,
            coords,
            tolerance,
            strategy,
        } => {
            let store_config = settings.store_config(strategy.map(Into::into), tolerance)?;
            commands::fetch::run(&file, &coords, store_config, &settings.cache)
        }

        Commands::Search {
            file,
            keyword,
            format,
        } => commands::search::run(&file, &keyword, settings.store_config(None, None)?, format),

        Commands::Point {
            domain,
            schemas,
            text,
        } => {
            let registry = settings.registry(schemas.as_deref())?;
            commands::point::run(&registry, &domain, &text)
        }
    }
}
