use colored::Colorize;
use std::fmt;
use std::process;

/// Exit codes for the CLI.
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Unified error type for CLI operations.
pub enum CliError {
    /// Error from the tile database library.
    Db(iath_db::TileDbError),
    /// Config file issues.
    Config(String),
    /// Bad file path, unreadable input, parse failure.
    Input(String),
    /// Unknown domain id.
    UnknownDomain { domain: String, known: Vec<String> },
    /// Argument / usage errors.
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Db(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Config(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Input(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::UnknownDomain { domain, known } => {
                write!(f, "{} unknown domain '{domain}'", "error:".red().bold())?;
                if known.is_empty() {
                    write!(
                        f,
                        "\n  {} pass --schemas <file> or set `schemas` in iath.toml",
                        "help:".cyan().bold()
                    )
                } else {
                    write!(
                        f,
                        "\n  {} available domains: {}",
                        "help:".cyan().bold(),
                        known.join(", ")
                    )
                }
            }
            CliError::Usage(msg) => write!(f, "{} {msg}", "error:".red().bold()),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<iath_db::TileDbError> for CliError {
    fn from(e: iath_db::TileDbError) -> Self {
        match e {
            iath_db::TileDbError::Config(msg) => CliError::Config(msg),
            other => CliError::Db(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Input(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Input(format!("JSON parse error: {e}"))
    }
}

/// Print error and exit with the appropriate code.
pub fn exit_with_error(err: CliError) -> ! {
    eprintln!("{err}");
    let code = match &err {
        CliError::Usage(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    };
    process::exit(code)
}

pub type CliResult<T> = std::result::Result<T, CliError>;
