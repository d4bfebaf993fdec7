use clap::{Parser, Subcommand, ValueEnum};
use iath_db::MatchStrategy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iath", about = "Knowledge tile database CLI", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to config file (defaults to ./iath.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a database file from a directory of tile JSON files
    Build {
        /// Directory containing *.json tile files
        #[arg(long)]
        input_dir: PathBuf,

        /// Database file to write
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Domain id whose code is stamped in the header
        #[arg(long)]
        domain: String,

        /// Domain schema document (overrides the config file)
        #[arg(long)]
        schemas: Option<PathBuf>,
    },

    /// Show header fields and statistics for a database file
    Info {
        /// Database file
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Fetch the tile at one or more coordinates
    Fetch {
        /// Database file
        file: PathBuf,

        /// Coordinate as `x y z`; repeat the triple for several lookups
        #[arg(num_args = 3.., required = true, allow_negative_numbers = true)]
        coords: Vec<f32>,

        /// Maximum Euclidean distance (defaults to the configured tolerance)
        #[arg(long, short = 't')]
        tolerance: Option<f32>,

        /// How to choose among tiles within tolerance
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// Find tiles whose final response contains a keyword
    Search {
        /// Database file
        file: PathBuf,

        /// Case-insensitive substring
        keyword: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Map text to a coordinate in a domain space
    Point {
        /// Domain id
        #[arg(long)]
        domain: String,

        /// Domain schema document (overrides the config file)
        #[arg(long)]
        schemas: Option<PathBuf>,

        /// Text to map
        text: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Strategy {
    /// First tile within tolerance, in load order
    First,
    /// Closest tile within tolerance
    Nearest,
}

impl From<Strategy> for MatchStrategy {
    fn from(s: Strategy) -> Self {
        match s {
            Strategy::First => MatchStrategy::FirstMatch,
            Strategy::Nearest => MatchStrategy::Nearest,
        }
    }
}
