use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const BASE_URL_ENV: &str = "SHRINK_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "SHRINK_STORAGE";
pub const FILE_PATH_ENV: &str = "SHRINK_FILE_PATH";
pub const DATABASE_DSN_ENV: &str = "SHRINK_DATABASE_DSN";
pub const SLUG_LENGTH_ENV: &str = "SHRINK_SLUG_LENGTH";
pub const LOG_JSON_ENV: &str = "SHRINK_LOG_JSON";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SLUG_LENGTH: &str = "7";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "memory")]
    Memory,
    #[value(name = "file")]
    File,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Memory => write!(f, "memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shrink", about = "Shorten URLs against a memory, file or postgres storage")]
pub struct CLI {
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Memory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = FILE_PATH_ENV, required_if_eq("storage", "file"))]
    pub file_path: Option<PathBuf>,

    #[arg(long, env = DATABASE_DSN_ENV, required_if_eq("storage", "postgres"))]
    pub database_dsn: Option<String>,

    #[arg(long, env = SLUG_LENGTH_ENV, default_value = DEFAULT_SLUG_LENGTH)]
    pub slug_length: usize,

    /// Emit logs as JSON lines.
    #[arg(long, env = LOG_JSON_ENV)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten one URL.
    Short {
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        corr: String,
        url: String,
    },
    /// Shorten several URLs at once; correlation ids are their positions.
    Batch {
        #[arg(long)]
        user: String,
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Resolve a slug.
    Get { slug: String },
    /// Find the shortened URL of an original URL.
    Find { url: String },
    /// List the URLs owned by a user.
    List {
        #[arg(long)]
        user: String,
    },
    /// Soft-delete slugs owned by a user.
    Delete {
        #[arg(long)]
        user: String,
        #[arg(required = true)]
        slugs: Vec<String>,
    },
    /// Count stored URLs and users.
    Stat,
    /// Check that the database answers (postgres only).
    Ping {
        #[arg(long, default_value_t = 1000)]
        timeout_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        CLI::command().debug_assert();
    }

    #[test]
    fn file_backend_requires_path() {
        let err = CLI::try_parse_from(["shrink", "--storage", "file", "stat"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn defaults() {
        let cli = CLI::try_parse_from(["shrink", "stat"]).unwrap();
        assert_eq!(cli.storage, StorageBackendArg::Memory);
        assert_eq!(cli.slug_length, 7);
        assert!(matches!(cli.command, Command::Stat));
    }
}
