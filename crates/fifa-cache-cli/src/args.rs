//! CLI argument definitions using clap derive

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// fifa-cache - offline cache for the FIFA tracker
///
/// Drives the cache manager's lifecycle events from the command line
/// against an on-disk cache.
#[derive(Parser, Debug)]
#[command(name = "fifa-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FIFA_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the cache stores
    #[arg(long, global = true, env = "FIFA_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pre-populate the current cache from the asset manifest
    Install,

    /// Delete every cache except the current one
    Activate,

    /// Run one request through the cache-first path and write the body to stdout
    Fetch(FetchArgs),

    /// Fire a deferred sync tag
    Sync {
        /// Sync tag, e.g. background-sync
        tag: String,
    },

    /// Post a JSON control message, e.g. '{"type":"SKIP_WAITING"}'
    Message {
        payload: String,
    },

    /// List cache stores and their entries
    Stores,

    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Origin-relative path or absolute URL
    pub target: String,

    /// Treat the request as a top-level document navigation
    #[arg(short, long)]
    pub document: bool,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_fetch_document() {
        let cli = Cli::try_parse_from(["fifa-cache", "fetch", "/pages/matches.html", "--document"])
            .unwrap();
        match cli.command {
            Commands::Fetch(args) => {
                assert_eq!(args.target, "/pages/matches.html");
                assert!(args.document);
                assert_eq!(args.method, "GET");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from(["fifa-cache", "stores", "-vv", "--cache-dir", "/tmp/fc"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/fc")));
        assert!(matches!(cli.command, Commands::Stores));
    }

    #[test]
    fn test_parse_config_save() {
        let cli = Cli::try_parse_from(["fifa-cache", "config", "--save"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { save: true }));
        let cli = Cli::try_parse_from(["fifa-cache", "config"]).unwrap();
        assert!(matches!(cli.command, Commands::Config { save: false }));
    }
}
