use anyhow::Context;
use clap::{arg, ArgMatches, Command};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::host::DEFAULT_SAVED_GAMES_LIMIT;

/// Server settings, read from a yaml file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Default `env_logger` filter, used when `RUST_LOG` is not set.
    pub log_filter: String,
    /// Directory for JSON game records. Records are kept in memory when
    /// absent.
    pub storage_dir: Option<PathBuf>,
    pub saved_games_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            log_filter: "info".to_string(),
            storage_dir: None,
            saved_games_limit: DEFAULT_SAVED_GAMES_LIMIT,
        }
    }
}

impl ServerConfig {
    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(contents).context("Parsing config file")
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Reading config file '{}'", path.display()))?;
        Self::from_yaml(&contents)
    }
}

pub fn command() -> Command {
    Command::new("turn_arbiter_chess")
        .version(clap::crate_version!())
        .about("Authoritative chess host: validates moves and arbitrates turns")
        .arg(arg!(
            -c --config <FILE> "Path to the configuration file: yaml-serialized ServerConfig"
        ))
        .arg(arg!(-b --bind <ADDRESS> "Address to listen on, overrides the configuration file"))
}

/// Builds the effective configuration from parsed command line arguments.
pub fn from_matches(matches: &ArgMatches) -> anyhow::Result<ServerConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ServerConfig::read(Path::new(path))?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = matches.get_one::<String>("bind") {
        config.bind_address = bind.clone();
    }
    Ok(config)
}
