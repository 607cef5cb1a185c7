//! Settings resolution: CLI flags win over the config file, which wins
//! over role defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::{Args, Role};

pub const DEFAULT_PORT: u16 = 50000;
pub const DEFAULT_ROSTER: &str = "course_grades_2024.csv";
pub const DEFAULT_CONFIG: &str = "gradeport.toml";

/// File-level settings. Every field is optional so a config file can set
/// just the ones it cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub roster: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<FileConfig> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Fully resolved settings for one role.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub roster: PathBuf,
}

impl Config {
    pub fn resolve(args: &Args) -> Result<Config> {
        let file = match &args.config {
            // An explicitly named config file must load; the default one is
            // only read when it exists.
            Some(path) => FileConfig::load(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG);
                if default.exists() {
                    FileConfig::load(default)?
                } else {
                    FileConfig::default()
                }
            }
        };

        Ok(Config {
            host: args
                .host
                .clone()
                .or(file.host)
                .unwrap_or_else(|| default_host(args.role).to_string()),
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            roster: args
                .roster
                .clone()
                .or(file.roster)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ROSTER)),
        })
    }
}

fn default_host(role: Role) -> &'static str {
    match role {
        Role::Server => "0.0.0.0",
        Role::Client => "localhost",
    }
}
