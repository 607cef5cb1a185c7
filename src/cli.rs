//! Command-line surface: role selection plus host/port/roster overrides.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Server,
    Client,
}

/// Encrypted course-grade query service.
///
/// Runs either the grade server (binds a TCP port and answers encrypted
/// grade queries against the course roster) or the interactive client
/// (prompts for "<student id> <command>" lines and decrypts the replies).
#[derive(Debug, Clone, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// server or client role
    #[arg(short, long, value_enum)]
    pub role: Role,

    /// Host to bind (server) or connect to (client)
    ///
    /// Defaults to 0.0.0.0 for the server and localhost for the client.
    #[arg(long, env = "GRADEPORT_HOST")]
    pub host: Option<String>,

    /// TCP port
    #[arg(short, long, env = "GRADEPORT_PORT")]
    pub port: Option<u16>,

    /// Course roster CSV file
    #[arg(long, env = "GRADEPORT_ROSTER", value_name = "FILE")]
    pub roster: Option<PathBuf>,

    /// Config file (TOML); gradeport.toml is picked up when present
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
