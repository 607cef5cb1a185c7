use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calc::{self, CalcError};
use crate::cipher::Cipher;
use crate::commands::Command;
use crate::config::Config;
use crate::roster::Roster;
use crate::wire;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("malformed request: expected \"<student id> <command>\", got {got} token(s)")]
    Malformed { got: usize },
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("student not found: {0}")]
    UnknownStudent(String),
    #[error("student {0} has no encryption key provisioned")]
    MissingKey(String),
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error("failed to encrypt the result")]
    Seal,
}

impl RequestError {
    /// Whether the connection survives this failure. Malformed lines and
    /// unknown commands are rejected without dropping the peer; anything
    /// discovered once the roster is in play closes the connection.
    pub fn keeps_connection(&self) -> bool {
        matches!(
            self,
            RequestError::Malformed { .. } | RequestError::UnknownCommand(_)
        )
    }
}

/// Validate, compute and encrypt one request line. The grammar is resolved
/// before the roster is touched, so an unknown command never reads roster
/// state and an unknown student never reaches the aggregation or the cipher.
pub fn answer_request(roster: &Roster, line: &str) -> Result<Vec<u8>, RequestError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let &[id, token] = tokens.as_slice() else {
        return Err(RequestError::Malformed { got: tokens.len() });
    };

    let command =
        Command::resolve(token).ok_or_else(|| RequestError::UnknownCommand(token.to_string()))?;
    let record = roster
        .lookup(id)
        .ok_or_else(|| RequestError::UnknownStudent(id.to_string()))?;
    debug!("user found: {id}");

    let result = calc::answer(roster, record, command)?;
    info!("sending: {result}");

    let key = record
        .key()
        .ok_or_else(|| RequestError::MissingKey(id.to_string()))?;
    Cipher::from_key_str(key)
        .seal(&result)
        .map_err(|_| RequestError::Seal)
}

pub fn run(config: &Config) -> anyhow::Result<()> {
    let roster = Roster::load_or_empty(&config.roster);
    info!(
        "loaded {} student record(s) from {}",
        roster.len(),
        config.roster.display()
    );

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    info!("listening on port {} ...", config.port);
    serve(listener, &roster)
}

/// Accepts and serves one connection at a time. A failed connection never
/// stops the listener; only an accept failure does.
pub fn serve(listener: TcpListener, roster: &Roster) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = listener.accept().context("accept failed")?;
        info!("connection received from {peer}");
        if let Err(e) = handle_connection(stream, roster) {
            warn!("connection error: {e:#}");
        }
        info!("client connection closed");
    }
}

/// One connection's request loop: read a line, answer it, repeat. A
/// zero-length read is the peer closing cleanly.
fn handle_connection(stream: TcpStream, roster: &Roster) -> anyhow::Result<()> {
    let mut reader = BufReader::new(stream.try_clone().context("clone connection stream")?);
    let mut writer = stream;

    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).context("read request line")?;
        if n == 0 {
            return Ok(());
        }
        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        info!("received: {request}");

        match answer_request(roster, request) {
            Ok(token) => {
                wire::send_frame(&mut writer, &token).context("send response frame")?;
            }
            Err(e) if e.keeps_connection() => {
                warn!("rejected request: {e}");
            }
            Err(e) => {
                warn!("closing connection: {e}");
                return Ok(());
            }
        }
    }
}
