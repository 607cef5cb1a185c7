use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;

use anyhow::{anyhow, bail, Context};
use tracing::info;

use crate::cipher::Cipher;
use crate::commands::Command;
use crate::config::Config;
use crate::roster::Roster;
use crate::wire;

struct AcceptedRequest {
    line: String,
    cipher: Cipher,
}

pub fn run(config: &Config) -> anyhow::Result<()> {
    // Same roster file as the server; the client only needs its id-to-key
    // view of it to decrypt responses.
    let roster = Roster::load_or_empty(&config.roster);

    let stream = TcpStream::connect((config.host.as_str(), config.port))
        .with_context(|| format!("failed to connect to {}:{}", config.host, config.port))?;
    info!("connected to \"{}\" on port {}", config.host, config.port);

    let mut reader = BufReader::new(stream.try_clone().context("clone connection stream")?);
    let mut writer = stream;

    let stdin = io::stdin();
    let mut console = stdin.lock();

    loop {
        let Some(request) = prompt_request(&roster, &mut console)? else {
            info!("end of input, closing connection");
            return Ok(());
        };

        writer
            .write_all(request.line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush())
            .context("send request")?;

        match wire::recv_frame(&mut reader).context("receive response")? {
            None => bail!("server closed the connection"),
            Some(token) => {
                let plaintext = request
                    .cipher
                    .open(&token)
                    .map_err(|e| anyhow!("could not decrypt the server response: {e}"))?;
                println!("{plaintext}");
            }
        }
    }
}

/// Prompts until the operator supplies a valid "<student id> <command>"
/// line for a student with a provisioned key, echoing the command's
/// progress message on accept. `Ok(None)` on end of input. Nothing hits the
/// wire for a rejected line.
fn prompt_request(
    roster: &Roster,
    console: &mut impl BufRead,
) -> anyhow::Result<Option<AcceptedRequest>> {
    loop {
        print!("Input: ");
        io::stdout().flush().context("flush prompt")?;

        let mut line = String::new();
        if console.read_line(&mut line).context("read console input")? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim();
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();

        let &[id, token] = tokens.as_slice() else {
            println!("Expected \"<student id> <command>\". Please try again.");
            continue;
        };
        let Some(command) = Command::resolve(token) else {
            println!("Invalid command. Please try again.");
            continue;
        };
        let Some(key) = roster.lookup(id).and_then(|r| r.key()) else {
            println!("No key on file for student {id}. Please try again.");
            continue;
        };

        println!("Command entered: {}", command.token);
        println!("{}", command.progress);
        return Ok(Some(AcceptedRequest {
            line: trimmed.to_string(),
            cipher: Cipher::from_key_str(key),
        }));
    }
}
