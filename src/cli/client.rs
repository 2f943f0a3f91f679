//! Interactive client
//!
//! Reads command lines, sends each to a running server as a multibulk
//! request and prints the reply the way redis-cli does:
//!
//! ```text
//! modb> put chilts {"name":"Andrew"}
//! OK
//! modb> signature chilts
//! 1) "1"
//! 2) "9f2c..."
//! ```
//!
//! Words split on whitespace. Single or double quotes group a word that
//! contains spaces; inside double quotes a backslash escapes the next
//! character. The session ends on end of input or after `quit`.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::errors::{CliError, CliResult};
use crate::server::{encode_request, parse_reply, Reply};

const PROMPT: &str = "modb> ";

/// One connection to a server, answering requests in order
pub struct Connection {
    stream: TcpStream,
    inbound: Vec<u8>,
}

impl Connection {
    pub async fn connect(addr: &str) -> CliResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| CliError::client_failed(format!("Failed to connect to {}: {}", addr, e)))?;
        Ok(Self {
            stream,
            inbound: Vec::with_capacity(4096),
        })
    }

    /// Sends one request and waits for its reply
    pub async fn call<S: AsRef<[u8]>>(&mut self, args: &[S]) -> CliResult<Reply> {
        self.stream.write_all(&encode_request(args)).await?;

        loop {
            if let Some((reply, consumed)) = parse_reply(&self.inbound)? {
                self.inbound.drain(..consumed);
                return Ok(reply);
            }
            if self.stream.read_buf(&mut self.inbound).await? == 0 {
                return Err(CliError::client_failed("server closed the connection"));
            }
        }
    }
}

/// Runs a prompt loop against the server at `addr`. Returns the number of
/// requests sent.
pub async fn run_session<R, W>(addr: &str, input: R, out: &mut W) -> CliResult<usize>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut connection = Connection::connect(addr).await?;
    let mut lines = input.lines();
    let mut sent = 0;

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let words = match split_words(&line) {
            Ok(words) => words,
            Err(reason) => {
                writeln!(out, "(error) ERR {}", reason)?;
                continue;
            }
        };
        if words.is_empty() {
            continue;
        }

        let reply = connection.call(&words).await?;
        sent += 1;
        writeln!(out, "{}", format_reply(&reply))?;

        if words[0].eq_ignore_ascii_case("quit") {
            break;
        }
    }

    out.flush()?;
    Ok(sent)
}

/// Splits a typed line into words, honouring quotes.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };

        let mut word = String::new();
        if first == '"' || first == '\'' {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == first {
                    closed = true;
                    break;
                }
                if c == '\\' && first == '"' {
                    match chars.next() {
                        Some(escaped) => word.push(escaped),
                        None => break,
                    }
                    continue;
                }
                word.push(c);
            }
            if !closed {
                return Err("unbalanced quotes".to_string());
            }
            if chars.peek().is_some_and(|c| !c.is_whitespace()) {
                return Err("closing quote must be followed by a space".to_string());
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                word.push(c);
            }
        }
        words.push(word);
    }

    Ok(words)
}

/// Human-readable reply, nested arrays indented under their index
pub fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::Simple(text) => text.clone(),
        Reply::Error(text) => format!("(error) {}", text),
        Reply::Integer(n) => format!("(integer) {}", n),
        Reply::Bulk(data) => format!("{:?}", String::from_utf8_lossy(data)),
        Reply::Null => "(nil)".to_string(),
        Reply::Array(elements) if elements.is_empty() => "(empty array)".to_string(),
        Reply::Array(elements) => {
            let mut lines = Vec::new();
            for (i, element) in elements.iter().enumerate() {
                let index = format!("{}) ", i + 1);
                let pad = " ".repeat(index.len());
                for (j, line) in format_reply(element).lines().enumerate() {
                    let lead = if j == 0 { &index } else { &pad };
                    lines.push(format!("{}{}", lead, line));
                }
            }
            lines.join("\n")
        }
    }
}
