//! RESP2 request framing and reply encoding.
//!
//! Requests arrive either as multibulk arrays of bulk strings
//! (`*2\r\n$4\r\nping\r\n...`) or as inline commands (`PING\r\n`), which
//! is what a human types into telnet. Replies use the five RESP2 types plus
//! the null bulk string.
//!
//! The client side lives here too: [`encode_request`] frames a command as a
//! multibulk and [`parse_reply`] decodes whatever a RESP2 server answers.

use super::errors::{ProtocolError, ProtocolResult};

/// Largest accepted bulk string.
pub const MAX_BULK_SIZE: usize = 64 * 1024 * 1024;

/// Largest accepted multibulk element count.
pub const MAX_ELEMENTS: usize = 1024 * 1024;

/// Longest accepted inline command line, and longest `*`/`$` header line.
pub const MAX_INLINE_SIZE: usize = 64 * 1024;

/// One request: the command name followed by its arguments, as raw bytes.
pub type Request = Vec<Vec<u8>>;

/// Parses one request from the front of `buf`.
///
/// Returns `Ok(None)` if more bytes are needed, otherwise the request and
/// the number of bytes it consumed. A blank line or `*0` yields an empty
/// request, which callers skip.
pub fn parse_request(buf: &[u8]) -> ProtocolResult<Option<(Request, usize)>> {
    match buf.first() {
        None => Ok(None),
        Some(b'*') => parse_multibulk(buf),
        Some(_) => parse_inline(buf),
    }
}

fn parse_multibulk(buf: &[u8]) -> ProtocolResult<Option<(Request, usize)>> {
    let Some((line, mut offset)) = read_line(buf, 1)? else {
        return Ok(None);
    };
    let count = parse_length(line, "multibulk")?;
    if count <= 0 {
        return Ok(Some((Vec::new(), offset)));
    }
    let count = count as usize;
    if count > MAX_ELEMENTS {
        return Err(ProtocolError::TooLarge {
            what: "multibulk",
            size: count,
            limit: MAX_ELEMENTS,
        });
    }

    let mut args = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        match buf.get(offset) {
            None => return Ok(None),
            Some(b'$') => {}
            Some(&other) => {
                return Err(ProtocolError::malformed(format!(
                    "expected '$', got '{}'",
                    other as char
                )))
            }
        }

        let Some((line, data_start)) = read_line(buf, offset + 1)? else {
            return Ok(None);
        };
        let len = parse_length(line, "bulk")?;
        if len < 0 {
            return Err(ProtocolError::malformed("invalid bulk length"));
        }
        let len = len as usize;
        if len > MAX_BULK_SIZE {
            return Err(ProtocolError::TooLarge {
                what: "bulk string",
                size: len,
                limit: MAX_BULK_SIZE,
            });
        }

        let data_end = data_start + len;
        if buf.len() < data_end + 2 {
            return Ok(None);
        }
        if &buf[data_end..data_end + 2] != b"\r\n" {
            return Err(ProtocolError::malformed("missing CRLF after bulk string"));
        }

        args.push(buf[data_start..data_end].to_vec());
        offset = data_end + 2;
    }

    Ok(Some((args, offset)))
}

fn parse_inline(buf: &[u8]) -> ProtocolResult<Option<(Request, usize)>> {
    let Some(pos) = buf.iter().position(|&b| b == b'\n') else {
        if buf.len() > MAX_INLINE_SIZE {
            return Err(ProtocolError::TooLarge {
                what: "inline command",
                size: buf.len(),
                limit: MAX_INLINE_SIZE,
            });
        }
        return Ok(None);
    };

    let line = buf[..pos].strip_suffix(b"\r").unwrap_or(&buf[..pos]);
    let args = line
        .split(|&b| b == b' ' || b == b'\t')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_vec())
        .collect();

    Ok(Some((args, pos + 1)))
}

/// Frames `args` as a multibulk array of bulk strings.
pub fn encode_request<S: AsRef<[u8]>>(args: &[S]) -> Vec<u8> {
    Reply::Array(args.iter().map(|arg| Reply::bulk(arg.as_ref())).collect()).encode()
}

/// Parses one reply from the front of `buf`.
///
/// Returns `Ok(None)` if more bytes are needed, otherwise the reply and the
/// number of bytes it consumed. `$-1` and `*-1` both decode as
/// [`Reply::Null`].
pub fn parse_reply(buf: &[u8]) -> ProtocolResult<Option<(Reply, usize)>> {
    let Some(&tag) = buf.first() else {
        return Ok(None);
    };
    let Some((line, offset)) = read_line(buf, 1)? else {
        return Ok(None);
    };
    let text = || String::from_utf8_lossy(line).into_owned();

    match tag {
        b'+' => Ok(Some((Reply::Simple(text()), offset))),
        b'-' => Ok(Some((Reply::Error(text()), offset))),
        b':' => Ok(Some((Reply::Integer(parse_length(line, "integer")?), offset))),
        b'$' => {
            let len = parse_length(line, "bulk")?;
            if len < 0 {
                return Ok(Some((Reply::Null, offset)));
            }
            let len = len as usize;
            if len > MAX_BULK_SIZE {
                return Err(ProtocolError::TooLarge {
                    what: "bulk string",
                    size: len,
                    limit: MAX_BULK_SIZE,
                });
            }
            let end = offset + len;
            if buf.len() < end + 2 {
                return Ok(None);
            }
            if &buf[end..end + 2] != b"\r\n" {
                return Err(ProtocolError::malformed("missing CRLF after bulk string"));
            }
            Ok(Some((Reply::Bulk(buf[offset..end].to_vec()), end + 2)))
        }
        b'*' => {
            let count = parse_length(line, "multibulk")?;
            if count < 0 {
                return Ok(Some((Reply::Null, offset)));
            }
            let count = count as usize;
            if count > MAX_ELEMENTS {
                return Err(ProtocolError::TooLarge {
                    what: "multibulk",
                    size: count,
                    limit: MAX_ELEMENTS,
                });
            }

            let mut elements = Vec::with_capacity(count.min(64));
            let mut offset = offset;
            for _ in 0..count {
                let Some((element, used)) = parse_reply(&buf[offset..])? else {
                    return Ok(None);
                };
                elements.push(element);
                offset += used;
            }
            Ok(Some((Reply::Array(elements), offset)))
        }
        other => Err(ProtocolError::malformed(format!(
            "unknown reply type '{}'",
            other as char
        ))),
    }
}

/// Header line starting at `start`, without its CRLF, and the offset just
/// past it. An unterminated line longer than [`MAX_INLINE_SIZE`] is an error.
fn read_line(buf: &[u8], start: usize) -> ProtocolResult<Option<(&[u8], usize)>> {
    let Some(rest) = buf.get(start..) else {
        return Ok(None);
    };
    let window = &rest[..rest.len().min(MAX_INLINE_SIZE + 2)];
    match window.windows(2).position(|w| w == b"\r\n") {
        Some(pos) => Ok(Some((&rest[..pos], start + pos + 2))),
        None if rest.len() > MAX_INLINE_SIZE => Err(ProtocolError::TooLarge {
            what: "header line",
            size: rest.len(),
            limit: MAX_INLINE_SIZE,
        }),
        None => Ok(None),
    }
}

fn parse_length(line: &[u8], what: &str) -> ProtocolResult<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ProtocolError::malformed(format!("invalid {} length", what)))
}

/// A RESP2 reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+<text>`
    Simple(String),
    /// `-<text>`; the text carries its own `ERR` prefix
    Error(String),
    /// `:<n>`
    Integer(i64),
    /// `$<len>` then the bytes
    Bulk(Vec<u8>),
    /// `*<n>` then each element
    Array(Vec<Reply>),
    /// `$-1`
    Null,
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    /// An `ERR <msg>` error reply
    pub fn err(msg: impl AsRef<str>) -> Self {
        Reply::Error(format!("ERR {}", msg.as_ref()))
    }

    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        Reply::Bulk(data.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        self.encode_into(&mut buf);
        buf
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                buf.push(b'+');
                push_line(buf, s);
            }
            Reply::Error(s) => {
                buf.push(b'-');
                push_line(buf, s);
            }
            Reply::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            Reply::Bulk(data) => {
                buf.push(b'$');
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            Reply::Array(elements) => {
                buf.push(b'*');
                buf.extend_from_slice(elements.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for element in elements {
                    element.encode_into(buf);
                }
            }
            Reply::Null => buf.extend_from_slice(b"$-1\r\n"),
        }
    }
}

/// Single-line payload; CR and LF would end the reply early.
fn push_line(buf: &mut Vec<u8>, s: &str) {
    buf.extend(s.bytes().map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }));
    buf.extend_from_slice(b"\r\n");
}
