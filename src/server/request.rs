use std::io::{self, Read};
use std::net::TcpStream;

use percent_encoding::percent_decode_str;

/// Upper bound on the request line plus headers. Static file requests fit in
/// a fraction of this.
const MAX_REQUEST_BYTES: usize = 8192;

#[derive(Debug, PartialEq)]
pub struct Request {
    pub method: String,
    pub target: String,
}

/// Reads from the stream until the blank line ending the header block.
///
/// Stops early on EOF; an oversized header block is an error.
pub fn read_request(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    while !ends_headers(&buffer) {
        if buffer.len() >= MAX_REQUEST_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request header block too large",
            ));
        }
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(buffer)
}

/// Parses the request line. Anything without a method and a target is
/// malformed.
pub fn parse_request(raw: &[u8]) -> Option<Request> {
    let text = String::from_utf8_lossy(raw);
    let line = text.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;

    Some(Request {
        method: method.to_string(),
        target: target.to_string(),
    })
}

/// Drops the query string from a request target.
///
/// Asset URLs are often cachebusted with `?v=...`; the query never selects a
/// different file.
pub fn strip_query(target: &str) -> &str {
    match target.find('?') {
        Some(position) => &target[..position],
        None => target,
    }
}

/// Percent-decodes a request path. Sequences that do not decode to UTF-8 are
/// rejected.
pub fn decode_path(path: &str) -> Option<String> {
    percent_decode_str(path)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn ends_headers(buffer: &[u8]) -> bool {
    buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.windows(2).any(|w| w == b"\n\n")
}
