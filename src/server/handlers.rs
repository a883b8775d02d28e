use log::{debug, error, info, warn};
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::path::{Component, Path, PathBuf};

use super::http_status::HttpStatus;
use super::listing;
use super::request;

static MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("wasm", "application/wasm"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("json", "application/json"),
    ("txt", "text/plain"),
];

/// Outcome of mapping a request target onto the serving root.
#[derive(Debug, PartialEq)]
pub enum Resolved {
    File(PathBuf),
    Listing(PathBuf),
    RedirectWithSlash,
    Forbidden,
    NotFound,
}

/// Handles one connection start to finish. Failures are answered on this
/// connection and never propagate to the accept loop.
pub fn handle_client(mut stream: TcpStream, root: &Path) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(_) => "unknown".to_string(),
    };

    debug!("Handling request from {}", peer_addr);

    let raw = match request::read_request(&mut stream) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Error reading request from {}: {}", peer_addr, e);
            send_error(&mut stream, HttpStatus::BadRequest);
            return;
        }
    };

    let parsed = match request::parse_request(&raw) {
        Some(parsed) => parsed,
        None => {
            warn!("Malformed request from {}", peer_addr);
            send_error(&mut stream, HttpStatus::BadRequest);
            return;
        }
    };

    debug!("Request from {}: {} {}", peer_addr, parsed.method, parsed.target);

    let is_head = match parsed.method.as_str() {
        "GET" => false,
        "HEAD" => true,
        other => {
            warn!("Unsupported method from {}: {}", peer_addr, other);
            send_error(&mut stream, HttpStatus::MethodNotAllowed);
            return;
        }
    };

    let raw_path = request::strip_query(&parsed.target);
    let path = match request::decode_path(raw_path) {
        Some(path) => path,
        None => {
            warn!("Undecodable target from {}: {}", peer_addr, raw_path);
            send_error(&mut stream, HttpStatus::BadRequest);
            return;
        }
    };

    match resolve(root, &path) {
        Resolved::File(file_path) => serve_file(&mut stream, &file_path, is_head, &peer_addr),
        Resolved::Listing(dir_path) => {
            serve_listing(&mut stream, &dir_path, &path, is_head, &peer_addr);
        }
        Resolved::RedirectWithSlash => {
            // Location keeps the client's original encoding
            let location = format!("{}/", raw_path);
            info!("Redirecting {} to {}", peer_addr, location);
            send_redirect(&mut stream, &location);
        }
        Resolved::Forbidden => {
            warn!("Path traversal attempt from {}: {}", peer_addr, path);
            send_error(&mut stream, HttpStatus::Forbidden);
        }
        Resolved::NotFound => {
            info!("File not found for {}: {}", peer_addr, path);
            send_error(&mut stream, HttpStatus::NotFound);
        }
    }
}

/// Maps a decoded request path onto the serving root.
///
/// Targets with `..` components never resolve, even when the result would
/// stay inside the root. Directories resolve to their index file when one
/// exists.
pub fn resolve(root: &Path, target: &str) -> Resolved {
    let relative = target.trim_start_matches('/');

    if Path::new(relative)
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Resolved::Forbidden;
    }

    let path = root.join(relative);

    if path.is_file() {
        return Resolved::File(path);
    }

    if path.is_dir() {
        if !target.ends_with('/') {
            return Resolved::RedirectWithSlash;
        }
        let index = path.join("index.html");
        if index.is_file() {
            return Resolved::File(index);
        }
        return Resolved::Listing(path);
    }

    Resolved::NotFound
}

fn serve_file(stream: &mut TcpStream, path: &Path, is_head: bool, peer_addr: &str) {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!("Error getting metadata for {:?}: {}", path, e);
            send_error(stream, HttpStatus::InternalServerError);
            return;
        }
    };

    let headers = format!(
        "{}Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        HttpStatus::Ok.as_response_line(),
        content_type_for(path),
        metadata.len()
    );

    if is_head {
        if let Err(e) = stream.write_all(headers.as_bytes()) {
            error!("Error sending HEAD response to {}: {}", peer_addr, e);
        }
        return;
    }

    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(e) => {
            error!("Error opening file {:?} for {}: {}", path, peer_addr, e);
            send_error(stream, HttpStatus::InternalServerError);
            return;
        }
    };

    let mut reader = BufReader::new(file);
    let mut writer = BufWriter::new(stream);

    if let Err(e) = writer.write_all(headers.as_bytes()) {
        error!("Error sending headers to {}: {}", peer_addr, e);
        return;
    }

    let mut buffer = [0u8; 8192];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => {
                if let Err(e) = writer.write_all(&buffer[..n]) {
                    error!("Error sending file data to {}: {}", peer_addr, e);
                    return;
                }
            }
            Err(e) => {
                error!("Error reading file for {}: {}", peer_addr, e);
                return;
            }
        }
    }

    if let Err(e) = writer.flush() {
        error!("Error flushing stream for {}: {}", peer_addr, e);
        return;
    }

    info!(
        "Served {:?} to {} ({} bytes)",
        path,
        peer_addr,
        metadata.len()
    );
}

fn serve_listing(stream: &mut TcpStream, dir: &Path, target: &str, is_head: bool, peer_addr: &str) {
    let body = match listing::render(dir, target) {
        Ok(body) => body,
        Err(e) => {
            error!("Error listing directory {:?}: {}", dir, e);
            send_error(stream, HttpStatus::InternalServerError);
            return;
        }
    };

    let headers = format!(
        "{}Content-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        HttpStatus::Ok.as_response_line(),
        body.len()
    );

    let mut response = headers.into_bytes();
    if !is_head {
        response.extend_from_slice(body.as_bytes());
    }

    if let Err(e) = stream.write_all(&response) {
        error!("Error sending listing to {}: {}", peer_addr, e);
        return;
    }

    info!("Served listing of {:?} to {}", dir, peer_addr);
}

fn send_redirect(stream: &mut TcpStream, location: &str) {
    let response = format!(
        "{}Location: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        HttpStatus::MovedPermanently.as_response_line(),
        location
    );

    if let Err(e) = stream.write_all(response.as_bytes()) {
        error!("Error sending redirect: {}", e);
    }
}

fn send_error(stream: &mut TcpStream, status: HttpStatus) {
    let body = format!(
        "<html><body><h1>{} {}</h1></body></html>",
        status.code(),
        status.text()
    );

    let response = format!(
        "{}Content-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status.as_response_line(),
        body.len(),
        body
    );

    if let Err(e) = stream.write_all(response.as_bytes()) {
        error!("Error sending {} response: {}", status.code(), e);
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or("application/octet-stream")
}
