//! Drives a real server over a real socket: bind on an OS-assigned port, send
//! raw HTTP, assert on status lines and bodies.

use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use agon_web_serve::server::HttpServer;
use agon_web_serve::server::config::ServerConfig;

struct TestServer {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    _keep: tempfile::TempDir,
}

impl TestServer {
    /// Serves `root` on an OS-assigned port; `keep` holds the scratch tree
    /// alive for the test's duration.
    fn start(keep: tempfile::TempDir, root: PathBuf) -> Self {
        let config = ServerConfig { port: 0 };
        let server = HttpServer::bind(&config, root).expect("bind server");
        let addr = server.local_addr().expect("local addr");

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::spawn(move || server.run_until(&stop_flag));

        TestServer {
            addr,
            stop,
            handle: Some(handle),
            _keep: keep,
        }
    }

    /// Sends a raw request and returns the full response as text.
    fn request(&self, raw: &str) -> String {
        let mut stream = TcpStream::connect(self.addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream
            .set_write_timeout(Some(Duration::from_secs(5)))
            .unwrap();

        stream.write_all(raw.as_bytes()).expect("send request");
        stream.flush().expect("flush request");

        let mut response = String::new();
        stream.read_to_string(&mut response).expect("read response");
        response
    }

    fn get(&self, path: &str) -> String {
        self.request(&format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn body_of(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(position) => &response[position + 4..],
        None => "",
    }
}

/// hello.txt, assets/app.js, docs/index.html under a fresh root.
fn scratch_server() -> TestServer {
    let keep = tempfile::tempdir().expect("tempdir");
    let root = keep.path().to_path_buf();
    fs::write(root.join("hello.txt"), "hello from the vdp").unwrap();
    fs::create_dir(root.join("assets")).unwrap();
    fs::write(root.join("assets/app.js"), "console.log(1);").unwrap();
    fs::create_dir(root.join("docs")).unwrap();
    fs::write(root.join("docs/index.html"), "<p>docs index</p>").unwrap();
    TestServer::start(keep, root)
}

#[test]
fn serves_existing_file_with_exact_content() {
    let server = scratch_server();
    let response = server.get("/hello.txt");

    assert!(response.contains("200 OK"), "response: {}", response);
    assert!(response.contains("Content-Type: text/plain"));
    assert_eq!(body_of(&response), "hello from the vdp");
}

#[test]
fn serves_nested_file_with_content_type() {
    let server = scratch_server();
    let response = server.get("/assets/app.js");

    assert!(response.contains("200 OK"));
    assert!(response.contains("Content-Type: application/javascript"));
    assert_eq!(body_of(&response), "console.log(1);");
}

#[test]
fn missing_file_is_404() {
    let server = scratch_server();
    let response = server.get("/nonexistent.html");

    assert!(response.contains("404 Not Found"), "response: {}", response);
}

#[test]
fn traversal_never_escapes_the_root() {
    // the secret sits one level above the serving root
    let keep = tempfile::tempdir().expect("tempdir");
    fs::write(keep.path().join("secret.txt"), "top secret").unwrap();
    let root = keep.path().join("public");
    fs::create_dir(&root).unwrap();
    fs::write(root.join("index.html"), "<p>public</p>").unwrap();
    let server = TestServer::start(keep, root);

    for target in ["/../secret.txt", "/%2e%2e/secret.txt", "/a/../../secret.txt"] {
        let response = server.get(target);
        assert!(response.contains("403 Forbidden"), "target {}: {}", target, response);
        assert!(!response.contains("top secret"), "target {} leaked", target);
    }
}

#[test]
fn directory_with_index_serves_index() {
    let server = scratch_server();
    let response = server.get("/docs/");

    assert!(response.contains("200 OK"));
    assert_eq!(body_of(&response), "<p>docs index</p>");
}

#[test]
fn directory_without_index_lists_entries() {
    let server = scratch_server();
    let response = server.get("/");

    assert!(response.contains("200 OK"));
    let body = body_of(&response);
    assert!(body.contains("Directory listing for /"), "body: {}", body);
    assert!(body.contains("hello.txt"));
    assert!(body.contains("assets/"));
    assert!(body.contains("docs/"));
}

#[test]
fn directory_without_trailing_slash_redirects() {
    let server = scratch_server();
    let response = server.get("/assets");

    assert!(response.contains("301 Moved Permanently"), "response: {}", response);
    assert!(response.contains("Location: /assets/"));
}

#[test]
fn head_returns_headers_without_body() {
    let server = scratch_server();
    let response = server.request("HEAD /hello.txt HTTP/1.1\r\nHost: localhost\r\n\r\n");

    assert!(response.contains("200 OK"));
    assert!(response.contains("Content-Length: 18"));
    assert_eq!(body_of(&response), "");
}

#[test]
fn unsupported_method_is_405() {
    let server = scratch_server();
    let response = server.request("DELETE /hello.txt HTTP/1.1\r\nHost: localhost\r\n\r\n");

    assert!(response.contains("405 Method Not Allowed"));
}

#[test]
fn malformed_request_line_is_400() {
    let server = scratch_server();
    let response = server.request("garbage\r\n\r\n");

    assert!(response.contains("400 Bad Request"));
}

#[test]
fn query_string_does_not_select_a_different_file() {
    let server = scratch_server();
    let response = server.get("/hello.txt?v=12345");

    assert!(response.contains("200 OK"));
    assert_eq!(body_of(&response), "hello from the vdp");
}

#[test]
fn percent_encoded_paths_resolve() {
    let keep = tempfile::tempdir().expect("tempdir");
    let root = keep.path().to_path_buf();
    fs::write(root.join("a b.txt"), "spaced").unwrap();
    let server = TestServer::start(keep, root);

    let response = server.get("/a%20b.txt");

    assert!(response.contains("200 OK"), "response: {}", response);
    assert_eq!(body_of(&response), "spaced");
}

#[test]
fn sequential_requests_keep_the_listener_available() {
    let server = scratch_server();
    for _ in 0..5 {
        let response = server.get("/hello.txt");
        assert!(response.contains("200 OK"));
    }
}
