//! Minimal HTTP/1.1 storage server for integration tests.
//!
//! Implements `POST api/storage/upload` (multipart: index, chunkSize, chunkFile)
//! and `POST api/storage/patch` (JSON: filename, fileList, md5). Chunks are
//! kept in memory; a verifying patch concatenates them in `fileList` order and
//! compares the MD5.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How the server answers the patch call.
#[derive(Debug, Clone, Copy)]
pub enum PatchMode {
    /// Reassemble and verify the MD5; `data: true` on match, business error otherwise.
    Verify,
    /// Always reply `code: 200` with this `data`.
    Reply(bool),
    /// Always reply with a business error carrying this message.
    Business(&'static str),
    /// Always reply with this HTTP status and no envelope.
    Status(u16),
}

#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Chunk index whose upload gets HTTP 500.
    pub fail_chunk_index: Option<usize>,
    pub patch: PatchMode,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            fail_chunk_index: None,
            patch: PatchMode::Verify,
        }
    }
}

#[derive(Default)]
struct State {
    chunks: Mutex<HashMap<String, Vec<u8>>>,
    next_id: AtomicUsize,
    uploads: AtomicUsize,
    patches: Mutex<Vec<serde_json::Value>>,
    assembled: Mutex<Option<Vec<u8>>>,
}

pub struct StorageServer {
    pub url: String,
    state: Arc<State>,
}

impl StorageServer {
    /// Upload requests received (including failed ones).
    pub fn upload_count(&self) -> usize {
        self.state.uploads.load(Ordering::SeqCst)
    }

    /// Bodies of patch requests received, in arrival order.
    pub fn patch_requests(&self) -> Vec<serde_json::Value> {
        self.state.patches.lock().unwrap().clone()
    }

    /// Bytes of the last verified reassembly.
    pub fn assembled(&self) -> Option<Vec<u8>> {
        self.state.assembled.lock().unwrap().clone()
    }
}

/// Starts a server in a background thread. It runs until the process exits.
pub fn start(opts: ServerOptions) -> StorageServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(State::default());
    let st = Arc::clone(&state);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let st = Arc::clone(&st);
            thread::spawn(move || handle(stream, &st, opts));
        }
    });
    StorageServer {
        url: format!("http://127.0.0.1:{}/", port),
        state,
    }
}

struct Request {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn handle(mut stream: TcpStream, state: &State, opts: ServerOptions) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let req = match read_request(&mut stream) {
        Some(r) => r,
        None => return,
    };
    if req.method != "POST" {
        write_status(&mut stream, "405 Method Not Allowed");
        return;
    }
    match req.path.as_str() {
        "/api/storage/upload" => handle_upload(&mut stream, state, opts, &req),
        "/api/storage/patch" => handle_patch(&mut stream, state, opts, &req),
        _ => write_status(&mut stream, "404 Not Found"),
    }
}

fn handle_upload(stream: &mut TcpStream, state: &State, opts: ServerOptions, req: &Request) {
    state.uploads.fetch_add(1, Ordering::SeqCst);
    let boundary = match req
        .header("content-type")
        .and_then(|ct| ct.split("boundary=").nth(1))
    {
        Some(b) => b.trim().trim_matches('"').to_string(),
        None => return write_status(stream, "400 Bad Request"),
    };
    let parts = parse_multipart(&req.body, &boundary);
    let field = |name: &str| parts.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone());
    let (index, chunk_size, chunk) = match (field("index"), field("chunkSize"), field("chunkFile")) {
        (Some(i), Some(s), Some(c)) => (i, s, c),
        _ => return write_status(stream, "400 Bad Request"),
    };
    let index: usize = String::from_utf8_lossy(&index).parse().unwrap_or(usize::MAX);
    let chunk_size: usize = String::from_utf8_lossy(&chunk_size).parse().unwrap_or(0);
    if opts.fail_chunk_index == Some(index) {
        return write_status(stream, "500 Internal Server Error");
    }
    if chunk_size != chunk.len() {
        return write_json(stream, &business("chunk已损坏"));
    }
    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    let filename = format!("{:08x}-{}", id, index);
    state.chunks.lock().unwrap().insert(filename.clone(), chunk);
    write_json(
        stream,
        &serde_json::json!({"code": 200, "msg": "请求成功", "data": {"filename": filename}}),
    );
}

fn handle_patch(stream: &mut TcpStream, state: &State, opts: ServerOptions, req: &Request) {
    let body: serde_json::Value = match serde_json::from_slice(&req.body) {
        Ok(v) => v,
        Err(_) => return write_json(stream, &business("参数解析错误")),
    };
    state.patches.lock().unwrap().push(body.clone());
    match opts.patch {
        PatchMode::Reply(b) => write_json(stream, &serde_json::json!({"code": 200, "msg": "", "data": b})),
        PatchMode::Business(msg) => write_json(stream, &business(msg)),
        PatchMode::Status(code) => write_status(stream, &format!("{} Test Status", code)),
        PatchMode::Verify => {
            let chunks = state.chunks.lock().unwrap();
            let mut out = Vec::new();
            for name in body["fileList"].as_array().cloned().unwrap_or_default() {
                match name.as_str().and_then(|n| chunks.get(n)) {
                    Some(bytes) => out.extend_from_slice(bytes),
                    None => return write_json(stream, &business("分片不存在")),
                }
            }
            let md5 = chunkup_core::checksum::md5_reader(&out[..], 4096).unwrap();
            if Some(md5.as_str()) != body["md5"].as_str() {
                return write_json(stream, &business("文件已损坏"));
            }
            *state.assembled.lock().unwrap() = Some(out);
            write_json(stream, &serde_json::json!({"code": 200, "msg": "请求成功", "data": true}));
        }
    }
}

fn business(msg: &str) -> serde_json::Value {
    serde_json::json!({"code": 1000, "msg": msg, "data": {"path": "/api/storage/patch"}})
}

fn write_status(stream: &mut TcpStream, status: &str) {
    let _ = stream.write_all(
        format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status).as_bytes(),
    );
}

fn write_json(stream: &mut TcpStream, value: &serde_json::Value) {
    let body = serde_json::to_vec(value).unwrap();
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 16 * 1024];
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();
    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut tmp).ok()?;
        if n == 0 {
            return None;
        }
        body.extend_from_slice(&tmp[..n]);
    }
    body.truncate(content_length);
    Some(Request {
        method,
        path,
        headers,
        body,
    })
}

/// Returns (field name, content) for each part of a multipart/form-data body.
fn parse_multipart(body: &[u8], boundary: &str) -> Vec<(String, Vec<u8>)> {
    let delim = format!("--{}", boundary).into_bytes();
    let mut parts = Vec::new();
    let mut rest = body;
    while let Some(start) = find(rest, &delim) {
        rest = &rest[start + delim.len()..];
        if rest.starts_with(b"--") {
            break;
        }
        let next = match find(rest, &delim) {
            Some(n) => n,
            None => break,
        };
        let part = &rest[..next];
        let part = part.strip_prefix(b"\r\n").unwrap_or(part);
        let part = part.strip_suffix(b"\r\n").unwrap_or(part);
        if let Some(h) = find(part, b"\r\n\r\n") {
            let headers = String::from_utf8_lossy(&part[..h]);
            let name = headers
                .split("name=\"")
                .nth(1)
                .and_then(|s| s.split('"').next())
                .unwrap_or("")
                .to_string();
            parts.push((name, part[h + 4..].to_vec()));
        }
    }
    parts
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
