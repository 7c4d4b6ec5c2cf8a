//! Minimal HTTP/1.1 server standing in for both ends of a migration.
//!
//! Serves the GraphQL admin API (`POST /graphql`: createSession + paged images),
//! asset bytes (`GET /img/<name>`, status configurable per name), and the
//! destination upload endpoint (`POST /upload?imageId=<id>`, multipart, can be
//! told to fail a given id a number of times). Every request is counted.

use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "s3cret";
pub const SESSION_TOKEN: &str = "session-token-1";
pub const UPLOAD_TOKEN: &str = "static-upload-token";

/// One accepted upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: String,
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Default)]
struct State {
    nodes: Vec<Value>,
    page_requests: Vec<(u64, u64)>,
    image_status: HashMap<String, u32>,
    image_gets: HashMap<String, usize>,
    upload_failures: HashMap<String, usize>,
    uploads: Vec<Upload>,
    rejected_uploads: usize,
}

/// Handle to a running server. The server thread runs until the process exits.
#[derive(Clone)]
pub struct TestBackend {
    base: String,
    state: Arc<Mutex<State>>,
}

impl TestBackend {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.base)
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.base)
    }

    pub fn image_url(&self, name: &str) -> String {
        format!("{}/img/{}", self.base, name)
    }

    /// Catalog content as `(id, image name, createdAt)`, already in catalog order.
    pub fn set_catalog(&self, items: &[(String, String, String)]) {
        let nodes = items
            .iter()
            .map(|(id, name, created)| json!({ "id": id, "url": self.image_url(name), "createdAt": created }))
            .collect();
        self.state.lock().unwrap().nodes = nodes;
    }

    pub fn set_image_status(&self, name: &str, status: u32) {
        self.state
            .lock()
            .unwrap()
            .image_status
            .insert(format!("/img/{}", name), status);
    }

    /// Answer 500 to the next `times` uploads for `id`.
    pub fn fail_uploads(&self, id: &str, times: usize) {
        self.state
            .lock()
            .unwrap()
            .upload_failures
            .insert(id.to_string(), times);
    }

    pub fn image_get_count(&self) -> usize {
        self.state.lock().unwrap().image_gets.values().sum()
    }

    pub fn page_requests(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().page_requests.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn rejected_uploads(&self) -> usize {
        self.state.lock().unwrap().rejected_uploads
    }
}

struct Request {
    method: String,
    target: String,
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

    fn bearer(&self) -> Option<&str> {
        self.header("authorization")?.strip_prefix("Bearer ")
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(req) = read_request(&mut stream) else {
        return;
    };
    let (status, body) = route(&req, state);
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}

fn route(req: &Request, state: &Mutex<State>) -> (u32, Vec<u8>) {
    let (path, query) = req.target.split_once('?').unwrap_or((req.target.as_str(), ""));
    match (req.method.as_str(), path) {
        ("POST", "/graphql") => graphql(req, state),
        ("GET", p) if p.starts_with("/img/") => {
            let mut st = state.lock().unwrap();
            *st.image_gets.entry(p.to_string()).or_default() += 1;
            match st.image_status.get(p).copied().unwrap_or(200) {
                200 => (200, format!("bytes of {}", p).into_bytes()),
                code => (code, b"{}".to_vec()),
            }
        }
        ("POST", "/upload") => upload(req, query, state),
        _ => (404, b"{}".to_vec()),
    }
}

fn graphql(req: &Request, state: &Mutex<State>) -> (u32, Vec<u8>) {
    let Ok(doc) = serde_json::from_slice::<Value>(&req.body) else {
        return (400, b"{}".to_vec());
    };
    let query = doc["query"].as_str().unwrap_or("");
    let vars = &doc["variables"];
    if query.contains("createSession") {
        if vars["email"] == ADMIN_EMAIL && vars["password"] == ADMIN_PASSWORD {
            let resp = json!({ "data": { "createSession": { "token": SESSION_TOKEN } } });
            return (200, resp.to_string().into_bytes());
        }
        let resp = json!({ "data": null, "errors": [{ "message": "invalid credentials" }] });
        return (200, resp.to_string().into_bytes());
    }
    if query.contains("images(") {
        if req.bearer() != Some(SESSION_TOKEN) {
            return (401, b"{}".to_vec());
        }
        let take = vars["take"].as_u64().unwrap_or(0);
        let skip = vars["skip"].as_u64().unwrap_or(0);
        let mut st = state.lock().unwrap();
        st.page_requests.push((skip, take));
        let nodes: Vec<Value> = st
            .nodes
            .iter()
            .skip(skip as usize)
            .take(take as usize)
            .cloned()
            .collect();
        let resp = json!({ "data": { "images": { "nodes": nodes } } });
        return (200, resp.to_string().into_bytes());
    }
    (400, b"{}".to_vec())
}

fn upload(req: &Request, query: &str, state: &Mutex<State>) -> (u32, Vec<u8>) {
    if req.bearer() != Some(UPLOAD_TOKEN) {
        return (401, b"{}".to_vec());
    }
    let id = query
        .split('&')
        .find_map(|kv| kv.strip_prefix("imageId="))
        .unwrap_or("")
        .to_string();
    let mut guard = state.lock().unwrap();
    let st = &mut *guard;
    if let Some(left) = st.upload_failures.get_mut(&id) {
        if *left > 0 {
            *left -= 1;
            st.rejected_uploads += 1;
            return (500, br#"{"error":"storage backend down"}"#.to_vec());
        }
    }
    let (filename, content) = multipart_file(&req.body).unwrap_or_default();
    st.uploads.push(Upload {
        id: id.clone(),
        filename,
        content,
    });
    (200, json!({ "id": id, "stored": true }).to_string().into_bytes())
}

/// Filename and content of the first file part.
fn multipart_file(body: &[u8]) -> Option<(String, Vec<u8>)> {
    let text = String::from_utf8_lossy(body);
    let start = text.find("filename=\"")? + "filename=\"".len();
    let end = start + text[start..].find('"')?;
    let filename = text[start..end].to_string();

    let data_start = find(body, b"\r\n\r\n", end)? + 4;
    let data_end = find(body, b"\r\n--", data_start)?;
    Some((filename, body[data_start..data_end].to_vec()))
}

fn find(hay: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    hay.get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n", 0) {
            break pos;
        }
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.lines();
    let mut first = lines.next()?.split_whitespace();
    let method = first.next()?.to_string();
    let target = first.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let mut req = Request {
        method,
        target,
        headers,
        body: buf[head_end + 4..].to_vec(),
    };

    if req
        .header("expect")
        .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"))
    {
        stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").ok()?;
    }

    if let Some(len) = req.header("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while req.body.len() < len {
            let n = stream.read(&mut chunk).ok()?;
            if n == 0 {
                break;
            }
            req.body.extend_from_slice(&chunk[..n]);
        }
    } else if req
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        while !req.body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).ok()?;
            if n == 0 {
                break;
            }
            req.body.extend_from_slice(&chunk[..n]);
        }
        req.body = dechunk(&req.body);
    }
    Some(req)
}

fn dechunk(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(line_end) = find(raw, b"\r\n", pos) {
        let size_text = String::from_utf8_lossy(&raw[pos..line_end]).to_string();
        let size = usize::from_str_radix(size_text.split(';').next().unwrap_or("0").trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        let end = (start + size).min(raw.len());
        out.extend_from_slice(&raw[start..end]);
        pos = end + 2;
    }
    out
}
