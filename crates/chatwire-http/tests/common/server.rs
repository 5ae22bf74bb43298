//! Scripted HTTP/1.1 server for end-to-end tests.
//!
//! Serves one request per connection with canned responses keyed by method
//! and path, and records what it received.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Body of a canned response.
#[derive(Clone)]
pub enum Reply {
    Json(u16, Value),
    /// Chunked `text/event-stream` body, one HTTP chunk per entry.
    Events(Vec<String>),
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: String,
    pub target: String,
    /// Header block, lowercased.
    pub headers: String,
    pub body: String,
}

impl Received {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

type Routes = Arc<Vec<(String, String, Reply)>>;

pub struct TestServer {
    pub base_url: String,
    received: Arc<Mutex<Vec<Received>>>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, &str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes: Routes = Arc::new(
            routes
                .into_iter()
                .map(|(m, p, r)| (m.to_string(), p.to_string(), r))
                .collect(),
        );
        let received = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&received);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let seen = Arc::clone(&seen);
                tokio::spawn(async move { serve(socket, &routes, &seen).await });
            }
        });

        Self {
            base_url: format!("http://{addr}/api"),
            received,
        }
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }
}

async fn serve(mut socket: TcpStream, routes: &Routes, seen: &Mutex<Vec<Received>>) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let path = request.target.split('?').next().unwrap_or_default().to_string();
    let reply = routes
        .iter()
        .find(|(method, route, _)| *method == request.method && *route == path)
        .map(|(_, _, reply)| reply.clone());
    seen.lock().unwrap().push(request);

    match reply {
        Some(Reply::Json(status, body)) => write_json(&mut socket, status, &body).await,
        Some(Reply::Events(chunks)) => write_events(&mut socket, &chunks).await,
        None => write_json(&mut socket, 404, &serde_json::json!({"detail": "no route"})).await,
    }
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Received> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers = head.to_lowercase();

    let length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

    Some(Received {
        method,
        target,
        headers,
        body,
    })
}

async fn write_json(socket: &mut TcpStream, status: u16, body: &Value) {
    let body = body.to_string();
    let head = format!(
        "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        body.len()
    );
    let _ = socket.write_all(head.as_bytes()).await;
    let _ = socket.write_all(body.as_bytes()).await;
}

async fn write_events(socket: &mut TcpStream, chunks: &[String]) {
    let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\nconnection: close\r\n\r\n";
    let _ = socket.write_all(head.as_bytes()).await;
    for chunk in chunks {
        let framed = format!("{:x}\r\n{chunk}\r\n", chunk.len());
        let _ = socket.write_all(framed.as_bytes()).await;
        let _ = socket.flush().await;
    }
    let _ = socket.write_all(b"0\r\n\r\n").await;
}
