//! Loopback HTTP/1.1 responder for exercising the provider clients

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned reply for requests whose target starts with `prefix`
pub struct Route {
    prefix: &'static str,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Route {
    pub fn json(prefix: &'static str, body: &str) -> Self {
        Self {
            prefix,
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn html(prefix: &'static str, body: &str) -> Self {
        Self {
            content_type: "text/html; charset=utf-8",
            ..Self::json(prefix, body)
        }
    }

    pub fn bytes(prefix: &'static str, content_type: &'static str, body: &[u8]) -> Self {
        Self {
            prefix,
            status: 200,
            content_type,
            body: body.to_vec(),
        }
    }

    pub fn status(prefix: &'static str, status: u16) -> Self {
        Self {
            status,
            ..Self::json(prefix, "{}")
        }
    }
}

/// One request as seen by the server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub target: String,
    pub body: String,
}

pub struct FakeHttp {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeHttp {
    /// Serve `routes` on an ephemeral loopback port; unmatched targets get 404
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let routes = Arc::new(routes);
        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let seen = Arc::clone(&seen);
                tokio::spawn(async move { respond(stream, &routes, &seen).await });
            }
        });

        Self { base_url, requests }
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn targets(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.target).collect()
    }
}

async fn respond(mut stream: TcpStream, routes: &[Route], seen: &Mutex<Vec<Recorded>>) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };

    let route = routes.iter().find(|r| request.target.starts_with(r.prefix));
    seen.lock().unwrap().push(request);

    let (status, content_type, body) = route.map_or((404, "text/plain", &b"not found"[..]), |r| {
        (r.status, r.content_type, r.body.as_slice())
    });
    let head = format!(
        "HTTP/1.1 {status} Fake\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );

    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(body).await;
    let _ = stream.shutdown().await;
}

/// Read the request head and a `Content-Length` body
async fn read_request(stream: &mut TcpStream) -> Option<Recorded> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    Some(Recorded {
        method: request_line.next()?.to_string(),
        target: request_line.next()?.to_string(),
        body: String::from_utf8_lossy(&buf[head_end..]).into_owned(),
    })
}
