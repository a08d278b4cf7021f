//! Minimal HTTP/1.1 stub that serves canned responses in order.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned response: HTTP status and JSON body.
pub type Reply = (u16, String);

pub struct HttpStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    server: JoinHandle<()>,
}

impl HttpStub {
    /// Serve `replies` in order, repeating the last one once exhausted.
    pub async fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);
        let mut replies: VecDeque<Reply> = replies.into();

        let server = tokio::spawn(async move {
            let mut last: Option<Reply> = None;
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                log.lock().push(request_target(&request));

                let (status, body) = match replies.pop_front() {
                    Some(reply) => {
                        last = Some(reply.clone());
                        reply
                    }
                    None => last.clone().unwrap_or((404, "{}".to_string())),
                };
                let response = format!(
                    "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    reason(status),
                    body.len(),
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            base_url: format!("http://{addr}"),
            requests,
            server,
        }
    }

    /// Request targets (path and query) seen so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().len()
    }
}

impl Drop for HttpStub {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            break;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn request_target(request: &str) -> String {
    request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

/// JSON for one game with a single bookmaker quoting the moneyline.
pub fn game_json(id: &str, home_price: i32, away_price: i32) -> String {
    format!(
        r#"{{
            "id": "{id}",
            "sport_key": "basketball_nba",
            "commence_time": "2026-01-05T00:10:00Z",
            "home_team": "Lakers",
            "away_team": "Celtics",
            "bookmakers": [{{
                "key": "draftkings",
                "title": "DraftKings",
                "markets": [{{
                    "key": "h2h",
                    "outcomes": [
                        {{"name": "Lakers", "price": {home_price}}},
                        {{"name": "Celtics", "price": {away_price}}}
                    ]
                }}]
            }}]
        }}"#
    )
}

pub fn odds_body(games: &[String]) -> String {
    format!(
        r#"{{"status":"success","sport":"basketball_nba","count":{},"games":[{}],"cached":false}}"#,
        games.len(),
        games.join(",")
    )
}
