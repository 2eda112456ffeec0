//! A real server on loopback, spoken to over raw HTTP/1.1.

use std::net::SocketAddr;
use tableau_server::{ServerConfig, SiteServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

async fn exchange(addr: SocketAddr, request: String) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8(response).unwrap()
}

fn post(path: &str, body: &str) -> String {
    format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
         Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
}

fn get(path: &str) -> String {
    format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
}

#[tokio::test]
async fn save_poll_and_serve_over_tcp() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("index.html"), "<h1>Tableau</h1>").unwrap();

    let config = ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_root(temp.path());
    let server = SiteServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    let response = exchange(
        addr,
        post(
            "/api/save",
            r#"{"category":"chiefMessages","item":{"author":"Akela","text":"Bonjour"}}"#,
        ),
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with(r#"{"status":"success"}"#), "{response}");

    let response = exchange(addr, get("/api/last-modified")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains(r#""revision":1"#), "{response}");

    let response = exchange(addr, get("/data/db.json?t=1")).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("Akela"), "{response}");

    let response = exchange(addr, get("/")).await;
    assert!(response.contains("<h1>Tableau</h1>"), "{response}");

    let response = exchange(addr, post("/api/save", "{")).await;
    assert!(response.starts_with("HTTP/1.1 400"), "{response}");
    assert!(response.contains(r#""detail":"Invalid JSON"#), "{response}");

    let journal = std::fs::read_to_string(temp.path().join("data/logs.json")).unwrap();
    assert!(journal.contains("message_created"), "{journal}");

    stop.send(()).unwrap();
    serving.await.unwrap().unwrap();
}
