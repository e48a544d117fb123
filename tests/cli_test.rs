use std::{future::pending, process::Stdio, time::Duration};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::TcpListener,
    process::{Child, Command},
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn spawn_bridge(url: &str) -> Child {
    Command::new(env!("CARGO_BIN_EXE_mcp-sse-bridge"))
        .arg("--no-traffic-log")
        .arg(url)
        .env("RUST_LOG", "info")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap()
}

#[tokio::test]
async fn test_process_exits_when_server_closes_with_stdin_open() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(
                    "event: endpoint\ndata: /message?sessionId=1\n\n\
                     data: {\"jsonrpc\":\"2.0\",\"id\":1}\n\n",
                ),
        )
        .mount(&server)
        .await;

    let mut child = spawn_bridge(&server.uri());
    // Held open until the end of the test.
    let _stdin = child.stdin.take().unwrap();

    let output = tokio::time::timeout(Duration::from_secs(10), child.wait_with_output())
        .await
        .expect("bridge should exit once the server closes the stream")
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "{\"jsonrpc\":\"2.0\",\"id\":1}\n"
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_process_exits_on_sigterm_with_stdin_open() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut head = [0u8; 1024];
                let _ = stream.read(&mut head).await;
                stream
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n\
                          event: endpoint\ndata: /message?sessionId=2\n\n\
                          data: {\"ready\":true}\n\n",
                    )
                    .await
                    .unwrap();
                stream.flush().await.unwrap();
                pending::<()>().await;
            });
        }
    });

    let mut child = spawn_bridge(&format!("http://{}", addr));
    let stdin = child.stdin.take().unwrap();

    let mut stdout = BufReader::new(child.stdout.take().unwrap());
    let mut first = String::new();
    tokio::time::timeout(Duration::from_secs(10), stdout.read_line(&mut first))
        .await
        .expect("bridge should relay the first event")
        .unwrap();
    assert_eq!(first, "{\"ready\":true}\n");

    // Give the bridge time to install its signal handlers.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let pid = child.id().unwrap();
    let killed = std::process::Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .unwrap();
    assert!(killed.success());

    let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("bridge should exit on SIGTERM")
        .unwrap();
    assert!(status.success());
    drop(stdin);
}
