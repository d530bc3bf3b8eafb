use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use siteqa_core::config::{LlmProvider, LlmSettings};
use siteqa_llm::build_generator;

/// Serves one canned HTTP response and returns the raw request text.
async fn one_shot_server(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 16 * 1024];
        let mut req = Vec::new();
        loop {
            let n = sock.read(&mut buf).await.unwrap();
            req.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&req).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let len = text[..head_end]
                    .lines()
                    .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap_or(0)))
                    .unwrap_or(0);
                if req.len() >= head_end + 4 + len { break; }
            }
            if n == 0 { break; }
        }
        let resp = format!("HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}", body.len());
        sock.write_all(resp.as_bytes()).await.unwrap();
        sock.shutdown().await.ok();
        String::from_utf8_lossy(&req).to_string()
    });
    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn ollama_chat_roundtrip() {
    let (url, server) = one_shot_server("200 OK", r#"{"message":{"role":"assistant","content":"line one\nline two"}}"#).await;
    let settings = LlmSettings { provider: LlmProvider::Ollama, base_url: url, model: "llama3".into(), ..Default::default() };
    let generator = build_generator(&settings, Duration::from_secs(5)).unwrap();

    let out = generator.generate("expand this").await.expect("generate");
    assert_eq!(out, "line one\nline two");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/chat"));
    assert!(request.contains("\"stream\":false"));
    assert!(request.contains("expand this"));
}

#[tokio::test]
async fn openai_sends_bearer_and_reads_first_choice() {
    let (url, server) = one_shot_server("200 OK", r#"{"choices":[{"message":{"content":"Founded in 1970."}}]}"#).await;
    let settings = LlmSettings { provider: LlmProvider::OpenAi, base_url: url, model: "gpt".into(), api_key: Some("sk-test".into()), ..Default::default() };
    let generator = build_generator(&settings, Duration::from_secs(5)).unwrap();

    assert_eq!(generator.generate("q").await.unwrap(), "Founded in 1970.");
    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let (url, _server) = one_shot_server("500 Internal Server Error", r#"{"error":"boom"}"#).await;
    let settings = LlmSettings { provider: LlmProvider::Ollama, base_url: url, ..Default::default() };
    let generator = build_generator(&settings, Duration::from_secs(5)).unwrap();
    let err = generator.generate("q").await.unwrap_err();
    assert!(err.to_string().contains("500"));
}
