//! Text-ask requests against a mocked speech proxy

mod common;

use common::{pcm16_wav, wav_bytes};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use voxwire_core::client::{
    ACCURATE_MODE, NO_RESPONSE_MESSAGE, SOUND_WAVE_FAILED_MESSAGE, WAV_PARSE_FAILED_MESSAGE,
};
use voxwire_core::{Outcome, ProxyClient, ProxyConfig, ProxyError, RuntimeManager};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ProxyClient {
    ProxyClient::new(ProxyConfig::new(server.uri())).expect("valid config")
}

async fn mount_audio(server: &MockServer, body: Vec<u8>) {
    Mock::given(method("POST"))
        .and(path("/text-ask"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "audio/wav"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_success_yields_playable_wave() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/text-ask"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "text": "Hello there", "mode": "fast" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(pcm16_wav(1, 24_000, &[10, 20, 30]), "audio/wav"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let outcome = client.text_ask_fast("Hello there").wait().await;

    let Outcome::Success { wave, status_code } = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(status_code, 200);
    assert_eq!(wave.sample_rate(), 24_000);
    assert_eq!(wave.num_channels(), 1);
    assert_eq!(wave.available_bytes(), 6);
}

#[tokio::test]
async fn test_empty_mode_defaults_to_fast() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "text": "hi", "mode": "fast" })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pcm16_wav(1, 16_000, &[1]), "audio/wav"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server).text_ask("hi", "").wait().await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_mode_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "text": "careful now", "mode": ACCURATE_MODE })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pcm16_wav(2, 22_050, &[1, 2]), "audio/wav"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .text_ask("careful now", ACCURATE_MODE)
        .wait()
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_identity_headers_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Client-Token", "dev-token"))
        .and(header("X-Session-Id", "npc-42"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pcm16_wav(1, 16_000, &[1]), "audio/wav"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProxyConfig::new(server.uri())
        .with_client_token("dev-token")
        .with_session_id("npc-42");
    let client = ProxyClient::new(config).unwrap();

    assert!(client.text_ask_fast("hello").wait().await.is_success());
}

#[tokio::test]
async fn test_identity_headers_omitted_when_empty() {
    let server = MockServer::start().await;
    mount_audio(&server, pcm16_wav(1, 16_000, &[1])).await;

    let client = client_for(&server);
    assert!(client.text_ask_fast("hello").wait().await.is_success());

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("x-client-token").is_none());
    assert!(requests[0].headers.get("x-session-id").is_none());
}

#[tokio::test]
async fn test_generated_session_id_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header_exists("X-Session-Id"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pcm16_wav(1, 16_000, &[1]), "audio/wav"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProxyClient::new(ProxyConfig::new(server.uri()).with_generated_session_id()).unwrap();
    assert!(client.text_ask_fast("hello").wait().await.is_success());
}

#[tokio::test]
async fn test_non_wav_body_is_415() {
    let server = MockServer::start().await;
    mount_audio(&server, b"definitely not a riff container, just some text".to_vec()).await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert!(matches!(outcome, Outcome::ProtocolError { status_code: 415, .. }));
    assert_eq!(outcome.message(), Some(WAV_PARSE_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_empty_body_is_415() {
    let server = MockServer::start().await;
    mount_audio(&server, Vec::new()).await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert_eq!(outcome.status_code(), 415);
}

#[tokio::test]
async fn test_three_channels_is_500() {
    let server = MockServer::start().await;
    mount_audio(&server, wav_bytes(1, 3, 16_000, 16, &[0; 12])).await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert!(matches!(outcome, Outcome::ProtocolError { status_code: 500, .. }));
    assert_eq!(outcome.message(), Some(SOUND_WAVE_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_zero_sample_rate_is_500() {
    let server = MockServer::start().await;
    mount_audio(&server, wav_bytes(1, 1, 0, 16, &[0; 8])).await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert!(matches!(outcome, Outcome::ProtocolError { status_code: 500, .. }));
    assert_eq!(outcome.message(), Some(SOUND_WAVE_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_empty_data_chunk_is_500() {
    let server = MockServer::start().await;
    mount_audio(&server, pcm16_wav(1, 16_000, &[])).await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert!(matches!(outcome, Outcome::ProtocolError { status_code: 500, .. }));
    assert_eq!(outcome.message(), Some(SOUND_WAVE_FAILED_MESSAGE));
}

#[tokio::test]
async fn test_json_error_body_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(404).set_body_raw(r#"{"error":"not found"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert!(matches!(outcome, Outcome::ProtocolError { status_code: 404, .. }));
    assert_eq!(outcome.message(), Some(r#"{"error":"not found"}"#));
}

#[tokio::test]
async fn test_plain_error_body_is_summarized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert_eq!(outcome.message(), Some("HTTP 404 (non-OK)"));
    assert_eq!(outcome.status_code(), 404);
}

#[tokio::test]
async fn test_server_error_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let outcome = client_for(&server).text_ask_fast("hi").wait().await;
    assert_eq!(outcome.message(), Some("HTTP 503 (non-OK)"));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Bind and release a port so nothing is listening on it.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = ProxyClient::new(ProxyConfig::new(format!("http://{addr}"))).unwrap();

    let outcome = client.text_ask_fast("hi").wait().await;
    assert!(matches!(outcome, Outcome::TransportError { status_code: 0, .. }));
    assert_eq!(outcome.message(), Some(NO_RESPONSE_MESSAGE));
    assert!(outcome.into_result().unwrap_err().is_retriable());
}

#[tokio::test]
async fn test_empty_text_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = client_for(&server).text_ask("", "fast").wait().await;
    assert!(matches!(outcome, Outcome::TransportError { status_code: 0, .. }));
    assert_eq!(outcome.message(), Some("TextAsk: empty text"));
}

#[tokio::test]
async fn test_delegates_fire_once_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "text": "good", "mode": "fast" })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(pcm16_wav(1, 16_000, &[5, 6]), "audio/wav"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "text": "bad", "mode": "fast" })))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let done = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second"] {
        let done = Arc::clone(&done);
        client.on_text_ask_done().subscribe(move |event| {
            done.lock().push((tag, event.status_code, event.wave.available_bytes()));
        });
    }
    let sink = Arc::clone(&errors);
    client.on_error().subscribe(move |e: &ProxyError| sink.lock().push(e.clone()));

    assert!(client.text_ask_fast("good").wait().await.is_success());
    assert!(!client.text_ask_fast("bad").wait().await.is_success());

    assert_eq!(*done.lock(), vec![("first", 200, 4), ("second", 200, 4)]);
    assert_eq!(
        *errors.lock(),
        vec![ProxyError {
            message: "HTTP 502 (non-OK)".to_string(),
            status_code: 502,
        }]
    );
}

#[tokio::test]
async fn test_concurrent_requests_resolve_independently() {
    let server = MockServer::start().await;
    mount_audio(&server, pcm16_wav(1, 16_000, &[1, 2, 3, 4])).await;

    let client = client_for(&server);
    let pending: Vec<_> = (0..8).map(|i| client.text_ask_fast(&format!("line {i}"))).collect();

    for ask in pending {
        assert_eq!(ask.wait().await.status_code(), 200);
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 8);
}

#[tokio::test]
async fn test_dropped_pending_still_notifies() {
    let server = MockServer::start().await;
    mount_audio(&server, pcm16_wav(1, 16_000, &[1])).await;

    let client = client_for(&server);
    let (tx, rx) = tokio::sync::oneshot::channel();
    let tx = Mutex::new(Some(tx));
    client.on_text_ask_done().subscribe(move |event| {
        if let Some(tx) = tx.lock().take() {
            let _ = tx.send(event.status_code);
        }
    });

    drop(client.text_ask_fast("fire and forget"));
    assert_eq!(rx.await.unwrap(), 200);
}

#[test]
fn test_request_from_thread_without_runtime() {
    let server = RuntimeManager::global().unwrap().block_on(MockServer::start());
    RuntimeManager::global()
        .unwrap()
        .block_on(mount_audio(&server, pcm16_wav(2, 44_100, &[1, 2, 3, 4])));

    let client = ProxyClient::new(ProxyConfig::new(server.uri())).unwrap();
    let outcome = tokio_test::block_on(client.text_ask_fast("from the game thread").wait());

    assert_eq!(outcome.wave().map(|w| w.available_bytes()), Some(8));
}
