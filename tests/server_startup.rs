//! Server Startup Tests
//!
//! Router wiring, connection limits and media stream behavior when the
//! gateway runs without provider credentials.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::connect_info::MockConnectInfo;
use axum::{Router, body::Body, http::Request, http::StatusCode};
use futures::StreamExt;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tower::util::ServiceExt;

use listenly_gateway::config::{
    DEFAULT_MAX_CONNECTIONS_PER_IP, PacingConfig, PersonaRegistry, ReflectionSettings,
    SafetyConfig, SttSettings, TtsSettings,
};
use listenly_gateway::{ServerConfig, routes, state::AppState};

/// Minimal configuration with no provider keys
fn create_minimal_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        deepgram_api_key: None,
        openai_api_key: None,
        elevenlabs_api_key: None,
        twilio_account_sid: None,
        twilio_auth_token: None,
        stt: SttSettings::default(),
        reflection: ReflectionSettings::default(),
        tts: TtsSettings::default(),
        pacing: PacingConfig::default(),
        safety: SafetyConfig::default(),
        personas: PersonaRegistry::default(),
        max_concurrent_calls: None,
        max_connections_per_ip: DEFAULT_MAX_CONNECTIONS_PER_IP,
    }
}

fn create_app(state: Arc<AppState>) -> Router {
    routes::api::create_api_router()
        .merge(routes::stream::create_stream_router(state.clone()))
        .with_state(state)
}

fn upgrade_request() -> Request<Body> {
    Request::builder()
        .uri("/stream?persona=mom")
        .header("connection", "upgrade")
        .header("upgrade", "websocket")
        .header("sec-websocket-version", "13")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap()
}

const CLIENT: ([u8; 4], u16) = ([10, 0, 0, 7], 40000);

#[tokio::test]
async fn test_health_check() {
    let state = AppState::new(create_minimal_config()).unwrap();
    let app = create_app(state);

    for uri in ["/", "/health"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"status": "OK"}));
    }
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let state = AppState::new(create_minimal_config()).unwrap();
    let app = create_app(state);

    let request = Request::builder().uri("/realtime").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_upgrade_releases_connection_slot() {
    let state = AppState::new(create_minimal_config()).unwrap();
    let app = create_app(state.clone()).layer(MockConnectInfo(SocketAddr::from(CLIENT)));

    // oneshot requests cannot be upgraded, so the handler never takes the slot
    let response = app.oneshot(upgrade_request()).await.unwrap();
    assert_ne!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(state.ws_connection_count(), 0);
}

#[tokio::test]
async fn test_plain_request_bypasses_limits() {
    let mut config = create_minimal_config();
    config.max_concurrent_calls = Some(0);
    let state = AppState::new(config).unwrap();
    let app = create_app(state.clone()).layer(MockConnectInfo(SocketAddr::from(CLIENT)));

    let request = Request::builder().uri("/stream").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_ne!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(state.ws_connection_count(), 0);
}

#[tokio::test]
async fn test_global_limit_rejects_upgrade() {
    let mut config = create_minimal_config();
    config.max_concurrent_calls = Some(1);
    let state = AppState::new(config).unwrap();
    state
        .try_acquire_connection("10.0.0.99".parse().unwrap())
        .unwrap();

    let app = create_app(state.clone()).layer(MockConnectInfo(SocketAddr::from(CLIENT)));
    let response = app.oneshot(upgrade_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(state.ws_connection_count(), 1);
}

#[tokio::test]
async fn test_per_ip_limit_rejects_upgrade() {
    let mut config = create_minimal_config();
    config.max_connections_per_ip = 1;
    let state = AppState::new(config).unwrap();
    let ip = SocketAddr::from(CLIENT).ip();
    state.try_acquire_connection(ip).unwrap();

    let app = create_app(state.clone()).layer(MockConnectInfo(SocketAddr::from(CLIENT)));
    let response = app.oneshot(upgrade_request()).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(state.ip_connection_count(&ip), 1);
}

/// Without a Deepgram key the call cannot be transcribed, so the gateway
/// closes the media stream right after the upgrade.
#[tokio::test]
async fn test_media_stream_closes_without_stt_credentials() {
    let state = AppState::new(create_minimal_config()).unwrap();
    let app = create_app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let (mut ws, _response) = tokio_tungstenite::connect_async(format!("ws://{addr}/stream"))
        .await
        .unwrap();

    let first = timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("server should close the stream");
    assert!(
        matches!(first, None | Some(Ok(Message::Close(_))) | Some(Err(_))),
        "unexpected frame: {first:?}"
    );

    // The connection slot is released once the socket task ends
    let released = timeout(Duration::from_secs(5), async {
        while state.ws_connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(released.is_ok());
    assert_eq!(state.ip_connection_count(&addr.ip()), 0);
}
