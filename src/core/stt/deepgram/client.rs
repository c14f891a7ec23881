//! Deepgram live STT WebSocket client.
//!
//! ```text
//! send_audio() ──try_send──▶ audio (mpsc) ──▶ connection task ──▶ Deepgram
//!                                                   │
//!                      callbacks ◀── forward task ◀─┘ events (mpsc)
//! ```
//!
//! `send_audio` never waits on the network. When the audio queue is full the
//! frame is rejected and the caller drops it.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::{Instant, interval_at, timeout};
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, warn};

use super::config::DeepgramSTTConfig;
use super::messages::{ControlMessage, DeepgramMessage};
use crate::core::stt::base::{
    BaseSTT, STTConfig, STTError, STTErrorCallback, STTResult, STTResultCallback,
    SpeechStartedCallback,
};

// =============================================================================
// Constants
// =============================================================================

/// Queue depth for inbound audio frames. Twilio sends one 20 ms frame per
/// message, so this holds a little over a second of audio.
const AUDIO_QUEUE_CAPACITY: usize = 64;

/// Time allowed for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for the connection task to flush CloseStream on disconnect.
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Events produced by the connection task for the forwarding task.
#[derive(Debug)]
enum DeepgramEvent {
    Result(STTResult),
    SpeechStarted,
    Error(STTError),
}

#[derive(Default)]
struct Callbacks {
    result: Option<STTResultCallback>,
    speech_started: Option<SpeechStartedCallback>,
    error: Option<STTErrorCallback>,
}

/// Deepgram streaming STT client.
pub struct DeepgramSTT {
    config: Option<DeepgramSTTConfig>,

    /// Audio queue into the connection task
    ws_sender: Option<mpsc::Sender<Bytes>>,

    shutdown_tx: Option<oneshot::Sender<()>>,

    connection_handle: Option<tokio::task::JoinHandle<()>>,
    forward_handle: Option<tokio::task::JoinHandle<()>>,

    callbacks: Arc<Mutex<Callbacks>>,

    /// Request id from the Metadata message
    request_id: Arc<RwLock<Option<String>>>,

    is_connected: Arc<AtomicBool>,
}

impl DeepgramSTT {
    /// Request id reported by Deepgram, once the Metadata message arrived.
    pub fn request_id(&self) -> Option<String> {
        self.request_id.read().clone()
    }

    /// Handle one frame from Deepgram.
    ///
    /// Returns `Ok(false)` when the server closed the stream.
    async fn handle_websocket_message(
        message: Message,
        event_tx: &mpsc::Sender<DeepgramEvent>,
        request_id: &Arc<RwLock<Option<String>>>,
    ) -> Result<bool, STTError> {
        match message {
            Message::Text(text) => match DeepgramMessage::parse(&text) {
                Ok(DeepgramMessage::Results(results)) => {
                    let Some(best) = results.best() else {
                        return Ok(true);
                    };
                    if best.transcript.trim().is_empty() {
                        return Ok(true);
                    }

                    let result = STTResult::new(
                        best.transcript.clone(),
                        results.is_final,
                        results.speech_final,
                        (best.confidence as f32).clamp(0.0, 1.0),
                    )
                    .with_start_ms(results.start_ms());

                    if event_tx.try_send(DeepgramEvent::Result(result)).is_err() {
                        warn!("Dropping Deepgram result - event channel full or closed");
                    }
                }
                Ok(DeepgramMessage::Metadata(meta)) => {
                    info!(request_id = %meta.request_id, "Deepgram stream accepted");
                    *request_id.write() = Some(meta.request_id);
                }
                Ok(DeepgramMessage::SpeechStarted(started)) => {
                    debug!("Deepgram speech started at {:.2}s", started.timestamp);
                    let _ = event_tx.try_send(DeepgramEvent::SpeechStarted);
                }
                Ok(DeepgramMessage::UtteranceEnd(end)) => {
                    debug!("Deepgram utterance end at {:.2}s", end.last_word_end);
                }
                Ok(DeepgramMessage::Error(err)) => {
                    let text = err.text();
                    error!("Deepgram STT error: {}", text);
                    return Err(STTError::ProviderError(text));
                }
                Ok(DeepgramMessage::Unknown(raw)) => {
                    debug!("Received unknown Deepgram message: {}", raw);
                }
                Err(e) => {
                    warn!("Failed to parse Deepgram message: {}", e);
                }
            },
            Message::Close(frame) => {
                info!("Deepgram WebSocket closed: {:?}", frame);
                return Ok(false);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            _ => {
                debug!("Received unexpected message type from Deepgram");
            }
        }

        Ok(true)
    }

    async fn start_connection(&mut self, config: DeepgramSTTConfig) -> Result<(), STTError> {
        let url = config.build_websocket_url()?;
        let host = DeepgramSTTConfig::host_header(&url)?;

        let request = tokio_tungstenite::tungstenite::http::Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header("Host", host)
            .header("Upgrade", "websocket")
            .header("Connection", "upgrade")
            .header("Sec-WebSocket-Key", generate_key())
            .header("Sec-WebSocket-Version", "13")
            .header("Authorization", format!("Token {}", config.base.api_key))
            .body(())
            .map_err(|e| {
                STTError::ConnectionFailed(format!("Failed to create WebSocket request: {e}"))
            })?;

        let (ws_stream, _response) = match timeout(CONNECT_TIMEOUT, connect_async(request)).await
        {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                return Err(STTError::ConnectionFailed(format!(
                    "Failed to connect to Deepgram: {e}"
                )));
            }
            Err(_) => {
                return Err(STTError::ConnectionFailed(
                    "Timed out connecting to Deepgram".to_string(),
                ));
            }
        };

        info!("Connected to Deepgram STT WebSocket");

        let (audio_tx, mut audio_rx) = mpsc::channel::<Bytes>(AUDIO_QUEUE_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let (event_tx, mut event_rx) = mpsc::channel::<DeepgramEvent>(256);

        let request_id = self.request_id.clone();
        let is_connected = self.is_connected.clone();
        let keepalive_interval = config.keepalive_interval;

        is_connected.store(true, Ordering::Release);

        let connection_handle = tokio::spawn(async move {
            let (mut ws_sink, mut ws_stream) = ws_stream.split();
            let mut keepalive = interval_at(Instant::now() + keepalive_interval, keepalive_interval);

            loop {
                tokio::select! {
                    Some(audio) = audio_rx.recv() => {
                        if let Err(e) = ws_sink.send(Message::Binary(audio)).await {
                            let stt_error = STTError::NetworkError(format!(
                                "Failed to send audio to Deepgram: {e}"
                            ));
                            error!("{}", stt_error);
                            let _ = event_tx.try_send(DeepgramEvent::Error(stt_error));
                            break;
                        }
                    }

                    _ = keepalive.tick() => {
                        let msg = ControlMessage::KeepAlive.to_json();
                        if let Err(e) = ws_sink.send(Message::Text(msg.into())).await {
                            warn!("Failed to send Deepgram KeepAlive: {}", e);
                        }
                    }

                    message = ws_stream.next() => {
                        match message {
                            Some(Ok(msg)) => {
                                match Self::handle_websocket_message(msg, &event_tx, &request_id).await {
                                    Ok(true) => {}
                                    Ok(false) => break,
                                    Err(e) => {
                                        let _ = event_tx.try_send(DeepgramEvent::Error(e));
                                        break;
                                    }
                                }
                            }
                            Some(Err(e)) => {
                                let stt_error = STTError::NetworkError(format!("WebSocket error: {e}"));
                                error!("{}", stt_error);
                                let _ = event_tx.try_send(DeepgramEvent::Error(stt_error));
                                break;
                            }
                            None => {
                                info!("Deepgram WebSocket stream ended");
                                break;
                            }
                        }
                    }

                    _ = &mut shutdown_rx => {
                        debug!("Closing Deepgram stream");
                        let msg = ControlMessage::CloseStream.to_json();
                        let _ = ws_sink.send(Message::Text(msg.into())).await;
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            is_connected.store(false, Ordering::Release);
            info!("Deepgram STT WebSocket connection closed");
        });

        let callbacks = self.callbacks.clone();
        let forward_handle = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let callbacks = callbacks.lock().await;
                match event {
                    DeepgramEvent::Result(result) => match callbacks.result.as_ref() {
                        Some(callback) => callback(result).await,
                        None => debug!(
                            "Deepgram result (no callback): {} (final: {})",
                            result.transcript, result.is_final
                        ),
                    },
                    DeepgramEvent::SpeechStarted => {
                        if let Some(callback) = callbacks.speech_started.as_ref() {
                            callback().await;
                        }
                    }
                    DeepgramEvent::Error(error) => match callbacks.error.as_ref() {
                        Some(callback) => callback(error).await,
                        None => error!("Deepgram STT error (no callback registered): {}", error),
                    },
                }
            }
        });

        self.ws_sender = Some(audio_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.connection_handle = Some(connection_handle);
        self.forward_handle = Some(forward_handle);

        Ok(())
    }
}

impl Drop for DeepgramSTT {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

#[async_trait::async_trait]
impl BaseSTT for DeepgramSTT {
    fn new(config: STTConfig) -> Result<Self, STTError> {
        if config.api_key.is_empty() {
            return Err(STTError::AuthenticationFailed(
                "API key is required for Deepgram STT".to_string(),
            ));
        }

        let deepgram_config = DeepgramSTTConfig::from_base(config);
        // Surface a bad endpoint at construction instead of on connect.
        deepgram_config.build_websocket_url()?;

        Ok(Self {
            config: Some(deepgram_config),
            ws_sender: None,
            shutdown_tx: None,
            connection_handle: None,
            forward_handle: None,
            callbacks: Arc::new(Mutex::new(Callbacks::default())),
            request_id: Arc::new(RwLock::new(None)),
            is_connected: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn connect(&mut self) -> Result<(), STTError> {
        let config = self.config.clone().ok_or_else(|| {
            STTError::ConfigurationError("No configuration available".to_string())
        })?;

        self.start_connection(config).await
    }

    async fn disconnect(&mut self) -> Result<(), STTError> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.connection_handle.take() {
            let _ = timeout(DISCONNECT_TIMEOUT, handle).await;
        }

        if let Some(handle) = self.forward_handle.take() {
            handle.abort();
            let _ = handle.await;
        }

        self.ws_sender = None;
        self.is_connected.store(false, Ordering::Release);

        info!("Disconnected from Deepgram STT");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.is_connected.load(Ordering::Acquire) && self.ws_sender.is_some()
    }

    fn send_audio(&self, audio: Bytes) -> Result<(), STTError> {
        if !self.is_ready() {
            return Err(STTError::NotConnected);
        }

        let Some(ws_sender) = &self.ws_sender else {
            return Err(STTError::NotConnected);
        };

        ws_sender.try_send(audio).map_err(|e| match e {
            TrySendError::Full(_) => {
                STTError::NetworkError("Deepgram audio queue is full".to_string())
            }
            TrySendError::Closed(_) => STTError::NotConnected,
        })
    }

    async fn on_result(&mut self, callback: STTResultCallback) -> Result<(), STTError> {
        self.callbacks.lock().await.result = Some(callback);
        Ok(())
    }

    async fn on_speech_started(
        &mut self,
        callback: SpeechStartedCallback,
    ) -> Result<(), STTError> {
        self.callbacks.lock().await.speech_started = Some(callback);
        Ok(())
    }

    async fn on_error(&mut self, callback: STTErrorCallback) -> Result<(), STTError> {
        self.callbacks.lock().await.error = Some(callback);
        Ok(())
    }

    fn get_config(&self) -> Option<&STTConfig> {
        self.config.as_ref().map(|c| &c.base)
    }

    fn get_provider_info(&self) -> &'static str {
        "Deepgram Live Streaming STT"
    }
}
