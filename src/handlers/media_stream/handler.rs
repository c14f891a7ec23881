//! Twilio media stream WebSocket handler
//!
//! One socket is one phone call. The handler owns the STT connection and the
//! socket writer; everything that decides what the call does lives in a
//! [`CallSession`] running on its own task, fed through the session mailbox.

use axum::{
    Extension,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::{select, time::Duration};
use tracing::{debug, error, info, warn};

use crate::core::session::{self, CallSession, SessionEvent};
use crate::core::stt::{
    BaseSTT, STTError, STTErrorCallback, STTResult, STTResultCallback, SpeechStartedCallback,
    create_stt_provider,
};
use crate::middleware::{ClientIp, ConnectionGuard};
use crate::state::AppState;

use super::messages::{MediaRoute, StartPayload, TwilioInbound};
use super::sink::TwilioMediaSink;

/// Outbound frame queue depth. Synthesized audio arrives in bursts.
const CHANNEL_BUFFER_SIZE: usize = 512;

/// Maximum WebSocket message size (1 MB); media frames are ~200 bytes
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// How often the idle check runs
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Twilio sends media every 20 ms, so a silent socket is a dead one
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Bound on waiting for the session task after the socket ended
const SESSION_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Query parameters on `GET /stream`
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    /// Persona id; the `persona` custom parameter on `start` takes precedence
    pub persona: Option<String>,
}

/// Media stream WebSocket handler
///
/// Upgrades the connection for a Twilio `<Connect><Stream>` session. The
/// connection slot acquired by the connection-limit middleware is released
/// when the socket task ends, or right away if the upgrade never completes.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
    client_ip: Option<Extension<ClientIp>>,
) -> Response {
    info!(persona = ?params.persona, "Media stream upgrade requested");

    let guard = client_ip.map(|Extension(ClientIp(ip))| ConnectionGuard::new(state.clone(), ip));

    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            let _guard = guard;
            handle_media_socket(socket, state, params).await;
        })
}

/// Per-socket state while the call is being set up and run.
struct StreamContext {
    app_state: Arc<AppState>,
    query_persona: Option<String>,
    events: mpsc::Sender<SessionEvent>,
    mailbox: Option<mpsc::Receiver<SessionEvent>>,
    routes: mpsc::Sender<MediaRoute>,
    session_task: Option<JoinHandle<()>>,
    stt: Option<Box<dyn BaseSTT>>,
    media_seen: bool,
}

async fn handle_media_socket(socket: WebSocket, app_state: Arc<AppState>, params: StreamParams) {
    info!("Media stream connection established");

    let (mut sender, mut receiver) = socket.split();
    let (route_tx, mut route_rx) = mpsc::channel::<MediaRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing frames
    let sender_task = tokio::spawn(async move {
        while let Some(route) = route_rx.recv().await {
            let result = match route {
                MediaRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing frame: {}", e);
                        continue;
                    }
                },
                MediaRoute::Close => {
                    info!("Closing media stream connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                warn!("Failed to send media frame: {}", e);
                break;
            }
        }
    });

    let (events, mailbox) = session::mailbox();

    let stt = match connect_stt(&app_state, &events).await {
        Ok(stt) => stt,
        Err(e) => {
            error!("Speech-to-text unavailable, closing media stream: {}", e);
            let _ = route_tx.send(MediaRoute::Close).await;
            let _ = sender_task.await;
            return;
        }
    };

    let mut ctx = StreamContext {
        app_state,
        query_persona: params.persona,
        events,
        mailbox: Some(mailbox),
        routes: route_tx,
        session_task: None,
        stt: Some(stt),
        media_seen: false,
    };

    let mut last_activity = tokio::time::Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = tokio::time::Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        if !process_message(msg, &mut ctx).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Media stream WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!("Media stream closed by peer");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => {
                if last_activity.elapsed() > IDLE_TIMEOUT {
                    warn!(
                        "Media stream idle for {}s, closing stale connection",
                        last_activity.elapsed().as_secs()
                    );
                    break;
                }
            }
        }

        // The session closed its mailbox; transcription is no longer needed.
        if ctx.events.is_closed() {
            disconnect_stt(&mut ctx.stt).await;
        }
    }

    // Cleanup
    let _ = ctx.events.try_send(SessionEvent::Hangup);
    disconnect_stt(&mut ctx.stt).await;
    let StreamContext {
        events,
        session_task,
        ..
    } = ctx;
    drop(events);

    if let Some(task) = session_task
        && tokio::time::timeout(SESSION_SHUTDOWN_TIMEOUT, task)
            .await
            .is_err()
    {
        warn!("Call session did not stop in time");
    }

    sender_task.abort();
    info!("Media stream connection terminated");
}

/// Create the STT client and wire its callbacks into the session mailbox.
async fn connect_stt(
    app_state: &Arc<AppState>,
    events: &mpsc::Sender<SessionEvent>,
) -> Result<Box<dyn BaseSTT>, STTError> {
    let config = app_state
        .stt_config()
        .map_err(STTError::ConfigurationError)?;
    let provider = config.provider.clone();
    let mut stt = create_stt_provider(&provider, config)?;

    let tx = events.clone();
    let result_callback: STTResultCallback = Arc::new(move |result: STTResult| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx
                .send(SessionEvent::transcript(result.transcript, result.is_final))
                .await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });

    let tx = events.clone();
    let speech_started_callback: SpeechStartedCallback = Arc::new(move || {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(SessionEvent::CallerActivity).await;
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });

    let error_callback: STTErrorCallback = Arc::new(move |error: STTError| {
        Box::pin(async move {
            warn!("Speech-to-text stream error: {}", error);
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });

    stt.on_result(result_callback).await?;
    stt.on_speech_started(speech_started_callback).await?;
    stt.on_error(error_callback).await?;

    stt.connect().await?;
    info!(provider = stt.get_provider_info(), "Speech-to-text connected");
    Ok(stt)
}

async fn disconnect_stt(stt: &mut Option<Box<dyn BaseSTT>>) {
    if let Some(mut provider) = stt.take()
        && let Err(e) = provider.disconnect().await
    {
        warn!("Failed to disconnect speech-to-text: {}", e);
    }
}

/// Process one inbound WebSocket message. Returns false to end the socket.
async fn process_message(msg: Message, ctx: &mut StreamContext) -> bool {
    match msg {
        Message::Text(text) => {
            let inbound = match TwilioInbound::parse(&text) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!("Dropping malformed media stream frame: {}", e);
                    return true;
                }
            };
            handle_inbound(inbound, ctx).await;
            true
        }
        Message::Binary(data) => {
            debug!("Ignoring binary frame: {} bytes", data.len());
            true
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            info!("Media stream close received");
            false
        }
    }
}

async fn handle_inbound(inbound: TwilioInbound, ctx: &mut StreamContext) {
    match inbound {
        TwilioInbound::Connected { protocol, version } => {
            debug!(?protocol, ?version, "Media stream connected");
        }
        TwilioInbound::Start { start, .. } => start_session(start, ctx).await,
        TwilioInbound::Media { media, .. } => {
            if !media.is_inbound() {
                return;
            }
            let audio = match media.decode() {
                Ok(audio) => audio,
                Err(e) => {
                    warn!("Dropping media frame with invalid payload: {}", e);
                    return;
                }
            };

            if let Some(stt) = ctx.stt.as_ref()
                && stt.is_ready()
                && let Err(e) = stt.send_audio(audio)
            {
                debug!("Dropping inbound audio: {}", e);
            }

            if !ctx.media_seen && ctx.session_task.is_some() {
                ctx.media_seen = true;
                let _ = ctx.events.try_send(SessionEvent::Media);
            }
        }
        TwilioInbound::Stop { stream_sid, .. } => {
            info!(stream_sid = ?stream_sid, "Media stream stopped");
            let _ = ctx.events.send(SessionEvent::Stop).await;
        }
        TwilioInbound::Mark { mark, .. } => {
            debug!(mark = ?mark.map(|m| m.name), "Mark received");
        }
        TwilioInbound::Unknown => {
            debug!("Ignoring unsupported media stream event");
        }
    }
}

/// Create and spawn the call session once the stream is identified.
async fn start_session(start: StartPayload, ctx: &mut StreamContext) {
    let Some(mailbox) = ctx.mailbox.take() else {
        warn!(call_sid = %start.call_sid, "Duplicate start event ignored");
        return;
    };

    let requested = start.persona().or(ctx.query_persona.as_deref());
    let Some(settings) = ctx.app_state.session_settings(requested) else {
        error!(persona = ?requested, "No persona available for call");
        let _ = ctx.routes.send(MediaRoute::Close).await;
        return;
    };

    info!(
        call_sid = %start.call_sid,
        stream_sid = %start.stream_sid,
        persona = %settings.persona.id,
        "Starting call session"
    );

    let sink = Arc::new(TwilioMediaSink::new(
        start.stream_sid.clone(),
        ctx.routes.clone(),
    ));
    let deps = ctx.app_state.session_deps(sink);
    let session = CallSession::new(settings, deps, &ctx.events);
    ctx.session_task = Some(tokio::spawn(session.run(mailbox)));

    let _ = ctx
        .events
        .send(SessionEvent::Start {
            call_id: start.call_sid,
        })
        .await;
}
