//! Live transport over a tokio-tungstenite websocket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest, protocol::CloseFrame, Error as WsError, Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, warn};

use super::events::CloseEvent;
use super::transport::{LiveCallbacks, LiveSession, LiveTransport};
use crate::config::ClientOptions;
use crate::error::{LiveError, Result};
use crate::types::{
    Blob, Content, FunctionResponse, LiveClientContent, LiveClientMessage,
    LiveClientRealtimeInput, LiveClientSetup, LiveClientToolResponse, LiveConnectConfig,
    LiveServerMessage,
};

type LiveWebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens `BidiGenerateContent` websocket connections.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    options: ClientOptions,
}

impl WebSocketTransport {
    pub fn new(options: ClientOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl LiveTransport for WebSocketTransport {
    async fn connect(
        &self,
        model: &str,
        config: &LiveConnectConfig,
        callbacks: LiveCallbacks,
    ) -> Result<Box<dyn LiveSession>> {
        let url = self.options.endpoint()?;
        let mut socket = connect_live_socket(&url).await?;

        let setup = LiveClientMessage::Setup(LiveClientSetup {
            model: model.to_string(),
            config: config.clone(),
        });
        send_message(&mut socket, &setup).await?;
        callbacks.open();

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection(socket, commands_rx, callbacks));
        Ok(Box::new(WebSocketSession {
            commands: commands_tx,
        }))
    }
}

enum Command {
    Send(Box<LiveClientMessage>),
    Close,
}

/// Handle to the worker task that owns the socket.
struct WebSocketSession {
    commands: mpsc::UnboundedSender<Command>,
}

impl WebSocketSession {
    fn send(&self, message: LiveClientMessage) -> Result<()> {
        self.commands
            .send(Command::Send(Box::new(message)))
            .map_err(|_| LiveError::NotConnected)
    }
}

impl LiveSession for WebSocketSession {
    fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    fn send_realtime_input(&self, media: Blob) -> Result<()> {
        self.send(LiveClientMessage::RealtimeInput(LiveClientRealtimeInput {
            media_chunks: vec![media],
        }))
    }

    fn send_tool_response(&self, function_responses: Vec<FunctionResponse>) -> Result<()> {
        self.send(LiveClientMessage::ToolResponse(LiveClientToolResponse {
            function_responses,
        }))
    }

    fn send_client_content(&self, turns: Vec<Content>, turn_complete: bool) -> Result<()> {
        self.send(LiveClientMessage::ClientContent(LiveClientContent {
            turns,
            turn_complete,
        }))
    }
}

async fn run_connection(
    mut socket: LiveWebSocket,
    mut commands: mpsc::UnboundedReceiver<Command>,
    callbacks: LiveCallbacks,
) {
    let close = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(message)) => {
                    if let Err(error) = send_message(&mut socket, &message).await {
                        callbacks.error(error.to_string());
                        break CloseEvent::new(None, "send failed");
                    }
                }
                Some(Command::Close) | None => {
                    let _ = socket.close(None).await;
                    break CloseEvent::new(Some(1000), "client disconnect");
                }
            },
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => forward_payload(text.as_ref(), &callbacks),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => forward_payload(&text, &callbacks),
                    Err(error) => warn!(%error, "dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Ping(payload))) => {
                    if let Err(error) = socket.send(Message::Pong(payload)).await {
                        callbacks.error(format!("Live websocket pong failed: {error}"));
                        break CloseEvent::new(None, error.to_string());
                    }
                }
                Some(Ok(Message::Close(frame))) => break close_event(frame),
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(error)) => {
                    callbacks.error(format!("Live websocket receive failed: {error}"));
                    break CloseEvent::new(None, error.to_string());
                }
                None => break CloseEvent::new(None, "connection closed"),
            },
        }
    };
    debug!(code = ?close.code, reason = %close.reason, "live websocket worker stopped");
    callbacks.close(close);
}

fn forward_payload(payload: &str, callbacks: &LiveCallbacks) {
    match serde_json::from_str::<LiveServerMessage>(payload) {
        Ok(message) => callbacks.message(message),
        Err(error) => warn!(%error, "failed to parse live server message"),
    }
}

fn close_event(frame: Option<CloseFrame<'_>>) -> CloseEvent {
    match frame {
        Some(frame) => CloseEvent::new(Some(u16::from(frame.code)), frame.reason.to_string()),
        None => CloseEvent::default(),
    }
}

async fn send_message(socket: &mut LiveWebSocket, message: &LiveClientMessage) -> Result<()> {
    let payload = serde_json::to_string(message)?;
    socket
        .send(Message::Text(payload.into()))
        .await
        .map_err(|error| LiveError::Transport(format!("Live websocket send failed: {error}")))
}

async fn connect_live_socket(url: &str) -> Result<LiveWebSocket> {
    let request = url
        .into_client_request()
        .map_err(|error| LiveError::Configuration(format!("Invalid live websocket URL: {error}")))?;
    connect_async(request)
        .await
        .map(|(socket, _)| socket)
        .map_err(map_connect_error)
}

fn map_connect_error(error: WsError) -> LiveError {
    match error {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if matches!(status, 401 | 403) {
                LiveError::Authentication(format!(
                    "Live websocket authentication failed with status {status}"
                ))
            } else {
                LiveError::Connection(format!(
                    "Live websocket handshake failed with status {status}"
                ))
            }
        }
        WsError::Io(error) => LiveError::Io(error),
        WsError::Url(error) => {
            LiveError::Configuration(format!("Invalid live websocket URL: {error}"))
        }
        other => LiveError::Connection(format!("Live websocket connect failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

    #[test]
    fn close_frame_maps_code_and_reason() {
        let event = close_event(Some(CloseFrame {
            code: CloseCode::Policy,
            reason: "quota".into(),
        }));
        assert_eq!(event, CloseEvent::new(Some(1008), "quota"));
        assert_eq!(close_event(None), CloseEvent::default());
    }
}
