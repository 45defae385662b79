//! Axum web server with WebSocket streaming of playback frames.

use std::sync::Arc;
use std::time::Duration;

use arbor_tree::Outcome;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::config::VisConfig;
use crate::error::{Error, Result};
use crate::playback::{drive, PlaybackSpeed, PlaybackState, PlaybackStatus};
use crate::session::{Session, TreeFrame};
use crate::view::FrameView;

/// Key type served over HTTP.
pub type Value = i64;

/// Shared application state.
pub struct AppState {
    session: Arc<RwLock<Session<Value>>>,
    config: VisConfig,
}

impl AppState {
    pub fn new(session: Session<Value>, config: VisConfig) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            config,
        }
    }

    /// The shared session.
    pub fn session(&self) -> &Arc<RwLock<Session<Value>>> {
        &self.session
    }

    async fn frame_view(&self) -> FrameView<Value> {
        let frame = self.session.read().await.frame();
        FrameView::new(&frame, &self.config.layout)
    }

    async fn status(&self) -> PlaybackStatus {
        self.session.read().await.status()
    }

    /// Start playback and spawn the ticker that drives it.
    async fn play(&self, req: PlayRequest) -> PlaybackStatus {
        let interval = req.interval(self.config.interval);
        let mut session = self.session.write().await;
        let generation = session.play(interval);
        if session.playback().state() == PlaybackState::Playing {
            tokio::spawn(drive(Arc::clone(&self.session), generation, interval));
        }
        session.status()
    }

    async fn step(&self, direction: Direction) -> Result<PlaybackStatus> {
        let mut session = self.session.write().await;
        let stepped = match direction {
            Direction::Forward => session.step_forward(),
            Direction::Backward => session.step_back(),
        };
        stepped.inspect_err(|e| warn!(error = %e, ?direction, "step rejected"))?;
        Ok(session.status())
    }

    async fn seek(&self, index: usize) -> Result<PlaybackStatus> {
        let mut session = self.session.write().await;
        session
            .seek(index)
            .inspect_err(|e| warn!(error = %e, index, "seek rejected"))?;
        Ok(session.status())
    }

    async fn run(&self, op: TreeCommand) -> CommandResponse {
        let mut session = self.session.write().await;
        let outcome = match op {
            TreeCommand::Insert { value } => session.insert(value),
            TreeCommand::Delete { value } => session.delete(&value),
            TreeCommand::Update { old_value, new_value } => session.update(&old_value, new_value),
            TreeCommand::Build { values } => session.build_animated(values),
            TreeCommand::Load { values } => session.load_instant(values),
        };
        CommandResponse {
            outcome,
            status: session.status(),
        }
    }
}

/// Visualization server.
pub struct VisServer {
    state: Arc<AppState>,
}

impl VisServer {
    /// Create a server around an existing session.
    pub fn new(session: Session<Value>, config: VisConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(session, config)),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the router for the server.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/status", get(status_handler))
            .route("/api/frame", get(frame_handler))
            .route("/api/keys", get(keys_handler))
            .route("/api/playback", get(playback_status_handler))
            .route("/api/tree/insert", post(insert_handler))
            .route("/api/tree/delete", post(delete_handler))
            .route("/api/tree/update", post(update_handler))
            .route("/api/tree/build", post(build_handler))
            .route("/api/tree/load", post(load_handler))
            .route("/api/playback/play", post(play_handler))
            .route("/api/playback/pause", post(pause_handler))
            .route("/api/playback/stop", post(stop_handler))
            .route("/api/playback/step", post(step_handler))
            .route("/api/playback/seek", post(seek_handler))
            .route("/ws", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.state))
    }

    /// Run the server on the configured address.
    pub async fn serve(self) -> Result<()> {
        let addr = self.state.config.addr;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "visualization server listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

/// Server status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: &'static str,
    key_count: usize,
    height: usize,
    last_outcome: Option<Outcome>,
    playback: PlaybackStatus,
}

/// Result of a tree command.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    outcome: Outcome,
    status: PlaybackStatus,
}

#[derive(Debug, Serialize)]
pub struct KeysResponse {
    keys: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum TreeCommand {
    Insert { value: Value },
    Delete { value: Value },
    Update { old_value: Value, new_value: Value },
    Build { values: Vec<Value> },
    Load { values: Vec<Value> },
}

#[derive(Debug, Deserialize)]
struct ValueRequest {
    value: Value,
}

#[derive(Debug, Deserialize)]
struct UpdateRequest {
    old_value: Value,
    new_value: Value,
}

#[derive(Debug, Deserialize)]
struct ValuesRequest {
    values: Vec<Value>,
}

/// Either an explicit interval or a speed preset; neither means the
/// configured default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlayRequest {
    interval_ms: Option<u64>,
    speed: Option<PlaybackSpeed>,
}

impl PlayRequest {
    fn interval(&self, base: Duration) -> Duration {
        match (self.interval_ms, self.speed) {
            (Some(ms), _) => Duration::from_millis(ms.max(1)),
            (None, Some(speed)) => speed.interval(base),
            (None, None) => base,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Direction {
    Forward,
    #[serde(alias = "back")]
    Backward,
}

#[derive(Debug, Deserialize)]
struct StepRequest {
    direction: Direction,
}

#[derive(Debug, Deserialize)]
struct SeekRequest {
    index: usize,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let session = state.session.read().await;
    Json(StatusResponse {
        status: "ok",
        key_count: session.committed().len(),
        height: session.committed().height(),
        last_outcome: session.last_outcome(),
        playback: session.status(),
    })
}

async fn frame_handler(State(state): State<Arc<AppState>>) -> Json<FrameView<Value>> {
    Json(state.frame_view().await)
}

async fn keys_handler(State(state): State<Arc<AppState>>) -> Json<KeysResponse> {
    let keys = state.session.read().await.keys();
    Json(KeysResponse { keys })
}

async fn playback_status_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    Json(state.status().await)
}

async fn insert_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Json<CommandResponse> {
    Json(state.run(TreeCommand::Insert { value: req.value }).await)
}

async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValueRequest>,
) -> Json<CommandResponse> {
    Json(state.run(TreeCommand::Delete { value: req.value }).await)
}

async fn update_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateRequest>,
) -> Json<CommandResponse> {
    let op = TreeCommand::Update {
        old_value: req.old_value,
        new_value: req.new_value,
    };
    Json(state.run(op).await)
}

async fn build_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValuesRequest>,
) -> Json<CommandResponse> {
    Json(state.run(TreeCommand::Build { values: req.values }).await)
}

async fn load_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ValuesRequest>,
) -> Json<CommandResponse> {
    Json(state.run(TreeCommand::Load { values: req.values }).await)
}

async fn play_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlayRequest>,
) -> Json<PlaybackStatus> {
    Json(state.play(req).await)
}

async fn pause_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let mut session = state.session.write().await;
    session.pause();
    Json(session.status())
}

async fn stop_handler(State(state): State<Arc<AppState>>) -> Json<PlaybackStatus> {
    let mut session = state.session.write().await;
    session.stop();
    Json(session.status())
}

async fn step_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StepRequest>,
) -> Result<Json<PlaybackStatus>> {
    state.step(req.direction).await.map(Json)
}

async fn seek_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeekRequest>,
) -> Result<Json<PlaybackStatus>> {
    state.seek(req.index).await.map(Json)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsCommand {
    GetFrame,
    GetStatus,
    GetKeys,
    Tree(TreeCommand),
    Play(PlayRequest),
    Pause,
    Stop,
    Step { direction: Direction },
    Seek { index: usize },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WsResponse {
    Frame(FrameView<Value>),
    Status(PlaybackStatus),
    Command(CommandResponse),
    Keys(KeysResponse),
    Error { message: String },
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    info!("websocket client connected");

    let mut frames = state.session.read().await.subscribe();
    let initial = WsResponse::Frame(state.frame_view().await);
    if let Err(e) = send_response(&mut socket, &initial).await {
        warn!(error = %e, "failed to send initial frame");
        return;
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let response = match msg {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<WsCommand>(text.as_str()) {
                        Ok(cmd) => handle_ws_command(&state, cmd).await,
                        Err(e) => {
                            warn!(error = %e, "unreadable websocket command");
                            WsResponse::Error { message: e.to_string() }
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error");
                        break;
                    }
                };
                if let Err(e) = send_response(&mut socket, &response).await {
                    warn!(error = %e, "failed to send response");
                    break;
                }
            }
            frame = next_frame(&mut frames, &state.session) => {
                let Some(frame) = frame else { break };
                let view = WsResponse::Frame(FrameView::new(&frame, &state.config.layout));
                if let Err(e) = send_response(&mut socket, &view).await {
                    warn!(error = %e, "failed to send frame");
                    break;
                }
            }
        }
    }

    info!("websocket client disconnected");
}

/// Next frame for a client, never older than one already handed out.
///
/// A lagging receiver is replaced by a fresh subscription and the client
/// gets the current frame instead of the stale backlog. Both happen under
/// the read lock, so no frame is published in between. `None` once the
/// player is gone.
async fn next_frame(
    frames: &mut broadcast::Receiver<TreeFrame<Value>>,
    session: &RwLock<Session<Value>>,
) -> Option<TreeFrame<Value>> {
    match frames.recv().await {
        Ok(frame) => Some(frame),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            debug!(skipped, "websocket client lagging; skipping to the latest frame");
            let session = session.read().await;
            *frames = session.subscribe();
            Some(session.frame())
        }
        Err(broadcast::error::RecvError::Closed) => None,
    }
}

async fn handle_ws_command(state: &AppState, cmd: WsCommand) -> WsResponse {
    let result = match cmd {
        WsCommand::GetFrame => Ok(WsResponse::Frame(state.frame_view().await)),
        WsCommand::GetStatus => Ok(WsResponse::Status(state.status().await)),
        WsCommand::GetKeys => {
            let keys = state.session.read().await.keys();
            Ok(WsResponse::Keys(KeysResponse { keys }))
        }
        WsCommand::Tree(op) => Ok(WsResponse::Command(state.run(op).await)),
        WsCommand::Play(req) => Ok(WsResponse::Status(state.play(req).await)),
        WsCommand::Pause => {
            let mut session = state.session.write().await;
            session.pause();
            Ok(WsResponse::Status(session.status()))
        }
        WsCommand::Stop => {
            let mut session = state.session.write().await;
            session.stop();
            Ok(WsResponse::Status(session.status()))
        }
        WsCommand::Step { direction } => state.step(direction).await.map(WsResponse::Status),
        WsCommand::Seek { index } => state.seek(index).await.map(WsResponse::Status),
    };
    result.unwrap_or_else(|e: Error| WsResponse::Error { message: e.to_string() })
}

async fn send_response(socket: &mut WebSocket, response: &WsResponse) -> std::result::Result<(), axum::Error> {
    let json = serde_json::to_string(response).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Session::new(), VisConfig::default()))
    }

    #[test]
    fn router_builds() {
        let server = VisServer::new(Session::new(), VisConfig::default());
        let _router = server.router();
    }

    #[test]
    fn play_request_interval() {
        let base = Duration::from_millis(700);
        assert_eq!(PlayRequest::default().interval(base), base);
        let req: PlayRequest = serde_json::from_str(r#"{"speed":"double"}"#).unwrap();
        assert_eq!(req.interval(base), Duration::from_millis(350));
        let req: PlayRequest = serde_json::from_str(r#"{"interval_ms":0,"speed":"double"}"#).unwrap();
        assert_eq!(req.interval(base), Duration::from_millis(1));
    }

    #[test]
    fn ws_commands_parse() {
        let cmd: WsCommand = serde_json::from_str(r#"{"type":"tree","op":"insert","value":5}"#).unwrap();
        assert!(matches!(cmd, WsCommand::Tree(TreeCommand::Insert { value: 5 })));
        let cmd: WsCommand = serde_json::from_str(r#"{"type":"step","direction":"back"}"#).unwrap();
        assert!(matches!(cmd, WsCommand::Step { direction: Direction::Backward }));
        let cmd: WsCommand = serde_json::from_str(r#"{"type":"play"}"#).unwrap();
        assert!(matches!(cmd, WsCommand::Play(PlayRequest { interval_ms: None, speed: None })));
    }

    #[tokio::test]
    async fn tree_commands_update_keys() {
        let state = state();
        let Json(resp) = insert_handler(State(Arc::clone(&state)), Json(ValueRequest { value: 8 })).await;
        assert!(matches!(resp.outcome, Outcome::Inserted { .. }));
        assert_eq!(resp.status.total_steps, 1);

        let Json(resp) = load_handler(State(Arc::clone(&state)), Json(ValuesRequest { values: vec![3, 1, 2] })).await;
        assert_eq!(resp.outcome, Outcome::Built { inserted: 3, duplicates: 0 });
        assert_eq!(resp.status.current_index, Some(0));
        let Json(keys) = keys_handler(State(Arc::clone(&state))).await;
        assert_eq!(keys.keys, vec![1, 2, 3]);

        let Json(resp) = delete_handler(State(Arc::clone(&state)), Json(ValueRequest { value: 42 })).await;
        assert_eq!(resp.outcome, Outcome::NotFound);
        assert_eq!(resp.status.total_steps, 1);
    }

    #[tokio::test]
    async fn lagging_client_never_sees_an_older_frame() {
        let state = state();
        state.run(TreeCommand::Build { values: (1..=40).collect() }).await;
        let mut frames = state.session().read().await.subscribe();
        {
            let mut session = state.session().write().await;
            let total = session.playback().total_steps();
            for i in 0..1500 {
                session.seek(i % total).unwrap();
            }
            session.seek(total / 2).unwrap();
        }
        let latest = state.session().read().await.frame().step_index;

        let mut seen = Vec::new();
        let frame = next_frame(&mut frames, state.session()).await.unwrap();
        seen.push(frame.step_index);
        assert_eq!(frame.step_index, latest);
        assert!(matches!(frames.try_recv(), Err(broadcast::error::TryRecvError::Empty)));

        state.session().write().await.step_back().unwrap();
        state.session().write().await.step_forward().unwrap();
        state.session().write().await.step_forward().unwrap();
        for _ in 0..3 {
            seen.push(next_frame(&mut frames, state.session()).await.unwrap().step_index);
        }
        let latest = latest.unwrap();
        assert_eq!(seen, vec![Some(latest), Some(latest - 1), Some(latest), Some(latest + 1)]);
    }

    #[tokio::test]
    async fn step_while_playing_is_rejected() {
        let state = state();
        state.run(TreeCommand::Build { values: (1..=20).collect() }).await;
        let status = state
            .play(PlayRequest {
                interval_ms: Some(60_000),
                speed: None,
            })
            .await;
        assert_eq!(status.state, PlaybackState::Playing);

        let err = state.step(Direction::Forward).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        let reply = handle_ws_command(&state, WsCommand::Seek { index: 3 }).await;
        assert!(matches!(reply, WsResponse::Error { .. }));

        let Json(status) = pause_handler(State(Arc::clone(&state))).await;
        assert_eq!(status.state, PlaybackState::Paused);
        let status = state.step(Direction::Forward).await.unwrap();
        assert_eq!(status.current_index, Some(0));
    }

    #[tokio::test]
    async fn played_sequence_reaches_last_step() {
        let state = state();
        state.run(TreeCommand::Build { values: vec![10, 20, 30] }).await;
        let mut frames = state.session().read().await.subscribe();
        state
            .play(PlayRequest {
                interval_ms: Some(1),
                speed: None,
            })
            .await;

        loop {
            let frame = frames.recv().await.unwrap();
            if frame.state == PlaybackState::Idle {
                assert_eq!(frame.step_index, Some(frame.total_steps - 1));
                break;
            }
        }
        let Json(view) = frame_handler(State(Arc::clone(&state))).await;
        assert_eq!(view.keys, vec![10, 20, 30]);
    }
}
