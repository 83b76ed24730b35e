use crate::domain::{PlayerInput, VehicleId};
use crate::interface_adapters::protocol::{
    ClientMessage, JoinAcceptedDto, ServerMessage, VehicleStateDto, WorldUpdateDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::next_connection_id;
use crate::use_cases::{ArenaHandle, ArenaNotice, GameEvent, WorldUpdate};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    Ws(axum::Error),
    Serialization(serde_json::Error),
    InputClosed,
    WorldGone,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::Ws(err) => write!(f, "websocket error: {err}"),
            NetError::Serialization(err) => write!(f, "message serialization error: {err}"),
            NetError::InputClosed => write!(f, "world input channel closed"),
            NetError::WorldGone => write!(f, "world task is gone"),
            NetError::JoinRequired => write!(f, "join required before any other message"),
            NetError::JoinTimeout => write!(f, "join handshake timed out"),
            NetError::ClosedBeforeJoin => write!(f, "socket closed before join"),
        }
    }
}

impl std::error::Error for NetError {}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_NAME_LEN: usize = 32;
const DEFAULT_NAME: &str = "Driver";
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each world update once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::WorldUpdate(WorldUpdateDto::from(update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize world update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery.
                let _ = world_latest_tx.send(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "world serializer lagged; skipping to latest update");
            }
            Err(broadcast::error::RecvError::Closed) => {
                info!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_arena_serializer(arena: &ArenaHandle) {
    tokio::spawn(world_update_serializer(
        arena.world_tx.subscribe(),
        arena.world_bytes_tx.clone(),
        arena.world_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let arena = state.arena.clone();
    // Separate connection id for correlating logs; it also becomes the player id.
    let conn_id = next_connection_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    ws.on_upgrade(move |socket| handle_socket(socket, arena, conn_id).instrument(span))
}

async fn handle_socket(mut socket: WebSocket, arena: ArenaHandle, conn_id: u64) {
    let mut ctx = match bootstrap_connection(&mut socket, &arena, conn_id).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e @ (NetError::JoinRequired | NetError::JoinTimeout)) => {
            // The close frame has already been sent.
            info!(error = %e, "join handshake rejected");
            return;
        }
        Err(e) => {
            error!(error = %e, "failed to bootstrap connection");
            let _ =
                send_close_with_reason(&mut socket, close_code::ERROR, "bootstrap failed").await;
            return;
        }
    };

    tracing::Span::current().record("player_id", ctx.player_id);
    info!(player_id = ctx.player_id, name = %ctx.name, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = %e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket.send(Message::Text(txt.into())).await.map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: u64,
    pub name: String,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub world_latest_rx: watch::Receiver<Utf8Bytes>,
    pub notice_rx: broadcast::Receiver<ArenaNotice>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    name: String,
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    arena: &ArenaHandle,
    player_id: u64,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let world_bytes_rx = arena.world_bytes_tx.subscribe();
    let world_latest_rx = arena.world_latest_tx.subscribe();
    let notice_rx = arena.notice_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    // The world answers once the car exists, with a snapshot that already includes it.
    let (reply, reply_rx) = oneshot::channel();
    arena
        .input_tx
        .send(GameEvent::Join {
            player_id,
            name: join.name.clone(),
            reply,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;
    let accepted = reply_rx.await.map_err(|_| NetError::WorldGone)?;

    let msg = ServerMessage::JoinAccepted(JoinAcceptedDto::from(accepted));
    let sent = match send_message(socket, &msg).await {
        Ok(bytes) => bytes,
        Err(e) => {
            // Compensate so the car does not outlive a connection that never became active.
            arena
                .input_tx
                .send(GameEvent::Leave { player_id })
                .await
                .map_err(|_| NetError::InputClosed)?; // InputClosed takes precedence
            return Err(e);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        name: join.name,
        input_tx: arena.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        notice_rx,
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 1,
        bytes_in: join.bytes_in,
        bytes_out: sent as u64,

        invalid_json: 0,

        last_input_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

/// Trims the requested display name, falling back to a default when empty or too long.
fn sanitize_name(raw: &str) -> String {
    let name = raw.trim();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        DEFAULT_NAME.to_string()
    } else {
        name.to_string()
    }
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    let mut msgs_in = 0;
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                msgs_in += 1;
                let bytes_in = text.len() as u64;
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => Ok(JoinHandshake {
                        name: sanitize_name(&payload.name),
                        bytes_in,
                        msgs_in,
                    }),
                    Ok(ClientMessage::Input(_)) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        Err(NetError::JoinRequired)
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        Err(NetError::JoinRequired)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn process_input_message(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    input: PlayerInput,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(GameEvent::Input { player_id, input }) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!(player_id, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    let own_id = VehicleId::Player(player_id);

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        world_bytes_rx,
        world_latest_rx,
        notice_rx,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_input_full_log,
        last_world_lag_log,
        last_invalid_input_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_input_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => matches!(
                        forward_world_bytes(bytes, socket, msgs_out, bytes_out).await,
                        LoopControl::Disconnect
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync by jumping straight to the newest snapshot.
                        let latest = world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            *lag_recovery_count += 1;
                            matches!(
                                forward_world_bytes(latest, socket, msgs_out, bytes_out).await,
                                LoopControl::Disconnect
                            )
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldGone);
                        true
                    }
                }
            }

            notice = notice_rx.recv() => {
                match notice {
                    Ok(notice) => match notice_message(notice, own_id) {
                        Some(msg) => matches!(
                            forward_message(&msg, socket, msgs_out, bytes_out).await,
                            LoopControl::Disconnect
                        ),
                        None => false,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // The next world update carries the full roster anyway.
                        if should_log(last_world_lag_log) {
                            warn!(missed = n, "roster notices lagged");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldGone);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = %err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(
        player_id,
        input_tx,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
        *lag_recovery_count,
    )
    .await
    {
        warn!(error = %e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Maps a roster change to the message this connection should see. A connection
/// is never told about its own arrival.
fn notice_message(notice: ArenaNotice, own_id: VehicleId) -> Option<ServerMessage> {
    match notice {
        ArenaNotice::Joined(vehicle) if vehicle.id == own_id => None,
        ArenaNotice::Joined(vehicle) => {
            Some(ServerMessage::PlayerJoined(VehicleStateDto::from(&vehicle)))
        }
        ArenaNotice::Left { id } => Some(ServerMessage::PlayerLeft {
            player_id: id.to_string(),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_input_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(last_invalid_input_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Input(input)) => {
                        process_input_message(
                            player_id,
                            input_tx,
                            input.into(),
                            last_input_full_log,
                        )
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_input_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket.send(Message::Text(world_msg)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // A failed send only ends this connection.
            warn!(error = %err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn forward_message(
    msg: &ServerMessage,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = %err, "failed to send roster notice");
            LoopControl::Disconnect
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn disconnect_cleanup(
    player_id: u64,
    input_tx: &mpsc::Sender<GameEvent>,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    lag_recovery_count: u64,
) -> Result<(), NetError> {
    input_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        player_id,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Vec3, VehicleSnapshot};

    fn snapshot(id: VehicleId) -> VehicleSnapshot {
        VehicleSnapshot {
            id,
            name: "Ada".to_string(),
            position: Vec3::new(0.0, 0.3, 0.0),
            heading: 0.0,
            score: 0,
            is_hit: false,
            is_bot: false,
        }
    }

    #[test]
    fn when_serialization_fails_then_message_carries_the_cause() {
        let cause = serde_json::from_str::<ClientMessage>("{").expect_err("truncated json");
        let detail = cause.to_string();
        let err = NetError::Serialization(cause);
        assert!(err.to_string().starts_with("message serialization error: "));
        assert!(err.to_string().ends_with(&detail));
        assert_eq!(NetError::JoinTimeout.to_string(), "join handshake timed out");
    }

    #[test]
    fn when_name_is_blank_or_too_long_then_default_is_used() {
        assert_eq!(sanitize_name("   "), "Driver");
        assert_eq!(sanitize_name(&"x".repeat(33)), "Driver");
        assert_eq!(sanitize_name("  Ada  "), "Ada");
        assert_eq!(sanitize_name(&"y".repeat(32)), "y".repeat(32));
    }

    #[test]
    fn when_own_join_is_announced_then_it_is_not_forwarded() {
        let own = VehicleId::Player(3);
        assert!(notice_message(ArenaNotice::Joined(snapshot(own)), own).is_none());
        assert!(matches!(
            notice_message(ArenaNotice::Joined(snapshot(VehicleId::Player(4))), own),
            Some(ServerMessage::PlayerJoined(dto)) if dto.id == "4"
        ));
    }

    #[test]
    fn when_someone_leaves_then_player_left_names_them() {
        let left = ArenaNotice::Left {
            id: VehicleId::Player(9),
        };
        let msg = notice_message(left, VehicleId::Player(3));
        assert!(matches!(msg, Some(ServerMessage::PlayerLeft { player_id }) if player_id == "9"));
    }

    #[tokio::test]
    async fn when_input_queue_is_full_then_input_is_dropped_without_error() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut last_log = Instant::now() - LOG_THROTTLE;
        let input = PlayerInput::default();

        assert!(matches!(
            process_input_message(1, &tx, input, &mut last_log),
            Ok(LoopControl::Continue)
        ));
        assert!(matches!(
            process_input_message(1, &tx, input, &mut last_log),
            Ok(LoopControl::Continue)
        ));
        assert!(matches!(rx.recv().await, Some(GameEvent::Input { player_id: 1, .. })));

        drop(rx);
        assert!(matches!(
            process_input_message(1, &tx, input, &mut last_log),
            Err(NetError::InputClosed)
        ));
    }

    #[test]
    fn when_too_many_frames_are_invalid_then_connection_closes() {
        let (tx, _rx) = mpsc::channel(4);
        let (mut msgs_in, mut bytes_in, mut invalid) = (0, 0, 0);
        let mut last_full = Instant::now();
        let mut last_invalid = Instant::now();
        let mut close_frame = None;

        for n in 1..=11 {
            let outcome = handle_incoming_ws(
                Some(Ok(Message::Text("not json".into()))),
                1,
                &tx,
                &mut msgs_in,
                &mut bytes_in,
                &mut invalid,
                &mut last_full,
                &mut last_invalid,
                &mut close_frame,
            );
            let disconnect = matches!(outcome, Ok(LoopControl::Disconnect));
            assert_eq!(disconnect, n == 11, "frame {n}");
        }
        assert_eq!(msgs_in, 11);
        assert!(close_frame.is_some());
    }
}
