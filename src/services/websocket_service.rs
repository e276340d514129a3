use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::ClientMessage,
    error::ServiceError,
    services::{poll_service, poll_service::SessionContext, token_service, ws_events},
    state::{ClientConnection, SharedState},
};

/// How long a fresh connection may take to present its `join` frame.
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle of one participant WebSocket connection.
///
/// The first frame must be `join{token}`; once authenticated the connection is
/// subscribed to its poll's room and frames are dispatched to the coordinator.
/// A disconnect only drops the subscription, never the participant entry, so a
/// page refresh can rejoin with the same token.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(AUTH_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket authentication timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let frame = match serde_json::from_str::<ClientMessage>(&initial_message) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "failed to parse first websocket frame");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let ClientMessage::Join { token } = frame else {
        warn!("first websocket frame was not a join");
        ws_events::send_error(
            &outbound_tx,
            &ServiceError::Unauthorized("first message must be a join".into()),
        );
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let ctx: SessionContext = match token_service::verify(state.config().token_secret(), &token) {
        Ok(claims) => claims.into(),
        Err(err) => {
            warn!("websocket join with invalid token");
            ws_events::send_error(&outbound_tx, &err);
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    // Subscribe before joining so the join's own broadcast reaches this
    // connection as its first snapshot.
    let connection_id = Uuid::new_v4();
    let room = state.rooms().room(&ctx.poll_id);
    room.insert(ClientConnection {
        id: connection_id,
        participant_id: ctx.participant_id.clone(),
        tx: outbound_tx.clone(),
    });

    if let Err(err) = poll_service::join(&state, &ctx).await {
        warn!(poll_id = %ctx.poll_id, error = %err, "websocket join rejected");
        ws_events::send_error(&outbound_tx, &err);
        let _ = outbound_tx.send(Message::Close(None));
        state.rooms().unsubscribe(&ctx.poll_id, connection_id);
        finalize(writer_task, outbound_tx).await;
        return;
    }

    info!(poll_id = %ctx.poll_id, participant_id = %ctx.participant_id, "participant connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(frame) => {
                    if handle_frame(&state, &ctx, frame, &outbound_tx).await {
                        break;
                    }
                }
                Err(err) => {
                    warn!(poll_id = %ctx.poll_id, error = %err, "failed to parse websocket frame");
                    ws_events::send_error(
                        &outbound_tx,
                        &ServiceError::InvalidInput("unrecognized message".into()),
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(poll_id = %ctx.poll_id, error = %err, "websocket error");
                break;
            }
        }
    }

    state.rooms().unsubscribe(&ctx.poll_id, connection_id);
    info!(poll_id = %ctx.poll_id, participant_id = %ctx.participant_id, "participant disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Dispatch one authenticated frame. Returns `true` when the connection is done.
async fn handle_frame(
    state: &SharedState,
    ctx: &SessionContext,
    frame: ClientMessage,
    outbound_tx: &mpsc::UnboundedSender<Message>,
) -> bool {
    let result = match frame {
        ClientMessage::Join { .. } => {
            // Already authenticated; a repeated join just re-sends the snapshot.
            poll_service::join(state, ctx).await.map(|_| ())
        }
        ClientMessage::Nominate { text } => {
            poll_service::nominate(state, ctx, &text).await.map(|_| ())
        }
        ClientMessage::RemoveNomination { id } => poll_service::remove_nomination(state, ctx, &id)
            .await
            .map(|_| ()),
        ClientMessage::RemoveParticipant { id } => {
            poll_service::remove_participant(state, ctx, &id)
                .await
                .map(|_| ())
        }
        ClientMessage::StartVote => poll_service::start_vote(state, ctx).await.map(|_| ()),
        ClientMessage::SubmitRankings { rankings } => {
            poll_service::submit_rankings(state, ctx, rankings)
                .await
                .map(|_| ())
        }
        ClientMessage::ClosePoll => poll_service::close_poll(state, ctx).await.map(|_| ()),
        ClientMessage::CancelPoll => {
            return match poll_service::cancel_poll(state, ctx).await {
                // The cancel broadcast already closed every subscriber.
                Ok(()) => true,
                Err(err) => {
                    ws_events::send_error(outbound_tx, &err);
                    false
                }
            };
        }
        ClientMessage::Leave => {
            return match poll_service::leave(state, ctx).await {
                Ok(()) => {
                    let _ = outbound_tx.send(Message::Close(None));
                    true
                }
                Err(err) => {
                    ws_events::send_error(outbound_tx, &err);
                    false
                }
            };
        }
        ClientMessage::Unknown => Err(ServiceError::InvalidInput(
            "unsupported message type".into(),
        )),
    };

    if let Err(err) = result {
        ws_events::send_error(outbound_tx, &err);
    }
    false
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
