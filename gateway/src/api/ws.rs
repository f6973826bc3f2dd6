//! Per-connection WebSocket handling: inbound commands are applied to the
//! engine, broadcast events are bridged through a bounded outbound queue so
//! one slow client can never stall the clock or its peers.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State as AxumState};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use aviator_types::{now_ms, Command, GameError, Response};

use super::AppContext;

pub(super) async fn game_ws(
    AxumState(context): AxumState<Arc<AppContext>>,
    Path(user_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_game_ws(socket, context, user_id))
}

async fn handle_game_ws(socket: WebSocket, context: Arc<AppContext>, user_id: String) {
    let connection_id = Uuid::new_v4();
    context.metrics.inc_connected();
    info!(%connection_id, user_id = %user_id, "game socket connected");

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(context.ws_outbound_capacity);

    let writer_context = context.clone();
    let send_timeout = context.ws_send_timeout;
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            match timeout(send_timeout, sender.send(message)).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => {
                    writer_context.metrics.inc_send_error();
                    break;
                }
                Err(_) => {
                    writer_context.metrics.inc_send_timeout();
                    warn!("game socket send timed out; closing");
                    break;
                }
            }
        }
        let _ = sender.close().await;
    });

    let mut events = context.engine.subscribe();

    // Connect-time synchronization: current state, recent crash history,
    // and the caller's open bet if one exists. The crash point of the
    // active round is in none of these.
    let mut synced = enqueue_response(
        &context,
        &out_tx,
        &Response::StateSync {
            round: context.engine.snapshot(),
            server_time_ms: now_ms(),
        },
    );
    synced = synced
        && enqueue_response(
            &context,
            &out_tx,
            &Response::PastCrashes {
                crashes: context.engine.recent_crashes(),
            },
        );
    if let Some(bet) = context.engine.pending_bet_for(&user_id) {
        synced = synced
            && enqueue_response(
                &context,
                &out_tx,
                &Response::YourBet {
                    bet_id: bet.id,
                    round_id: bet.round_id,
                    amount: bet.amount,
                    auto_cashout_threshold: bet.auto_cashout_threshold,
                },
            );
    }

    if synced {
        loop {
            tokio::select! {
                frame = receiver.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            let response = match serde_json::from_str::<Command>(&text) {
                                Ok(command) => handle_command(&context, &user_id, command),
                                Err(err) => {
                                    debug!(?err, "unparseable command frame");
                                    Response::Error {
                                        request_id: None,
                                        code: "INVALID_COMMAND",
                                        message: "unrecognized command".to_string(),
                                    }
                                }
                            };
                            if !enqueue_response(&context, &out_tx, &response) {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if out_tx.try_send(Message::Pong(data)).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(err)) => {
                            debug!(?err, "game socket error");
                            break;
                        }
                        _ => {}
                    }
                }
                event = events.recv() => {
                    match event {
                        Ok(event) => {
                            let payload = match serde_json::to_string(&event) {
                                Ok(payload) => payload,
                                Err(err) => {
                                    warn!(?err, "failed to encode event");
                                    continue;
                                }
                            };
                            match out_tx.try_send(Message::Text(payload)) {
                                Ok(()) => {}
                                Err(mpsc::error::TrySendError::Full(_)) => {
                                    // Slow consumer: drop the connection
                                    // rather than the clock's pace.
                                    context.metrics.inc_queue_full();
                                    warn!(%connection_id, "outbound queue full; dropping client");
                                    break;
                                }
                                Err(mpsc::error::TrySendError::Closed(_)) => break,
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Missed ticks are display-only; the client
                            // resynchronizes from the next one.
                            context.metrics.add_lagged(skipped);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    context.metrics.inc_disconnected();
    info!(%connection_id, "game socket closing");
    drop(out_tx);
    let _ = writer.await;
}

/// Applies one inbound command against the authoritative engine state.
/// All financial validity is re-checked here at command time; whatever the
/// client's display showed is irrelevant.
fn handle_command(context: &AppContext, user_id: &str, command: Command) -> Response {
    match command {
        Command::PlaceBet {
            request_id,
            round_id,
            amount,
            auto_cashout_threshold,
        } => match context
            .engine
            .place_bet(user_id, round_id, amount, auto_cashout_threshold)
        {
            Ok(receipt) => Response::BetPlaced {
                request_id,
                bet_id: receipt.bet_id,
                round_id: receipt.round_id,
                new_balance: receipt.new_balance,
            },
            Err(err) => error_response(Some(request_id), err),
        },
        Command::CashOut {
            request_id,
            bet_id,
            multiplier,
        } => match context.engine.cash_out(user_id, bet_id, multiplier) {
            Ok(receipt) => Response::CashOutOk {
                request_id,
                win_amount: receipt.win_amount,
                multiplier: receipt.multiplier,
                new_balance: receipt.new_balance,
            },
            Err(err) => error_response(Some(request_id), err),
        },
        Command::Ping => Response::Pong {
            server_time_ms: now_ms(),
        },
    }
}

fn error_response(request_id: Option<String>, err: GameError) -> Response {
    Response::Error {
        request_id,
        code: err.code(),
        message: err.to_string(),
    }
}

fn enqueue_response(context: &AppContext, out_tx: &mpsc::Sender<Message>, response: &Response) -> bool {
    let payload = match serde_json::to_string(response) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(?err, "failed to encode response");
            return true;
        }
    };
    match out_tx.try_send(Message::Text(payload)) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            context.metrics.inc_queue_full();
            false
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
