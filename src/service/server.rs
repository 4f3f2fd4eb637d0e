//! # TCP Server
//!
//! Accept loop and per-connection handler around the frame and packet
//! codecs. Each accepted connection is owned exclusively by one spawned
//! task running a strictly sequential loop: read one frame, decode,
//! dispatch, encode the response, write one frame.
//!
//! A malformed frame or packet closes only the offending connection; the
//! server keeps serving the others. Nothing in this module panics on peer
//! input.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::Framed;
use tracing::{debug, error, info, instrument, warn};

use crate::config::NetworkConfig;
use crate::core::frame::FrameCodec;
use crate::core::packet::{Packet, RESULT_OK, TAG_BYE, TAG_CONN, TAG_SUBMIT};
use crate::error::{ProtocolError, Result};
use crate::protocol::dispatcher::Dispatcher;

/// Build the stock dispatcher: every request tag is acknowledged with
/// `result == 0`, and a submit ack echoes the request identifier.
pub fn default_dispatcher() -> Result<Dispatcher> {
    let dispatcher = Dispatcher::new();

    dispatcher.register(TAG_CONN, |_| Ok(Packet::ConnAck { result: RESULT_OK }))?;

    dispatcher.register(TAG_SUBMIT, |packet| match packet {
        Packet::Submit { id } => Ok(Packet::SubmitAck {
            id: *id,
            result: RESULT_OK,
        }),
        _ => Err(ProtocolError::UnexpectedPacket),
    })?;

    dispatcher.register(TAG_BYE, |_| Ok(Packet::ByeAck { result: RESULT_OK }))?;

    Ok(dispatcher)
}

/// Start a TCP server with the stock dispatcher and a ctrl-c shutdown
/// handler.
#[instrument(skip(config), fields(address = %config.server.address))]
pub async fn start_server(config: &NetworkConfig) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx_clone.send(()).await;
        }
    });

    let listener = TcpListener::bind(&config.server.address).await?;
    info!(address = %config.server.address, "Listening");

    serve_with_shutdown(listener, Arc::new(default_dispatcher()?), config, shutdown_rx).await
}

/// Run the accept loop on an already-bound listener until the shutdown
/// channel fires, then drain active connections with a bounded wait.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    config: &NetworkConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let max_frame_size = config.transport.max_frame_size;
    let max_connections = config.server.max_connections;
    let connection_timeout = config.server.connection_timeout;
    let shutdown_timeout = config.server.shutdown_timeout;
    // Track active connections
    let active_connections = Arc::new(Mutex::new(0u32));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");

                let timeout = tokio::time::sleep(shutdown_timeout);
                tokio::pin!(timeout);

                loop {
                    tokio::select! {
                        _ = &mut timeout => {
                            warn!("Shutdown timeout reached, forcing exit");
                            break;
                        }
                        _ = tokio::time::sleep(Duration::from_millis(500)) => {
                            let connections = *active_connections.lock().await;
                            info!(connections = %connections, "Waiting for connections to close");
                            if connections == 0 {
                                info!("All connections closed, shutting down");
                                break;
                            }
                        }
                    }
                }

                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let dispatcher = Arc::clone(&dispatcher);
                        let active_connections = Arc::clone(&active_connections);

                        {
                            let mut count = active_connections.lock().await;
                            if *count as usize >= max_connections {
                                warn!(peer = %peer, "Refusing connection: at capacity");
                                drop(stream);
                                continue;
                            }
                            *count += 1;
                        }

                        tokio::spawn(async move {
                            // Run the handler as its own task so the slot is
                            // released even if it panics.
                            let conn = tokio::spawn(handle_conn(
                                stream,
                                peer,
                                dispatcher,
                                max_frame_size,
                                connection_timeout,
                            ));
                            let _ = conn.await;

                            let mut count = active_connections.lock().await;
                            *count -= 1;
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Sequential per-connection loop. Returns when the peer closes, sends
/// `Bye`, or violates the protocol; every exit path only affects this
/// connection.
#[instrument(skip(stream, dispatcher, peer), fields(peer = %peer))]
async fn handle_conn(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    max_frame_size: usize,
    connection_timeout: Duration,
) {
    info!("New connection established");
    let mut framed = Framed::new(stream, FrameCodec::new(max_frame_size));

    loop {
        // Each read is bounded: an idle peer may not hold its slot forever.
        let next = match tokio::time::timeout(connection_timeout, framed.next()).await {
            Ok(Some(next)) => next,
            Ok(None) => break,
            Err(_) => {
                warn!(timeout = ?connection_timeout, "Closing connection: idle timeout");
                break;
            }
        };

        let payload = match next {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Closing connection: framing error");
                break;
            }
        };

        let packet = match Packet::decode(&payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, "Closing connection: undecodable packet");
                break;
            }
        };
        debug!(packet = packet.tag_name(), "Packet received");

        let closing = matches!(packet, Packet::Bye);

        let response = match dispatcher.dispatch(&packet) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, packet = packet.tag_name(), "Closing connection: dispatch failed");
                break;
            }
        };

        if let Err(e) = framed.send(response.encode()).await {
            warn!(error = %e, "Closing connection: write failed");
            break;
        }

        if closing {
            debug!("Peer said goodbye");
            break;
        }
    }

    info!("Connection closed");
}
