//! # TCP Client
//!
//! A thin request/acknowledgement client over the framed codec. Each call
//! sends one packet and waits (bounded by the configured response timeout)
//! for the matching ack.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::core::frame::FrameCodec;
use crate::core::packet::{Packet, PacketId};
use crate::error::{ProtocolError, Result};
use crate::utils::timeout::with_timeout;

/// A connected protocol client.
pub struct Client {
    framed: Framed<TcpStream, FrameCodec>,
    response_timeout: Duration,
}

impl Client {
    /// Connect with default client settings.
    #[instrument]
    pub async fn connect(addr: &str) -> Result<Self> {
        let config = ClientConfig {
            address: addr.to_string(),
            ..ClientConfig::default()
        };
        Self::connect_with_config(&config).await
    }

    /// Connect using an explicit [`ClientConfig`].
    #[instrument(skip(config), fields(address = %config.address))]
    pub async fn connect_with_config(config: &ClientConfig) -> Result<Self> {
        let stream = with_timeout(config.connection_timeout, async {
            Ok(TcpStream::connect(&config.address).await?)
        })
        .await?;

        debug!("Connected");
        Ok(Self {
            framed: Framed::new(stream, FrameCodec::default()),
            response_timeout: config.response_timeout,
        })
    }

    /// Perform the connection-establishment exchange. Returns the server's
    /// result code (`0` on success).
    pub async fn handshake(&mut self) -> Result<u8> {
        match self.roundtrip(Packet::Conn).await? {
            Packet::ConnAck { result } => Ok(result),
            _ => Err(ProtocolError::UnexpectedPacket),
        }
    }

    /// Submit a request under `id` and wait for its acknowledgement.
    ///
    /// Verifies the ack echoes the request identifier before returning the
    /// result code.
    pub async fn submit(&mut self, id: &str) -> Result<u8> {
        let id = PacketId::new(id)?;
        match self.roundtrip(Packet::Submit { id }).await? {
            Packet::SubmitAck { id: ack_id, result } if ack_id == id => Ok(result),
            _ => Err(ProtocolError::UnexpectedPacket),
        }
    }

    /// Announce termination and consume the connection. Returns the
    /// server's result code from the `ByeAck`.
    pub async fn close(mut self) -> Result<u8> {
        match self.roundtrip(Packet::Bye).await? {
            Packet::ByeAck { result } => Ok(result),
            _ => Err(ProtocolError::UnexpectedPacket),
        }
    }

    /// One sequential request/response exchange over the framed stream.
    async fn roundtrip(&mut self, request: Packet) -> Result<Packet> {
        debug!(packet = request.tag_name(), "Sending request");
        self.framed.send(request.encode()).await?;

        let framed = &mut self.framed;
        let response = with_timeout(self.response_timeout, async move {
            match framed.next().await {
                Some(Ok(payload)) => Ok(Packet::decode(&payload)?),
                Some(Err(e)) => Err(e),
                None => Err(ProtocolError::ConnectionClosed),
            }
        })
        .await?;

        debug!(packet = response.tag_name(), "Received response");
        Ok(response)
    }
}
