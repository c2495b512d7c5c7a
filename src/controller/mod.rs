//! Controller-facing command channel.
//!
//! The controller protocol is one command per connection: open, write the
//! raw lamp-color string, read a bounded acknowledgment, close. A response
//! equal to the literal token `SUCCESS`, with or without surrounding
//! quotes, is the only acknowledgment treated as success. There is no
//! pooling and no internal retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::ChannelError;
use crate::phase::{PhaseId, PhasePlan};

/// Literal acknowledgment token expected from the controller.
const ACK_TOKEN: &str = "SUCCESS";

/// Upper bound on acknowledgment reads.
const MAX_ACK_BYTES: usize = 256;

/// Acknowledgment returned by a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// The acknowledgment token as received, trimmed of framing.
    pub response: String,
}

/// Delivery of lamp commands to the signal controller.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    /// Delivers the lamp command for `phase` and awaits acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] on connection failure, I/O error,
    /// timeout, or a non-success response.
    async fn send(&self, phase: PhaseId) -> Result<Ack, ChannelError>;
}

/// Strips transport framing from a raw acknowledgment: surrounding
/// whitespace and one layer of double quotes.
fn ack_token(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim()
}

/// TCP command channel: a fresh connection per command.
#[derive(Debug, Clone)]
pub struct TcpCommandChannel {
    addr: String,
    plan: Arc<PhasePlan>,
    connect_timeout: Duration,
    response_timeout: Duration,
}

impl TcpCommandChannel {
    /// Creates a channel targeting `addr` with the given per-step timeouts.
    #[must_use]
    pub const fn new(
        addr: String,
        plan: Arc<PhasePlan>,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> Self {
        Self {
            addr,
            plan,
            connect_timeout,
            response_timeout,
        }
    }
}

#[async_trait]
impl CommandChannel for TcpCommandChannel {
    async fn send(&self, phase: PhaseId) -> Result<Ack, ChannelError> {
        let lamp = self
            .plan
            .lamp(phase)
            .ok_or(ChannelError::UnknownPhase(phase))?;

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| ChannelError::ConnectTimeout {
                addr: self.addr.clone(),
            })?
            .map_err(|e| ChannelError::Connect {
                addr: self.addr.clone(),
                source: e,
            })?;

        stream.write_all(lamp.as_bytes()).await?;
        stream.flush().await?;

        let mut buf = vec![0u8; MAX_ACK_BYTES];
        let n = timeout(self.response_timeout, stream.read(&mut buf))
            .await
            .map_err(|_| ChannelError::AckTimeout)??;
        if n == 0 {
            return Err(ChannelError::ConnectionClosed);
        }

        let raw = String::from_utf8_lossy(&buf[..n]);
        let token = ack_token(&raw);
        if token == ACK_TOKEN {
            debug!(%phase, lamp, "controller acknowledged command");
            Ok(Ack {
                response: token.to_string(),
            })
        } else {
            Err(ChannelError::Rejected {
                response: raw.into_owned(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_token_plain() {
        assert_eq!(ack_token("SUCCESS"), "SUCCESS");
    }

    #[test]
    fn ack_token_quoted() {
        assert_eq!(ack_token("\"SUCCESS\""), "SUCCESS");
    }

    #[test]
    fn ack_token_trailing_newline() {
        assert_eq!(ack_token("\"SUCCESS\"\n"), "SUCCESS");
        assert_eq!(ack_token("SUCCESS\r\n"), "SUCCESS");
    }

    #[test]
    fn ack_token_rejects_other_tokens() {
        assert_ne!(ack_token("\"FAILURE\""), ACK_TOKEN);
        assert_ne!(ack_token(""), ACK_TOKEN);
        // Quotes in the middle are payload, not framing
        assert_ne!(ack_token("SUC\"CESS"), ACK_TOKEN);
    }
}
