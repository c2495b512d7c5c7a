//! Detector-facing ingress.
//!
//! Accepts detector connections and runs one decision loop per
//! connection: read a payload, wait out the decision cadence, and, only
//! while a green phase is active, decode, consult the oracle, and submit
//! the resulting target to the state machine. Decode and oracle failures
//! skip the cycle; I/O failures end that connection's loop only.

pub mod observation;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{GreenwaveError, IngressError};
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;
use crate::oracle::DecisionOracle;
use crate::phase::PhaseStateMachine;

use observation::{DecodedPayload, Observation, ObservationLayout};

/// Ingress settings distilled from the configuration file.
#[derive(Debug, Clone)]
pub struct IngressOptions {
    /// Listener bind address, `host:port`.
    pub bind_addr: String,
    /// Upper bound on a single detector read.
    pub max_payload_bytes: usize,
    /// Pause between decision cycles on each connection.
    pub decision_interval: Duration,
    /// Accepted observation vector shapes.
    pub layout: ObservationLayout,
}

/// Per-connection bookkeeping.
#[derive(Debug)]
struct ConnectionInfo {
    remote_addr: SocketAddr,
    connected_at: Instant,
}

/// RAII guard that deregisters a connection on all exit paths.
struct ConnectionGuard {
    server: Arc<IngressServer>,
    connection_id: u64,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some((_, info)) = self.server.connections.remove(&self.connection_id) {
            debug!(
                connection_id = self.connection_id,
                remote_addr = %info.remote_addr,
                connected_for = ?info.connected_at.elapsed(),
                "detector connection closed"
            );
        }
        metrics::set_connections_active(self.server.connections.len() as u64);
        self.server.events.emit(&Event::DetectorDisconnected {
            timestamp: Utc::now(),
            connection_id: self.connection_id,
        });
    }
}

/// The detector-facing TCP server.
pub struct IngressServer {
    opts: IngressOptions,
    machine: Arc<PhaseStateMachine>,
    oracle: Arc<dyn DecisionOracle>,
    events: Arc<EventEmitter>,
    connections: DashMap<u64, ConnectionInfo>,
    next_connection_id: AtomicU64,
    cancel: CancellationToken,
}

impl IngressServer {
    /// Creates the server; nothing is bound until [`serve`](Self::serve).
    #[must_use]
    pub fn new(
        opts: IngressOptions,
        machine: Arc<PhaseStateMachine>,
        oracle: Arc<dyn DecisionOracle>,
        events: Arc<EventEmitter>,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            opts,
            machine,
            oracle,
            events,
            connections: DashMap::new(),
            next_connection_id: AtomicU64::new(1),
            cancel,
        })
    }

    /// Binds the configured address and serves until cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error only if the listener cannot bind, the single
    /// process-fatal condition.
    pub async fn serve(self: Arc<Self>) -> Result<(), GreenwaveError> {
        let listener = TcpListener::bind(&self.opts.bind_addr)
            .await
            .map_err(|e| IngressError::Bind {
                addr: self.opts.bind_addr.clone(),
                source: e,
            })?;
        self.serve_on(listener).await
    }

    /// Serves on an already-bound listener (lets tests bind port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve_on(self: Arc<Self>, listener: TcpListener) -> Result<(), GreenwaveError> {
        let local_addr = listener.local_addr()?;
        info!(%local_addr, oracle = self.oracle.name(), "detector listener started");
        self.events.emit(&Event::ServerStarted {
            timestamp: Utc::now(),
            listen_addr: local_addr.to_string(),
            oracle: self.oracle.name().to_string(),
        });

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    info!("ingress shutting down");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.accept_connection(stream, peer),
                        Err(e) => warn!(error = %e, "accept failed"),
                    }
                }
            }
        }
        Ok(())
    }

    fn accept_connection(self: &Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::SeqCst);
        self.connections.insert(
            connection_id,
            ConnectionInfo {
                remote_addr: peer,
                connected_at: Instant::now(),
            },
        );
        metrics::set_connections_active(self.connections.len() as u64);
        info!(connection_id, %peer, "detector connected");
        self.events.emit(&Event::DetectorConnected {
            timestamp: Utc::now(),
            connection_id,
            remote_addr: peer.to_string(),
        });

        let server = Arc::clone(self);
        tokio::spawn(async move {
            server.handle_detector(stream, connection_id).await;
        });
    }

    /// Per-connection receive loop.
    async fn handle_detector(self: Arc<Self>, mut stream: TcpStream, connection_id: u64) {
        let _guard = ConnectionGuard {
            server: Arc::clone(&self),
            connection_id,
        };
        let mut buf = vec![0u8; self.opts.max_payload_bytes];

        loop {
            let n = tokio::select! {
                () = self.cancel.cancelled() => break,
                read = stream.read(&mut buf) => match read {
                    Ok(0) => {
                        debug!(connection_id, "detector closed the connection");
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        warn!(connection_id, error = %e, "detector read failed");
                        break;
                    }
                },
            };

            // Fixed cadence: one decision per interval regardless of how
            // fast the detector writes.
            tokio::time::sleep(self.opts.decision_interval).await;

            self.run_decision_cycle(&buf[..n], connection_id).await;
        }
    }

    /// One decision cycle: classify, assemble, predict, submit.
    async fn run_decision_cycle(&self, payload: &[u8], connection_id: u64) {
        metrics::record_observation();

        // Interphases are never decision points; skip the cycle entirely.
        let Some(snapshot) = self.machine.green_snapshot() else {
            debug!(connection_id, "mid-interphase, skipping decision cycle");
            return;
        };
        debug!(
            connection_id,
            phase = %snapshot.phase,
            dwell_secs = snapshot.elapsed_secs,
            "decision cycle"
        );

        let observation = match observation::decode(payload, self.opts.layout) {
            Ok(DecodedPayload::Full(obs)) => obs,
            Ok(DecodedPayload::Raw(raw)) => Observation::assemble(
                raw,
                snapshot.green_index,
                snapshot.min_green_satisfied,
                self.opts.layout,
            ),
            Err(e) => {
                warn!(connection_id, error = %e, "discarding malformed observation");
                metrics::record_decode_error();
                return;
            }
        };

        let target = match self.oracle.predict(&observation) {
            Ok(target) => target,
            Err(e) => {
                warn!(connection_id, error = %e, "oracle failed, skipping cycle");
                metrics::record_oracle_error();
                return;
            }
        };
        metrics::record_decision(target);
        debug!(connection_id, %target, "oracle decision");

        self.machine.request_transition(target).await;
    }
}

impl std::fmt::Debug for IngressServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngressServer")
            .field("bind_addr", &self.opts.bind_addr)
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}
