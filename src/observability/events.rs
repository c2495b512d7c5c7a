//! Structured event stream.
//!
//! Discrete, typed events emitted during agent operation, serialized as
//! newline-delimited JSON with a monotonically increasing sequence number
//! for ordering. The stream captures exactly the state changes an
//! operator reviews after the fact: transitions, rejections, command
//! failures, and detector connection churn.

use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::phase::PhaseId;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during agent operation.
///
/// Each variant is tagged with `"type"` when serialized so consumers can
/// dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// The agent has started and is accepting detector connections.
    ServerStarted {
        /// When the agent started.
        timestamp: DateTime<Utc>,
        /// Bound detector listener address.
        listen_addr: String,
        /// Name of the active decision policy.
        oracle: String,
    },

    /// The agent has stopped.
    ServerStopped {
        /// When the agent stopped.
        timestamp: DateTime<Utc>,
        /// Human-readable stop reason.
        reason: String,
    },

    /// A green phase became active after a completed transition.
    PhaseEntered {
        /// When the target green was commanded.
        timestamp: DateTime<Utc>,
        /// The green phase now active.
        phase: PhaseId,
        /// The green phase that was left.
        from: PhaseId,
        /// The interposed yellow interphase.
        via: PhaseId,
    },

    /// A transition request was evaluated and declined.
    TransitionRejected {
        /// When the request was evaluated.
        timestamp: DateTime<Utc>,
        /// The requested target phase.
        target: PhaseId,
        /// Why the request was a no-op.
        reason: String,
    },

    /// A lamp command could not be delivered to the controller.
    CommandSendFailed {
        /// When the send failed.
        timestamp: DateTime<Utc>,
        /// The phase whose command failed.
        phase: PhaseId,
        /// Failure description.
        error: String,
    },

    /// A detector connected.
    DetectorConnected {
        /// When the connection was accepted.
        timestamp: DateTime<Utc>,
        /// Connection id, unique for the process lifetime.
        connection_id: u64,
        /// Remote address of the detector.
        remote_addr: String,
    },

    /// A detector connection ended.
    DetectorDisconnected {
        /// When the connection ended.
        timestamp: DateTime<Utc>,
        /// Connection id.
        connection_id: u64,
    },
}

/// Wraps an [`Event`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope<'a> {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// The wrapped event (flattened into the same JSON object).
    #[serde(flatten)]
    event: &'a Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each `emit` atomically takes a sequence number, serializes the event as
/// one JSON line, and flushes. Serialization or I/O failures are silently
/// dropped: observability must never take the agent down.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr, keeping stdout free.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that silently discards all events.
    #[must_use]
    pub fn null() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Emits one event as a JSON line.
    pub fn emit(&self, event: &Event) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope { sequence, event };
        let Ok(line) = serde_json::to_string(&envelope) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Writer handing emitted bytes back to the test.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    #[test]
    fn emits_tagged_jsonl_with_sequence() {
        let buf = SharedBuf::default();
        let emitter = EventEmitter::new(Box::new(buf.clone()));

        emitter.emit(&Event::PhaseEntered {
            timestamp: Utc::now(),
            phase: PhaseId(2),
            from: PhaseId(0),
            via: PhaseId(4),
        });
        emitter.emit(&Event::TransitionRejected {
            timestamp: Utc::now(),
            target: PhaseId(1),
            reason: "minimum green unmet (5/10s)".to_string(),
        });

        let lines = buf.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "PhaseEntered");
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[0]["phase"], 2);
        assert_eq!(lines[1]["type"], "TransitionRejected");
        assert_eq!(lines[1]["sequence"], 1);
    }

    #[test]
    fn null_emitter_discards() {
        let emitter = EventEmitter::null();
        emitter.emit(&Event::ServerStopped {
            timestamp: Utc::now(),
            reason: "test".to_string(),
        });
    }
}
