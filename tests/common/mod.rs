//! Shared integration-test harness: a fake signal controller speaking the
//! one-command-per-connection protocol, plus builders for wiring agent
//! components against it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use greenwave::config::schema::{SendFailurePolicy, TimingConfig};
use greenwave::controller::TcpCommandChannel;
use greenwave::ingress::observation::ObservationLayout;
use greenwave::ingress::{IngressOptions, IngressServer};
use greenwave::observability::events::EventEmitter;
use greenwave::oracle::DecisionOracle;
use greenwave::phase::{PhaseId, PhasePlan, PhaseStateMachine};

use indexmap::IndexMap;

/// How the fake controller answers each command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    /// Reply with the bare token.
    Success,
    /// Reply with the JSON-quoted token, as the reference controller does.
    QuotedSuccess,
    /// Reply with a non-success token.
    Failure,
    /// Read the command but never reply.
    Silent,
    /// Close the connection without replying.
    CloseWithoutReply,
}

/// In-process fake signal controller.
///
/// Accepts one command per connection, records the raw lamp string, and
/// answers according to its mode.
pub struct FakeController {
    pub addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicU64>,
}

impl FakeController {
    /// Binds an ephemeral port and serves until the test ends.
    pub async fn spawn(mode: ControllerMode) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake controller");
        let addr = listener.local_addr().expect("no local addr");
        let commands = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicU64::new(0));

        let task_commands = Arc::clone(&commands);
        let task_connections = Arc::clone(&connections);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                task_connections.fetch_add(1, Ordering::SeqCst);

                let commands = Arc::clone(&task_commands);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 256];
                    let Ok(n) = socket.read(&mut buf).await else {
                        return;
                    };
                    if n == 0 {
                        return;
                    }
                    commands
                        .lock()
                        .unwrap()
                        .push(String::from_utf8_lossy(&buf[..n]).into_owned());

                    match mode {
                        ControllerMode::Success => {
                            let _ = socket.write_all(b"SUCCESS").await;
                        }
                        ControllerMode::QuotedSuccess => {
                            let _ = socket.write_all(b"\"SUCCESS\"").await;
                        }
                        ControllerMode::Failure => {
                            let _ = socket.write_all(b"\"FAILURE\"").await;
                        }
                        ControllerMode::Silent => {
                            // Hold the socket open past any response timeout.
                            tokio::time::sleep(Duration::from_secs(30)).await;
                        }
                        ControllerMode::CloseWithoutReply => {}
                    }
                });
            }
        });

        Self {
            addr,
            commands,
            connections,
        }
    }

    /// Lamp strings received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Number of connections accepted so far.
    pub fn connection_count(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Reference intersection used across the integration tests: four greens
/// (0-3), their interphases (4-7), eight logical lanes.
pub fn four_green_plan() -> Arc<PhasePlan> {
    let greens = vec![PhaseId(0), PhaseId(1), PhaseId(2), PhaseId(3)];
    let yellow_of = IndexMap::from([
        (PhaseId(0), PhaseId(4)),
        (PhaseId(1), PhaseId(5)),
        (PhaseId(2), PhaseId(6)),
        (PhaseId(3), PhaseId(7)),
    ]);
    let lamps = IndexMap::from([
        (PhaseId(0), "GGrrrrrr".to_string()),
        (PhaseId(1), "rrGGrrrr".to_string()),
        (PhaseId(2), "rrrrGGrr".to_string()),
        (PhaseId(3), "rrrrrrGG".to_string()),
        (PhaseId(4), "yyrrrrrr".to_string()),
        (PhaseId(5), "rryyrrrr".to_string()),
        (PhaseId(6), "rrrryyrr".to_string()),
        (PhaseId(7), "rrrrrryy".to_string()),
    ]);
    Arc::new(PhasePlan::new(PhaseId(0), greens, yellow_of, lamps).expect("valid plan"))
}

/// Observation shapes matching [`four_green_plan`]: 8 raw features.
pub const LAYOUT: ObservationLayout = ObservationLayout {
    raw_len: 8,
    green_count: 4,
};

pub fn timing(min_green_secs: u64, yellow_secs: u64) -> TimingConfig {
    TimingConfig {
        min_green_secs,
        yellow_secs,
        decision_interval_secs: 1,
    }
}

/// Builds a state machine wired to the fake controller over real TCP.
pub fn machine_against(
    controller: &FakeController,
    timing: &TimingConfig,
    policy: SendFailurePolicy,
) -> Arc<PhaseStateMachine> {
    let plan = four_green_plan();
    let channel = Arc::new(TcpCommandChannel::new(
        controller.addr.to_string(),
        Arc::clone(&plan),
        Duration::from_secs(1),
        Duration::from_millis(500),
    ));
    Arc::new(PhaseStateMachine::new(
        plan,
        channel,
        timing,
        policy,
        Arc::new(EventEmitter::null()),
    ))
}

/// Running agent pieces returned by [`spawn_agent`].
pub struct Agent {
    pub listen_addr: SocketAddr,
    pub machine: Arc<PhaseStateMachine>,
    pub cancel: CancellationToken,
}

/// Spawns the full ingress pipeline on an ephemeral port.
pub async fn spawn_agent(
    controller: &FakeController,
    oracle: Arc<dyn DecisionOracle>,
    timing: &TimingConfig,
) -> Agent {
    let machine = machine_against(controller, timing, SendFailurePolicy::Advance);
    let cancel = CancellationToken::new();
    let ingress = IngressServer::new(
        IngressOptions {
            bind_addr: "127.0.0.1:0".to_string(),
            max_payload_bytes: 1024,
            decision_interval: Duration::from_secs(timing.decision_interval_secs),
            layout: LAYOUT,
        },
        Arc::clone(&machine),
        oracle,
        Arc::new(EventEmitter::null()),
        cancel.clone(),
    );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ingress listener");
    let listen_addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        let _ = ingress.serve_on(listener).await;
    });

    Agent {
        listen_addr,
        machine,
        cancel,
    }
}

/// Polls until the machine settles on `expected`, or panics after the
/// deadline.
pub async fn wait_for_phase(machine: &PhaseStateMachine, expected: PhaseId, deadline: Duration) {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if machine.current_phase() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "machine never reached phase {expected}; still on {}",
        machine.current_phase()
    );
}
