//! Agent runtime wiring configuration into running components.
//!
//! [`Server`] builds the phase plan, command channel, state machine, and
//! decision oracle from a loaded configuration, then hands the detector
//! listener the lot and runs it until cancelled.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::schema::AgentConfig;
use crate::controller::TcpCommandChannel;
use crate::error::GreenwaveError;
use crate::ingress::observation::ObservationLayout;
use crate::ingress::{IngressOptions, IngressServer};
use crate::observability::events::{Event, EventEmitter};
use crate::oracle;
use crate::phase::{PhasePlan, PhaseStateMachine};

/// Options for constructing a [`Server`].
pub struct ServerOptions {
    /// Parsed agent configuration.
    pub config: Arc<AgentConfig>,
    /// CLI override for the detector listener address.
    pub listen_override: Option<String>,
    /// CLI override for the controller address.
    pub controller_override: Option<String>,
    /// Event emitter for the structured event stream.
    pub events: Arc<EventEmitter>,
    /// Token for cooperative shutdown.
    pub cancel: CancellationToken,
}

/// The assembled agent.
pub struct Server {
    ingress: Arc<IngressServer>,
    machine: Arc<PhaseStateMachine>,
    events: Arc<EventEmitter>,
}

impl Server {
    /// Builds every component from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the phase tables are inconsistent or the
    /// configured oracle cannot be constructed.
    pub fn new(opts: ServerOptions) -> Result<Self, GreenwaveError> {
        let config = &opts.config;
        let plan = Arc::new(PhasePlan::from_config(&config.intersection)?);

        let controller_addr = opts
            .controller_override
            .unwrap_or_else(|| config.controller.addr());
        let channel = Arc::new(TcpCommandChannel::new(
            controller_addr.clone(),
            Arc::clone(&plan),
            Duration::from_secs(config.controller.connect_timeout_secs),
            Duration::from_secs(config.controller.response_timeout_secs),
        ));

        let machine = Arc::new(PhaseStateMachine::new(
            Arc::clone(&plan),
            channel,
            &config.timing,
            config.controller.on_send_failure,
            Arc::clone(&opts.events),
        ));

        let oracle = oracle::from_config(&config.oracle, plan.greens().to_vec())?;

        let bind_addr = opts
            .listen_override
            .unwrap_or_else(|| config.listener.addr());
        let ingress = IngressServer::new(
            IngressOptions {
                bind_addr,
                max_payload_bytes: config.listener.max_payload_bytes,
                decision_interval: Duration::from_secs(config.timing.decision_interval_secs),
                layout: ObservationLayout {
                    raw_len: config.detector.raw_feature_count,
                    green_count: plan.green_count(),
                },
            },
            Arc::clone(&machine),
            oracle,
            Arc::clone(&opts.events),
            opts.cancel,
        );

        info!(
            initial_phase = %plan.initial_phase(),
            greens = plan.green_count(),
            lanes = plan.lamp_len(),
            %controller_addr,
            "agent assembled"
        );

        Ok(Self {
            ingress,
            machine,
            events: opts.events,
        })
    }

    /// The phase state machine (for tests and diagnostics).
    #[must_use]
    pub fn machine(&self) -> &Arc<PhaseStateMachine> {
        &self.machine
    }

    /// Runs the agent until the cancellation token fires.
    ///
    /// # Errors
    ///
    /// Returns an error only if the detector listener cannot bind.
    pub async fn run(&self) -> Result<(), GreenwaveError> {
        let result = Arc::clone(&self.ingress).serve().await;
        self.events.emit(&Event::ServerStopped {
            timestamp: Utc::now(),
            reason: match &result {
                Ok(()) => "shutdown requested".to_string(),
                Err(e) => e.to_string(),
            },
        });
        result
    }
}
