//! Auto-order dry run, test email and execution gate for one product.
//!
//! Every `open` takes a new generation number. Completions carry the
//! [`SimulationTicket`] they were started with and are applied only while
//! that ticket is still current; anything else is a stale response and is
//! dropped. The session mutex is never held across a remote call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::domain::validation::resolve_recipient;
use crate::domain::{
    AutoOrderSimulation, DeskEvent, EventBus, ProductId, RenderedPreview,
    decode_simulation_payload,
};
use crate::error::DeskError;
use crate::remote::{SimulationAck, SimulationService};

/// Workflow state of the simulation panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SimulationState {
    /// No product open.
    Closed,
    /// Placeholders reset, service not called yet.
    Opening,
    /// Waiting for the simulation service.
    Running,
    /// Result applied; test email and execution may be offered.
    Ready,
    /// A test email request is in flight.
    SendingTestEmail,
    /// An order-creation request is in flight.
    Executing,
}

/// Identifies the `open` a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationTicket {
    /// Product the request targets.
    pub product_id: ProductId,
    /// Generation taken when the request started.
    pub generation: u64,
}

/// Read-only view of the open simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationView {
    /// Workflow state.
    pub state: SimulationState,
    /// Latest simulation (placeholder while running).
    pub simulation: AutoOrderSimulation,
    /// Preview escaped for HTML display.
    pub escaped_preview: RenderedPreview,
    /// Message of the last successful action.
    pub last_message: Option<String>,
    /// Message of the last failed action.
    pub last_error: Option<String>,
}

/// What became of a panel action.
#[derive(Debug, Clone)]
pub enum PanelUpdate {
    /// The action applied to the open panel.
    Applied(SimulationView),
    /// A newer `open` or a `close` replaced the panel while the service
    /// was working, so there is nothing to show.
    Superseded {
        /// Service reply when the action itself still went through.
        message: Option<String>,
    },
}

/// Result of a successful [`SimulationController::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ExecutionOutcome {
    /// Ordered product.
    #[schema(value_type = i64)]
    pub product_id: ProductId,
    /// Service message.
    pub message: String,
    /// Created order identifier.
    pub order_number: Option<String>,
}

#[derive(Debug)]
struct Session {
    ticket: SimulationTicket,
    state: SimulationState,
    simulation: AutoOrderSimulation,
    last_message: Option<String>,
    last_error: Option<String>,
}

impl Session {
    fn view(&self) -> SimulationView {
        SimulationView {
            state: self.state,
            escaped_preview: self.simulation.rendered_preview.escaped(),
            simulation: self.simulation.clone(),
            last_message: self.last_message.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Controller of the simulation panel. At most one product is open.
#[derive(Debug)]
pub struct SimulationController {
    service: Arc<dyn SimulationService>,
    event_bus: EventBus,
    generation: AtomicU64,
    session: Mutex<Option<Session>>,
}

impl SimulationController {
    /// Creates a closed controller.
    #[must_use]
    pub fn new(service: Arc<dyn SimulationService>, event_bus: EventBus) -> Self {
        Self {
            service,
            event_bus,
            generation: AtomicU64::new(0),
            session: Mutex::new(None),
        }
    }

    /// Current state, [`SimulationState::Closed`] when nothing is open.
    pub async fn state(&self) -> SimulationState {
        self.session
            .lock()
            .await
            .as_ref()
            .map_or(SimulationState::Closed, |s| s.state)
    }

    /// View of the open simulation, if any.
    pub async fn view(&self) -> Option<SimulationView> {
        self.session.lock().await.as_ref().map(Session::view)
    }

    /// Opens `product_id`, superseding whatever was open, and runs the
    /// simulation.
    ///
    /// Service failures are shown inline as a single error row and still
    /// reach [`SimulationState::Ready`] with execution disabled. When
    /// another `open` or a `close` happens while the service is running,
    /// the result is dropped and [`PanelUpdate::Superseded`] is returned.
    pub async fn open(&self, product_id: ProductId, product_name: &str) -> PanelUpdate {
        let ticket = self.begin(product_id, product_name).await;
        if !self.transition(ticket, SimulationState::Running).await {
            return PanelUpdate::Superseded { message: None };
        }
        tracing::debug!(%product_id, generation = ticket.generation, "simulation running");
        let outcome = self.service.simulate(product_id).await;
        match self.on_simulation_result(ticket, outcome).await {
            Ok(view) => PanelUpdate::Applied(view),
            Err(_) => PanelUpdate::Superseded { message: None },
        }
    }

    /// Applies a simulation completion if `ticket` is still current.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::Stale`] when the ticket has been superseded.
    pub async fn on_simulation_result(
        &self,
        ticket: SimulationTicket,
        outcome: Result<Value, DeskError>,
    ) -> Result<SimulationView, DeskError> {
        let mut guard = self.session.lock().await;
        let Some(session) = guard.as_mut().filter(|s| s.ticket == ticket) else {
            tracing::debug!(
                product_id = %ticket.product_id,
                generation = ticket.generation,
                "discarding stale simulation result"
            );
            return Err(DeskError::Stale);
        };

        let product_name = session.simulation.product_name.clone();
        let simulation = match outcome
            .and_then(|payload| decode_simulation_payload(ticket.product_id, &product_name, &payload))
        {
            Ok(simulation) => {
                session.last_error = None;
                simulation
            }
            Err(e) => {
                tracing::warn!(product_id = %ticket.product_id, error = %e, "simulation failed");
                session.last_error = Some(e.to_string());
                AutoOrderSimulation::failed(ticket.product_id, &product_name, &e.to_string())
            }
        };
        session.simulation = simulation;
        session.state = SimulationState::Ready;

        let _ = self.event_bus.publish(DeskEvent::SimulationReady {
            product_id: ticket.product_id,
            can_execute: session.simulation.can_execute,
            timestamp: Utc::now(),
        });
        tracing::info!(
            product_id = %ticket.product_id,
            can_execute = session.simulation.can_execute,
            "simulation ready"
        );
        Ok(session.view())
    }

    /// Sends the auto-order email of the open product to a test address:
    /// `recipient` when entered, otherwise the supplier/company address
    /// reported by the simulation.
    ///
    /// An email delivered after the panel was superseded is still
    /// announced and comes back as [`PanelUpdate::Superseded`].
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidState`] unless `product_id` is open and
    /// ready, a [`DeskError::Validation`] (before any network call) when no
    /// valid address is available, and the service error otherwise.
    pub async fn send_test_email(
        &self,
        product_id: ProductId,
        recipient: Option<&str>,
    ) -> Result<PanelUpdate, DeskError> {
        let (ticket, address) = {
            let mut guard = self.session.lock().await;
            let session = ready_session(&mut guard, product_id)?;
            let address = match resolve_recipient(
                recipient,
                [session.simulation.fallback_recipient.as_deref()],
            ) {
                Ok(address) => address,
                Err(e) => {
                    session.last_error = Some(e.to_string());
                    return Err(e.into());
                }
            };
            session.state = SimulationState::SendingTestEmail;
            (session.ticket, address)
        };

        let outcome = self.service.send_test_email(product_id, &address).await;

        let mut guard = self.session.lock().await;
        let current = guard.as_mut().filter(|s| s.ticket == ticket);
        let Some(session) = current else {
            let ack = outcome?;
            tracing::info!(%product_id, recipient = %address, "test email sent after panel was superseded");
            let _ = self.event_bus.publish(DeskEvent::TestEmailSent {
                product_id,
                recipient: address,
                timestamp: Utc::now(),
            });
            return Ok(PanelUpdate::Superseded {
                message: Some(ack.message),
            });
        };
        session.state = SimulationState::Ready;
        match outcome {
            Ok(ack) => {
                tracing::info!(%product_id, recipient = %address, "test email sent");
                session.last_message = Some(ack.message);
                session.last_error = None;
                let _ = self.event_bus.publish(DeskEvent::TestEmailSent {
                    product_id,
                    recipient: address,
                    timestamp: Utc::now(),
                });
                Ok(PanelUpdate::Applied(session.view()))
            }
            Err(e) => {
                tracing::warn!(%product_id, error = %e, "test email failed");
                session.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Creates the real purchase order for the open product.
    ///
    /// On success the controller closes and an
    /// [`DeskEvent::AutoOrderExecuted`] tells dependent views to refresh.
    /// On failure it stays ready so the operator may retry.
    ///
    /// # Errors
    ///
    /// Returns [`DeskError::InvalidState`] unless `product_id` is open,
    /// ready and executable, and the service error otherwise.
    pub async fn execute(&self, product_id: ProductId) -> Result<ExecutionOutcome, DeskError> {
        let ticket = {
            let mut guard = self.session.lock().await;
            let session = ready_session(&mut guard, product_id)?;
            if !session.simulation.can_execute {
                return Err(DeskError::InvalidState(format!(
                    "auto order for product {product_id} is not executable"
                )));
            }
            session.state = SimulationState::Executing;
            session.ticket
        };

        let outcome = self.service.execute_auto_order(product_id).await;

        match outcome {
            Ok(SimulationAck {
                message,
                order_number,
            }) => {
                tracing::info!(%product_id, order_number = ?order_number, "auto order executed");
                let _ = self.event_bus.publish(DeskEvent::AutoOrderExecuted {
                    product_id,
                    order_number: order_number.clone(),
                    timestamp: Utc::now(),
                });
                self.close_ticket(ticket).await;
                Ok(ExecutionOutcome {
                    product_id,
                    message,
                    order_number,
                })
            }
            Err(e) => {
                tracing::warn!(%product_id, error = %e, "auto order failed");
                let mut guard = self.session.lock().await;
                if let Some(session) = guard.as_mut().filter(|s| s.ticket == ticket) {
                    session.state = SimulationState::Ready;
                    session.last_error = Some(e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Discards the open simulation. Returns `true` if one was open.
    pub async fn close(&self) -> bool {
        let _ = self.generation.fetch_add(1, Ordering::SeqCst);
        let closed = self.session.lock().await.take();
        self.announce_close(closed)
    }

    async fn begin(&self, product_id: ProductId, product_name: &str) -> SimulationTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let ticket = SimulationTicket {
            product_id,
            generation,
        };
        let previous = self.session.lock().await.replace(Session {
            ticket,
            state: SimulationState::Opening,
            simulation: AutoOrderSimulation::pending(product_id, product_name),
            last_message: None,
            last_error: None,
        });
        if let Some(previous) = previous {
            tracing::debug!(
                superseded = %previous.ticket.product_id,
                %product_id,
                "simulation superseded"
            );
        }
        ticket
    }

    async fn transition(&self, ticket: SimulationTicket, state: SimulationState) -> bool {
        let mut guard = self.session.lock().await;
        match guard.as_mut().filter(|s| s.ticket == ticket) {
            Some(session) => {
                session.state = state;
                true
            }
            None => false,
        }
    }

    async fn close_ticket(&self, ticket: SimulationTicket) {
        let closed = {
            let mut guard = self.session.lock().await;
            if guard.as_ref().is_some_and(|s| s.ticket == ticket) {
                let _ = self.generation.fetch_add(1, Ordering::SeqCst);
                guard.take()
            } else {
                None
            }
        };
        let _ = self.announce_close(closed);
    }

    fn announce_close(&self, closed: Option<Session>) -> bool {
        let Some(session) = closed else {
            return false;
        };
        let _ = self.event_bus.publish(DeskEvent::SimulationClosed {
            product_id: session.ticket.product_id,
            timestamp: Utc::now(),
        });
        tracing::debug!(product_id = %session.ticket.product_id, "simulation closed");
        true
    }
}

fn ready_session(
    guard: &mut Option<Session>,
    product_id: ProductId,
) -> Result<&mut Session, DeskError> {
    match guard.as_mut() {
        Some(session) if session.ticket.product_id == product_id => {
            if session.state == SimulationState::Ready {
                Ok(session)
            } else {
                Err(DeskError::InvalidState(format!(
                    "simulation for product {product_id} is {:?}",
                    session.state
                )))
            }
        }
        _ => Err(DeskError::InvalidState(format!(
            "no simulation open for product {product_id}"
        ))),
    }
}
