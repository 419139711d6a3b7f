//! Domain events reflecting template and simulation transitions.
//!
//! Transitions that other operator screens care about emit a [`DeskEvent`]
//! through the [`super::EventBus`]. Events are broadcast to WebSocket
//! subscribers filtered by [`EventTopic`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProductId, TemplateId, TemplateType};

/// Coarse subscription topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTopic {
    /// Template lifecycle and draft events.
    Templates,
    /// Auto-order simulation events.
    Simulation,
}

/// Domain event emitted after a state transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum DeskEvent {
    /// A template slot finished loading.
    TemplateLoaded {
        /// Template type of the slot.
        template_type: TemplateType,
        /// Whether a newer local draft replaced the server fields.
        draft_restored: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The autosave timer wrote the local draft.
    DraftAutosaved {
        /// Template type of the slot.
        template_type: TemplateType,
        /// Draft timestamp.
        saved_at: DateTime<Utc>,
    },

    /// The server accepted a save or a duplicate.
    TemplateSaved {
        /// Template type of the slot.
        template_type: TemplateType,
        /// Server-assigned row id.
        template_id: Option<TemplateId>,
        /// `true` when a new row was created from a copy.
        duplicated: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A template was soft-deleted.
    TemplateDeactivated {
        /// Template type of the slot.
        template_type: TemplateType,
        /// Deactivated row id.
        template_id: Option<TemplateId>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A simulation result was applied.
    SimulationReady {
        /// Simulated product.
        product_id: ProductId,
        /// Service-computed feasibility flag.
        can_execute: bool,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The simulation service accepted a test email.
    TestEmailSent {
        /// Simulated product.
        product_id: ProductId,
        /// Address the test was sent to.
        recipient: String,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A real purchase order was created. Views listing orders or stock
    /// should refresh.
    AutoOrderExecuted {
        /// Ordered product.
        product_id: ProductId,
        /// Order identifier returned by the service.
        order_number: Option<String>,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The simulation workflow was closed.
    SimulationClosed {
        /// Product that was open.
        product_id: ProductId,
        /// Event timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl DeskEvent {
    /// Returns the topic this event is published under.
    #[must_use]
    pub const fn topic(&self) -> EventTopic {
        match self {
            Self::TemplateLoaded { .. }
            | Self::DraftAutosaved { .. }
            | Self::TemplateSaved { .. }
            | Self::TemplateDeactivated { .. } => EventTopic::Templates,
            Self::SimulationReady { .. }
            | Self::TestEmailSent { .. }
            | Self::AutoOrderExecuted { .. }
            | Self::SimulationClosed { .. } => EventTopic::Simulation,
        }
    }

    /// Returns the event type as a static string (for logging).
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::TemplateLoaded { .. } => "template_loaded",
            Self::DraftAutosaved { .. } => "draft_autosaved",
            Self::TemplateSaved { .. } => "template_saved",
            Self::TemplateDeactivated { .. } => "template_deactivated",
            Self::SimulationReady { .. } => "simulation_ready",
            Self::TestEmailSent { .. } => "test_email_sent",
            Self::AutoOrderExecuted { .. } => "auto_order_executed",
            Self::SimulationClosed { .. } => "simulation_closed",
        }
    }
}
