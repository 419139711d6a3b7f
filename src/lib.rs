//! # auto-order-desk
//!
//! Operator backend for supplier auto-order emails.
//!
//! Operators edit the email template a supplier receives when stock of a
//! product runs low, preview it with sample data, send tests, and dry-run
//! the purchase order for a product before executing it for real. Template
//! storage, simulation and product/seller lookups live in remote services;
//! this crate coordinates the editing sessions around them.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── TemplateLifecycle + DraftReconciler (service/)
//!     ├── SimulationController (service/)
//!     ├── DebouncedSearch (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Variable substitution + validation (domain/)
//!     ├── Remote services over HTTP (remote/)
//!     │
//!     └── Draft store: memory or PostgreSQL (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod remote;
pub mod service;
pub mod ws;
