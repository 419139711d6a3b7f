//! WebSocket layer: connection handling, command routing, topic
//! subscriptions.
//!
//! The endpoint at `/ws` streams [`crate::domain::DeskEvent`]s to clients
//! that subscribed to their topic, so that order and stock views can
//! refresh after an auto order is executed.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
