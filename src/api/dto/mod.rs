//! Data Transfer Objects for REST request/response serialization.
//!
//! Ids travel as plain integers and template types as strings; domain
//! newtypes stay behind this boundary.

pub mod search_dto;
pub mod simulation_dto;
pub mod template_dto;

pub use search_dto::*;
pub use simulation_dto::*;
pub use template_dto::*;
