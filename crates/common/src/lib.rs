//! Shared types used across the saga engine and the membership services.

pub mod response;
pub mod types;

pub use response::{DataResponse, StatusCode};
pub use types::EntityId;
