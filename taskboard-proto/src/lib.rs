//! Wire and domain types for the taskboard REST API.

pub mod codec;
pub mod task;
pub mod wire;
