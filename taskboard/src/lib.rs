//! Kanban board core: a status-partitioned task store,
//! a REST gateway, optimistic moves and a pure filter engine.

pub mod board;
pub mod config;
pub mod gateway;
pub mod render;
pub mod tasks;
