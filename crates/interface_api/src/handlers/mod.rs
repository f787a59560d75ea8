//! Request handlers

pub mod health;
pub mod sampling;
pub mod tasks;
