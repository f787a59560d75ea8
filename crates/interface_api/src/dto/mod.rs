//! Request and response bodies

pub mod sampling;
