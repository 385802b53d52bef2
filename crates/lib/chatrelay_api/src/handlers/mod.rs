//! Request handlers.

pub mod messages;
pub mod service;
