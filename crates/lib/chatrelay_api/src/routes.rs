//! Route paths.

pub const ROOT: &str = "/";
pub const HEALTH: &str = "/health";
pub const HEALTH_READY: &str = "/health/ready";
pub const API_MESSAGES: &str = "/api/messages";
