// Moderation Workflow Engine - API Core
//
// Approval queues for bookings, listings, leads and partners, a suspicious
// partner registry, and a global auto/manual switch that lets policy resolve
// new submissions without an admin.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
