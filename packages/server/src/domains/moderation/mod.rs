//! Moderation domain - approval queues, suspicious partners and automation

pub mod actions;
pub mod automation;
pub mod data;
pub mod errors;
pub mod models;
pub mod store;
pub mod suspicious;
pub mod transitions;

// Re-export commonly used types
pub use automation::{AutomationController, AutomationPolicy};
pub use errors::{ModerationError, ModerationResult};
pub use models::{Actor, AutomationFlag, AutomationMode, Decision, Entity, EntityKind, EntityState};
pub use store::{EntityStore, FlagStore, MemoryStore, PostgresStore};
pub use suspicious::SuspiciousRegistry;
pub use transitions::TransitionEngine;
