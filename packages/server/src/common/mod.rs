// Common types shared across the kernel, domain and server layers

pub mod ids;

pub use ids::{AdminId, EntityId, IdError, ModeChangeToken, SYSTEM_ACTOR};
