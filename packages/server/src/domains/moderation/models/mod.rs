pub mod automation_flag;
pub mod entity;

pub use automation_flag::{AutomationFlag, AutomationMode};
pub use entity::{Actor, Decision, Entity, EntityKind, EntityState};
