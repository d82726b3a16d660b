//! Moderation domain actions - business logic functions
//!
//! Actions are async functions called directly from the HTTP handlers.
//! They parse ids, call into the engine, and fold benign repeats into
//! `CommandOutcome::NoOp` so handlers only have to render.

mod mutations;
mod queries;

pub use mutations::*;
pub use queries::*;
