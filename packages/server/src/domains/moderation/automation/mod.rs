pub mod controller;
pub mod policy;

pub use controller::{
    AutomationController, ModeChangeOutcome, ModeChangeRequest, DEFAULT_REQUEST_TTL_SECS,
};
pub use policy::{AutomationPolicy, HoldReason, PolicyOutcome, PolicyRule};
