//! Everything that happens to a resolved window within a tick: classification, policy
//! evaluation, enforcement and alerts.

pub mod categorizer;
pub mod enforcement;
pub mod notifications;
pub mod policy;
