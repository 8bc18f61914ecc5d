//! Domain layer - pure business logic with no I/O.

pub mod billing;
pub mod foundation;
pub mod membership;
