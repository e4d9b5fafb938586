//! Provenance operations
//!
//! [`RightsEngine`] is the entry point for registering copyrights, deriving
//! rights and signing transfers. Each committed transfer is returned as a
//! [`RightsAssignment`] that can be verified against the previous holder's
//! public key.

mod assignment;
mod engine;

pub use assignment::{RightsAssignment, ASSIGNMENT_RESERVED_KEYS, ASSIGNMENT_TYPE};
pub use engine::RightsEngine;
