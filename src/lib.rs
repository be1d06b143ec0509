//! TCM Set Operator Auth - operator authorization provisioning.
//!
//! This library sets the operator authorization secret of a trusted
//! cryptography module, making sure an operator-entered secret is shredded
//! as soon as the module has it.

pub mod config;
pub mod error;
pub mod module;
pub mod policy;
pub mod prompt;
pub mod provision;
pub mod secret;
pub mod session;
