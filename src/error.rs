//! Provisioning error taxonomy.
//!
//! Every variant is terminal for the run. Nothing is retried; the operator
//! fixes the underlying condition and invokes the tool again.

use crate::module::{ModuleError, ResultCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Failed to create module context: {0}")]
    Context(ModuleError),

    #[error("Failed to connect to the module service: {0}")]
    Connect(ModuleError),

    #[error("Failed to resolve the trust module: {0}")]
    Resolve(ModuleError),

    #[error("Failed to get operator password")]
    Acquisition,

    #[error("Failed to create operator policy: {0}")]
    ObjectCreation(ModuleError),

    #[error("Failed to set operator policy secret: {0}")]
    SecretInstall(ModuleError),

    #[error("Failed to set operator authorization: {0}")]
    Commit(ResultCode),
}

impl ProvisionError {
    /// Result code reported by the module, when the failure carries one.
    pub fn result_code(&self) -> Option<ResultCode> {
        match self {
            ProvisionError::Context(e)
            | ProvisionError::Connect(e)
            | ProvisionError::Resolve(e)
            | ProvisionError::ObjectCreation(e)
            | ProvisionError::SecretInstall(e) => match e {
                ModuleError::Rejected(code) => Some(*code),
                ModuleError::Unavailable(_) => None,
            },
            ProvisionError::Commit(code) => Some(*code),
            ProvisionError::Acquisition => None,
        }
    }
}
