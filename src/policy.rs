//! Operator authorization policy objects.

use crate::error::ProvisionError;
use crate::module::{
    ModuleError, ModuleService, PolicyHandle, PolicyRole, ResultCode, SecretMode, HASH_LEN,
};
use crate::secret::Secret;
use crate::session::Session;
use tracing::{debug, error};

/// Longest plain secret accepted for installation.
pub const MAX_PLAIN_SECRET_LEN: usize = 1024;

/// Operator-role policy object living inside a session.
///
/// The module releases the object when the session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorPolicy {
    handle: PolicyHandle,
    secret_installed: bool,
}

impl OperatorPolicy {
    pub fn create<M: ModuleService + ?Sized>(
        session: &mut Session<'_, M>,
    ) -> Result<Self, ProvisionError> {
        let context = session.context();
        let handle = session
            .service()
            .create_policy_object(context, PolicyRole::Operator)
            .map_err(|e| {
                error!("create_policy_object failed: {}", e);
                ProvisionError::ObjectCreation(e)
            })?;
        debug!(policy = handle.0, "operator policy created");

        Ok(Self {
            handle,
            secret_installed: false,
        })
    }

    /// Copy the secret into the module-side policy object.
    ///
    /// Lengths the module cannot accept are rejected before it is contacted.
    pub fn set_secret<M: ModuleService + ?Sized>(
        &mut self,
        session: &mut Session<'_, M>,
        secret: &Secret,
    ) -> Result<(), ProvisionError> {
        let bytes = secret.bytes();
        let mode = secret.mode();
        check_length(mode, bytes.len())?;

        session
            .service()
            .install_secret(self.handle, mode, bytes)
            .map_err(|e| {
                error!("install_secret failed: {}", e);
                ProvisionError::SecretInstall(e)
            })?;
        debug!(policy = self.handle.0, ?mode, "policy secret set");

        self.secret_installed = true;
        Ok(())
    }

    pub fn handle(&self) -> PolicyHandle {
        self.handle
    }

    pub fn has_secret(&self) -> bool {
        self.secret_installed
    }
}

fn check_length(mode: SecretMode, len: usize) -> Result<(), ProvisionError> {
    let acceptable = match mode {
        SecretMode::Plain => len <= MAX_PLAIN_SECRET_LEN,
        SecretMode::Digest => len == HASH_LEN,
    };
    if !acceptable {
        error!(len, ?mode, "secret length not accepted");
        return Err(ProvisionError::SecretInstall(ModuleError::Rejected(
            ResultCode::TSP_BAD_PARAMETER,
        )));
    }

    Ok(())
}
