//! Module service interface.
//!
//! Everything the provisioning pipeline needs from the transport and the
//! module authorization API goes through [`ModuleService`]. Handles are
//! opaque values minted by the service; the pipeline never interprets them.
//!
//! # Backends
//!
//! - [`simulator::SimulatedModule`]: file-backed software module

pub mod result;
pub mod simulator;

pub use result::{Layer, ResultCode};

use thiserror::Error;

/// Digest length used by the module for authorization values (SM3-256).
pub const HASH_LEN: usize = 32;

/// Connection context handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub u32);

/// Handle of the trust module object reachable through a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(pub u32);

/// Handle of a policy object created inside a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PolicyHandle(pub u32);

/// Role a policy object authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRole {
    Usage,
    Migration,
    Operator,
}

/// How the module interprets the bytes handed to `install_secret`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMode {
    /// Raw secret; the module hashes it into an authorization value.
    Plain,
    /// Already a digest of exactly [`HASH_LEN`] bytes.
    Digest,
}

/// Failure reported by a module service call.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// The module or its service stack rejected the call.
    #[error("{0}")]
    Rejected(ResultCode),

    /// The service could not be reached at all.
    #[error("module service unavailable: {0}")]
    Unavailable(String),
}

impl From<ResultCode> for ModuleError {
    fn from(code: ResultCode) -> Self {
        ModuleError::Rejected(code)
    }
}

/// Transport and authorization API of a trust module service.
///
/// `close` is infallible and must be called exactly once for every context
/// returned by `open_context`; [`crate::session::Session`] guarantees that.
pub trait ModuleService {
    fn open_context(&mut self) -> Result<ContextHandle, ModuleError>;

    fn connect(&mut self, context: ContextHandle) -> Result<(), ModuleError>;

    fn get_module(&mut self, context: ContextHandle) -> Result<ModuleHandle, ModuleError>;

    fn create_policy_object(
        &mut self,
        context: ContextHandle,
        role: PolicyRole,
    ) -> Result<PolicyHandle, ModuleError>;

    fn install_secret(
        &mut self,
        policy: PolicyHandle,
        mode: SecretMode,
        secret: &[u8],
    ) -> Result<(), ModuleError>;

    fn commit_operator_auth(&mut self, module: ModuleHandle, policy: PolicyHandle) -> ResultCode;

    fn close(&mut self, context: ContextHandle);
}
