//! File-backed software module.
//!
//! The simulated module keeps its persistent state (presence, enablement and
//! the committed operator authorization digest) in a JSON file, the way a
//! software TPM keeps its NV state on disk. Contexts and policy objects live
//! in memory only and disappear with the process.

use super::{
    ContextHandle, ModuleError, ModuleHandle, ModuleService, PolicyHandle, PolicyRole, ResultCode,
    SecretMode, HASH_LEN,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sm3::{Digest, Sm3};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use zeroize::Zeroizing;

/// Handle of the one module every connected context resolves to.
pub const MODULE_HANDLE: ModuleHandle = ModuleHandle(0x4000_0001);

/// Maximum number of policy objects a single context may hold.
pub const MAX_OBJECTS_PER_CONTEXT: usize = 16;

fn default_true() -> bool {
    true
}

/// Persistent state of the simulated module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleState {
    /// Whether a module answers on the transport at all
    #[serde(default = "default_true")]
    pub present: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub activated: bool,

    /// Whether physical presence is currently asserted
    #[serde(default = "default_true")]
    pub physical_presence: bool,

    /// Hex digest of the committed operator authorization
    #[serde(default)]
    pub operator_auth: Option<String>,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            present: true,
            enabled: true,
            activated: true,
            physical_presence: true,
            operator_auth: None,
        }
    }
}

impl ModuleState {
    /// Load module state from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read module state: {:?}", path.as_ref()))?;

        let state: ModuleState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse module state: {:?}", path.as_ref()))?;

        Ok(state)
    }

    /// Write module state through a temporary file and rename it into place.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize module state")?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write module state: {:?}", tmp_path))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("Failed to replace module state: {:?}", path))?;

        Ok(())
    }
}

#[derive(Debug)]
struct ContextEntry {
    connected: bool,
}

struct PolicyObject {
    context: ContextHandle,
    role: PolicyRole,
    auth: Option<Zeroizing<[u8; HASH_LEN]>>,
}

/// Software implementation of [`ModuleService`].
pub struct SimulatedModule {
    state: ModuleState,
    state_path: Option<PathBuf>,
    contexts: HashMap<ContextHandle, ContextEntry>,
    policies: HashMap<PolicyHandle, PolicyObject>,
    next_handle: u32,
}

impl SimulatedModule {
    /// Simulated module persisted at `state_path`.
    ///
    /// The file is read when a context is opened, so a missing or corrupt
    /// state file surfaces as an unreachable service.
    pub fn open<P: Into<PathBuf>>(state_path: P) -> Self {
        Self {
            state: ModuleState::default(),
            state_path: Some(state_path.into()),
            contexts: HashMap::new(),
            policies: HashMap::new(),
            next_handle: 0x100,
        }
    }

    /// Simulated module that never touches the filesystem.
    pub fn in_memory(state: ModuleState) -> Self {
        Self {
            state,
            state_path: None,
            contexts: HashMap::new(),
            policies: HashMap::new(),
            next_handle: 0x100,
        }
    }

    pub fn state(&self) -> &ModuleState {
        &self.state
    }

    /// Number of contexts opened and not yet closed.
    pub fn open_contexts(&self) -> usize {
        self.contexts.len()
    }

    fn mint_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn connected_context(&self, context: ContextHandle) -> Result<&ContextEntry, ResultCode> {
        match self.contexts.get(&context) {
            Some(entry) if entry.connected => Ok(entry),
            Some(_) => Err(ResultCode::TSP_NO_CONNECTION),
            None => Err(ResultCode::TSP_INVALID_HANDLE),
        }
    }

    fn check_commit(
        &self,
        module: ModuleHandle,
        policy: PolicyHandle,
    ) -> Result<[u8; HASH_LEN], ResultCode> {
        if module != MODULE_HANDLE {
            return Err(ResultCode::TSP_INVALID_HANDLE);
        }

        let object = self.policies.get(&policy).ok_or(ResultCode::TSP_INVALID_HANDLE)?;
        self.connected_context(object.context)?;

        if object.role != PolicyRole::Operator {
            return Err(ResultCode::TSP_BAD_PARAMETER);
        }

        let auth = object.auth.as_ref().ok_or(ResultCode::AUTH_FAIL)?;

        if !self.state.enabled {
            return Err(ResultCode::DISABLED);
        }
        if !self.state.activated {
            return Err(ResultCode::DEACTIVATED);
        }
        if !self.state.physical_presence {
            return Err(ResultCode::BAD_PRESENCE);
        }

        Ok(**auth)
    }
}

impl ModuleService for SimulatedModule {
    fn open_context(&mut self) -> Result<ContextHandle, ModuleError> {
        if let Some(path) = &self.state_path {
            self.state = ModuleState::from_file(path)
                .map_err(|e| ModuleError::Unavailable(format!("{:#}", e)))?;
        }

        let context = ContextHandle(self.mint_handle());
        self.contexts.insert(context, ContextEntry { connected: false });
        debug!(context = context.0, "simulated context created");

        Ok(context)
    }

    fn connect(&mut self, context: ContextHandle) -> Result<(), ModuleError> {
        let present = self.state.present;
        let entry = self
            .contexts
            .get_mut(&context)
            .ok_or(ResultCode::TSP_INVALID_HANDLE)?;

        if !present {
            return Err(ResultCode::TSP_NO_CONNECTION.into());
        }

        entry.connected = true;
        Ok(())
    }

    fn get_module(&mut self, context: ContextHandle) -> Result<ModuleHandle, ModuleError> {
        self.connected_context(context)?;
        Ok(MODULE_HANDLE)
    }

    fn create_policy_object(
        &mut self,
        context: ContextHandle,
        role: PolicyRole,
    ) -> Result<PolicyHandle, ModuleError> {
        self.connected_context(context)?;

        if role != PolicyRole::Operator {
            return Err(ResultCode::TSP_BAD_PARAMETER.into());
        }

        let held = self
            .policies
            .values()
            .filter(|object| object.context == context)
            .count();
        if held >= MAX_OBJECTS_PER_CONTEXT {
            return Err(ResultCode::TSP_OUT_OF_MEMORY.into());
        }

        let policy = PolicyHandle(self.mint_handle());
        self.policies.insert(
            policy,
            PolicyObject {
                context,
                role,
                auth: None,
            },
        );

        Ok(policy)
    }

    fn install_secret(
        &mut self,
        policy: PolicyHandle,
        mode: SecretMode,
        secret: &[u8],
    ) -> Result<(), ModuleError> {
        let object = self
            .policies
            .get_mut(&policy)
            .ok_or(ResultCode::TSP_INVALID_HANDLE)?;

        let mut auth = Zeroizing::new([0u8; HASH_LEN]);
        match mode {
            SecretMode::Plain => {
                auth.copy_from_slice(&Sm3::digest(secret));
            }
            SecretMode::Digest => {
                if secret.len() != HASH_LEN {
                    return Err(ResultCode::TSP_BAD_PARAMETER.into());
                }
                auth.copy_from_slice(secret);
            }
        }

        object.auth = Some(auth);
        Ok(())
    }

    fn commit_operator_auth(&mut self, module: ModuleHandle, policy: PolicyHandle) -> ResultCode {
        let auth = match self.check_commit(module, policy) {
            Ok(auth) => Zeroizing::new(auth),
            Err(code) => return code,
        };

        let mut next = self.state.clone();
        next.operator_auth = Some(hex::encode(*auth));

        if let Some(path) = &self.state_path {
            if let Err(e) = next.save(path) {
                error!("failed to persist operator authorization: {:#}", e);
                return ResultCode::FAIL;
            }
        }

        self.state = next;
        ResultCode::SUCCESS
    }

    fn close(&mut self, context: ContextHandle) {
        self.policies.retain(|_, object| object.context != context);
        self.contexts.remove(&context);
        debug!(context = context.0, "simulated context closed");
    }
}
