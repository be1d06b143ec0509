//! Common testing utilities for TCM Set Operator Auth integration tests.

use std::fs;
use std::path::PathBuf;
use tcm_setoperatorauth::module::simulator::ModuleState;
use tcm_setoperatorauth::module::{
    ContextHandle, ModuleError, ModuleHandle, ModuleService, PolicyHandle, PolicyRole, ResultCode,
    SecretMode,
};
use tcm_setoperatorauth::prompt::SecretPrompt;
use tcm_setoperatorauth::secret::SecretBuffer;
use tempfile::TempDir;

/// One call made against [`RecordingModule`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Call {
    OpenContext,
    Connect,
    GetModule,
    CreatePolicyObject(PolicyRole),
    InstallSecret(SecretMode, Vec<u8>),
    CommitOperatorAuth,
    Close,
}

/// Module service fake that records every call and fails on request.
#[allow(dead_code)]
pub struct RecordingModule {
    pub calls: Vec<Call>,
    pub fail_open: bool,
    pub fail_connect: bool,
    pub fail_resolve: bool,
    pub fail_create: bool,
    pub fail_install: bool,
    pub commit_result: ResultCode,
}

impl Default for RecordingModule {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            fail_open: false,
            fail_connect: false,
            fail_resolve: false,
            fail_create: false,
            fail_install: false,
            commit_result: ResultCode::SUCCESS,
        }
    }
}

#[allow(dead_code)]
impl RecordingModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn closes(&self) -> usize {
        self.count(&Call::Close)
    }

    pub fn created_policy(&self) -> bool {
        self.calls
            .iter()
            .any(|c| matches!(c, Call::CreatePolicyObject(_)))
    }

    pub fn installed(&self) -> Option<&[u8]> {
        self.calls.iter().find_map(|c| match c {
            Call::InstallSecret(_, bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    pub fn committed(&self) -> bool {
        self.count(&Call::CommitOperatorAuth) > 0
    }
}

impl ModuleService for RecordingModule {
    fn open_context(&mut self) -> Result<ContextHandle, ModuleError> {
        self.calls.push(Call::OpenContext);
        if self.fail_open {
            return Err(ModuleError::Unavailable("service not running".to_string()));
        }
        Ok(ContextHandle(1))
    }

    fn connect(&mut self, _context: ContextHandle) -> Result<(), ModuleError> {
        self.calls.push(Call::Connect);
        if self.fail_connect {
            return Err(ResultCode::TSP_NO_CONNECTION.into());
        }
        Ok(())
    }

    fn get_module(&mut self, _context: ContextHandle) -> Result<ModuleHandle, ModuleError> {
        self.calls.push(Call::GetModule);
        if self.fail_resolve {
            return Err(ResultCode::TSP_INVALID_HANDLE.into());
        }
        Ok(ModuleHandle(2))
    }

    fn create_policy_object(
        &mut self,
        _context: ContextHandle,
        role: PolicyRole,
    ) -> Result<PolicyHandle, ModuleError> {
        self.calls.push(Call::CreatePolicyObject(role));
        if self.fail_create {
            return Err(ResultCode::TSP_OUT_OF_MEMORY.into());
        }
        Ok(PolicyHandle(3))
    }

    fn install_secret(
        &mut self,
        _policy: PolicyHandle,
        mode: SecretMode,
        secret: &[u8],
    ) -> Result<(), ModuleError> {
        self.calls.push(Call::InstallSecret(mode, secret.to_vec()));
        if self.fail_install {
            return Err(ResultCode::TSP_BAD_PARAMETER.into());
        }
        Ok(())
    }

    fn commit_operator_auth(&mut self, _module: ModuleHandle, _policy: PolicyHandle) -> ResultCode {
        self.calls.push(Call::CommitOperatorAuth);
        self.commit_result
    }

    fn close(&mut self, _context: ContextHandle) {
        self.calls.push(Call::Close);
    }
}

/// Terminal fake returning a fixed answer.
#[allow(dead_code)]
pub struct ScriptedPrompt {
    answer: Option<String>,
    /// (prompt, confirm, unicode) of every request
    pub requests: Vec<(String, bool, bool)>,
}

#[allow(dead_code)]
impl ScriptedPrompt {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            requests: Vec::new(),
        }
    }

    pub fn aborting() -> Self {
        Self {
            answer: None,
            requests: Vec::new(),
        }
    }
}

impl SecretPrompt for ScriptedPrompt {
    fn prompt_masked_secret(
        &mut self,
        prompt: &str,
        confirm: bool,
        unicode: bool,
    ) -> Option<SecretBuffer> {
        self.requests.push((prompt.to_string(), confirm, unicode));

        let text = self.answer.clone()?;
        if unicode {
            Some(SecretBuffer::from_unicode(text))
        } else {
            Some(SecretBuffer::from_native(text))
        }
    }
}

/// Test context holding a config file and a simulated module state file.
#[allow(dead_code)]
pub struct TestContext {
    /// Path to temporary directory
    pub temp_path: PathBuf,
    /// The temporary directory (kept to prevent early deletion)
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestContext {
    /// Create a new test context with a temporary directory.
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let temp_path = temp_dir.path().to_path_buf();

        Ok(Self {
            temp_path,
            _temp_dir: temp_dir,
        })
    }

    /// Write a module state file and a config pointing at it.
    pub fn with_module(state: &ModuleState) -> anyhow::Result<Self> {
        let ctx = Self::new()?;
        state.save(ctx.state_path())?;

        let config = format!(
            "module:\n  backend: simulator\n  state: {:?}\n",
            ctx.state_path().display().to_string()
        );
        fs::write(ctx.config_path(), config)?;

        Ok(ctx)
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_path.join("tcm-module.yaml")
    }

    pub fn state_path(&self) -> PathBuf {
        self.temp_path.join("module.json")
    }

    /// Read back the simulated module state.
    pub fn module_state(&self) -> anyhow::Result<ModuleState> {
        ModuleState::from_file(self.state_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_prompt_unicode() {
        let mut prompt = ScriptedPrompt::answering("a");
        let buffer = prompt.prompt_masked_secret("p", true, true).unwrap();

        assert_eq!(buffer.expose(), &[b'a', 0, 0, 0]);
        assert_eq!(prompt.requests, vec![("p".to_string(), true, true)]);
    }

    #[test]
    fn test_context_writes_module_files() {
        let ctx = TestContext::with_module(&ModuleState::default()).unwrap();

        assert!(ctx.config_path().exists());
        assert_eq!(ctx.module_state().unwrap(), ModuleState::default());
    }
}
