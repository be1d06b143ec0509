//! Operator authorization provisioning pipeline.
//!
//! One run walks a fixed sequence of stages:
//!
//! ```text
//! Start → SessionOpen → SessionConnected → ModuleResolved → SecretAcquired
//!       → PolicyCreated → SecretInstalled → SecretShredded → Committed
//!       → Closed(Success)
//! ```
//!
//! Any failure jumps straight to `Closed(Failure)`. The session is opened
//! before the secret is acquired, so a failed prompt still has a context to
//! close; the [`Session`] guard takes care of that on every path.
//!
//! # Example
//!
//! ```no_run
//! use tcm_setoperatorauth::config::ProvisionConfig;
//! use tcm_setoperatorauth::module::simulator::SimulatedModule;
//! use tcm_setoperatorauth::prompt::TerminalPrompt;
//! use tcm_setoperatorauth::provision::Provisioner;
//!
//! # fn main() -> Result<(), tcm_setoperatorauth::error::ProvisionError> {
//! let config = ProvisionConfig { well_known: true, ..ProvisionConfig::default() };
//! let mut module = SimulatedModule::open("module.json");
//! let mut prompt = TerminalPrompt::new();
//!
//! Provisioner::new(&config, &mut module, &mut prompt).run()?;
//! # Ok(())
//! # }
//! ```

use crate::config::ProvisionConfig;
use crate::error::ProvisionError;
use crate::module::{ModuleHandle, ModuleService, ResultCode};
use crate::policy::OperatorPolicy;
use crate::prompt::{acquire_secret, SecretPrompt};
use crate::secret::Secret;
use crate::session::Session;
use tracing::{debug, error, info};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Pipeline stage reached during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    SessionOpen,
    SessionConnected,
    ModuleResolved,
    SecretAcquired,
    PolicyCreated,
    SecretInstalled,
    SecretShredded,
    Committed,
    Closed(Outcome),
}

/// Drives one provisioning run and records the stages it passes through.
pub struct Provisioner<'a, M: ModuleService + ?Sized, P: SecretPrompt + ?Sized> {
    config: &'a ProvisionConfig,
    module: &'a mut M,
    prompt: &'a mut P,
    stages: Vec<Stage>,
}

impl<'a, M: ModuleService + ?Sized, P: SecretPrompt + ?Sized> Provisioner<'a, M, P> {
    pub fn new(config: &'a ProvisionConfig, module: &'a mut M, prompt: &'a mut P) -> Self {
        Self {
            config,
            module,
            prompt,
            stages: vec![Stage::Start],
        }
    }

    /// Run the pipeline. The session is closed by the time this returns.
    pub fn run(&mut self) -> Result<(), ProvisionError> {
        let result = drive(
            self.config,
            &mut *self.module,
            &mut *self.prompt,
            &mut self.stages,
        );

        match &result {
            Ok(()) => {
                self.stages.push(Stage::Closed(Outcome::Success));
                info!("operator authorization set");
            }
            Err(e) => {
                self.stages.push(Stage::Closed(Outcome::Failure));
                error!("provisioning aborted: {}", e);
            }
        }

        result
    }

    /// Stages reached so far, in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }
}

fn drive<M: ModuleService + ?Sized, P: SecretPrompt + ?Sized>(
    config: &ProvisionConfig,
    module: &mut M,
    prompt: &mut P,
    stages: &mut Vec<Stage>,
) -> Result<(), ProvisionError> {
    let mut session = Session::open(module)?;
    stages.push(Stage::SessionOpen);

    session.connect()?;
    stages.push(Stage::SessionConnected);

    let module_handle = session.resolve_module()?;
    stages.push(Stage::ModuleResolved);

    let mut secret = acquire_secret(config, prompt)?;
    stages.push(Stage::SecretAcquired);

    let mut policy = OperatorPolicy::create(&mut session)?;
    stages.push(Stage::PolicyCreated);

    install_and_shred(&mut session, &mut policy, &mut secret)?;
    stages.push(Stage::SecretInstalled);
    if secret.is_shredded() {
        stages.push(Stage::SecretShredded);
    }

    commit(&mut session, module_handle, &policy)?;
    stages.push(Stage::Committed);

    Ok(())
}

/// Install the secret into the policy, then shred it.
///
/// On failure the secret is left to its drop path, which zeroes it as well.
pub fn install_and_shred<M: ModuleService + ?Sized>(
    session: &mut Session<'_, M>,
    policy: &mut OperatorPolicy,
    secret: &mut Secret,
) -> Result<(), ProvisionError> {
    policy.set_secret(session, secret)?;

    secret.shred();
    if !secret.is_well_known() {
        debug!("operator secret shredded");
    }

    Ok(())
}

/// Bind the policy's secret as the module's operator authorization.
///
/// A policy without an installed secret never reaches the module.
pub fn commit<M: ModuleService + ?Sized>(
    session: &mut Session<'_, M>,
    module: ModuleHandle,
    policy: &OperatorPolicy,
) -> Result<(), ProvisionError> {
    if !policy.has_secret() {
        error!("refusing to commit a policy without a secret");
        return Err(ProvisionError::Commit(ResultCode::AUTH_FAIL));
    }

    let code = session
        .service()
        .commit_operator_auth(module, policy.handle());

    if code.is_success() {
        info!("set_operator_auth success");
        Ok(())
    } else {
        error!("set_operator_auth failed: {}", code);
        Err(ProvisionError::Commit(code))
    }
}
