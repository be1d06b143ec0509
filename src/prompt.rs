// TCM Set Operator Auth - Prompt Module
//
// Masked password entry and operator secret acquisition.

use crate::config::ProvisionConfig;
use crate::error::ProvisionError;
use crate::secret::{Secret, SecretBuffer};
use dialoguer::{theme::ColorfulTheme, Password};
use std::io::IsTerminal;
use tracing::{debug, error};
use zeroize::Zeroize;

/// Prompt shown when asking for the new operator secret.
pub const OPERATOR_PROMPT: &str = "Enter operator password";

/// Prompt shown when asking the operator to re-enter the secret.
pub const CONFIRM_PROMPT: &str = "Confirm password";

/// Terminal layer that solicits a masked secret from the operator.
pub trait SecretPrompt {
    /// Ask for a secret without echoing it.
    ///
    /// Returns `None` when no usable value was obtained: the operator
    /// aborted, the confirmation did not match, or the terminal failed.
    fn prompt_masked_secret(
        &mut self,
        prompt: &str,
        confirm: bool,
        unicode: bool,
    ) -> Option<SecretBuffer>;
}

/// [`SecretPrompt`] backed by the controlling terminal.
#[derive(Default)]
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, prompt: &str) -> Option<String> {
        match Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
        {
            Ok(text) => Some(text),
            Err(e) => {
                error!("Failed to read password: {}", e);
                None
            }
        }
    }
}

impl SecretPrompt for TerminalPrompt {
    fn prompt_masked_secret(
        &mut self,
        prompt: &str,
        confirm: bool,
        unicode: bool,
    ) -> Option<SecretBuffer> {
        if !std::io::stdin().is_terminal() || !std::io::stderr().is_terminal() {
            error!("No terminal available for password entry");
            return None;
        }

        let mut entered = self.read(prompt)?;

        if confirm {
            let Some(mut again) = self.read(CONFIRM_PROMPT) else {
                entered.zeroize();
                return None;
            };

            let matched = entered == again;
            again.zeroize();

            if !matched {
                entered.zeroize();
                eprintln!("Passwords didn't match");
                return None;
            }
        }

        if unicode {
            Some(SecretBuffer::from_unicode(entered))
        } else {
            Some(SecretBuffer::from_native(entered))
        }
    }
}

/// Obtain the operator secret for this run.
///
/// The well-known path never touches the prompt and cannot fail.
pub fn acquire_secret<P: SecretPrompt + ?Sized>(
    config: &ProvisionConfig,
    prompt: &mut P,
) -> Result<Secret, ProvisionError> {
    if config.well_known {
        debug!("using the well-known operator secret");
        return Ok(Secret::WellKnown);
    }

    let unicode = config.unicode_secret();
    debug!(unicode, "prompting for operator password");

    prompt
        .prompt_masked_secret(OPERATOR_PROMPT, true, unicode)
        .map(Secret::Interactive)
        .ok_or(ProvisionError::Acquisition)
}
