// TCM Set Operator Auth - set the operator authorization of a trusted
// cryptography module
//
// This is the main entry point for the application.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tcm_setoperatorauth::config::{Backend, Config, ProvisionConfig};
use tcm_setoperatorauth::module::simulator::SimulatedModule;
use tcm_setoperatorauth::module::ModuleService;
use tcm_setoperatorauth::prompt::TerminalPrompt;
use tcm_setoperatorauth::provision::Provisioner;
use tracing::Level;

/// Logging verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    None,
    Error,
    Info,
    Debug,
}

/// Set the operator authorization secret of the trusted cryptography module
#[derive(Parser, Debug)]
#[command(name = "tcm_setoperatorauth")]
#[command(version)]
#[command(about = "Set the operator authorization secret of the trusted cryptography module", long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Use the well-known secret as the operator's default secret
    #[arg(short = 'z', long = "well-known")]
    well_known: bool,

    /// Use TSM UNICODE encoding for the operator password to comply with applications using TSM popup boxes
    #[arg(short = 'p', long = "op_password_unicode")]
    op_password_unicode: bool,

    /// Use TSM UNICODE encoding for passwords to comply with applications using TSM popup boxes
    #[arg(short = 'u', long)]
    unicode: bool,

    /// Set the logging level
    #[arg(short = 'l', long = "log", value_enum, default_value_t = LogLevel::Error)]
    log: LogLevel,

    /// Path to the module service configuration file
    #[arg(short, long, default_value = "tcm-module.yaml")]
    config: String,

    /// Print version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    fn provision_config(&self) -> ProvisionConfig {
        ProvisionConfig {
            well_known: self.well_known,
            op_password_unicode: self.op_password_unicode,
            use_unicode: self.unicode,
        }
    }
}

fn init_logging(level: LogLevel) {
    let max_level = match level {
        LogLevel::None => return,
        LogLevel::Error => Level::ERROR,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_backend(config: &Config) -> Result<Box<dyn ModuleService>> {
    match config.module.backend {
        Backend::Simulator => {
            let state_path = config.state_path()?;
            tracing::debug!("using simulated module at {:?}", state_path);
            Ok(Box::new(SimulatedModule::open(state_path)))
        }
    }
}

fn run_set_operator_auth(cli: &Cli) -> Result<()> {
    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load config from: {}", cli.config))?;

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;

    let mut module = open_backend(&config)?;
    let mut prompt = TerminalPrompt::new();
    let provision = cli.provision_config();

    Provisioner::new(&provision, module.as_mut(), &mut prompt).run()?;

    println!("✓ Operator authorization set");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log);

    if let Err(e) = run_set_operator_auth(&cli) {
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_flags_map_to_config() {
        let cli = Cli::try_parse_from(["tcm_setoperatorauth", "-p", "-u"]).unwrap();
        let config = cli.provision_config();

        assert!(config.op_password_unicode);
        assert!(config.use_unicode);
        assert!(!config.well_known);
    }

    #[test]
    fn test_flags_are_independent() {
        let cli = Cli::try_parse_from(["tcm_setoperatorauth", "-u"]).unwrap();
        assert_eq!(
            cli.provision_config(),
            ProvisionConfig {
                use_unicode: true,
                ..ProvisionConfig::default()
            }
        );

        let cli = Cli::try_parse_from([
            "tcm_setoperatorauth",
            "--well-known",
            "--op_password_unicode",
        ])
        .unwrap();
        assert_eq!(
            cli.provision_config(),
            ProvisionConfig {
                well_known: true,
                op_password_unicode: true,
                use_unicode: false,
            }
        );
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tcm_setoperatorauth"]).unwrap();

        assert_eq!(cli.provision_config(), ProvisionConfig::default());
        assert_eq!(cli.log, LogLevel::Error);
        assert_eq!(cli.config, "tcm-module.yaml");
    }
}
