//! natctl — configure NAT redirection rules on the host
//!
//! Startup order:
//! - load /etc/natctl/config.toml (or `$NATCTL_CONFIG`)
//! - initialise logging
//! - probe the host for iptables and IP forwarding
//! - parse the command line, registering `iptables` only if the probe passed

use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{debug, error};

use natctl::cli::{self, Invocation};
use natctl::client::IptablesCommand;
use natctl::commands;
use natctl::config::{self, NatctlConfig};
use natctl::logging;
use natctl::probe;
use natctl::redirect::RedirectManager;

fn main() -> ExitCode {
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("natctl: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.logging.level, config.logging.format) {
        eprintln!("natctl: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &NatctlConfig) -> Result<()> {
    match &config.source {
        Some(path) => debug!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    let caps = probe::detect(config);
    let (cli, invocation) = match cli::parse_from(std::env::args_os(), caps.available()) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match invocation {
        Invocation::Probe => commands::write_probe(&caps, cli.output, &mut out),
        Invocation::Iptables(action) => {
            let client =
                IptablesCommand::connect(&config.iptables).context("Issue using iptables")?;
            let manager = RedirectManager::new(&client, &config.iptables.table);
            commands::execute(&manager, &action, cli.output, &mut out)
        }
    }
}
