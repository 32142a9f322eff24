//! Execution of parsed commands

use anyhow::{Context, Result};
use std::io::Write;
use tracing::warn;

use crate::cli::{IncomingAction, IptablesAction, OutgoingAction, OutputFormat};
use crate::client::RuleClient;
use crate::probe::{HostCapabilities, IpForwarding};
use crate::redirect::{render_table, RedirectManager};
use crate::rule::Redirect;

/// Run one `natctl iptables ...` action, writing any listing to `out`.
pub fn execute<C, W>(
    manager: &RedirectManager<'_, C>,
    action: &IptablesAction,
    format: OutputFormat,
    out: &mut W,
) -> Result<()>
where
    C: RuleClient + ?Sized,
    W: Write,
{
    match action {
        IptablesAction::List => {
            let listing = manager.list();
            match format {
                OutputFormat::Table => out.write_all(render_table(&listing).as_bytes())?,
                OutputFormat::Json => {
                    serde_json::to_writer_pretty(&mut *out, &listing)
                        .context("Failed to serialize rule listing")?;
                    writeln!(out)?;
                }
            }
            Ok(())
        }
        IptablesAction::Incoming(IncomingAction::Add(args)) => {
            manager.add_incoming(&Redirect::from(args))
        }
        IptablesAction::Incoming(IncomingAction::Remove(args)) => {
            manager.remove_incoming(&Redirect::from(args))
        }
        IptablesAction::Outgoing(OutgoingAction::Add(args)) => {
            warn_extra(&args.extra);
            manager.add_outgoing(&Redirect::from(args))
        }
        IptablesAction::Outgoing(OutgoingAction::Remove(args)) => {
            warn_extra(&args.extra);
            manager.remove_outgoing(&Redirect::from(args))
        }
    }
}

fn warn_extra(extra: &[String]) {
    if !extra.is_empty() {
        warn!("Ignoring extra arguments: {}", extra.join(" "));
    }
}

/// Print the host capability report
pub fn write_probe<W: Write>(
    caps: &HostCapabilities,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    if format == OutputFormat::Json {
        let report = ProbeReport {
            caps,
            available: caps.available(),
        };
        serde_json::to_writer_pretty(&mut *out, &report)
            .context("Failed to serialize probe report")?;
        writeln!(out)?;
        return Ok(());
    }

    let iptables = caps
        .iptables_path
        .as_ref()
        .map_or_else(|| "not found".to_string(), |p| p.display().to_string());
    let forwarding = match &caps.ip_forwarding {
        IpForwarding::Enabled => "enabled".to_string(),
        IpForwarding::Disabled(value) => format!("disabled ({value})"),
        IpForwarding::Unreadable(err) => format!("unreadable ({err})"),
    };

    writeln!(out, "iptables:          {iptables}")?;
    writeln!(out, "ip forwarding:     {forwarding}")?;
    writeln!(out, "running as root:   {}", if caps.is_root { "yes" } else { "no" })?;
    writeln!(
        out,
        "iptables commands: {}",
        if caps.available() { "available" } else { "disabled" }
    )?;
    Ok(())
}

#[derive(serde::Serialize)]
struct ProbeReport<'a> {
    #[serde(flatten)]
    caps: &'a HostCapabilities,
    available: bool,
}
