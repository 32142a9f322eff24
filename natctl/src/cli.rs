use clap::{Args, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;

use crate::rule::Redirect;

#[derive(Parser, Debug)]
#[command(
    name = "natctl",
    about = "Configure NAT redirects through iptables",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    pub output: OutputFormat,
}

/// Output format for listing and probe results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Table,
    /// JSON document
    Json,
}

/// Commands under `natctl iptables`
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum IptablesAction {
    /// List iptables rules
    List,
    /// Handle incoming traffic rules
    #[command(subcommand)]
    Incoming(IncomingAction),
    /// Handle redirect outgoing traffic rules
    #[command(subcommand)]
    Outgoing(OutgoingAction),
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum IncomingAction {
    /// Redirect incoming traffic
    Add(IncomingArgs),
    /// Remove incoming traffic redirects
    Remove(IncomingArgs),
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum OutgoingAction {
    /// Redirect outgoing traffic
    Add(OutgoingArgs),
    /// Remove rule redirecting outgoing traffic
    Remove(OutgoingArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct IncomingArgs {
    /// Protocol to match, e.g. tcp
    #[arg(value_name = "PROTOCOL")]
    pub protocol: String,
    /// Local address the traffic arrives on
    #[arg(value_name = "IP")]
    pub local_ip: String,
    /// Local port the traffic arrives on
    #[arg(value_name = "PORT")]
    pub local_port: String,
    /// Where to send it
    #[arg(value_name = "REDIRECTIP:PORT")]
    pub remote: String,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingArgs {
    /// Protocol to match, e.g. tcp
    #[arg(value_name = "PROTOCOL")]
    pub protocol: String,
    /// Remote address the traffic is headed to
    #[arg(value_name = "IP")]
    pub remote_ip: String,
    /// Remote port the traffic is headed to
    #[arg(value_name = "PORT")]
    pub remote_port: String,
    /// Where to send it instead
    #[arg(value_name = "REDIRECTIP:PORT")]
    pub redirect: String,
    /// Accepted and ignored
    #[arg(hide = true)]
    pub extra: Vec<String>,
}

impl From<&IncomingArgs> for Redirect {
    fn from(args: &IncomingArgs) -> Self {
        Redirect::new(&args.protocol, &args.local_ip, &args.local_port, &args.remote)
    }
}

impl From<&OutgoingArgs> for Redirect {
    fn from(args: &OutgoingArgs) -> Self {
        Redirect::new(&args.protocol, &args.remote_ip, &args.remote_port, &args.redirect)
    }
}

/// Parsed subcommand
#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    Probe,
    Iptables(IptablesAction),
}

/// Build the command tree. The `iptables` group only exists when the host supports it.
pub fn build_command(iptables_available: bool) -> clap::Command {
    let mut cmd = Cli::command()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            clap::Command::new("probe")
                .about("Report whether this host supports NAT redirects"),
        );

    if iptables_available {
        cmd = cmd.subcommand(
            IptablesAction::augment_subcommands(
                clap::Command::new("iptables")
                    .about("Interact with iptables")
                    .long_about("Interact with iptables for network rerouting"),
            )
            .subcommand_required(true)
            .arg_required_else_help(true),
        );
    }
    cmd
}

pub fn parse_from<I, T>(args: I, iptables_available: bool) -> Result<(Cli, Invocation), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut cmd = build_command(iptables_available);
    let matches = cmd.try_get_matches_from_mut(args)?;
    let cli = Cli::from_arg_matches(&matches)?;

    let invocation = match matches.subcommand() {
        Some(("probe", _)) => Invocation::Probe,
        Some(("iptables", sub)) => Invocation::Iptables(IptablesAction::from_arg_matches(sub)?),
        _ => {
            return Err(cmd.error(
                clap::error::ErrorKind::MissingSubcommand,
                "a subcommand is required",
            ))
        }
    };
    Ok((cli, invocation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_command_tree_is_valid() {
        build_command(true).debug_assert();
        build_command(false).debug_assert();
    }

    #[test]
    fn test_parse_list() {
        let (cli, inv) = parse_from(["natctl", "iptables", "list"], true).unwrap();
        assert_eq!(cli.output, OutputFormat::Table);
        assert_eq!(inv, Invocation::Iptables(IptablesAction::List));
    }

    #[test]
    fn test_parse_global_output_after_subcommand() {
        let (cli, _) = parse_from(["natctl", "iptables", "list", "-o", "json"], true).unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
    }

    #[test]
    fn test_parse_incoming_add() {
        let (_, inv) = parse_from(
            ["natctl", "iptables", "incoming", "add", "tcp", "10.0.0.1", "80", "10.0.0.2:8080"],
            true,
        )
        .unwrap();
        let Invocation::Iptables(IptablesAction::Incoming(IncomingAction::Add(args))) = inv else {
            panic!("unexpected invocation");
        };
        assert_eq!(
            Redirect::from(&args),
            Redirect::new("tcp", "10.0.0.1", "80", "10.0.0.2:8080")
        );
    }

    #[test]
    fn test_incoming_requires_four_args() {
        let err = parse_from(
            ["natctl", "iptables", "incoming", "remove", "tcp", "10.0.0.1", "80"],
            true,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_incoming_rejects_extra_args() {
        let err = parse_from(
            ["natctl", "iptables", "incoming", "add", "tcp", "10.0.0.1", "80", "10.0.0.2:80", "x"],
            true,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_outgoing_accepts_extra_args() {
        let (_, inv) = parse_from(
            [
                "natctl",
                "iptables",
                "outgoing",
                "remove",
                "udp",
                "8.8.8.8",
                "53",
                "127.0.0.1:5353",
                "ignored",
            ],
            true,
        )
        .unwrap();
        let Invocation::Iptables(IptablesAction::Outgoing(OutgoingAction::Remove(args))) = inv
        else {
            panic!("unexpected invocation");
        };
        assert_eq!(args.extra, ["ignored"]);
        assert_eq!(
            Redirect::from(&args),
            Redirect::new("udp", "8.8.8.8", "53", "127.0.0.1:5353")
        );
    }

    #[test]
    fn test_outgoing_requires_four_args() {
        let err = parse_from(["natctl", "iptables", "outgoing", "add", "tcp"], true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_iptables_unregistered_when_unavailable() {
        let err = parse_from(["natctl", "iptables", "list"], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_probe_always_available() {
        let (_, inv) = parse_from(["natctl", "probe"], false).unwrap();
        assert_eq!(inv, Invocation::Probe);
    }
}
