//! NAT chains and the rule argument lists natctl hands to iptables

use serde::Serialize;
use std::fmt;

/// Rule arguments for the POSTROUTING masquerade rule.
pub const MASQUERADE: [&str; 2] = ["-j", "MASQUERADE"];

/// nat table chains natctl manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
    Prerouting,
    Output,
    Postrouting,
}

impl Chain {
    /// Listing order.
    pub const ALL: [Chain; 3] = [Chain::Prerouting, Chain::Output, Chain::Postrouting];

    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Prerouting => "PREROUTING",
            Chain::Output => "OUTPUT",
            Chain::Postrouting => "POSTROUTING",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DNAT mapping: traffic for `address:port` over `protocol` goes to `destination`.
///
/// Values are passed to iptables verbatim and validated there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub protocol: String,
    pub address: String,
    pub port: String,
    /// `ip:port` the traffic is rewritten to
    pub destination: String,
}

impl Redirect {
    pub fn new(
        protocol: impl Into<String>,
        address: impl Into<String>,
        port: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            address: address.into(),
            port: port.into(),
            destination: destination.into(),
        }
    }

    /// Rule specification for `iptables -A/-D <chain> ...`
    pub fn rule_args(&self) -> Vec<&str> {
        vec![
            "-p",
            self.protocol.as_str(),
            "-d",
            self.address.as_str(),
            "--dport",
            self.port.as_str(),
            "-j",
            "DNAT",
            "--to-destination",
            self.destination.as_str(),
        ]
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} -> {}",
            self.protocol, self.address, self.port, self.destination
        )
    }
}
