//! Host capability detection
//!
//! Runs once at startup: the `iptables` command group is only registered when
//! the control program is on PATH and the kernel forwards IPv4 packets.

use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::NatctlConfig;

/// Control program the `iptables` crate invokes
pub const IPTABLES_BINARY: &str = "iptables";

/// State of the kernel IP forwarding flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum IpForwarding {
    Enabled,
    /// Flag readable but not "1"; carries the value found
    Disabled(String),
    /// Flag could not be read; carries the I/O error
    Unreadable(String),
}

/// Result of probing the host
#[derive(Debug, Clone, Serialize)]
pub struct HostCapabilities {
    pub iptables_path: Option<PathBuf>,
    pub ip_forwarding: IpForwarding,
    pub is_root: bool,
}

impl HostCapabilities {
    /// Whether the iptables command group should be registered
    pub fn available(&self) -> bool {
        self.iptables_path.is_some() && self.ip_forwarding == IpForwarding::Enabled
    }
}

/// Probe the host and log why functionality is disabled, if it is.
pub fn detect(config: &NatctlConfig) -> HostCapabilities {
    let path_var = std::env::var_os("PATH").unwrap_or_default();
    detect_in(config, &path_var)
}

/// `detect` against an explicit PATH-style list
pub fn detect_in(config: &NatctlConfig, path_var: &OsStr) -> HostCapabilities {
    let iptables_path = find_in_path(IPTABLES_BINARY, path_var);
    let ip_forwarding = read_ip_forwarding(&config.host.ip_forward_path);
    let is_root = nix::unistd::Uid::effective().is_root();

    let caps = HostCapabilities {
        iptables_path,
        ip_forwarding,
        is_root,
    };

    let flag_path = config.host.ip_forward_path.display();
    match (&caps.iptables_path, &caps.ip_forwarding) {
        (None, _) => {
            warn!("{IPTABLES_BINARY} not found in path, so modules disabled");
        }
        (Some(_), IpForwarding::Enabled) => {}
        (Some(_), IpForwarding::Disabled(value)) => {
            warn!("Ip forwarding not enabled ({flag_path} = {value:?})");
            warn!("Enable ip forwarding: sysctl -w net.ipv4.ip_forward=1");
        }
        (Some(_), IpForwarding::Unreadable(err)) => {
            warn!("Ip forwarding not enabled: cannot read {flag_path}: {err}");
            warn!("Enable ip forwarding: sysctl -w net.ipv4.ip_forward=1");
        }
    }
    if caps.available() && !caps.is_root {
        warn!("Not running as root, rule changes will likely be rejected");
    }
    debug!("Host capabilities: {:?}", caps);

    caps
}

/// Resolve `program` against a PATH-style list.
///
/// A name containing `/` is checked as-is. Only executable regular files match.
pub fn find_in_path(program: &str, path_var: &OsStr) -> Option<PathBuf> {
    if program.is_empty() {
        return None;
    }
    if program.contains('/') {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }

    std::env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Read the forwarding flag; only a trimmed "1" counts as enabled.
pub fn read_ip_forwarding(path: &Path) -> IpForwarding {
    match fs::read_to_string(path) {
        Ok(content) => {
            let value = content.trim();
            if value == "1" {
                IpForwarding::Enabled
            } else {
                IpForwarding::Disabled(value.to_string())
            }
        }
        Err(e) => IpForwarding::Unreadable(e.to_string()),
    }
}
