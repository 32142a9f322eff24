//! natctl — NAT redirect management over iptables
//!
//! Probes the host once at startup, builds the CLI around the result and
//! forwards each command to a [`client::RuleClient`].

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod probe;
pub mod redirect;
pub mod rule;
