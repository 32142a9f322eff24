//! Redirect operations on the nat table
//!
//! Masquerade changes are best effort and only logged on failure. DNAT
//! changes are fatal on failure. Nothing is rolled back.

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::RuleClient;
use crate::error::IptablesError;
use crate::rule::{Chain, Redirect, MASQUERADE};

/// Rules read from one chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainRules {
    pub chain: Chain,
    pub rules: Vec<String>,
}

pub struct RedirectManager<'a, C: RuleClient + ?Sized> {
    client: &'a C,
    table: &'a str,
}

impl<'a, C: RuleClient + ?Sized> RedirectManager<'a, C> {
    pub fn new(client: &'a C, table: &'a str) -> Self {
        Self { client, table }
    }

    /// Read every managed chain. Chains that fail to list are skipped.
    pub fn list(&self) -> Vec<ChainRules> {
        info!("Listing {} table rules", self.table);
        Chain::ALL
            .iter()
            .filter_map(|&chain| match self.client.list_with_counters(self.table, chain) {
                Ok(rules) => Some(ChainRules { chain, rules }),
                Err(e) => {
                    warn!("Failed to get iptable rules for {chain}: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn add_incoming(&self, redirect: &Redirect) -> Result<()> {
        info!("Redirecting incoming traffic {redirect}");
        if let Err(e) = self.client.append_unique(self.table, Chain::Postrouting, &MASQUERADE) {
            warn!("Issue adding iptables for masquerade: {e}");
        }
        self.client
            .append_unique(self.table, Chain::Prerouting, &redirect.rule_args())
            .map_err(|e| fatal("Failed to add incoming redirect", redirect, e))
    }

    /// Masquerade is removed even when other incoming redirects remain.
    pub fn remove_incoming(&self, redirect: &Redirect) -> Result<()> {
        info!("Removing incoming redirect {redirect}");
        if let Err(e) = self.client.delete(self.table, Chain::Postrouting, &MASQUERADE) {
            warn!("Issue deleting iptables for masquerade: {e}");
        }
        self.client
            .delete(self.table, Chain::Prerouting, &redirect.rule_args())
            .map_err(|e| fatal("Failed to remove incoming redirect", redirect, e))
    }

    pub fn add_outgoing(&self, redirect: &Redirect) -> Result<()> {
        info!("Redirecting outgoing traffic {redirect}");
        self.client
            .append_unique(self.table, Chain::Output, &redirect.rule_args())
            .map_err(|e| fatal("Failed to add outgoing redirect", redirect, e))
    }

    pub fn remove_outgoing(&self, redirect: &Redirect) -> Result<()> {
        info!("Removing outgoing redirect {redirect}");
        self.client
            .delete(self.table, Chain::Output, &redirect.rule_args())
            .map_err(|e| fatal("Failed to remove outgoing redirect", redirect, e))
    }
}

fn fatal(what: &str, redirect: &Redirect, err: IptablesError) -> anyhow::Error {
    if err.is_not_exist() {
        anyhow!("{what} {redirect}: no matching rule: {err}")
    } else {
        anyhow!("{what} {redirect}: {err}")
    }
}

/// Human-readable listing, one block per chain
pub fn render_table(listing: &[ChainRules]) -> String {
    let mut out = String::new();
    for entry in listing {
        out.push_str(&format!("Chain: {}\n\n", entry.chain));
        for rule in &entry.rules {
            out.push_str(rule);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table() {
        let listing = vec![
            ChainRules {
                chain: Chain::Prerouting,
                rules: vec!["-P PREROUTING ACCEPT -c 0 0".into()],
            },
            ChainRules {
                chain: Chain::Postrouting,
                rules: vec![
                    "-P POSTROUTING ACCEPT -c 0 0".into(),
                    "-A POSTROUTING -j MASQUERADE -c 12 720".into(),
                ],
            },
        ];

        assert_eq!(
            render_table(&listing),
            "Chain: PREROUTING\n\n-P PREROUTING ACCEPT -c 0 0\n\n\
             Chain: POSTROUTING\n\n-P POSTROUTING ACCEPT -c 0 0\n\
             -A POSTROUTING -j MASQUERADE -c 12 720\n\n"
        );
    }

    #[test]
    fn test_fatal_mentions_missing_rule() {
        let redirect = Redirect::new("tcp", "10.0.0.1", "80", "10.0.0.2:8080");
        let err = IptablesError::command(
            "-D OUTPUT",
            "iptables: Bad rule (does a matching rule exist in that chain?).",
        );
        let msg = fatal("Failed to remove outgoing redirect", &redirect, err).to_string();
        assert!(msg.starts_with("Failed to remove outgoing redirect tcp 10.0.0.1:80"));
        assert!(msg.contains("no matching rule"));
    }
}
