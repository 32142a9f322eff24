//! Rule-management client
//!
//! `RuleClient` is the narrow port the redirect operations talk to.
//! `IptablesCommand` implements it on top of the `iptables` crate.

use tracing::debug;

use crate::config::IptablesConfig;
use crate::error::IptablesError;
use crate::rule::Chain;

/// Operations natctl needs from the packet filter
pub trait RuleClient {
    /// Rules of `chain` in `-S` syntax, including packet/byte counters
    fn list_with_counters(&self, table: &str, chain: Chain) -> Result<Vec<String>, IptablesError>;

    /// Append `rule` to `chain` unless an identical rule is already present
    fn append_unique(&self, table: &str, chain: Chain, rule: &[&str]) -> Result<(), IptablesError>;

    /// Delete the first rule in `chain` matching `rule`
    fn delete(&self, table: &str, chain: Chain, rule: &[&str]) -> Result<(), IptablesError>;
}

/// `RuleClient` backed by `iptables::IPTables`
pub struct IptablesCommand {
    inner: iptables::IPTables,
}

impl IptablesCommand {
    pub fn connect(config: &IptablesConfig) -> Result<Self, IptablesError> {
        let mut inner =
            iptables::new(false).map_err(|e| IptablesError::Connect(e.to_string()))?;
        inner.has_wait &= config.wait;
        debug!(
            "Using {} (check: {}, wait: {})",
            inner.cmd, inner.has_check, inner.has_wait
        );
        Ok(Self { inner })
    }
}

impl RuleClient for IptablesCommand {
    fn list_with_counters(&self, table: &str, chain: Chain) -> Result<Vec<String>, IptablesError> {
        let command = format!("-v -S {chain}");
        let output = self
            .inner
            .execute(table, &command)
            .map_err(|e| IptablesError::command(&command, e))?;
        if !output.status.success() {
            return Err(IptablesError::command(
                &command,
                String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }

    // `IPTables::append_unique` fails on an existing rule; natctl treats that as done.
    fn append_unique(&self, table: &str, chain: Chain, rule: &[&str]) -> Result<(), IptablesError> {
        let rule = rulespec(rule);
        let exists = self
            .inner
            .exists(table, chain.as_str(), &rule)
            .map_err(|e| IptablesError::command(format!("-C {chain} {rule}"), e))?;
        if exists {
            debug!("Rule already present in {table}/{chain}: {rule}");
            return Ok(());
        }
        self.inner
            .append(table, chain.as_str(), &rule)
            .map_err(|e| IptablesError::command(format!("-A {chain} {rule}"), e))
    }

    fn delete(&self, table: &str, chain: Chain, rule: &[&str]) -> Result<(), IptablesError> {
        let rule = rulespec(rule);
        self.inner
            .delete(table, chain.as_str(), &rule)
            .map_err(|e| IptablesError::command(format!("-D {chain} {rule}"), e))
    }
}

/// Rule arguments in the single-string form the `iptables` crate takes
fn rulespec(rule: &[&str]) -> String {
    rule.join(" ")
}
