use thiserror::Error;

/// Errors from the iptables backend.
///
/// The `iptables` crate reports failures as `Box<dyn Error>`; only the
/// rendered message is kept so the error stays `Send + Sync`.
#[derive(Debug, Error)]
pub enum IptablesError {
    #[error("failed to initialise iptables: {0}")]
    Connect(String),

    #[error("iptables {operation} failed: {message}")]
    Command { operation: String, message: String },
}

impl IptablesError {
    pub fn command(operation: impl Into<String>, err: impl ToString) -> Self {
        Self::Command {
            operation: operation.into(),
            message: err.to_string().trim().to_string(),
        }
    }

    /// True when iptables rejected the call because the rule or chain is absent.
    pub fn is_not_exist(&self) -> bool {
        match self {
            Self::Command { message, .. } => {
                message.contains("does a matching rule exist")
                    || message.contains("No chain/target/match by that name")
            }
            Self::Connect(_) => false,
        }
    }
}
