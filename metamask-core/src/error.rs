use std::time::Duration;
use thiserror::Error;

/// Why a wallet action did not reach its success signal.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Input refused before any UI was touched.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// A bounded wait expired.
    #[error("Timed out after {}ms waiting for {what}", after.as_millis())]
    Timeout { what: String, after: Duration },

    /// Every step ran but the success signal never showed up.
    #[error("{action} failed: {reason}")]
    Unconfirmed { action: String, reason: String },

    #[error("Driver error: {0}")]
    Driver(#[from] anyhow::Error),
}

pub type ActionResult<T = ()> = std::result::Result<T, ActionError>;

impl ActionError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    pub fn unconfirmed(action: impl Into<String>, reason: impl ToString) -> Self {
        Self::Unconfirmed {
            action: action.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let error = ActionError::timeout("button[data-testid='popover-close']", Duration::from_secs(5));
        assert!(error.is_timeout());
        assert_eq!(
            error.to_string(),
            "Timed out after 5000ms waiting for button[data-testid='popover-close']"
        );
    }

    #[test]
    fn test_unconfirmed_display() {
        let error = ActionError::unconfirmed("Add network", "switch control never appeared");
        assert!(!error.is_timeout());
        assert_eq!(error.to_string(), "Add network failed: switch control never appeared");
    }

    #[test]
    fn test_rejected_display() {
        let error = ActionError::rejected("13 words");
        assert!(error.is_rejected());
        assert_eq!(error.to_string(), "Rejected: 13 words");
    }

    #[test]
    fn test_from_anyhow() {
        let error: ActionError = anyhow::anyhow!("target closed").into();
        assert!(matches!(error, ActionError::Driver(_)));
        assert!(error.to_string().contains("target closed"));
    }
}
