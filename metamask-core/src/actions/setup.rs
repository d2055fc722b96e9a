//! Import an existing wallet through the onboarding flow.

use crate::driver::Driver;
use crate::error::{ActionError, ActionResult};
use crate::session::WalletSession;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use validator::Validate;

const ACTION: &str = "Setup";

/// Recovery phrase lengths the import form offers.
pub const ACCEPTED_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SetupInput {
    /// Space separated recovery phrase
    #[validate(length(min = 1))]
    pub recovery_phrase: String,

    /// Wallet password
    #[validate(length(min = 8))]
    pub password: String,
}

impl SetupInput {
    pub fn new(recovery_phrase: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            recovery_phrase: recovery_phrase.into(),
            password: password.into(),
        }
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for SetupInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupInput")
            .field("words", &self.recovery_phrase.split_whitespace().count())
            .finish_non_exhaustive()
    }
}

/// Split a recovery phrase into words, rejecting unsupported lengths.
pub fn recovery_words(phrase: &str) -> ActionResult<Vec<&str>> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if ACCEPTED_WORD_COUNTS.contains(&words.len()) {
        Ok(words)
    } else {
        Err(ActionError::rejected(format!(
            "Invalid recovery phrase of {} words. The phrase should be 12, 15, 18, 21, or 24 words long.",
            words.len()
        )))
    }
}

pub async fn execute<D: Driver>(session: &WalletSession<D>, input: SetupInput) -> ActionResult<()> {
    input
        .validate()
        .map_err(|e| ActionError::rejected(format!("Validation failed: {}", e)))?;

    let words = recovery_words(&input.recovery_phrase).inspect_err(|e| error!("{}", e))?;

    info!(words = words.len(), "Setting up wallet");
    session
        .in_extension(ACTION, steps(session, &words, &input.password))
        .await
}

async fn steps<D: Driver>(
    session: &WalletSession<D>,
    words: &[&str],
    password: &str,
) -> ActionResult<()> {
    let driver = session.driver();
    let locators = session.locators();

    session
        .slow_wait()
        .invisible(driver, &locators.loading_overlay)
        .await?;

    for step in &locators.onboarding_start {
        session.click(step).await?;
    }

    session
        .default_wait()
        .clickable(driver, &locators.srp_word_count)
        .await?;
    driver
        .select_value(&locators.srp_word_count, &words.len().to_string())
        .await?;

    for (i, word) in words.iter().enumerate() {
        session.fill(&locators.srp_word.arg(i), word).await?;
    }

    if let Some(ref confirm) = locators.srp_confirm {
        session.click(confirm).await?;
    }

    session.fill(&locators.password_new, password).await?;
    session.fill(&locators.password_confirm, password).await?;
    session.click(&locators.password_terms).await?;
    session.click(&locators.password_submit).await?;

    for step in &locators.onboarding_finish {
        session.click(step).await?;
    }

    match session
        .default_wait()
        .click(driver, &locators.popover_close)
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_timeout() => warn!("No welcome popover"),
        Err(e) => return Err(e),
    }

    // Only clickable once the welcome popover is gone
    session
        .confirm(
            ACTION,
            session
                .default_wait()
                .clickable(driver, &locators.account_overview),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_lengths() {
        let vocabulary: Vec<String> = (0..24).map(|i| format!("w{}", i)).collect();
        for count in ACCEPTED_WORD_COUNTS {
            let phrase = vocabulary[..count].join(" ");
            let words = recovery_words(&phrase).unwrap();
            assert_eq!(words.len(), count);
            assert_eq!(words[0], "w0");
            assert_eq!(words[count - 1], format!("w{}", count - 1));
        }
    }

    #[test]
    fn test_rejected_lengths() {
        for count in [0usize, 1, 11, 13, 16, 23, 25] {
            let phrase = vec!["word"; count].join(" ");
            let err = recovery_words(&phrase).unwrap_err();
            assert!(err.is_rejected(), "{} words should be rejected", count);
        }
    }

    #[test]
    fn test_extra_whitespace_is_ignored() {
        let words =
            recovery_words("  one two three four five six seven eight nine ten eleven twelve\n").unwrap();
        assert_eq!(words.len(), 12);
        assert_eq!(words[11], "twelve");
    }

    #[test]
    fn test_input_validation() {
        assert!(SetupInput::new("a b c", "testtest1").validate().is_ok());
        assert!(SetupInput::new("a b c", "short").validate().is_err());
        assert!(SetupInput::new("", "testtest1").validate().is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let input = SetupInput::new("whip squirrel shine", "testtest1");
        let debug = format!("{:?}", input);
        assert!(!debug.contains("squirrel"));
        assert!(!debug.contains("testtest1"));
        assert!(debug.contains("words: 3"));
    }
}
